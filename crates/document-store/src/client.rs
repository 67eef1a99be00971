//! Appwrite Databases HTTP client.

use crate::error::StoreError;
use crate::types::{ApiErrorBody, CollectionRef, CreateDocumentRequest};
use crate::DocumentStore;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use urlencoding::encode;

const PROJECT_HEADER: &str = "X-Appwrite-Project";
const KEY_HEADER: &str = "X-Appwrite-Key";

/// Characters of a response body echoed into debug logs.
const LOG_BODY_CHARS: usize = 200;

/// Longest document id Appwrite accepts.
const MAX_DOCUMENT_ID_LEN: usize = 36;

/// Appwrite Databases client.
///
/// The API key is stored using `SecretString` to prevent accidental
/// exposure in logs or debug output.
#[derive(Clone)]
pub struct AppwriteClient {
    client: Client,
    endpoint: String,
    project_id: String,
    api_key: SecretString,
}

impl AppwriteClient {
    /// Create a new Appwrite client.
    ///
    /// `timeout` bounds every request; there is no other timeout on store calls.
    pub fn new(
        endpoint: impl Into<String>,
        project_id: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;

        let endpoint: String = endpoint.into();
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            api_key,
        })
    }

    /// Get the configured endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn documents_url(&self, collection: &CollectionRef) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.endpoint,
            encode(&collection.database_id),
            encode(&collection.collection_id)
        )
    }

    /// Handle HTTP response, converting errors appropriately.
    async fn handle_response(&self, response: reqwest::Response) -> Result<Value, StoreError> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            debug!("Response body: {}", log_preview(&body));
            serde_json::from_str(&body).map_err(StoreError::from)
        } else {
            Err(self.extract_error(response).await)
        }
    }

    /// Extract error information from failed response.
    async fn extract_error(&self, response: reqwest::Response) -> StoreError {
        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".into());

        let message = match serde_json::from_str::<ApiErrorBody>(&text) {
            Ok(ApiErrorBody {
                message: Some(message),
                kind,
            }) => match kind {
                Some(kind) => format!("{} ({})", message, kind),
                None => message,
            },
            _ => text,
        };

        warn!(status = %status, message = %message, "Appwrite request failed");
        StoreError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl DocumentStore for AppwriteClient {
    #[instrument(skip(self, document), fields(database = %collection.database_id, collection = %collection.collection_id))]
    async fn put(
        &self,
        collection: &CollectionRef,
        document_id: &str,
        document: Value,
    ) -> Result<Value, StoreError> {
        let request = CreateDocumentRequest {
            document_id,
            data: &document,
        };

        let response = self
            .client
            .post(self.documents_url(collection))
            .header(PROJECT_HEADER, &self.project_id)
            .header(KEY_HEADER, self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        self.handle_response(response).await
    }

    #[instrument(skip(self), fields(database = %collection.database_id, collection = %collection.collection_id))]
    async fn get(&self, collection: &CollectionRef, document_id: &str) -> Result<Value, StoreError> {
        // Dot segments would be normalized away and hit the collection instead.
        if !is_document_id(document_id) {
            debug!(document_id = %document_id, "Not a valid document id");
            return Err(StoreError::NotFound(document_id.to_string()));
        }

        let url = format!("{}/{}", self.documents_url(collection), encode(document_id));

        let response = self
            .client
            .get(url)
            .header(PROJECT_HEADER, &self.project_id)
            .header(KEY_HEADER, self.api_key.expose_secret())
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(document_id = %document_id, "Document not found");
            return Err(StoreError::NotFound(document_id.to_string()));
        }

        self.handle_response(response).await
    }
}

/// Leading part of `body`, cut on a character boundary.
fn log_preview(body: &str) -> &str {
    match body.char_indices().nth(LOG_BODY_CHARS) {
        Some((end, _)) => &body[..end],
        None => body,
    }
}

/// Appwrite document ids: up to 36 of `a-z A-Z 0-9 . - _`, not starting
/// with a special character.
fn is_document_id(id: &str) -> bool {
    id.len() <= MAX_DOCUMENT_ID_LEN
        && id.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}
