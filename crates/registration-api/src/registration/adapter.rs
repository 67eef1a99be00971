//! Translation between API-shaped registrations and stored documents.

use super::{
    format_timestamp, parse_timestamp, RegistrationRecord, RegistrationResponse,
    RegistrationSubmission, CREATED_MESSAGE, FOUND_MESSAGE,
};
use crate::error::StorageError;
use chrono::Utc;
use document_store::{CollectionRef, DocumentStore};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Outcome of a lookup by registration id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(RegistrationResponse),
    NotFound,
}

/// The subset of a stored document needed to answer a lookup.
#[derive(Debug, Deserialize)]
struct StoredRegistration {
    registration_id: String,
    status: String,
    created_at: String,
}

/// Creates and reads registrations in the document store.
///
/// Holds no state besides the store handle, so one instance serves all
/// requests concurrently.
#[derive(Clone)]
pub struct RegistrationAdapter {
    store: Arc<dyn DocumentStore>,
    collection: CollectionRef,
}

impl RegistrationAdapter {
    pub fn new(store: Arc<dyn DocumentStore>, collection: CollectionRef) -> Self {
        Self { store, collection }
    }

    /// Persist a new registration.
    ///
    /// Writes exactly one document and never retries; a failed write leaves
    /// nothing behind.
    #[instrument(skip(self, submission), fields(team_name = %submission.team_name))]
    pub async fn create(
        &self,
        submission: RegistrationSubmission,
    ) -> Result<RegistrationResponse, StorageError> {
        let registration_id = Uuid::new_v4().to_string();
        let created_at = Utc::now();

        let record = RegistrationRecord::new_pending(registration_id.clone(), submission, created_at);
        let document = serde_json::to_value(&record)?;

        debug!(
            registration_id = %registration_id,
            created_at = %format_timestamp(&created_at),
            "Writing registration document"
        );

        self.store
            .put(&self.collection, &registration_id, document)
            .await
            .map_err(|source| StorageError::Write {
                registration_id: registration_id.clone(),
                source,
            })?;

        info!(registration_id = %registration_id, "Registration created");

        Ok(RegistrationResponse {
            registration_id,
            status: record.status.as_str().to_string(),
            created_at,
            message: CREATED_MESSAGE.to_string(),
        })
    }

    /// Look up a registration. Absence is a normal outcome, not an error.
    ///
    /// Ids that are not UUIDs were never issued, so they are reported as not
    /// found without asking the store.
    #[instrument(skip(self))]
    pub async fn read(&self, registration_id: &str) -> Result<Lookup, StorageError> {
        if Uuid::try_parse(registration_id).is_err() {
            warn!(registration_id = %registration_id, "Registration id is not a UUID");
            return Ok(Lookup::NotFound);
        }

        let document = match self.store.get(&self.collection, registration_id).await {
            Ok(document) => document,
            Err(e) if e.is_not_found() => {
                warn!(registration_id = %registration_id, "Registration not found");
                return Ok(Lookup::NotFound);
            }
            Err(source) => {
                return Err(StorageError::Read {
                    registration_id: registration_id.to_string(),
                    source,
                })
            }
        };

        let malformed = |reason: String| StorageError::Malformed {
            registration_id: registration_id.to_string(),
            reason,
        };

        let stored: StoredRegistration =
            serde_json::from_value(document).map_err(|e| malformed(e.to_string()))?;
        let created_at = parse_timestamp(&stored.created_at).map_err(malformed)?;

        info!(registration_id = %registration_id, "Registration retrieved");

        Ok(Lookup::Found(RegistrationResponse {
            registration_id: stored.registration_id,
            status: stored.status,
            created_at,
            message: FOUND_MESSAGE.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use document_store::{MemoryDocumentStore, StoreError};
    use serde_json::{json, Value};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store that rejects every call.
    struct FailingStore;

    #[async_trait]
    impl DocumentStore for FailingStore {
        async fn put(&self, _: &CollectionRef, _: &str, _: Value) -> Result<Value, StoreError> {
            Err(StoreError::Api {
                status: 503,
                message: "quota exceeded".into(),
            })
        }

        async fn get(&self, _: &CollectionRef, _: &str) -> Result<Value, StoreError> {
            Err(StoreError::Api {
                status: 503,
                message: "connection reset".into(),
            })
        }
    }

    /// Store that counts writes before delegating to memory.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryDocumentStore,
        puts: AtomicUsize,
    }

    #[async_trait]
    impl DocumentStore for CountingStore {
        async fn put(
            &self,
            collection: &CollectionRef,
            document_id: &str,
            document: Value,
        ) -> Result<Value, StoreError> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            self.inner.put(collection, document_id, document).await
        }

        async fn get(&self, collection: &CollectionRef, document_id: &str) -> Result<Value, StoreError> {
            self.inner.get(collection, document_id).await
        }
    }

    fn collection() -> CollectionRef {
        CollectionRef::new("tournament", "registrations")
    }

    fn memory_adapter() -> (RegistrationAdapter, MemoryDocumentStore) {
        let store = MemoryDocumentStore::new();
        let adapter = RegistrationAdapter::new(Arc::new(store.clone()), collection());
        (adapter, store)
    }

    const LEGACY_ID: &str = "0b7e1f7c-3d5a-4c1e-9a43-5f2d8e6b1c90";
    const BROKEN_ID: &str = "9c2d4a1b-6e8f-4b3a-8d7c-1e2f3a4b5c6d";
    const PARTIAL_ID: &str = "5a6b7c8d-9e0f-4a1b-8c2d-3e4f5a6b7c8d";

    fn submission() -> RegistrationSubmission {
        RegistrationSubmission {
            team_name: "Warriors".into(),
            category: "senior".into(),
            team_size: 10,
            contact_name: "A B".into(),
            designation: "coach".into(),
            email: "a@b.com".into(),
            phone: "9876543210".into(),
            alt_phone: String::new(),
            players: "1. X".into(),
            terms_accepted: true,
            newsletter_subscribed: false,
        }
    }

    #[tokio::test]
    async fn test_create_returns_fresh_uuid_v4() {
        let (adapter, _) = memory_adapter();
        let mut seen = HashSet::new();

        for _ in 0..20 {
            let response = adapter.create(submission()).await.unwrap();
            let id = Uuid::parse_str(&response.registration_id).unwrap();
            assert_eq!(id.get_version_num(), 4);
            assert!(seen.insert(response.registration_id));
        }
    }

    #[tokio::test]
    async fn test_create_response_fields() {
        let (adapter, _) = memory_adapter();
        let before = Utc::now();

        let response = adapter.create(submission()).await.unwrap();

        assert_eq!(response.status, "pending");
        assert_eq!(response.message, CREATED_MESSAGE);
        assert!(response.created_at >= before);
        assert!(response.created_at <= Utc::now());
    }

    #[tokio::test]
    async fn test_create_persists_self_describing_document() {
        let (adapter, store) = memory_adapter();

        let response = adapter.create(submission()).await.unwrap();
        let document = store
            .get(&collection(), &response.registration_id)
            .await
            .unwrap();

        assert_eq!(document["registration_id"], response.registration_id.as_str());
        assert_eq!(document["status"], "pending");
        assert_eq!(document["team_name"], "Warriors");
        assert_eq!(document["alt_phone"], "");
        assert_eq!(document["newsletter_subscribed"], false);
        assert_eq!(
            document["created_at"],
            format_timestamp(&response.created_at).as_str()
        );
    }

    #[tokio::test]
    async fn test_create_writes_exactly_once() {
        let store = Arc::new(CountingStore::default());
        let adapter = RegistrationAdapter::new(store.clone(), collection());

        adapter.create(submission()).await.unwrap();
        assert_eq!(store.puts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_create_store_failure() {
        let adapter = RegistrationAdapter::new(Arc::new(FailingStore), collection());

        let result = adapter.create(submission()).await;
        assert!(matches!(result, Err(StorageError::Write { .. })));
    }

    #[tokio::test]
    async fn test_read_round_trip() {
        let (adapter, _) = memory_adapter();
        let created = adapter.create(submission()).await.unwrap();

        let Lookup::Found(found) = adapter.read(&created.registration_id).await.unwrap() else {
            panic!("registration should exist");
        };

        assert_eq!(found.registration_id, created.registration_id);
        assert_eq!(found.status, created.status);
        assert_eq!(found.created_at, created.created_at);
        assert_eq!(found.message, FOUND_MESSAGE);
    }

    #[tokio::test]
    async fn test_read_is_idempotent() {
        let (adapter, _) = memory_adapter();
        let created = adapter.create(submission()).await.unwrap();

        let first = adapter.read(&created.registration_id).await.unwrap();
        let second = adapter.read(&created.registration_id).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_read_unknown_id_is_not_found() {
        let (adapter, _) = memory_adapter();

        let lookup = adapter.read(&Uuid::new_v4().to_string()).await.unwrap();
        assert_eq!(lookup, Lookup::NotFound);
    }

    #[tokio::test]
    async fn test_read_store_failure() {
        let adapter = RegistrationAdapter::new(Arc::new(FailingStore), collection());

        let result = adapter.read(&Uuid::new_v4().to_string()).await;
        assert!(matches!(result, Err(StorageError::Read { .. })));
    }

    #[tokio::test]
    async fn test_read_non_uuid_is_not_found_without_store_call() {
        // Any store call would fail, so NotFound proves none was made.
        let adapter = RegistrationAdapter::new(Arc::new(FailingStore), collection());

        for id in [".", "..", "", "abc", "../registrations"] {
            assert_eq!(adapter.read(id).await.unwrap(), Lookup::NotFound, "id {:?}", id);
        }
    }

    #[tokio::test]
    async fn test_read_legacy_naive_timestamp() {
        let (adapter, store) = memory_adapter();
        store
            .insert_raw(
                &collection(),
                LEGACY_ID,
                json!({
                    "registration_id": LEGACY_ID,
                    "status": "pending",
                    "created_at": "2026-01-31T22:00:00.123456"
                }),
            )
            .await;

        let Lookup::Found(found) = adapter.read(LEGACY_ID).await.unwrap() else {
            panic!("registration should exist");
        };
        assert_eq!(
            format_timestamp(&found.created_at),
            "2026-01-31T22:00:00.123456Z"
        );
    }

    #[tokio::test]
    async fn test_read_malformed_document() {
        let (adapter, store) = memory_adapter();
        store
            .insert_raw(
                &collection(),
                BROKEN_ID,
                json!({ "registration_id": BROKEN_ID, "status": "pending", "created_at": "soon" }),
            )
            .await;
        store
            .insert_raw(&collection(), PARTIAL_ID, json!({ "status": "pending" }))
            .await;

        assert!(matches!(
            adapter.read(BROKEN_ID).await,
            Err(StorageError::Malformed { .. })
        ));
        assert!(matches!(
            adapter.read(PARTIAL_ID).await,
            Err(StorageError::Malformed { .. })
        ));
    }
}
