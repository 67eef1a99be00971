//! In-memory document store.

use crate::error::StoreError;
use crate::types::CollectionRef;
use crate::DocumentStore;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

type DocumentKey = (CollectionRef, String);

/// Document store kept entirely in process memory.
///
/// Nothing survives a restart. Used for local runs and tests.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    documents: Arc<RwLock<HashMap<DocumentKey, Value>>>,
}

impl MemoryDocumentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents across all collections.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Overwrite a document directly, bypassing the create conflict check.
    pub async fn insert_raw(&self, collection: &CollectionRef, document_id: &str, document: Value) {
        self.documents
            .write()
            .await
            .insert((collection.clone(), document_id.to_string()), document);
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn put(
        &self,
        collection: &CollectionRef,
        document_id: &str,
        document: Value,
    ) -> Result<Value, StoreError> {
        let mut documents = self.documents.write().await;
        let key = (collection.clone(), document_id.to_string());

        // Appwrite rejects a create with an id that already exists.
        if documents.contains_key(&key) {
            return Err(StoreError::Api {
                status: 409,
                message: format!("Document with the requested ID already exists: {}", document_id),
            });
        }

        documents.insert(key, document.clone());
        debug!(document_id = %document_id, "Memory store: document written");
        Ok(document)
    }

    async fn get(&self, collection: &CollectionRef, document_id: &str) -> Result<Value, StoreError> {
        self.documents
            .read()
            .await
            .get(&(collection.clone(), document_id.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(document_id.to_string()))
    }
}
