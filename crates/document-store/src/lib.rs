//! Keyed document store client with an Appwrite-compatible HTTP backend.

mod client;
mod error;
mod memory;
mod types;

pub use client::AppwriteClient;
pub use error::StoreError;
pub use memory::MemoryDocumentStore;
pub use types::CollectionRef;

use async_trait::async_trait;
use serde_json::Value;

/// A network-reachable store of schema-flexible documents addressed by
/// collection and key.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document under `document_id`, returning the stored document.
    async fn put(
        &self,
        collection: &CollectionRef,
        document_id: &str,
        document: Value,
    ) -> Result<Value, StoreError>;

    /// Fetch a document. Absence is reported as [`StoreError::NotFound`].
    async fn get(&self, collection: &CollectionRef, document_id: &str) -> Result<Value, StoreError>;
}
