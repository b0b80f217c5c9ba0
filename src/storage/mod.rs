//! Object storage interface.
//!
//! Photos live in an external object store keyed by `<folder_id>/<file>`.
//! Listing is prefix-scoped and paged with an opaque continuation token.

pub mod delivery;
pub mod memory;

use async_trait::async_trait;

use crate::Result;

pub use delivery::DeliveryResolver;
pub use memory::InMemoryObjectStore;

/// Key and size of one stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
}

/// One page of a prefix listing.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub items: Vec<ObjectSummary>,
    /// Continuation token, `None` on the last page.
    pub next_token: Option<String>,
}

/// Operations the gallery consumes from the object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List objects whose key starts with `prefix`.
    ///
    /// Items outside the prefix are never returned.
    async fn list_under_prefix(&self, prefix: &str, token: Option<String>) -> Result<ListPage>;

    /// Store an object, replacing any existing one.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Copy an object to a new key.
    async fn copy(&self, source: &str, destination: &str) -> Result<()>;

    /// Delete an object. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete everything under `prefix`. Returns the number of objects removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let mut keys = Vec::new();
        let mut token = None;
        loop {
            let page = self.list_under_prefix(prefix, token).await?;
            keys.extend(page.items.into_iter().map(|item| item.key));
            token = page.next_token;
            if token.is_none() {
                break;
            }
        }

        for key in &keys {
            self.delete(key).await?;
        }
        Ok(keys.len() as u64)
    }
}
