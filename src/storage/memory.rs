//! In-memory object store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ListPage, ObjectStore, ObjectSummary};
use crate::{FolioError, Result};

const DEFAULT_PAGE_SIZE: usize = 1000;

/// A stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Object store over a sorted map, for tests and local runs.
///
/// Listings come back in key order, `page_size` items at a time, with the
/// last key of each page as the continuation token.
#[derive(Debug)]
pub struct InMemoryObjectStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    page_size: usize,
    list_calls: AtomicUsize,
    fail_listing: AtomicBool,
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            page_size: DEFAULT_PAGE_SIZE,
            list_calls: AtomicUsize::new(0),
            fail_listing: AtomicBool::new(false),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Store `size` zero bytes under `key`.
    pub async fn insert_sized(&self, key: &str, size: usize) {
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                bytes: vec![0; size],
                content_type: "application/octet-stream".to_string(),
            },
        );
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    /// All keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    /// Number of listing calls served so far.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Make every listing call fail with `Upstream`.
    pub fn set_fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn list_under_prefix(&self, prefix: &str, token: Option<String>) -> Result<ListPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(FolioError::Upstream("object listing failed".to_string()));
        }

        let objects = self.objects.read().await;
        let mut matching = objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .filter(|(key, _)| token.as_deref().map_or(true, |after| key.as_str() > after))
            .map(|(key, object)| ObjectSummary {
                key: key.clone(),
                size: object.bytes.len() as u64,
            });

        let items: Vec<_> = matching.by_ref().take(self.page_size).collect();
        let next_token = match matching.next() {
            Some(_) => items.last().map(|item| item.key.clone()),
            None => None,
        };

        Ok(ListPage { items, next_token })
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn copy(&self, source: &str, destination: &str) -> Result<()> {
        let mut objects = self.objects.write().await;
        let object = objects
            .get(source)
            .cloned()
            .ok_or_else(|| FolioError::NotFound("object".to_string()))?;
        objects.insert(destination.to_string(), object);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }
}
