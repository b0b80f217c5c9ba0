//! Random photo selection over a paged folder listing.
//!
//! The listing is walked once. Every eligible object is offered to a
//! fixed-size reservoir (Algorithm R), so the result is a uniform sample of
//! everything scanned without holding the whole folder in memory.

use std::collections::HashSet;

use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::folder::FolderId;
use crate::storage::ObjectStore;
use crate::{FolioError, Result};

/// Scan ceiling when none is configured.
pub const DEFAULT_MAX_SCAN: u64 = 20_000;

/// Fixed-size uniform sample of a stream.
///
/// After `n` offers each item has been kept with probability
/// `min(1, limit / n)`.
#[derive(Debug, Clone)]
pub struct Reservoir<T> {
    limit: usize,
    seen: u64,
    items: Vec<T>,
}

impl<T> Reservoir<T> {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            seen: 0,
            items: Vec::with_capacity(limit.min(1024)),
        }
    }

    /// Offer one item.
    pub fn offer<R: Rng + ?Sized>(&mut self, item: T, rng: &mut R) {
        self.seen += 1;
        if self.items.len() < self.limit {
            self.items.push(item);
            return;
        }

        let j = rng.random_range(0..self.seen);
        if j < self.limit as u64 {
            self.items[j as usize] = item;
        }
    }

    /// Number of items offered so far.
    pub fn seen(&self) -> u64 {
        self.seen
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// Parameters for one sampling run.
#[derive(Debug, Clone)]
pub struct SampleRequest {
    /// Maximum number of keys to return. Must be positive.
    pub limit: usize,
    /// Keys the caller has already seen.
    pub exclude: HashSet<String>,
}

impl SampleRequest {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            exclude: HashSet::new(),
        }
    }

    pub fn excluding<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(keys.into_iter().map(Into::into));
        self
    }
}

/// What a sampling run looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleMeta {
    /// Objects read from the listing, capped at the scan ceiling.
    pub scanned: u64,
    /// Objects that passed every filter.
    pub eligible_count: u64,
    pub requested: usize,
    pub returned: usize,
    /// Size of the exclusion set.
    pub excluded_count: usize,
    /// Whether the scan stopped at the ceiling before the listing ended.
    /// When set, the sample is uniform only over the scanned part.
    pub truncated: bool,
}

/// Result of a sampling run.
#[derive(Debug, Clone)]
pub struct Sample {
    pub keys: Vec<String>,
    pub meta: SampleMeta,
}

/// Bounded reservoir sampler over a folder's direct children.
#[derive(Debug, Clone, Copy)]
pub struct PhotoSampler {
    max_scan: u64,
}

impl Default for PhotoSampler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SCAN)
    }
}

impl PhotoSampler {
    pub fn new(max_scan: u64) -> Self {
        Self { max_scan }
    }

    pub fn max_scan(&self) -> u64 {
        self.max_scan
    }

    /// Draw up to `request.limit` keys uniformly from the eligible objects
    /// directly under `folder_id`.
    ///
    /// Empty objects (directory markers), excluded keys and keys in
    /// sub-folders are skipped. A listing failure fails the whole call.
    pub async fn sample<R: Rng + ?Sized>(
        &self,
        store: &dyn ObjectStore,
        folder_id: &FolderId,
        request: &SampleRequest,
        rng: &mut R,
    ) -> Result<Sample> {
        if request.limit == 0 {
            return Err(FolioError::InvalidArgument(
                "limit must be a positive integer".to_string(),
            ));
        }
        if self.max_scan == 0 {
            return Err(FolioError::Misconfigured(
                "sampler.max_scan must be positive".to_string(),
            ));
        }

        let prefix = folder_id.prefix();
        let mut reservoir = Reservoir::new(request.limit);
        let mut scanned: u64 = 0;
        let mut truncated = false;
        let mut token = None;

        'pages: loop {
            let page = store.list_under_prefix(&prefix, token.take()).await?;
            debug!(
                folder_id = %folder_id,
                items = page.items.len(),
                scanned,
                "Scanning listing page"
            );

            for object in page.items {
                if scanned >= self.max_scan {
                    truncated = true;
                    break 'pages;
                }
                scanned += 1;

                if object.size == 0
                    || request.exclude.contains(&object.key)
                    || folder_id.direct_child_name(&object.key).is_none()
                {
                    continue;
                }
                reservoir.offer(object.key, rng);
            }

            match page.next_token {
                Some(_) if scanned >= self.max_scan => {
                    truncated = true;
                    break;
                }
                Some(next) => token = Some(next),
                None => break,
            }
        }

        let eligible_count = reservoir.seen();
        let keys = reservoir.into_items();
        let meta = SampleMeta {
            scanned,
            eligible_count,
            requested: request.limit,
            returned: keys.len(),
            excluded_count: request.exclude.len(),
            truncated,
        };

        if truncated {
            debug!(folder_id = %folder_id, scanned, "Scan stopped at ceiling");
        }
        Ok(Sample { keys, meta })
    }
}
