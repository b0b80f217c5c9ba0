//! Date/time utilities for folio.
//!
//! Invite expiry is kept in epoch seconds; creation and ban stamps are
//! RFC 3339 strings. Both come from a [`Clock`] so tests can move time.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, SecondsFormat, Utc};

/// Seconds in one day.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current time as Unix epoch seconds.
    fn now_epoch(&self) -> i64;

    /// Current time as an RFC 3339 string.
    fn now_rfc3339(&self) -> String {
        epoch_to_rfc3339(self.now_epoch())
    }

    /// Current time as Unix epoch milliseconds.
    fn now_millis(&self) -> i64 {
        self.now_epoch() * 1000
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch(&self) -> i64 {
        Utc::now().timestamp()
    }

    fn now_rfc3339(&self) -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Create a clock frozen at `epoch` seconds.
    pub fn new(epoch: i64) -> Self {
        Self {
            now: AtomicI64::new(epoch),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }

    /// Jump to an absolute time.
    pub fn set(&self, epoch: i64) {
        self.now.store(epoch, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_epoch(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Format epoch seconds as RFC 3339 (UTC, `Z` suffix).
///
/// Out-of-range values fall back to the Unix epoch.
pub fn epoch_to_rfc3339(epoch: i64) -> String {
    DateTime::<Utc>::from_timestamp(epoch, 0)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}
