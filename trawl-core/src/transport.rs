//! Transport boundary and cancellation

use crate::page::RawResponse;
use crate::query::Query;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One-shot request/response access to a search engine.
///
/// Implementations own connection handling and the per-request timeout; a
/// round-trip that exceeds it must fail with [`crate::TrawlError::Timeout`].
/// Non-2xx responses are returned as `Ok` so the page decoder can read the
/// error envelope.
pub trait Transport {
    /// Run the initial search, opening a scroll context kept alive for `lease`.
    fn submit(&self, index: &str, query: &Query, lease: Duration) -> crate::Result<RawResponse>;

    /// Fetch the next page for `token`, renewing its lease.
    fn redeem(&self, token: &str, lease: Duration) -> crate::Result<RawResponse>;

    /// Free the server-side scroll context early.
    fn release(&self, _token: &str) -> crate::Result<()> {
        Ok(())
    }
}

/// Cloneable flag that stops an aggregation before its next request.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
