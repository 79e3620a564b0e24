//! Request id allocation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out strictly increasing request ids.
///
/// Each middleware owns one source unless a shared one is injected with
/// [`ApiMiddleware::with_id_source`](crate::middleware::ApiMiddleware::with_id_source).
/// Clones share the counter.
///
/// # Example
///
/// ```
/// use rsaa_runtime::ids::RequestIdSource;
///
/// let ids = RequestIdSource::new();
/// let shared = ids.clone();
///
/// assert_eq!(ids.next_id(), 0);
/// assert_eq!(shared.next_id(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestIdSource {
    next: Arc<AtomicU64>,
}

impl RequestIdSource {
    /// A source starting at 0.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// A source whose first id is `first`.
    #[must_use]
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: Arc::new(AtomicU64::new(first)),
        }
    }

    /// Allocate the next id.
    #[must_use]
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
