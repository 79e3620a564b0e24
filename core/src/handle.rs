//! Handle to an in-flight call.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Handle to one in-flight call, attached to the request action and passed to
/// lifecycle callbacks.
///
/// The `id` is for correlating actions and callbacks only. Ids are strictly
/// increasing per id source, but calls may complete in any order.
///
/// Cloning the handle shares the abort signal.
#[derive(Clone)]
pub struct RequestHandle {
    id: u64,
    abort: Arc<watch::Sender<bool>>,
}

impl RequestHandle {
    /// Create a handle for call number `id`.
    #[must_use]
    pub fn new(id: u64) -> Self {
        let (abort, _) = watch::channel(false);
        Self {
            id,
            abort: Arc::new(abort),
        }
    }

    /// Correlation id of the call.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Ask for the call to be cancelled.
    ///
    /// Has no effect once the call has produced its success or failure action.
    pub fn abort(&self) {
        self.abort.send_replace(true);
    }

    /// Whether [`abort`](Self::abort) has been called.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        *self.abort.borrow()
    }

    /// Completes once the call has been aborted.
    pub async fn aborted(&self) {
        let mut rx = self.abort.subscribe();
        // The sender lives as long as `self`, so this only returns on abort.
        let _ = rx.wait_for(|aborted| *aborted).await;
    }
}

impl PartialEq for RequestHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.abort, &other.abort)
    }
}

impl fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandle")
            .field("id", &self.id)
            .field("aborted", &self.is_aborted())
            .finish()
    }
}
