//! In-memory stand-ins for the host pipeline
//!
//! - [`RecordingNext`]: a next handler that records every action
//! - [`StateCell`]: a mutable state source
//! - [`CallbackLog`]: records lifecycle callback invocations

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on a poisoned lock

use rsaa_core::environment::{GetState, Next};
use rsaa_core::fsa::{Action, Fsa};
use rsaa_core::handle::RequestHandle;
use rsaa_core::resolver::ResolverError;
use std::sync::{Arc, Mutex, RwLock};

/// Next handler recording every action it receives.
///
/// Returns the number of actions recorded so far, so a dispatcher's return
/// value identifies which call produced it.
///
/// # Example
///
/// ```
/// use rsaa_core::environment::Next;
/// use rsaa_core::fsa::{Action, Fsa};
/// use rsaa_testing::RecordingNext;
///
/// let next = RecordingNext::<()>::new();
/// assert_eq!(next.call(Action::Fsa(Fsa::new("A"))), 1);
/// assert_eq!(next.call(Action::Fsa(Fsa::new("B"))), 2);
/// assert_eq!(next.types(), vec!["A".to_string(), "B".to_string()]);
/// ```
pub struct RecordingNext<S> {
    actions: Arc<Mutex<Vec<Action<S>>>>,
}

impl<S> RecordingNext<S> {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self {
            actions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every action received, in order
    #[must_use]
    pub fn actions(&self) -> Vec<Action<S>> {
        self.actions.lock().unwrap().clone()
    }

    /// The output actions received, in order
    #[must_use]
    pub fn fsas(&self) -> Vec<Fsa<S>> {
        self.actions
            .lock()
            .unwrap()
            .iter()
            .filter_map(Action::as_fsa)
            .cloned()
            .collect()
    }

    /// The types of the output actions received, in order
    #[must_use]
    pub fn types(&self) -> Vec<String> {
        self.fsas()
            .iter()
            .map(|fsa| fsa.action_type.to_string())
            .collect()
    }

    /// The most recent output action
    #[must_use]
    pub fn last_fsa(&self) -> Option<Fsa<S>> {
        self.fsas().pop()
    }

    /// Number of actions received
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.lock().unwrap().len()
    }

    /// Whether nothing was received
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.lock().unwrap().is_empty()
    }
}

impl<S> Default for RecordingNext<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Clone for RecordingNext<S> {
    fn clone(&self) -> Self {
        Self {
            actions: Arc::clone(&self.actions),
        }
    }
}

impl<S> std::fmt::Debug for RecordingNext<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingNext")
            .field("actions", &*self.actions.lock().unwrap())
            .finish()
    }
}

impl<S> Next<S> for RecordingNext<S> {
    type Output = usize;

    fn call(&self, action: Action<S>) -> usize {
        let mut actions = self.actions.lock().unwrap();
        actions.push(action);
        actions.len()
    }
}

/// Mutable state source shared between a test and the dispatcher.
#[derive(Debug, Default)]
pub struct StateCell<S> {
    state: Arc<RwLock<S>>,
}

impl<S> StateCell<S> {
    /// Create a cell holding `state`
    #[must_use]
    pub fn new(state: S) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Replace the state
    pub fn set(&self, state: S) {
        *self.state.write().unwrap() = state;
    }

    /// Modify the state in place
    pub fn update(&self, f: impl FnOnce(&mut S)) {
        f(&mut self.state.write().unwrap());
    }
}

impl<S> Clone for StateCell<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<S> GetState<S> for StateCell<S>
where
    S: Clone + Send + Sync,
{
    fn get_state(&self) -> S {
        self.state.read().unwrap().clone()
    }
}

/// A recorded lifecycle callback invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackCall {
    /// Name given to [`CallbackLog::record`]
    pub name: String,
    /// Id of the handle passed in, if any
    pub request_id: Option<u64>,
}

/// Records lifecycle callback invocations across callbacks.
///
/// # Example
///
/// ```
/// use rsaa_core::handle::RequestHandle;
/// use rsaa_testing::CallbackLog;
///
/// let log = CallbackLog::new();
/// let on_success = log.record("onSuccess");
///
/// on_success(Some(&RequestHandle::new(3))).unwrap();
/// assert_eq!(log.names(), vec!["onSuccess".to_string()]);
/// assert_eq!(log.calls()[0].request_id, Some(3));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallbackLog {
    calls: Arc<Mutex<Vec<CallbackCall>>>,
    handles: Arc<Mutex<Vec<RequestHandle>>>,
}

impl CallbackLog {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A callback appending `name` to the log
    pub fn record(
        &self,
        name: &str,
    ) -> impl Fn(Option<&RequestHandle>) -> Result<(), ResolverError> + Send + Sync + 'static {
        let log = self.clone();
        let name = name.to_string();
        move |handle| {
            log.calls.lock().unwrap().push(CallbackCall {
                name: name.clone(),
                request_id: handle.map(RequestHandle::id),
            });
            if let Some(handle) = handle {
                log.handles.lock().unwrap().push(handle.clone());
            }
            Ok(())
        }
    }

    /// A callback that aborts the call it is given
    pub fn abort_on_call(
        &self,
        name: &str,
    ) -> impl Fn(Option<&RequestHandle>) -> Result<(), ResolverError> + Send + Sync + 'static {
        let record = self.record(name);
        move |handle| {
            record(handle)?;
            if let Some(handle) = handle {
                handle.abort();
            }
            Ok(())
        }
    }

    /// Every invocation, in order
    #[must_use]
    pub fn calls(&self) -> Vec<CallbackCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Names of every invocation, in order
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.name).collect()
    }

    /// Handles received, in order
    #[must_use]
    pub fn handles(&self) -> Vec<RequestHandle> {
        self.handles.lock().unwrap().clone()
    }
}
