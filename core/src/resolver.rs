//! Literal-or-resolver fields.
//!
//! Several RSAA fields may be given either as a plain value or as a function
//! computed at dispatch time: `endpoint`, `headers` and `bailout` from the
//! current state, descriptor `payload` and `meta` from a [`ResolveContext`].
//! [`Resolvable`] models both cases, and [`Resolvable::resolve`] is the one
//! place where such a field is turned into a value. Resolver failures are
//! returned as [`ResolverError`], never raised.

use crate::error::RsaaError;
use crate::transport::Response;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a user-supplied resolver or callback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ResolverError {
    message: String,
}

impl ResolverError {
    /// Create an error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Wrap any displayable error.
    #[must_use]
    pub fn from_error(error: &impl fmt::Display) -> Self {
        Self::new(error.to_string())
    }

    /// The error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for ResolverError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ResolverError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Function computing a `T` from an `I`.
pub type ResolverFn<I, T> = Arc<dyn Fn(&I) -> Result<T, ResolverError> + Send + Sync>;

/// A field given either literally or as a function of some input.
///
/// # Example
///
/// ```
/// use rsaa_core::resolver::Resolvable;
///
/// struct State { user_id: u32 }
///
/// let literal: Resolvable<State, String> = Resolvable::Literal("/users".to_string());
/// let computed: Resolvable<State, String> =
///     Resolvable::resolver(|state: &State| Ok(format!("/users/{}", state.user_id)));
///
/// let state = State { user_id: 7 };
/// assert_eq!(literal.resolve(&state).ok().as_deref(), Some("/users"));
/// assert_eq!(computed.resolve(&state).ok().as_deref(), Some("/users/7"));
/// ```
pub enum Resolvable<I, T> {
    /// Used as-is
    Literal(T),
    /// Invoked at resolution time
    Resolver(ResolverFn<I, T>),
}

impl<I, T> Resolvable<I, T> {
    /// Wrap a resolver function.
    #[must_use]
    pub fn resolver<F>(f: F) -> Self
    where
        F: Fn(&I) -> Result<T, ResolverError> + Send + Sync + 'static,
    {
        Self::Resolver(Arc::new(f))
    }

    /// Whether this field is computed.
    #[must_use]
    pub const fn is_resolver(&self) -> bool {
        matches!(self, Self::Resolver(_))
    }
}

impl<I, T: Clone> Resolvable<I, T> {
    /// Pass a literal through, or invoke the resolver with `input`.
    ///
    /// # Errors
    ///
    /// Returns the resolver's own [`ResolverError`] when it fails.
    pub fn resolve(&self, input: &I) -> Result<T, ResolverError> {
        match self {
            Self::Literal(value) => Ok(value.clone()),
            Self::Resolver(f) => f(input),
        }
    }
}

impl<I, T: Clone> Clone for Resolvable<I, T> {
    fn clone(&self) -> Self {
        match self {
            Self::Literal(value) => Self::Literal(value.clone()),
            Self::Resolver(f) => Self::Resolver(Arc::clone(f)),
        }
    }
}

impl<I, T: fmt::Debug> fmt::Debug for Resolvable<I, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Resolver(_) => write!(f, "Resolver(<function>)"),
        }
    }
}

impl<I, T> From<T> for Resolvable<I, T> {
    fn from(value: T) -> Self {
        Self::Literal(value)
    }
}

/// Everything a payload or meta resolver can look at.
pub struct ResolveContext<S> {
    action: Arc<Value<S>>,
    state: S,
    response: Option<Arc<Response>>,
    error: Option<RsaaError>,
}

impl<S> ResolveContext<S> {
    /// Context with the original action and a state snapshot.
    #[must_use]
    pub const fn new(action: Arc<Value<S>>, state: S) -> Self {
        Self {
            action,
            state,
            response: None,
            error: None,
        }
    }

    /// Attach the response being processed.
    #[must_use]
    pub fn with_response(mut self, response: Arc<Response>) -> Self {
        self.response = Some(response);
        self
    }

    /// Attach the error that caused a failure.
    #[must_use]
    pub fn with_error(mut self, error: RsaaError) -> Self {
        self.error = Some(error);
        self
    }

    /// The tagged action that started this call.
    #[must_use]
    pub fn action(&self) -> &Value<S> {
        &self.action
    }

    /// State snapshot taken at the emission point.
    #[must_use]
    pub const fn state(&self) -> &S {
        &self.state
    }

    /// The response, once one has been received.
    #[must_use]
    pub fn response(&self) -> Option<&Response> {
        self.response.as_deref()
    }

    /// The error that made the call fail, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&RsaaError> {
        self.error.as_ref()
    }
}

impl<S> fmt::Debug for ResolveContext<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveContext")
            .field("action", &self.action)
            .field("response", &self.response)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
