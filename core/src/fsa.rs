//! Output actions and the resolver-safety wrapper.
//!
//! Every lifecycle transition produces a fresh [`Fsa`] (flux standard action)
//! through [`action_with`], which evaluates the descriptor's payload and meta
//! and turns resolver failures into error actions instead of propagating them.

use crate::descriptor::{Payload, TypeDescriptor};
use crate::error::RsaaError;
use crate::handle::RequestHandle;
use crate::label::Label;
use crate::resolver::ResolveContext;
use crate::value::Value;
use std::fmt;

/// An output action.
pub struct Fsa<S> {
    /// Action type
    pub action_type: Label,
    /// Payload, absent when the descriptor had none or it resolved to nothing
    pub payload: Option<Payload<S>>,
    /// Meta, absent when the descriptor had none or its resolver failed
    pub meta: Option<Value<S>>,
    /// Whether `payload` is an error
    pub error: bool,
    /// The in-flight call this action belongs to
    pub request: Option<RequestHandle>,
}

impl<S> Fsa<S> {
    /// An action with only a type.
    #[must_use]
    pub fn new(action_type: impl Into<Label>) -> Self {
        Self {
            action_type: action_type.into(),
            payload: None,
            meta: None,
            error: false,
            request: None,
        }
    }

    /// An error action carrying `error` as its payload.
    #[must_use]
    pub fn failed(action_type: impl Into<Label>, error: RsaaError) -> Self {
        Self {
            payload: Some(Payload::Error(error)),
            error: true,
            ..Self::new(action_type)
        }
    }

    /// The error payload, if this is an error action.
    #[must_use]
    pub fn error_payload(&self) -> Option<&RsaaError> {
        self.payload.as_ref().and_then(Payload::as_error)
    }

    /// The data payload, if any.
    #[must_use]
    pub fn value_payload(&self) -> Option<&Value<S>> {
        self.payload.as_ref().and_then(Payload::as_value)
    }
}

impl<S> Clone for Fsa<S> {
    fn clone(&self) -> Self {
        Self {
            action_type: self.action_type.clone(),
            payload: self.payload.clone(),
            meta: self.meta.clone(),
            error: self.error,
            request: self.request.clone(),
        }
    }
}

impl<S> PartialEq for Fsa<S> {
    fn eq(&self, other: &Self) -> bool {
        self.action_type == other.action_type
            && self.payload == other.payload
            && self.meta == other.meta
            && self.error == other.error
            && self.request == other.request
    }
}

impl<S> fmt::Debug for Fsa<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fsa")
            .field("type", &self.action_type)
            .field("payload", &self.payload)
            .field("meta", &self.meta)
            .field("error", &self.error)
            .field("request", &self.request)
            .finish()
    }
}

/// What flows through the host pipeline.
///
/// Dispatched data arrives as [`Action::Value`]; actions produced by the
/// middleware are [`Action::Fsa`] and are never treated as tagged actions.
pub enum Action<S> {
    /// Host data, possibly tagged with the RSAA key
    Value(Value<S>),
    /// Output action
    Fsa(Fsa<S>),
}

impl<S> Action<S> {
    /// The output action, if this is one.
    #[must_use]
    pub const fn as_fsa(&self) -> Option<&Fsa<S>> {
        match self {
            Self::Fsa(fsa) => Some(fsa),
            Self::Value(_) => None,
        }
    }

    /// The host data, if this is not an output action.
    #[must_use]
    pub const fn as_value(&self) -> Option<&Value<S>> {
        match self {
            Self::Value(value) => Some(value),
            Self::Fsa(_) => None,
        }
    }
}

impl<S> Clone for Action<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Value(value) => Self::Value(value.clone()),
            Self::Fsa(fsa) => Self::Fsa(fsa.clone()),
        }
    }
}

impl<S> PartialEq for Action<S> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Value(a), Self::Value(b)) => a == b,
            (Self::Fsa(a), Self::Fsa(b)) => a == b,
            _ => false,
        }
    }
}

impl<S> fmt::Debug for Action<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Fsa(fsa) => f.debug_tuple("Fsa").field(fsa).finish(),
        }
    }
}

impl<S> From<Value<S>> for Action<S> {
    fn from(value: Value<S>) -> Self {
        Self::Value(value)
    }
}

impl<S> From<Fsa<S>> for Action<S> {
    fn from(fsa: Fsa<S>) -> Self {
        Self::Fsa(fsa)
    }
}

/// Evaluate `descriptor` into an output action.
///
/// A failing payload resolver yields an [`RsaaError::Internal`] payload and
/// `error: true`. A failing meta resolver does the same and leaves the action
/// without meta. Resolver failures never escape this function.
#[must_use]
pub fn action_with<S>(descriptor: TypeDescriptor<S>, ctx: &ResolveContext<S>) -> Fsa<S> {
    let TypeDescriptor {
        label,
        payload,
        meta,
        mut error,
        request,
    } = descriptor;

    let mut payload = match payload.map(|source| source.resolve(ctx)).transpose() {
        Ok(payload) => payload.flatten(),
        Err(e) => {
            error = true;
            Some(Payload::Error(RsaaError::internal(e.message())))
        },
    };

    let meta = match meta.map(|source| source.resolve(ctx)).transpose() {
        Ok(meta) => meta,
        Err(e) => {
            error = true;
            payload = Some(Payload::Error(RsaaError::internal(e.message())));
            None
        },
    };

    Fsa {
        action_type: label,
        payload,
        meta,
        error,
        request,
    }
}
