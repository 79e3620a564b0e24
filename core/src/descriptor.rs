//! Typed call and type descriptors.
//!
//! [`CallApi`] is what a valid tagged action parses into. Every field that
//! may be computed is a [`Resolvable`], so resolution is uniform across
//! `endpoint`, `headers`, `bailout`, `payload` and `meta`.

use crate::error::RsaaError;
use crate::handle::RequestHandle;
use crate::label::Label;
use crate::resolver::{ResolveContext, Resolvable};
use crate::transport::{Credentials, Headers, Method, Query};
use crate::value::{CallbackFn, Value};
use std::fmt;

/// The payload of an output action.
pub enum Payload<S> {
    /// Plain data
    Value(Value<S>),
    /// One of the error kinds, on actions flagged `error: true`
    Error(RsaaError),
}

impl<S> Payload<S> {
    /// The error, if this payload is one.
    #[must_use]
    pub const fn as_error(&self) -> Option<&RsaaError> {
        match self {
            Self::Error(error) => Some(error),
            Self::Value(_) => None,
        }
    }

    /// The data, if this payload is not an error.
    #[must_use]
    pub const fn as_value(&self) -> Option<&Value<S>> {
        match self {
            Self::Value(value) => Some(value),
            Self::Error(_) => None,
        }
    }
}

impl<S> Clone for Payload<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Value(value) => Self::Value(value.clone()),
            Self::Error(error) => Self::Error(error.clone()),
        }
    }
}

impl<S> PartialEq for Payload<S> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Value(a), Self::Value(b)) => a == b,
            (Self::Error(a), Self::Error(b)) => a == b,
            _ => false,
        }
    }
}

impl<S> fmt::Debug for Payload<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Error(error) => f.debug_tuple("Error").field(error).finish(),
        }
    }
}

impl<S> From<RsaaError> for Payload<S> {
    fn from(error: RsaaError) -> Self {
        Self::Error(error)
    }
}

impl<S> From<Value<S>> for Payload<S> {
    fn from(value: Value<S>) -> Self {
        Self::Value(value)
    }
}

/// Source of a descriptor's payload. Resolving to `None` leaves the action
/// without a payload.
pub type PayloadSource<S> = Resolvable<ResolveContext<S>, Option<Payload<S>>>;

/// Source of a descriptor's meta.
pub type MetaSource<S> = Resolvable<ResolveContext<S>, Value<S>>;

/// How to build one lifecycle output action.
pub struct TypeDescriptor<S> {
    /// Output action type
    pub label: Label,
    /// Payload value or resolver
    pub payload: Option<PayloadSource<S>>,
    /// Meta value or resolver
    pub meta: Option<MetaSource<S>>,
    /// Flag the output action as an error
    pub error: bool,
    /// In-flight call to attach
    pub request: Option<RequestHandle>,
}

impl<S> TypeDescriptor<S> {
    /// Descriptor carrying only a type.
    #[must_use]
    pub fn new(label: impl Into<Label>) -> Self {
        Self {
            label: label.into(),
            payload: None,
            meta: None,
            error: false,
            request: None,
        }
    }

    /// Replace the payload source.
    #[must_use]
    pub fn with_payload_source(mut self, payload: PayloadSource<S>) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Replace the payload with a fixed value.
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<Payload<S>>) -> Self {
        self.payload = Some(Resolvable::Literal(Some(payload.into())));
        self
    }

    /// Replace the meta source.
    #[must_use]
    pub fn with_meta_source(mut self, meta: MetaSource<S>) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Flag the output action as an error.
    #[must_use]
    pub const fn with_error(mut self) -> Self {
        self.error = true;
        self
    }

    /// Attach the in-flight call.
    #[must_use]
    pub fn with_request(mut self, request: RequestHandle) -> Self {
        self.request = Some(request);
        self
    }
}

impl<S> Clone for TypeDescriptor<S> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            payload: self.payload.clone(),
            meta: self.meta.clone(),
            error: self.error,
            request: self.request.clone(),
        }
    }
}

impl<S> fmt::Debug for TypeDescriptor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("label", &self.label)
            .field("payload", &self.payload)
            .field("meta", &self.meta)
            .field("error", &self.error)
            .field("request", &self.request)
            .finish()
    }
}

/// One entry of `[RSAA].types`.
pub enum TypeSpec<S> {
    /// Shorthand: just the type
    Label(Label),
    /// Full descriptor
    Descriptor(TypeDescriptor<S>),
}

impl<S> TypeSpec<S> {
    /// The output action type.
    #[must_use]
    pub const fn label(&self) -> &Label {
        match self {
            Self::Label(label) => label,
            Self::Descriptor(descriptor) => &descriptor.label,
        }
    }
}

impl<S> Clone for TypeSpec<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Label(label) => Self::Label(label.clone()),
            Self::Descriptor(descriptor) => Self::Descriptor(descriptor.clone()),
        }
    }
}

impl<S> fmt::Debug for TypeSpec<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(label) => f.debug_tuple("Label").field(label).finish(),
            Self::Descriptor(descriptor) => f.debug_tuple("Descriptor").field(descriptor).finish(),
        }
    }
}

impl<S> From<Label> for TypeSpec<S> {
    fn from(label: Label) -> Self {
        Self::Label(label)
    }
}

impl<S> From<&str> for TypeSpec<S> {
    fn from(name: &str) -> Self {
        Self::Label(Label::from(name))
    }
}

impl<S> From<TypeDescriptor<S>> for TypeSpec<S> {
    fn from(descriptor: TypeDescriptor<S>) -> Self {
        Self::Descriptor(descriptor)
    }
}

/// The request/success/failure types, plus the optional abort type.
pub struct TypeSpecs<S> {
    /// Emitted when the call starts, or when it cannot start
    pub request: TypeSpec<S>,
    /// Emitted when the response passes the success check
    pub success: TypeSpec<S>,
    /// Emitted on HTTP or network failure
    pub failure: TypeSpec<S>,
    /// Emitted when the call is aborted
    pub abort: Option<TypeSpec<S>>,
}

impl<S> TypeSpecs<S> {
    /// Three-type form.
    #[must_use]
    pub fn new(
        request: impl Into<TypeSpec<S>>,
        success: impl Into<TypeSpec<S>>,
        failure: impl Into<TypeSpec<S>>,
    ) -> Self {
        Self {
            request: request.into(),
            success: success.into(),
            failure: failure.into(),
            abort: None,
        }
    }

    /// Add the abort type.
    #[must_use]
    pub fn with_abort(mut self, abort: impl Into<TypeSpec<S>>) -> Self {
        self.abort = Some(abort.into());
        self
    }
}

impl<S> Clone for TypeSpecs<S> {
    fn clone(&self) -> Self {
        Self {
            request: self.request.clone(),
            success: self.success.clone(),
            failure: self.failure.clone(),
            abort: self.abort.clone(),
        }
    }
}

impl<S> fmt::Debug for TypeSpecs<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeSpecs")
            .field("request", &self.request)
            .field("success", &self.success)
            .field("failure", &self.failure)
            .field("abort", &self.abort)
            .finish()
    }
}

/// A validated `[RSAA]` call descriptor.
pub struct CallApi<S> {
    /// URL, literal or computed from state
    pub endpoint: Resolvable<S, String>,
    /// HTTP method
    pub method: Method,
    /// Request body, passed to the transport as-is
    pub body: Option<Value<S>>,
    /// Headers, literal or computed from state
    pub headers: Option<Resolvable<S, Headers>>,
    /// Query parameters
    pub query: Query,
    /// Credentials mode
    pub credentials: Option<Credentials>,
    /// Pre-flight check; `true` cancels the call silently
    pub bailout: Option<Resolvable<S, bool>>,
    /// Lifecycle types
    pub types: TypeSpecs<S>,
    /// Meta applied to every descriptor without its own
    pub meta: Option<MetaSource<S>>,
    /// Called once the request action is emitted
    pub on_request: Option<CallbackFn>,
    /// Called once the success action is emitted
    pub on_success: Option<CallbackFn>,
    /// Called once the failure action is emitted
    pub on_failure: Option<CallbackFn>,
}

impl<S> fmt::Debug for CallApi<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallApi")
            .field("endpoint", &self.endpoint)
            .field("method", &self.method)
            .field("body", &self.body)
            .field("headers", &self.headers)
            .field("query", &self.query)
            .field("credentials", &self.credentials)
            .field("bailout", &self.bailout)
            .field("types", &self.types)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}
