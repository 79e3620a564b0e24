//! Fluent construction of tagged actions.
//!
//! Hosts usually assemble tagged actions as plain data. [`RsaaBuilder`] does
//! the same from Rust with typed arguments, producing the [`Value`] that gets
//! dispatched. The result is still validated on dispatch.
//!
//! # Example
//!
//! ```
//! use rsaa_core::builder::{RsaaBuilder, TypeBuilder};
//! use rsaa_core::validation::is_valid_rsaa;
//! use rsaa_core::value::Value;
//!
//! let action: Value<()> = RsaaBuilder::new("https://api.example.com/users/1", "GET")
//!     .with_header("Accept", "application/json")
//!     .with_types(
//!         "FETCH_USER_REQUEST",
//!         TypeBuilder::<()>::new("FETCH_USER_SUCCESS").with_meta(Value::from("users")),
//!         "FETCH_USER_FAILURE",
//!     )
//!     .build();
//!
//! assert!(is_valid_rsaa(&action));
//! ```

use crate::handle::RequestHandle;
use crate::label::Label;
use crate::resolver::{ResolveContext, ResolverError};
use crate::transport::Credentials;
use crate::validation::RSAA;
use crate::value::{Object, Value};

/// Builds a type descriptor record.
#[derive(Debug)]
pub struct TypeBuilder<S> {
    fields: Object<S>,
}

impl<S> TypeBuilder<S> {
    /// Descriptor with only a type.
    #[must_use]
    pub fn new(label: impl Into<Label>) -> Self {
        let mut fields = Object::new();
        fields.insert("type".to_string(), Value::from(label.into()));
        Self { fields }
    }

    /// Fixed payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Value<S>) -> Self {
        self.fields.insert("payload".to_string(), payload);
        self
    }

    /// Payload computed from the resolve context.
    #[must_use]
    pub fn with_payload_fn<F>(self, f: F) -> Self
    where
        F: Fn(&ResolveContext<S>) -> Result<Value<S>, ResolverError> + Send + Sync + 'static,
    {
        self.with_payload(Value::derive_fn(f))
    }

    /// Fixed meta.
    #[must_use]
    pub fn with_meta(mut self, meta: Value<S>) -> Self {
        self.fields.insert("meta".to_string(), meta);
        self
    }

    /// Meta computed from the resolve context.
    #[must_use]
    pub fn with_meta_fn<F>(self, f: F) -> Self
    where
        F: Fn(&ResolveContext<S>) -> Result<Value<S>, ResolverError> + Send + Sync + 'static,
    {
        self.with_meta(Value::derive_fn(f))
    }

    /// The descriptor record.
    #[must_use]
    pub fn build(self) -> Value<S> {
        Value::Object(self.fields)
    }
}

impl<S> From<TypeBuilder<S>> for Value<S> {
    fn from(builder: TypeBuilder<S>) -> Self {
        builder.build()
    }
}

/// Builds a tagged action.
#[derive(Debug)]
pub struct RsaaBuilder<S> {
    call: Object<S>,
}

impl<S: 'static> RsaaBuilder<S> {
    /// Call to a fixed endpoint.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, method: impl Into<String>) -> Self {
        let mut call = Object::new();
        call.insert("endpoint".to_string(), Value::String(endpoint.into()));
        call.insert("method".to_string(), Value::String(method.into()));
        Self { call }
    }

    fn set(mut self, key: &str, value: Value<S>) -> Self {
        self.call.insert(key.to_string(), value);
        self
    }

    /// Compute the endpoint from state.
    #[must_use]
    pub fn with_endpoint_fn<F>(self, f: F) -> Self
    where
        F: Fn(&S) -> Result<String, ResolverError> + Send + Sync + 'static,
    {
        self.set("endpoint", Value::state_fn(move |state| f(state).map(Value::String)))
    }

    /// Request body.
    #[must_use]
    pub fn with_body(self, body: impl Into<Value<S>>) -> Self {
        self.set("body", body.into())
    }

    /// Add one literal header.
    ///
    /// Replaces a headers function set earlier.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut headers = match self.call.remove("headers") {
            Some(Value::Object(headers)) => headers,
            _ => Object::new(),
        };
        headers.insert(name.into(), Value::String(value.into()));
        self.set("headers", Value::Object(headers))
    }

    /// Compute the headers from state. The function returns a record of
    /// scalar values.
    #[must_use]
    pub fn with_headers_fn<F>(self, f: F) -> Self
    where
        F: Fn(&S) -> Result<Value<S>, ResolverError> + Send + Sync + 'static,
    {
        self.set("headers", Value::state_fn(f))
    }

    /// Add one query parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut query = match self.call.remove("query") {
            Some(Value::Object(query)) => query,
            _ => Object::new(),
        };
        query.insert(name.into(), Value::String(value.into()));
        self.set("query", Value::Object(query))
    }

    /// Credentials mode.
    #[must_use]
    pub fn with_credentials(self, credentials: Credentials) -> Self {
        self.set("credentials", Value::from(credentials.as_str()))
    }

    /// Fixed bailout flag.
    #[must_use]
    pub fn with_bailout(self, bailout: bool) -> Self {
        self.set("bailout", Value::Bool(bailout))
    }

    /// Decide from state whether to skip the call.
    #[must_use]
    pub fn with_bailout_fn<F>(self, f: F) -> Self
    where
        F: Fn(&S) -> Result<bool, ResolverError> + Send + Sync + 'static,
    {
        self.set("bailout", Value::state_fn(move |state| f(state).map(Value::Bool)))
    }

    /// Request, success and failure types.
    #[must_use]
    pub fn with_types(
        self,
        request: impl Into<TypeArg<S>>,
        success: impl Into<TypeArg<S>>,
        failure: impl Into<TypeArg<S>>,
    ) -> Self {
        let types = [request.into(), success.into(), failure.into()]
            .into_iter()
            .map(TypeArg::into_value);
        self.set("types", Value::array(types))
    }

    /// Request, success, failure and abort types.
    #[must_use]
    pub fn with_types_and_abort(
        self,
        request: impl Into<TypeArg<S>>,
        success: impl Into<TypeArg<S>>,
        failure: impl Into<TypeArg<S>>,
        abort: impl Into<TypeArg<S>>,
    ) -> Self {
        let types = [request.into(), success.into(), failure.into(), abort.into()]
            .into_iter()
            .map(TypeArg::into_value);
        self.set("types", Value::array(types))
    }

    /// Meta for every lifecycle action without its own.
    #[must_use]
    pub fn with_meta(self, meta: Value<S>) -> Self {
        self.set("meta", meta)
    }

    /// Called after the request action.
    #[must_use]
    pub fn on_request<F>(self, f: F) -> Self
    where
        F: Fn(Option<&RequestHandle>) -> Result<(), ResolverError> + Send + Sync + 'static,
    {
        self.set("onRequest", Value::callback(f))
    }

    /// Called after the success action.
    #[must_use]
    pub fn on_success<F>(self, f: F) -> Self
    where
        F: Fn(Option<&RequestHandle>) -> Result<(), ResolverError> + Send + Sync + 'static,
    {
        self.set("onSuccess", Value::callback(f))
    }

    /// Called after the failure action.
    #[must_use]
    pub fn on_failure<F>(self, f: F) -> Self
    where
        F: Fn(Option<&RequestHandle>) -> Result<(), ResolverError> + Send + Sync + 'static,
    {
        self.set("onFailure", Value::callback(f))
    }

    /// The tagged action.
    #[must_use]
    pub fn build(self) -> Value<S> {
        Value::object([(RSAA, Value::Object(self.call))])
    }
}

/// One entry of `types`: a label or a descriptor.
#[derive(Debug)]
pub enum TypeArg<S> {
    /// Bare label
    Label(Label),
    /// Descriptor record
    Descriptor(TypeBuilder<S>),
}

impl<S> TypeArg<S> {
    fn into_value(self) -> Value<S> {
        match self {
            Self::Label(label) => Value::from(label),
            Self::Descriptor(builder) => builder.build(),
        }
    }
}

impl<S> From<&str> for TypeArg<S> {
    fn from(name: &str) -> Self {
        Self::Label(Label::from(name))
    }
}

impl<S> From<Label> for TypeArg<S> {
    fn from(label: Label) -> Self {
        Self::Label(label)
    }
}

impl<S> From<crate::label::Symbol> for TypeArg<S> {
    fn from(symbol: crate::label::Symbol) -> Self {
        Self::Label(Label::Symbol(symbol))
    }
}

impl<S> From<TypeBuilder<S>> for TypeArg<S> {
    fn from(builder: TypeBuilder<S>) -> Self {
        Self::Descriptor(builder)
    }
}
