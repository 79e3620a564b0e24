//! The HTTP transport capability.
//!
//! The middleware never talks to the network directly. It builds an
//! [`HttpRequest`] and hands it to a [`Transport`]. The runtime crate ships a
//! `reqwest` implementation; tests use a scripted mock.
//!
//! [`Transport::perform`] has two failure points, mirroring how a call can
//! fail:
//!
//! - the synchronous `Err` means the request was refused before any HTTP
//!   exchange started (malformed URL, unserializable body);
//! - the returned future settling with `Err` means the exchange started but
//!   failed (connection refused, reset, body read error).

use crate::value::Value;
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Header names to values.
pub type Headers = BTreeMap<String, String>;

/// Query parameters, in the order they are appended to the URL.
pub type Query = Vec<(String, String)>;

/// HTTP methods accepted in `[RSAA].method`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// HEAD
    Head,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// OPTIONS
    Options,
}

impl Method {
    /// Parse a method name, ignoring case.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "HEAD" => Some(Self::Head),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            "OPTIONS" => Some(Self::Options),
            _ => None,
        }
    }

    /// Upper-case method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether credentials (cookies, authorization) accompany the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Credentials {
    /// Never send credentials
    Omit,
    /// Send credentials only to the configured origin
    SameOrigin,
    /// Always send credentials
    Include,
}

impl Credentials {
    /// Parse `omit`, `same-origin` or `include` (case-sensitive).
    #[must_use]
    pub fn parse(mode: &str) -> Option<Self> {
        match mode {
            "omit" => Some(Self::Omit),
            "same-origin" => Some(Self::SameOrigin),
            "include" => Some(Self::Include),
            _ => None,
        }
    }

    /// The mode's wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Omit => "omit",
            Self::SameOrigin => "same-origin",
            Self::Include => "include",
        }
    }
}

/// Request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Sent verbatim
    Text(String),
    /// Serialized as JSON
    Json(serde_json::Value),
}

impl Body {
    /// Convert an `[RSAA].body` value.
    ///
    /// Strings are sent as text, `null` means no body, and any other data is
    /// sent as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidRequest`] when the value contains a
    /// symbol or a function.
    pub fn from_value<S>(value: &Value<S>) -> Result<Option<Self>, TransportError> {
        match value {
            Value::Null => Ok(None),
            Value::String(text) => Ok(Some(Self::Text(text.clone()))),
            other => other.to_json().map(|json| Some(Self::Json(json))).ok_or_else(|| {
                TransportError::InvalidRequest("[RSAA].body is not serializable".to_string())
            }),
        }
    }
}

/// A fully resolved request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Method
    pub method: Method,
    /// Endpoint URL, without the query parameters
    pub url: String,
    /// Header names to values
    pub headers: Headers,
    /// Query parameters
    pub query: Query,
    /// Body, if any
    pub body: Option<Body>,
    /// Credentials mode, if given
    pub credentials: Option<Credentials>,
}

impl HttpRequest {
    /// A request with no headers, query, body or credentials mode.
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Headers::new(),
            query: Query::new(),
            body: None,
            credentials: None,
        }
    }
}

/// A received HTTP response with its body fully read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    status_text: String,
    headers: Headers,
    body: Vec<u8>,
}

impl Response {
    /// A response with no headers and an empty body.
    #[must_use]
    pub fn new(status: u16, status_text: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    /// A response carrying `body` as `application/json`.
    #[must_use]
    pub fn json_body(status: u16, status_text: impl Into<String>, body: &serde_json::Value) -> Self {
        Self::new(status, status_text)
            .with_header("Content-Type", "application/json")
            .with_body(body.to_string())
    }

    /// Add a header. Names are stored lower-cased.
    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Set the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Reason phrase.
    #[must_use]
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Look up a header, ignoring case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// All headers, lower-cased names.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Raw body bytes.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Whether the status is in `200..=299`.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Parse the body when this is a JSON response.
    ///
    /// Returns `Ok(None)` for non-JSON responses and empty bodies.
    ///
    /// # Errors
    ///
    /// Returns the parse error when a JSON response has a malformed body.
    pub fn json(&self) -> Result<Option<serde_json::Value>, serde_json::Error> {
        if !is_json_response(self) || self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(&self.body).map(Some)
    }
}

/// Whether a response declares a JSON body.
///
/// `204 No Content` and `205 Reset Content` never carry one.
#[must_use]
pub fn is_json_response(response: &Response) -> bool {
    !matches!(response.status(), 204 | 205)
        && response
            .header("content-type")
            .is_some_and(|content_type| content_type.contains("json"))
}

/// Transport failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request was refused before anything was sent.
    #[error("{0}")]
    InvalidRequest(String),

    /// The exchange failed on the network.
    #[error("{0}")]
    Network(String),

    /// The response body could not be read.
    #[error("{0}")]
    Body(String),
}

/// The in-flight exchange.
pub type ResponseFuture = BoxFuture<'static, Result<Response, TransportError>>;

/// Performs HTTP requests on behalf of the middleware.
pub trait Transport: Send + Sync {
    /// Start `request`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidRequest`] when the request cannot be
    /// sent at all. Failures after the exchange started are reported through
    /// the returned future.
    fn perform(&self, request: HttpRequest) -> Result<ResponseFuture, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn perform(&self, request: HttpRequest) -> Result<ResponseFuture, TransportError> {
        (**self).perform(request)
    }
}
