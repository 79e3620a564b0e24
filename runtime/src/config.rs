//! Middleware and transport configuration.

use crate::error::ConfigError;
use rsaa_core::transport::{Headers, Response};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Decides whether a response counts as a success.
pub type OkPredicate = Arc<dyn Fn(&Response) -> bool + Send + Sync>;

/// Behaviour of the dispatcher itself.
///
/// # Example
///
/// ```
/// use rsaa_runtime::config::MiddlewareConfig;
///
/// // Treat 304 Not Modified as a success too.
/// let config = MiddlewareConfig::new()
///     .with_ok(|response| response.is_success() || response.status() == 304)
///     .with_default_header("Accept", "application/json");
///
/// assert_eq!(config.default_headers().get("Accept").map(String::as_str), Some("application/json"));
/// ```
#[derive(Clone)]
pub struct MiddlewareConfig {
    ok: OkPredicate,
    default_headers: Headers,
}

impl MiddlewareConfig {
    /// Default configuration: success is `200..=299`, no default headers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ok: Arc::new(Response::is_success),
            default_headers: Headers::new(),
        }
    }

    /// Replace the success predicate.
    #[must_use]
    pub fn with_ok<F>(mut self, ok: F) -> Self
    where
        F: Fn(&Response) -> bool + Send + Sync + 'static,
    {
        self.ok = Arc::new(ok);
        self
    }

    /// Add a header sent with every call. Per-call headers of the same name win.
    #[must_use]
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    /// Whether `response` passes the success predicate.
    #[must_use]
    pub fn is_ok(&self, response: &Response) -> bool {
        (self.ok)(response)
    }

    /// Headers sent with every call.
    #[must_use]
    pub const fn default_headers(&self) -> &Headers {
        &self.default_headers
    }
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MiddlewareConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareConfig")
            .field("ok", &"<predicate>")
            .field("default_headers", &self.default_headers)
            .finish()
    }
}

/// Settings of the `reqwest` transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportConfig {
    /// Whole-exchange timeout. No timeout when unset.
    pub timeout: Option<Duration>,
    /// `User-Agent` header value
    pub user_agent: Option<String>,
    /// Origin of the host application (`scheme://host[:port]`), used for
    /// `same-origin` credentials
    pub origin: Option<String>,
    /// Responses with a larger body fail with a network error
    pub max_response_bytes: Option<usize>,
}

impl TransportConfig {
    /// Variable holding the timeout in milliseconds.
    pub const TIMEOUT_VAR: &'static str = "RSAA_HTTP_TIMEOUT_MS";
    /// Variable holding the user agent.
    pub const USER_AGENT_VAR: &'static str = "RSAA_USER_AGENT";
    /// Variable holding the host origin.
    pub const ORIGIN_VAR: &'static str = "RSAA_ORIGIN";
    /// Variable holding the response size limit in bytes.
    pub const MAX_RESPONSE_BYTES_VAR: &'static str = "RSAA_MAX_RESPONSE_BYTES";

    /// Load from `RSAA_HTTP_TIMEOUT_MS`, `RSAA_USER_AGENT`, `RSAA_ORIGIN` and
    /// `RSAA_MAX_RESPONSE_BYTES`. Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a numeric variable does not parse or the
    /// origin is not an absolute URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let number = |var: &'static str| -> Result<Option<u64>, ConfigError> {
            lookup(var)
                .map(|value| {
                    value
                        .trim()
                        .parse::<u64>()
                        .map_err(|_| ConfigError::InvalidNumber { var, value })
                })
                .transpose()
        };

        let timeout = number(Self::TIMEOUT_VAR)?.map(Duration::from_millis);
        let max_response_bytes = number(Self::MAX_RESPONSE_BYTES_VAR)?
            .map(|bytes| {
                usize::try_from(bytes).map_err(|_| ConfigError::InvalidNumber {
                    var: Self::MAX_RESPONSE_BYTES_VAR,
                    value: bytes.to_string(),
                })
            })
            .transpose()?;

        let origin = lookup(Self::ORIGIN_VAR)
            .map(|origin| {
                reqwest::Url::parse(&origin)
                    .map(|url| url.origin().ascii_serialization())
                    .map_err(|e| ConfigError::InvalidOrigin {
                        value: origin.clone(),
                        reason: e.to_string(),
                    })
            })
            .transpose()?;

        Ok(Self {
            timeout,
            user_agent: lookup(Self::USER_AGENT_VAR),
            origin,
            max_response_bytes,
        })
    }

    /// Set the timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the host origin.
    ///
    /// Any URL is reduced to its `scheme://host[:port]` origin. A value that
    /// does not parse is kept as given and matches no request URL.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        let origin = origin.into();
        let normalized = reqwest::Url::parse(&origin).map(|url| url.origin().ascii_serialization());
        self.origin = Some(normalized.unwrap_or(origin));
        self
    }

    /// Set the response size limit.
    #[must_use]
    pub const fn with_max_response_bytes(mut self, bytes: usize) -> Self {
        self.max_response_bytes = Some(bytes);
        self
    }
}
