//! `reqwest`-backed [`Transport`].
//!
//! Converts an [`HttpRequest`] into a `reqwest` request, applying the
//! credentials mode to cookie and authorization headers, and reads the whole
//! response body before handing back a [`Response`].

use crate::config::TransportConfig;
use crate::error::ConfigError;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Url};
use rsaa_core::transport::{
    Body, Credentials, HttpRequest, Method, Response, ResponseFuture, Transport, TransportError,
};

/// HTTP transport using a shared `reqwest` client.
///
/// Cheap to clone; clones share the connection pool.
///
/// # Example
///
/// ```no_run
/// use rsaa_runtime::config::TransportConfig;
/// use rsaa_runtime::http::ReqwestTransport;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = ReqwestTransport::new(TransportConfig::from_env()?)?;
/// # let _ = transport;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    config: TransportConfig,
}

impl ReqwestTransport {
    /// Build the client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Client`] if the TLS backend cannot be
    /// initialised or the user agent is not a valid header value.
    pub fn new(config: TransportConfig) -> Result<Self, ConfigError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Use an existing client.
    #[must_use]
    pub const fn with_client(client: Client, config: TransportConfig) -> Self {
        Self { client, config }
    }

    /// The transport's configuration.
    #[must_use]
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn sends_credentials(&self, credentials: Option<Credentials>, url: &Url) -> bool {
        match credentials {
            None | Some(Credentials::Include) => true,
            Some(Credentials::Omit) => false,
            Some(Credentials::SameOrigin) => self
                .config
                .origin
                .as_deref()
                .is_some_and(|origin| origin == url.origin().ascii_serialization()),
        }
    }

    fn build(&self, request: HttpRequest) -> Result<reqwest::Request, TransportError> {
        let mut url = Url::parse(&request.url)
            .map_err(|e| TransportError::InvalidRequest(format!("Invalid URL {}: {e}", request.url)))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| TransportError::InvalidRequest(format!("Invalid header name: {name}")))?;
            let value = HeaderValue::from_str(value).map_err(|_| {
                TransportError::InvalidRequest(format!("Invalid value for header {name}"))
            })?;
            headers.insert(name, value);
        }
        if !self.sends_credentials(request.credentials, &url) {
            headers.remove(COOKIE);
            headers.remove(AUTHORIZATION);
        }

        let mut builder = self.client.request(method(request.method), url);
        match request.body {
            Some(Body::Text(text)) => builder = builder.body(text),
            Some(Body::Json(json)) => {
                if !headers.contains_key(CONTENT_TYPE) {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                }
                builder = builder.body(json.to_string());
            },
            None => {},
        }

        builder
            .headers(headers)
            .build()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))
    }
}

const fn method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Head => reqwest::Method::HEAD,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Options => reqwest::Method::OPTIONS,
    }
}

async fn read_response(
    mut response: reqwest::Response,
    max_bytes: Option<usize>,
) -> Result<Response, TransportError> {
    let status = response.status();
    let mut converted = Response::new(status.as_u16(), status.canonical_reason().unwrap_or(""));
    for (name, value) in response.headers() {
        if let Ok(value) = value.to_str() {
            converted = converted.with_header(name.as_str(), value);
        }
    }

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| TransportError::Body(e.to_string()))?
    {
        body.extend_from_slice(&chunk);
        if let Some(max) = max_bytes.filter(|max| body.len() > *max) {
            return Err(TransportError::Body(format!(
                "Response body exceeds {max} bytes"
            )));
        }
    }

    Ok(converted.with_body(body))
}

impl Transport for ReqwestTransport {
    fn perform(&self, request: HttpRequest) -> Result<ResponseFuture, TransportError> {
        let request = self.build(request)?;
        let client = self.client.clone();
        let max_bytes = self.config.max_response_bytes;

        Ok(Box::pin(async move {
            let response = client
                .execute(request)
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;
            read_response(response, max_bytes).await
        }))
    }
}
