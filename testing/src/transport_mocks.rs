//! Scripted transport for dispatcher tests
//!
//! [`MockTransport`] replays a queue of scripted replies, one per call, and
//! records every request it was asked to perform.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on a poisoned lock

use rsaa_core::transport::{HttpRequest, Response, ResponseFuture, Transport, TransportError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted outcome of [`Transport::perform`].
#[derive(Debug, Clone)]
pub enum Reply {
    /// Settle with this response
    Respond(Response),
    /// Settle with this response after a delay
    RespondAfter(Duration, Response),
    /// Settle with a network error
    NetworkFailure(String),
    /// Refuse synchronously, before any exchange
    Reject(String),
    /// Never settle
    Hang,
}

/// In-memory [`Transport`] with scripted replies.
///
/// Replies are consumed in order. When the script runs out, calls are
/// rejected synchronously so a missing reply shows up as a failure action
/// instead of a hung test.
///
/// # Example
///
/// ```
/// use rsaa_core::transport::{HttpRequest, Method, Transport};
/// use rsaa_testing::{MockTransport, json_response};
/// use serde_json::json;
///
/// # async fn example() {
/// let transport = MockTransport::new();
/// transport.respond(json_response(200, json!({"id": 1})));
///
/// let response = transport
///     .perform(HttpRequest::new(Method::Get, "http://127.0.0.1/users/1"))
///     .unwrap()
///     .await
///     .unwrap();
/// assert_eq!(response.status(), 200);
/// assert_eq!(transport.request_count(), 1);
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct MockTransport {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl MockTransport {
    /// Create a transport with an empty script
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a reply to the script
    pub fn push(&self, reply: Reply) -> &Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    /// Script a response
    pub fn respond(&self, response: Response) -> &Self {
        self.push(Reply::Respond(response))
    }

    /// Script a response delivered after `delay`
    pub fn respond_after(&self, delay: Duration, response: Response) -> &Self {
        self.push(Reply::RespondAfter(delay, response))
    }

    /// Script a network failure
    pub fn fail_network(&self, message: impl Into<String>) -> &Self {
        self.push(Reply::NetworkFailure(message.into()))
    }

    /// Script a synchronous rejection
    pub fn reject(&self, message: impl Into<String>) -> &Self {
        self.push(Reply::Reject(message.into()))
    }

    /// Script a call that never settles
    pub fn hang(&self) -> &Self {
        self.push(Reply::Hang)
    }

    /// Every request performed so far, rejected ones included
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests performed so far
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The most recent request
    #[must_use]
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

impl Transport for MockTransport {
    fn perform(&self, request: HttpRequest) -> Result<ResponseFuture, TransportError> {
        self.requests.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::Reject("no scripted reply".to_string()));

        match reply {
            Reply::Respond(response) => Ok(Box::pin(async move { Ok(response) })),
            Reply::RespondAfter(delay, response) => Ok(Box::pin(async move {
                tokio::time::sleep(delay).await;
                Ok(response)
            })),
            Reply::NetworkFailure(message) => {
                Ok(Box::pin(async move { Err(TransportError::Network(message)) }))
            },
            Reply::Reject(message) => Err(TransportError::InvalidRequest(message)),
            Reply::Hang => Ok(Box::pin(futures::future::pending())),
        }
    }
}
