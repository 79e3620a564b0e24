//! Errors delivered as action payloads.
//!
//! None of these are ever returned to the host as `Err`: the dispatcher
//! attaches them as the `payload` of an output action flagged `error: true`,
//! so failures travel through the same channel as successes.

use serde::Serialize;
use thiserror::Error;

/// Failure kinds surfaced to the host as error actions.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "name")]
pub enum RsaaError {
    /// The action was tagged but did not satisfy the RSAA schema.
    #[error("Invalid RSAA")]
    #[serde(rename = "InvalidRSAA", rename_all = "camelCase")]
    InvalidRsaa {
        /// Every violation found, in validation order
        validation_errors: Vec<String>,
    },

    /// A user-supplied payload or meta resolver failed.
    #[error("{message}")]
    #[serde(rename = "InternalError")]
    Internal {
        /// The resolver's error message
        message: String,
    },

    /// The request could not be made, or the network call itself failed.
    #[error("{message}")]
    #[serde(rename = "RequestError")]
    Request {
        /// What went wrong
        message: String,
    },

    /// The server answered with a status outside the success range.
    #[error("{status} - {status_text}")]
    #[serde(rename = "ApiError", rename_all = "camelCase")]
    Api {
        /// HTTP status code
        status: u16,
        /// HTTP reason phrase
        status_text: String,
        /// Parsed JSON body, when the response carried one
        response: Option<serde_json::Value>,
    },
}

impl RsaaError {
    /// Schema violations for a tagged action.
    #[must_use]
    pub const fn invalid(validation_errors: Vec<String>) -> Self {
        Self::InvalidRsaa { validation_errors }
    }

    /// A failing user resolver.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// A request that could not be completed.
    #[must_use]
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
        }
    }

    /// A non-success HTTP response.
    #[must_use]
    pub fn api(
        status: u16,
        status_text: impl Into<String>,
        response: Option<serde_json::Value>,
    ) -> Self {
        Self::Api {
            status,
            status_text: status_text.into(),
            response,
        }
    }

    /// The error's kind name (`InvalidRSAA`, `InternalError`, `RequestError`, `ApiError`).
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::InvalidRsaa { .. } => "InvalidRSAA",
            Self::Internal { .. } => "InternalError",
            Self::Request { .. } => "RequestError",
            Self::Api { .. } => "ApiError",
        }
    }
}
