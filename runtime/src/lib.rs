//! # RSAA Runtime
//!
//! The lifecycle dispatcher for declarative API-call actions.
//!
//! This crate wires the pure pieces of `rsaa-core` to the outside world: it
//! reads host state, performs HTTP calls through a [`Transport`], and hands
//! every lifecycle action to the next handler in the host pipeline.
//!
//! ## Core Components
//!
//! - **Middleware**: [`ApiMiddleware`] → [`Configured`] → [`ActionHandler`]
//! - **Transport**: [`ReqwestTransport`], configured by [`TransportConfig`]
//! - **Request ids**: [`RequestIdSource`], injected per middleware
//! - **Metrics**: counters and a duration histogram, see [`metrics`]
//!
//! ## Example
//!
//! ```no_run
//! use rsaa_core::builder::RsaaBuilder;
//! use rsaa_core::fsa::Action;
//! use rsaa_runtime::{ApiMiddleware, ReqwestTransport, TransportConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = ReqwestTransport::new(TransportConfig::from_env()?)?;
//! let handler = ApiMiddleware::new(transport)
//!     .configure(|| ())
//!     .wrap(|action: Action<()>| println!("{action:?}"));
//!
//! let action = RsaaBuilder::new("https://api.example.com/users/1", "GET")
//!     .with_types("FETCH_USER_REQUEST", "FETCH_USER_SUCCESS", "FETCH_USER_FAILURE")
//!     .build();
//!
//! // Prints the request action, then the success or failure action.
//! handler.dispatch(Action::Value(action)).await;
//! # Ok(())
//! # }
//! ```
//!
//! [`Transport`]: rsaa_core::transport::Transport

/// Middleware and transport configuration
pub mod config;

/// `reqwest` transport
pub mod http;

/// Request id allocation
pub mod ids;

/// Prometheus metrics for observability
pub mod metrics;

/// The lifecycle dispatcher
pub mod middleware;

pub use config::{MiddlewareConfig, TransportConfig};
pub use http::ReqwestTransport;
pub use ids::RequestIdSource;
pub use middleware::{ActionHandler, ApiMiddleware, Configured};

/// Error types for the runtime
pub mod error {
    use thiserror::Error;

    /// Errors building the runtime's configuration.
    ///
    /// The dispatcher itself never fails: call failures are delivered as
    /// error actions. These only occur while setting things up.
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum ConfigError {
        /// A numeric environment variable did not parse.
        #[error("Invalid value for {var}: {value}")]
        InvalidNumber {
            /// The variable name
            var: &'static str,
            /// The rejected value
            value: String,
        },

        /// The configured origin is not an absolute URL.
        #[error("Invalid origin {value}: {reason}")]
        InvalidOrigin {
            /// The rejected value
            value: String,
            /// Why it was rejected
            reason: String,
        },

        /// The HTTP client could not be built.
        #[error("Failed to build HTTP client: {0}")]
        Client(String),
    }
}
