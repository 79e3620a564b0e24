//! # RSAA Core
//!
//! Data model and pure logic for the RSAA middleware: declarative API calls
//! dispatched as tagged actions.
//!
//! A host dispatches an action carrying the [`RSAA`](validation::RSAA) key.
//! The middleware validates it, resolves its dynamic fields, performs the HTTP
//! call through an injected [`Transport`](transport::Transport), and emits
//! flux standard actions for each step of the call's lifecycle.
//!
//! This crate holds everything that does no I/O. The dispatcher itself lives
//! in `rsaa-runtime`.
//!
//! ## Core Concepts
//!
//! - **Tagged action**: a [`Value`](value::Value) object whose only key is
//!   `RSAA`, holding the call descriptor
//! - **Call descriptor**: endpoint, method, body, headers, query, credentials,
//!   bailout, lifecycle types and callbacks, parsed into a typed
//!   [`CallApi`](descriptor::CallApi)
//! - **Type descriptor**: how to build one lifecycle action (type, payload,
//!   meta)
//! - **FSA**: the output [`Fsa`](fsa::Fsa) handed to the next handler
//! - **Environment**: the state source and next handler, injected via traits
//!
//! ## Lifecycle
//!
//! Request, then exactly one of success, failure or abort. Every failure is
//! delivered as an error action carrying an [`RsaaError`](error::RsaaError);
//! nothing is ever thrown back at the host.
//!
//! ## Example
//!
//! ```
//! use rsaa_core::normalize::normalize;
//! use rsaa_core::validation::{parse_rsaa, RSAA};
//! use rsaa_core::value::Value;
//!
//! let action: Value<()> = Value::object([(
//!     RSAA,
//!     Value::object([
//!         ("endpoint", Value::from("http://127.0.0.1/api/users/1")),
//!         ("method", Value::from("GET")),
//!         (
//!             "types",
//!             Value::array(["REQUEST", "SUCCESS", "FAILURE"].map(Value::from)),
//!         ),
//!     ]),
//! )]);
//!
//! let call = parse_rsaa(&action).map_err(|errors| errors.join(", "));
//! assert!(call.is_ok());
//!
//! if let Ok(call) = call {
//!     let types = normalize(&call.types, call.meta.as_ref());
//!     assert_eq!(types.request.label.to_string(), "REQUEST");
//! }
//! ```

pub mod builder;
pub mod descriptor;
pub mod error;
pub mod fsa;
pub mod handle;
pub mod label;
pub mod normalize;
pub mod resolver;
pub mod transport;
pub mod validation;
pub mod value;

pub use descriptor::{CallApi, Payload, TypeDescriptor, TypeSpec, TypeSpecs};
pub use error::RsaaError;
pub use fsa::{Action, Fsa, action_with};
pub use handle::RequestHandle;
pub use label::{Label, Symbol};
pub use resolver::{Resolvable, ResolveContext, ResolverError};
pub use transport::{HttpRequest, Response, Transport, TransportError};
pub use validation::{RSAA, is_rsaa, is_valid_rsaa, parse_rsaa, validate_rsaa};
pub use value::Value;

/// Environment module - Dependency injection traits
///
/// The dispatcher reads state and forwards actions only through these
/// traits. Both have blanket implementations for plain closures, so a host
/// can wire the middleware with `|| state.clone()` and `|action| store.send(action)`.
pub mod environment {
    use crate::fsa::Action;

    /// Source of the current host state.
    ///
    /// Called at every resolution point, so resolvers always see a fresh
    /// snapshot.
    ///
    /// # Examples
    ///
    /// ```
    /// use rsaa_core::environment::GetState;
    ///
    /// let get_state = || 42_u32;
    /// assert_eq!(get_state.get_state(), 42);
    /// ```
    pub trait GetState<S>: Send + Sync {
        /// Snapshot the current state
        fn get_state(&self) -> S;
    }

    impl<S, F> GetState<S> for F
    where
        F: Fn() -> S + Send + Sync,
    {
        fn get_state(&self) -> S {
            self()
        }
    }

    /// The next handler in the host pipeline.
    ///
    /// Receives every action the middleware forwards or emits. Its return
    /// value is passed back to the dispatcher's caller for the last action
    /// of a call.
    pub trait Next<S>: Send + Sync {
        /// What the handler returns
        type Output;

        /// Hand an action to the next handler
        fn call(&self, action: Action<S>) -> Self::Output;
    }

    impl<S, R, F> Next<S> for F
    where
        F: Fn(Action<S>) -> R + Send + Sync,
    {
        type Output = R;

        fn call(&self, action: Action<S>) -> R {
            self(action)
        }
    }
}
