//! # RSAA Testing
//!
//! Testing utilities for the RSAA middleware.
//!
//! This crate provides:
//! - A scripted [`MockTransport`]
//! - In-memory stand-ins for the host pipeline ([`RecordingNext`],
//!   [`StateCell`], [`CallbackLog`])
//! - Response and tracing helpers
//! - Property-based testing strategies for action values
//!
//! ## Example
//!
//! ```ignore
//! use rsaa_core::builder::RsaaBuilder;
//! use rsaa_core::fsa::Action;
//! use rsaa_runtime::ApiMiddleware;
//! use rsaa_testing::{MockTransport, RecordingNext, json_response};
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_fetch_user() {
//!     let transport = MockTransport::new();
//!     transport.respond(json_response(200, json!({"id": 1})));
//!     let next = RecordingNext::new();
//!
//!     let handler = ApiMiddleware::new(transport).configure(|| ()).wrap(next.clone());
//!     let action = RsaaBuilder::new("http://127.0.0.1/users/1", "GET")
//!         .with_types("REQUEST", "SUCCESS", "FAILURE")
//!         .build();
//!
//!     handler.dispatch(Action::Value(action)).await;
//!     assert_eq!(next.types(), vec!["REQUEST", "SUCCESS"]);
//! }
//! ```

/// In-memory stand-ins for the host pipeline
pub mod host_mocks;

/// Scripted transport
pub mod transport_mocks;

/// Test helpers and utilities.
pub mod helpers {
    use rsaa_core::transport::Response;

    /// A JSON response with the usual reason phrase for `status`.
    ///
    /// # Example
    ///
    /// ```
    /// use rsaa_testing::json_response;
    /// use serde_json::json;
    ///
    /// let response = json_response(404, json!({"error": "Resource not found"}));
    /// assert_eq!(response.status_text(), "Not Found");
    /// assert_eq!(response.header("content-type"), Some("application/json"));
    /// ```
    #[must_use]
    pub fn json_response(status: u16, body: serde_json::Value) -> Response {
        Response::json_body(status, reason_phrase(status), &body)
    }

    /// A `text/plain` response.
    #[must_use]
    pub fn text_response(status: u16, body: &str) -> Response {
        Response::new(status, reason_phrase(status))
            .with_header("Content-Type", "text/plain")
            .with_body(body)
    }

    /// Reason phrases for the statuses tests use.
    #[must_use]
    pub const fn reason_phrase(status: u16) -> &'static str {
        match status {
            200 => "OK",
            201 => "Created",
            204 => "No Content",
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            409 => "Conflict",
            500 => "Internal Server Error",
            503 => "Service Unavailable",
            _ => "",
        }
    }

    /// Install a test-writer tracing subscriber once per process.
    ///
    /// Honors `RUST_LOG`; defaults to `debug` for the RSAA crates.
    pub fn init_test_tracing() {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("rsaa_runtime=debug,rsaa_core=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;
    use rsaa_core::label::Symbol;
    use rsaa_core::validation::{CALL_API_KEYS, RSAA};
    use rsaa_core::value::Value;

    /// Arbitrary JSON data, nested up to four levels.
    pub fn arb_json() -> impl Strategy<Value = serde_json::Value> {
        let leaf = prop_oneof![
            Just(serde_json::Value::Null),
            any::<bool>().prop_map(serde_json::Value::from),
            any::<i64>().prop_map(serde_json::Value::from),
            "[a-zA-Z0-9 _/:.-]{0,16}".prop_map(serde_json::Value::from),
        ];
        leaf.prop_recursive(4, 32, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(serde_json::Value::Array),
                prop::collection::btree_map("[a-z]{1,8}", inner, 0..6)
                    .prop_map(|map| serde_json::Value::Object(map.into_iter().collect())),
            ]
        })
    }

    /// Arbitrary action values, including symbols and every function kind.
    pub fn arb_value<S: 'static>() -> impl Strategy<Value = Value<S>> {
        let leaf = prop_oneof![
            4 => arb_json().prop_map(Value::<S>::from),
            1 => "[A-Z_]{1,12}".prop_map(|name| Value::<S>::Symbol(Symbol::new(name))),
            1 => Just(()).prop_map(|()| Value::<S>::state_fn(|_| Ok(Value::Bool(false)))),
            1 => Just(()).prop_map(|()| Value::<S>::derive_fn(|_| Ok(Value::Null))),
            1 => Just(()).prop_map(|()| Value::<S>::callback(|_| Ok(()))),
        ];
        leaf.prop_recursive(3, 24, 5, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..5).prop_map(Value::Array),
                prop::collection::btree_map(arb_key(), inner, 0..5).prop_map(Value::Object),
            ]
        })
    }

    /// Arbitrary tagged actions: an object holding [`RSAA`] plus, sometimes,
    /// a stray root key. The call descriptor mixes allowed and unknown keys.
    pub fn arb_tagged_action<S: 'static>() -> impl Strategy<Value = Value<S>> {
        let descriptor = prop_oneof![
            3 => prop::collection::btree_map(arb_key(), arb_value::<S>(), 0..8)
                .prop_map(Value::Object),
            1 => arb_value::<S>(),
        ];
        (descriptor, proptest::option::of(arb_value::<S>())).prop_map(|(descriptor, stray)| {
            let mut root = vec![(RSAA.to_string(), descriptor)];
            if let Some(stray) = stray {
                root.push(("type".to_string(), stray));
            }
            Value::object(root)
        })
    }

    /// Arbitrary tagged actions that always pass validation.
    ///
    /// The endpoint is fixed. The method varies in name and case, `types`
    /// holds three or four labels (names, symbols or plain descriptors),
    /// and `bailout`, `headers` and `meta` are present or not at random.
    pub fn arb_valid_call<S: 'static>() -> impl Strategy<Value = Value<S>> {
        let method = (
            prop::sample::select(vec!["GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"]),
            any::<bool>(),
        )
            .prop_map(|(name, lower)| if lower { name.to_ascii_lowercase() } else { name.to_string() });
        let headers = prop::collection::btree_map("x-[a-z]{1,6}", "[a-zA-Z0-9]{1,8}", 0..3)
            .prop_map(|headers| Value::<S>::object(headers.into_iter().map(|(name, value)| (name, Value::from(value)))));
        (
            method,
            prop::collection::vec(arb_label::<S>(), 3..=4),
            proptest::option::of(any::<bool>()),
            proptest::option::of(headers),
            proptest::option::of(arb_json()),
        )
            .prop_map(|(method, types, bailout, headers, meta)| {
                let mut call = vec![
                    ("endpoint".to_string(), Value::from("http://127.0.0.1/api/items")),
                    ("method".to_string(), Value::from(method)),
                    ("types".to_string(), Value::array(types)),
                ];
                if let Some(bailout) = bailout {
                    call.push(("bailout".to_string(), Value::from(bailout)));
                }
                if let Some(headers) = headers {
                    call.push(("headers".to_string(), headers));
                }
                if let Some(meta) = meta {
                    call.push(("meta".to_string(), Value::from(meta)));
                }
                Value::object([(RSAA.to_string(), Value::object(call))])
            })
    }

    /// A valid `types` entry.
    fn arb_label<S: 'static>() -> impl Strategy<Value = Value<S>> {
        prop_oneof![
            3 => "[A-Z_]{1,12}".prop_map(Value::<S>::from),
            1 => "[A-Z_]{1,12}".prop_map(|name| Value::<S>::Symbol(Symbol::new(name))),
            1 => "[A-Z_]{1,12}".prop_map(|name| Value::<S>::object([("type", Value::from(name))])),
        ]
    }

    /// A descriptor key: usually allowed, sometimes not.
    fn arb_key() -> impl Strategy<Value = String> {
        prop_oneof![
            4 => prop::sample::select(CALL_API_KEYS.to_vec()).prop_map(str::to_string),
            1 => "[a-z]{1,8}",
        ]
    }
}

// Re-export commonly used items
pub use helpers::{init_test_tracing, json_response, text_response};
pub use host_mocks::{CallbackCall, CallbackLog, RecordingNext, StateCell};
pub use transport_mocks::{MockTransport, Reply};
