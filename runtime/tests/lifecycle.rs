//! End-to-end lifecycle tests for the dispatcher, against a scripted transport.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use rsaa_core::builder::{RsaaBuilder, TypeBuilder};
use rsaa_core::error::RsaaError;
use rsaa_core::fsa::{Action, Fsa};
use rsaa_core::label::Symbol;
use rsaa_core::resolver::ResolverError;
use rsaa_core::transport::{Credentials, Method};
use rsaa_core::validation::RSAA;
use rsaa_core::value::Value;
use rsaa_runtime::config::MiddlewareConfig;
use rsaa_runtime::ids::RequestIdSource;
use rsaa_runtime::middleware::{ABORTED_MESSAGE, ApiMiddleware};
use rsaa_testing::{
    CallbackLog, MockTransport, RecordingNext, StateCell, init_test_tracing, json_response,
    text_response,
};
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq)]
struct AppState {
    token: Option<String>,
    user_id: u64,
    cached: bool,
}

type V = Value<AppState>;

struct Harness {
    transport: MockTransport,
    state: StateCell<AppState>,
    next: RecordingNext<AppState>,
}

impl Harness {
    fn new() -> Self {
        init_test_tracing();
        Self {
            transport: MockTransport::new(),
            state: StateCell::new(AppState::default()),
            next: RecordingNext::new(),
        }
    }

    fn middleware(&self) -> ApiMiddleware<MockTransport> {
        ApiMiddleware::new(self.transport.clone())
    }

    async fn dispatch(&self, action: V) -> Option<usize> {
        self.dispatch_with(self.middleware(), action).await
    }

    async fn dispatch_with(&self, middleware: ApiMiddleware<MockTransport>, action: V) -> Option<usize> {
        middleware
            .configure(self.state.clone())
            .wrap(self.next.clone())
            .dispatch(Action::Value(action))
            .await
    }
}

fn users_call() -> RsaaBuilder<AppState> {
    RsaaBuilder::new("http://127.0.0.1/api/users/1", "GET").with_types(
        "FETCH_USER_REQUEST",
        "FETCH_USER_SUCCESS",
        "FETCH_USER_FAILURE",
    )
}

fn tagged(call: Vec<(&str, V)>) -> V {
    V::object([(RSAA, V::object(call))])
}

fn three_types() -> V {
    V::array(["REQUEST", "SUCCESS", "FAILURE"].map(V::from))
}

// ============================================================================
// Passthrough
// ============================================================================

#[tokio::test]
async fn test_untagged_actions_pass_through() {
    let h = Harness::new();
    let plain = V::object([("type", V::from("PLAIN"))]);

    let output = h.dispatch(plain.clone()).await;

    assert_eq!(output, Some(1));
    assert_eq!(h.next.actions(), vec![Action::Value(plain)]);
    assert_eq!(h.transport.request_count(), 0);
}

#[tokio::test]
async fn test_output_actions_are_never_reprocessed() {
    let h = Harness::new();
    let handler = h.middleware().configure(h.state.clone()).wrap(h.next.clone());
    let fsa = Fsa::<AppState>::new("ALREADY_DONE");

    let output = handler.dispatch(Action::Fsa(fsa.clone())).await;

    assert_eq!(output, Some(1));
    assert_eq!(h.next.fsas(), vec![fsa]);
}

// ============================================================================
// Invalid actions
// ============================================================================

#[tokio::test]
async fn test_invalid_action_emits_request_type_with_violations() {
    let h = Harness::new();
    let log = CallbackLog::new();
    let action = tagged(vec![
        ("endpoint", V::from("http://127.0.0.1/api/users/1")),
        ("method", V::from("FETCH")),
        ("types", three_types()),
        ("onRequest", V::callback(log.record("onRequest"))),
    ]);

    let output = h.dispatch(action).await;

    assert_eq!(output, Some(1));
    assert_eq!(
        h.next.fsas(),
        vec![Fsa::failed(
            "REQUEST",
            RsaaError::invalid(vec!["Invalid [RSAA].method: FETCH".to_string()])
        )]
    );
    assert_eq!(log.calls().len(), 1);
    assert_eq!(log.calls()[0].request_id, None);
    assert_eq!(h.transport.request_count(), 0);
}

#[tokio::test]
async fn test_invalid_action_uses_descriptor_type_and_symbols() {
    let h = Harness::new();
    let request = Symbol::new("REQUEST");
    let action = tagged(vec![
        ("endpoint", V::from("http://127.0.0.1/api/users/1")),
        ("method", V::from("GET")),
        (
            "types",
            V::array([
                TypeBuilder::new(request.clone()).build(),
                V::from("SUCCESS"),
                V::from("FAILURE"),
            ]),
        ),
        ("nope", V::Null),
    ]);

    h.dispatch(action).await;

    let fsa = h.next.last_fsa().unwrap();
    assert_eq!(fsa.action_type, request.into());
    assert!(fsa.error);
    assert_eq!(
        fsa.error_payload(),
        Some(&RsaaError::invalid(vec!["Invalid [RSAA] key: nope".to_string()]))
    );
}

#[tokio::test]
async fn test_invalid_action_without_request_type_emits_nothing() {
    let h = Harness::new();
    let action = tagged(vec![
        ("endpoint", V::from("http://127.0.0.1/api/users/1")),
        ("method", V::from("GET")),
    ]);

    let output = h.dispatch(action).await;

    assert_eq!(output, None);
    assert!(h.next.is_empty());
}

#[tokio::test]
async fn test_descriptor_request_key_is_ignored() {
    let h = Harness::new();
    h.transport.respond(json_response(200, json!({})));
    let action = tagged(vec![
        ("endpoint", V::from("http://127.0.0.1/api/users/1")),
        ("method", V::from("GET")),
        (
            "types",
            V::array([
                V::object([("type", V::from("REQUEST")), ("request", V::from("ignored"))]),
                V::from("SUCCESS"),
                V::from("FAILURE"),
            ]),
        ),
    ]);

    h.dispatch(action).await;

    assert_eq!(h.next.types(), vec!["REQUEST", "SUCCESS"]);
}

// ============================================================================
// Bailout
// ============================================================================

#[tokio::test]
async fn test_bailout_true_emits_nothing() {
    let h = Harness::new();

    let output = h.dispatch(users_call().with_bailout(true).build()).await;

    assert_eq!(output, None);
    assert!(h.next.is_empty());
    assert_eq!(h.transport.request_count(), 0);
}

#[tokio::test]
async fn test_bailout_function_reads_state() {
    let h = Harness::new();
    h.transport.respond(json_response(200, json!({"id": 1})));
    let action = users_call()
        .with_bailout_fn(|state: &AppState| Ok(state.cached))
        .build();

    h.state.update(|state| state.cached = true);
    assert_eq!(h.dispatch(action.clone()).await, None);

    h.state.update(|state| state.cached = false);
    assert_eq!(h.dispatch(action).await, Some(2));
    assert_eq!(h.next.types(), vec!["FETCH_USER_REQUEST", "FETCH_USER_SUCCESS"]);
}

// ============================================================================
// Resolver failures before the call
// ============================================================================

async fn assert_field_failure(action: V, field: &str) {
    let h = Harness::new();
    let log = CallbackLog::new();
    let action = match action {
        Value::Object(mut root) => {
            if let Some(Value::Object(call)) = root.get_mut(RSAA) {
                call.insert("onRequest".to_string(), V::callback(log.record("onRequest")));
            }
            Value::Object(root)
        },
        other => other,
    };

    let output = h.dispatch(action).await;

    assert_eq!(output, Some(1));
    assert_eq!(
        h.next.fsas(),
        vec![Fsa::failed(
            "FETCH_USER_REQUEST",
            RsaaError::request(format!("[RSAA].{field} function failed"))
        )]
    );
    assert_eq!(log.calls().len(), 1);
    assert_eq!(log.calls()[0].request_id, None);
    assert_eq!(h.transport.request_count(), 0);
}

#[tokio::test]
async fn test_failing_endpoint_function() {
    let action = users_call()
        .with_endpoint_fn(|_: &AppState| Err(ResolverError::new("no endpoint")))
        .build();
    assert_field_failure(action, "endpoint").await;
}

#[tokio::test]
async fn test_failing_headers_function() {
    let action = users_call()
        .with_headers_fn(|_: &AppState| Err(ResolverError::new("no headers")))
        .build();
    assert_field_failure(action, "headers").await;
}

#[tokio::test]
async fn test_headers_function_returning_non_record_fails() {
    let action = users_call()
        .with_headers_fn(|_: &AppState| Ok(V::from("Bearer x")))
        .build();
    assert_field_failure(action, "headers").await;
}

#[tokio::test]
async fn test_failing_bailout_function() {
    let action = users_call()
        .with_bailout_fn(|_: &AppState| Err(ResolverError::new("no bailout")))
        .build();
    assert_field_failure(action, "bailout").await;
}

// ============================================================================
// Success and failure
// ============================================================================

#[tokio::test]
async fn test_success_with_json_body() {
    let h = Harness::new();
    let log = CallbackLog::new();
    h.transport.respond(json_response(200, json!({"id": 1, "name": "Ada"})));
    let action = users_call()
        .on_request(log.record("onRequest"))
        .on_success(log.record("onSuccess"))
        .on_failure(log.record("onFailure"))
        .build();

    let output = h.dispatch(action).await;

    assert_eq!(output, Some(2));
    let fsas = h.next.fsas();
    assert_eq!(fsas.len(), 2);

    assert_eq!(fsas[0].action_type, "FETCH_USER_REQUEST".into());
    assert_eq!(fsas[0].payload, None);
    assert!(!fsas[0].error);

    assert_eq!(fsas[1].action_type, "FETCH_USER_SUCCESS".into());
    assert_eq!(fsas[1].value_payload(), Some(&V::from(json!({"id": 1, "name": "Ada"}))));
    assert!(!fsas[1].error);

    let request = fsas[0].request.clone().unwrap();
    assert_eq!(fsas[1].request.as_ref(), Some(&request));
    assert_eq!(log.names(), vec!["onRequest", "onSuccess"]);
    assert!(log.calls().iter().all(|call| call.request_id == Some(request.id())));

    let sent = h.transport.last_request().unwrap();
    assert_eq!(sent.method, Method::Get);
    assert_eq!(sent.url, "http://127.0.0.1/api/users/1");
}

#[tokio::test]
async fn test_error_status_emits_api_error() {
    let h = Harness::new();
    let log = CallbackLog::new();
    h.transport.respond(json_response(404, json!({"error": "Resource not found"})));
    let action = users_call()
        .on_success(log.record("onSuccess"))
        .on_failure(log.record("onFailure"))
        .build();

    h.dispatch(action).await;

    let failure = h.next.last_fsa().unwrap();
    assert_eq!(failure.action_type, "FETCH_USER_FAILURE".into());
    assert!(failure.error);
    assert_eq!(
        failure.error_payload(),
        Some(&RsaaError::api(404, "Not Found", Some(json!({"error": "Resource not found"}))))
    );
    assert!(failure.request.is_some());
    assert_eq!(log.names(), vec!["onFailure"]);
}

#[tokio::test]
async fn test_non_json_success_has_no_payload() {
    let h = Harness::new();
    h.transport.respond(text_response(200, "hello"));

    h.dispatch(users_call().build()).await;

    let success = h.next.last_fsa().unwrap();
    assert_eq!(success.action_type, "FETCH_USER_SUCCESS".into());
    assert_eq!(success.payload, None);
    assert!(!success.error);
}

#[tokio::test]
async fn test_non_json_error_has_no_response_body() {
    let h = Harness::new();
    h.transport.respond(text_response(500, "boom"));

    h.dispatch(users_call().build()).await;

    assert_eq!(
        h.next.last_fsa().unwrap().error_payload(),
        Some(&RsaaError::api(500, "Internal Server Error", None))
    );
}

#[tokio::test]
async fn test_transport_refusal_emits_failure_only() {
    let h = Harness::new();
    let log = CallbackLog::new();
    h.transport.reject("relative URL without a base");
    let action = users_call()
        .on_request(log.record("onRequest"))
        .on_failure(log.record("onFailure"))
        .build();

    let output = h.dispatch(action).await;

    assert_eq!(output, Some(1));
    assert_eq!(
        h.next.fsas(),
        vec![Fsa::failed(
            "FETCH_USER_FAILURE",
            RsaaError::request("relative URL without a base")
        )]
    );
    assert_eq!(log.names(), vec!["onFailure"]);
    assert_eq!(log.calls()[0].request_id, None);
}

#[tokio::test]
async fn test_unserializable_body_is_refused() {
    let h = Harness::new();
    h.transport.respond(json_response(200, json!({})));
    let action = users_call()
        .with_body(V::object([("when", V::Symbol(Symbol::new("now")))]))
        .build();

    h.dispatch(action).await;

    assert_eq!(h.next.types(), vec!["FETCH_USER_FAILURE"]);
    assert_eq!(h.transport.request_count(), 0);
}

#[tokio::test]
async fn test_network_failure_emits_request_error() {
    let h = Harness::new();
    h.transport.fail_network("connection refused");
    let log = CallbackLog::new();
    let action = users_call().on_failure(log.record("onFailure")).build();

    h.dispatch(action).await;

    let failure = h.next.last_fsa().unwrap();
    assert_eq!(h.next.types(), vec!["FETCH_USER_REQUEST", "FETCH_USER_FAILURE"]);
    assert!(failure.error);
    assert_eq!(failure.error_payload(), Some(&RsaaError::request("connection refused")));
    assert_eq!(log.calls()[0].request_id, failure.request.as_ref().map(|handle| handle.id()));
}

// ============================================================================
// Payload and meta resolvers
// ============================================================================

#[tokio::test]
async fn test_custom_payload_and_meta_see_the_response() {
    let h = Harness::new();
    h.transport.respond(json_response(201, json!({"id": 7})));
    h.state.update(|state| state.user_id = 42);
    let action = users_call()
        .with_types(
            TypeBuilder::new("REQUEST").with_payload(V::from("starting")),
            TypeBuilder::new("SUCCESS")
                .with_payload_fn(|ctx| {
                    let status = ctx.response().map_or(0, |response| u64::from(response.status()));
                    Ok(V::from(status))
                })
                .with_meta_fn(|ctx| Ok(V::from(ctx.state().user_id))),
            "FAILURE",
        )
        .build();

    h.dispatch(action).await;

    let fsas = h.next.fsas();
    assert_eq!(fsas[0].value_payload(), Some(&V::from("starting")));
    assert_eq!(fsas[1].value_payload(), Some(&V::from(201_u64)));
    assert_eq!(fsas[1].meta, Some(V::from(42_u64)));
}

#[tokio::test]
async fn test_failing_payload_becomes_internal_error() {
    let h = Harness::new();
    h.transport.respond(json_response(200, json!({})));
    let action = users_call()
        .with_types(
            "REQUEST",
            TypeBuilder::new("SUCCESS").with_payload_fn(|_| Err(ResolverError::new("boom"))),
            "FAILURE",
        )
        .build();

    h.dispatch(action).await;

    let success = h.next.last_fsa().unwrap();
    assert_eq!(success.action_type, "SUCCESS".into());
    assert!(success.error);
    assert_eq!(success.error_payload(), Some(&RsaaError::internal("boom")));
}

#[tokio::test]
async fn test_failing_meta_becomes_internal_error() {
    let h = Harness::new();
    h.transport.respond(json_response(200, json!({"ok": true})));
    let action = users_call()
        .with_types(
            "REQUEST",
            TypeBuilder::new("SUCCESS").with_meta_fn(|_| Err(ResolverError::new("boom"))),
            "FAILURE",
        )
        .build();

    h.dispatch(action).await;

    let success = h.next.last_fsa().unwrap();
    assert!(success.error);
    assert_eq!(success.error_payload(), Some(&RsaaError::internal("boom")));
    assert_eq!(success.meta, None);
}

#[tokio::test]
async fn test_common_meta_applies_to_every_type() {
    let h = Harness::new();
    h.transport.respond(json_response(200, json!({})));
    let action = users_call()
        .with_types(
            "REQUEST",
            TypeBuilder::new("SUCCESS").with_meta(V::from("own")),
            "FAILURE",
        )
        .with_meta(V::from("common"))
        .build();

    h.dispatch(action).await;

    let fsas = h.next.fsas();
    assert_eq!(fsas[0].meta, Some(V::from("common")));
    assert_eq!(fsas[1].meta, Some(V::from("own")));
}

// ============================================================================
// Abort
// ============================================================================

#[tokio::test]
async fn test_abort_with_abort_type() {
    let h = Harness::new();
    let log = CallbackLog::new();
    h.transport.hang();
    let action = users_call()
        .with_types_and_abort("REQUEST", "SUCCESS", "FAILURE", "ABORT")
        .on_request(log.abort_on_call("onRequest"))
        .on_success(log.record("onSuccess"))
        .on_failure(log.record("onFailure"))
        .build();

    let output = h.dispatch(action).await;

    assert_eq!(output, Some(2));
    let fsas = h.next.fsas();
    assert_eq!(h.next.types(), vec!["REQUEST", "ABORT"]);
    assert!(!fsas[1].error);
    assert_eq!(fsas[1].request, fsas[0].request);
    assert_eq!(log.names(), vec!["onRequest"]);
}

#[tokio::test]
async fn test_abort_without_abort_type_is_a_failure() {
    let h = Harness::new();
    let log = CallbackLog::new();
    h.transport.hang();
    let action = users_call()
        .on_request(log.abort_on_call("onRequest"))
        .on_failure(log.record("onFailure"))
        .build();

    h.dispatch(action).await;

    let failure = h.next.last_fsa().unwrap();
    assert_eq!(failure.action_type, "FETCH_USER_FAILURE".into());
    assert!(failure.error);
    assert_eq!(failure.error_payload(), Some(&RsaaError::request(ABORTED_MESSAGE)));
    assert_eq!(log.names(), vec!["onRequest", "onFailure"]);
}

#[tokio::test]
async fn test_abort_while_in_flight() {
    let h = Harness::new();
    let log = CallbackLog::new();
    h.transport.respond_after(Duration::from_secs(60), json_response(200, json!({})));
    let action = users_call()
        .with_types_and_abort("REQUEST", "SUCCESS", "FAILURE", "ABORT")
        .on_request(log.record("onRequest"))
        .build();

    let aborter = async {
        while log.handles().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        log.handles()[0].abort();
    };
    let (output, ()) = tokio::join!(h.dispatch(action), aborter);

    assert_eq!(output, Some(2));
    assert_eq!(h.next.types(), vec!["REQUEST", "ABORT"]);
}

#[tokio::test]
async fn test_abort_after_settling_has_no_effect() {
    let h = Harness::new();
    let log = CallbackLog::new();
    h.transport.respond(json_response(200, json!({})));
    let action = users_call()
        .with_types_and_abort("REQUEST", "SUCCESS", "FAILURE", "ABORT")
        .on_success(log.abort_on_call("onSuccess"))
        .build();

    h.dispatch(action).await;

    assert_eq!(h.next.types(), vec!["REQUEST", "SUCCESS"]);
    assert!(log.handles()[0].is_aborted());
}

// ============================================================================
// Configuration
// ============================================================================

#[tokio::test]
async fn test_custom_ok_predicate() {
    let h = Harness::new();
    h.transport.respond(json_response(404, json!({"cached": true})));
    let middleware = h
        .middleware()
        .with_config(MiddlewareConfig::new().with_ok(|response| response.status() < 500));

    h.dispatch_with(middleware, users_call().build()).await;

    let success = h.next.last_fsa().unwrap();
    assert_eq!(success.action_type, "FETCH_USER_SUCCESS".into());
    assert_eq!(success.value_payload(), Some(&V::from(json!({"cached": true}))));
}

#[tokio::test]
async fn test_call_headers_override_default_headers() {
    let h = Harness::new();
    h.transport.respond(json_response(200, json!({})));
    h.state.set(AppState {
        token: Some("secret".to_string()),
        ..AppState::default()
    });
    let middleware = h.middleware().with_config(
        MiddlewareConfig::new()
            .with_default_header("accept", "application/json")
            .with_default_header("authorization", "Bearer default"),
    );
    let action = users_call()
        .with_headers_fn(|state: &AppState| {
            let token = state.token.clone().unwrap_or_default();
            Ok(V::object([("Authorization", V::from(format!("Bearer {token}")))]))
        })
        .with_query("expand", "teams")
        .with_credentials(Credentials::SameOrigin)
        .build();

    h.dispatch_with(middleware, action).await;

    let sent = h.transport.last_request().unwrap();
    assert_eq!(sent.headers.get("accept").map(String::as_str), Some("application/json"));
    assert_eq!(sent.headers.get("Authorization").map(String::as_str), Some("Bearer secret"));
    assert!(!sent.headers.contains_key("authorization"));
    assert_eq!(sent.query, vec![("expand".to_string(), "teams".to_string())]);
    assert_eq!(sent.credentials, Some(Credentials::SameOrigin));
}

#[tokio::test]
async fn test_endpoint_function_reads_fresh_state() {
    let h = Harness::new();
    h.transport.respond(json_response(200, json!({})));
    h.state.update(|state| state.user_id = 9);
    let action = users_call()
        .with_endpoint_fn(|state: &AppState| Ok(format!("http://127.0.0.1/api/users/{}", state.user_id)))
        .build();

    h.dispatch(action).await;

    assert_eq!(h.transport.last_request().unwrap().url, "http://127.0.0.1/api/users/9");
}

// ============================================================================
// Callbacks
// ============================================================================

#[tokio::test]
async fn test_failing_callbacks_do_not_change_output() {
    let h = Harness::new();
    h.transport.respond(json_response(200, json!({"id": 1})));
    let action = users_call()
        .on_request(|_| Err(ResolverError::new("onRequest broke")))
        .on_success(|_| Err(ResolverError::new("onSuccess broke")))
        .build();

    let output = h.dispatch(action).await;

    assert_eq!(output, Some(2));
    assert_eq!(h.next.types(), vec!["FETCH_USER_REQUEST", "FETCH_USER_SUCCESS"]);
    assert!(h.next.fsas().iter().all(|fsa| !fsa.error));
}

// ============================================================================
// Request ids and concurrency
// ============================================================================

#[tokio::test]
async fn test_request_ids_strictly_increase() {
    let h = Harness::new();
    let ids = RequestIdSource::starting_at(100);
    let middleware = h.middleware().with_id_source(ids.clone());
    for _ in 0..3 {
        h.transport.respond(json_response(200, json!({})));
        h.dispatch_with(middleware.clone(), users_call().build()).await;
    }

    let request_ids: Vec<u64> = h
        .next
        .fsas()
        .iter()
        .filter(|fsa| fsa.action_type == "FETCH_USER_REQUEST".into())
        .filter_map(|fsa| fsa.request.as_ref().map(|handle| handle.id()))
        .collect();
    assert_eq!(request_ids, vec![100, 101, 102]);
    assert_eq!(ids.next_id(), 103);
}

#[tokio::test]
async fn test_concurrent_dispatches_settle_independently() {
    let h = Harness::new();
    h.transport
        .respond_after(Duration::from_millis(50), json_response(200, json!({"n": "slow"})))
        .respond(json_response(200, json!({"n": "fast"})));
    let handler = h.middleware().configure(h.state.clone()).wrap(h.next.clone());

    let (slow, fast) = futures::join!(
        handler.dispatch(Action::Value(users_call().build())),
        handler.dispatch(Action::Value(users_call().build())),
    );

    assert!(slow.is_some());
    assert!(fast.is_some());
    let successes: Vec<V> = h
        .next
        .fsas()
        .iter()
        .filter_map(|fsa| fsa.value_payload().cloned())
        .collect();
    assert_eq!(
        successes,
        vec![V::from(json!({"n": "fast"})), V::from(json!({"n": "slow"}))]
    );
    assert_eq!(h.next.len(), 4);
}

#[tokio::test]
async fn test_closure_next_handler() {
    let transport = MockTransport::new();
    transport.respond(json_response(200, json!({})));
    let handler = ApiMiddleware::new(transport)
        .configure(AppState::default)
        .wrap(|action: Action<AppState>| action.as_fsa().map(|fsa| fsa.action_type.to_string()));

    let output = handler.dispatch(Action::Value(users_call().build())).await;

    assert_eq!(output, Some(Some("FETCH_USER_SUCCESS".to_string())));
    assert_eq!(
        handler.clone().dispatch(Action::Value(V::Null)).await,
        Some(None)
    );
}
