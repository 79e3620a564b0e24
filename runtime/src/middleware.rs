//! The lifecycle dispatcher.
//!
//! Construction mirrors the host's middleware signature in two stages:
//!
//! 1. [`ApiMiddleware::configure`] binds the state source,
//! 2. [`Configured::wrap`] binds the next handler,
//!
//! and [`ActionHandler::dispatch`] then processes one action at a time.
//!
//! # Lifecycle
//!
//! ```text
//! untagged ───────────────────────────────────────────────▶ next(action)
//! tagged ─▶ validate ─▶ invalid ──────────────────────────▶ request type + InvalidRSAA
//!                    └▶ normalize ─▶ bailout ─────────────▶ (nothing)
//!                                 └▶ resolve ─▶ failed ───▶ request type + RequestError
//!                                            └▶ perform ─▶ refused ─▶ failure type + RequestError
//!                                                       └▶ request type ─▶ success | failure | abort
//! ```
//!
//! Every path ends in at most one terminal action. Nothing is ever returned
//! as an error: failures are error actions handed to `next`.

use crate::config::MiddlewareConfig;
use crate::ids::RequestIdSource;
use crate::metrics::RequestMetrics;
use rsaa_core::descriptor::{CallApi, TypeDescriptor};
use rsaa_core::environment::{GetState, Next};
use rsaa_core::error::RsaaError;
use rsaa_core::fsa::{Action, Fsa, action_with};
use rsaa_core::handle::RequestHandle;
use rsaa_core::normalize::{NormalizedTypes, normalize};
use rsaa_core::resolver::{ResolveContext, ResolverError};
use rsaa_core::transport::{Body, HttpRequest, Transport};
use rsaa_core::validation::{is_rsaa, parse_rsaa, raw_on_request, request_label};
use rsaa_core::value::{CallbackFn, Value};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

/// Payload message when a call is aborted and no abort type was given.
pub const ABORTED_MESSAGE: &str = "[RSAA] request aborted";

/// The middleware before it is attached to a store.
///
/// # Example
///
/// ```
/// use rsaa_core::fsa::Action;
/// use rsaa_core::transport::{HttpRequest, ResponseFuture, Transport, TransportError};
/// use rsaa_core::value::Value;
/// use rsaa_runtime::middleware::ApiMiddleware;
///
/// struct Offline;
///
/// impl Transport for Offline {
///     fn perform(&self, _: HttpRequest) -> Result<ResponseFuture, TransportError> {
///         Err(TransportError::InvalidRequest("offline".to_string()))
///     }
/// }
///
/// # async fn example() {
/// let handler = ApiMiddleware::new(Offline)
///     .configure(|| ())
///     .wrap(|action: Action<()>| action);
///
/// // Untagged actions pass straight through.
/// let forwarded = handler.dispatch(Action::Value(Value::from("PING"))).await;
/// assert_eq!(forwarded, Some(Action::Value(Value::from("PING"))));
/// # }
/// ```
pub struct ApiMiddleware<T> {
    transport: Arc<T>,
    config: Arc<MiddlewareConfig>,
    ids: RequestIdSource,
}

impl<T: Transport> ApiMiddleware<T> {
    /// Middleware with the default configuration and its own id source.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            config: Arc::new(MiddlewareConfig::default()),
            ids: RequestIdSource::new(),
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: MiddlewareConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    /// Share an id source with other middleware instances.
    #[must_use]
    pub fn with_id_source(mut self, ids: RequestIdSource) -> Self {
        self.ids = ids;
        self
    }

    /// Bind the state source.
    #[must_use]
    pub fn configure<S, G>(&self, get_state: G) -> Configured<S, T, G>
    where
        G: GetState<S>,
    {
        Configured {
            transport: Arc::clone(&self.transport),
            config: Arc::clone(&self.config),
            ids: self.ids.clone(),
            get_state: Arc::new(get_state),
            _state: PhantomData,
        }
    }
}

impl<T> Clone for ApiMiddleware<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config: Arc::clone(&self.config),
            ids: self.ids.clone(),
        }
    }
}

impl<T> fmt::Debug for ApiMiddleware<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiMiddleware")
            .field("config", &self.config)
            .field("ids", &self.ids)
            .finish_non_exhaustive()
    }
}

/// The middleware bound to a state source.
pub struct Configured<S, T, G> {
    transport: Arc<T>,
    config: Arc<MiddlewareConfig>,
    ids: RequestIdSource,
    get_state: Arc<G>,
    _state: PhantomData<fn() -> S>,
}

impl<S, T, G> Configured<S, T, G> {
    /// Bind the next handler.
    #[must_use]
    pub fn wrap<N>(&self, next: N) -> ActionHandler<S, T, G, N>
    where
        N: Next<S>,
    {
        ActionHandler {
            stage: self.clone(),
            next: Arc::new(next),
        }
    }
}

impl<S, T, G> Clone for Configured<S, T, G> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config: Arc::clone(&self.config),
            ids: self.ids.clone(),
            get_state: Arc::clone(&self.get_state),
            _state: PhantomData,
        }
    }
}

impl<S, T, G> fmt::Debug for Configured<S, T, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configured")
            .field("config", &self.config)
            .field("ids", &self.ids)
            .finish_non_exhaustive()
    }
}

/// The fully wired middleware.
///
/// Cheap to clone; clones share the transport, state source, next handler
/// and id source. Concurrent dispatches are independent.
pub struct ActionHandler<S, T, G, N> {
    stage: Configured<S, T, G>,
    next: Arc<N>,
}

impl<S, T, G, N> Clone for ActionHandler<S, T, G, N> {
    fn clone(&self) -> Self {
        Self {
            stage: self.stage.clone(),
            next: Arc::clone(&self.next),
        }
    }
}

impl<S, T, G, N> fmt::Debug for ActionHandler<S, T, G, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionHandler")
            .field("stage", &self.stage)
            .finish_non_exhaustive()
    }
}

/// A field resolver that failed before the call could start.
struct FieldFailure {
    field: &'static str,
    error: ResolverError,
}

impl FieldFailure {
    fn in_field(field: &'static str) -> impl FnOnce(ResolverError) -> Self {
        move |error| Self { field, error }
    }
}

impl<S, T, G, N> ActionHandler<S, T, G, N>
where
    S: 'static,
    T: Transport,
    G: GetState<S>,
    N: Next<S>,
{
    /// Process one action.
    ///
    /// Returns what `next` returned for the last action this call emitted,
    /// or `None` when nothing was emitted (bailout, or an invalid action
    /// without a usable request type).
    #[tracing::instrument(skip(self, action), name = "rsaa_dispatch")]
    pub async fn dispatch(&self, action: Action<S>) -> Option<N::Output> {
        let action = match action {
            Action::Value(value) if is_rsaa(&value) => Arc::new(value),
            other => {
                tracing::debug!("Forwarding untagged action");
                RequestMetrics::record_passthrough();
                return Some(self.next.call(other));
            },
        };

        let call = match parse_rsaa(&action) {
            Ok(call) => call,
            Err(violations) => return self.reject(&action, violations),
        };
        let types = normalize(&call.types, call.meta.as_ref());

        match self.prepare(&call) {
            Ok(Some(request)) => Some(self.execute(action, call, types, request).await),
            Ok(None) => {
                tracing::debug!(action_type = %types.request.label, "Call skipped by bailout");
                RequestMetrics::record_bailout();
                None
            },
            Err(failure) => Some(self.fail_resolution(&action, types.request, &failure, call.on_request.as_ref())),
        }
    }

    fn state(&self) -> S {
        self.stage.get_state.get_state()
    }

    fn context(&self, action: &Arc<Value<S>>) -> ResolveContext<S> {
        ResolveContext::new(Arc::clone(action), self.state())
    }

    fn emit(&self, descriptor: TypeDescriptor<S>, ctx: &ResolveContext<S>) -> N::Output {
        self.next.call(Action::Fsa(action_with(descriptor, ctx)))
    }

    fn reject(&self, action: &Value<S>, violations: Vec<String>) -> Option<N::Output> {
        RequestMetrics::record_invalid();

        let Some(label) = request_label(action) else {
            tracing::warn!(?violations, "Dropping invalid RSAA without a request type");
            return None;
        };
        tracing::warn!(action_type = %label, ?violations, "Rejecting invalid RSAA");

        let output = self
            .next
            .call(Action::Fsa(Fsa::failed(label, RsaaError::invalid(violations))));
        notify("onRequest", raw_on_request(action).as_ref(), None);
        Some(output)
    }

    /// Resolve bailout, endpoint and headers, in that order, each against a
    /// fresh state snapshot. `Ok(None)` means bailout.
    fn prepare(&self, call: &CallApi<S>) -> Result<Option<HttpRequest>, FieldFailure> {
        if let Some(bailout) = &call.bailout {
            if bailout.resolve(&self.state()).map_err(FieldFailure::in_field("bailout"))? {
                return Ok(None);
            }
        }

        let url = call
            .endpoint
            .resolve(&self.state())
            .map_err(FieldFailure::in_field("endpoint"))?;

        let mut headers = self.stage.config.default_headers().clone();
        if let Some(call_headers) = &call.headers {
            let call_headers = call_headers
                .resolve(&self.state())
                .map_err(FieldFailure::in_field("headers"))?;
            for (name, value) in call_headers {
                headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
                headers.insert(name, value);
            }
        }

        let mut request = HttpRequest::new(call.method, url);
        request.headers = headers;
        request.query = call.query.clone();
        request.credentials = call.credentials;
        Ok(Some(request))
    }

    fn fail_resolution(
        &self,
        action: &Arc<Value<S>>,
        request: TypeDescriptor<S>,
        failure: &FieldFailure,
        on_request: Option<&CallbackFn>,
    ) -> N::Output {
        tracing::warn!(
            action_type = %request.label,
            field = failure.field,
            error = %failure.error,
            "Resolver failed, call not started"
        );
        RequestMetrics::record_resolver_failure(failure.field);

        let message = format!("[RSAA].{} function failed", failure.field);
        let output = self.emit(
            request.with_payload(RsaaError::request(message)).with_error(),
            &self.context(action),
        );
        notify("onRequest", on_request, None);
        output
    }

    async fn execute(
        &self,
        action: Arc<Value<S>>,
        call: CallApi<S>,
        types: NormalizedTypes<S>,
        mut request: HttpRequest,
    ) -> N::Output {
        let id = self.stage.ids.next_id();
        let method = request.method;
        let url = request.url.clone();

        let performed = call
            .body
            .as_ref()
            .map(Body::from_value)
            .transpose()
            .and_then(|body| {
                request.body = body.flatten();
                self.stage.transport.perform(request)
            });

        let response = match performed {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(request_id = id, %method, %url, error = %e, "Transport refused request");
                RequestMetrics::record_refused();
                let output = self.emit(
                    types.failure.with_payload(RsaaError::request(e.to_string())).with_error(),
                    &self.context(&action),
                );
                notify("onFailure", call.on_failure.as_ref(), None);
                return output;
            },
        };

        let started = Instant::now();
        let handle = RequestHandle::new(id);
        RequestMetrics::record_started();
        tracing::debug!(request_id = id, %method, %url, "Request started");

        self.emit(types.request.with_request(handle.clone()), &self.context(&action));
        notify("onRequest", call.on_request.as_ref(), Some(&handle));

        let outcome = tokio::select! {
            biased;
            () = handle.aborted() => None,
            result = response => Some(result),
        };

        match outcome {
            None => {
                tracing::info!(request_id = id, %method, %url, "Request aborted");
                RequestMetrics::record_aborted(started.elapsed());
                match types.abort {
                    Some(abort) => self.emit(abort.with_request(handle), &self.context(&action)),
                    None => {
                        let output = self.emit(
                            types
                                .failure
                                .with_payload(RsaaError::request(ABORTED_MESSAGE))
                                .with_error()
                                .with_request(handle.clone()),
                            &self.context(&action),
                        );
                        notify("onFailure", call.on_failure.as_ref(), Some(&handle));
                        output
                    },
                }
            },
            Some(Err(e)) => {
                tracing::warn!(request_id = id, %method, %url, error = %e, "Request failed");
                RequestMetrics::record_failed(started.elapsed());
                let error = RsaaError::request(e.to_string());
                let ctx = self.context(&action).with_error(error.clone());
                let output = self.emit(
                    types
                        .failure
                        .with_payload(error)
                        .with_error()
                        .with_request(handle.clone()),
                    &ctx,
                );
                notify("onFailure", call.on_failure.as_ref(), Some(&handle));
                output
            },
            Some(Ok(response)) => {
                let status = response.status();
                let response = Arc::new(response);
                let ctx = self.context(&action).with_response(Arc::clone(&response));

                if self.stage.config.is_ok(&response) {
                    tracing::info!(request_id = id, %method, %url, status, "Request succeeded");
                    RequestMetrics::record_succeeded(started.elapsed());
                    let output = self.emit(types.success.with_request(handle.clone()), &ctx);
                    notify("onSuccess", call.on_success.as_ref(), Some(&handle));
                    output
                } else {
                    tracing::info!(request_id = id, %method, %url, status, "Request failed with status");
                    RequestMetrics::record_failed(started.elapsed());
                    let output = self.emit(
                        types.failure.with_error().with_request(handle.clone()),
                        &ctx,
                    );
                    notify("onFailure", call.on_failure.as_ref(), Some(&handle));
                    output
                }
            },
        }
    }
}

/// Invoke a lifecycle callback. Its failure is logged and otherwise ignored.
fn notify(name: &'static str, callback: Option<&CallbackFn>, handle: Option<&RequestHandle>) {
    let Some(callback) = callback else {
        return;
    };
    if let Err(error) = callback(handle) {
        tracing::warn!(
            callback = name,
            request_id = handle.map(RequestHandle::id),
            %error,
            "Lifecycle callback failed"
        );
    }
}
