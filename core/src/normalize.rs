//! Expansion of `[RSAA].types` into full type descriptors.
//!
//! Bare labels become `{type}` descriptors. The success and failure
//! descriptors get default payload resolvers unless the caller supplied a
//! payload, and the call-level meta is attached to every descriptor that has
//! none of its own.

use crate::descriptor::{MetaSource, Payload, PayloadSource, TypeDescriptor, TypeSpec, TypeSpecs};
use crate::error::RsaaError;
use crate::resolver::{ResolveContext, Resolvable, ResolverError};
use crate::value::Value;

/// The four lifecycle descriptors of a call, fully expanded.
pub struct NormalizedTypes<S> {
    /// Request descriptor
    pub request: TypeDescriptor<S>,
    /// Success descriptor, with the default JSON payload unless overridden
    pub success: TypeDescriptor<S>,
    /// Failure descriptor, with the default error payload unless overridden
    pub failure: TypeDescriptor<S>,
    /// Abort descriptor, when `types` had a fourth entry
    pub abort: Option<TypeDescriptor<S>>,
}

impl<S> std::fmt::Debug for NormalizedTypes<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalizedTypes")
            .field("request", &self.request)
            .field("success", &self.success)
            .field("failure", &self.failure)
            .field("abort", &self.abort)
            .finish()
    }
}

/// Expand `types` and apply the common `meta`.
///
/// Caller-supplied payload and meta always win over the defaults.
#[must_use]
pub fn normalize<S: 'static>(types: &TypeSpecs<S>, meta: Option<&MetaSource<S>>) -> NormalizedTypes<S> {
    let mut request = expand(&types.request);
    let mut success = expand(&types.success);
    let mut failure = expand(&types.failure);
    let mut abort = types.abort.as_ref().map(expand);

    success.payload.get_or_insert_with(default_success_payload);
    failure.payload.get_or_insert_with(default_failure_payload);

    if let Some(meta) = meta {
        for descriptor in [&mut request, &mut success, &mut failure]
            .into_iter()
            .chain(abort.as_mut())
        {
            descriptor.meta.get_or_insert_with(|| meta.clone());
        }
    }

    NormalizedTypes {
        request,
        success,
        failure,
        abort,
    }
}

fn expand<S>(spec: &TypeSpec<S>) -> TypeDescriptor<S> {
    match spec {
        TypeSpec::Label(label) => TypeDescriptor::new(label.clone()),
        TypeSpec::Descriptor(descriptor) => descriptor.clone(),
    }
}

/// The parsed JSON body of the response, or no payload when there is none.
///
/// A malformed JSON body fails the resolver.
#[must_use]
pub fn default_success_payload<S: 'static>() -> PayloadSource<S> {
    Resolvable::resolver(|ctx: &ResolveContext<S>| {
        let Some(response) = ctx.response() else {
            return Ok(None);
        };
        response
            .json()
            .map(|body| body.map(|json| Payload::Value(Value::from(json))))
            .map_err(|e| ResolverError::from_error(&e))
    })
}

/// An [`RsaaError::Api`] built from the response, or an
/// [`RsaaError::Request`] carrying the context error when there is no
/// response.
#[must_use]
pub fn default_failure_payload<S: 'static>() -> PayloadSource<S> {
    Resolvable::resolver(|ctx: &ResolveContext<S>| {
        let error = match ctx.response() {
            Some(response) => RsaaError::api(
                response.status(),
                response.status_text(),
                response.json().ok().flatten(),
            ),
            None => RsaaError::request(
                ctx.error().map(ToString::to_string).unwrap_or_default(),
            ),
        };
        Ok(Some(Payload::Error(error)))
    })
}
