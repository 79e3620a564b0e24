//! Schema validation for tagged actions.
//!
//! A tagged action is an object value owning the [`RSAA`] key; its value is
//! the call descriptor. Validation parses the loosely-typed descriptor into a
//! [`CallApi`], collecting every violation instead of stopping at the first.
//! [`validate_rsaa`] and [`is_valid_rsaa`] are views of [`parse_rsaa`], so the
//! dispatcher's validity gate and the typed call can never disagree.
//!
//! All functions here are total and pure: any value can be passed in, nothing
//! panics and nothing is mutated.
//!
//! # Example
//!
//! ```
//! use rsaa_core::value::Value;
//! use rsaa_core::validation::{RSAA, validate_rsaa};
//!
//! let action: Value<()> = Value::object([(
//!     RSAA,
//!     Value::object([("method", Value::from("FETCH"))]),
//! )]);
//!
//! assert_eq!(
//!     validate_rsaa(&action),
//!     vec![
//!         "[RSAA] must have an endpoint property".to_string(),
//!         "Invalid [RSAA].method: FETCH".to_string(),
//!         "[RSAA] must have a types property".to_string(),
//!     ]
//! );
//! ```

use crate::descriptor::{CallApi, MetaSource, Payload, PayloadSource, TypeDescriptor, TypeSpec, TypeSpecs};
use crate::label::Label;
use crate::resolver::{Resolvable, ResolverError};
use crate::transport::{Credentials, Headers, Method, Query};
use crate::value::{CallbackFn, Function, Object, StateFn, Value};
use std::sync::Arc;

/// The reserved key that tags an action for this middleware.
pub const RSAA: &str = "@@rsaa/RSAA";

/// Keys allowed in a call descriptor.
pub const CALL_API_KEYS: [&str; 12] = [
    "endpoint",
    "method",
    "body",
    "headers",
    "query",
    "credentials",
    "bailout",
    "types",
    "meta",
    "onRequest",
    "onSuccess",
    "onFailure",
];

/// Keys allowed in a type descriptor.
pub const TYPE_DESCRIPTOR_KEYS: [&str; 4] = ["type", "payload", "request", "meta"];

const NOT_AN_RSAA: &str = "RSAAs must be plain JavaScript objects with an [RSAA] property";

/// Whether `action` is an object owning the [`RSAA`] key.
#[must_use]
pub fn is_rsaa<S>(action: &Value<S>) -> bool {
    action.as_object().is_some_and(|root| root.contains_key(RSAA))
}

/// Whether `value` is a valid type descriptor record.
///
/// The record may only have `type`, `payload`, `request` and `meta` keys, and
/// `type` must be a string or a symbol.
#[must_use]
pub fn is_valid_type_descriptor<S: 'static>(value: &Value<S>) -> bool {
    parse_type_descriptor(value).is_some()
}

/// Check `action` against the RSAA schema.
///
/// Returns every violation found, in a fixed order; an empty list means the
/// action is valid.
#[must_use]
pub fn validate_rsaa<S: 'static>(action: &Value<S>) -> Vec<String> {
    parse_rsaa(action).err().unwrap_or_default()
}

/// Whether `action` satisfies the RSAA schema.
#[must_use]
pub fn is_valid_rsaa<S: 'static>(action: &Value<S>) -> bool {
    parse_rsaa(action).is_ok()
}

/// Extract the request type of a tagged action without validating it.
///
/// Used to report an invalid action: the first entry of `[RSAA].types` if it
/// is a label, or the `type` of a descriptor record in that position.
#[must_use]
pub fn request_label<S>(action: &Value<S>) -> Option<Label> {
    let first = action.get(RSAA)?.get("types")?.as_array()?.first()?;
    parse_label(first).or_else(|| first.get("type").and_then(parse_label))
}

/// The `onRequest` callback of a tagged action, valid or not.
#[must_use]
pub fn raw_on_request<S>(action: &Value<S>) -> Option<CallbackFn> {
    match action.get(RSAA)?.get("onRequest")? {
        Value::Function(Function::Callback(f)) => Some(Arc::clone(f)),
        _ => None,
    }
}

/// Parse a tagged action into a typed call.
///
/// # Errors
///
/// Returns every schema violation when the action is not a valid RSAA.
pub fn parse_rsaa<S: 'static>(action: &Value<S>) -> Result<CallApi<S>, Vec<String>> {
    let Some(root) = action.as_object().filter(|root| root.contains_key(RSAA)) else {
        return Err(vec![NOT_AN_RSAA.to_string()]);
    };

    let mut errors = Vec::new();

    for key in root.keys().filter(|key| key.as_str() != RSAA) {
        errors.push(format!("Invalid root key: {key}"));
    }

    let empty = Object::new();
    let call = match root.get(RSAA) {
        Some(Value::Object(call)) => call,
        _ => {
            errors.push("[RSAA] property must be a plain JavaScript object".to_string());
            &empty
        },
    };

    for key in call.keys() {
        if !CALL_API_KEYS.contains(&key.as_str()) {
            errors.push(format!("Invalid [RSAA] key: {key}"));
        }
    }

    let endpoint = parse_endpoint(call.get("endpoint"), &mut errors);
    let method = parse_method(call.get("method"), &mut errors);
    let headers = parse_headers(call.get("headers"), &mut errors);
    let query = parse_query(call.get("query"), &mut errors);
    let credentials = parse_credentials(call.get("credentials"), &mut errors);
    let bailout = parse_bailout(call.get("bailout"), &mut errors);
    let types = parse_types(call.get("types"), &mut errors);
    let meta = parse_common_meta(call.get("meta"), &mut errors);
    let on_request = parse_callback("onRequest", call.get("onRequest"), &mut errors);
    let on_success = parse_callback("onSuccess", call.get("onSuccess"), &mut errors);
    let on_failure = parse_callback("onFailure", call.get("onFailure"), &mut errors);

    match (endpoint, method, types) {
        (Some(endpoint), Some(method), Some(types)) if errors.is_empty() => Ok(CallApi {
            endpoint,
            method,
            body: call.get("body").cloned(),
            headers,
            query,
            credentials,
            bailout,
            types,
            meta,
            on_request,
            on_success,
            on_failure,
        }),
        _ => Err(errors),
    }
}

fn parse_label<S>(value: &Value<S>) -> Option<Label> {
    match value {
        Value::String(name) => Some(Label::Name(name.clone())),
        Value::Symbol(symbol) => Some(Label::Symbol(symbol.clone())),
        _ => None,
    }
}

fn parse_type_spec<S: 'static>(value: &Value<S>) -> Option<TypeSpec<S>> {
    parse_label(value)
        .map(TypeSpec::Label)
        .or_else(|| parse_type_descriptor(value).map(TypeSpec::Descriptor))
}

fn parse_type_descriptor<S: 'static>(value: &Value<S>) -> Option<TypeDescriptor<S>> {
    let record = value.as_object()?;
    if record
        .keys()
        .any(|key| !TYPE_DESCRIPTOR_KEYS.contains(&key.as_str()))
    {
        return None;
    }

    let resolver_slots = [record.get("payload"), record.get("meta")];
    if resolver_slots.into_iter().flatten().any(is_non_payload_function) {
        return None;
    }

    let mut descriptor = TypeDescriptor::new(parse_label(record.get("type")?)?);
    descriptor.payload = record.get("payload").map(payload_source);
    descriptor.meta = record.get("meta").map(meta_source);
    Some(descriptor)
}

/// State functions and callbacks cannot compute a payload or meta.
const fn is_non_payload_function<S>(value: &Value<S>) -> bool {
    matches!(value, Value::Function(Function::State(_) | Function::Callback(_)))
}

fn payload_source<S: 'static>(value: &Value<S>) -> PayloadSource<S> {
    match value {
        Value::Function(Function::Derive(f)) => {
            let f = Arc::clone(f);
            Resolvable::resolver(move |ctx| f(ctx).map(|value| Some(Payload::Value(value))))
        },
        other => Resolvable::Literal(Some(Payload::Value(other.clone()))),
    }
}

fn meta_source<S: 'static>(value: &Value<S>) -> MetaSource<S> {
    match value {
        Value::Function(Function::Derive(f)) => Resolvable::Resolver(Arc::clone(f)),
        other => Resolvable::Literal(other.clone()),
    }
}

/// Adapt a state function returning a loose value into a typed resolver.
fn typed_resolver<S: 'static, T: 'static>(
    f: &StateFn<S>,
    convert: fn(Value<S>) -> Result<T, ResolverError>,
) -> Resolvable<S, T> {
    let f = Arc::clone(f);
    Resolvable::resolver(move |state| f(state).and_then(convert))
}

fn parse_endpoint<S: 'static>(
    value: Option<&Value<S>>,
    errors: &mut Vec<String>,
) -> Option<Resolvable<S, String>> {
    match value {
        None => {
            errors.push("[RSAA] must have an endpoint property".to_string());
            None
        },
        Some(Value::String(url)) => Some(Resolvable::Literal(url.clone())),
        Some(Value::Function(Function::State(f))) => Some(typed_resolver(f, |value| match value {
            Value::String(url) => Ok(url),
            other => Err(ResolverError::new(format!(
                "endpoint function returned a {}",
                other.kind()
            ))),
        })),
        Some(_) => {
            errors.push("[RSAA].endpoint property must be a string or a function".to_string());
            None
        },
    }
}

fn parse_method<S>(value: Option<&Value<S>>, errors: &mut Vec<String>) -> Option<Method> {
    match value {
        None => {
            errors.push("[RSAA] must have a method property".to_string());
            None
        },
        Some(Value::String(name)) => {
            let method = Method::parse(name);
            if method.is_none() {
                errors.push(format!("Invalid [RSAA].method: {}", name.to_uppercase()));
            }
            method
        },
        Some(_) => {
            errors.push("[RSAA].method property must be a string".to_string());
            None
        },
    }
}

/// Render the values of a record as text, naming the first key that fails.
fn scalar_entries<S>(record: &Object<S>) -> Result<Vec<(String, String)>, String> {
    record
        .iter()
        .map(|(key, value)| {
            value
                .scalar_text()
                .map(|text| (key.clone(), text))
                .ok_or_else(|| key.clone())
        })
        .collect()
}

fn headers_from_value<S>(value: Value<S>) -> Result<Headers, ResolverError> {
    match value {
        Value::Object(record) => scalar_entries(&record)
            .map(|entries| entries.into_iter().collect())
            .map_err(|key| ResolverError::new(format!("header {key} is not a scalar"))),
        other => Err(ResolverError::new(format!(
            "headers function returned a {}",
            other.kind()
        ))),
    }
}

fn parse_headers<S: 'static>(
    value: Option<&Value<S>>,
    errors: &mut Vec<String>,
) -> Option<Resolvable<S, Headers>> {
    match value? {
        Value::Object(record) => match scalar_entries(record) {
            Ok(entries) => Some(Resolvable::Literal(entries.into_iter().collect())),
            Err(key) => {
                errors.push(format!("Invalid [RSAA].headers value: {key}"));
                None
            },
        },
        Value::Function(Function::State(f)) => Some(typed_resolver(f, headers_from_value)),
        _ => {
            errors.push(
                "[RSAA].headers property must be undefined, a plain JavaScript object, or a function"
                    .to_string(),
            );
            None
        },
    }
}

fn parse_query<S>(value: Option<&Value<S>>, errors: &mut Vec<String>) -> Query {
    match value {
        None => Query::new(),
        Some(Value::Object(record)) => scalar_entries(record).unwrap_or_else(|key| {
            errors.push(format!("Invalid [RSAA].query value: {key}"));
            Query::new()
        }),
        Some(_) => {
            errors.push(
                "[RSAA].query property must be undefined, or a plain JavaScript object".to_string(),
            );
            Query::new()
        },
    }
}

fn parse_credentials<S>(value: Option<&Value<S>>, errors: &mut Vec<String>) -> Option<Credentials> {
    match value? {
        Value::String(mode) => {
            let credentials = Credentials::parse(mode);
            if credentials.is_none() {
                errors.push(format!("Invalid [RSAA].credentials: {mode}"));
            }
            credentials
        },
        _ => {
            errors.push("[RSAA].credentials property must be undefined, or a string".to_string());
            None
        },
    }
}

fn parse_bailout<S: 'static>(
    value: Option<&Value<S>>,
    errors: &mut Vec<String>,
) -> Option<Resolvable<S, bool>> {
    match value? {
        Value::Bool(bailout) => Some(Resolvable::Literal(*bailout)),
        Value::Function(Function::State(f)) => Some(typed_resolver(f, |value| match value {
            Value::Bool(bailout) => Ok(bailout),
            other => Err(ResolverError::new(format!(
                "bailout function returned a {}",
                other.kind()
            ))),
        })),
        _ => {
            errors.push(
                "[RSAA].bailout property must be undefined, a boolean, or a function".to_string(),
            );
            None
        },
    }
}

fn parse_types<S: 'static>(value: Option<&Value<S>>, errors: &mut Vec<String>) -> Option<TypeSpecs<S>> {
    let entries = match value {
        None => {
            errors.push("[RSAA] must have a types property".to_string());
            return None;
        },
        Some(Value::Array(entries)) if matches!(entries.len(), 3 | 4) => entries,
        Some(_) => {
            errors.push("[RSAA].types property must be an array of length 3 or 4".to_string());
            return None;
        },
    };

    let mut checked = |index: usize, name: &str| {
        let spec = entries.get(index).and_then(parse_type_spec);
        if spec.is_none() {
            errors.push(format!("Invalid {name} type"));
        }
        spec
    };

    let request = checked(0, "request");
    let success = checked(1, "success");
    let failure = checked(2, "failure");
    let abort = if entries.len() == 4 {
        Some(checked(3, "abort")?)
    } else {
        None
    };

    Some(TypeSpecs {
        request: request?,
        success: success?,
        failure: failure?,
        abort,
    })
}

fn parse_common_meta<S: 'static>(
    value: Option<&Value<S>>,
    errors: &mut Vec<String>,
) -> Option<MetaSource<S>> {
    match value? {
        other if is_non_payload_function(other) => {
            errors.push("[RSAA].meta property must be a value or a payload function".to_string());
            None
        },
        other => Some(meta_source(other)),
    }
}

fn parse_callback<S>(
    name: &str,
    value: Option<&Value<S>>,
    errors: &mut Vec<String>,
) -> Option<CallbackFn> {
    match value? {
        Value::Function(Function::Callback(f)) => Some(Arc::clone(f)),
        _ => {
            errors.push(format!("[RSAA].{name} property must be a function, or undefined"));
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::Symbol;
    use serde_json::json;

    type V = Value<()>;

    fn rsaa(call: V) -> V {
        V::object([(RSAA, call)])
    }

    fn valid_call() -> Vec<(&'static str, V)> {
        vec![
            ("endpoint", V::from("http://127.0.0.1/api/users/1")),
            ("method", V::from("GET")),
            (
                "types",
                V::array([V::from("REQUEST"), V::from("SUCCESS"), V::from("FAILURE")]),
            ),
        ]
    }

    fn with(extra: Vec<(&'static str, V)>) -> V {
        let mut entries = valid_call();
        for (key, value) in extra {
            entries.retain(|(k, _)| *k != key);
            entries.push((key, value));
        }
        rsaa(V::object(entries))
    }

    #[test]
    fn test_is_rsaa() {
        assert!(!is_rsaa(&V::from("")));
        assert!(!is_rsaa(&V::object(Vec::<(String, V)>::new())));
        assert!(is_rsaa(&rsaa(V::object(Vec::<(String, V)>::new()))));
        assert!(!is_rsaa(&V::array([V::from(RSAA)])));
    }

    #[test]
    fn test_is_valid_type_descriptor() {
        assert!(!is_valid_type_descriptor(&V::from("")));
        assert!(!is_valid_type_descriptor(&V::object([
            ("type", V::from("")),
            ("invalidKey", V::from("")),
        ])));
        assert!(!is_valid_type_descriptor(&V::object(Vec::<(String, V)>::new())));
        assert!(!is_valid_type_descriptor(&V::object([(
            "type",
            V::object(Vec::<(String, V)>::new())
        )])));
        assert!(is_valid_type_descriptor(&V::object([("type", V::from(""))])));
        assert!(is_valid_type_descriptor(&V::object([(
            "type",
            V::from(Symbol::anonymous())
        )])));
        assert!(is_valid_type_descriptor(&V::object([
            ("type", V::from("SUCCESS")),
            ("payload", V::from("p")),
            ("request", V::Null),
            ("meta", V::derive_fn(|_| Ok(V::Null))),
        ])));
    }

    #[test]
    fn test_descriptor_rejects_functions_that_cannot_compute_payload() {
        let state_payload = V::object([
            ("type", V::from("SUCCESS")),
            ("payload", V::state_fn(|()| Ok(V::Null))),
        ]);
        let callback_meta = V::object([
            ("type", V::from("SUCCESS")),
            ("meta", V::callback(|_| Ok(()))),
        ]);
        assert!(!is_valid_type_descriptor(&state_payload));
        assert!(!is_valid_type_descriptor(&callback_meta));

        let types = V::array([V::from("REQUEST"), state_payload, callback_meta]);
        assert_eq!(
            validate_rsaa(&with(vec![("types", types)])),
            vec!["Invalid success type".to_string(), "Invalid failure type".to_string()]
        );
    }

    #[test]
    fn test_non_rsaa_reports_single_violation() {
        assert_eq!(validate_rsaa(&V::from("")), vec![NOT_AN_RSAA.to_string()]);
        assert_eq!(
            validate_rsaa(&V::object([("type", V::from("PLAIN"))])),
            vec![NOT_AN_RSAA.to_string()]
        );
    }

    #[test]
    fn test_valid_rsaa() {
        assert!(validate_rsaa(&with(vec![])).is_empty());
        assert!(is_valid_rsaa(&with(vec![])));
    }

    #[test]
    fn test_invalid_root_keys() {
        let action = V::object([
            (RSAA, V::object(valid_call())),
            ("invalidKey", V::from("")),
        ]);
        assert_eq!(validate_rsaa(&action), vec!["Invalid root key: invalidKey".to_string()]);
    }

    #[test]
    fn test_call_descriptor_must_be_an_object() {
        let errors = validate_rsaa(&rsaa(V::from("")));
        assert_eq!(
            errors,
            vec![
                "[RSAA] property must be a plain JavaScript object".to_string(),
                "[RSAA] must have an endpoint property".to_string(),
                "[RSAA] must have a method property".to_string(),
                "[RSAA] must have a types property".to_string(),
            ]
        );
    }

    #[test]
    fn test_unknown_call_keys() {
        let errors = validate_rsaa(&with(vec![("invalidKey", V::from(""))]));
        assert_eq!(errors, vec!["Invalid [RSAA] key: invalidKey".to_string()]);
    }

    #[test]
    fn test_missing_required_fields_are_all_reported() {
        let errors = validate_rsaa(&rsaa(V::object(Vec::<(String, V)>::new())));
        assert_eq!(
            errors,
            vec![
                "[RSAA] must have an endpoint property".to_string(),
                "[RSAA] must have a method property".to_string(),
                "[RSAA] must have a types property".to_string(),
            ]
        );
    }

    #[test]
    fn test_endpoint_shape() {
        let errors = validate_rsaa(&with(vec![("endpoint", V::object(Vec::<(String, V)>::new()))]));
        assert_eq!(errors, vec!["[RSAA].endpoint property must be a string or a function".to_string()]);

        assert!(is_valid_rsaa(&with(vec![(
            "endpoint",
            V::state_fn(|()| Ok(V::from("http://127.0.0.1/api")))
        )])));

        // A payload-style function is not a state resolver.
        assert!(!is_valid_rsaa(&with(vec![("endpoint", V::derive_fn(|_| Ok(V::Null)))])));
    }

    #[test]
    fn test_method_shape() {
        assert_eq!(
            validate_rsaa(&with(vec![("method", V::object(Vec::<(String, V)>::new()))])),
            vec!["[RSAA].method property must be a string".to_string()]
        );
        assert_eq!(
            validate_rsaa(&with(vec![("method", V::from("InvalidMethod"))])),
            vec!["Invalid [RSAA].method: INVALIDMETHOD".to_string()]
        );
        assert!(is_valid_rsaa(&with(vec![("method", V::from("post"))])));
    }

    #[test]
    fn test_headers_shape() {
        assert_eq!(
            validate_rsaa(&with(vec![("headers", V::from(""))])),
            vec!["[RSAA].headers property must be undefined, a plain JavaScript object, or a function"
                .to_string()]
        );
        assert_eq!(
            validate_rsaa(&with(vec![(
                "headers",
                V::object([("X-Nested", V::array([]))])
            )])),
            vec!["Invalid [RSAA].headers value: X-Nested".to_string()]
        );
        assert!(is_valid_rsaa(&with(vec![(
            "headers",
            V::object([("Accept", V::from("application/json")), ("X-Retry", V::from(2_u64))])
        )])));
        assert!(is_valid_rsaa(&with(vec![(
            "headers",
            V::state_fn(|()| Ok(V::object(Vec::<(String, V)>::new())))
        )])));
    }

    #[test]
    fn test_query_shape() {
        assert_eq!(
            validate_rsaa(&with(vec![("query", V::from("page=1"))])),
            vec!["[RSAA].query property must be undefined, or a plain JavaScript object".to_string()]
        );
        let Ok(call) = parse_rsaa(&with(vec![(
            "query",
            V::object([("page", V::from(2_u64)), ("q", V::from("rust"))])
        )])) else {
            unreachable!("query with scalars is valid");
        };
        assert_eq!(
            call.query,
            vec![
                ("page".to_string(), "2".to_string()),
                ("q".to_string(), "rust".to_string())
            ]
        );
    }

    #[test]
    fn test_credentials_shape() {
        assert_eq!(
            validate_rsaa(&with(vec![("credentials", V::object(Vec::<(String, V)>::new()))])),
            vec!["[RSAA].credentials property must be undefined, or a string".to_string()]
        );
        assert_eq!(
            validate_rsaa(&with(vec![("credentials", V::from("InvalidCredentials"))])),
            vec!["Invalid [RSAA].credentials: InvalidCredentials".to_string()]
        );
        assert!(is_valid_rsaa(&with(vec![("credentials", V::from("same-origin"))])));
    }

    #[test]
    fn test_bailout_shape() {
        assert_eq!(
            validate_rsaa(&with(vec![("bailout", V::from(""))])),
            vec!["[RSAA].bailout property must be undefined, a boolean, or a function".to_string()]
        );
        assert!(is_valid_rsaa(&with(vec![("bailout", V::from(false))])));
        assert!(is_valid_rsaa(&with(vec![("bailout", V::state_fn(|()| Ok(V::from(true))))])));
    }

    #[test]
    fn test_types_shape() {
        assert_eq!(
            validate_rsaa(&with(vec![("types", V::object(Vec::<(String, V)>::new()))])),
            vec!["[RSAA].types property must be an array of length 3 or 4".to_string()]
        );
        assert_eq!(
            validate_rsaa(&with(vec![("types", V::array([V::from("A"), V::from("B")]))])),
            vec!["[RSAA].types property must be an array of length 3 or 4".to_string()]
        );
        assert_eq!(
            validate_rsaa(&with(vec![(
                "types",
                V::array([V::object(Vec::<(String, V)>::new()), V::Null, V::from(1_u64), V::from(false)])
            )])),
            vec![
                "Invalid request type".to_string(),
                "Invalid success type".to_string(),
                "Invalid failure type".to_string(),
                "Invalid abort type".to_string(),
            ]
        );
        assert!(is_valid_rsaa(&with(vec![(
            "types",
            V::array([
                V::object([("type", V::from("REQUEST"))]),
                V::from(Symbol::new("SUCCESS")),
                V::from("FAILURE"),
                V::from("ABORT"),
            ])
        )])));
    }

    #[test]
    fn test_callbacks_shape() {
        assert_eq!(
            validate_rsaa(&with(vec![
                ("onRequest", V::from("")),
                ("onSuccess", V::state_fn(|()| Ok(V::Null))),
                ("onFailure", V::from(json!({}))),
            ])),
            vec![
                "[RSAA].onRequest property must be a function, or undefined".to_string(),
                "[RSAA].onSuccess property must be a function, or undefined".to_string(),
                "[RSAA].onFailure property must be a function, or undefined".to_string(),
            ]
        );
        assert!(is_valid_rsaa(&with(vec![("onSuccess", V::callback(|_| Ok(())))])));
    }

    #[test]
    fn test_common_meta_shape() {
        assert!(is_valid_rsaa(&with(vec![("meta", V::from(json!({"page": 1})))])));
        assert!(is_valid_rsaa(&with(vec![("meta", V::derive_fn(|_| Ok(V::Null)))])));
        assert_eq!(
            validate_rsaa(&with(vec![("meta", V::callback(|_| Ok(())))])),
            vec!["[RSAA].meta property must be a value or a payload function".to_string()]
        );
    }

    #[test]
    fn test_violations_are_collected_in_order() {
        let action = V::object([
            ("extra", V::Null),
            (
                RSAA,
                V::object([
                    ("endpoint", V::from(1_u64)),
                    ("method", V::from("fetch")),
                    ("nope", V::Null),
                ]),
            ),
        ]);
        assert_eq!(
            validate_rsaa(&action),
            vec![
                "Invalid root key: extra".to_string(),
                "Invalid [RSAA] key: nope".to_string(),
                "[RSAA].endpoint property must be a string or a function".to_string(),
                "Invalid [RSAA].method: FETCH".to_string(),
                "[RSAA] must have a types property".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_resolves_typed_fields() {
        let action = with(vec![
            ("endpoint", V::state_fn(|()| Ok(V::from("http://127.0.0.1/computed")))),
            ("bailout", V::state_fn(|()| Ok(V::from("not a bool")))),
        ]);
        let Ok(call) = parse_rsaa(&action) else {
            unreachable!("action is valid");
        };
        assert_eq!(call.method, Method::Get);
        assert_eq!(
            call.endpoint.resolve(&()).ok().as_deref(),
            Some("http://127.0.0.1/computed")
        );
        let bailout = call.bailout.map(|b| b.resolve(&()));
        assert!(matches!(bailout, Some(Err(_))));
    }

    #[test]
    fn test_request_label_extraction() {
        let by_name = rsaa(V::object([("types", V::array([V::from("REQUEST")]))]));
        assert_eq!(request_label(&by_name), Some(Label::from("REQUEST")));

        let by_descriptor = rsaa(V::object([(
            "types",
            V::array([V::object([("type", V::from("REQUEST")), ("bogus", V::Null)])]),
        )]));
        assert_eq!(request_label(&by_descriptor), Some(Label::from("REQUEST")));

        let none = rsaa(V::object([("types", V::array([V::from(1_u64)]))]));
        assert_eq!(request_label(&none), None);
        assert_eq!(request_label(&rsaa(V::Null)), None);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let action = with(vec![("method", V::from("nope")), ("bogus", V::Null)]);
        assert_eq!(validate_rsaa(&action), validate_rsaa(&action));
    }

    proptest::proptest! {
        #[test]
        fn test_every_unknown_key_is_reported(keys in proptest::collection::btree_set("[a-z]{3,10}", 1..6)) {
            let unknown: Vec<String> = keys
                .into_iter()
                .filter(|key| !CALL_API_KEYS.contains(&key.as_str()))
                .collect();
            let mut entries: Vec<(String, V)> = valid_call()
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect();
            entries.extend(unknown.iter().map(|key| (key.clone(), V::Null)));
            let action = rsaa(V::object(entries));

            let expected: Vec<String> = unknown
                .iter()
                .map(|key| format!("Invalid [RSAA] key: {key}"))
                .collect();
            proptest::prop_assert_eq!(validate_rsaa(&action), expected);
        }

        #[test]
        fn test_method_names_are_case_insensitive(upper in proptest::bool::ANY, index in 0_usize..7) {
            let name = ["GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"][index];
            let name = if upper { name.to_string() } else { name.to_lowercase() };
            proptest::prop_assert!(is_valid_rsaa(&with(vec![("method", V::from(name))])));
        }
    }
}
