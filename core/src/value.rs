//! Loosely-typed action values.
//!
//! Host actions are plain data that may embed functions (resolvers and
//! lifecycle callbacks) and symbols. [`Value`] is that data. The validator
//! turns a tagged `Value` into a typed [`CallApi`](crate::descriptor::CallApi);
//! everything downstream works on the typed form.
//!
//! `S` is the host state type seen by embedded functions.

use crate::handle::RequestHandle;
use crate::label::{Label, Symbol};
use crate::resolver::{ResolveContext, ResolverError};
use serde_json::Number;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Record of named values.
pub type Object<S> = BTreeMap<String, Value<S>>;

/// Function of the current state.
pub type StateFn<S> = Arc<dyn Fn(&S) -> Result<Value<S>, ResolverError> + Send + Sync>;

/// Function of a full [`ResolveContext`].
pub type DeriveFn<S> =
    Arc<dyn Fn(&ResolveContext<S>) -> Result<Value<S>, ResolverError> + Send + Sync>;

/// Lifecycle callback, receiving the in-flight call when there is one.
pub type CallbackFn =
    Arc<dyn Fn(Option<&RequestHandle>) -> Result<(), ResolverError> + Send + Sync>;

/// A function embedded in an action.
pub enum Function<S> {
    /// `endpoint`, `headers` and `bailout` resolvers
    State(StateFn<S>),
    /// `payload` and `meta` resolvers
    Derive(DeriveFn<S>),
    /// `onRequest`, `onSuccess` and `onFailure`
    Callback(CallbackFn),
}

impl<S> Clone for Function<S> {
    fn clone(&self) -> Self {
        match self {
            Self::State(f) => Self::State(Arc::clone(f)),
            Self::Derive(f) => Self::Derive(Arc::clone(f)),
            Self::Callback(f) => Self::Callback(Arc::clone(f)),
        }
    }
}

impl<S> PartialEq for Function<S> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::State(a), Self::State(b)) => Arc::ptr_eq(a, b),
            (Self::Derive(a), Self::Derive(b)) => Arc::ptr_eq(a, b),
            (Self::Callback(a), Self::Callback(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<S> fmt::Debug for Function<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State(_) => write!(f, "Function::State(<function>)"),
            Self::Derive(_) => write!(f, "Function::Derive(<function>)"),
            Self::Callback(_) => write!(f, "Function::Callback(<function>)"),
        }
    }
}

/// A value carried by a host action.
pub enum Value<S> {
    /// Absence of a value
    Null,
    /// Boolean
    Bool(bool),
    /// Number
    Number(Number),
    /// String
    String(String),
    /// Symbol
    Symbol(Symbol),
    /// Ordered sequence
    Array(Vec<Value<S>>),
    /// Plain record
    Object(Object<S>),
    /// Embedded function
    Function(Function<S>),
}

impl<S> Value<S> {
    /// Build an object from key/value pairs.
    #[must_use]
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Self)>,
    {
        Self::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build an array.
    #[must_use]
    pub fn array(items: impl IntoIterator<Item = Self>) -> Self {
        Self::Array(items.into_iter().collect())
    }

    /// Embed a state resolver.
    #[must_use]
    pub fn state_fn<F>(f: F) -> Self
    where
        F: Fn(&S) -> Result<Self, ResolverError> + Send + Sync + 'static,
    {
        Self::Function(Function::State(Arc::new(f)))
    }

    /// Embed a payload/meta resolver.
    #[must_use]
    pub fn derive_fn<F>(f: F) -> Self
    where
        F: Fn(&ResolveContext<S>) -> Result<Self, ResolverError> + Send + Sync + 'static,
    {
        Self::Function(Function::Derive(Arc::new(f)))
    }

    /// Embed a lifecycle callback.
    #[must_use]
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(Option<&RequestHandle>) -> Result<(), ResolverError> + Send + Sync + 'static,
    {
        Self::Function(Function::Callback(Arc::new(f)))
    }

    /// Short name of the variant, used in log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Symbol(_) => "symbol",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Function(_) => "function",
        }
    }

    /// The string, if this is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The boolean, if this is one.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The record, if this is one.
    #[must_use]
    pub const fn as_object(&self) -> Option<&Object<S>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// The elements, if this is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// The function, if this is one.
    #[must_use]
    pub const fn as_function(&self) -> Option<&Function<S>> {
        match self {
            Self::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Look up a key of an object value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Render a string, number or boolean as text (header and query values).
    #[must_use]
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Self::String(s) => Some(s.clone()),
            Self::Number(n) => Some(n.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Convert to JSON. Symbols and functions have no JSON form.
    #[must_use]
    pub fn to_json(&self) -> Option<serde_json::Value> {
        Some(match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Value::Number(n.clone()),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Array(items) => serde_json::Value::Array(
                items.iter().map(Self::to_json).collect::<Option<Vec<_>>>()?,
            ),
            Self::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| v.to_json().map(|v| (k.clone(), v)))
                    .collect::<Option<serde_json::Map<_, _>>>()?,
            ),
            Self::Symbol(_) | Self::Function(_) => return None,
        })
    }
}

impl<S> Clone for Value<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Null => Self::Null,
            Self::Bool(b) => Self::Bool(*b),
            Self::Number(n) => Self::Number(n.clone()),
            Self::String(s) => Self::String(s.clone()),
            Self::Symbol(s) => Self::Symbol(s.clone()),
            Self::Array(items) => Self::Array(items.clone()),
            Self::Object(map) => Self::Object(map.clone()),
            Self::Function(f) => Self::Function(f.clone()),
        }
    }
}

impl<S> PartialEq for Value<S> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Symbol(a), Self::Symbol(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => a == b,
            _ => false,
        }
    }
}

impl<S> fmt::Debug for Value<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Symbol(s) => write!(f, "{s:?}"),
            Self::Array(items) => f.debug_list().entries(items).finish(),
            Self::Object(map) => f.debug_map().entries(map).finish(),
            Self::Function(func) => write!(f, "{func:?}"),
        }
    }
}

impl<S> From<serde_json::Value> for Value<S> {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            },
            serde_json::Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            },
        }
    }
}

impl<S> From<&str> for Value<S> {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl<S> From<String> for Value<S> {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl<S> From<bool> for Value<S> {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<S> From<i64> for Value<S> {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl<S> From<u64> for Value<S> {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

impl<S> From<Symbol> for Value<S> {
    fn from(symbol: Symbol) -> Self {
        Self::Symbol(symbol)
    }
}

impl<S> From<Label> for Value<S> {
    fn from(label: Label) -> Self {
        match label {
            Label::Name(name) => Self::String(name),
            Label::Symbol(symbol) => Self::Symbol(symbol),
        }
    }
}

impl<S> From<Vec<Value<S>>> for Value<S> {
    fn from(items: Vec<Value<S>>) -> Self {
        Self::Array(items)
    }
}
