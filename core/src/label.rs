//! Action type labels.
//!
//! Output actions are identified by a [`Label`]: either a plain string name or
//! a [`Symbol`]. Symbols are opaque, process-unique identifiers: two symbols
//! compare equal only when one is a clone of the other, regardless of their
//! descriptions.
//!
//! # Example
//!
//! ```
//! use rsaa_core::label::{Label, Symbol};
//!
//! let fetched = Symbol::new("USER_FETCHED");
//! let other = Symbol::new("USER_FETCHED");
//!
//! assert_ne!(fetched, other);
//! assert_eq!(Label::from(fetched.clone()), Label::Symbol(fetched));
//! assert_eq!(Label::from("REQUEST").as_name(), Some("REQUEST"));
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SYMBOL: AtomicU64 = AtomicU64::new(1);

/// An opaque unique identifier usable as an action type.
#[derive(Clone)]
pub struct Symbol {
    id: u64,
    description: Option<Arc<str>>,
}

impl Symbol {
    /// Create a new symbol with a description used only for display.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed),
            description: Some(Arc::from(description.into())),
        }
    }

    /// Create a new symbol without a description.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            id: NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed),
            description: None,
        }
    }

    /// The description given at creation, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl std::hash::Hash for Symbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description().unwrap_or(""))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The type of an output action.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Label {
    /// A string action type such as `"FETCH_USER_REQUEST"`
    Name(String),
    /// A symbol action type
    Symbol(Symbol),
}

impl Label {
    /// The string name, if this label is not a symbol.
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Symbol(_) => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Symbol(symbol) => fmt::Display::fmt(symbol, f),
        }
    }
}

impl From<&str> for Label {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for Label {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<Symbol> for Label {
    fn from(symbol: Symbol) -> Self {
        Self::Symbol(symbol)
    }
}
