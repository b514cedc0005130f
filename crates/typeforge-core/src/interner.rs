//! Symbol interning for member and type names.
//!
//! Every name that takes part in a [`Signature`](crate::signature::Signature)
//! is interned once so that signature comparison and hashing never touch
//! string data.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// An interned name.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash, PartialOrd, Ord, Serialize)]
pub struct Name(pub u32);

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "name#{}", self.0)
    }
}

#[derive(Debug, Default)]
struct Symbols {
    by_text: HashMap<Arc<str>, Name>,
    texts: Vec<Arc<str>>,
}

/// A thread-safe string interner.
///
/// Shared between the type universe and every definition built on it, so
/// a name interned while registering a base type compares equal to the
/// same name used by a generated override.
#[derive(Debug, Default)]
pub struct Interner {
    symbols: Mutex<Symbols>,
}

impl Interner {
    pub fn new() -> Interner {
        Interner::default()
    }

    /// Intern `text`, returning the existing [`Name`] if already known.
    pub fn intern(&self, text: &str) -> Name {
        let mut symbols = self.symbols.lock();

        if let Some(&name) = symbols.by_text.get(text) {
            return name;
        }

        let shared: Arc<str> = Arc::from(text);
        let name = Name(symbols.texts.len() as u32);
        symbols.texts.push(shared.clone());
        symbols.by_text.insert(shared, name);
        name
    }

    /// Find the name for `text` without interning it.
    pub fn lookup(&self, text: &str) -> Option<Name> {
        self.symbols.lock().by_text.get(text).copied()
    }

    /// Text of a previously interned [`Name`].
    ///
    /// Names from a different interner resolve to `"<unknown>"`.
    pub fn resolve(&self, name: Name) -> Arc<str> {
        self.symbols
            .lock()
            .texts
            .get(name.0 as usize)
            .cloned()
            .unwrap_or_else(|| Arc::from("<unknown>"))
    }

    pub fn len(&self) -> usize {
        self.symbols.lock().texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
