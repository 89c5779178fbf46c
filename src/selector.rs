//! # Selectors and notification keys.
//!
//! A [`Key`] is what a notification is addressed with; a [`Selector`] decides
//! which registrations a key reaches. The two are kept separate so one
//! selector can cover many keys (predicate matching) while the common case
//! (a private channel) stays a cheap equality check.
//!
//! Three selector forms are built in:
//! - **Object** — matches a single key by equality. This is also what
//!   [`Selector::anonymous`] produces, paired with a process-unique key.
//! - **Fault** — matches fault-routing keys, either a single concrete error
//!   type or any fault at all. Used for error-class routing, see
//!   [`Composable::when`](crate::Composable::when).
//! - **Predicate** — delegates to an arbitrary function over keys; the
//!   extension point for richer matching schemes (patterns, templates).
//!
//! # Example
//! ```
//! use reflow::{Key, Selector};
//!
//! let (sel, key) = Selector::anonymous();
//! assert!(sel.matches(&key));
//!
//! let named = Selector::name("orders");
//! assert!(named.matches(&Key::name("orders")));
//! assert!(!named.matches(&Key::name("invoices")));
//! ```

use std::any::TypeId;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Global source of anonymous identities.
static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// A notification key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    /// Process-unique anonymous identity.
    Id(u64),
    /// Named channel.
    Name(String),
    /// Fault-routing key carrying the concrete error type.
    Fault(TypeId),
}

impl Key {
    /// Creates a named key.
    pub fn name(name: impl Into<String>) -> Self {
        Key::Name(name.into())
    }

    /// Creates the fault-routing key for error type `E`.
    pub fn fault_of<E: 'static>() -> Self {
        Key::Fault(TypeId::of::<E>())
    }

    pub(crate) fn next_id() -> Self {
        Key::Id(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A subscription matcher over [`Key`]s.
#[derive(Clone)]
pub enum Selector {
    /// Matches one key by equality.
    Object(Key),
    /// Matches fault keys; `None` matches every fault type.
    Fault(Option<TypeId>),
    /// Delegates matching to a predicate. The `u64` is a unique identity
    /// used for direct (selector-addressed) notification.
    Predicate(u64, Arc<dyn Fn(&Key) -> bool + Send + Sync>),
}

impl Selector {
    /// Selector matching exactly `key`.
    pub fn object(key: Key) -> Self {
        Selector::Object(key)
    }

    /// Selector matching the named key.
    pub fn name(name: impl Into<String>) -> Self {
        Selector::Object(Key::name(name))
    }

    /// Mints a fresh anonymous selector together with the one key it
    /// matches.
    pub fn anonymous() -> (Selector, Key) {
        let key = Key::next_id();
        (Selector::Object(key.clone()), key)
    }

    /// Selector matching faults of the concrete type `E`.
    pub fn fault<E: 'static>() -> Self {
        Selector::Fault(Some(TypeId::of::<E>()))
    }

    /// Selector matching every fault.
    pub fn any_fault() -> Self {
        Selector::Fault(None)
    }

    /// Selector delegating to `predicate`.
    pub fn predicate(predicate: impl Fn(&Key) -> bool + Send + Sync + 'static) -> Self {
        Selector::Predicate(NEXT_ID.fetch_add(1, Ordering::Relaxed), Arc::new(predicate))
    }

    /// Whether this selector matches `key`.
    pub fn matches(&self, key: &Key) -> bool {
        match self {
            Selector::Object(k) => k == key,
            Selector::Fault(None) => matches!(key, Key::Fault(_)),
            Selector::Fault(Some(t)) => matches!(key, Key::Fault(k) if k == t),
            Selector::Predicate(_, f) => f(key),
        }
    }
}

impl PartialEq for Selector {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Selector::Object(a), Selector::Object(b)) => a == b,
            (Selector::Fault(a), Selector::Fault(b)) => a == b,
            (Selector::Predicate(a, _), Selector::Predicate(b, _)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Selector {}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Object(k) => f.debug_tuple("Object").field(k).finish(),
            Selector::Fault(t) => f.debug_tuple("Fault").field(t).finish(),
            Selector::Predicate(id, _) => f.debug_tuple("Predicate").field(id).finish(),
        }
    }
}
