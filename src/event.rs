//! # Events carried by the bus.
//!
//! An [`Event`] wraps a payload together with string headers and an
//! optional reply-to key:
//!
//! - **Payload** (`data`): arbitrary; the bus is typed per payload, so every
//!   event on one [`Reactor`](crate::Reactor) carries the same payload type.
//! - **Headers**: a small string-to-string map. Deferred sources stamp every
//!   event they emit with [`EXPECTED_ACCEPTS_HEADER`], the number of accepts
//!   after which the emitting node is considered complete (`-1` = streaming).
//! - **Reply-to** (`reply_to`): a per-request key used to correlate an
//!   RPC-style response back to the requester, see
//!   [`Reactor::reply_to`](crate::Reactor::reply_to).
//!
//! # Example
//! ```
//! use reflow::{Event, Key, EXPECTED_ACCEPTS_HEADER};
//!
//! let ev = Event::new("ping")
//!     .with_header("trace-id", "abc123")
//!     .with_reply_to(Key::name("answers"));
//!
//! assert_eq!(ev.data, "ping");
//! assert_eq!(ev.headers.get("trace-id"), Some("abc123"));
//! assert!(ev.headers.get(EXPECTED_ACCEPTS_HEADER).is_none());
//! ```

use std::collections::HashMap;

use crate::selector::Key;

/// Reserved header set by deferred sources: the emitting node's current
/// expected accept count at the time the event was dispatched.
pub const EXPECTED_ACCEPTS_HEADER: &str = "x-reactor-expectedAcceptCount";

/// String headers attached to an [`Event`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers {
    entries: HashMap<String, String>,
}

impl Headers {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for `name`, if set.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Sets `name` to `value`, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Whether `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, value)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A payload travelling through a [`Reactor`](crate::Reactor).
///
/// Events are shared between consumers of one notification, so the payload
/// type must be `Clone` wherever a consumer needs an owned copy.
#[derive(Clone, Debug)]
pub struct Event<P> {
    /// The payload.
    pub data: P,
    /// String headers; see [`EXPECTED_ACCEPTS_HEADER`].
    pub headers: Headers,
    /// Key to notify with the response, for request/reply exchanges.
    pub reply_to: Option<Key>,
}

impl<P> Event<P> {
    /// Creates an event with empty headers and no reply-to key.
    pub fn new(data: P) -> Self {
        Self {
            data,
            headers: Headers::new(),
            reply_to: None,
        }
    }

    /// Attaches a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Attaches a reply-to key.
    pub fn with_reply_to(mut self, key: Key) -> Self {
        self.reply_to = Some(key);
        self
    }
}
