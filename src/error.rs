//! # Error types used by the composition engine.
//!
//! Two types cover the error surface:
//!
//! - [`Fault`] — a type-erased failure travelling through the bus. It keeps
//!   the concrete error type's identity so fault routing can match handlers
//!   registered for that type ([`Composable::when`](crate::Composable::when)).
//! - [`FlowError`] — the public error enum surfaced by reading operations
//!   such as [`Composable::get`](crate::Composable::get).
//!
//! Rust has no subtype relation between error types, so class-hierarchy
//! routing collapses to exact type identity; a handler for "any fault" is
//! registered via [`Composable::when_any`](crate::Composable::when_any).

use std::any::TypeId;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::selector::Key;

/// A type-erased failure routed through a bus.
///
/// Cloning a `Fault` is cheap; the underlying error is shared.
#[derive(Clone)]
pub struct Fault {
    type_id: TypeId,
    inner: Arc<dyn StdError + Send + Sync + 'static>,
}

impl Fault {
    /// Wraps a concrete error, capturing its type identity for routing.
    pub fn new<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            type_id: TypeId::of::<E>(),
            inner: Arc::new(err),
        }
    }

    /// Identity of the wrapped error's concrete type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The routing key this fault is notified under.
    pub fn key(&self) -> Key {
        Key::Fault(self.type_id)
    }

    /// Whether the wrapped error is an `E`.
    pub fn is<E: StdError + 'static>(&self) -> bool {
        self.type_id == TypeId::of::<E>()
    }

    /// Borrows the wrapped error as an `E`, if that is its concrete type.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Fault").field(&self.inner).finish()
    }
}

impl StdError for Fault {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.inner.as_ref() as &(dyn StdError + 'static))
    }
}

/// Errors surfaced when reading a composition's result.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum FlowError {
    /// A fault was latched on the node; the composition will not produce a
    /// usable value.
    #[error("composition faulted: {fault}")]
    Faulted {
        /// The latched fault.
        fault: Fault,
    },
}

impl FlowError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            FlowError::Faulted { .. } => "flow_faulted",
        }
    }

    /// The underlying fault.
    pub fn fault(&self) -> &Fault {
        match self {
            FlowError::Faulted { fault } => fault,
        }
    }
}
