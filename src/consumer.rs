//! # Consumer traits: where events end up.
//!
//! A [`Consume`] receives data events from a bus; a [`ConsumeFault`]
//! receives routed failures. Both are async so a consumer can do real work
//! (I/O, channels) without blocking the dispatcher that invoked it.
//!
//! Closures are the common case and wrap via [`FnConsumer`] / [`FaultFn`];
//! most call sites go through the convenience methods on
//! [`Reactor`](crate::Reactor) and [`Composable`](crate::Composable) and
//! never name these types.
//!
//! # Example: custom consumer
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use reflow::{Consume, Event};
//!
//! struct Metrics;
//!
//! #[async_trait]
//! impl Consume<u64> for Metrics {
//!     async fn on_event(&self, ev: Arc<Event<u64>>) {
//!         // Forward ev.data to a metrics sink.
//!         let _ = ev.data;
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Fault;
use crate::event::Event;

/// Receives data events dispatched by a bus.
#[async_trait]
pub trait Consume<P>: Send + Sync {
    /// Called for every matched [`Event`]. The event is shared between the
    /// consumers of one notification.
    async fn on_event(&self, event: Arc<Event<P>>);
}

/// Receives faults routed by type through a bus.
#[async_trait]
pub trait ConsumeFault: Send + Sync {
    /// Called for every matched [`Fault`].
    async fn on_fault(&self, fault: Fault);
}

/// Adapts a plain closure into a [`Consume`].
pub struct FnConsumer<F>(F);

impl<F> FnConsumer<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<P, F> Consume<P> for FnConsumer<F>
where
    P: Send + Sync + 'static,
    F: Fn(Arc<Event<P>>) + Send + Sync,
{
    async fn on_event(&self, event: Arc<Event<P>>) {
        (self.0)(event);
    }
}

/// Adapts a plain closure into a [`ConsumeFault`].
pub struct FaultFn<F>(F);

impl<F> FaultFn<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> ConsumeFault for FaultFn<F>
where
    F: Fn(Fault) + Send + Sync,
{
    async fn on_fault(&self, fault: Fault) {
        (self.0)(fault);
    }
}

/// Reference consumer that logs every event it sees.
///
/// Enabled via the `logging` feature. Useful for demos and debugging.
#[cfg(feature = "logging")]
pub struct LogConsumer;

#[cfg(feature = "logging")]
#[async_trait]
impl<P> Consume<P> for LogConsumer
where
    P: std::fmt::Debug + Send + Sync + 'static,
{
    async fn on_event(&self, event: Arc<Event<P>>) {
        log::info!(
            "event data={:?} headers={} reply_to={:?}",
            event.data,
            event.headers.len(),
            event.reply_to
        );
    }
}
