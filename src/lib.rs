//! # reflow
//!
//! **Reflow** is a reactive composition engine: a [`Composable`] represents
//! a deferred or streaming value, stages chain off it with `map`/`filter`/
//! `reduce`/`first`/`last`, and accepted values and faults propagate
//! asynchronously through a selector-keyed event bus ([`Reactor`]) via a
//! configurable dispatcher.
//!
//! ## Features
//!
//! | Area            | Description                                              | Key types / traits                      |
//! |-----------------|----------------------------------------------------------|-----------------------------------------|
//! | **Composition** | Deferred/streaming values with chainable stages.         | [`Composable`], [`Reduce`]              |
//! | **Event bus**   | Selector-keyed routing with request/reply support.       | [`Reactor`], [`Selector`], [`Event`]    |
//! | **Dispatch**    | Pluggable scheduling of consumer invocations.            | [`Dispatch`], [`TaskDispatcher`], [`QueueDispatcher`], [`SyncDispatcher`] |
//! | **Consumers**   | Async sinks for data events and routed faults.           | [`Consume`], [`ConsumeFault`]           |
//! | **Errors**      | Typed faults with by-type routing.                       | [`Fault`], [`FlowError`]                |
//! | **Configuration** | Process-wide default await timeout.                    | [`Config`]                              |
//!
//! ## Optional features
//! - `logging`: exports [`LogConsumer`], a consumer that logs every event
//!   _(demo/reference only)_.
//!
//! ```no_run
//! use std::sync::Arc;
//! use reflow::{Composable, SyncDispatcher};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), reflow::FlowError> {
//!     // A deferred source holds its values back until the first terminal
//!     // operation, then pushes them through the pipeline.
//!     let source = Composable::from_iter(vec![1, 2, 3]);
//!     source.set_dispatcher(Arc::new(SyncDispatcher::new()));
//!
//!     let total = source
//!         .map(|n| n * 2)
//!         .filter(|n| *n > 2)
//!         .reduce(|step| step.last + step.next, 0);
//!
//!     assert_eq!(total.wait().await?, Some(10));
//!     Ok(())
//! }
//! ```
//!
//! ---

mod composable;
mod config;
mod consumer;
mod dispatch;
mod error;
mod event;
mod reactor;
mod registry;
mod selector;

// ---- Public re-exports ----

pub use composable::{Composable, Reduce};
pub use config::{Config, MAX_AWAIT_TIMEOUT_ENV};
pub use consumer::{Consume, ConsumeFault, FaultFn, FnConsumer};
pub use dispatch::{Dispatch, DispatchTask, QueueDispatcher, SyncDispatcher, TaskDispatcher};
pub use error::{Fault, FlowError};
pub use event::{Event, Headers, EXPECTED_ACCEPTS_HEADER};
pub use reactor::Reactor;
pub use selector::{Key, Selector};

// Optional: expose a simple built-in event logger (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use consumer::LogConsumer;
