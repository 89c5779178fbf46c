//! # The event bus.
//!
//! A [`Reactor`] routes events to consumers by [`Selector`]:
//!
//! - [`Reactor::on`] registers a consumer under a selector.
//! - [`Reactor::notify`] finds every selector matching a key and schedules
//!   its consumers through the bus's [`Dispatch`]er — inline when the
//!   dispatcher is synchronous, fire-and-forget otherwise.
//! - [`Reactor::notify_selector`] is the direct form addressing a single
//!   selector.
//! - [`Reactor::notify_fault`] routes a failure by its concrete error type
//!   to handlers registered with a fault selector.
//! - [`Reactor::reply_to`] answers a request event on its reply-to key.
//!
//! ## Guarantees
//! - Consumers for one notification are invoked at most once each.
//! - For one selector, dispatch follows registration order.
//! - Nothing orders consumers across different selectors.
//!
//! A `Reactor` is a cheap cloneable handle over shared state, like the
//! dispatcherless end of a broadcast channel: clone it into whatever needs
//! to publish or subscribe.

use std::sync::{Arc, RwLock};

use crate::consumer::{Consume, ConsumeFault, FaultFn, FnConsumer};
use crate::dispatch::{default_dispatcher, Dispatch, SyncDispatcher};
use crate::error::Fault;
use crate::event::Event;
use crate::registry::Registry;
use crate::selector::{Key, Selector};

/// Selector-keyed event bus.
pub struct Reactor<P> {
    inner: Arc<ReactorInner<P>>,
}

struct ReactorInner<P> {
    consumers: Registry<Arc<dyn Consume<P>>>,
    // Shared with derived buses so fault handlers registered upstream see
    // faults routed on a child bus.
    faults: Arc<Registry<Arc<dyn ConsumeFault>>>,
    dispatcher: RwLock<Arc<dyn Dispatch>>,
}

impl<P> Clone for Reactor<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P> Default for Reactor<P>
where
    P: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Reactor<P>
where
    P: Send + Sync + 'static,
{
    /// Creates a bus with the default dispatcher: task-per-dispatch inside
    /// a Tokio runtime, inline otherwise.
    pub fn new() -> Self {
        Self::with_dispatcher(default_dispatcher())
    }

    /// Creates a bus with the given dispatcher.
    pub fn with_dispatcher(dispatcher: Arc<dyn Dispatch>) -> Self {
        Self {
            inner: Arc::new(ReactorInner {
                consumers: Registry::new(),
                faults: Arc::new(Registry::new()),
                dispatcher: RwLock::new(dispatcher),
            }),
        }
    }

    /// Builds the bus a derived (child) node uses: fresh data channels, the
    /// parent's fault registry, and inline dispatch so child fan-out runs
    /// on the parent's dispatch thread.
    pub(crate) fn derived<Q>(&self) -> Reactor<Q>
    where
        Q: Send + Sync + 'static,
    {
        Reactor {
            inner: Arc::new(ReactorInner {
                consumers: Registry::new(),
                faults: Arc::clone(&self.inner.faults),
                dispatcher: RwLock::new(Arc::new(SyncDispatcher::new())),
            }),
        }
    }

    /// Registers `consumer` under `selector`. Multiple registrations per
    /// selector are permitted; dispatch preserves registration order.
    pub fn on(&self, selector: Selector, consumer: Arc<dyn Consume<P>>) {
        self.inner.consumers.register(selector, consumer);
    }

    /// Registers a closure under `selector`.
    pub fn on_fn<F>(&self, selector: Selector, f: F)
    where
        F: Fn(Arc<Event<P>>) + Send + Sync + 'static,
    {
        self.on(selector, Arc::new(FnConsumer::new(f)));
    }

    /// Registers a fault handler under `selector` (normally a
    /// [`Selector::fault`] or [`Selector::any_fault`]).
    pub fn on_fault(&self, selector: Selector, consumer: Arc<dyn ConsumeFault>) {
        self.inner.faults.register(selector, consumer);
    }

    /// Registers a fault-handling closure under `selector`.
    pub fn on_fault_fn<F>(&self, selector: Selector, f: F)
    where
        F: Fn(Fault) + Send + Sync + 'static,
    {
        self.on_fault(selector, Arc::new(FaultFn::new(f)));
    }

    /// Schedules every consumer whose selector matches `key` with `event`.
    pub fn notify(&self, key: &Key, event: Event<P>) {
        self.dispatch(self.inner.consumers.select(key), event);
    }

    /// Direct form of [`Reactor::notify`]: schedules the consumers
    /// registered under a selector equal to `selector`.
    pub fn notify_selector(&self, selector: &Selector, event: Event<P>) {
        self.dispatch(self.inner.consumers.select_direct(selector), event);
    }

    /// Routes `fault` by its concrete error type. Handlers registered for
    /// that type or for any fault are scheduled with a shared copy.
    pub fn notify_fault(&self, fault: Fault) {
        let matched = self.inner.faults.select(&fault.key());
        if matched.is_empty() {
            return;
        }
        let dispatcher = self.dispatcher();
        for handler in matched {
            let fault = fault.clone();
            dispatcher.schedule(Box::pin(async move { handler.on_fault(fault).await }));
        }
    }

    /// Notifies `reply` on the reply-to key of `request`.
    ///
    /// A request without a reply-to key is logged and dropped.
    pub fn reply_to(&self, request: &Event<P>, reply: Event<P>) {
        match &request.reply_to {
            Some(key) => self.notify(key, reply),
            None => log::warn!("reply_to on an event with no reply-to key; dropping reply"),
        }
    }

    /// Replaces the bus's dispatcher.
    pub fn set_dispatcher(&self, dispatcher: Arc<dyn Dispatch>) {
        *self.inner.dispatcher.write().unwrap() = dispatcher;
    }

    /// The bus's current dispatcher.
    pub fn dispatcher(&self) -> Arc<dyn Dispatch> {
        Arc::clone(&self.inner.dispatcher.read().unwrap())
    }

    /// Schedules a single consumer invocation outside any registration —
    /// the late-subscription replay path.
    pub(crate) fn schedule_consumer(&self, consumer: Arc<dyn Consume<P>>, event: Event<P>) {
        let ev = Arc::new(event);
        self.dispatcher()
            .schedule(Box::pin(async move { consumer.on_event(ev).await }));
    }

    fn dispatch(&self, matched: Vec<Arc<dyn Consume<P>>>, event: Event<P>) {
        if matched.is_empty() {
            return;
        }
        let ev = Arc::new(event);
        let dispatcher = self.dispatcher();
        for consumer in matched {
            let ev = Arc::clone(&ev);
            dispatcher.schedule(Box::pin(async move { consumer.on_event(ev).await }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "boom")
        }
    }

    impl std::error::Error for Boom {}

    fn sync_bus<P: Send + Sync + 'static>() -> Reactor<P> {
        Reactor::with_dispatcher(Arc::new(SyncDispatcher::new()))
    }

    #[test]
    fn notify_reaches_matching_consumers_in_order() {
        let bus: Reactor<u32> = sync_bus();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (sel, key) = Selector::anonymous();

        for tag in ["a", "b"] {
            let seen = seen.clone();
            bus.on_fn(sel.clone(), move |ev| {
                seen.lock().unwrap().push((tag, ev.data));
            });
        }
        let (other_sel, _) = Selector::anonymous();
        let seen_other = seen.clone();
        bus.on_fn(other_sel, move |ev| {
            seen_other.lock().unwrap().push(("other", ev.data));
        });

        bus.notify(&key, Event::new(7));
        assert_eq!(*seen.lock().unwrap(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn notify_selector_addresses_one_selector() {
        let bus: Reactor<u32> = sync_bus();
        let hits = Arc::new(AtomicUsize::new(0));
        let (sel, _key) = Selector::anonymous();
        let counter = hits.clone();
        bus.on_fn(sel.clone(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        bus.notify_selector(&sel, Event::new(1));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn faults_route_by_type_and_catch_all() {
        let bus: Reactor<u32> = sync_bus();
        let typed = Arc::new(AtomicUsize::new(0));
        let any = Arc::new(AtomicUsize::new(0));

        let counter = typed.clone();
        bus.on_fault_fn(Selector::fault::<Boom>(), move |fault| {
            assert!(fault.is::<Boom>());
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = any.clone();
        bus.on_fault_fn(Selector::any_fault(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let miss = Arc::new(AtomicUsize::new(0));
        let counter = miss.clone();
        bus.on_fault_fn(Selector::fault::<std::io::Error>(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.notify_fault(Fault::new(Boom));
        assert_eq!(typed.load(Ordering::SeqCst), 1);
        assert_eq!(any.load(Ordering::SeqCst), 1);
        assert_eq!(miss.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn derived_bus_shares_fault_registry() {
        let bus: Reactor<u32> = sync_bus();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        bus.on_fault_fn(Selector::fault::<Boom>(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let child: Reactor<String> = bus.derived();
        child.notify_fault(Fault::new(Boom));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reply_to_routes_on_the_request_key() {
        let bus: Reactor<&'static str> = sync_bus();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (reply_sel, reply_key) = Selector::anonymous();
        let sink = seen.clone();
        bus.on_fn(reply_sel, move |ev| {
            sink.lock().unwrap().push(ev.data);
        });

        let request = Event::new("ping").with_reply_to(reply_key);
        bus.reply_to(&request, Event::new("pong"));
        // No reply-to key: logged and dropped.
        bus.reply_to(&Event::new("ping"), Event::new("ignored"));

        assert_eq!(*seen.lock().unwrap(), vec!["pong"]);
    }
}
