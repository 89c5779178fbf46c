//! # Composable value pipelines.
//!
//! A [`Composable<T>`] stands for a value (or a sequence of values) that may
//! not exist yet. Producers push values in with [`Composable::accept`];
//! consumers either subscribe ([`Composable::consume`]) or block on
//! completion ([`Composable::wait`]). Stages chain off a node with
//! [`map`](Composable::map), [`filter`](Composable::filter),
//! [`reduce`](Composable::reduce), [`first`](Composable::first) and
//! [`last`](Composable::last); each stage is a new node fed through the
//! parent's bus.
//!
//! ## Completion
//! A node is *complete* once a fault is latched, or once it has a value and
//! its accepted count has reached its expected accept count (−1 means
//! unbounded/streaming, which never completes by counting). Filter
//! rejections and per-item stage failures decrement the expected count, so
//! a bounded pipeline still completes when some inputs produce no output.
//!
//! ## Deferred sources
//! [`Composable::from_value`] and [`Composable::from_iter`] hold their
//! values back until the first terminal operation (`wait`/`get`), then emit
//! them exactly once, stamping each event with
//! [`EXPECTED_ACCEPTS_HEADER`](crate::EXPECTED_ACCEPTS_HEADER) and firing
//! the `first`/`last` channels around the emission. Stages derived from a
//! deferred source trigger the source's emission when they are awaited.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use reflow::{Composable, SyncDispatcher};
//!
//! # async fn demo() -> Result<(), reflow::FlowError> {
//! let source = Composable::from_iter(vec![1, 2, 3]);
//! source.set_dispatcher(Arc::new(SyncDispatcher::new()));
//!
//! let sum = source.map(|x| x * 2).reduce(|r| r.last + r.next, 0);
//! assert_eq!(sum.wait().await?, Some(12));
//! # Ok(())
//! # }
//! ```

use std::any::Any;
use std::error::Error as StdError;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::config;
use crate::consumer::{Consume, FnConsumer};
use crate::dispatch::Dispatch;
use crate::error::{Fault, FlowError};
use crate::event::{Event, EXPECTED_ACCEPTS_HEADER};
use crate::reactor::Reactor;
use crate::selector::{Key, Selector};

mod delayed;
mod reduce;

use delayed::{AcceptPhase, EmitGate, Trigger};
pub use reduce::Reduce;

/// A deferred or streaming value with chainable stages.
///
/// `Composable` is a cheap cloneable handle; clones observe the same node.
pub struct Composable<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Composable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<T> {
    observable: Reactor<T>,
    accept_key: Key,
    first_key: Key,
    last_key: Key,
    latch: Mutex<Latch<T>>,
    accepted: AtomicI64,
    // Shared so reduce stages can watch the parent's count without holding
    // a handle back to the parent node.
    expected: Arc<AtomicI64>,
    has_waiters: AtomicBool,
    wake: Notify,
    dispatcher: RwLock<Option<Arc<dyn Dispatch>>>,
    mode: AcceptMode,
    gate: Option<EmitGate>,
    delegate: Option<Arc<dyn Trigger>>,
    // Keeps a forwarding source alive for as long as this node is; data
    // still flows parent to child only.
    _upstream: Option<Arc<dyn Any + Send + Sync>>,
}

struct Latch<T> {
    value: Option<T>,
    error: Option<Fault>,
    pending: Option<Vec<T>>,
}

/// How `accept` behaves: deferred sources and their descendants stamp the
/// expected-count header and drive the `first`/`last` channels themselves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AcceptMode {
    Direct,
    Deferred,
}

impl<T> Composable<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates an empty live node on a fresh bus.
    pub fn new() -> Self {
        Self::with_observable(Reactor::new())
    }

    /// Creates an empty live node on the given bus.
    pub fn with_observable(observable: Reactor<T>) -> Self {
        Self::build(observable, -1, AcceptMode::Direct, None, None, None, None)
    }

    /// Creates a deferred node holding a single pre-bound value; its
    /// expected accept count is 1.
    pub fn from_value(value: T) -> Self {
        Self::from_iter([value])
    }

    /// Creates a deferred node holding a sequence of pre-bound values; its
    /// expected accept count is the sequence length.
    ///
    /// Nothing is emitted until the first terminal operation (`wait` or
    /// `get`) on this node or on a stage derived from it.
    pub fn from_iter<I>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let pending: Vec<T> = values.into_iter().collect();
        let expected = pending.len() as i64;
        Self::build(
            Reactor::new(),
            expected,
            AcceptMode::Deferred,
            Some(EmitGate::new()),
            None,
            None,
            Some(pending),
        )
    }

    /// Creates a live node forwarding every value accepted by `source`,
    /// sharing `source`'s bus. The new node starts unbounded.
    pub fn from_composable(source: &Composable<T>) -> Self {
        let c = Self::build(
            source.inner.observable.clone(),
            -1,
            AcceptMode::Direct,
            None,
            None,
            Some(source.inner.clone() as Arc<dyn Any + Send + Sync>),
            None,
        );
        let child = Arc::downgrade(&c.inner);
        source.on_accept(move |ev: Arc<Event<T>>| {
            if let Some(inner) = child.upgrade() {
                Composable { inner }.accept(ev.data.clone());
            }
        });
        c
    }

    /// Replaces the dispatcher on this node and its bus.
    pub fn set_dispatcher(&self, dispatcher: Arc<dyn Dispatch>) -> &Self {
        *self.inner.dispatcher.write().unwrap() = Some(Arc::clone(&dispatcher));
        self.inner.observable.set_dispatcher(dispatcher);
        self
    }

    /// The dispatcher set on this node, if any.
    pub fn dispatcher(&self) -> Option<Arc<dyn Dispatch>> {
        self.inner.dispatcher.read().unwrap().clone()
    }

    /// Sets the number of accepts after which this node is complete.
    ///
    /// When the node has already accepted that many values, the `last`
    /// channel fires with the latched value and waiters wake. Stages
    /// created earlier keep the count they snapshot at creation.
    pub fn set_expected_accept_count(&self, expected: i64) -> &Self {
        self.inner.expected.store(expected, Ordering::SeqCst);
        if self.inner.accepted.load(Ordering::SeqCst) >= expected {
            let value = self.inner.latch.lock().unwrap().value.clone();
            if let Some(v) = value {
                self.inner.observable.notify(&self.inner.last_key, Event::new(v));
            }
            self.inner.wake.notify_waiters();
        }
        self
    }

    /// The node's expected accept count; −1 means unbounded.
    pub fn expected_accept_count(&self) -> i64 {
        self.inner.expected.load(Ordering::SeqCst)
    }

    /// How many values this node has accepted so far.
    pub fn accepted_count(&self) -> i64 {
        self.inner.accepted.load(Ordering::SeqCst)
    }

    /// Pushes a value into the node: latches it, publishes it on the
    /// `accept` channel, and counts it.
    ///
    /// On a deferred-flavor node the event carries the expected-count
    /// header, the first accept also fires the `first` channel, and the
    /// accept that meets the expected count fires `last` and wakes waiters.
    pub fn accept(&self, value: T) {
        match self.inner.mode {
            AcceptMode::Direct => {
                let wake = {
                    let mut latch = self.inner.latch.lock().unwrap();
                    latch.value = Some(value.clone());
                    self.inner.has_waiters.load(Ordering::SeqCst)
                };
                if wake {
                    self.inner.wake.notify_waiters();
                }
                self.inner
                    .observable
                    .notify(&self.inner.accept_key, Event::new(value));
                self.inner.accepted.fetch_add(1, Ordering::SeqCst);
            }
            AcceptMode::Deferred => {
                {
                    let mut latch = self.inner.latch.lock().unwrap();
                    latch.value = Some(value.clone());
                }
                let n = self.inner.accepted.fetch_add(1, Ordering::SeqCst) + 1;
                let expected = self.inner.expected.load(Ordering::SeqCst);
                let ev = Event::new(value)
                    .with_header(EXPECTED_ACCEPTS_HEADER, expected.to_string());
                if n == 1 {
                    self.inner.observable.notify(&self.inner.first_key, ev.clone());
                }
                self.inner.observable.notify(&self.inner.accept_key, ev.clone());
                if n == expected {
                    self.inner.observable.notify(&self.inner.last_key, ev);
                    self.inner.wake.notify_waiters();
                }
            }
        }
    }

    /// Pushes a failure into the node: latches it, wakes waiters, and
    /// routes it by type through the bus so [`Composable::when`] handlers
    /// fire. Terminal for `get`, but registered consumers stay subscribed.
    pub fn accept_error<E>(&self, error: E)
    where
        E: StdError + Send + Sync + 'static,
    {
        self.accept_fault(Fault::new(error));
    }

    pub(crate) fn accept_fault(&self, fault: Fault) {
        let wake = {
            let mut latch = self.inner.latch.lock().unwrap();
            latch.error = Some(fault.clone());
            self.inner.mode == AcceptMode::Direct && self.inner.has_waiters.load(Ordering::SeqCst)
        };
        if wake {
            self.inner.wake.notify_waiters();
        }
        self.inner.observable.notify_fault(fault);
    }

    /// Registers a consumer for every accepted value.
    ///
    /// When a value is already latched, the consumer is instead scheduled
    /// once with that value — late subscription replays the last value
    /// only.
    pub fn consume<F>(&self, f: F) -> &Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.on_accept(move |ev: Arc<Event<T>>| f(ev.data.clone()));
        self
    }

    /// Registers a [`Consume`] implementation on the `accept` channel; same
    /// late-subscription behavior as [`Composable::consume`].
    pub fn consume_event(&self, consumer: Arc<dyn Consume<T>>) -> &Self {
        let key = self.inner.accept_key.clone();
        self.when_value(&key, consumer);
        self
    }

    /// Re-publishes every accepted value as an event on another bus under
    /// `selector`.
    pub fn consume_to(&self, selector: Selector, observable: &Reactor<T>) -> &Self {
        let obs = observable.clone();
        self.on_accept(move |ev: Arc<Event<T>>| {
            obs.notify_selector(&selector, Event::new(ev.data.clone()));
        });
        self
    }

    /// Registers a handler for faults of type `E` routed on this node's
    /// bus (its own failures and per-item failures of stages derived from
    /// it).
    pub fn when<E, F>(&self, handler: F) -> &Self
    where
        E: StdError + Send + Sync + 'static,
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.inner
            .observable
            .on_fault_fn(Selector::fault::<E>(), move |fault| {
                if let Some(e) = fault.downcast_ref::<E>() {
                    handler(e);
                }
            });
        self
    }

    /// Registers a handler for every fault routed on this node's bus.
    pub fn when_any<F>(&self, handler: F) -> &Self
    where
        F: Fn(&Fault) + Send + Sync + 'static,
    {
        self.inner
            .observable
            .on_fault_fn(Selector::any_fault(), move |fault| handler(&fault));
        self
    }

    /// New stage applying `f` to every accepted value.
    pub fn map<V, F>(&self, f: F) -> Composable<V>
    where
        V: Clone + Send + Sync + 'static,
        F: Fn(T) -> V + Send + Sync + 'static,
    {
        let c = self.derive::<V>(self.inner.observable.derived(), self.inner.mode);
        let child = Arc::downgrade(&c.inner);
        self.on_accept(move |ev: Arc<Event<T>>| {
            if let Some(inner) = child.upgrade() {
                Composable { inner }.accept(f(ev.data.clone()));
            }
        });
        c
    }

    /// Fallible [`Composable::map`]: an `Err` is routed into the stage's
    /// bus as a fault and accounts for one input via the expected count;
    /// this node is unaffected.
    pub fn try_map<V, E, F>(&self, f: F) -> Composable<V>
    where
        V: Clone + Send + Sync + 'static,
        E: StdError + Send + Sync + 'static,
        F: Fn(T) -> Result<V, E> + Send + Sync + 'static,
    {
        let c = self.derive::<V>(self.inner.observable.derived(), self.inner.mode);
        let child = Arc::downgrade(&c.inner);
        self.on_accept(move |ev: Arc<Event<T>>| {
            if let Some(inner) = child.upgrade() {
                let node = Composable { inner };
                match f(ev.data.clone()) {
                    Ok(v) => node.accept(v),
                    Err(e) => node.reject(Fault::new(e)),
                }
            }
        });
        c
    }

    /// New stage fed through a request/reply exchange: every accepted value
    /// is wrapped into an event carrying a fresh reply-to key and published
    /// on `observable` under `selector`; whatever is sent back via
    /// [`Reactor::reply_to`] feeds the stage.
    pub fn map_via(&self, selector: Selector, observable: &Reactor<T>) -> Composable<T> {
        let c = self.derive::<T>(observable.clone(), AcceptMode::Deferred);
        let (reply_sel, reply_key) = Selector::anonymous();

        let child = Arc::downgrade(&c.inner);
        observable.on_fn(reply_sel, move |ev: Arc<Event<T>>| {
            if let Some(inner) = child.upgrade() {
                Composable { inner }.accept(ev.data.clone());
            }
        });

        let obs = observable.clone();
        self.on_accept(move |ev: Arc<Event<T>>| {
            let request = Event::new(ev.data.clone()).with_reply_to(reply_key.clone());
            obs.notify_selector(&selector, request);
        });
        c
    }

    /// New stage keeping only the values `predicate` holds for. A rejected
    /// value accounts for one input via the expected count, so bounded
    /// pipelines still complete.
    pub fn filter<F>(&self, predicate: F) -> Composable<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let c = self.derive::<T>(self.inner.observable.derived(), self.inner.mode);
        let child = Arc::downgrade(&c.inner);
        self.on_accept(move |ev: Arc<Event<T>>| {
            if let Some(inner) = child.upgrade() {
                let node = Composable { inner };
                if predicate(&ev.data) {
                    node.accept(ev.data.clone());
                } else {
                    node.decrease_accept_length();
                }
            }
        });
        c
    }

    /// Fallible [`Composable::filter`]; an `Err` is handled like a
    /// [`Composable::try_map`] failure.
    pub fn try_filter<E, F>(&self, predicate: F) -> Composable<T>
    where
        E: StdError + Send + Sync + 'static,
        F: Fn(&T) -> Result<bool, E> + Send + Sync + 'static,
    {
        let c = self.derive::<T>(self.inner.observable.derived(), self.inner.mode);
        let child = Arc::downgrade(&c.inner);
        self.on_accept(move |ev: Arc<Event<T>>| {
            if let Some(inner) = child.upgrade() {
                let node = Composable { inner };
                match predicate(&ev.data) {
                    Ok(true) => node.accept(ev.data.clone()),
                    Ok(false) => node.decrease_accept_length(),
                    Err(e) => node.reject(Fault::new(e)),
                }
            }
        });
        c
    }

    /// New stage folding every accepted value into an accumulator seeded
    /// with `initial`.
    ///
    /// While this node is bounded the stage emits once, on this node's
    /// `last` channel, with the final accumulator; on an unbounded node it
    /// emits the running accumulator per step. The stage's expected accept
    /// count is 1.
    pub fn reduce<V, F>(&self, f: F, initial: V) -> Composable<V>
    where
        V: Clone + Send + Sync + 'static,
        F: Fn(Reduce<T, V>) -> V + Send + Sync + 'static,
    {
        self.reduce_stage(move |step| Ok::<V, Fault>(f(step)), initial)
    }

    /// Fallible [`Composable::reduce`]; an `Err` is handled like a
    /// [`Composable::try_map`] failure and the accumulator keeps its
    /// previous value.
    pub fn try_reduce<V, E, F>(&self, f: F, initial: V) -> Composable<V>
    where
        V: Clone + Send + Sync + 'static,
        E: StdError + Send + Sync + 'static,
        F: Fn(Reduce<T, V>) -> Result<V, E> + Send + Sync + 'static,
    {
        self.reduce_stage(move |step| f(step).map_err(Fault::new), initial)
    }

    fn reduce_stage<V, F>(&self, f: F, initial: V) -> Composable<V>
    where
        V: Clone + Send + Sync + 'static,
        F: Fn(Reduce<T, V>) -> Result<V, Fault> + Send + Sync + 'static,
    {
        let c = self.derive::<V>(self.inner.observable.derived(), self.inner.mode);
        c.inner.expected.store(1, Ordering::SeqCst);

        let acc = Arc::new(Mutex::new(initial));
        let parent_expected = Arc::clone(&self.inner.expected);

        let child = Arc::downgrade(&c.inner);
        let folded = Arc::clone(&acc);
        self.on_accept(move |ev: Arc<Event<T>>| {
            let Some(inner) = child.upgrade() else { return };
            let node = Composable { inner };
            let mut emit = None;
            let fault = {
                let mut acc = folded.lock().unwrap();
                match f(Reduce {
                    last: acc.clone(),
                    next: ev.data.clone(),
                }) {
                    Ok(v) => {
                        *acc = v;
                        if parent_expected.load(Ordering::SeqCst) < 0 {
                            emit = Some(acc.clone());
                        }
                        None
                    }
                    Err(fault) => Some(fault),
                }
            };
            match fault {
                Some(fault) => node.reject(fault),
                None => {
                    if let Some(v) = emit {
                        node.accept(v);
                    }
                }
            }
        });

        let child = Arc::downgrade(&c.inner);
        let last_key = self.inner.last_key.clone();
        self.when_value(
            &last_key,
            Arc::new(FnConsumer::new(move |_ev: Arc<Event<T>>| {
                if let Some(inner) = child.upgrade() {
                    let v = acc.lock().unwrap().clone();
                    Composable { inner }.accept(v);
                }
            })),
        );
        c
    }

    /// New stage triggered once, by the first value this node accepts.
    /// Only deferred-flavor nodes drive the `first` channel.
    pub fn first(&self) -> Composable<T> {
        self.channel_stage(self.inner.first_key.clone())
    }

    /// New stage triggered once, by the accept that meets this node's
    /// expected count.
    pub fn last(&self) -> Composable<T> {
        self.channel_stage(self.inner.last_key.clone())
    }

    fn channel_stage(&self, key: Key) -> Composable<T> {
        // first/last stages live on the parent's own bus.
        let c = self.derive::<T>(self.inner.observable.clone(), self.inner.mode);
        c.inner.expected.store(1, Ordering::SeqCst);
        let child = Arc::downgrade(&c.inner);
        self.when_value(
            &key,
            Arc::new(FnConsumer::new(move |ev: Arc<Event<T>>| {
                if let Some(inner) = child.upgrade() {
                    Composable { inner }.accept(ev.data.clone());
                }
            })),
        );
        c
    }

    /// Awaits completion with the process-wide default timeout, then
    /// returns [`Composable::get`].
    pub async fn wait(&self) -> Result<Option<T>, FlowError> {
        self.wait_for(Some(config::default_await_timeout())).await
    }

    /// Awaits completion or the deadline, then returns [`Composable::get`].
    ///
    /// `None` waits forever; `Some(Duration::ZERO)` polls once. On deadline
    /// expiry the latched state is returned as-is — a partial value or a
    /// latched fault; callers can tell the cases apart by re-checking
    /// completion. Dropping the returned future is the cancellation path
    /// and leaves the node consistent.
    pub async fn wait_for(&self, timeout: Option<Duration>) -> Result<Option<T>, FlowError> {
        self.delayed_accept().await;
        // Overflowing deadlines degrade to waiting forever.
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        loop {
            let notified = self.inner.wake.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            self.inner.has_waiters.store(true, Ordering::SeqCst);
            if self.is_complete() {
                break;
            }
            match deadline {
                None => notified.await,
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        break;
                    }
                }
            }
        }
        self.inner.has_waiters.store(false, Ordering::SeqCst);
        self.latched()
    }

    /// Triggers deferred emission, then returns the latched value without
    /// waiting for completion. Fails once a fault is latched; `Ok(None)`
    /// before the first accept.
    pub async fn get(&self) -> Result<Option<T>, FlowError> {
        self.delayed_accept().await;
        self.latched()
    }

    /// One input was consumed without producing an output (filter
    /// rejection or per-item stage failure): decrement the expected count
    /// and wake waiters when that alone completed the node.
    pub(crate) fn decrease_accept_length(&self) {
        let expected = self.inner.expected.fetch_sub(1, Ordering::SeqCst) - 1;
        if expected <= self.inner.accepted.load(Ordering::SeqCst) {
            self.inner.wake.notify_waiters();
        }
    }

    /// Per-item stage failure: report on this stage's bus, account for the
    /// input.
    fn reject(&self, fault: Fault) {
        self.inner.observable.notify_fault(fault);
        self.decrease_accept_length();
    }

    fn is_complete(&self) -> bool {
        let expected = self.inner.expected.load(Ordering::SeqCst);
        let latch = self.inner.latch.lock().unwrap();
        latch.error.is_some()
            || (latch.value.is_some()
                && expected >= 0
                && self.inner.accepted.load(Ordering::SeqCst) >= expected)
    }

    fn latched(&self) -> Result<Option<T>, FlowError> {
        let latch = self.inner.latch.lock().unwrap();
        match &latch.error {
            Some(fault) => Err(FlowError::Faulted {
                fault: fault.clone(),
            }),
            None => Ok(latch.value.clone()),
        }
    }

    /// Runs deferred emission exactly once across concurrent callers.
    /// Derived nodes delegate upstream until the owning source is reached.
    async fn delayed_accept(&self) {
        if let Some(delegate) = &self.inner.delegate {
            delegate.propagate().await;
            return;
        }
        let Some(gate) = &self.inner.gate else {
            return;
        };
        let snapshot = {
            let mut phase = gate.phase.lock().unwrap();
            match *phase {
                AcceptPhase::Accepted => return,
                AcceptPhase::Accepting => None,
                AcceptPhase::Delayed => {
                    // Phase lock before data latch, never the other way
                    // round.
                    let mut latch = self.inner.latch.lock().unwrap();
                    let snap = (latch.error.clone(), latch.pending.take(), latch.value.clone());
                    *phase = AcceptPhase::Accepting;
                    Some(snap)
                }
            }
        };
        match snapshot {
            Some((error, pending, value)) => {
                if let Some(fault) = error {
                    self.accept_fault(fault);
                } else if let Some(values) = pending {
                    for v in values {
                        self.accept(v);
                    }
                } else if let Some(v) = value {
                    self.accept(v);
                }
                *gate.phase.lock().unwrap() = AcceptPhase::Accepted;
                gate.done.notify_waiters();
            }
            None => gate.wait_done().await,
        }
    }

    /// Registers `consumer` under `key`, except that a subscription to the
    /// `accept` channel after a value is latched is replayed once instead.
    fn when_value(&self, key: &Key, consumer: Arc<dyn Consume<T>>) {
        let replay = {
            let latch = self.inner.latch.lock().unwrap();
            if *key == self.inner.accept_key {
                latch.value.clone()
            } else {
                None
            }
        };
        match replay {
            Some(value) => self
                .inner
                .observable
                .schedule_consumer(consumer, Event::new(value)),
            None => self
                .inner
                .observable
                .on(Selector::object(key.clone()), consumer),
        }
    }

    fn on_accept<F>(&self, f: F)
    where
        F: Fn(Arc<Event<T>>) + Send + Sync + 'static,
    {
        let key = self.inner.accept_key.clone();
        self.when_value(&key, Arc::new(FnConsumer::new(f)));
    }

    /// Builds a derived stage: expected count snapshotted from this node,
    /// an upstream delegation handle for deferred emission (which also
    /// keeps the chain alive through its terminal handle).
    fn derive<V>(&self, observable: Reactor<V>, mode: AcceptMode) -> Composable<V>
    where
        V: Clone + Send + Sync + 'static,
    {
        Composable::build(
            observable,
            self.inner.expected.load(Ordering::SeqCst),
            mode,
            None,
            Some(Arc::new(self.clone()) as Arc<dyn Trigger>),
            None,
            None,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        observable: Reactor<T>,
        expected: i64,
        mode: AcceptMode,
        gate: Option<EmitGate>,
        delegate: Option<Arc<dyn Trigger>>,
        upstream: Option<Arc<dyn Any + Send + Sync>>,
        pending: Option<Vec<T>>,
    ) -> Self {
        Composable {
            inner: Arc::new(Inner {
                observable,
                accept_key: Key::next_id(),
                first_key: Key::next_id(),
                last_key: Key::next_id(),
                latch: Mutex::new(Latch {
                    value: None,
                    error: None,
                    pending,
                }),
                accepted: AtomicI64::new(0),
                expected: Arc::new(AtomicI64::new(expected)),
                has_waiters: AtomicBool::new(false),
                wake: Notify::new(),
                dispatcher: RwLock::new(None),
                mode,
                gate,
                delegate,
                _upstream: upstream,
            }),
        }
    }
}

impl<P> Composable<Event<P>>
where
    P: Clone + Send + Sync + 'static,
{
    /// Creates a one-shot deferred node that, when triggered by its first
    /// terminal operation, publishes `event` on `observable` under
    /// `selector` (and accepts it as its own value).
    pub fn from_event(selector: Selector, event: Event<P>, observable: &Reactor<P>) -> Self {
        let c = Composable::from_value(event);
        let obs = observable.clone();
        c.consume(move |ev: Event<P>| {
            obs.notify_selector(&selector, ev);
        });
        c
    }
}

impl<T> Default for Composable<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> Trigger for Composable<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn propagate(&self) {
        self.delayed_accept().await;
    }
}
