//! End-to-end behavior of composable pipelines.
//!
//! Most tests pin a synchronous dispatcher so delivery is deterministic;
//! the dispatcher-specific tests at the bottom cover the async ones.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reflow::{
    Composable, Event, FnConsumer, QueueDispatcher, Reactor, Selector, SyncDispatcher,
    EXPECTED_ACCEPTS_HEADER,
};

#[derive(Debug, thiserror::Error)]
#[error("boom")]
struct Boom;

fn sync() -> Arc<SyncDispatcher> {
    Arc::new(SyncDispatcher::new())
}

fn sync_source<T: Clone + Send + Sync + 'static>(values: Vec<T>) -> Composable<T> {
    let source = Composable::from_iter(values);
    source.set_dispatcher(sync());
    source
}

#[tokio::test]
async fn map_reduce_pipeline_folds_all_values() {
    let source = sync_source(vec![1, 2, 3]);
    let sum = source.map(|x| x * 2).reduce(|step| step.last + step.next, 0);
    assert_eq!(sum.wait().await.unwrap(), Some(12));
}

#[tokio::test]
async fn bounded_live_node_completes_on_expected_count() {
    let c: Composable<&str> = Composable::new();
    c.set_dispatcher(sync());
    c.set_expected_accept_count(2);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    c.consume(move |v| sink.lock().unwrap().push(v));

    c.accept("a");
    c.accept("b");

    assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
    // Already complete: a zero timeout observes the result immediately.
    assert_eq!(c.wait_for(Some(Duration::ZERO)).await.unwrap(), Some("b"));
    assert_eq!(c.wait().await.unwrap(), Some("b"));
}

#[tokio::test]
async fn filter_accounts_for_rejected_inputs() {
    let source = sync_source(vec![1, 2, 3]);
    let odds = source.filter(|x| x % 2 == 1);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    odds.consume(move |v| sink.lock().unwrap().push(v));

    let got = odds.wait_for(Some(Duration::from_secs(5))).await.unwrap();
    assert_eq!(got, Some(3));
    assert_eq!(*seen.lock().unwrap(), vec![1, 3]);
    assert_eq!(odds.expected_accept_count(), 2);
    assert_eq!(odds.accepted_count(), 2);
}

#[tokio::test]
async fn stage_failures_report_on_the_stage_not_the_parent() {
    let source = sync_source(vec![1, 2, 3]);
    let failed = source.try_map(|_: i32| -> Result<i32, Boom> { Err(Boom) });

    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    failed.when::<Boom, _>(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let got = failed.wait_for(Some(Duration::ZERO)).await.unwrap();
    assert_eq!(got, None);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
    // Every failed input was accounted for.
    assert_eq!(failed.expected_accept_count(), 0);
    assert_eq!(failed.accepted_count(), 0);

    // The parent saw all three values and is complete.
    assert_eq!(
        source.wait_for(Some(Duration::ZERO)).await.unwrap(),
        Some(3)
    );
    assert_eq!(source.accepted_count(), 3);
}

#[tokio::test]
async fn parent_handlers_see_stage_faults_via_shared_registry() {
    let source = sync_source(vec![1]);
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    source.when::<Boom, _>(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let failed = source.try_map(|_: i32| -> Result<i32, Boom> { Err(Boom) });
    let _ = failed.wait_for(Some(Duration::ZERO)).await;
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn request_reply_stage_round_trips() {
    let bus: Reactor<String> = Reactor::with_dispatcher(sync());
    let (sel, _key) = Selector::anonymous();

    let replier = bus.clone();
    bus.on_fn(sel.clone(), move |ev| {
        replier.reply_to(&ev, Event::new("pong".to_string()));
    });

    let source = Composable::from_value("ping".to_string());
    source.set_dispatcher(sync());
    let reply = source.map_via(sel, &bus);
    assert_eq!(reply.expected_accept_count(), 1);
    assert_eq!(reply.wait().await.unwrap(), Some("pong".to_string()));
}

#[tokio::test]
async fn deferred_emission_happens_exactly_once_across_waiters() {
    let source = sync_source(vec![1, 2]);

    let a = Arc::new(AtomicUsize::new(0));
    let b = Arc::new(AtomicUsize::new(0));
    let counter = a.clone();
    source.consume(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let counter = b.clone();
    source.consume(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let w1 = {
        let c = source.clone();
        tokio::spawn(async move { c.wait().await })
    };
    let w2 = {
        let c = source.clone();
        tokio::spawn(async move { c.wait().await })
    };

    assert_eq!(w1.await.unwrap().unwrap(), Some(2));
    assert_eq!(w2.await.unwrap().unwrap(), Some(2));
    assert_eq!(a.load(Ordering::SeqCst), 2);
    assert_eq!(b.load(Ordering::SeqCst), 2);
    assert_eq!(source.accepted_count(), 2);
}

#[tokio::test]
async fn deferred_source_feeds_consumers_in_order() {
    let source = sync_source(vec![1, 2, 3]);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    source.consume(move |v| sink.lock().unwrap().push(v));

    assert_eq!(source.wait().await.unwrap(), Some(3));
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
}

#[tokio::test]
async fn late_subscription_replays_last_value_once() {
    let c: Composable<u32> = Composable::new();
    c.set_dispatcher(sync());
    c.accept(41);
    c.accept(42);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    c.consume(move |v| sink.lock().unwrap().push(v));
    assert_eq!(*seen.lock().unwrap(), vec![42]);

    // Replay is a one-shot, not a subscription.
    c.accept(43);
    assert_eq!(*seen.lock().unwrap(), vec![42]);
}

#[tokio::test]
async fn get_surfaces_latched_state() {
    let c: Composable<u32> = Composable::new();
    c.set_dispatcher(sync());

    assert_eq!(c.get().await.unwrap(), None);
    c.accept(7);
    assert_eq!(c.get().await.unwrap(), Some(7));

    c.accept_error(Boom);
    let err = c.get().await.unwrap_err();
    assert!(err.fault().is::<Boom>());
    assert_eq!(err.as_label(), "flow_faulted");
}

#[tokio::test]
async fn upstream_faults_latch_and_route_to_handlers() {
    let c: Composable<u32> = Composable::new();
    c.set_dispatcher(sync());

    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    c.when::<Boom, _>(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let child_hits = Arc::new(AtomicUsize::new(0));
    let counter = child_hits.clone();
    c.map(|x| x + 1).consume(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    c.accept_error(Boom);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    // accept-channel children do not observe upstream faults.
    assert_eq!(child_hits.load(Ordering::SeqCst), 0);
    assert!(c.get().await.is_err());
}

#[tokio::test]
async fn when_any_catches_every_fault_type() {
    let c: Composable<u32> = Composable::new();
    c.set_dispatcher(sync());

    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    c.when_any(move |fault| {
        assert!(fault.is::<Boom>());
        counter.fetch_add(1, Ordering::SeqCst);
    });
    c.accept_error(Boom);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn deferred_events_carry_expected_count_header() {
    let source = sync_source(vec![1, 2]);
    let headers = Arc::new(Mutex::new(Vec::new()));
    let sink = headers.clone();
    source.consume_event(Arc::new(FnConsumer::new(move |ev: Arc<Event<i32>>| {
        let h = ev.headers.get(EXPECTED_ACCEPTS_HEADER).unwrap().to_string();
        sink.lock().unwrap().push(h);
    })));

    source.wait().await.unwrap();
    assert_eq!(*headers.lock().unwrap(), vec!["2", "2"]);
}

#[tokio::test]
async fn first_and_last_stages() {
    let source = sync_source(vec![10, 20, 30]);
    let first = source.first();
    let last = source.last();

    assert_eq!(first.wait().await.unwrap(), Some(10));
    assert_eq!(last.wait().await.unwrap(), Some(30));
    assert_eq!(first.expected_accept_count(), 1);
    assert_eq!(last.expected_accept_count(), 1);
}

#[tokio::test]
async fn waiters_wake_on_completion_from_another_task() {
    let c: Composable<&str> = Composable::new();
    c.set_dispatcher(sync());
    c.set_expected_accept_count(1);

    let waiter = {
        let w = c.clone();
        tokio::spawn(async move { w.wait().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    c.accept("done");

    assert_eq!(waiter.await.unwrap().unwrap(), Some("done"));
}

#[tokio::test]
async fn setting_expected_count_after_accepts_completes_and_fires_last() {
    let c: Composable<u32> = Composable::new();
    c.set_dispatcher(sync());
    let last_stage = c.last();

    c.accept(5);
    c.set_expected_accept_count(1);

    assert_eq!(c.wait_for(Some(Duration::ZERO)).await.unwrap(), Some(5));
    assert_eq!(
        last_stage.wait_for(Some(Duration::ZERO)).await.unwrap(),
        Some(5)
    );
}

#[tokio::test]
async fn deadline_expiry_returns_partial_state() {
    let c: Composable<u32> = Composable::new();
    c.set_dispatcher(sync());
    c.accept(9);

    // Unbounded node: never complete, so the deadline expires.
    let got = c.wait_for(Some(Duration::from_millis(10))).await.unwrap();
    assert_eq!(got, Some(9));
    assert_eq!(c.expected_accept_count(), -1);
}

#[tokio::test]
async fn wait_forever_returns_on_completion() {
    let source = sync_source(vec![1]);
    assert_eq!(source.wait_for(None).await.unwrap(), Some(1));
}

#[tokio::test]
async fn forwarding_node_mirrors_live_accepts() {
    let src: Composable<u32> = Composable::new();
    src.set_dispatcher(sync());
    let fwd = Composable::from_composable(&src);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    fwd.consume(move |v| sink.lock().unwrap().push(v));

    src.accept(1);
    src.accept(2);
    assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    assert_eq!(fwd.accepted_count(), 2);
    assert_eq!(fwd.expected_accept_count(), -1);
}

#[tokio::test]
async fn one_shot_event_source_notifies_on_trigger() {
    let bus: Reactor<&'static str> = Reactor::with_dispatcher(sync());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (sel, _key) = Selector::anonymous();
    let sink = seen.clone();
    bus.on_fn(sel.clone(), move |ev| {
        sink.lock().unwrap().push(ev.data);
    });

    let c = Composable::from_event(sel, Event::new("hello"), &bus);
    c.set_dispatcher(sync());
    assert!(seen.lock().unwrap().is_empty());

    c.wait().await.unwrap();
    assert_eq!(*seen.lock().unwrap(), vec!["hello"]);
}

#[tokio::test]
async fn consume_to_republishes_values() {
    let c: Composable<u32> = Composable::new();
    c.set_dispatcher(sync());

    let bus: Reactor<u32> = Reactor::with_dispatcher(sync());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (sel, _key) = Selector::anonymous();
    let sink = seen.clone();
    bus.on_fn(sel.clone(), move |ev| {
        sink.lock().unwrap().push(ev.data);
    });

    c.consume_to(sel, &bus);
    c.accept(5);
    assert_eq!(*seen.lock().unwrap(), vec![5]);
}

#[tokio::test]
async fn try_filter_failures_account_like_rejections() {
    let source = sync_source(vec![1, 2, 3]);
    let stage = source.try_filter(|x: &i32| -> Result<bool, Boom> {
        match x {
            1 => Ok(true),
            2 => Ok(false),
            _ => Err(Boom),
        }
    });
    let got = stage.wait_for(Some(Duration::from_secs(5))).await.unwrap();
    assert_eq!(got, Some(1));
    assert_eq!(stage.accepted_count(), 1);
    assert_eq!(stage.expected_accept_count(), 1);
}

#[tokio::test]
async fn reduce_emits_running_accumulator_on_unbounded_source() {
    let c: Composable<u32> = Composable::new();
    c.set_dispatcher(sync());
    let totals = c.reduce(|step| step.last + step.next, 0);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    totals.consume(move |v| sink.lock().unwrap().push(v));

    c.accept(1);
    c.accept(2);
    c.accept(3);
    assert_eq!(*seen.lock().unwrap(), vec![1, 3, 6]);
}

#[tokio::test]
async fn pipeline_completes_on_queue_dispatcher() {
    let source = Composable::from_iter(vec![1, 2, 3]);
    source.set_dispatcher(Arc::new(QueueDispatcher::new(64)));
    let sum = source.map(|x| x * 2).reduce(|step| step.last + step.next, 0);
    assert_eq!(sum.wait().await.unwrap(), Some(12));
}

#[tokio::test]
async fn pipeline_completes_on_default_task_dispatcher() {
    // from_iter inside a runtime picks the task dispatcher by default.
    let source = Composable::from_iter(vec![1, 2, 3]);
    let sum = source.map(|x| x * 2).reduce(|step| step.last + step.next, 0);
    assert_eq!(sum.wait().await.unwrap(), Some(12));
}
