//! Concurrent registration, removal and dispatch.

use std::sync::Arc;
use std::thread;

use topic_router::{Context, Subscription, SubscriberHandle};

mod common;

use common::{CountingSubscriber, RecordingSubscriber};

const WRITERS: usize = 8;
const PER_WRITER: usize = 50;

fn topic_for(writer: usize, i: usize) -> String {
    format!("tenant{writer}.device{i}.status")
}

#[test]
fn test_concurrent_register_then_dispatch() {
    let router = Arc::new(Subscription::new(None));

    let subscribers: Vec<Vec<(Arc<CountingSubscriber>, SubscriberHandle)>> = thread::scope(|s| {
        let workers: Vec<_> = (0..WRITERS)
            .map(|w| {
                let router = router.clone();
                s.spawn(move || {
                    (0..PER_WRITER)
                        .map(|i| {
                            let (counter, handle) = CountingSubscriber::handle();
                            router.register(&topic_for(w, i), &handle).unwrap();
                            (counter, handle)
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        workers.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(router.subscriber_count(), WRITERS * PER_WRITER);
    assert_eq!(router.routes().len(), WRITERS * PER_WRITER);

    // Every topic is dispatched exactly once, spread over several threads.
    thread::scope(|s| {
        for w in 0..WRITERS {
            let router = router.clone();
            s.spawn(move || {
                for i in 0..PER_WRITER {
                    let report = router.dispatch(&Context::new(), &topic_for(w, i), Vec::<u8>::new(), "load");
                    assert_eq!(report.delivered, 1);
                }
            });
        }
    });

    for (counter, _) in subscribers.iter().flatten() {
        assert_eq!(counter.count(), 1, "each subscriber delivered exactly once");
    }
}

#[test]
fn test_dispatch_races_with_unregister() {
    let router = Arc::new(Subscription::new(None));
    let (stable, stable_handle) = RecordingSubscriber::handle();
    router.register("metrics.:host.cpu", &stable_handle).unwrap();

    let transient: Vec<(Arc<CountingSubscriber>, SubscriberHandle)> =
        (0..100).map(|_| CountingSubscriber::handle()).collect();
    for (_, handle) in &transient {
        router.register("metrics.*", handle).unwrap();
    }

    const DISPATCHES: usize = 200;
    thread::scope(|s| {
        let r = router.clone();
        s.spawn(move || {
            for i in 0..DISPATCHES {
                r.handle(&Context::new(), &format!("metrics.host{i}.cpu"), Vec::<u8>::new(), "load");
            }
        });

        let r = router.clone();
        let transient = &transient;
        s.spawn(move || {
            for (_, handle) in transient {
                r.unregister("metrics.*", handle).unwrap();
            }
        });
    });

    // The stable subscriber never misses a delivery.
    assert_eq!(stable.count(), DISPATCHES);
    // Transient ones see at most one delivery per dispatch.
    for (counter, _) in &transient {
        assert!(counter.count() <= DISPATCHES);
    }

    // Once removed, nothing fires any more.
    let before: Vec<usize> = transient.iter().map(|(c, _)| c.count()).collect();
    router.handle(&Context::new(), "metrics.late.cpu", Vec::<u8>::new(), "load");
    let after: Vec<usize> = transient.iter().map(|(c, _)| c.count()).collect();
    assert_eq!(before, after);
    assert_eq!(router.routes(), vec!["metrics.:host.cpu"]);
}

#[test]
fn test_concurrent_registration_shares_nodes() {
    let router = Arc::new(Subscription::new(None));

    thread::scope(|s| {
        for _ in 0..WRITERS {
            let router = router.clone();
            s.spawn(move || {
                let (_, handle) = CountingSubscriber::handle();
                router.register("shared.{id:[0-9]+}.event", &handle).unwrap();
            });
        }
    });

    let root = router.root();
    assert_eq!(root.len(), 1);
    let shared = root.node("shared").unwrap();
    assert_eq!(shared.next().len(), 1);
    let id = shared.next().node("{id:[0-9]+}").unwrap();
    assert_eq!(id.next().node("event").unwrap().subscriber_count(), WRITERS);

    let report = router.dispatch(&Context::new(), "shared.9.event", Vec::<u8>::new(), "load");
    assert_eq!(report.delivered, WRITERS);
}
