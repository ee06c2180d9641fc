//! Subscriber behavior observed through the `Store`.

use std::time::Duration;

use celestial_core::{NewEvent, Store, StoreConfig};
use tokio::sync::mpsc::error::TryRecvError;

#[tokio::test]
async fn subscriber_receives_events_emitted_after_subscribing() {
    let store = Store::new();
    store.emit(NewEvent::new("before")).unwrap();

    let mut sub = store.subscribe();
    store.emit(NewEvent::new("after").with_parents([1])).unwrap();

    let event = tokio::time::timeout(Duration::from_secs(1), sub.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.id, 2);
    assert_eq!(event.event_type, "after");
    assert_eq!(sub.try_recv(), Err(TryRecvError::Empty));
}

#[test]
fn slow_subscriber_never_blocks_emit() {
    let store = Store::with_config(&StoreConfig {
        subscriber_capacity: 4,
        initial_capacity: 0,
    });
    let mut stalled = store.subscribe();
    let unobserved = Store::new();

    for id in 0..100_u64 {
        for target in [&store, &unobserved] {
            target
                .emit(NewEvent::new(format!("e{id}")).with_parents([id]))
                .unwrap();
        }
    }

    assert_eq!(store.len(), 100);
    let received: Vec<u64> = std::iter::from_fn(|| stalled.try_recv().ok())
        .map(|e| e.id)
        .collect();
    assert_eq!(received, vec![1, 2, 3, 4]);
    assert_eq!(store.subscriber_count(), 1);

    // Dropped deliveries leave the graph exactly as an unobserved store has it.
    assert_eq!(store.heads(), vec![100]);
    assert_eq!(store.heads(), unobserved.heads());
    for id in [1, 4, 5, 50, 99, 100] {
        assert_eq!(store.children(id).unwrap(), unobserved.children(id).unwrap());
    }
    assert_eq!(store.children(4).unwrap(), vec![5]);
    assert!(store.children(100).unwrap().is_empty());
    assert_eq!(store.ancestors(100).unwrap(), vec![1]);
}

#[test]
fn every_subscriber_gets_its_own_copy() {
    let store = Store::new();
    let mut subs: Vec<_> = (0..3).map(|_| store.subscribe()).collect();
    store.emit(NewEvent::new("fanout")).unwrap();
    for sub in &mut subs {
        assert_eq!(sub.try_recv().unwrap().event_type, "fanout");
    }
}

#[tokio::test]
async fn cancel_from_another_task_closes_the_stream() {
    let store = Store::new();
    let mut sub = store.subscribe();
    let handle = sub.cancel_handle();

    store.emit(NewEvent::new("kept")).unwrap();
    tokio::spawn(async move {
        handle.cancel();
    })
    .await
    .unwrap();

    assert_eq!(store.subscriber_count(), 0);
    store.emit(NewEvent::new("missed")).unwrap();

    assert_eq!(sub.recv().await.unwrap().event_type, "kept");
    assert!(sub.recv().await.is_none());
    assert!(!sub.cancel());
}

#[test]
fn dropped_subscriptions_are_unregistered() {
    let store = Store::new();
    let a = store.subscribe();
    let _b = store.subscribe();
    assert_eq!(store.subscriber_count(), 2);

    drop(a);
    assert_eq!(store.subscriber_count(), 1);
    store.emit(NewEvent::new("x")).unwrap();
    assert_eq!(store.subscriber_count(), 1);
}

#[test]
fn blocking_receive_from_a_plain_thread() {
    let store = std::sync::Arc::new(Store::new());
    let mut sub = store.subscribe();
    let producer = {
        let store = std::sync::Arc::clone(&store);
        std::thread::spawn(move || {
            store.emit(NewEvent::new("threaded")).unwrap();
        })
    };
    let event = sub.blocking_recv().unwrap();
    producer.join().unwrap();
    assert_eq!(event.event_type, "threaded");
}
