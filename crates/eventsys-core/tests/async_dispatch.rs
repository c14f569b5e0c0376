//! Asynchronous dispatch on the worker pool

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc, Arc, Condvar, Mutex,
    },
    thread,
    time::{Duration, Instant},
};

use eventsys_core::{
    ChannelSet, DispatchEngine, Event, EventDispatcher, EventType, InMemoryListenerRegistry,
    InlineWorkerPool, ListenError, ListenerRegistry, ListenerSpec, Origin, OwnerId, PoolConfig,
    Priority, PrioritySorter, PropertyEvent, ThreadWorkerPool, FnListener,
};
use serde_json::{json, Value};

/// Latch that listeners block on until the test opens it
#[derive(Clone, Default)]
struct Gate(Arc<(Mutex<bool>, Condvar)>);

impl Gate {
    fn wait(&self) {
        let (open, signal) = &*self.0;
        let mut open = open.lock().unwrap();
        while !*open {
            open = signal.wait(open).unwrap();
        }
    }

    fn open(&self) {
        let (open, signal) = &*self.0;
        *open.lock().unwrap() = true;
        signal.notify_all();
    }
}

fn test_event() -> EventType {
    EventType::new("TestEvent")
}

fn create_event() -> Arc<dyn Event> {
    Arc::new(PropertyEvent::builder(test_event()).build().unwrap())
}

fn create_engine(threads: usize) -> DispatchEngine {
    let config = PoolConfig {
        threads: Some(threads),
        ..PoolConfig::default()
    };
    DispatchEngine::new(
        Arc::new(InMemoryListenerRegistry::new()),
        Arc::new(ThreadWorkerPool::new(&config).unwrap()),
    )
}

#[tokio::test]
async fn test_dispatch_async_returns_before_listeners_complete() {
    let engine = create_engine(2);
    let gate = Gate::default();

    for index in 0..3 {
        let gate = gate.clone();
        engine
            .register_fn("test", format!("gated-{}", index), ListenerSpec::for_event(test_event()), move |_| {
                gate.wait();
                Ok(json!(index))
            })
            .unwrap();
    }

    let pending = engine.dispatch_async(create_event(), &Origin::new("test"));
    assert_eq!(pending.len(), 3);
    assert!(pending.pending().iter().all(|p| !p.is_done()));

    gate.open();
    let results = pending.await_all().await;

    let values: Vec<Value> = results.iter().filter_map(|r| r.result.as_value().cloned()).collect();
    assert_eq!(values, vec![json!(0), json!(1), json!(2)]);
    assert!(pending.is_done());
}

#[tokio::test]
async fn test_await_all_waits_for_delayed_listener() {
    let engine = create_engine(4);
    let delay = Duration::from_millis(200);

    engine
        .register_fn(
            "test",
            "delayed",
            ListenerSpec::for_event(test_event()).with_priority(Priority::First),
            move |_| {
                thread::sleep(delay);
                Ok(json!("delayed"))
            },
        )
        .unwrap();
    for index in 0..3 {
        engine
            .register_fn("test", format!("fast-{}", index), ListenerSpec::for_event(test_event()), |_| {
                Ok(json!("fast"))
            })
            .unwrap();
    }

    let started = Instant::now();
    let pending = engine.dispatch_async(create_event(), &Origin::new("test"));
    let results = pending.await_all().await;

    assert!(started.elapsed() >= delay);
    assert_eq!(results.len(), 4);
    assert_eq!(results[0].listener.name(), "delayed");
    assert_eq!(results[0].result.as_value(), Some(&json!("delayed")));
    assert!(results.iter().all(|r| r.result.is_success()));
}

#[tokio::test]
async fn test_async_failures_stay_local() {
    let engine = create_engine(2);

    engine
        .register_fn("test", "panics", ListenerSpec::for_event(test_event()), |_| {
            panic!("async listener panic")
        })
        .unwrap();
    engine
        .register_fn("test", "errors", ListenerSpec::for_event(test_event()), |_| {
            Err(anyhow::anyhow!("async listener error"))
        })
        .unwrap();
    engine
        .register_fn("test", "works", ListenerSpec::for_event(test_event()), |_| Ok(json!("ok")))
        .unwrap();

    let results = engine.dispatch_async(create_event(), &Origin::new("test")).await_all().await;

    assert!(matches!(results[0].result.error(), Some(ListenError::Exception(_))));
    assert!(matches!(results[1].result.error(), Some(ListenError::Exception(_))));
    assert_eq!(results[2].result.as_value(), Some(&json!("ok")));
}

#[test]
fn test_subscribe_all_runs_once_per_listener() {
    let engine = create_engine(2);
    let gate = Gate::default();

    for index in 0..4 {
        let gate = gate.clone();
        engine
            .register_fn("test", format!("listener-{}", index), ListenerSpec::for_event(test_event()), move |_| {
                gate.wait();
                Ok(json!(index))
            })
            .unwrap();
    }

    let pending = engine.dispatch_async(create_event(), &Origin::new("test"));
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    pending.subscribe_all(move |result| {
        let _ = tx.lock().unwrap().send(result.listener.name().to_string());
    });

    gate.open();

    let mut names: Vec<String> = (0..4)
        .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
        .collect();
    names.sort();
    assert_eq!(names, vec!["listener-0", "listener-1", "listener-2", "listener-3"]);
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
}

#[test]
fn test_wait_all_with_inline_pool() {
    let engine = DispatchEngine::new(
        Arc::new(InMemoryListenerRegistry::new()),
        Arc::new(InlineWorkerPool),
    );
    engine
        .register_fn("test", "inline", ListenerSpec::for_event(test_event()), |_| Ok(json!(1)))
        .unwrap();

    let pending = engine.dispatch_async(create_event(), &Origin::new("test"));
    assert!(pending.is_done());

    let results = tokio_test::block_on(pending.await_all());
    assert_eq!(results[0].result.as_value(), Some(&json!(1)));
    assert_eq!(pending.wait_all().len(), 1);
}

#[test]
fn test_resolve_during_concurrent_registration() {
    let registry = Arc::new(InMemoryListenerRegistry::new());
    let registered = Arc::new(AtomicUsize::new(0));

    let writers: Vec<_> = (0..4)
        .map(|writer| {
            let registry = registry.clone();
            let registered = registered.clone();
            thread::spawn(move || {
                for index in 0..50 {
                    let priority = Priority::ALL[(writer + index) % Priority::ALL.len()];
                    let listener = FnListener::new(
                        format!("w{}-{}", writer, index),
                        ListenerSpec::for_event(test_event()).with_priority(priority),
                        |_| Ok(Value::Null),
                    );
                    registry.register(OwnerId::from("writer"), Arc::new(listener)).unwrap();
                    registered.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    let mut last_len = 0;
    while registered.load(Ordering::SeqCst) < 200 {
        let resolved = registry.resolve(&test_event(), &ChannelSet::All);
        assert!(resolved.len() >= last_len);
        assert!(resolved
            .windows(2)
            .all(|pair| PrioritySorter::compare(&pair[0], &pair[1]).is_lt()));
        last_len = resolved.len();
    }

    for writer in writers {
        writer.join().unwrap();
    }
    assert_eq!(registry.resolve(&test_event(), &ChannelSet::All).len(), 200);
}
