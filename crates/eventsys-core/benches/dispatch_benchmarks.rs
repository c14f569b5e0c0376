use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use eventsys_core::{
    DispatchEngine, Event, EventDispatcher, EventType, InMemoryListenerRegistry, ListenerSpec,
    Origin, ParameterSpec, PoolConfig, Priority, PropertyEvent, ThreadWorkerPool, ValueType,
};
use serde_json::{json, Value};

fn create_engine(listeners: usize) -> DispatchEngine {
    let pool = ThreadWorkerPool::new(&PoolConfig::default()).expect("worker pool");
    let engine = DispatchEngine::new(Arc::new(InMemoryListenerRegistry::new()), Arc::new(pool));

    for index in 0..listeners {
        let priority = Priority::ALL[index % Priority::ALL.len()];
        engine
            .register_fn(
                "bench",
                format!("listener-{}", index),
                ListenerSpec::for_event(EventType::new("BenchEvent"))
                    .with_priority(priority)
                    .with_parameter(ParameterSpec::value("amount", ValueType::Integer)),
                |invocation| Ok(invocation.value("amount").cloned().unwrap_or(Value::Null)),
            )
            .expect("register listener");
    }

    engine
}

fn create_event() -> Arc<dyn Event> {
    Arc::new(
        PropertyEvent::builder(EventType::new("BenchEvent"))
            .property("amount", json!(100))
            .build()
            .expect("event"),
    )
}

fn benchmark_sync_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_sync");
    let origin = Origin::new("bench");

    for listeners in [1usize, 10, 100] {
        let engine = create_engine(listeners);
        group.bench_with_input(BenchmarkId::from_parameter(listeners), &listeners, |b, _| {
            b.iter(|| black_box(engine.dispatch(create_event(), &origin)));
        });
    }

    group.finish();
}

fn benchmark_async_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_async");
    let origin = Origin::new("bench");

    for listeners in [1usize, 10, 100] {
        let engine = create_engine(listeners);
        group.bench_with_input(BenchmarkId::from_parameter(listeners), &listeners, |b, _| {
            b.iter(|| black_box(engine.dispatch_async(create_event(), &origin).wait_all()));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_sync_dispatch, benchmark_async_dispatch);
criterion_main!(benches);
