//! Performance benchmarks for chatbridge
//!
//! Run with: cargo bench

use chatbridge::broker::{Broadcast, Broker, MemoryBroker};
use chatbridge::types::Command;
use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;

fn bench_broadcast_serialization(c: &mut Criterion) {
    let message = Broadcast::new(
        "line:webhook",
        serde_json::json!({
            "events": [{
                "type": "message",
                "source": {"userId": "U1234567890"},
                "message": {"type": "text", "text": "/my_wallet"}
            }]
        }),
    )
    .with_correlation("11111111-2222-3333-4444-555555555555");

    c.bench_function("Broadcast serialize", |b| {
        b.iter(|| serde_json::to_vec(&message).unwrap());
    });

    let bytes = serde_json::to_vec(&message).unwrap();
    c.bench_function("Broadcast deserialize", |b| {
        b.iter(|| serde_json::from_slice::<Broadcast>(&bytes).unwrap());
    });
}

fn bench_command_parse(c: &mut Criterion) {
    c.bench_function("Command::parse", |b| {
        b.iter(|| {
            (
                Command::parse("/connect"),
                Command::parse("/my_wallet"),
                Command::parse("hello there"),
            )
        });
    });
}

fn bench_memory_publish(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("MemoryBroker publish", |b| {
        b.to_async(&rt).iter(|| async {
            let broker = MemoryBroker::default();
            broker
                .publish(
                    "line",
                    &Broadcast::new("line:webhook", serde_json::json!({"events": []})),
                )
                .await
                .unwrap()
        });
    });
}

fn bench_publish_throughput(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let mut group = c.benchmark_group("publish_throughput");
    for count in [10, 100, 1000] {
        group.bench_function(format!("{} broadcasts", count), |b| {
            b.to_async(&rt).iter(|| async {
                let broker = Arc::new(MemoryBroker::default());
                for i in 0..count {
                    broker
                        .publish(
                            "line",
                            &Broadcast::new(
                                "line:webhook",
                                serde_json::json!({"events": [{"i": i}]}),
                            ),
                        )
                        .await
                        .unwrap();
                }
            });
        });
    }
    group.finish();
}

fn bench_roundtrip(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("publish + receive", |b| {
        b.to_async(&rt).iter(|| async {
            let broker = MemoryBroker::default();
            let mut sub = broker.subscribe("return").await.unwrap();
            broker
                .publish(
                    "return",
                    &Broadcast::new("return", serde_json::json!({})).with_correlation("bench"),
                )
                .await
                .unwrap();
            sub.next().await.unwrap().unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_broadcast_serialization,
    bench_command_parse,
    bench_memory_publish,
    bench_publish_throughput,
    bench_roundtrip,
);
criterion_main!(benches);
