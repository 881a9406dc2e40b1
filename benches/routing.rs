//! Benchmarks for routing and admission latency with varying catalog sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use relay::catalog::{CostModel, Tier, Worker};
use relay::clock;
use relay::config::RelayConfig;
use relay::events::EventBus;
use relay::request::{Constraints, Priority};
use relay::routing::{Router, RoutingRequest};
use relay::scheduler::{MissionRequest, Scheduler};

fn create_worker(i: usize) -> Worker {
    let tier = match i % 3 {
        0 => Tier::Fast,
        1 => Tier::Balanced,
        _ => Tier::Quality,
    };
    let mut capabilities = vec!["chat", "research"];
    if i % 3 == 0 {
        capabilities.push("vision");
    }
    Worker::new(
        format!("worker-{}", i),
        "bench",
        tier,
        CostModel::PerToken {
            input_per_1k: 0.001 * (i % 7 + 1) as f64,
            output_per_1k: 0.004 * (i % 5 + 1) as f64,
        },
    )
    .with_capabilities(capabilities)
    .with_performance(100 + (i as u32 * 37) % 2000, 4000)
}

fn create_router(worker_count: usize) -> Router {
    let router = Router::new(&RelayConfig::default(), clock::system(), EventBus::new());
    for i in 0..worker_count {
        router.register_worker(create_worker(i)).unwrap();
    }
    router
}

/// Every worker is a candidate, so the router scores all of them.
fn bench_route_by_worker_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("route");

    for count in [1, 5, 10, 25, 50] {
        let router = create_router(count);
        let request = RoutingRequest::new("chat", "hello").with_priority(Priority::High);

        group.bench_with_input(BenchmarkId::new("workers", count), &count, |b, _| {
            b.iter(|| {
                black_box(router.route(&request).unwrap());
            });
        });
    }

    group.finish();
}

/// Only a third of the workers have the vision capability.
fn bench_capability_filtered_route(c: &mut Criterion) {
    let router = create_router(25);
    let request = RoutingRequest::new("chat", "describe").with_constraints(Constraints {
        required_capabilities: vec!["vision".to_string()],
        max_latency_ms: Some(5000),
        ..Default::default()
    });

    c.bench_function("route_capability_filtered_25_workers", |b| {
        b.iter(|| {
            black_box(router.route(&request).unwrap());
        });
    });
}

/// Submit then cancel, so the queue stays at one entry.
fn bench_mission_admission(c: &mut Criterion) {
    let scheduler = Scheduler::new(&RelayConfig::default(), clock::system(), EventBus::new());
    for i in 0..25 {
        scheduler
            .register_agent(create_worker(i), std::sync::Arc::new(NoopAgent))
            .unwrap();
    }

    c.bench_function("submit_cancel_25_agents", |b| {
        b.iter(|| {
            let plan = scheduler
                .submit(MissionRequest::new("research", 100.0))
                .unwrap();
            scheduler.cancel(&plan.mission_id).unwrap();
        });
    });
}

struct NoopAgent;

#[async_trait::async_trait]
impl relay::agent::Agent for NoopAgent {
    fn name(&self) -> &str {
        "noop"
    }
}

criterion_group!(
    benches,
    bench_route_by_worker_count,
    bench_capability_filtered_route,
    bench_mission_admission,
);
criterion_main!(benches);
