//! Benchmarks for the limiter's hot paths.
//!
//! Benchmarks cover:
//! - Ring queue operations (enqueue/dequeue, resize churn)
//! - Token bucket consume/replenish
//! - End-to-end submission throughput

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use rategate::config::RateLimiterConfig;
use rategate::core::{RateLimiter, RingQueue, TokenBucket};
use rategate::util::clock::SystemClock;

fn bench_ring_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_queue");

    for &size in &[64usize, 1024, 16384] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(
            BenchmarkId::new("enqueue_dequeue", size),
            &size,
            |b, &size| {
                b.iter(|| {
                    let mut queue = RingQueue::with_capacity(8);
                    for value in 0..size {
                        queue.enqueue(black_box(value));
                    }
                    while let Some(value) = queue.dequeue() {
                        black_box(value);
                    }
                });
            },
        );
    }

    // Steady-state churn around a small occupancy: exercises the shrink
    // threshold without ever holding many items.
    group.bench_function("churn_small_backlog", |b| {
        let mut queue = RingQueue::with_capacity(8);
        for value in 0..4 {
            queue.enqueue(value);
        }
        b.iter(|| {
            queue.enqueue(black_box(99));
            black_box(queue.dequeue());
        });
    });

    group.finish();
}

fn bench_token_bucket(c: &mut Criterion) {
    let mut group = c.benchmark_group("token_bucket");

    group.bench_function("consume_affordable", |b| {
        let mut bucket = TokenBucket::new(
            1_000_000,
            Duration::from_millis(1),
            u64::MAX,
            1_000_000,
            Arc::new(SystemClock),
        )
        .unwrap();
        b.iter(|| black_box(bucket.consume(1)));
    });

    group.bench_function("can_consume_denied", |b| {
        let mut bucket = TokenBucket::new(
            1,
            Duration::from_secs(3600),
            1_000_000,
            0,
            Arc::new(SystemClock),
        )
        .unwrap();
        b.iter(|| black_box(bucket.can_consume(1_000)));
    });

    group.finish();
}

fn bench_submission(c: &mut Criterion) {
    let mut group = c.benchmark_group("submission");
    group.throughput(Throughput::Elements(1));

    group.bench_function("execute_fire_and_forget", |b| {
        let limiter = RateLimiter::new(
            RateLimiterConfig::new(1_000_000, Duration::from_millis(1), u64::MAX)
                .with_initial_tokens(u64::MAX),
        )
        .unwrap();
        b.iter(|| {
            limiter.execute(1, || true);
        });
        limiter.shutdown();
    });

    group.finish();
}

criterion_group!(benches, bench_ring_queue, bench_token_bucket, bench_submission);
criterion_main!(benches);
