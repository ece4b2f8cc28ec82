use std::time::{Duration, Instant};

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use queueing_estimator::scheduler::NullClient;
use queueing_estimator::{EstimatorConfig, QueueingTimeEstimator, TaskQueueKind};

fn estimator() -> QueueingTimeEstimator<NullClient> {
    QueueingTimeEstimator::new(NullClient, EstimatorConfig::default()).unwrap()
}

/// 10k short tasks, 1ms apart, crossing a step every 50 tasks
fn benchmark_task_stream(c: &mut Criterion) {
    c.bench_function("task_stream_10k", |b| {
        b.iter_batched(
            estimator,
            |mut estimator| {
                let mut now = Instant::now();
                for i in 0..10_000u32 {
                    let kind = TaskQueueKind::ALL[i as usize % TaskQueueKind::COUNT];
                    estimator.on_top_level_task_started(now, kind).unwrap();
                    now += Duration::from_micros(600);
                    estimator.on_top_level_task_completed(now).unwrap();
                    now += Duration::from_micros(400);
                }
                black_box(estimator.stats())
            },
            BatchSize::SmallInput,
        )
    });
}

/// Estimates requested while a long task is running
fn benchmark_estimates(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimate");

    let mut estimator = estimator();
    let mut now = Instant::now();
    for _ in 0..200 {
        estimator
            .on_top_level_task_started(now, TaskQueueKind::Default)
            .unwrap();
        now += Duration::from_millis(3);
        estimator.on_top_level_task_completed(now).unwrap();
        now += Duration::from_millis(2);
    }
    estimator
        .on_top_level_task_started(now, TaskQueueKind::Default)
        .unwrap();

    group.bench_function("within_step", |b| {
        b.iter(|| {
            estimator
                .estimate_queueing_time_including_current_task(black_box(now + Duration::from_millis(10)))
                .unwrap()
        })
    });

    group.bench_function("across_window", |b| {
        b.iter(|| {
            estimator
                .estimate_queueing_time_including_current_task(black_box(now + Duration::from_secs(2)))
                .unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_task_stream, benchmark_estimates);
criterion_main!(benches);
