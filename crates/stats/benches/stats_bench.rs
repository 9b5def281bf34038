use criterion::{Criterion, criterion_group, criterion_main};
use stats::{InMemoryMetricsRecorder, MetricsRecorder, Report, Statistics};

fn bench_record(c: &mut Criterion) {
    let recorder = InMemoryMetricsRecorder::new();
    let mut tick = 0_i64;

    c.bench_function("stats/record", |b| {
        b.iter(|| {
            tick += 1;
            recorder.record("reserve_stock", tick / 1000, 1.5).unwrap();
        });
    });
}

fn bench_percentile_10000(c: &mut Criterion) {
    let stats: Statistics = (0..10_000).map(|i| f64::from(i % 977)).collect();

    c.bench_function("stats/percentile_10000", |b| {
        b.iter(|| stats.percentile(99.0).unwrap());
    });
}

fn bench_report(c: &mut Criterion) {
    let recorder = InMemoryMetricsRecorder::new();
    for i in 0..10_000_i64 {
        let label = if i % 2 == 0 { "total" } else { "add_line_item" };
        recorder.record(label, i / 100, (i % 50) as f64).unwrap();
    }
    let buckets = recorder.buckets().unwrap();

    c.bench_function("stats/report_100_buckets", |b| {
        b.iter(|| Report::build("bench", &buckets, &[]).unwrap());
    });
}

criterion_group!(benches, bench_record, bench_percentile_10000, bench_report);
criterion_main!(benches);
