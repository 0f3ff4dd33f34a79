use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use sleepmerge_core::schema::Header;
use sleepmerge_core::types::{Dataset, Row};
use sleepmerge_ops::{merge_history, sort_by_timestamp, TimestampKey};

fn make_rows(rows: usize, offset_minutes: usize) -> Vec<Row> {
    (0..rows)
        .map(|i| {
            let minute = i + offset_minutes;
            // walk backwards in days so the sort has work to do
            let day = 28 - (minute / 1440) % 28;
            let (h, m) = ((minute / 60) % 24, minute % 60);
            Row::new(vec![
                format!("2024-02-{day:02} {h:02}:{m:02}:00"),
                format!("2024-02-{day:02} {h:02}:{m:02}:30"),
                ["awake", "light", "deep", "rem"][i % 4].to_string(),
            ])
        })
        .collect()
}

fn bench_merge_history(c: &mut Criterion) {
    let key = TimestampKey::default();
    let mut group = c.benchmark_group("merge_history");
    for size in [1_000usize, 10_000] {
        let history = Dataset::new(Header::canonical(), make_rows(size, 0));
        // half overlaps the history, half is new
        let batch = Dataset::new(Header::canonical(), make_rows(size / 2, size / 4 * 3));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let out = merge_history(&batch, Some(&history), &key);
                assert!(out.stats.delta_rows > 0);
            })
        });
    }
    group.finish();
}

fn bench_timestamp_sort(c: &mut Criterion) {
    let key = TimestampKey::default();
    let rows = make_rows(10_000, 0);
    c.bench_function("sort_by_timestamp", |b| {
        b.iter(|| {
            let mut rows = rows.clone();
            sort_by_timestamp(&mut rows, &key);
        })
    });
}

criterion_group!(benches, bench_merge_history, bench_timestamp_sort);
criterion_main!(benches);
