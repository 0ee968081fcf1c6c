/// Benchmarks for the decimation implementation.
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use decimator::decimate::reduce;
use decimator::models::{DValue, Row};

fn sine_rows(n: usize) -> Vec<Row> {
    (0..n)
        .map(|i| {
            let x = i as f64;
            vec![
                DValue::from(i as i64),
                DValue::from_f64((x / 100.0).sin()).unwrap(),
            ]
        })
        .collect()
}

fn criterion_benchmark(c: &mut Criterion) {
    for size in [10_000, 100_000, 1_000_000] {
        let rows = sine_rows(size);
        let name = format!("reduce({}, 1000)", size);
        c.bench_function(&name, |b| {
            b.iter(|| {
                reduce(black_box(rows.clone()), 1000);
            })
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
