use criterion::{BatchSize, Criterion, criterion_group, criterion_main};

use datasight::chart::{ChartSpec, ChartType};
use datasight::correlation::{correlate, rank_by_strength};
use datasight::data::{CellValue, Dataset, Row};
use datasight::shape::shape_chart_data;

/// A wide numeric dataset with deterministic pseudo-random structure and a
/// sprinkling of missing cells, so pairwise deletion does real work.
fn generate_metrics(rows: usize, columns: usize) -> Dataset {
    let names: Vec<String> = (0..columns).map(|c| format!("metric_{c:02}")).collect();
    let data_rows: Vec<Row> = (0..rows)
        .map(|r| {
            let mut row = Row::new();
            for (c, name) in names.iter().enumerate() {
                let cell = if (r * 7 + c * 13) % 41 == 0 {
                    CellValue::Null
                } else {
                    let base = r as f64;
                    let wobble = ((r * (c + 3)) % 17) as f64;
                    CellValue::Number(base * (c as f64 + 1.0) + wobble)
                };
                row.insert(name.clone(), cell);
            }
            row
        })
        .collect();
    Dataset::new(names, data_rows).expect("well-formed dataset")
}

fn bench_correlate(c: &mut Criterion) {
    let mut group = c.benchmark_group("correlation");
    for &(rows, columns) in &[(1_000usize, 10usize), (10_000, 10), (10_000, 30)] {
        let dataset = generate_metrics(rows, columns);
        let target = dataset.columns[0].clone();
        group.bench_function(format!("rank_{rows}x{columns}"), |b| {
            b.iter(|| {
                let results = correlate(&dataset.rows, &target, &dataset.columns);
                rank_by_strength(results)
            });
        });
    }
    group.finish();
}

fn bench_shape_scatter(c: &mut Criterion) {
    let dataset = generate_metrics(50_000, 2);
    let x = dataset.columns[0].clone();
    let y = dataset.columns[1].clone();
    c.bench_function("shape_scatter_decimate_50k", |b| {
        b.iter_batched(
            || ChartSpec::new(ChartType::Scatter, "dense", x.clone(), y.clone()),
            |mut spec| shape_chart_data(&dataset.rows, &mut spec),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_correlate, bench_shape_scatter);
criterion_main!(benches);
