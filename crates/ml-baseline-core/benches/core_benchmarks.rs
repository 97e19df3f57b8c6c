use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ml_baseline_core::{
    validate_and_align, BaselinePipeline, Classifier, Column, InputSchema, PipelineParams, Table,
};

fn frame(rows: usize) -> Table {
    let amounts: Vec<f64> = (0..rows).map(|i| ((i * 37) % 100) as f64 + 0.5).collect();
    Table::new(vec![
        Column::text("user_id", (0..rows).map(|i| format!("u{:06}", i)).collect()),
        Column::text("country", (0..rows).map(|i| ["US", "GB", "CA", "DE", "FR"][i % 5]).collect()),
        Column::integer("n_orders", (0..rows).map(|i| (i % 13) as i64).collect()),
        Column::float("total_amount", amounts.clone()),
        Column::integer(
            "is_high_value",
            amounts.iter().map(|&a| i64::from(a > 50.0)).collect(),
        ),
    ])
    .unwrap()
}

/// Serve-time input with text-typed numbers so coercion does real work
fn serve_input(rows: usize) -> Table {
    let base = frame(rows).without_columns(&["is_high_value"]);
    let columns = base
        .columns()
        .iter()
        .rev()
        .map(|c| {
            Column::text(
                c.name.clone(),
                (0..c.len()).map(|i| c.data.cell_to_string(i)).collect(),
            )
        })
        .collect();
    Table::new(columns).unwrap()
}

fn bench_validate_and_align(c: &mut Criterion) {
    let schema = InputSchema::from_training_frame(&frame(10), "is_high_value", &["user_id"]);
    let mut group = c.benchmark_group("validate_and_align");
    for rows in [100, 1_000, 10_000] {
        let input = serve_input(rows);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &input, |b, input| {
            b.iter(|| validate_and_align(black_box(input), black_box(&schema)).unwrap())
        });
    }
    group.finish();
}

fn bench_scoring(c: &mut Criterion) {
    let train = frame(2_000);
    let labels: Vec<i64> = match &train.column("is_high_value").unwrap().data {
        ml_baseline_core::ColumnData::Integer(v) => v.clone(),
        _ => unreachable!(),
    };
    let features = train.without_columns(&["is_high_value", "user_id"]);
    let params = PipelineParams {
        max_iter: 200,
        ..Default::default()
    };
    let fitted = BaselinePipeline::new(params).fit(&features, &labels).unwrap();

    c.bench_function("predict_proba_2000_rows", |b| {
        b.iter(|| fitted.predict_proba(black_box(&features)).unwrap())
    });
}

criterion_group!(benches, bench_validate_and_align, bench_scoring);
criterion_main!(benches);
