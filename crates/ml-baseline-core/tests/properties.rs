//! Property tests for the schema contract and validation

use ml_baseline_core::{validate_and_align, Column, DType, InputSchema, Table, Violation};
use proptest::prelude::*;
use proptest::sample::subsequence;
use std::collections::{BTreeMap, BTreeSet};

const POOL: [&str; 8] = [
    "age", "country", "n_orders", "plan", "region", "score", "tenure", "total_amount",
];

fn dtype() -> impl Strategy<Value = DType> {
    prop_oneof![Just(DType::Integer), Just(DType::Float), Just(DType::Text)]
}

/// Required features (ordered), one id column and one forbidden column
fn schema_strategy() -> impl Strategy<Value = InputSchema> {
    (
        subsequence(POOL.to_vec(), 1..=POOL.len()).prop_shuffle(),
        proptest::collection::vec(dtype(), POOL.len()),
    )
        .prop_map(|(features, dtypes)| {
            let required: Vec<String> = features.iter().map(|s| s.to_string()).collect();
            let feature_dtypes: BTreeMap<String, DType> =
                required.iter().cloned().zip(dtypes).collect();
            InputSchema::new(
                required,
                feature_dtypes,
                BTreeSet::from(["user_id".to_string()]),
                BTreeSet::from(["label".to_string()]),
            )
            .unwrap()
        })
}

const ID_POOL: [&str; 3] = ["account_id", "session_id", "user_id"];
const FORBIDDEN_POOL: [&str; 3] = ["churned", "is_high_value", "label"];

fn name_set(pool: &'static [&'static str]) -> impl Strategy<Value = BTreeSet<String>> {
    subsequence(pool.to_vec(), 0..=pool.len())
        .prop_map(|names| names.into_iter().map(String::from).collect())
}

/// Any valid schema: id and forbidden sets may be empty or hold several names
fn any_schema_strategy() -> impl Strategy<Value = InputSchema> {
    (
        subsequence(POOL.to_vec(), 1..=POOL.len()).prop_shuffle(),
        proptest::collection::vec(dtype(), POOL.len()),
        name_set(&ID_POOL),
        name_set(&FORBIDDEN_POOL),
    )
        .prop_map(|(features, dtypes, ids, forbidden)| {
            let required: Vec<String> = features.iter().map(|s| s.to_string()).collect();
            let feature_dtypes: BTreeMap<String, DType> =
                required.iter().cloned().zip(dtypes).collect();
            InputSchema::new(required, feature_dtypes, ids, forbidden).unwrap()
        })
}

fn column_for(name: &str, dtype: DType, rows: usize) -> Column {
    match dtype {
        DType::Integer => Column::integer(name, (0..rows as i64).collect()),
        DType::Float => Column::float(name, (0..rows).map(|i| i as f64 * 0.5).collect()),
        DType::Text => Column::text(name, (0..rows).map(|i| format!("{}-{}", name, i)).collect()),
    }
}

/// An input table holding every required column (plus ids and an extra
/// column), in an order given by `order_seed`
fn input_for(schema: &InputSchema, rows: usize, order_seed: &[usize]) -> Table {
    let mut columns: Vec<Column> = schema
        .required_feature_columns()
        .iter()
        .map(|name| column_for(name, schema.dtype_of(name).unwrap(), rows))
        .collect();
    columns.push(Column::text(
        "user_id",
        (0..rows).map(|i| format!("u{}", i)).collect(),
    ));
    columns.push(Column::integer("unmodeled", vec![7; rows]));

    for (i, &j) in order_seed.iter().enumerate() {
        let n = columns.len();
        columns.swap(i % n, j % n);
    }
    Table::new(columns).unwrap()
}

proptest! {
    #[test]
    fn prop_schema_round_trip(schema in any_schema_strategy()) {
        let json = schema.to_json().unwrap();
        let restored = InputSchema::from_json(&json).unwrap();
        prop_assert_eq!(restored.optional_id_columns(), schema.optional_id_columns());
        prop_assert_eq!(restored.forbidden_columns(), schema.forbidden_columns());
        prop_assert_eq!(restored, schema);
    }

    #[test]
    fn prop_features_match_schema_exactly(
        schema in schema_strategy(),
        rows in 0usize..20,
        order in proptest::collection::vec(0usize..16, 0..12),
    ) {
        let input = input_for(&schema, rows, &order);
        let batch = validate_and_align(&input, &schema).unwrap();
        prop_assert_eq!(
            batch.features.column_names(),
            schema.required_feature_columns().iter().map(String::as_str).collect::<Vec<_>>()
        );
        prop_assert_eq!(batch.features.n_rows(), rows);
        prop_assert_eq!(batch.passthrough.column_names(), vec!["user_id"]);
    }

    #[test]
    fn prop_row_order_preserved(
        schema in schema_strategy(),
        rows in 1usize..20,
        order in proptest::collection::vec(0usize..16, 0..12),
    ) {
        let input = input_for(&schema, rows, &order);
        let batch = validate_and_align(&input, &schema).unwrap();
        prop_assert_eq!(batch.passthrough.column("user_id"), input.column("user_id"));
        for name in schema.required_feature_columns() {
            let expected = schema.dtype_of(name).unwrap().coerce(input.column(name).unwrap()).unwrap();
            prop_assert_eq!(&batch.features.column(name).unwrap().data, &expected);
        }
    }

    #[test]
    fn prop_forbidden_beats_missing(
        schema in schema_strategy(),
        drop_index in 0usize..8,
    ) {
        let required = schema.required_feature_columns();
        let dropped = required[drop_index % required.len()].clone();
        let mut input = input_for(&schema, 3, &[]).without_columns(&[dropped]);
        input.push_column(Column::integer("label", vec![0, 1, 0])).unwrap();

        let err = validate_and_align(&input, &schema).unwrap_err();
        prop_assert_eq!(
            err.violation(),
            Some(&Violation::ForbiddenColumns(vec!["label".to_string()]))
        );
    }
}
