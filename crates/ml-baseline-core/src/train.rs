//! Training orchestrator
//!
//! Runs one end-to-end training cycle: check the configuration and target,
//! split, fit the baseline pipeline, evaluate on the holdout, freeze the
//! input schema and persist everything as a new run. Every check that can
//! fail on caller input happens before the run is created, so a rejected
//! configuration leaves the store untouched.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::TrainConfig;
use crate::error::{BaselineError, Result};
use crate::metrics::{classification_metrics, ClassificationMetrics};
use crate::pipeline::{BaselinePipeline, Classifier, FittedPipeline, MODEL_TYPE};
use crate::schema::{DType, InputSchema};
use crate::store::{ArtifactKind, RunHandle, RunId, RunStore, BASELINE_SUMMARY, HOLDOUT_METRICS};
use crate::tabular_io::{encode_table, TableFormat};
use crate::table::{Column, ColumnData, Table};

/// Summary record written to `metrics/baseline_holdout.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub run_id: RunId,
    pub timestamp: String,
    pub target: String,
    pub features: Vec<String>,
    pub n_train: usize,
    pub n_test: usize,
    pub test_size: f64,
    pub random_state: u64,
    pub split_strategy: String,
    pub model_type: String,
    pub metrics: ClassificationMetrics,
}

/// Data statistics recorded in the run metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataStats {
    pub n_train: usize,
    pub n_test: usize,
    pub n_features: usize,
    /// Row count per label over the full training table
    pub target_distribution: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    #[serde(rename = "type")]
    pub model_type: String,
    /// Width of the encoded design matrix
    pub n_encoded_features: usize,
}

/// Record written to `run_meta.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: RunId,
    pub timestamp: String,
    pub config: TrainConfig,
    pub data_stats: DataStats,
    pub model: ModelInfo,
}

/// Result of a successful training run
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub run: RunHandle,
    pub schema: InputSchema,
    pub summary: TrainingSummary,
}

/// Everything computed before a run is created
struct Trained {
    features: Vec<String>,
    /// Holdout features followed by the identifier columns
    holdout_input: Table,
    y_true: Vec<i64>,
    y_pred: Vec<i64>,
    y_proba: Vec<f64>,
    n_train: usize,
    target_distribution: BTreeMap<String, usize>,
    fitted: FittedPipeline,
    metrics: ClassificationMetrics,
    schema: InputSchema,
}

/// Drives training runs against a `RunStore`
pub struct TrainingOrchestrator<'a, S: RunStore> {
    store: &'a S,
}

impl<'a, S: RunStore> TrainingOrchestrator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Train on `frame` and persist a new run, then point "latest" at it
    pub fn train(&self, frame: &Table, config: &TrainConfig) -> Result<TrainOutcome> {
        let trained = fit_and_evaluate(frame, config)?;

        let run = self.store.create_run()?;
        tracing::info!(run_id = %run.id, path = %run.location.display(), "Started training run");

        let summary = self.persist(&run, config, &trained)?;
        self.store.set_latest(&run)?;

        tracing::info!(
            run_id = %run.id,
            accuracy = trained.metrics.accuracy,
            n_train = summary.n_train,
            n_test = summary.n_test,
            "Training run complete"
        );
        Ok(TrainOutcome {
            run,
            schema: trained.schema,
            summary,
        })
    }

    fn persist(
        &self,
        run: &RunHandle,
        config: &TrainConfig,
        trained: &Trained,
    ) -> Result<TrainingSummary> {
        let timestamp = Utc::now().to_rfc3339();
        let summary = TrainingSummary {
            run_id: run.id.clone(),
            timestamp: timestamp.clone(),
            target: config.target.clone(),
            features: trained.features.clone(),
            n_train: trained.n_train,
            n_test: trained.holdout_input.n_rows(),
            test_size: config.test_size,
            random_state: config.random_state,
            split_strategy: config.split.strategy.clone(),
            model_type: MODEL_TYPE.to_string(),
            metrics: trained.metrics.clone(),
        };

        let store = self.store;
        store.write_json(
            run,
            &ArtifactKind::Metrics(HOLDOUT_METRICS.to_string()),
            &trained.metrics,
        )?;
        store.write_json(
            run,
            &ArtifactKind::Metrics(BASELINE_SUMMARY.to_string()),
            &summary,
        )?;

        let ext = TableFormat::default_extension();
        let mut predictions = trained.holdout_input.clone();
        predictions.push_column(Column::integer(
            format!("{}_true", config.target),
            trained.y_true.clone(),
        ))?;
        predictions.push_column(Column::integer(
            format!("{}_pred", config.target),
            trained.y_pred.clone(),
        ))?;
        predictions.push_column(Column::float(
            format!("{}_pred_proba", config.target),
            trained.y_proba.clone(),
        ))?;
        store.write_artifact(
            run,
            &ArtifactKind::Table(format!("holdout_predictions{}", ext)),
            &encode_table(&predictions, TableFormat::Csv)?,
        )?;
        store.write_artifact(
            run,
            &ArtifactKind::Table(format!("holdout_input{}", ext)),
            &encode_table(&trained.holdout_input, TableFormat::Csv)?,
        )?;

        store.write_json(run, &ArtifactKind::Schema, &trained.schema)?;

        let metadata = RunMetadata {
            run_id: run.id.clone(),
            timestamp,
            config: config.clone(),
            data_stats: DataStats {
                n_train: trained.n_train,
                n_test: trained.holdout_input.n_rows(),
                n_features: trained.features.len(),
                target_distribution: trained.target_distribution.clone(),
            },
            model: ModelInfo {
                model_type: MODEL_TYPE.to_string(),
                n_encoded_features: trained.fitted.n_encoded_features(),
            },
        };
        store.write_json(run, &ArtifactKind::Metadata, &metadata)?;

        store.write_artifact(run, &ArtifactKind::Model, &trained.fitted.to_bytes()?)?;
        Ok(summary)
    }
}

fn fit_and_evaluate(frame: &Table, config: &TrainConfig) -> Result<Trained> {
    config.validate()?;

    let target = &config.target;
    let target_column = frame.column(target).ok_or_else(|| {
        BaselineError::configuration(format!("Target column '{}' not found in data", target))
    })?;
    let strategy = config.split_strategy()?;
    let labels = binary_labels(target_column)?;

    let mut target_distribution = BTreeMap::new();
    for label in &labels {
        *target_distribution.entry(label.to_string()).or_insert(0) += 1;
    }
    tracing::debug!(target = %target, distribution = ?target_distribution, "Target distribution");

    let id_columns: Vec<String> = config
        .id_column
        .iter()
        .filter(|c| {
            *c != target && frame.has_column(c) && !config.leakage_columns.contains(c)
        })
        .cloned()
        .collect();

    let mut excluded = vec![target.clone()];
    excluded.extend(id_columns.iter().cloned());
    excluded.extend(config.leakage_columns.iter().cloned());
    let features = frame.without_columns(&excluded);
    if features.n_columns() == 0 {
        return Err(BaselineError::configuration(
            "no feature columns left after removing target, id and leakage columns",
        ));
    }

    let split = strategy.split(frame, &labels)?;
    let y_train: Vec<i64> = split.train.iter().map(|&i| labels[i]).collect();
    let y_true: Vec<i64> = split.test.iter().map(|&i| labels[i]).collect();
    let train_x = features.take_rows(&split.train);
    let test_x = features.take_rows(&split.test);

    let fitted = BaselinePipeline::new(config.model.clone()).fit(&train_x, &y_train)?;
    let y_pred = fitted.predict(&test_x)?;
    let y_proba = fitted.predict_proba(&test_x)?;
    let metrics = classification_metrics(&y_true, &y_pred, Some(&y_proba));

    let schema = InputSchema::from_training_frame(frame, target, &id_columns)
        .with_leakage_columns(&config.leakage_columns);
    if schema.required_feature_columns() != features.column_names().as_slice() {
        return Err(BaselineError::Internal(
            "derived schema does not match fitted features".to_string(),
        ));
    }

    let mut holdout_input = test_x;
    for id in &id_columns {
        if let Some(column) = frame.column(id) {
            holdout_input.push_column(Column::new(id.clone(), column.data.take(&split.test)))?;
        }
    }

    Ok(Trained {
        features: schema.required_feature_columns().to_vec(),
        holdout_input,
        y_true,
        y_pred,
        y_proba,
        n_train: split.train.len(),
        target_distribution,
        fitted,
        metrics,
        schema,
    })
}

/// Coerce the target to integers and require exactly the labels 0 and 1
fn binary_labels(column: &Column) -> Result<Vec<i64>> {
    let labels = match DType::Integer.coerce(column) {
        Ok(ColumnData::Integer(values)) => values,
        _ => {
            return Err(BaselineError::configuration(format!(
                "target column '{}' must hold integer labels 0 and 1",
                column.name
            )))
        }
    };
    if labels.iter().any(|&y| y != 0 && y != 1) {
        return Err(BaselineError::configuration(format!(
            "target column '{}' must be binary (0/1)",
            column.name
        )));
    }
    if !(labels.contains(&0) && labels.contains(&1)) {
        return Err(BaselineError::configuration(format!(
            "target column '{}' needs both classes present to train",
            column.name
        )));
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRunStore;

    fn sample_frame(n: usize) -> Table {
        let amounts: Vec<f64> = (0..n).map(|i| (i * 37 % 100) as f64 + 0.5).collect();
        Table::new(vec![
            Column::text("user_id", (0..n).map(|i| format!("u{:04}", i)).collect()),
            Column::text("country", (0..n).map(|i| ["US", "GB", "CA"][i % 3]).collect()),
            Column::integer("n_orders", (0..n).map(|i| (i % 9) as i64).collect()),
            Column::integer(
                "is_high_value",
                amounts.iter().map(|&a| i64::from(a > 50.0)).collect(),
            ),
            Column::float("total_amount", amounts),
        ])
        .unwrap()
    }

    fn config() -> TrainConfig {
        TrainConfig {
            target: "is_high_value".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_train_persists_run_and_sets_latest() {
        let store = MemoryRunStore::new();
        let outcome = TrainingOrchestrator::new(&store)
            .train(&sample_frame(60), &config())
            .unwrap();

        assert_eq!(store.latest().unwrap().unwrap().run_id, outcome.run.id);
        assert_eq!(
            outcome.schema.required_feature_columns(),
            &["country", "n_orders", "total_amount"]
        );
        assert_eq!(outcome.summary.n_train + outcome.summary.n_test, 60);

        for kind in [
            ArtifactKind::Model,
            ArtifactKind::Schema,
            ArtifactKind::Metadata,
            ArtifactKind::Metrics(HOLDOUT_METRICS.into()),
            ArtifactKind::Metrics(BASELINE_SUMMARY.into()),
            ArtifactKind::Table("holdout_input.csv".into()),
            ArtifactKind::Table("holdout_predictions.csv".into()),
        ] {
            assert!(store.read_artifact(&outcome.run, &kind).is_ok(), "{:?}", kind);
        }
    }

    #[test]
    fn test_missing_target_creates_no_run() {
        let store = MemoryRunStore::new();
        let mut cfg = config();
        cfg.target = "churned".into();
        let err = TrainingOrchestrator::new(&store)
            .train(&sample_frame(20), &cfg)
            .unwrap_err();
        assert!(matches!(err, BaselineError::Configuration(_)));
        assert!(store.list_runs().unwrap().is_empty());
        assert!(store.latest().unwrap().is_none());
    }

    #[test]
    fn test_unknown_split_strategy_creates_no_run() {
        let store = MemoryRunStore::new();
        let mut cfg = config();
        cfg.split.strategy = "kfold".into();
        assert!(TrainingOrchestrator::new(&store)
            .train(&sample_frame(20), &cfg)
            .is_err());
        assert!(store.list_runs().unwrap().is_empty());
    }

    #[test]
    fn test_non_binary_target_is_rejected() {
        let frame = Table::new(vec![
            Column::float("x", vec![1.0, 2.0, 3.0, 4.0]),
            Column::integer("y", vec![0, 1, 2, 1]),
        ])
        .unwrap();
        let cfg = TrainConfig {
            target: "y".into(),
            ..Default::default()
        };
        let store = MemoryRunStore::new();
        assert!(matches!(
            TrainingOrchestrator::new(&store).train(&frame, &cfg),
            Err(BaselineError::Configuration(_))
        ));
    }

    #[test]
    fn test_leakage_columns_are_forbidden() {
        let store = MemoryRunStore::new();
        let mut cfg = config();
        cfg.leakage_columns = vec!["n_orders".into()];
        let outcome = TrainingOrchestrator::new(&store)
            .train(&sample_frame(60), &cfg)
            .unwrap();
        assert_eq!(
            outcome.schema.required_feature_columns(),
            &["country", "total_amount"]
        );
        assert!(outcome.schema.forbidden_columns().contains("n_orders"));
    }

    #[test]
    fn test_holdout_predictions_table_layout() {
        let store = MemoryRunStore::new();
        let outcome = TrainingOrchestrator::new(&store)
            .train(&sample_frame(60), &config())
            .unwrap();
        let bytes = store
            .read_artifact(
                &outcome.run,
                &ArtifactKind::Table("holdout_predictions.csv".into()),
            )
            .unwrap();
        let table = crate::tabular_io::decode_table(
            std::str::from_utf8(&bytes).unwrap(),
            TableFormat::Csv,
        )
        .unwrap();
        assert_eq!(
            table.column_names(),
            vec![
                "country",
                "n_orders",
                "total_amount",
                "user_id",
                "is_high_value_true",
                "is_high_value_pred",
                "is_high_value_pred_proba",
            ]
        );
        assert_eq!(table.n_rows(), outcome.summary.n_test);
    }
}
