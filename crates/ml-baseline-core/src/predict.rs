//! Prediction orchestrator
//!
//! Resolves a run, validates the input against the run's frozen schema and
//! scores it. The output holds the passthrough identifier columns followed
//! by `prediction` and `prediction_proba`, row for row with the input.

use std::path::{Path, PathBuf};

use crate::error::{BaselineError, Result};
use crate::pipeline::Classifier;
use crate::store::{RunId, RunRef, RunStore};
use crate::table::{Column, Table};
use crate::tabular_io::{read_table_verbatim, write_table};
use crate::validate::{validate_and_align, ValidatedBatch};

/// Name of the hard label column in prediction output
pub const PREDICTION_COLUMN: &str = "prediction";
/// Name of the positive-class probability column in prediction output
pub const PROBABILITY_COLUMN: &str = "prediction_proba";
/// Where `predict_file` writes when no output path is given
pub const DEFAULT_OUTPUT: &str = "output/predictions.csv";

/// Scored batch together with the run that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionOutcome {
    pub run_id: RunId,
    pub output: Table,
}

/// Serves predictions from runs in a `RunStore`
pub struct PredictionOrchestrator<'a, S: RunStore> {
    store: &'a S,
}

impl<'a, S: RunStore> PredictionOrchestrator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Score `input` with the model of `run_ref`
    pub fn predict(&self, run_ref: &RunRef, input: &Table) -> Result<PredictionOutcome> {
        let run = self.store.resolve(run_ref)?;
        let model = self.store.load_model(&run)?;
        let schema = self.store.load_schema(&run)?;

        let batch = validate_and_align(input, &schema)?;
        if batch.features.n_rows() == 0 {
            return Err(BaselineError::EmptyBatch(
                "input has zero rows; nothing to score".to_string(),
            ));
        }

        let output = score_batch(&model, batch)?;
        tracing::info!(run_id = %run.id, rows = output.n_rows(), "Scored batch");
        Ok(PredictionOutcome {
            run_id: run.id,
            output,
        })
    }

    /// Read `input`, score it and write the result to `output`
    /// (default [`DEFAULT_OUTPUT`]), returning the path written
    pub fn predict_file(
        &self,
        run_ref: &RunRef,
        input: &Path,
        output: Option<&Path>,
    ) -> Result<(PredictionOutcome, PathBuf)> {
        let table = read_table_verbatim(input)?;
        let outcome = self.predict(run_ref, &table)?;
        let path = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
        write_table(&path, &outcome.output)?;
        tracing::info!(path = %path.display(), "Wrote predictions");
        Ok((outcome, path))
    }
}

/// Score an aligned batch and assemble the output table
pub fn score_batch(model: &dyn Classifier, batch: ValidatedBatch) -> Result<Table> {
    let labels = model.predict(&batch.features)?;
    let probabilities = model.predict_proba(&batch.features)?;
    let n_rows = batch.features.n_rows();
    if labels.len() != n_rows || probabilities.len() != n_rows {
        return Err(BaselineError::model(format!(
            "model returned {} labels and {} probabilities for {} rows",
            labels.len(),
            probabilities.len(),
            n_rows
        )));
    }

    let mut output = batch.passthrough;
    output.push_column(Column::integer(PREDICTION_COLUMN, labels))?;
    output.push_column(Column::float(PROBABILITY_COLUMN, probabilities))?;
    Ok(output)
}
