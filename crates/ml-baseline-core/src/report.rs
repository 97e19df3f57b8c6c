//! Run inspection
//!
//! Gathers what a caller needs to look at a run without loading the model:
//! metadata, holdout metrics and the frozen schema.

use serde::Serialize;
use std::path::PathBuf;

use crate::error::Result;
use crate::metrics::ClassificationMetrics;
use crate::schema::InputSchema;
use crate::store::{RunId, RunRef, RunStore};

/// Everything `show-run` displays about one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    /// Whether the latest pointer currently names this run
    pub is_latest: bool,
    pub location: PathBuf,
    pub metadata: serde_json::Value,
    pub metrics: ClassificationMetrics,
    pub schema: InputSchema,
}

/// Summarize the run referenced by `run_ref`
pub fn describe_run<S: RunStore>(store: &S, run_ref: &RunRef) -> Result<RunReport> {
    let run = store.resolve(run_ref)?;
    let is_latest = store
        .latest()?
        .map(|pointer| pointer.run_id == run.id)
        .unwrap_or(false);

    Ok(RunReport {
        metadata: store.load_metadata(&run)?,
        metrics: store.load_metrics(&run)?,
        schema: store.load_schema(&run)?,
        is_latest,
        location: run.location,
        run_id: run.id,
    })
}

/// All runs, oldest first, each paired with whether it is the latest
pub fn list_runs<S: RunStore>(store: &S) -> Result<Vec<(RunId, bool)>> {
    let latest = store.latest()?.map(|p| p.run_id);
    Ok(store
        .list_runs()?
        .into_iter()
        .map(|id| {
            let is_latest = latest.as_ref() == Some(&id);
            (id, is_latest)
        })
        .collect())
}
