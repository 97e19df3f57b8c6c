//! Run store: versioned run directories and the "latest" pointer
//!
//! Every training run gets its own immutable directory holding the model,
//! the frozen input schema, metrics, holdout tables and run metadata.
//! A single registry pointer names the most recently completed run.
//!
//! ```text
//! <root>/
//!   runs/<run_id>/
//!     model/model.json
//!     schema/input_schema.json
//!     metrics/<name>.json
//!     tables/<file>
//!     run_meta.json
//!   registry/latest.json
//! ```

pub mod fs;
pub mod memory;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{BaselineError, Result};
use crate::metrics::ClassificationMetrics;
use crate::pipeline::FittedPipeline;
use crate::schema::InputSchema;

pub use self::fs::FsRunStore;
pub use self::memory::MemoryRunStore;

/// Directory holding run directories, relative to the store root
pub const RUNS_DIR: &str = "runs";
/// Directory holding the latest pointer, relative to the store root
pub const REGISTRY_DIR: &str = "registry";
/// File name of the latest pointer
pub const LATEST_FILE: &str = "latest.json";
/// Metrics record holding the holdout classification metrics
pub const HOLDOUT_METRICS: &str = "holdout_metrics";
/// Metrics record holding the run summary
pub const BASELINE_SUMMARY: &str = "baseline_holdout";

/// Identifier of a training run
///
/// Generated ids look like `20240131_142502_123456_1a2b3c4d`: a UTC
/// timestamp with microseconds followed by eight random hex digits, so
/// lexical order matches creation order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Generate a fresh, practically unique identifier
    pub fn generate() -> Self {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S_%6f");
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        RunId(format!("{}_{}", timestamp, &suffix[..8]))
    }

    /// Accept an existing identifier, rejecting anything that is not a
    /// single path component
    pub fn parse(id: &str) -> Result<Self> {
        let valid = !id.is_empty()
            && id != "."
            && id != ".."
            && !id.contains('/')
            && !id.contains('\\');
        if valid {
            Ok(RunId(id.to_string()))
        } else {
            Err(BaselineError::run_not_found(format!(
                "'{}' is not a valid run id",
                id
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to a run: either the latest pointer or an explicit id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunRef {
    Latest,
    Id(RunId),
}

impl FromStr for RunRef {
    type Err = BaselineError;

    fn from_str(s: &str) -> Result<Self> {
        if s == "latest" {
            Ok(RunRef::Latest)
        } else {
            RunId::parse(s).map(RunRef::Id)
        }
    }
}

impl fmt::Display for RunRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunRef::Latest => f.write_str("latest"),
            RunRef::Id(id) => write!(f, "{}", id),
        }
    }
}

/// Kinds of artifact stored in a run
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Serialized fitted pipeline
    Model,
    /// Frozen input schema
    Schema,
    /// Named metrics record, e.g. `holdout_metrics`
    Metrics(String),
    /// Run metadata (config, data stats, timestamps)
    Metadata,
    /// Table file, e.g. `holdout_input.csv`
    Table(String),
}

impl ArtifactKind {
    /// Location inside the run directory
    pub fn relative_path(&self) -> PathBuf {
        match self {
            ArtifactKind::Model => Path::new("model").join("model.json"),
            ArtifactKind::Schema => Path::new("schema").join("input_schema.json"),
            ArtifactKind::Metrics(name) => Path::new("metrics").join(format!("{}.json", name)),
            ArtifactKind::Metadata => PathBuf::from("run_meta.json"),
            ArtifactKind::Table(file) => Path::new("tables").join(file),
        }
    }

    /// Short human-readable name used in diagnostics
    pub fn label(&self) -> String {
        match self {
            ArtifactKind::Model => "model".to_string(),
            ArtifactKind::Schema => "input schema".to_string(),
            ArtifactKind::Metrics(name) => format!("metrics '{}'", name),
            ArtifactKind::Metadata => "run metadata".to_string(),
            ArtifactKind::Table(file) => format!("table '{}'", file),
        }
    }
}

/// A run that exists in a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHandle {
    pub id: RunId,
    /// Run directory (a virtual path for in-memory stores)
    pub location: PathBuf,
}

/// Contents of the registry's latest pointer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestPointer {
    pub run_id: RunId,
    pub updated_at: DateTime<Utc>,
    /// Incremented on every update
    pub version: u64,
}

/// Persistence seam for training runs
///
/// A store owns run directories and the latest pointer. Runs are only
/// ever added; the pointer is replaced atomically.
pub trait RunStore {
    /// Create an empty run with a freshly generated id
    fn create_run(&self) -> Result<RunHandle>;

    /// Write one artifact, returning where it was stored
    fn write_artifact(&self, run: &RunHandle, kind: &ArtifactKind, bytes: &[u8])
        -> Result<PathBuf>;

    /// Read one artifact; an absent artifact is `ArtifactMissing`
    fn read_artifact(&self, run: &RunHandle, kind: &ArtifactKind) -> Result<Vec<u8>>;

    /// Point "latest" at `run`
    fn set_latest(&self, run: &RunHandle) -> Result<LatestPointer>;

    /// Current latest pointer, if any run was ever recorded
    fn latest(&self) -> Result<Option<LatestPointer>>;

    /// Open an existing run; an unknown id is `RunNotFound`
    fn open_run(&self, id: &RunId) -> Result<RunHandle>;

    /// All run ids, oldest first
    fn list_runs(&self) -> Result<Vec<RunId>>;

    /// Resolve a reference to an existing run
    fn resolve(&self, run_ref: &RunRef) -> Result<RunHandle> {
        match run_ref {
            RunRef::Id(id) => self.open_run(id),
            RunRef::Latest => {
                let pointer = self.latest()?.ok_or_else(|| {
                    BaselineError::run_not_found("no 'latest' run recorded; train a model first")
                })?;
                self.open_run(&pointer.run_id)
            }
        }
    }

    /// Serialize `value` as pretty JSON and store it
    fn write_json<T: Serialize>(
        &self,
        run: &RunHandle,
        kind: &ArtifactKind,
        value: &T,
    ) -> Result<PathBuf>
    where
        Self: Sized,
    {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_artifact(run, kind, &bytes)
    }

    /// Read and parse a JSON artifact
    fn read_json<T: DeserializeOwned>(&self, run: &RunHandle, kind: &ArtifactKind) -> Result<T>
    where
        Self: Sized,
    {
        let bytes = self.read_artifact(run, kind)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Load the fitted pipeline of a run
    fn load_model(&self, run: &RunHandle) -> Result<FittedPipeline>
    where
        Self: Sized,
    {
        let bytes = self.read_artifact(run, &ArtifactKind::Model)?;
        FittedPipeline::from_bytes(&bytes)
    }

    /// Load the frozen input schema of a run
    fn load_schema(&self, run: &RunHandle) -> Result<InputSchema>
    where
        Self: Sized,
    {
        self.read_json(run, &ArtifactKind::Schema)
    }

    /// Load the holdout metrics of a run
    fn load_metrics(&self, run: &RunHandle) -> Result<ClassificationMetrics>
    where
        Self: Sized,
    {
        self.read_json(run, &ArtifactKind::Metrics(HOLDOUT_METRICS.to_string()))
    }

    /// Load the run metadata as an untyped JSON document
    fn load_metadata(&self, run: &RunHandle) -> Result<serde_json::Value>
    where
        Self: Sized,
    {
        self.read_json(run, &ArtifactKind::Metadata)
    }
}
