//! ML Baseline Core
//!
//! Train a tabular binary classifier, freeze the exact feature contract it
//! was trained on, and serve predictions from versioned run directories.
//!
//! ## Features
//!
//! - **Input Schema**: required features (ordered), type buckets, passthrough
//!   identifier columns and forbidden columns, captured at training time
//! - **Validation/Alignment**: serve-time input is checked against the schema
//!   in a fixed order (forbidden, missing, reorder, coerce, identifiers)
//! - **Run Store**: one immutable directory per training run plus a versioned
//!   "latest" pointer, behind the `RunStore` trait
//! - **Split Strategies**: stratified random, time-ordered and group-held-out
//! - **Baseline Pipeline**: standardization + one-hot encoding + logistic
//!   regression, serialized as JSON
//!
//! ## Architecture
//!
//! 1. **Schema** (`schema`): the frozen train-time contract.
//!
//! 2. **Validate** (`validate`): `validate_and_align` turns arbitrary input
//!    into scoring-ready features plus passthrough identifiers.
//!
//! 3. **Store** (`store`): `FsRunStore` on disk, `MemoryRunStore` for tests.
//!
//! 4. **Orchestrators** (`train`, `predict`): one training cycle, one
//!    scoring batch.
//!
//! 5. **Collaborators** (`table`, `tabular_io`, `pipeline`, `metrics`,
//!    `splits`, `config`).
//!
//! ## Example
//!
//! ```rust,no_run
//! use ml_baseline_core::{
//!     read_table, FsRunStore, PredictionOrchestrator, RunRef, TrainConfig,
//!     TrainingOrchestrator,
//! };
//! use std::path::Path;
//!
//! fn main() -> ml_baseline_core::Result<()> {
//!     let store = FsRunStore::new("models");
//!
//!     let config = TrainConfig {
//!         target: "is_high_value".to_string(),
//!         ..Default::default()
//!     };
//!     let data = read_table(Path::new("data/sample.csv"))?;
//!     let outcome = TrainingOrchestrator::new(&store).train(&data, &config)?;
//!     println!("trained run {}", outcome.run.id);
//!
//!     let input = read_table(Path::new("data/new_users.csv"))?;
//!     let scored = PredictionOrchestrator::new(&store).predict(&RunRef::Latest, &input)?;
//!     println!("{} rows scored", scored.output.n_rows());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod predict;
pub mod report;
pub mod schema;
pub mod splits;
pub mod store;
pub mod table;
pub mod tabular_io;
pub mod train;
pub mod validate;

// Re-export commonly used types
pub use config::{SplitConfig, TrainConfig};
pub use error::{BaselineError, CoercionFailure, Result, Violation};
pub use metrics::{classification_metrics, ClassificationMetrics};
pub use pipeline::{BaselinePipeline, Classifier, FittedPipeline, PipelineParams};
pub use predict::{
    score_batch, PredictionOrchestrator, PredictionOutcome, DEFAULT_OUTPUT, PREDICTION_COLUMN,
    PROBABILITY_COLUMN,
};
pub use report::{describe_run, RunReport};
pub use schema::{DType, InputSchema};
pub use splits::{SplitIndices, SplitParams, SplitStrategy, VALID_STRATEGIES};
pub use store::{
    ArtifactKind, FsRunStore, LatestPointer, MemoryRunStore, RunHandle, RunId, RunRef, RunStore,
};
pub use table::{Column, ColumnData, Table};
pub use tabular_io::{read_table, read_table_verbatim, write_table, TableFormat};
pub use train::{RunMetadata, TrainOutcome, TrainingOrchestrator, TrainingSummary};
pub use validate::{validate_and_align, AlignmentStep, ValidatedBatch};

/// Library version (from Cargo.toml)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
