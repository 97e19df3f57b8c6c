//! Error types for the ML baseline core
//!
//! Contract failures (configuration, schema violations, missing runs and
//! artifacts) are caller-recoverable; collaborator failures (I/O, parsing,
//! model fitting) are fatal for the current operation.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::schema::DType;

/// A feature column whose values could not be coerced to the declared type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercionFailure {
    /// Column name
    pub column: String,
    /// Declared type bucket from the schema
    pub expected: DType,
    /// First offending value, rendered as text
    pub example: String,
}

impl fmt::Display for CoercionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (expected {}, e.g. '{}')",
            self.column, self.expected, self.example
        )
    }
}

/// Structured description of why an input table breaks the schema contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Columns the schema forbids at serve time (usually the label)
    ForbiddenColumns(Vec<String>),
    /// Required feature columns absent from the input
    MissingColumns(Vec<String>),
    /// Feature columns whose values do not fit their declared type
    Coercion(Vec<CoercionFailure>),
}

impl Violation {
    /// Names of every offending column
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Violation::ForbiddenColumns(cols) | Violation::MissingColumns(cols) => {
                cols.iter().map(String::as_str).collect()
            }
            Violation::Coercion(failures) => failures.iter().map(|f| f.column.as_str()).collect(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::ForbiddenColumns(cols) => {
                write!(f, "Forbidden columns present: {{{}}}", cols.join(", "))
            }
            Violation::MissingColumns(cols) => {
                write!(f, "Missing required columns: {{{}}}", cols.join(", "))
            }
            Violation::Coercion(failures) => {
                let rendered: Vec<String> = failures.iter().map(|c| c.to_string()).collect();
                write!(f, "Type coercion failed: {{{}}}", rendered.join(", "))
            }
        }
    }
}

/// Main error type for training, storage and prediction operations
#[derive(Error, Debug)]
pub enum BaselineError {
    /// Invalid or missing training configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Input table does not honour the frozen schema
    #[error("Schema violation: {0}")]
    SchemaViolation(Violation),

    /// No run matches the reference (or no run was ever recorded as latest)
    #[error("Run not found: {0}")]
    RunNotFound(String),

    /// The run exists but one of its artifacts is absent
    #[error("Artifact missing: {artifact} not found at {}", .path.display())]
    ArtifactMissing { artifact: String, path: PathBuf },

    /// A run directory with the generated identifier already exists
    #[error("Run collision: run '{0}' already exists")]
    RunCollision(String),

    /// The batch has zero rows and cannot be fitted or scored
    #[error("Empty batch: {0}")]
    EmptyBatch(String),

    /// Structurally invalid table (ragged columns, duplicate names)
    #[error("Invalid table: {0}")]
    InvalidTable(String),

    /// Failure raised by the modeling collaborator
    #[error("Model error: {0}")]
    Model(String),

    /// Input file or record could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Artifact serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// File access or I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BaselineError {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        BaselineError::Configuration(msg.into())
    }

    /// Create a run-not-found error
    pub fn run_not_found(msg: impl Into<String>) -> Self {
        BaselineError::RunNotFound(msg.into())
    }

    /// Create an artifact-missing error
    pub fn artifact_missing(artifact: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        BaselineError::ArtifactMissing {
            artifact: artifact.into(),
            path: path.into(),
        }
    }

    /// Create an invalid table error
    pub fn invalid_table(msg: impl Into<String>) -> Self {
        BaselineError::InvalidTable(msg.into())
    }

    /// Create a model error
    pub fn model(msg: impl Into<String>) -> Self {
        BaselineError::Model(msg.into())
    }

    /// Structured violation, if this is a schema violation
    pub fn violation(&self) -> Option<&Violation> {
        match self {
            BaselineError::SchemaViolation(v) => Some(v),
            _ => None,
        }
    }

    /// Check if this is a caller error (fix input or config and retry)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            BaselineError::Configuration(_)
                | BaselineError::SchemaViolation(_)
                | BaselineError::RunNotFound(_)
                | BaselineError::ArtifactMissing { .. }
                | BaselineError::EmptyBatch(_)
                | BaselineError::InvalidTable(_)
                | BaselineError::Parse(_)
        )
    }
}

impl From<Violation> for BaselineError {
    fn from(violation: Violation) -> Self {
        BaselineError::SchemaViolation(violation)
    }
}

impl From<serde_json::Error> for BaselineError {
    fn from(err: serde_json::Error) -> Self {
        BaselineError::Serialization(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for BaselineError {
    fn from(err: serde_yaml::Error) -> Self {
        BaselineError::Parse(format!("YAML error: {}", err))
    }
}

impl From<toml::de::Error> for BaselineError {
    fn from(err: toml::de::Error) -> Self {
        BaselineError::Parse(format!("TOML error: {}", err))
    }
}

impl From<csv::Error> for BaselineError {
    fn from(err: csv::Error) -> Self {
        BaselineError::Parse(format!("CSV error: {}", err))
    }
}

/// Result type alias for baseline operations
pub type Result<T> = std::result::Result<T, BaselineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_display_names_every_column() {
        let v = Violation::ForbiddenColumns(vec!["is_high_value".into(), "label".into()]);
        assert_eq!(v.to_string(), "Forbidden columns present: {is_high_value, label}");

        let v = Violation::MissingColumns(vec!["total_amount".into()]);
        assert_eq!(v.to_string(), "Missing required columns: {total_amount}");
    }

    #[test]
    fn test_coercion_display() {
        let v = Violation::Coercion(vec![CoercionFailure {
            column: "n_orders".into(),
            expected: DType::Integer,
            example: "many".into(),
        }]);
        assert_eq!(
            v.to_string(),
            "Type coercion failed: {n_orders (expected integer, e.g. 'many')}"
        );
        assert_eq!(v.columns(), vec!["n_orders"]);
    }

    #[test]
    fn test_artifact_missing_display() {
        let err = BaselineError::artifact_missing("model", "/tmp/run/model/model.json");
        assert_eq!(
            err.to_string(),
            "Artifact missing: model not found at /tmp/run/model/model.json"
        );
    }

    #[test]
    fn test_is_user_error() {
        assert!(BaselineError::configuration("x").is_user_error());
        assert!(BaselineError::run_not_found("x").is_user_error());
        assert!(BaselineError::from(Violation::MissingColumns(vec![])).is_user_error());
        assert!(!BaselineError::model("x").is_user_error());
        assert!(!BaselineError::Internal("x".into()).is_user_error());
    }
}
