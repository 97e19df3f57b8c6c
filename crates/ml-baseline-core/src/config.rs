//! Training configuration
//!
//! A `TrainConfig` can be loaded from JSON, YAML or TOML (picked by file
//! extension) and then overridden field by field from the command line.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{BaselineError, Result};
use crate::pipeline::PipelineParams;
use crate::splits::{SplitParams, SplitStrategy};

/// Split section of the training configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// One of `random`, `time`, `group`
    pub strategy: String,
    pub time_column: Option<String>,
    pub group_column: Option<String>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            strategy: "random".to_string(),
            time_column: None,
            group_column: None,
        }
    }
}

/// Everything one training invocation needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Training data file (only consulted by callers that load data)
    pub data_path: Option<PathBuf>,
    /// Label column
    pub target: String,
    /// Identifier column passed through at serve time, if present in the data
    pub id_column: Option<String>,
    /// Fraction of rows held out for evaluation
    pub test_size: f64,
    pub random_state: u64,
    pub split: SplitConfig,
    /// Columns excluded from features and forbidden at serve time
    pub leakage_columns: Vec<String>,
    pub model: PipelineParams,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            target: String::new(),
            id_column: Some("user_id".to_string()),
            test_size: 0.2,
            random_state: 42,
            split: SplitConfig::default(),
            leakage_columns: Vec::new(),
            model: PipelineParams::default(),
        }
    }
}

impl TrainConfig {
    /// Load a configuration file; the format follows the extension
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let config = match extension.as_str() {
            "json" => serde_json::from_str(&content)
                .map_err(|e| BaselineError::Parse(format!("Invalid JSON: {}", e)))?,
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "toml" => toml::from_str(&content)?,
            _ => {
                return Err(BaselineError::configuration(format!(
                    "Unsupported config format: '{}'. Supported formats: json, yaml, yml, toml",
                    extension
                )))
            }
        };
        tracing::debug!(path = %path.display(), "Loaded training configuration");
        Ok(config)
    }

    /// Check value ranges and build the split strategy once to surface
    /// unknown names and missing split columns
    pub fn validate(&self) -> Result<()> {
        if self.target.trim().is_empty() {
            return Err(BaselineError::configuration("target column must be set"));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(BaselineError::configuration(format!(
                "test_size must be strictly between 0 and 1, got {}",
                self.test_size
            )));
        }
        if self.model.max_iter == 0 || self.model.l2 < 0.0 || !(self.model.tolerance > 0.0) {
            return Err(BaselineError::configuration(
                "model requires max_iter > 0, l2 >= 0 and tolerance > 0",
            ));
        }
        self.split_strategy().map(|_| ())
    }

    /// The configured split strategy
    pub fn split_strategy(&self) -> Result<SplitStrategy> {
        SplitStrategy::from_name(
            &self.split.strategy,
            &SplitParams {
                test_size: self.test_size,
                random_state: self.random_state,
                time_column: self.split.time_column.clone(),
                group_column: self.split.group_column.clone(),
            },
        )
    }
}
