//! Input schema: the frozen train-time feature contract
//!
//! An `InputSchema` records which feature columns a model was trained on
//! (in canonical order), the type bucket of each, which identifier columns
//! may be passed through, and which columns must never appear at serve time.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::{BaselineError, CoercionFailure, Result};
use crate::table::{Column, ColumnData, Table};

/// Logical type bucket of a feature column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Integer,
    Float,
    Text,
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DType::Integer => write!(f, "integer"),
            DType::Float => write!(f, "float"),
            DType::Text => write!(f, "text"),
        }
    }
}

impl DType {
    /// Coerce a column's values into this bucket
    pub fn coerce(self, column: &Column) -> std::result::Result<ColumnData, CoercionFailure> {
        let coerced = match self {
            DType::Integer => coerce_integer(&column.data),
            DType::Float => coerce_float(&column.data),
            DType::Text => Ok(coerce_text(&column.data)),
        };
        coerced.map_err(|example| CoercionFailure {
            column: column.name.clone(),
            expected: self,
            example,
        })
    }
}

/// Integers pass through; integral floats and integer-looking text convert
fn coerce_integer(data: &ColumnData) -> std::result::Result<ColumnData, String> {
    match data {
        ColumnData::Integer(v) => Ok(ColumnData::Integer(v.clone())),
        ColumnData::Float(v) => v
            .iter()
            .map(|&x| float_to_integer(x).ok_or_else(|| format!("{:?}", x)))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(ColumnData::Integer),
        ColumnData::Text(v) => v
            .iter()
            .map(|s| {
                let trimmed = s.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .or_else(|| trimmed.parse::<f64>().ok().and_then(float_to_integer))
                    .ok_or_else(|| s.clone())
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(ColumnData::Integer),
    }
}

fn float_to_integer(x: f64) -> Option<i64> {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < i64::MAX as f64 {
        Some(x as i64)
    } else {
        None
    }
}

/// Numbers widen to f64; numeric-looking text parses
fn coerce_float(data: &ColumnData) -> std::result::Result<ColumnData, String> {
    match data {
        ColumnData::Integer(v) => Ok(ColumnData::Float(v.iter().map(|&x| x as f64).collect())),
        ColumnData::Float(v) => Ok(ColumnData::Float(v.clone())),
        ColumnData::Text(v) => v
            .iter()
            .map(|s| s.trim().parse::<f64>().map_err(|_| s.clone()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(ColumnData::Float),
    }
}

/// Anything renders as text
fn coerce_text(data: &ColumnData) -> ColumnData {
    match data {
        ColumnData::Text(v) => ColumnData::Text(v.clone()),
        other => ColumnData::Text((0..other.len()).map(|i| other.cell_to_string(i)).collect()),
    }
}

/// Frozen feature contract of a training run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SchemaRecord")]
pub struct InputSchema {
    required_feature_columns: Vec<String>,
    feature_dtypes: BTreeMap<String, DType>,
    optional_id_columns: BTreeSet<String>,
    forbidden_columns: BTreeSet<String>,
}

/// Unchecked wire form of `InputSchema`
#[derive(Deserialize)]
struct SchemaRecord {
    required_feature_columns: Vec<String>,
    feature_dtypes: BTreeMap<String, DType>,
    #[serde(default)]
    optional_id_columns: BTreeSet<String>,
    #[serde(default)]
    forbidden_columns: BTreeSet<String>,
}

impl TryFrom<SchemaRecord> for InputSchema {
    type Error = BaselineError;

    fn try_from(record: SchemaRecord) -> Result<Self> {
        InputSchema::new(
            record.required_feature_columns,
            record.feature_dtypes,
            record.optional_id_columns,
            record.forbidden_columns,
        )
    }
}

impl InputSchema {
    /// Build a schema, enforcing its invariants
    ///
    /// Feature names are unique, `feature_dtypes` keys are exactly the
    /// required features, and required / optional id / forbidden sets are
    /// pairwise disjoint.
    pub fn new(
        required_feature_columns: Vec<String>,
        feature_dtypes: BTreeMap<String, DType>,
        optional_id_columns: BTreeSet<String>,
        forbidden_columns: BTreeSet<String>,
    ) -> Result<Self> {
        let required: BTreeSet<&String> = required_feature_columns.iter().collect();
        if required.len() != required_feature_columns.len() {
            return Err(BaselineError::Serialization(
                "schema lists a required feature more than once".to_string(),
            ));
        }
        if !required.iter().copied().eq(feature_dtypes.keys()) {
            return Err(BaselineError::Serialization(
                "schema dtypes do not match required feature columns".to_string(),
            ));
        }
        let overlaps = [
            (
                "required",
                "optional id",
                required_feature_columns
                    .iter()
                    .find(|c| optional_id_columns.contains(*c)),
            ),
            (
                "required",
                "forbidden",
                required_feature_columns
                    .iter()
                    .find(|c| forbidden_columns.contains(*c)),
            ),
            (
                "optional id",
                "forbidden",
                optional_id_columns.intersection(&forbidden_columns).next(),
            ),
        ];
        for (left, right, overlap) in overlaps {
            if let Some(column) = overlap {
                return Err(BaselineError::Serialization(format!(
                    "column '{}' is both {} and {}",
                    column, left, right
                )));
            }
        }

        Ok(Self {
            required_feature_columns,
            feature_dtypes,
            optional_id_columns,
            forbidden_columns,
        })
    }

    /// Derive the contract from a training frame
    ///
    /// Every column except the target and the id columns becomes a required
    /// feature, in frame order, with its current type bucket.
    pub fn from_training_frame<S: AsRef<str>>(
        frame: &Table,
        target: &str,
        id_columns: &[S],
    ) -> Self {
        let ids: BTreeSet<String> = id_columns
            .iter()
            .map(|s| s.as_ref().to_string())
            .filter(|name| name != target && frame.has_column(name))
            .collect();

        let features: Vec<&Column> = frame
            .columns()
            .iter()
            .filter(|c| c.name != target && !ids.contains(&c.name))
            .collect();

        Self {
            required_feature_columns: features.iter().map(|c| c.name.clone()).collect(),
            feature_dtypes: features.iter().map(|c| (c.name.clone(), c.dtype())).collect(),
            optional_id_columns: ids,
            forbidden_columns: BTreeSet::from([target.to_string()]),
        }
    }

    /// Add known leakage columns to the forbidden set
    ///
    /// Leakage columns are removed from the features and id sets first, so
    /// the result stays disjoint.
    pub fn with_leakage_columns<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        for column in columns {
            let column = column.as_ref();
            self.required_feature_columns.retain(|c| c != column);
            self.feature_dtypes.remove(column);
            self.optional_id_columns.remove(column);
            self.forbidden_columns.insert(column.to_string());
        }
        self
    }

    pub fn required_feature_columns(&self) -> &[String] {
        &self.required_feature_columns
    }

    pub fn feature_dtypes(&self) -> &BTreeMap<String, DType> {
        &self.feature_dtypes
    }

    pub fn dtype_of(&self, column: &str) -> Option<DType> {
        self.feature_dtypes.get(column).copied()
    }

    pub fn optional_id_columns(&self) -> &BTreeSet<String> {
        &self.optional_id_columns
    }

    pub fn forbidden_columns(&self) -> &BTreeSet<String> {
        &self.forbidden_columns
    }

    /// Serialize to the persisted JSON record
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a persisted JSON record
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Write the record to `path`
    pub fn dump(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Read a record from `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}
