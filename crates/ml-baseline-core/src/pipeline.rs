//! Baseline modeling pipeline
//!
//! Numeric columns are standardized with the training mean and standard
//! deviation, text columns are one-hot encoded with the categories seen at
//! fit time (unseen categories encode as all zeros), and an L2-regularized
//! logistic regression is fitted with `linfa-logistic` on the encoded
//! `ndarray` design matrix. Fitting is deterministic: the same data and
//! parameters always give the same model.

use linfa::traits::Fit;
use linfa::Dataset;
use linfa_logistic::LogisticRegression;
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::{BaselineError, Result};
use crate::table::{Column, ColumnData, Table};

/// Model family recorded in artifacts
pub const MODEL_TYPE: &str = "LogisticRegression";

/// Hyperparameters of the baseline pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineParams {
    /// Maximum number of solver iterations
    pub max_iter: usize,
    /// L2 penalty on the weights (not the intercept)
    pub l2: f64,
    /// Solver stops once the gradient norm falls below this
    pub tolerance: f64,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            l2: 1.0,
            tolerance: 1e-4,
        }
    }
}

/// A fitted binary classifier over aligned feature tables
#[cfg_attr(test, mockall::automock)]
pub trait Classifier {
    /// Probability of the positive class for each row
    fn predict_proba(&self, features: &Table) -> Result<Vec<f64>>;

    /// Hard 0/1 label for each row
    fn predict(&self, features: &Table) -> Result<Vec<i64>>;
}

/// Per-column preprocessing learned at fit time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnTransform {
    Standardize {
        column: String,
        mean: f64,
        scale: f64,
    },
    OneHot {
        column: String,
        categories: Vec<String>,
    },
}

impl ColumnTransform {
    fn learn(column: &Column) -> Result<Self> {
        match &column.data {
            ColumnData::Text(values) => {
                let mut categories = values.clone();
                categories.sort();
                categories.dedup();
                Ok(ColumnTransform::OneHot {
                    column: column.name.clone(),
                    categories,
                })
            }
            _ => {
                let values = numeric_values(column)?;
                let std = values.std(0.0);
                Ok(ColumnTransform::Standardize {
                    column: column.name.clone(),
                    mean: values.mean().unwrap_or(0.0),
                    scale: if std > f64::EPSILON { std } else { 1.0 },
                })
            }
        }
    }

    fn column(&self) -> &str {
        match self {
            ColumnTransform::Standardize { column, .. } | ColumnTransform::OneHot { column, .. } => {
                column
            }
        }
    }

    /// Number of design-matrix columns this transform produces
    fn width(&self) -> usize {
        match self {
            ColumnTransform::Standardize { .. } => 1,
            ColumnTransform::OneHot { categories, .. } => categories.len(),
        }
    }

    /// Write this column's encoded values into `design` starting at `offset`
    fn apply(&self, column: &Column, design: &mut Array2<f64>, offset: usize) -> Result<()> {
        match self {
            ColumnTransform::Standardize { mean, scale, .. } => {
                let standardized = (numeric_values(column)? - *mean) / *scale;
                design.column_mut(offset).assign(&standardized);
            }
            ColumnTransform::OneHot { categories, .. } => {
                for row in 0..design.nrows() {
                    let value = column.data.cell_to_string(row);
                    if let Ok(pos) = categories.binary_search(&value) {
                        design[[row, offset + pos]] = 1.0;
                    }
                }
            }
        }
        Ok(())
    }
}

fn numeric_values(column: &Column) -> Result<Array1<f64>> {
    let values: Array1<f64> = match &column.data {
        ColumnData::Integer(v) => v.iter().map(|&x| x as f64).collect(),
        ColumnData::Float(v) => Array1::from(v.clone()),
        ColumnData::Text(_) => {
            return Err(BaselineError::model(format!(
                "column '{}' is text but the model expects numbers",
                column.name
            )))
        }
    };
    if let Some(bad) = values.iter().find(|x| !x.is_finite()) {
        return Err(BaselineError::model(format!(
            "column '{}' contains non-finite value {}",
            column.name, bad
        )));
    }
    Ok(values)
}

/// Builder for the baseline pipeline
#[derive(Debug, Clone, Default)]
pub struct BaselinePipeline {
    params: PipelineParams,
}

impl BaselinePipeline {
    pub fn new(params: PipelineParams) -> Self {
        Self { params }
    }

    /// Fit preprocessing and the classifier on `features` with 0/1 `target`
    pub fn fit(&self, features: &Table, target: &[i64]) -> Result<FittedPipeline> {
        if features.n_rows() == 0 {
            return Err(BaselineError::EmptyBatch(
                "training features have zero rows".to_string(),
            ));
        }
        if target.len() != features.n_rows() {
            return Err(BaselineError::Internal(format!(
                "{} labels for {} rows",
                target.len(),
                features.n_rows()
            )));
        }
        if let Some(bad) = target.iter().find(|&&y| y != 0 && y != 1) {
            return Err(BaselineError::model(format!(
                "target must be 0/1, found {}",
                bad
            )));
        }
        if !(target.contains(&0) && target.contains(&1)) {
            return Err(BaselineError::model(
                "training rows hold a single class; both 0 and 1 are required",
            ));
        }

        let transforms = features
            .columns()
            .iter()
            .map(ColumnTransform::learn)
            .collect::<Result<Vec<_>>>()?;
        let mut fitted = FittedPipeline {
            model_type: MODEL_TYPE.to_string(),
            feature_columns: features.column_names().into_iter().map(String::from).collect(),
            weights: vec![0.0; transforms.iter().map(ColumnTransform::width).sum()],
            transforms,
            intercept: 0.0,
            params: self.params.clone(),
        };

        let design = fitted.design_matrix(features)?;
        let labels: Array1<bool> = target.iter().map(|&y| y == 1).collect();
        let dataset = Dataset::new(design, labels);

        let model = LogisticRegression::default()
            .alpha(self.params.l2)
            .max_iterations(self.params.max_iter as u64)
            .gradient_tolerance(self.params.tolerance)
            .fit(&dataset)
            .map_err(|e| BaselineError::model(format!("logistic regression fit failed: {}", e)))?;

        // linfa picks its own positive class; store coefficients for label 1
        let sign = if model.labels().pos.class { 1.0 } else { -1.0 };
        fitted.weights = model.params().iter().map(|w| sign * w).collect();
        fitted.intercept = sign * model.intercept();

        tracing::debug!(
            rows = features.n_rows(),
            width = fitted.weights.len(),
            "Fitted baseline pipeline"
        );
        Ok(fitted)
    }
}

/// Fitted preprocessing plus logistic regression coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    pub model_type: String,
    /// Feature columns the pipeline was fitted on, in order
    pub feature_columns: Vec<String>,
    pub transforms: Vec<ColumnTransform>,
    /// Coefficients on the encoded features, oriented towards label 1
    pub weights: Vec<f64>,
    pub intercept: f64,
    pub params: PipelineParams,
}

impl FittedPipeline {
    /// Serialize to the opaque model blob
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let fitted: FittedPipeline = serde_json::from_slice(bytes)?;
        let width = fitted.n_encoded_features();
        if width != fitted.weights.len() {
            return Err(BaselineError::Serialization(format!(
                "model has {} weights for {} encoded features",
                fitted.weights.len(),
                width
            )));
        }
        Ok(fitted)
    }

    /// Width of the encoded design matrix
    pub fn n_encoded_features(&self) -> usize {
        self.transforms.iter().map(ColumnTransform::width).sum()
    }

    fn design_matrix(&self, features: &Table) -> Result<Array2<f64>> {
        let mut design = Array2::zeros((features.n_rows(), self.n_encoded_features()));
        let mut offset = 0;
        for transform in &self.transforms {
            let column = features.column(transform.column()).ok_or_else(|| {
                BaselineError::model(format!(
                    "feature '{}' missing from scoring table",
                    transform.column()
                ))
            })?;
            transform.apply(column, &mut design, offset)?;
            offset += transform.width();
        }
        Ok(design)
    }
}

impl Classifier for FittedPipeline {
    fn predict_proba(&self, features: &Table) -> Result<Vec<f64>> {
        if features.n_rows() == 0 {
            return Err(BaselineError::EmptyBatch(
                "scoring features have zero rows".to_string(),
            ));
        }
        let design = self.design_matrix(features)?;
        let logits = design.dot(&ArrayView1::from(self.weights.as_slice())) + self.intercept;
        Ok(logits.mapv(sigmoid).to_vec())
    }

    fn predict(&self, features: &Table) -> Result<Vec<i64>> {
        Ok(self
            .predict_proba(features)?
            .into_iter()
            .map(|p| i64::from(p >= 0.5))
            .collect())
    }
}

/// Logistic function without overflow for large |z|
fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn training_data() -> (Table, Vec<i64>) {
        let amounts: Vec<f64> = (0..40).map(|i| i as f64 * 2.5).collect();
        let target: Vec<i64> = amounts.iter().map(|&a| i64::from(a > 50.0)).collect();
        let table = Table::new(vec![
            Column::text(
                "country",
                (0..40).map(|i| ["US", "GB", "CA"][i % 3]).collect(),
            ),
            Column::integer("n_orders", (0..40).map(|i| (i % 7) as i64).collect()),
            Column::float("total_amount", amounts),
        ])
        .unwrap();
        (table, target)
    }

    #[test]
    fn test_fit_separates_obvious_signal() {
        let (table, target) = training_data();
        let fitted = BaselinePipeline::default().fit(&table, &target).unwrap();
        let predicted = fitted.predict(&table).unwrap();
        let correct = predicted.iter().zip(&target).filter(|(p, t)| p == t).count();
        assert!(correct >= 36, "only {} of 40 correct", correct);
    }

    #[test]
    fn test_probability_tracks_positive_label() {
        let (table, target) = training_data();
        let fitted = BaselinePipeline::default().fit(&table, &target).unwrap();
        let proba = fitted.predict_proba(&table).unwrap();
        assert!(proba[39] > 0.5, "high amount scored {}", proba[39]);
        assert!(proba[0] < 0.5, "low amount scored {}", proba[0]);
        assert_eq!(fitted.weights.len(), fitted.n_encoded_features());
        assert_eq!(fitted.n_encoded_features(), 5);
    }

    #[test]
    fn test_single_class_training_is_model_error() {
        let table = Table::new(vec![Column::float("x", vec![1.0, 2.0, 3.0])]).unwrap();
        assert!(matches!(
            BaselinePipeline::default().fit(&table, &[1, 1, 1]),
            Err(BaselineError::Model(_))
        ));
    }

    #[test]
    fn test_blob_with_wrong_width_is_rejected() {
        let (table, target) = training_data();
        let mut fitted = BaselinePipeline::default().fit(&table, &target).unwrap();
        fitted.weights.pop();
        let bytes = serde_json::to_vec(&fitted).unwrap();
        assert!(matches!(
            FittedPipeline::from_bytes(&bytes),
            Err(BaselineError::Serialization(_))
        ));
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (table, target) = training_data();
        let a = BaselinePipeline::default().fit(&table, &target).unwrap();
        let b = BaselinePipeline::default().fit(&table, &target).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_probabilities_in_unit_interval() {
        let (table, target) = training_data();
        let fitted = BaselinePipeline::default().fit(&table, &target).unwrap();
        for p in fitted.predict_proba(&table).unwrap() {
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn test_unknown_category_is_ignored() {
        let (table, target) = training_data();
        let fitted = BaselinePipeline::default().fit(&table, &target).unwrap();
        let batch = Table::new(vec![
            Column::text("country", vec!["FR"]),
            Column::integer("n_orders", vec![3]),
            Column::float("total_amount", vec![90.0]),
        ])
        .unwrap();
        assert_eq!(fitted.predict(&batch).unwrap().len(), 1);
    }

    #[test]
    fn test_model_blob_round_trip() {
        let (table, target) = training_data();
        let fitted = BaselinePipeline::default().fit(&table, &target).unwrap();
        let restored = FittedPipeline::from_bytes(&fitted.to_bytes().unwrap()).unwrap();
        assert_eq!(restored, fitted);
        assert_eq!(restored.model_type, MODEL_TYPE);
    }

    #[test]
    fn test_zero_rows_rejected() {
        let (table, target) = training_data();
        let empty = table.take_rows(&[]);
        assert!(matches!(
            BaselinePipeline::default().fit(&empty, &[]),
            Err(BaselineError::EmptyBatch(_))
        ));

        let fitted = BaselinePipeline::default().fit(&table, &target).unwrap();
        assert!(matches!(
            fitted.predict_proba(&empty),
            Err(BaselineError::EmptyBatch(_))
        ));
    }

    #[test]
    fn test_non_finite_feature_is_model_error() {
        let table = Table::new(vec![Column::float("x", vec![1.0, f64::NAN])]).unwrap();
        assert!(matches!(
            BaselinePipeline::default().fit(&table, &[0, 1]),
            Err(BaselineError::Model(_))
        ));
    }

    #[test]
    fn test_constant_column_does_not_divide_by_zero() {
        let table = Table::new(vec![Column::integer("c", vec![5, 5, 5, 5])]).unwrap();
        let fitted = BaselinePipeline::default().fit(&table, &[0, 1, 0, 1]).unwrap();
        assert!(fitted
            .predict_proba(&table)
            .unwrap()
            .iter()
            .all(|p| p.is_finite()));
    }
}
