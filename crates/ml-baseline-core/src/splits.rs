//! Train/holdout split strategies
//!
//! All strategies are deterministic for a given seed and return sorted row
//! indices for each side.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{BTreeMap, HashSet};

use crate::error::{BaselineError, Result};
use crate::table::Table;

/// Names accepted by [`SplitStrategy::from_name`]
pub const VALID_STRATEGIES: [&str; 3] = ["random", "time", "group"];

/// Parameters shared by every strategy
#[derive(Debug, Clone, PartialEq)]
pub struct SplitParams {
    pub test_size: f64,
    pub random_state: u64,
    pub time_column: Option<String>,
    pub group_column: Option<String>,
}

/// How rows are divided between training and holdout
#[derive(Debug, Clone, PartialEq)]
pub enum SplitStrategy {
    /// Stratified random split on the label
    Random { test_size: f64, random_state: u64 },
    /// Leading rows train, trailing rows are held out (input is in time order)
    Time { test_size: f64, time_column: String },
    /// Whole groups are held out, so no group appears on both sides
    Group {
        test_size: f64,
        group_column: String,
        random_state: u64,
    },
}

/// Row indices of each side of a split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl SplitStrategy {
    /// Build a strategy from its configured name
    pub fn from_name(name: &str, params: &SplitParams) -> Result<Self> {
        match name {
            "random" => Ok(SplitStrategy::Random {
                test_size: params.test_size,
                random_state: params.random_state,
            }),
            "time" => Ok(SplitStrategy::Time {
                test_size: params.test_size,
                time_column: params.time_column.clone().ok_or_else(|| {
                    BaselineError::configuration("split strategy 'time' requires time_column")
                })?,
            }),
            "group" => Ok(SplitStrategy::Group {
                test_size: params.test_size,
                group_column: params.group_column.clone().ok_or_else(|| {
                    BaselineError::configuration("split strategy 'group' requires group_column")
                })?,
                random_state: params.random_state,
            }),
            other => Err(BaselineError::configuration(format!(
                "Unknown split strategy '{}'; valid strategies: {}",
                other,
                VALID_STRATEGIES.join(", ")
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SplitStrategy::Random { .. } => "random",
            SplitStrategy::Time { .. } => "time",
            SplitStrategy::Group { .. } => "group",
        }
    }

    /// Divide the rows of `frame` (labelled by `labels`) into train and test
    pub fn split(&self, frame: &Table, labels: &[i64]) -> Result<SplitIndices> {
        if labels.len() != frame.n_rows() {
            return Err(BaselineError::Internal(format!(
                "{} labels for {} rows",
                labels.len(),
                frame.n_rows()
            )));
        }
        let indices = match self {
            SplitStrategy::Random {
                test_size,
                random_state,
            } => stratified_split(labels, *test_size, *random_state)?,
            SplitStrategy::Time {
                test_size,
                time_column,
            } => time_split(frame, time_column, *test_size)?,
            SplitStrategy::Group {
                test_size,
                group_column,
                random_state,
            } => group_split(frame, group_column, *test_size, *random_state)?,
        };
        tracing::debug!(
            strategy = self.name(),
            train = indices.train.len(),
            test = indices.test.len(),
            "Split rows"
        );
        Ok(indices)
    }
}

fn stratified_split(labels: &[i64], test_size: f64, seed: u64) -> Result<SplitIndices> {
    let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (row, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(row);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();
    for (class, mut rows) in by_class {
        let n = rows.len();
        if n < 2 {
            return Err(BaselineError::configuration(format!(
                "class {} has {} row(s); a stratified split needs at least 2 per class",
                class, n
            )));
        }
        let n_test = ((n as f64 * test_size).round() as usize).clamp(1, n - 1);
        rows.shuffle(&mut rng);
        test.extend_from_slice(&rows[..n_test]);
        train.extend_from_slice(&rows[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok(SplitIndices { train, test })
}

fn time_split(frame: &Table, time_column: &str, test_size: f64) -> Result<SplitIndices> {
    if !frame.has_column(time_column) {
        return Err(BaselineError::configuration(format!(
            "time column '{}' not found in data",
            time_column
        )));
    }

    // Rows are taken to be in time order already; the cut is positional.
    let n = frame.n_rows();
    let cut = (n as f64 * (1.0 - test_size)).floor() as usize;
    if cut == 0 || cut >= n {
        return Err(BaselineError::configuration(format!(
            "time split of {} rows at test_size {} leaves one side empty",
            n, test_size
        )));
    }

    Ok(SplitIndices {
        train: (0..cut).collect(),
        test: (cut..n).collect(),
    })
}

fn group_split(
    frame: &Table,
    group_column: &str,
    test_size: f64,
    seed: u64,
) -> Result<SplitIndices> {
    let column = frame.column(group_column).ok_or_else(|| {
        BaselineError::configuration(format!("group column '{}' not found in data", group_column))
    })?;

    let keys: Vec<String> = (0..column.len())
        .map(|row| column.data.cell_to_string(row))
        .collect();
    let mut seen = HashSet::new();
    let mut groups: Vec<&str> = keys
        .iter()
        .map(String::as_str)
        .filter(|k| seen.insert(*k))
        .collect();

    let n_groups = groups.len();
    let n_test = ((n_groups as f64 * test_size).ceil() as usize).max(1);
    if n_groups < 2 || n_test >= n_groups {
        return Err(BaselineError::configuration(format!(
            "group split needs more groups than it holds out ({} group(s), {} held out)",
            n_groups, n_test
        )));
    }

    groups.shuffle(&mut StdRng::seed_from_u64(seed));
    let held_out: HashSet<&str> = groups[..n_test].iter().copied().collect();

    let (test, train): (Vec<usize>, Vec<usize>) =
        (0..keys.len()).partition(|&row| held_out.contains(keys[row].as_str()));
    Ok(SplitIndices { train, test })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn params() -> SplitParams {
        SplitParams {
            test_size: 0.25,
            random_state: 42,
            time_column: None,
            group_column: None,
        }
    }

    fn frame(n: usize) -> Table {
        Table::new(vec![
            Column::integer("ts", (0..n as i64).rev().collect()),
            Column::text("user", (0..n).map(|i| format!("g{}", i % 4)).collect()),
        ])
        .unwrap()
    }

    #[test]
    fn test_unknown_strategy_lists_valid_names() {
        let err = SplitStrategy::from_name("kfold", &params()).unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, BaselineError::Configuration(_)));
        for name in VALID_STRATEGIES {
            assert!(msg.contains(name));
        }
    }

    #[test]
    fn test_time_requires_column_parameter() {
        assert!(SplitStrategy::from_name("time", &params()).is_err());
        assert!(SplitStrategy::from_name("group", &params()).is_err());
    }

    #[test]
    fn test_stratified_split_keeps_both_classes_and_is_deterministic() {
        let labels: Vec<i64> = (0..20).map(|i| i64::from(i % 4 == 0)).collect();
        let strategy = SplitStrategy::from_name("random", &params()).unwrap();
        let a = strategy.split(&frame(20), &labels).unwrap();
        let b = strategy.split(&frame(20), &labels).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.train.len() + a.test.len(), 20);
        assert!(a.test.iter().any(|&i| labels[i] == 1));
        assert!(a.test.iter().any(|&i| labels[i] == 0));
        assert!(a.train.iter().any(|&i| labels[i] == 1));
    }

    #[test]
    fn test_stratified_split_rejects_singleton_class() {
        let labels = vec![0, 0, 0, 1];
        let strategy = SplitStrategy::from_name("random", &params()).unwrap();
        assert!(strategy.split(&frame(4), &labels).is_err());
    }

    #[test]
    fn test_time_split_cuts_by_position() {
        let mut p = params();
        p.time_column = Some("ts".into());
        let strategy = SplitStrategy::from_name("time", &p).unwrap();
        let split = strategy.split(&frame(8), &[0; 8]).unwrap();
        assert_eq!(split.train, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(split.test, vec![6, 7]);
    }

    #[test]
    fn test_group_split_never_shares_groups() {
        let mut p = params();
        p.group_column = Some("user".into());
        let strategy = SplitStrategy::from_name("group", &p).unwrap();
        let table = frame(16);
        let split = strategy.split(&table, &[0; 16]).unwrap();

        let user = &table.column("user").unwrap().data;
        let train_groups: HashSet<String> =
            split.train.iter().map(|&i| user.cell_to_string(i)).collect();
        let test_groups: HashSet<String> =
            split.test.iter().map(|&i| user.cell_to_string(i)).collect();
        assert!(train_groups.is_disjoint(&test_groups));
        assert_eq!(test_groups.len(), 1);
    }

    #[test]
    fn test_missing_time_column_is_configuration_error() {
        let mut p = params();
        p.time_column = Some("created_at".into());
        let strategy = SplitStrategy::from_name("time", &p).unwrap();
        assert!(matches!(
            strategy.split(&frame(8), &[0; 8]),
            Err(BaselineError::Configuration(_))
        ));
    }
}
