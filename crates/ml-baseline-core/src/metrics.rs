//! Binary classification metrics

use serde::{Deserialize, Serialize};

/// Holdout metrics of a fitted classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    /// Absent when the labels contain a single class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roc_auc: Option<f64>,
}

impl ClassificationMetrics {
    /// Metrics as (name, value) pairs in display order
    pub fn as_pairs(&self) -> Vec<(&'static str, f64)> {
        let mut pairs = vec![
            ("accuracy", self.accuracy),
            ("precision", self.precision),
            ("recall", self.recall),
            ("f1_score", self.f1_score),
        ];
        if let Some(auc) = self.roc_auc {
            pairs.push(("roc_auc", auc));
        }
        pairs
    }
}

/// Compute metrics for 0/1 labels; ratios with a zero denominator are 0
pub fn classification_metrics(
    y_true: &[i64],
    y_pred: &[i64],
    y_proba: Option<&[f64]>,
) -> ClassificationMetrics {
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut fn_ = 0usize;
    let mut correct = 0usize;
    for (&t, &p) in y_true.iter().zip(y_pred) {
        if t == p {
            correct += 1;
        }
        match (t == 1, p == 1) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }

    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1_score = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    ClassificationMetrics {
        accuracy: ratio(correct, y_true.len()),
        precision,
        recall,
        f1_score,
        roc_auc: y_proba.and_then(|scores| roc_auc(y_true, scores)),
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Area under the ROC curve via the Mann-Whitney rank statistic, with tied
/// scores sharing their average rank
fn roc_auc(y_true: &[i64], scores: &[f64]) -> Option<f64> {
    let n_pos = y_true.iter().filter(|&&t| t == 1).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // ranks are 1-based; the tie block spans start+1..=end
        let avg = (start + 1 + end) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = avg;
        }
        start = end;
    }

    let pos_rank_sum: f64 = y_true
        .iter()
        .zip(&ranks)
        .filter(|(&t, _)| t == 1)
        .map(|(_, &r)| r)
        .sum();
    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Some((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_metrics() {
        let m = classification_metrics(&[1, 0, 1, 1, 0], &[1, 0, 0, 1, 1], None);
        assert!((m.accuracy - 0.6).abs() < 1e-12);
        assert!((m.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.recall - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.f1_score - 2.0 / 3.0).abs() < 1e-12);
        assert!(m.roc_auc.is_none());
    }

    #[test]
    fn test_zero_division_gives_zero() {
        let m = classification_metrics(&[0, 0, 1], &[0, 0, 0], None);
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.f1_score, 0.0);
    }

    #[test]
    fn test_roc_auc_perfect_and_tied() {
        let y = [0, 0, 1, 1];
        let perfect = classification_metrics(&y, &y, Some(&[0.1, 0.2, 0.8, 0.9]));
        assert_eq!(perfect.roc_auc, Some(1.0));

        let tied = classification_metrics(&y, &y, Some(&[0.5, 0.5, 0.5, 0.5]));
        assert_eq!(tied.roc_auc, Some(0.5));

        let partial = classification_metrics(&y, &y, Some(&[0.1, 0.4, 0.35, 0.8]));
        assert_eq!(partial.roc_auc, Some(0.75));
    }

    #[test]
    fn test_roc_auc_absent_for_single_class() {
        let m = classification_metrics(&[1, 1], &[1, 1], Some(&[0.7, 0.9]));
        assert!(m.roc_auc.is_none());
        assert_eq!(m.as_pairs().len(), 4);
    }
}
