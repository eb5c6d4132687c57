//! Binary classification metrics

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Holdout metrics for a binary classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    /// Area under the ROC curve computed from positive-class probabilities
    pub roc_auc: f64,
    /// Number of evaluated samples
    pub n_samples: usize,
}

impl ModelMetrics {
    /// Compute metrics from true labels, hard predictions and positive-class
    /// probabilities. Labels are treated as positive when `> 0.5`.
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>, y_prob: &Array1<f64>) -> Self {
        let n_samples = y_true.len();

        let correct = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(t, p)| (*t - *p).abs() < 0.5)
            .count();
        let accuracy = if n_samples > 0 {
            correct as f64 / n_samples as f64
        } else {
            0.0
        };

        let (tp, fp, _tn, fn_) = confusion_counts(y_true, y_pred);

        let precision = if tp + fp > 0 {
            tp as f64 / (tp + fp) as f64
        } else {
            0.0
        };
        let recall = if tp + fn_ > 0 {
            tp as f64 / (tp + fn_) as f64
        } else {
            0.0
        };
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            accuracy,
            precision,
            recall,
            f1_score,
            roc_auc: roc_auc(y_true, y_prob),
            n_samples,
        }
    }

    /// Metric name/value pairs as logged to the tracking store
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        let mut map = BTreeMap::new();
        map.insert("accuracy".to_string(), self.accuracy);
        map.insert("precision".to_string(), self.precision);
        map.insert("recall".to_string(), self.recall);
        map.insert("f1".to_string(), self.f1_score);
        map.insert("roc_auc".to_string(), self.roc_auc);
        map
    }
}

/// `(tp, fp, tn, fn)` for 0/1 labels
pub fn confusion_counts(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> (usize, usize, usize, usize) {
    let mut counts = (0, 0, 0, 0);
    for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
        match (t > 0.5, p > 0.5) {
            (true, true) => counts.0 += 1,
            (false, true) => counts.1 += 1,
            (false, false) => counts.2 += 1,
            (true, false) => counts.3 += 1,
        }
    }
    counts
}

/// ROC-AUC as the Mann-Whitney rank statistic, tied scores sharing their
/// average rank. Returns 0.5 when either class is absent.
pub fn roc_auc(y_true: &Array1<f64>, scores: &Array1<f64>) -> f64 {
    let n = y_true.len().min(scores.len());
    let n_pos = y_true.iter().take(n).filter(|&&t| t > 0.5).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // 1-based ranks i+1..=j+1 share their mean
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = (0..n).filter(|&k| y_true[k] > 0.5).map(|k| ranks[k]).sum();
    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;

    (pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_perfect_classifier() {
        let y = array![0.0, 0.0, 1.0, 1.0];
        let p = array![0.1, 0.2, 0.8, 0.9];
        let pred = array![0.0, 0.0, 1.0, 1.0];

        let m = ModelMetrics::compute(&y, &pred, &p);
        assert_eq!(m.accuracy, 1.0);
        assert_eq!(m.precision, 1.0);
        assert_eq!(m.recall, 1.0);
        assert_eq!(m.f1_score, 1.0);
        assert_eq!(m.roc_auc, 1.0);
        assert_eq!(m.n_samples, 4);
    }

    #[test]
    fn test_roc_auc_inverted() {
        let y = array![1.0, 1.0, 0.0, 0.0];
        let p = array![0.1, 0.2, 0.8, 0.9];
        assert_eq!(roc_auc(&y, &p), 0.0);
    }

    #[test]
    fn test_roc_auc_ties_are_averaged() {
        let y = array![0.0, 1.0];
        let p = array![0.5, 0.5];
        assert!((roc_auc(&y, &p) - 0.5).abs() < 1e-12);

        // one of four pos/neg pairs is tied, the rest ordered correctly
        let y = array![0.0, 0.0, 1.0, 1.0];
        let p = array![0.1, 0.6, 0.6, 0.9];
        assert!((roc_auc(&y, &p) - 0.875).abs() < 1e-12);
    }

    #[test]
    fn test_roc_auc_single_class() {
        let y = array![1.0, 1.0, 1.0];
        let p = array![0.2, 0.5, 0.9];
        assert_eq!(roc_auc(&y, &p), 0.5);
    }

    #[test]
    fn test_no_positive_predictions() {
        let y = array![0.0, 1.0, 1.0];
        let pred = array![0.0, 0.0, 0.0];
        let p = array![0.1, 0.3, 0.4];

        let m = ModelMetrics::compute(&y, &pred, &p);
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.f1_score, 0.0);
        assert!((m.accuracy - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_to_map_keys() {
        let y = array![0.0, 1.0];
        let m = ModelMetrics::compute(&y, &y, &y);
        let map = m.to_map();
        let keys: Vec<&str> = map.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["accuracy", "f1", "precision", "recall", "roc_auc"]);
    }
}
