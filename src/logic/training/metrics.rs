//! Evaluation metrics and the report persisted with each artifact bundle

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::logic::features::TaskKind;
use crate::logic::model::threshold::{risk_tier, RiskTier};

/// Per-class precision / recall / F1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskMetrics {
    Classification {
        accuracy: f64,
        per_class: Vec<ClassMetrics>,
    },
    Regression {
        mse: f64,
        r2: f64,
        /// Mean |prediction - rule score| on the test split
        recoverability_mae: f64,
        /// Test labels bucketed by risk tier
        tier_distribution: BTreeMap<String, usize>,
    },
}

impl TaskMetrics {
    pub fn accuracy(&self) -> Option<f64> {
        match self {
            TaskMetrics::Classification { accuracy, .. } => Some(*accuracy),
            TaskMetrics::Regression { .. } => None,
        }
    }

    pub fn r2(&self) -> Option<f64> {
        match self {
            TaskMetrics::Regression { r2, .. } => Some(*r2),
            TaskMetrics::Classification { .. } => None,
        }
    }
}

/// Training run summary stored inside the bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub task: TaskKind,
    pub schema_version: u8,
    pub dataset_fingerprint: String,
    pub n_train: usize,
    pub n_test: usize,
    pub seed: u64,
    pub metrics: TaskMetrics,
    /// (feature, importance) in schema order; empty for linear models
    pub feature_importances: Vec<(String, f64)>,
    pub duration_ms: u64,
}

impl TrainingReport {
    /// One-line summary for logs
    pub fn headline(&self) -> String {
        match &self.metrics {
            TaskMetrics::Classification { accuracy, .. } => {
                format!("{}: accuracy {:.4} on {} test rows", self.task, accuracy, self.n_test)
            }
            TaskMetrics::Regression { mse, r2, recoverability_mae, .. } => format!(
                "{}: MSE {:.4}, R2 {:.4}, rule MAE {:.4} on {} test rows",
                self.task, mse, r2, recoverability_mae, self.n_test
            ),
        }
    }
}

pub fn accuracy(truth: &[usize], predicted: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    correct as f64 / truth.len() as f64
}

/// Precision / recall / F1 per class; zero when undefined
pub fn classification_report(truth: &[usize], predicted: &[usize], labels: &[String]) -> Vec<ClassMetrics> {
    labels
        .iter()
        .enumerate()
        .map(|(class, label)| {
            let mut tp = 0usize;
            let mut fp = 0usize;
            let mut fn_ = 0usize;
            for (&t, &p) in truth.iter().zip(predicted) {
                match (t == class, p == class) {
                    (true, true) => tp += 1,
                    (false, true) => fp += 1,
                    (true, false) => fn_ += 1,
                    (false, false) => {}
                }
            }

            let precision = ratio(tp, tp + fp);
            let recall = ratio(tp, tp + fn_);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };

            ClassMetrics {
                label: label.clone(),
                precision,
                recall,
                f1,
                support: tp + fn_,
            }
        })
        .collect()
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

pub fn mean_squared_error(truth: &[f64], predicted: &[f64]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    truth.iter().zip(predicted).map(|(t, p)| (t - p).powi(2)).sum::<f64>() / truth.len() as f64
}

pub fn mean_absolute_error(truth: &[f64], predicted: &[f64]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    truth.iter().zip(predicted).map(|(t, p)| (t - p).abs()).sum::<f64>() / truth.len() as f64
}

/// Coefficient of determination; 0 for a constant target
pub fn r2_score(truth: &[f64], predicted: &[f64]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let mean = truth.iter().sum::<f64>() / truth.len() as f64;
    let ss_tot: f64 = truth.iter().map(|t| (t - mean).powi(2)).sum();
    let ss_res: f64 = truth.iter().zip(predicted).map(|(t, p)| (t - p).powi(2)).sum();
    if ss_tot <= f64::EPSILON {
        return 0.0;
    }
    1.0 - ss_res / ss_tot
}

/// Count of scores per risk tier (all tiers present)
pub fn tier_distribution(scores: &[f64]) -> BTreeMap<String, usize> {
    let mut dist: BTreeMap<String, usize> = RiskTier::ALL
        .iter()
        .map(|t| (t.as_str().to_string(), 0))
        .collect();
    for &s in scores {
        *dist.entry(risk_tier(s).as_str().to_string()).or_default() += 1;
    }
    dist
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&[0, 1, 1, 0], &[0, 1, 0, 0]), 0.75);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }

    #[test]
    fn test_classification_report() {
        let labels = vec!["No Show".to_string(), "Showed Up".to_string()];
        let report = classification_report(&[0, 0, 1, 1], &[0, 1, 1, 1], &labels);

        assert_eq!(report[0].precision, 1.0);
        assert_eq!(report[0].recall, 0.5);
        assert_eq!(report[0].support, 2);
        assert!((report[1].precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(report[1].recall, 1.0);
    }

    #[test]
    fn test_class_never_predicted() {
        let labels = vec!["a".to_string(), "b".to_string()];
        let report = classification_report(&[0, 1], &[0, 0], &labels);
        assert_eq!(report[1].precision, 0.0);
        assert_eq!(report[1].f1, 0.0);
    }

    #[test]
    fn test_regression_metrics() {
        let truth = [0.1, 0.5, 0.9];
        assert_eq!(r2_score(&truth, &truth), 1.0);
        assert!((mean_squared_error(&truth, &[0.2, 0.5, 0.9]) - 0.01 / 3.0).abs() < 1e-12);
        assert!((mean_absolute_error(&truth, &[0.2, 0.5, 0.8]) - 0.2 / 3.0).abs() < 1e-12);
        assert_eq!(r2_score(&[0.3, 0.3], &[0.1, 0.5]), 0.0);
    }

    #[test]
    fn test_tier_distribution() {
        let dist = tier_distribution(&[0.1, 0.5, 0.8, 0.9]);
        assert_eq!(dist["Low"], 1);
        assert_eq!(dist["Medium"], 1);
        assert_eq!(dist["High"], 2);
    }
}
