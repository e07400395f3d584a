use serde::{Deserialize, Serialize};

use super::forest::{RandomForestClassifier, RandomForestRegressor};
use super::logistic::LogisticRegression;
use crate::logic::error::InferenceError;

/// Raw estimator output for one row
#[derive(Debug, Clone, PartialEq)]
pub enum EstimatorOutput {
    /// Class probabilities, indexed by class code
    Probabilities(Vec<f64>),
    /// Continuous score
    Score(f64),
}

/// Anything that maps an encoded feature row to an output
pub trait Estimate {
    fn n_features(&self) -> usize;
    fn estimate(&self, row: &[f64]) -> EstimatorOutput;

    /// Shape-checked prediction
    fn predict_row(&self, row: &[f64]) -> Result<EstimatorOutput, InferenceError> {
        if row.len() != self.n_features() {
            return Err(InferenceError(format!(
                "expected {} features, got {}",
                self.n_features(),
                row.len()
            )));
        }

        let output = self.estimate(row);
        let finite = match &output {
            EstimatorOutput::Probabilities(p) => !p.is_empty() && p.iter().all(|v| v.is_finite()),
            EstimatorOutput::Score(s) => s.is_finite(),
        };
        if !finite {
            return Err(InferenceError("estimator produced a non-finite output".to_string()));
        }
        Ok(output)
    }
}

impl Estimate for RandomForestClassifier {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn estimate(&self, row: &[f64]) -> EstimatorOutput {
        EstimatorOutput::Probabilities(self.predict_proba_row(row))
    }
}

impl Estimate for RandomForestRegressor {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn estimate(&self, row: &[f64]) -> EstimatorOutput {
        EstimatorOutput::Score(self.predict_row(row))
    }
}

impl Estimate for LogisticRegression {
    fn n_features(&self) -> usize {
        self.coef.len()
    }

    fn estimate(&self, row: &[f64]) -> EstimatorOutput {
        let p = self.predict_proba_row(row);
        EstimatorOutput::Probabilities(vec![1.0 - p, p])
    }
}

/// Serialized estimator stored inside an artifact bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    ForestClassifier(RandomForestClassifier),
    ForestRegressor(RandomForestRegressor),
    Logistic(LogisticRegression),
}

impl Estimator {
    pub fn kind(&self) -> &'static str {
        match self {
            Estimator::ForestClassifier(_) => "forest_classifier",
            Estimator::ForestRegressor(_) => "forest_regressor",
            Estimator::Logistic(_) => "logistic",
        }
    }

    /// Number of classes, or `None` for regressors
    pub fn n_classes(&self) -> Option<usize> {
        match self {
            Estimator::ForestClassifier(m) => Some(m.n_classes),
            Estimator::ForestRegressor(_) => None,
            Estimator::Logistic(_) => Some(2),
        }
    }

    fn inner(&self) -> &dyn Estimate {
        match self {
            Estimator::ForestClassifier(m) => m,
            Estimator::ForestRegressor(m) => m,
            Estimator::Logistic(m) => m,
        }
    }
}

impl Estimate for Estimator {
    fn n_features(&self) -> usize {
        self.inner().n_features()
    }

    fn estimate(&self, row: &[f64]) -> EstimatorOutput {
        self.inner().estimate(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::model::logistic::LogisticParams;

    fn logistic() -> Estimator {
        Estimator::Logistic(LogisticRegression {
            coef: vec![1.0, -1.0],
            intercept: 0.0,
            n_iter: 1,
            converged: true,
            params: LogisticParams::default(),
        })
    }

    #[test]
    fn test_logistic_outputs_two_classes() {
        match logistic().predict_row(&[0.0, 0.0]).unwrap() {
            EstimatorOutput::Probabilities(p) => {
                assert_eq!(p.len(), 2);
                assert!((p[0] - 0.5).abs() < 1e-12);
            }
            other => panic!("unexpected output {:?}", other),
        }
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let err = logistic().predict_row(&[1.0]).unwrap_err();
        assert!(err.0.contains("expected 2 features"));
    }

    #[test]
    fn test_serde_tag() {
        let json = serde_json::to_string(&logistic()).unwrap();
        assert!(json.contains("\"kind\":\"logistic\""));
        let back: Estimator = serde_json::from_str(&json).unwrap();
        assert_eq!(back, logistic());
        assert_eq!(back.n_classes(), Some(2));
    }
}
