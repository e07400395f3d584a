//! Model Module - Learners & Prediction Service
//!
//! Learners are small in-crate tabular models (CART forests, logistic
//! regression) plus the preprocessing fitted alongside them. The
//! prediction service serves whatever the trainer persisted.

pub mod encoder;
pub mod estimator;
pub mod forest;
pub mod inference;
pub mod logistic;
pub mod scaler;
pub mod threshold;
pub mod tree;


// Re-export common types
pub use encoder::LabelEncoder;
pub use estimator::{Estimate, Estimator, EstimatorOutput};
pub use inference::{EngineStatus, PredictionResult, PredictionService, PrimaryOutput};
pub use scaler::StandardScaler;
pub use threshold::{recommendation, risk_tier, RiskTier, ThresholdConfig};
