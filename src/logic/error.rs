//! Error Taxonomy - Typed failures for the prediction pipeline
//!
//! Serving-side errors are kept distinct so a caller can tell
//! "no model available" from "bad input" from "inference failure"
//! and fall back accordingly. Batch-side errors abort the job.

use thiserror::Error;

use crate::logic::features::layout::LayoutMismatchError;

// ============================================================================
// SERVING ERRORS
// ============================================================================

/// Task name not present in the schema registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown prediction task: '{0}'")]
pub struct UnknownTaskError(pub String);

/// Why a record could not be turned into a feature vector
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureEncodingError {
    #[error("required feature '{feature}' is missing and has no default")]
    MissingFeature { feature: String },

    #[error("feature '{feature}' value {value:?} cannot be coerced to a number")]
    NotNumeric { feature: String, value: String },

    #[error("feature '{feature}' has unknown category '{value}'")]
    UnknownCategory { feature: String, value: String },
}

impl FeatureEncodingError {
    pub fn feature(&self) -> &str {
        match self {
            Self::MissingFeature { feature }
            | Self::NotNumeric { feature, .. }
            | Self::UnknownCategory { feature, .. } => feature,
        }
    }
}

/// Artifact bundle missing, corrupt or trained against another layout
#[derive(Debug, Clone, PartialEq, Error)]
#[error("no usable model for task '{task}' (schema v{schema_version}): {reason}")]
pub struct ModelNotFoundError {
    pub task: String,
    pub schema_version: u8,
    pub reason: String,
}

/// Failure at the prediction service boundary, always tagged with the task
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error(transparent)]
    UnknownTask(#[from] UnknownTaskError),

    #[error(transparent)]
    ModelNotFound(#[from] ModelNotFoundError),

    #[error("prediction for '{task}' failed to encode input: {source}")]
    Encoding {
        task: String,
        #[source]
        source: FeatureEncodingError,
    },

    #[error("prediction for '{task}' failed during inference: {reason}")]
    Inference { task: String, reason: String },
}

impl PredictionError {
    /// Task the failing prediction was issued for
    pub fn task(&self) -> &str {
        match self {
            Self::UnknownTask(e) => &e.0,
            Self::ModelNotFound(e) => &e.task,
            Self::Encoding { task, .. } | Self::Inference { task, .. } => task,
        }
    }

    pub fn is_model_not_found(&self) -> bool {
        matches!(self, Self::ModelNotFound(_))
    }
}

/// Estimator-internal failure (shape mismatch, non-finite output)
#[derive(Debug, Clone, PartialEq, Error)]
#[error("inference error: {0}")]
pub struct InferenceError(pub String);

// ============================================================================
// BATCH ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("dataset CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("dataset '{0}' is empty")]
    Empty(String),
}

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    UnknownTask(#[from] UnknownTaskError),

    #[error("row {row} of the {task} dataset failed to encode: {source}")]
    Encoding {
        task: String,
        row: usize,
        #[source]
        source: FeatureEncodingError,
    },

    #[error("fitting {task} model failed: {reason}")]
    Fit { task: String, reason: String },

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("artifact serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("artifact bundle is malformed: {0}")]
    Malformed(String),

    #[error("artifact checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error(transparent)]
    Layout(#[from] LayoutMismatchError),

    #[error("artifact encoder for '{feature}' disagrees with schema: {reason}")]
    EncoderMismatch { feature: String, reason: String },
}
