use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logic::features::TaskKind;
use crate::logic::model::encoder::LabelEncoder;
use crate::logic::model::estimator::Estimator;
use crate::logic::model::scaler::StandardScaler;
use crate::logic::training::metrics::TrainingReport;

/// Bundle file format identifier
pub const BUNDLE_FORMAT: &str = "hospital-ml-bundle/1";

/// Everything needed to serve one task at one schema version.
///
/// Saved and loaded only as a whole; never mutated after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedArtifactSet {
    pub task: TaskKind,
    pub schema_version: u8,
    pub layout_hash: u32,
    pub bundle_id: Uuid,
    pub trained_at: DateTime<Utc>,
    pub estimator: Estimator,
    /// Categorical features and the disease target, keyed by column name
    pub fitted_encoders: BTreeMap<String, LabelEncoder>,
    pub fitted_scaler: Option<StandardScaler>,
    pub report: TrainingReport,
}

impl TrainedArtifactSet {
    pub fn summary(&self) -> BundleSummary {
        BundleSummary {
            task: self.task,
            schema_version: self.schema_version,
            bundle_id: self.bundle_id,
            trained_at: self.trained_at,
            estimator: self.estimator.kind().to_string(),
            headline: self.report.headline(),
        }
    }
}

/// First line of a bundle file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleHeader {
    pub format: String,
    pub task: TaskKind,
    pub schema_version: u8,
    pub layout_hash: u32,
    /// SHA-256 of the payload bytes that follow the header line
    pub sha256: String,
}

/// Loaded-bundle view for status and CLI output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleSummary {
    pub task: TaskKind,
    pub schema_version: u8,
    pub bundle_id: Uuid,
    pub trained_at: DateTime<Utc>,
    pub estimator: String,
    pub headline: String,
}
