//! Prediction Service - serves the trained bundles
//!
//! Resolves the schema, loads the matching artifact set (memoized per task
//! and schema version), encodes the record with the shared encoder, runs the
//! estimator, and attaches tier and recommendation. Failures are typed and
//! never produce a fabricated prediction.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::estimator::{Estimate, EstimatorOutput};
use super::forest::argmax;
use super::threshold::{recommendation, RiskTier, ThresholdConfig};
use crate::logic::artifacts::{validate_artifact_set, ArtifactStore, BundleSummary, TrainedArtifactSet};
use crate::logic::error::{ModelNotFoundError, PredictionError};
use crate::logic::features::{encode, get_schema, schema_for, FeatureSchema, Record, TaskKind};

/// Probability keys of the no-show task
pub const NO_SHOW_KEY: &str = "no_show";
pub const SHOW_KEY: &str = "show";

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Class label or continuous score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryOutput {
    Label(String),
    Score(f64),
}

/// Prediction output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub task: TaskKind,
    pub subject_id: String,
    /// Disease name, risk score, or "show"/"no_show"
    pub primary_output: PrimaryOutput,
    /// Scalar the tier is derived from
    pub primary_score: f64,
    /// Top-class probability for classifiers
    pub confidence: Option<f64>,
    pub probabilities: BTreeMap<String, f64>,
    pub risk_tier: RiskTier,
    pub recommendation: String,
    pub schema_version: u8,
    pub bundle_id: Uuid,
    pub inference_time_us: u64,
}

impl PredictionResult {
    /// Probability of missing the appointment (no-show task only)
    pub fn noshow_probability(&self) -> Option<f64> {
        match self.task {
            TaskKind::NoShow => self.probabilities.get(NO_SHOW_KEY).copied(),
            _ => None,
        }
    }

    pub fn will_show_up(&self) -> Option<bool> {
        match &self.primary_output {
            PrimaryOutput::Label(label) if self.task == TaskKind::NoShow => Some(label == SHOW_KEY),
            _ => None,
        }
    }
}

/// Service status for CLI / monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub artifact_dir: String,
    pub loaded_bundles: Vec<BundleSummary>,
    pub avg_latency_ms: f64,
    pub inference_count: u64,
}

// ============================================================================
// SERVICE
// ============================================================================

type CacheKey = (TaskKind, u8);

/// Injected prediction service; share it behind an `Arc`
pub struct PredictionService {
    store: ArtifactStore,
    thresholds: ThresholdConfig,
    cache: RwLock<HashMap<CacheKey, Arc<TrainedArtifactSet>>>,
    latency_sum_us: AtomicU64,
    inference_count: AtomicU64,
}

impl PredictionService {
    pub fn new(store: ArtifactStore) -> Self {
        Self::with_thresholds(store, ThresholdConfig::default())
    }

    pub fn with_thresholds(store: ArtifactStore, thresholds: ThresholdConfig) -> Self {
        Self {
            store,
            thresholds,
            cache: RwLock::new(HashMap::new()),
            latency_sum_us: AtomicU64::new(0),
            inference_count: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Predict for one record
    pub fn predict(&self, task_name: &str, subject_id: &str, record: &Record) -> Result<PredictionResult, PredictionError> {
        let start = Instant::now();

        let schema = get_schema(task_name)?;
        let artifacts = self.artifacts_for(schema)?;

        let vector = encode(schema, record).map_err(|source| PredictionError::Encoding {
            task: schema.task.to_string(),
            source,
        })?;

        let row = match &artifacts.fitted_scaler {
            Some(scaler) => scaler.transform_row(vector.as_slice()),
            None => vector.values.clone(),
        };

        let output = artifacts
            .estimator
            .predict_row(&row)
            .map_err(|e| PredictionError::Inference {
                task: schema.task.to_string(),
                reason: e.0,
            })?;

        let mut result = self.interpret(&artifacts, subject_id, output)?;

        let elapsed = start.elapsed().as_micros() as u64;
        result.inference_time_us = elapsed;
        self.latency_sum_us.fetch_add(elapsed, Ordering::Relaxed);
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        log::debug!(
            "{} prediction for {}: {:?} ({}, {}us)",
            schema.task,
            subject_id,
            result.primary_output,
            result.risk_tier,
            elapsed
        );
        Ok(result)
    }

    /// Turn raw estimator output into a `PredictionResult`
    fn interpret(
        &self,
        artifacts: &TrainedArtifactSet,
        subject_id: &str,
        output: EstimatorOutput,
    ) -> Result<PredictionResult, PredictionError> {
        let task = artifacts.task;
        let inference_error = |reason: &str| PredictionError::Inference {
            task: task.to_string(),
            reason: reason.to_string(),
        };

        let (primary_output, primary_score, confidence, probabilities) = match (task, output) {
            (TaskKind::Disease, EstimatorOutput::Probabilities(proba)) => {
                let labels = artifacts
                    .fitted_encoders
                    .get("diagnosis")
                    .ok_or_else(|| inference_error("bundle has no diagnosis encoder"))?;
                let best = argmax(&proba);
                let label = labels
                    .inverse(best)
                    .ok_or_else(|| inference_error("predicted class has no label"))?;

                let probabilities: BTreeMap<String, f64> = labels
                    .classes
                    .iter()
                    .cloned()
                    .zip(proba.iter().copied())
                    .collect();
                (PrimaryOutput::Label(label.to_string()), proba[best], Some(proba[best]), probabilities)
            }
            (TaskKind::Risk, EstimatorOutput::Score(score)) => {
                (PrimaryOutput::Score(score), score, None, BTreeMap::new())
            }
            (TaskKind::NoShow, EstimatorOutput::Probabilities(proba)) if proba.len() == 2 => {
                // Class 1 is "did come"
                let p_noshow = proba[0];
                let p_show = proba[1];
                let label = if p_show >= p_noshow { SHOW_KEY } else { NO_SHOW_KEY };

                let mut probabilities = BTreeMap::new();
                probabilities.insert(NO_SHOW_KEY.to_string(), p_noshow);
                probabilities.insert(SHOW_KEY.to_string(), p_show);
                (
                    PrimaryOutput::Label(label.to_string()),
                    p_noshow,
                    Some(p_noshow.max(p_show)),
                    probabilities,
                )
            }
            _ => return Err(inference_error("estimator output does not fit the task")),
        };

        let risk_tier = self.thresholds.tier(primary_score);

        Ok(PredictionResult {
            task,
            subject_id: subject_id.to_string(),
            primary_output,
            primary_score,
            confidence,
            probabilities,
            risk_tier,
            recommendation: recommendation(task, risk_tier, primary_score).to_string(),
            schema_version: artifacts.schema_version,
            bundle_id: artifacts.bundle_id,
            inference_time_us: 0,
        })
    }

    /// Cached artifact set, loading it on first use.
    ///
    /// The bundle is read without holding the cache lock; when two callers
    /// race on a first load, the set inserted first wins and both get it.
    /// Load failures are not cached; the next call retries.
    pub fn artifacts_for(&self, schema: &FeatureSchema) -> Result<Arc<TrainedArtifactSet>, PredictionError> {
        let key = (schema.task, schema.version);

        if let Some(set) = self.cache.read().get(&key) {
            return Ok(Arc::clone(set));
        }

        let loaded = Arc::new(self.load(schema)?);
        let mut cache = self.cache.write();
        Ok(Arc::clone(cache.entry(key).or_insert(loaded)))
    }

    fn load(&self, schema: &FeatureSchema) -> Result<TrainedArtifactSet, ModelNotFoundError> {
        self.store.load(schema).map_err(|e| {
            log::warn!("No usable {} model (schema v{}): {}", schema.task, schema.version, e);
            ModelNotFoundError {
                task: schema.task.to_string(),
                schema_version: schema.version,
                reason: e.to_string(),
            }
        })
    }

    /// Reload a task's bundle from disk and swap it in.
    ///
    /// On failure the previously cached set (if any) keeps serving.
    pub fn reload(&self, task_name: &str) -> Result<BundleSummary, PredictionError> {
        let schema = get_schema(task_name)?;
        let set = Arc::new(self.load(schema)?);
        let summary = set.summary();

        self.cache.write().insert((schema.task, schema.version), set);
        log::info!("Reloaded {} model (bundle {})", schema.task, summary.bundle_id);
        Ok(summary)
    }

    /// Serve an in-memory artifact set without touching disk
    pub fn install(&self, set: TrainedArtifactSet) -> Result<(), PredictionError> {
        let schema = schema_for(set.task);
        validate_artifact_set(&set, schema).map_err(|e| ModelNotFoundError {
            task: set.task.to_string(),
            schema_version: set.schema_version,
            reason: e.to_string(),
        })?;

        self.cache.write().insert((set.task, set.schema_version), Arc::new(set));
        Ok(())
    }

    pub fn is_loaded(&self, task: TaskKind) -> bool {
        self.cache.read().keys().any(|(t, _)| *t == task)
    }

    /// Drop every cached set; the next prediction reloads from disk
    pub fn unload_all(&self) {
        self.cache.write().clear();
        log::info!("Prediction cache cleared");
    }

    pub fn status(&self) -> EngineStatus {
        let mut loaded_bundles: Vec<BundleSummary> = self.cache.read().values().map(|s| s.summary()).collect();
        loaded_bundles.sort_by_key(|s| (s.task, s.schema_version));

        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        let count = self.inference_count.load(Ordering::Relaxed);
        let avg = if count > 0 { (sum as f64 / count as f64) / 1000.0 } else { 0.0 };

        EngineStatus {
            artifact_dir: self.store.dir().display().to_string(),
            loaded_bundles,
            avg_latency_ms: avg,
            inference_count: count,
        }
    }
}
