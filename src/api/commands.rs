//! Pipeline Commands - batch jobs and predictions
//!
//! Dataset generation, training, single predictions, schema listing and
//! service status. Each command owns its error formatting.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logic::artifacts::{ArtifactStore, BundleHeader, BundleSummary};
use crate::logic::config::PipelineConfig;
use crate::logic::dataset::{self, DatasetSummary};
use crate::logic::features::{all_schemas, get_schema, LayoutInfo, Record, TaskKind};
use crate::logic::model::{EngineStatus, PredictionResult, PredictionService};
use crate::logic::training::{self, TrainerConfig, TrainingReport};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Outcome of training one task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub task: TaskKind,
    pub bundle_id: Uuid,
    pub bundle_path: PathBuf,
    pub headline: String,
    pub report: TrainingReport,
}

// ============================================================================
// SHARED SERVICE
// ============================================================================

/// One service per artifact directory, reused across commands
static SERVICES: Lazy<RwLock<HashMap<PathBuf, Arc<PredictionService>>>> = Lazy::new(|| RwLock::new(HashMap::new()));

fn service_for(config: &PipelineConfig) -> Arc<PredictionService> {
    if let Some(service) = SERVICES.read().get(&config.artifact_dir) {
        return Arc::clone(service);
    }

    let mut services = SERVICES.write();
    let service = services
        .entry(config.artifact_dir.clone())
        .or_insert_with(|| Arc::new(PredictionService::new(ArtifactStore::new(&config.artifact_dir))));
    Arc::clone(service)
}

/// Drop cached bundles so freshly trained ones are picked up
fn invalidate_service(config: &PipelineConfig) {
    if let Some(service) = SERVICES.read().get(&config.artifact_dir) {
        service.unload_all();
    }
}

// ============================================================================
// BATCH COMMANDS
// ============================================================================

/// Generate all three datasets into `config.dataset_dir`
pub fn generate_datasets(config: &PipelineConfig) -> Result<Vec<DatasetSummary>, String> {
    log::info!(
        "Generating datasets in {} ({} samples, seed {})",
        config.dataset_dir.display(),
        config.samples,
        config.seed
    );
    dataset::generate_all(&config.dataset_dir, config.samples, config.seed).map_err(|e| e.to_string())
}

/// Train every task; `seed` overrides the split/estimator seed
pub fn train_models(config: &PipelineConfig, seed: Option<u64>) -> Result<Vec<TrainingSummary>, String> {
    let trainer = TrainerConfig::from_pipeline(config).with_seed(seed);
    train_with(config, &trainer)
}

/// Train every task with an explicit trainer configuration
pub fn train_with(config: &PipelineConfig, trainer: &TrainerConfig) -> Result<Vec<TrainingSummary>, String> {
    let sets = training::train_all(trainer).map_err(|e| e.to_string())?;
    invalidate_service(config);

    let store = ArtifactStore::new(&trainer.artifact_dir);
    Ok(sets
        .into_iter()
        .map(|set| TrainingSummary {
            task: set.task,
            bundle_id: set.bundle_id,
            bundle_path: store.bundle_path(set.task, set.schema_version),
            headline: set.report.headline(),
            report: set.report,
        })
        .collect())
}

// ============================================================================
// SERVING COMMANDS
// ============================================================================

/// Predict for one subject from a JSON object of named fields
pub fn predict(config: &PipelineConfig, task: &str, subject_id: &str, input_json: &str) -> Result<PredictionResult, String> {
    let record = Record::from_json(input_json).map_err(|e| format!("Invalid input JSON: {}", e))?;
    service_for(config)
        .predict(task, subject_id, &record)
        .map_err(|e| e.to_string())
}

/// Re-read a task's bundle from disk
pub fn reload_model(config: &PipelineConfig, task: &str) -> Result<BundleSummary, String> {
    service_for(config).reload(task).map_err(|e| e.to_string())
}

pub fn get_engine_status(config: &PipelineConfig) -> EngineStatus {
    service_for(config).status()
}

/// Headers of every bundle in the artifact directory
pub fn list_models(config: &PipelineConfig) -> Result<Vec<BundleHeader>, String> {
    ArtifactStore::new(&config.artifact_dir).list().map_err(|e| e.to_string())
}

// ============================================================================
// SCHEMA COMMANDS
// ============================================================================

/// Layout of one task, or of every task when `task` is `None`
pub fn schema_info(task: Option<&str>) -> Result<Vec<LayoutInfo>, String> {
    match task {
        Some(name) => get_schema(name).map(|s| vec![s.info()]).map_err(|e| e.to_string()),
        None => Ok(all_schemas().map(|s| s.info()).collect()),
    }
}
