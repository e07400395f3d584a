//! Dataset Module - Synthetic training data
//!
//! Generates the three labeled datasets and stores them as CSV files
//! whose headers match the feature schema names exactly.

pub mod generator;
pub mod record;
pub mod writer;

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::logic::error::DatasetError;
use crate::logic::features::TaskKind;

pub use generator::{attendance_probability, rule_risk_score, RiskFactors};
pub use record::{DiseaseRow, NoShowRow, RiskRow, SyntheticRecord};
pub use writer::{dataset_fingerprint, read_dataset, write_dataset};

/// File name of a task's dataset
pub fn dataset_file_name(task: TaskKind) -> &'static str {
    match task {
        TaskKind::Disease => "disease_dataset.csv",
        TaskKind::Risk => "risk_dataset.csv",
        TaskKind::NoShow => "appointments_dataset.csv",
    }
}

pub fn dataset_path(dir: &Path, task: TaskKind) -> PathBuf {
    dir.join(dataset_file_name(task))
}

/// Outcome of generating one dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub task: TaskKind,
    pub path: PathBuf,
    pub rows: usize,
    pub fingerprint: String,
    /// Task-specific headline (label counts, high-risk share, no-show rate)
    pub details: serde_json::Value,
}

/// Generate and write all three datasets
pub fn generate_all(dir: &Path, n_samples: usize, seed: u64) -> Result<Vec<DatasetSummary>, DatasetError> {
    TaskKind::ALL
        .iter()
        .map(|task| generate_one(dir, *task, n_samples, seed))
        .collect()
}

/// Generate and write a single task's dataset
pub fn generate_one(dir: &Path, task: TaskKind, n_samples: usize, seed: u64) -> Result<DatasetSummary, DatasetError> {
    let path = dataset_path(dir, task);
    log::info!("Generating {} dataset ({} samples, seed {})", task, n_samples, seed);

    let details = match task {
        TaskKind::Disease => {
            let rows = generator::generate_disease_dataset(n_samples, seed);
            write_dataset(&path, &rows)?;
            let mut counts = std::collections::BTreeMap::<String, usize>::new();
            for row in &rows {
                *counts.entry(row.diagnosis.clone()).or_default() += 1;
            }
            serde_json::json!({ "diagnosis_counts": counts })
        }
        TaskKind::Risk => {
            let rows = generator::generate_risk_dataset(n_samples, seed);
            write_dataset(&path, &rows)?;
            let high = rows.iter().filter(|r| r.risk_score > 0.7).count();
            serde_json::json!({ "high_risk_rows": high })
        }
        TaskKind::NoShow => {
            let rows = generator::generate_noshow_dataset(n_samples, seed);
            write_dataset(&path, &rows)?;
            let attended = rows.iter().filter(|r| r.did_come == 1).count();
            let noshow_rate = if rows.is_empty() {
                0.0
            } else {
                1.0 - attended as f64 / rows.len() as f64
            };
            serde_json::json!({ "noshow_rate": noshow_rate })
        }
    };

    let summary = DatasetSummary {
        task,
        rows: n_samples,
        fingerprint: dataset_fingerprint(&path)?,
        path,
        details,
    };
    log::info!("{} dataset written: {} ({} rows)", task, summary.path.display(), summary.rows);
    Ok(summary)
}
