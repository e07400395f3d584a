//! Pipeline Configuration
//!
//! Paths and batch parameters, loaded from the environment
//! (`.env` honoured) with defaults from `constants`.

use std::env;
use std::path::PathBuf;

use crate::constants;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding the generated CSV datasets
    pub dataset_dir: PathBuf,

    /// Directory holding artifact bundles
    pub artifact_dir: PathBuf,

    /// Generator seed
    pub seed: u64,

    /// Rows per generated dataset
    pub samples: usize,
}

impl PipelineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let data_root = env::var("HOSPITAL_ML_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_root());

        Self {
            dataset_dir: env::var("HOSPITAL_ML_DATASET_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| data_root.join("datasets")),

            artifact_dir: env::var("HOSPITAL_ML_ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| data_root.join("trained_models")),

            seed: constants::get_seed(),
            samples: constants::get_samples(),
        }
    }

    /// Everything under one root (tests, scripted runs)
    pub fn in_dir(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            dataset_dir: root.join("datasets"),
            artifact_dir: root.join("trained_models"),
            seed: constants::DEFAULT_SEED,
            samples: constants::DEFAULT_SAMPLES,
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        if let Some(seed) = seed {
            self.seed = seed;
        }
        self
    }

    pub fn with_samples(mut self, samples: Option<usize>) -> Self {
        if let Some(samples) = samples.filter(|n| *n > 0) {
            self.samples = samples;
        }
        self
    }
}

/// Get default data root
pub fn default_data_root() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(constants::APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_dir_layout() {
        let config = PipelineConfig::in_dir("/tmp/hml");
        assert_eq!(config.dataset_dir, PathBuf::from("/tmp/hml/datasets"));
        assert_eq!(config.artifact_dir, PathBuf::from("/tmp/hml/trained_models"));
        assert_eq!(config.seed, constants::DEFAULT_SEED);
    }

    #[test]
    fn test_overrides() {
        let config = PipelineConfig::in_dir("/tmp/hml")
            .with_seed(Some(7))
            .with_samples(Some(0));
        assert_eq!(config.seed, 7);
        assert_eq!(config.samples, constants::DEFAULT_SAMPLES);

        let config = config.with_seed(None).with_samples(Some(10));
        assert_eq!(config.seed, 7);
        assert_eq!(config.samples, 10);
    }
}
