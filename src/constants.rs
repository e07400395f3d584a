//! Central Configuration Constants
//!
//! Single source of truth for pipeline defaults.
//! Seeds and split ratio are fixed so retraining is reproducible.

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name (also the data directory name)
pub const APP_NAME: &str = "hospital-ml";

// ============================================
// Datasets
// ============================================

/// Default generator seed
pub const DEFAULT_SEED: u64 = 42;

/// Default rows per generated dataset
pub const DEFAULT_SAMPLES: usize = 2000;

// ============================================
// Training
// ============================================

/// Held-out share of every dataset
pub const TEST_RATIO: f64 = 0.2;

/// Seed for train/test split and estimator randomness
pub const TRAIN_SEED: u64 = 42;

pub const FOREST_N_ESTIMATORS: usize = 100;
pub const FOREST_MAX_DEPTH: usize = 10;

/// Inverse regularization strength of the no-show model
pub const LOGISTIC_C: f64 = 1.0;
pub const LOGISTIC_MAX_ITER: usize = 1000;

// ============================================
// Serving
// ============================================

/// Primary output above this is High
pub const HIGH_TIER_THRESHOLD: f64 = 0.7;

/// Primary output above this (and not High) is Medium
pub const MEDIUM_TIER_THRESHOLD: f64 = 0.4;

/// No-show probability above which a reminder is recommended
pub const NOSHOW_REMINDER_THRESHOLD: f64 = 0.5;

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get generator seed from environment or use default
pub fn get_seed() -> u64 {
    std::env::var("HOSPITAL_ML_SEED")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_SEED)
}

/// Get dataset size from environment or use default
pub fn get_samples() -> usize {
    std::env::var("HOSPITAL_ML_SAMPLES")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_SAMPLES)
}
