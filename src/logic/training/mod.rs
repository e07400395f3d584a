//! Training Module - Offline model fitting
//!
//! - `split`   - seeded (stratified) train/test splits
//! - `metrics` - evaluation and the persisted training report
//! - `trainer` - per-task fitting and bundle persistence

pub mod metrics;
pub mod split;
pub mod trainer;


pub use metrics::{ClassMetrics, TaskMetrics, TrainingReport};
pub use trainer::{train_all, train_task, TrainerConfig};
