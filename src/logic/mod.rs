//! Logic Module - Pipeline internals
//!
//! - `features/`  - Feature Schema Registry and the shared `encode`
//! - `dataset/`   - seeded synthetic datasets and their CSV storage
//! - `model/`     - learners, risk tiers and the Prediction Service
//! - `training/`  - splits, metrics and the per-task trainer
//! - `artifacts/` - bundle format, validation and storage
//! - `records`    - record store boundary and record builders

pub mod config;
pub mod error;

pub mod artifacts;
pub mod dataset;
pub mod features;
pub mod model;
pub mod records;
pub mod training;
