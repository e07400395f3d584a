//! Hospital ML Core - Clinical prediction pipeline
//!
//! Generates synthetic training data, trains the disease, risk and
//! no-show models, and serves predictions from persisted bundles.

pub mod api;
pub mod constants;
pub mod logic;
