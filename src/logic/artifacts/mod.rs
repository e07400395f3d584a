//! Artifacts Module - Persisted model bundles
//!
//! A bundle pairs the fitted estimator with the encoders and scaler it was
//! trained with, tagged by schema version and layout hash.

pub mod storage;
pub mod types;
pub mod validate;


pub use storage::{bundle_file_name, ArtifactStore};
pub use types::{BundleHeader, BundleSummary, TrainedArtifactSet, BUNDLE_FORMAT};
pub use validate::{check_encoder, validate_artifact_set};
