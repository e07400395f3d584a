//! Consistency checks run on every bundle before it is saved or served

use std::collections::BTreeMap;

use crate::logic::error::ArtifactError;
use crate::logic::features::{FeatureSchema, TaskKind};
use crate::logic::model::encoder::LabelEncoder;
use crate::logic::model::estimator::Estimate;

use super::types::TrainedArtifactSet;

/// A fitted categorical encoder must reproduce the schema's codes
pub fn check_encoder(
    feature: &str,
    encoder: &LabelEncoder,
    schema_codes: &BTreeMap<String, i64>,
) -> Result<(), ArtifactError> {
    for (class, code) in encoder.codes() {
        match schema_codes.get(&class) {
            Some(expected) if *expected == code => {}
            Some(expected) => {
                return Err(ArtifactError::EncoderMismatch {
                    feature: feature.to_string(),
                    reason: format!("'{}' fitted as {}, schema says {}", class, code, expected),
                })
            }
            None => {
                return Err(ArtifactError::EncoderMismatch {
                    feature: feature.to_string(),
                    reason: format!("category '{}' is not in the schema", class),
                })
            }
        }
    }
    Ok(())
}

/// Check a bundle against the schema it claims to serve
pub fn validate_artifact_set(set: &TrainedArtifactSet, schema: &FeatureSchema) -> Result<(), ArtifactError> {
    if set.task != schema.task {
        return Err(ArtifactError::Malformed(format!(
            "bundle is for task '{}', expected '{}'",
            set.task, schema.task
        )));
    }

    schema.validate_layout(set.schema_version, set.layout_hash)?;

    let n_features = set.estimator.n_features();
    if n_features != schema.feature_count() {
        return Err(ArtifactError::Malformed(format!(
            "estimator expects {} features, schema has {}",
            n_features,
            schema.feature_count()
        )));
    }

    for (feature, codes) in &schema.categorical_encodings {
        let encoder = set.fitted_encoders.get(feature).ok_or_else(|| ArtifactError::EncoderMismatch {
            feature: feature.clone(),
            reason: "no fitted encoder in bundle".to_string(),
        })?;
        check_encoder(feature, encoder, codes)?;
    }

    if let Some(scaler) = &set.fitted_scaler {
        if scaler.n_features() != n_features {
            return Err(ArtifactError::Malformed(format!(
                "scaler fitted on {} features, estimator expects {}",
                scaler.n_features(),
                n_features
            )));
        }
    }

    match set.task {
        TaskKind::Disease => {
            let labels = set.fitted_encoders.get(&schema.label_column).ok_or_else(|| {
                ArtifactError::Malformed(format!("missing label encoder for '{}'", schema.label_column))
            })?;
            if set.estimator.n_classes() != Some(labels.n_classes()) {
                return Err(ArtifactError::Malformed(format!(
                    "label encoder has {} classes, estimator {:?}",
                    labels.n_classes(),
                    set.estimator.n_classes()
                )));
            }
        }
        TaskKind::Risk => {
            if set.fitted_scaler.is_none() {
                return Err(ArtifactError::Malformed("risk bundle has no fitted scaler".to_string()));
            }
            if set.estimator.n_classes().is_some() {
                return Err(ArtifactError::Malformed("risk estimator must be a regressor".to_string()));
            }
        }
        TaskKind::NoShow => {
            if set.estimator.n_classes() != Some(2) {
                return Err(ArtifactError::Malformed("no-show estimator must be binary".to_string()));
            }
        }
    }

    Ok(())
}
