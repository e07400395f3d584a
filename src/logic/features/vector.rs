//! Feature Vector - Core data structure for model input
//!
//! **Versioned feature vector with layout validation**
//!
//! `encode` is the only way a record becomes numbers. Training-set
//! assembly and serving both go through it, so the two can never
//! disagree on order, categorical codes or defaults.

use serde::{Deserialize, Serialize};

use super::layout::{FeatureSchema, LayoutMismatchError, TaskKind};
use super::record::{FieldValue, Record};
use crate::logic::error::FeatureEncodingError;

// ============================================================================
// VERSIONED FEATURE VECTOR
// ============================================================================

/// Versioned Feature Vector with layout metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub task: TaskKind,
    /// Schema version the vector was encoded with
    pub version: u8,
    /// CRC32 hash of the feature layout (for mismatch detection)
    pub layout_hash: u32,
    /// Feature values in schema order
    pub values: Vec<f64>,
}

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Get feature by name
    pub fn get_by_name(&self, schema: &FeatureSchema, name: &str) -> Option<f64> {
        schema.feature_index(name).and_then(|i| self.get(i))
    }

    /// Validate that this vector is compatible with a schema
    pub fn validate(&self, schema: &FeatureSchema) -> Result<(), LayoutMismatchError> {
        schema.validate_layout(self.version, self.layout_hash)
    }

    /// Convert to JSON-serializable format for logging
    pub fn to_log_entry(&self, schema: &FeatureSchema) -> serde_json::Value {
        serde_json::json!({
            "task": self.task,
            "schema_version": self.version,
            "layout_hash": self.layout_hash,
            "values": self.values,
            "named_values": schema.ordered_feature_names.iter()
                .zip(self.values.iter())
                .map(|(name, val)| (name.clone(), serde_json::json!(val)))
                .collect::<serde_json::Map<String, serde_json::Value>>()
        })
    }
}

// ============================================================================
// ENCODING
// ============================================================================

/// Encode a record into the schema's ordered numeric vector.
///
/// Fields are looked up by name; extra fields are ignored. A missing (or
/// blank text) field takes the schema default, a required one fails.
pub fn encode(schema: &FeatureSchema, record: &Record) -> Result<FeatureVector, FeatureEncodingError> {
    let mut values = Vec::with_capacity(schema.feature_count());

    for feature in &schema.ordered_feature_names {
        let supplied = record.get(feature).filter(|v| !is_blank(v));

        let value = match supplied.or_else(|| schema.defaults.get(feature)) {
            Some(value) => value,
            None => {
                return Err(FeatureEncodingError::MissingFeature {
                    feature: feature.clone(),
                })
            }
        };

        values.push(encode_value(schema, feature, value)?);
    }

    Ok(FeatureVector {
        task: schema.task,
        version: schema.version,
        layout_hash: schema.layout_hash(),
        values,
    })
}

fn is_blank(value: &FieldValue) -> bool {
    matches!(value, FieldValue::Text(s) if s.trim().is_empty())
}

/// Coerce one field value according to the feature's definition
fn encode_value(
    schema: &FeatureSchema,
    feature: &str,
    value: &FieldValue,
) -> Result<f64, FeatureEncodingError> {
    if let Some(codes) = schema.encoding_for(feature) {
        return match value {
            FieldValue::Text(text) => {
                let wanted = text.trim();
                codes
                    .iter()
                    .find(|(category, _)| category.eq_ignore_ascii_case(wanted))
                    .map(|(_, code)| *code as f64)
                    .ok_or_else(|| FeatureEncodingError::UnknownCategory {
                        feature: feature.to_string(),
                        value: text.clone(),
                    })
            }
            // Already-encoded input is accepted when it is a valid code
            FieldValue::Number(n) if codes.values().any(|c| (*c as f64) == *n) => Ok(*n),
            other => Err(FeatureEncodingError::UnknownCategory {
                feature: feature.to_string(),
                value: other.describe(),
            }),
        };
    }

    let number = match value {
        FieldValue::Number(n) => *n,
        FieldValue::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        FieldValue::Text(text) => text.trim().parse::<f64>().map_err(|_| {
            FeatureEncodingError::NotNumeric {
                feature: feature.to_string(),
                value: text.clone(),
            }
        })?,
    };

    if !number.is_finite() {
        return Err(FeatureEncodingError::NotNumeric {
            feature: feature.to_string(),
            value: value.describe(),
        });
    }

    Ok(number)
}
