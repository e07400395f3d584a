//! Feature Layout - Centralized Feature Schema Registry
//!
//! **CRITICAL: This file controls the feature schema of every model**
//!
//! ## Rules (NEVER break these):
//! 1. Add feature → increment the task's schema version
//! 2. Change order → increment the task's schema version
//! 3. Remove feature / change a categorical code → increment the task's schema version
//!
//! Trainer and prediction service both read feature order and categorical
//! codes from here and nowhere else. Artifact bundles record the version
//! and layout hash they were trained against; loading rejects any mismatch.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crc32fast::Hasher;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::record::FieldValue;
use crate::logic::error::UnknownTaskError;

// ============================================================================
// SCHEMA VERSIONS
// ============================================================================

/// MUST be incremented when the disease layout changes
pub const DISEASE_SCHEMA_VERSION: u8 = 1;

/// MUST be incremented when the risk layout changes
pub const RISK_SCHEMA_VERSION: u8 = 1;

/// MUST be incremented when the no-show layout changes
pub const NOSHOW_SCHEMA_VERSION: u8 = 1;

// ============================================================================
// TASKS
// ============================================================================

/// Prediction task served by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Disease,
    Risk,
    #[serde(rename = "noshow")]
    NoShow,
}

impl TaskKind {
    pub const ALL: [TaskKind; 3] = [TaskKind::Disease, TaskKind::Risk, TaskKind::NoShow];

    /// Canonical task name (bundle names, logs, results)
    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::Disease => "disease",
            TaskKind::Risk => "risk",
            TaskKind::NoShow => "noshow",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TaskKind {
    type Err = UnknownTaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disease" | "diagnosis" => Ok(TaskKind::Disease),
            "risk" | "risk_score" => Ok(TaskKind::Risk),
            "noshow" | "no_show" | "no-show" | "appointment" => Ok(TaskKind::NoShow),
            _ => Err(UnknownTaskError(s.to_string())),
        }
    }
}

// ============================================================================
// FEATURE SCHEMA
// ============================================================================

/// Ordered feature contract for one task at one version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub task: TaskKind,
    pub version: u8,
    /// Feature names in exact vector order
    pub ordered_feature_names: Vec<String>,
    /// feature -> (category -> code)
    pub categorical_encodings: BTreeMap<String, BTreeMap<String, i64>>,
    /// Fallback values for optional features
    pub defaults: BTreeMap<String, FieldValue>,
    /// Target column in the dataset file
    pub label_column: String,
}

impl FeatureSchema {
    pub fn feature_count(&self) -> usize {
        self.ordered_feature_names.len()
    }

    /// Get feature index by name (O(n) but features are few)
    pub fn feature_index(&self, name: &str) -> Option<usize> {
        self.ordered_feature_names.iter().position(|n| n == name)
    }

    pub fn feature_name(&self, index: usize) -> Option<&str> {
        self.ordered_feature_names.get(index).map(String::as_str)
    }

    pub fn encoding_for(&self, feature: &str) -> Option<&BTreeMap<String, i64>> {
        self.categorical_encodings.get(feature)
    }

    pub fn is_required(&self, feature: &str) -> bool {
        !self.defaults.contains_key(feature)
    }

    /// CRC32 of version, task, feature order and categorical codes
    pub fn layout_hash(&self) -> u32 {
        let mut hasher = Hasher::new();

        hasher.update(&[self.version]);
        hasher.update(self.task.name().as_bytes());
        hasher.update(&[0]);

        for name in &self.ordered_feature_names {
            hasher.update(name.as_bytes());
            hasher.update(&[0]); // Separator
        }

        // BTreeMap iteration is sorted, so the hash is order-stable
        for (feature, codes) in &self.categorical_encodings {
            hasher.update(feature.as_bytes());
            for (category, code) in codes {
                hasher.update(category.as_bytes());
                hasher.update(&code.to_le_bytes());
            }
            hasher.update(&[0]);
        }

        hasher.finalize()
    }

    /// Validate that an artifact was trained against this exact layout
    pub fn validate_layout(&self, version: u8, hash: u32) -> Result<(), LayoutMismatchError> {
        let current_hash = self.layout_hash();

        if version != self.version || hash != current_hash {
            return Err(LayoutMismatchError {
                task: self.task,
                expected_version: self.version,
                expected_hash: current_hash,
                actual_version: version,
                actual_hash: hash,
            });
        }

        Ok(())
    }

    pub fn info(&self) -> LayoutInfo {
        LayoutInfo {
            task: self.task,
            version: self.version,
            hash: self.layout_hash(),
            feature_count: self.feature_count(),
            feature_names: self.ordered_feature_names.clone(),
        }
    }
}

/// Layout summary for logs / CLI output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub task: TaskKind,
    pub version: u8,
    pub hash: u32,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
}

/// Error when an artifact's feature layout doesn't match the registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "feature layout mismatch for {task}: expected v{expected_version} (hash: {expected_hash:08x}), \
     got v{actual_version} (hash: {actual_hash:08x})"
)]
pub struct LayoutMismatchError {
    pub task: TaskKind,
    pub expected_version: u8,
    pub expected_hash: u32,
    pub actual_version: u8,
    pub actual_hash: u32,
}

// ============================================================================
// REGISTERED LAYOUTS (Authoritative source)
// ============================================================================

const SYMPTOMS: &[&str] = &[
    "fever", "headache", "fatigue", "cough", "vomiting", "diarrhea", "joint_pain", "rash",
];

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn codes(list: &[(&str, i64)]) -> BTreeMap<String, i64> {
    list.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn disease_schema() -> FeatureSchema {
    let ordered = names(&[
        "age",                      // 0
        "fever",                    // 1
        "headache",                 // 2
        "fatigue",                  // 3
        "cough",                    // 4
        "vomiting",                 // 5
        "diarrhea",                 // 6
        "joint_pain",               // 7
        "rash",                     // 8
        "blood_pressure_systolic",  // 9
        "blood_pressure_diastolic", // 10
        "glucose_level",            // 11
        "gender",                   // 12: F=0, M=1
    ]);

    let mut categorical = BTreeMap::new();
    categorical.insert("gender".to_string(), codes(&[("F", 0), ("M", 1)]));

    let defaults = SYMPTOMS
        .iter()
        .map(|s| (s.to_string(), FieldValue::Number(0.0)))
        .collect();

    FeatureSchema {
        task: TaskKind::Disease,
        version: DISEASE_SCHEMA_VERSION,
        ordered_feature_names: ordered,
        categorical_encodings: categorical,
        defaults,
        label_column: "diagnosis".to_string(),
    }
}

fn risk_schema() -> FeatureSchema {
    let ordered = names(&[
        "age",
        "pregnancy",
        "glucose",
        "blood_pressure_systolic",
        "blood_pressure_diastolic",
        "heart_rate",
        "weight",
        "bmi",
    ]);

    let mut defaults = BTreeMap::new();
    defaults.insert("pregnancy".to_string(), FieldValue::Number(0.0));
    defaults.insert("bmi".to_string(), FieldValue::Number(25.0));

    FeatureSchema {
        task: TaskKind::Risk,
        version: RISK_SCHEMA_VERSION,
        ordered_feature_names: ordered,
        categorical_encodings: BTreeMap::new(),
        defaults,
        label_column: "risk_score".to_string(),
    }
}

fn noshow_schema() -> FeatureSchema {
    let ordered = names(&[
        "distance_from_hospital",
        "previous_no_shows",
        "sms_sent",
        "weather_condition",
    ]);

    let mut categorical = BTreeMap::new();
    categorical.insert(
        "weather_condition".to_string(),
        codes(&[("cloudy", 0), ("rainy", 1), ("sunny", 2)]),
    );

    let mut defaults = BTreeMap::new();
    defaults.insert("previous_no_shows".to_string(), FieldValue::Number(0.0));
    defaults.insert("sms_sent".to_string(), FieldValue::Number(0.0));
    defaults.insert("weather_condition".to_string(), FieldValue::Text("sunny".to_string()));

    FeatureSchema {
        task: TaskKind::NoShow,
        version: NOSHOW_SCHEMA_VERSION,
        ordered_feature_names: ordered,
        categorical_encodings: categorical,
        defaults,
        label_column: "did_come".to_string(),
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

static REGISTRY: Lazy<BTreeMap<TaskKind, FeatureSchema>> = Lazy::new(|| {
    let mut schemas = BTreeMap::new();
    for schema in [disease_schema(), risk_schema(), noshow_schema()] {
        schemas.insert(schema.task, schema);
    }
    schemas
});

/// Look up a schema by task name
pub fn get_schema(task_name: &str) -> Result<&'static FeatureSchema, UnknownTaskError> {
    let task = TaskKind::from_str(task_name)?;
    Ok(schema_for(task))
}

/// Schema of a known task
pub fn schema_for(task: TaskKind) -> &'static FeatureSchema {
    // Every TaskKind is registered above
    &REGISTRY[&task]
}

pub fn all_schemas() -> impl Iterator<Item = &'static FeatureSchema> {
    REGISTRY.values()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_task_registered() {
        for task in TaskKind::ALL {
            let schema = schema_for(task);
            assert_eq!(schema.task, task);
            assert!(schema.feature_count() > 0);
        }
    }

    #[test]
    fn test_get_schema_unknown_task() {
        let err = get_schema("billing").unwrap_err();
        assert_eq!(err, UnknownTaskError("billing".to_string()));
    }

    #[test]
    fn test_task_aliases() {
        assert_eq!("no_show".parse::<TaskKind>().unwrap(), TaskKind::NoShow);
        assert_eq!("No-Show".parse::<TaskKind>().unwrap(), TaskKind::NoShow);
        assert_eq!("diagnosis".parse::<TaskKind>().unwrap(), TaskKind::Disease);
        assert_eq!(get_schema("risk").unwrap().task, TaskKind::Risk);
    }

    #[test]
    fn test_disease_layout_order() {
        let schema = schema_for(TaskKind::Disease);
        assert_eq!(schema.feature_count(), 13);
        assert_eq!(schema.feature_index("age"), Some(0));
        assert_eq!(schema.feature_index("glucose_level"), Some(11));
        assert_eq!(schema.feature_index("gender"), Some(12));
        assert_eq!(schema.feature_name(1), Some("fever"));
        assert_eq!(schema.feature_index("temperature"), None);
    }

    #[test]
    fn test_weather_codes_sorted_alphabetically() {
        let schema = schema_for(TaskKind::NoShow);
        let weather = schema.encoding_for("weather_condition").unwrap();
        assert_eq!(weather["cloudy"], 0);
        assert_eq!(weather["rainy"], 1);
        assert_eq!(weather["sunny"], 2);
    }

    #[test]
    fn test_layout_hash_consistency() {
        let schema = schema_for(TaskKind::Risk);
        assert_eq!(schema.layout_hash(), schema.layout_hash());
        assert_ne!(schema.layout_hash(), 0);
    }

    #[test]
    fn test_layout_hash_differs_per_task() {
        let hashes: Vec<u32> = TaskKind::ALL.iter().map(|t| schema_for(*t).layout_hash()).collect();
        assert_ne!(hashes[0], hashes[1]);
        assert_ne!(hashes[1], hashes[2]);
        assert_ne!(hashes[0], hashes[2]);
    }

    #[test]
    fn test_layout_hash_sensitive_to_codes() {
        let mut schema = schema_for(TaskKind::NoShow).clone();
        let original = schema.layout_hash();
        schema
            .categorical_encodings
            .get_mut("weather_condition")
            .unwrap()
            .insert("sunny".to_string(), 0);
        assert_ne!(schema.layout_hash(), original);
    }

    #[test]
    fn test_validate_layout() {
        let schema = schema_for(TaskKind::Disease);
        assert!(schema.validate_layout(schema.version, schema.layout_hash()).is_ok());

        let err = schema
            .validate_layout(schema.version + 1, schema.layout_hash())
            .unwrap_err();
        assert_eq!(err.actual_version, schema.version + 1);

        assert!(schema.validate_layout(schema.version, !schema.layout_hash()).is_err());
    }

    #[test]
    fn test_layout_info() {
        let info = schema_for(TaskKind::NoShow).info();
        assert_eq!(info.feature_count, 4);
        assert_eq!(info.feature_names.len(), 4);
        assert_eq!(info.version, NOSHOW_SCHEMA_VERSION);
    }
}
