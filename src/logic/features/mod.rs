//! Features Module - Feature Schema Registry & Encoding
//!
//! Single source of truth for model inputs:
//! - `layout` - per-task ordered feature lists, categorical codes, defaults
//! - `record` - plain named-field records handed in by the record store
//! - `vector` - `encode`, shared by training and serving

pub mod layout;
pub mod record;
pub mod vector;


// Re-export common types
pub use layout::{
    all_schemas, get_schema, schema_for, FeatureSchema, LayoutInfo, LayoutMismatchError, TaskKind,
};
pub use record::{FieldValue, Record};
pub use vector::{encode, FeatureVector};
