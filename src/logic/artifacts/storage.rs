//! Artifact Storage - one bundle file per task and schema version
//!
//! File layout:
//! - line 1: JSON `BundleHeader` (format, task, version, layout hash, sha256)
//! - rest:   JSON `TrainedArtifactSet`
//!
//! Writes go through a temp file and rename. Loads verify the checksum,
//! the layout and the bundle's internal consistency before returning.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::logic::dataset::writer::temp_path;
use crate::logic::error::ArtifactError;
use crate::logic::features::{schema_for, FeatureSchema, TaskKind};

use super::types::{BundleHeader, TrainedArtifactSet, BUNDLE_FORMAT};
use super::validate::validate_artifact_set;

/// Bundle file name, e.g. `risk_v1.bundle`
pub fn bundle_file_name(task: TaskKind, version: u8) -> String {
    format!("{}_v{}.bundle", task.name(), version)
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Artifact directory manager
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn bundle_path(&self, task: TaskKind, version: u8) -> PathBuf {
        self.dir.join(bundle_file_name(task, version))
    }

    pub fn exists(&self, task: TaskKind, version: u8) -> bool {
        self.bundle_path(task, version).exists()
    }

    /// Validate and atomically write a bundle, replacing any previous one
    pub fn save(&self, set: &TrainedArtifactSet) -> Result<PathBuf, ArtifactError> {
        validate_artifact_set(set, schema_for(set.task))?;

        let payload = serde_json::to_string(set)?;
        let header = BundleHeader {
            format: BUNDLE_FORMAT.to_string(),
            task: set.task,
            schema_version: set.schema_version,
            layout_hash: set.layout_hash,
            sha256: sha256_hex(payload.as_bytes()),
        };
        let header_line = serde_json::to_string(&header)?;

        fs::create_dir_all(&self.dir)?;
        let path = self.bundle_path(set.task, set.schema_version);
        let tmp = temp_path(&path);

        let mut content = String::with_capacity(header_line.len() + payload.len() + 1);
        content.push_str(&header_line);
        content.push('\n');
        content.push_str(&payload);

        fs::write(&tmp, content)?;
        fs::rename(&tmp, &path)?;

        log::info!(
            "Artifact bundle saved: {} (bundle {}, sha256 {}...)",
            path.display(),
            set.bundle_id,
            &header.sha256[..12]
        );
        Ok(path)
    }

    /// Load the bundle trained against `schema`, verifying everything
    pub fn load(&self, schema: &FeatureSchema) -> Result<TrainedArtifactSet, ArtifactError> {
        let path = self.bundle_path(schema.task, schema.version);
        let content = fs::read_to_string(&path)?;
        let (header, payload) = split_bundle(&content)?;

        if header.format != BUNDLE_FORMAT {
            return Err(ArtifactError::Malformed(format!("unsupported bundle format '{}'", header.format)));
        }
        if header.task != schema.task {
            return Err(ArtifactError::Malformed(format!(
                "header names task '{}', file is for '{}'",
                header.task, schema.task
            )));
        }

        let actual = sha256_hex(payload.as_bytes());
        if actual != header.sha256 {
            return Err(ArtifactError::ChecksumMismatch {
                expected: header.sha256,
                actual,
            });
        }

        schema.validate_layout(header.schema_version, header.layout_hash)?;

        let set: TrainedArtifactSet = serde_json::from_str(payload)?;
        if set.schema_version != header.schema_version || set.layout_hash != header.layout_hash {
            return Err(ArtifactError::Malformed("payload disagrees with header".to_string()));
        }
        validate_artifact_set(&set, schema)?;

        log::debug!("Artifact bundle loaded: {} (bundle {})", path.display(), set.bundle_id);
        Ok(set)
    }

    /// Header of a bundle file without parsing the payload
    pub fn read_header(&self, path: &Path) -> Result<BundleHeader, ArtifactError> {
        let content = fs::read_to_string(path)?;
        split_bundle(&content).map(|(header, _)| header)
    }

    /// Headers of every bundle in the directory (unreadable files skipped)
    pub fn list(&self) -> Result<Vec<BundleHeader>, ArtifactError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut headers = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().map_or(true, |ext| ext != "bundle") {
                continue;
            }
            match self.read_header(&path) {
                Ok(header) => headers.push(header),
                Err(e) => log::warn!("Skipping unreadable bundle {}: {}", path.display(), e),
            }
        }
        headers.sort_by(|a, b| (a.task, a.schema_version).cmp(&(b.task, b.schema_version)));
        Ok(headers)
    }
}

fn split_bundle(content: &str) -> Result<(BundleHeader, &str), ArtifactError> {
    let (header_line, payload) = content
        .split_once('\n')
        .ok_or_else(|| ArtifactError::Malformed("missing header line".to_string()))?;
    let header: BundleHeader = serde_json::from_str(header_line)
        .map_err(|e| ArtifactError::Malformed(format!("bad header: {}", e)))?;
    Ok((header, payload))
}
