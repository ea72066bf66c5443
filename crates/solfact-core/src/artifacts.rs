//! Artifact cache: schema-versioned persistence for the fact store.
//!
//! The cache exists so repeated queries never re-run the expensive external
//! analyzer: a [`ProjectFacts`] is serialized once into a self-describing
//! envelope and reloaded on later runs with identical contents
//! (`load(save(f)) == f` is a correctness invariant, not an optimization).
//!
//! # Envelope format
//!
//! One JSON file per project containing:
//! - `schema_version`: explicit `MAJOR.MINOR.PATCH` string, checked on load
//!   (never inferred from shape)
//! - `type_tag`: model name plus a single-value/sequence marker, so
//!   structurally similar payloads cannot be confused on reload
//! - `checksum`: SHA-256 over the canonical payload serialization
//! - `saved_at`: write timestamp (informational)
//! - `data`: the serialized store
//!
//! Writes go to a temporary file in the destination directory followed by an
//! atomic rename, so a crashed writer never leaves a partially overwritten
//! artifact behind.
//!
//! # Cache policy
//!
//! Freshness is path-based: an artifact at the expected location is trusted.
//! Invalidation on source change is the caller's responsibility
//! ([`ArtifactCache::invalidate`]); no source fingerprints are computed here.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::constants::ARTIFACTS_DIR_NAME;
use crate::facts::ProjectFacts;

// ============================================================================
// Constants
// ============================================================================

/// Artifact schema version written by this build.
///
/// Compatibility rule: an artifact loads when its major version matches and
/// its minor version is not newer than this one (older minors of the same
/// major stay forward-readable).
pub const ARTIFACT_SCHEMA_VERSION: &str = "1.1.0";

/// File name of the artifact within the cache directory.
pub const ARTIFACT_FILE_NAME: &str = "project_facts.json";

/// Type tag model name for a serialized fact store.
const PROJECT_FACTS_MODEL: &str = "ProjectFacts";

// ============================================================================
// Error Types
// ============================================================================

/// Errors from artifact save/load.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// No artifact exists at the expected location.
    #[error("artifact not found: {path}")]
    NotFound { path: PathBuf },

    /// The artifact exists but cannot be trusted: invalid JSON, missing or
    /// wrong type tag, checksum mismatch, or an undecodable payload.
    #[error("artifact is corrupt: {reason} ({path})")]
    Corrupt { path: PathBuf, reason: String },

    /// The artifact's schema version is incompatible with this build.
    #[error("artifact schema version '{found}' is incompatible with supported '{supported}'")]
    VersionMismatch { found: String, supported: String },

    /// IO failure reading or writing the artifact.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Serialization failure while saving.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for artifact operations.
pub type ArtifactResult<T> = Result<T, ArtifactError>;

// ============================================================================
// Envelope
// ============================================================================

/// Discriminates the payload model so structurally similar records cannot be
/// confused on reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct TypeTag {
    /// Model name of the payload (`ProjectFacts`).
    model: String,
    /// Whether the payload is a sequence of that model.
    is_list: bool,
}

/// The persisted envelope around the serialized store.
#[derive(Debug, Serialize, Deserialize)]
struct ArtifactEnvelope {
    schema_version: String,
    type_tag: TypeTag,
    checksum: String,
    saved_at: String,
    data: serde_json::Value,
}

// ============================================================================
// Cache Handle
// ============================================================================

/// Explicit handle to one project's on-disk artifact location.
///
/// There is deliberately no process-wide cache singleton: callers own a
/// handle per project root and pass it where it is needed, which keeps the
/// one-writer-per-root invariant enforceable by the registry.
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    dir: PathBuf,
}

impl ArtifactCache {
    /// A cache rooted at an explicit directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ArtifactCache { dir: dir.into() }
    }

    /// The conventional cache location for a project root
    /// (`<root>/artifacts/`).
    pub fn for_project(project_root: &Path) -> Self {
        ArtifactCache {
            dir: project_root.join(ARTIFACTS_DIR_NAME),
        }
    }

    /// Path of the artifact file.
    pub fn artifact_path(&self) -> PathBuf {
        self.dir.join(ARTIFACT_FILE_NAME)
    }

    /// Whether an artifact exists at the expected location.
    pub fn exists(&self) -> bool {
        self.artifact_path().exists()
    }

    /// Delete the artifact. Missing artifacts are not an error.
    pub fn invalidate(&self) -> ArtifactResult<()> {
        let path = self.artifact_path();
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "artifact invalidated");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Serialize and persist a fact store, atomically replacing any previous
    /// artifact. Returns the artifact path.
    pub fn save(&self, facts: &ProjectFacts) -> ArtifactResult<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let data = serde_json::to_value(facts)?;
        let checksum = payload_checksum(&data)?;
        let envelope = ArtifactEnvelope {
            schema_version: ARTIFACT_SCHEMA_VERSION.to_string(),
            type_tag: TypeTag {
                model: PROJECT_FACTS_MODEL.to_string(),
                is_list: false,
            },
            checksum,
            saved_at: format_timestamp(std::time::SystemTime::now()),
            data,
        };

        let path = self.artifact_path();
        let content = serde_json::to_string_pretty(&envelope)?;
        atomic_write(&path, content.as_bytes())?;
        tracing::info!(path = %path.display(), "saved project facts artifact");
        Ok(path)
    }

    /// Load and validate a fact store from the artifact, rebuilding its
    /// derived indexes.
    ///
    /// On any failure the store is left unconstructed — there is no partial
    /// load.
    pub fn load(&self) -> ArtifactResult<ProjectFacts> {
        let path = self.artifact_path();
        if !path.exists() {
            return Err(ArtifactError::NotFound { path });
        }
        let content = fs::read_to_string(&path)?;

        let envelope: ArtifactEnvelope =
            serde_json::from_str(&content).map_err(|e| ArtifactError::Corrupt {
                path: path.clone(),
                reason: format!("invalid envelope: {e}"),
            })?;

        if envelope.type_tag.model != PROJECT_FACTS_MODEL || envelope.type_tag.is_list {
            return Err(ArtifactError::Corrupt {
                path,
                reason: format!(
                    "type tag mismatch: expected single {PROJECT_FACTS_MODEL}, found {} (is_list: {})",
                    envelope.type_tag.model, envelope.type_tag.is_list
                ),
            });
        }

        check_version_compatible(&envelope.schema_version, &path)?;

        let computed = payload_checksum(&envelope.data).map_err(|e| ArtifactError::Corrupt {
            path: path.clone(),
            reason: format!("payload not reserializable: {e}"),
        })?;
        if computed != envelope.checksum {
            return Err(ArtifactError::Corrupt {
                path,
                reason: "checksum mismatch".to_string(),
            });
        }

        let mut facts: ProjectFacts =
            serde_json::from_value(envelope.data).map_err(|e| ArtifactError::Corrupt {
                path: path.clone(),
                reason: format!("undecodable payload: {e}"),
            })?;

        if facts.schema_version != crate::facts::FACTS_SCHEMA_VERSION {
            return Err(ArtifactError::VersionMismatch {
                found: format!("facts schema {}", facts.schema_version),
                supported: format!("facts schema {}", crate::facts::FACTS_SCHEMA_VERSION),
            });
        }

        facts.rebuild_indexes();
        tracing::info!(
            path = %path.display(),
            contracts = facts.contracts().len(),
            "loaded project facts artifact"
        );
        Ok(facts)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// SHA-256 over the canonical (sorted-key) JSON serialization of the
/// payload. `serde_json` maps are ordered, so reserializing the parsed
/// payload reproduces the same canonical string on load.
fn payload_checksum(data: &serde_json::Value) -> Result<String, serde_json::Error> {
    let canonical = serde_json::to_string(data)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Reject artifacts from a different major version or a newer minor version.
fn check_version_compatible(found: &str, path: &Path) -> ArtifactResult<()> {
    let parse = |v: &str| -> Option<(u32, u32)> {
        let mut parts = v.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        Some((major, minor))
    };
    let Some((found_major, found_minor)) = parse(found) else {
        return Err(ArtifactError::Corrupt {
            path: path.to_path_buf(),
            reason: format!("unparseable schema version '{found}'"),
        });
    };
    // Supported version is a compile-time constant in valid form.
    let Some((major, minor)) = parse(ARTIFACT_SCHEMA_VERSION) else {
        return Err(ArtifactError::Corrupt {
            path: path.to_path_buf(),
            reason: "invalid supported schema version".to_string(),
        });
    };
    if found_major != major || found_minor > minor {
        return Err(ArtifactError::VersionMismatch {
            found: found.to_string(),
            supported: ARTIFACT_SCHEMA_VERSION.to_string(),
        });
    }
    Ok(())
}

/// Format a timestamp for the envelope (ISO 8601).
fn format_timestamp(time: std::time::SystemTime) -> String {
    use chrono::{DateTime, Utc};

    let datetime: DateTime<Utc> = time.into();
    datetime.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Write content to a file atomically using temp + rename.
///
/// Readers see either the old or the new artifact, never a partial write.
/// The temp name includes PID and timestamp to avoid collisions between
/// concurrent writers.
fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    use std::time::{SystemTime, UNIX_EPOCH};

    let pid = std::process::id();
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    let temp_path = path.with_file_name(format!(
        ".{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        pid,
        timestamp
    ));
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
