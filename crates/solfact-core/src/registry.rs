//! Project registry: one fact store per project root, built exactly once.
//!
//! The fact store itself is immutable and safe for unlimited concurrent
//! readers; the expensive part is getting one. This module serializes
//! construction per project root:
//!
//! 1. Check the in-memory slot for the root
//! 2. Probe the artifact cache on disk
//! 3. Invoke the external analyzer (the caller-supplied closure) and save
//!    the result
//!
//! Steps 2–3 run under the root's slot mutex, so at most one analyzer
//! invocation and one cache write are in flight per root; concurrent
//! requests for the same root block on the slot and are served the same
//! `Arc<ProjectFacts>`. Different roots hold different slots and proceed
//! fully independently.
//!
//! A corrupt or version-mismatched artifact is a warning followed by
//! re-analysis, not a failure — the fresh save overwrites it atomically.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::artifacts::{ArtifactCache, ArtifactError};
use crate::error::SolfactError;
use crate::facts::ProjectFacts;

// ============================================================================
// Registry
// ============================================================================

/// Per-root slot. The mutex spans the whole probe/analyze/save sequence.
#[derive(Debug, Default)]
struct ProjectSlot {
    facts: Mutex<Option<Arc<ProjectFacts>>>,
}

/// Explicit registry of loaded projects.
///
/// Owns nothing ambient: callers construct one registry and pass it where
/// construction coordination is needed.
#[derive(Debug, Default)]
pub struct ProjectRegistry {
    slots: Mutex<HashMap<PathBuf, Arc<ProjectSlot>>>,
}

impl ProjectRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        ProjectRegistry::default()
    }

    /// Get the fact store for `project_root`, building it at most once.
    ///
    /// Resolution order: in-memory slot, then the on-disk artifact at the
    /// conventional location, then `analyze` — the external analyzer
    /// invocation, supplied by the caller because the analyzer itself is an
    /// external collaborator. A successful analysis is persisted before any
    /// waiter observes it.
    pub fn get_or_build<F>(
        &self,
        project_root: &Path,
        analyze: F,
    ) -> Result<Arc<ProjectFacts>, SolfactError>
    where
        F: FnOnce() -> Result<ProjectFacts, SolfactError>,
    {
        let slot = self.slot_for(project_root);
        let mut guard = lock_unpoisoned(&slot.facts);
        if let Some(facts) = guard.as_ref() {
            return Ok(Arc::clone(facts));
        }

        let cache = ArtifactCache::for_project(project_root);
        match cache.load() {
            Ok(facts) => {
                tracing::info!(
                    root = %project_root.display(),
                    contracts = facts.contracts().len(),
                    "serving project facts from artifact cache"
                );
                let facts = Arc::new(facts);
                *guard = Some(Arc::clone(&facts));
                return Ok(facts);
            }
            Err(ArtifactError::NotFound { .. }) => {
                tracing::debug!(root = %project_root.display(), "no artifact cache, analyzing");
            }
            Err(e @ (ArtifactError::Corrupt { .. } | ArtifactError::VersionMismatch { .. })) => {
                tracing::warn!(
                    root = %project_root.display(),
                    error = %e,
                    "artifact cache rejected, re-analyzing"
                );
            }
            Err(e) => return Err(e.into()),
        }

        let facts = analyze()?;
        cache.save(&facts)?;
        let facts = Arc::new(facts);
        *guard = Some(Arc::clone(&facts));
        Ok(facts)
    }

    /// The fact store for `project_root` if it is already in memory.
    pub fn get(&self, project_root: &Path) -> Option<Arc<ProjectFacts>> {
        let slots = lock_unpoisoned(&self.slots);
        let slot = slots.get(project_root)?;
        let facts = lock_unpoisoned(&slot.facts).clone();
        facts
    }

    /// Drop the in-memory store for `project_root`. The on-disk artifact is
    /// untouched; pair with [`ArtifactCache::invalidate`] to force a full
    /// re-analysis.
    pub fn evict(&self, project_root: &Path) {
        let mut slots = lock_unpoisoned(&self.slots);
        slots.remove(project_root);
    }

    fn slot_for(&self, project_root: &Path) -> Arc<ProjectSlot> {
        let mut slots = lock_unpoisoned(&self.slots);
        Arc::clone(slots.entry(project_root.to_path_buf()).or_default())
    }
}

/// Lock a mutex, recovering the guard if a previous holder panicked. The
/// protected state is a plain `Option`/map that is never left half-written.
fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

// ============================================================================
// Tests
// ============================================================================
