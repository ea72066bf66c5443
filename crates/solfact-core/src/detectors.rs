//! Queries over detector metadata and cached findings.
//!
//! Detectors run inside the external analyzer; this module only answers
//! questions about what it reported. All filters are case-insensitive,
//! matching how analyzer frontends spell impact/confidence levels
//! inconsistently.

use crate::error::{ResolveError, ResolveResult};
use crate::facts::{DetectorMetadata, Finding, ProjectFacts};

/// Filters for [`findings`]. Empty/`None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct FindingFilter {
    /// Restrict to these detector names.
    pub detectors: Option<Vec<String>>,
    /// Restrict to these impact levels.
    pub impact: Option<Vec<String>>,
    /// Restrict to these confidence levels.
    pub confidence: Option<Vec<String>>,
}

/// List available detectors, optionally filtered by a case-insensitive
/// substring of name or description.
pub fn list_detectors<'a>(
    facts: &'a ProjectFacts,
    name_filter: Option<&str>,
) -> Vec<&'a DetectorMetadata> {
    let needle = name_filter.map(str::to_lowercase);
    facts
        .available_detectors()
        .iter()
        .filter(|d| match &needle {
            Some(needle) => {
                d.name.to_lowercase().contains(needle)
                    || d.description.to_lowercase().contains(needle)
            }
            None => true,
        })
        .collect()
}

/// All cached findings matching the filter, flattened across detectors in
/// detector-name order.
pub fn findings<'a>(facts: &'a ProjectFacts, filter: &FindingFilter) -> Vec<&'a Finding> {
    let detector_names: Option<Vec<String>> = filter
        .detectors
        .as_ref()
        .map(|names| names.iter().map(|n| n.to_lowercase()).collect());
    let impacts: Option<Vec<String>> = filter
        .impact
        .as_ref()
        .map(|levels| levels.iter().map(|l| l.to_lowercase()).collect());
    let confidences: Option<Vec<String>> = filter
        .confidence
        .as_ref()
        .map(|levels| levels.iter().map(|l| l.to_lowercase()).collect());

    facts
        .detector_results()
        .iter()
        .filter(|(name, _)| match &detector_names {
            Some(names) => names.contains(&name.to_lowercase()),
            None => true,
        })
        .flat_map(|(_, results)| results.iter())
        .filter(|f| match &impacts {
            Some(levels) => levels.contains(&f.impact.to_lowercase()),
            None => true,
        })
        .filter(|f| match &confidences {
            Some(levels) => levels.contains(&f.confidence.to_lowercase()),
            None => true,
        })
        .collect()
}

/// Findings of one detector by exact name.
pub fn findings_for<'a>(facts: &'a ProjectFacts, detector: &str) -> ResolveResult<&'a [Finding]> {
    facts
        .detector_results()
        .get(detector)
        .map(Vec::as_slice)
        .ok_or_else(|| ResolveError::DetectorNotFound(detector.to_string()))
}
