//! Error types and error code constants for solfact.
//!
//! Each subsystem owns its error enum (`IngestError` in `facts`,
//! `ArtifactError` in `artifacts`, `SearchError` in `search`); this module
//! provides the resolver error type shared by the query operations plus a
//! unified [`SolfactError`] that bridges every subsystem error into a common
//! shape a dispatch layer can map to caller-visible envelopes.
//!
//! ## Propagation policy
//!
//! Resolver operations never fail for structurally recoverable situations —
//! missing call-site hints, inheritance cycles, ambiguous multi-results all
//! degrade to partial results with explicit markers. They do fail for
//! programmer-error inputs (unknown keys) and I/O-class problems, and those
//! failures are typed so callers can branch on kind rather than parse
//! message strings.

use std::fmt;

use thiserror::Error;

use crate::artifacts::ArtifactError;
use crate::facts::IngestError;
use crate::keys::{ContractKey, FunctionKey};
use crate::search::SearchError;

// ============================================================================
// Error Codes
// ============================================================================

/// Stable numeric codes for machine consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    /// Malformed request from the caller.
    InvalidArguments = 2,
    /// Key absent from the fact store, or ambiguous without context.
    ResolutionError = 3,
    /// Malformed analyzer output rejected at ingestion.
    IngestError = 4,
    /// Artifact cache read/write failure.
    ArtifactError = 6,
    /// The external analyzer invocation failed.
    AnalysisError = 7,
    /// Bug or unexpected state.
    InternalError = 10,
}

impl ErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Resolver Errors
// ============================================================================

/// Errors from the query operations (inheritance, call graph, detectors).
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Contract key absent from the fact store.
    #[error("contract not found: '{0}'")]
    ContractNotFound(ContractKey),

    /// Function signature absent from the named contract (declared and
    /// inherited sets both checked).
    #[error("function '{signature}' not found in contract '{contract}'")]
    FunctionNotFound {
        contract: ContractKey,
        signature: String,
    },

    /// Bare signature matched no declared function anywhere in the project.
    #[error("no contract declares function '{signature}'")]
    SignatureNotFound { signature: String },

    /// Bare signature matched several unrelated declarations and no calling
    /// context was given to pick one. All candidates are reported.
    #[error("signature '{signature}' is ambiguous ({} candidates)", candidates.len())]
    AmbiguousSignature {
        signature: String,
        candidates: Vec<FunctionKey>,
    },

    /// Detector name absent from the store.
    #[error("detector not found: '{0}'")]
    DetectorNotFound(String),
}

/// Result type for resolver operations.
pub type ResolveResult<T> = Result<T, ResolveError>;

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error for callers that do not want to handle subsystem errors
/// individually (e.g. a dispatch layer building failure envelopes).
#[derive(Debug, Error)]
pub enum SolfactError {
    /// Resolver failure.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Ingestion failure.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Artifact cache failure.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// Invalid search pattern.
    #[error(transparent)]
    Search(#[from] SearchError),

    /// The external analyzer failed to produce facts.
    #[error("analysis failed: {message}")]
    Analysis { message: String },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl SolfactError {
    /// Wrap an external analyzer failure.
    pub fn analysis(message: impl Into<String>) -> Self {
        SolfactError::Analysis {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        SolfactError::Internal {
            message: message.into(),
        }
    }

    /// Get the stable error code for this error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            SolfactError::Resolve(_) => ErrorCode::ResolutionError,
            SolfactError::Ingest(_) => ErrorCode::IngestError,
            SolfactError::Artifact(_) => ErrorCode::ArtifactError,
            SolfactError::Search(_) => ErrorCode::InvalidArguments,
            SolfactError::Analysis { .. } => ErrorCode::AnalysisError,
            SolfactError::Internal { .. } => ErrorCode::InternalError,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod error_code_mapping {
        use super::*;

        #[test]
        fn resolve_errors_map_to_resolution_code() {
            let err: SolfactError =
                ResolveError::ContractNotFound(ContractKey::new("Token", "src/Token.sol")).into();
            assert_eq!(err.error_code(), ErrorCode::ResolutionError);
            assert_eq!(err.error_code().code(), 3);
        }

        #[test]
        fn search_errors_map_to_invalid_arguments() {
            let err: SolfactError = SearchError::InvalidPattern {
                message: "unclosed group".to_string(),
            }
            .into();
            assert_eq!(err.error_code(), ErrorCode::InvalidArguments);
        }

        #[test]
        fn analysis_error_maps_to_analysis_code() {
            let err = SolfactError::analysis("solc compilation failed");
            assert_eq!(err.error_code().code(), 7);
        }

        #[test]
        fn code_values_are_stable() {
            assert_eq!(ErrorCode::InvalidArguments.code(), 2);
            assert_eq!(ErrorCode::ResolutionError.code(), 3);
            assert_eq!(ErrorCode::IngestError.code(), 4);
            assert_eq!(ErrorCode::ArtifactError.code(), 6);
            assert_eq!(ErrorCode::InternalError.code(), 10);
        }
    }

    mod error_display {
        use super::*;

        #[test]
        fn contract_not_found_display() {
            let err = ResolveError::ContractNotFound(ContractKey::new("Vault", "src/Vault.sol"));
            assert_eq!(err.to_string(), "contract not found: 'Vault@src!Vault.sol'");
        }

        #[test]
        fn ambiguous_signature_counts_candidates() {
            let err = ResolveError::AmbiguousSignature {
                signature: "foo()".to_string(),
                candidates: vec![
                    FunctionKey::new(ContractKey::new("A", "src/A.sol"), "foo()"),
                    FunctionKey::new(ContractKey::new("B", "src/B.sol"), "foo()"),
                ],
            };
            assert_eq!(err.to_string(), "signature 'foo()' is ambiguous (2 candidates)");
        }
    }
}
