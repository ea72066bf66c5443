//! Pattern search over contract and function names.

use regex::{Regex, RegexBuilder};
use thiserror::Error;

use crate::facts::ProjectFacts;
use crate::keys::{ContractKey, FunctionKey};

/// Errors from search pattern handling.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The pattern is not valid regex.
    #[error("invalid regex pattern: {message}")]
    InvalidPattern { message: String },
}

/// Compile a user-supplied regex pattern with explicit error mapping.
pub fn compile_pattern(pattern: &str, case_sensitive: bool) -> Result<Regex, SearchError> {
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| SearchError::InvalidPattern {
            message: e.to_string(),
        })
}

/// Contracts whose name matches the pattern, in key order.
pub fn search_contracts(facts: &ProjectFacts, pattern: &Regex) -> Vec<ContractKey> {
    facts
        .contracts()
        .keys()
        .filter(|key| pattern.is_match(&key.name))
        .cloned()
        .collect()
}

/// Functions whose bare or qualified signature matches the pattern, in key
/// order.
pub fn search_functions(facts: &ProjectFacts, pattern: &Regex) -> Vec<FunctionKey> {
    facts
        .functions()
        .keys()
        .filter(|key| {
            pattern.is_match(&key.signature) || pattern.is_match(&key.qualified_signature())
        })
        .cloned()
        .collect()
}
