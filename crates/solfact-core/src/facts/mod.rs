//! Fact store: normalized contract/function fact tables and indexes.
//!
//! This module provides the semantic data model for solfact:
//! - [`ContractFact`]: per-contract record (flags, parents, declared and
//!   inherited functions)
//! - [`FunctionFact`]: per-function record (visibility, mutability, call
//!   sites, source span)
//! - [`Finding`] / [`DetectorMetadata`]: security findings and the detectors
//!   that produced them
//! - [`ProjectFacts`]: the aggregate root holding everything for one project
//!
//! [`ProjectFacts`] provides in-memory storage with:
//! - `BTreeMap` primary tables for deterministic iteration
//! - Derived indexes for O(1) lookups (function → owning contract, contract →
//!   direct children, normalized target signature → callers)
//!
//! The store is built exactly once per analyzed project — either through
//! [`ProjectFactsBuilder`] from raw analyzer records, or by the artifact
//! cache on reload — and is read-only thereafter. All resolver queries take
//! `&self`.
//!
//! # Schema Versioning
//!
//! [`FACTS_SCHEMA_VERSION`] tracks breaking changes to the serialized store.
//! The artifact envelope carries its own version on top of this; see the
//! `artifacts` module.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keys::{normalize_signature, split_qualified, ContractKey, FunctionKey};

// ============================================================================
// Schema Version
// ============================================================================

/// Schema version for the serialized fact store.
///
/// Increment when adding/removing fields from serialized structs, changing
/// field types, or making breaking changes to enum variants.
pub const FACTS_SCHEMA_VERSION: u32 = 1;

// ============================================================================
// Enums
// ============================================================================

/// Function or state-variable visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    External,
    Internal,
    Private,
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Visibility::Public => "public",
            Visibility::External => "external",
            Visibility::Internal => "internal",
            Visibility::Private => "private",
        };
        write!(f, "{}", s)
    }
}

/// Classification of a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    /// Same-contract or inherited call.
    Internal,
    /// Cross-contract call through a typed reference.
    External,
    /// Call into a library.
    Library,
    /// Raw address dispatch the analyzer could not type.
    LowLevel,
}

// ============================================================================
// Source Spans
// ============================================================================

/// A line span in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    /// Workspace-relative file path.
    pub path: String,
    /// First line (1-indexed).
    pub line_start: u32,
    /// Last line (1-indexed, inclusive).
    pub line_end: u32,
}

impl SourceSpan {
    /// Create a new span.
    pub fn new(path: impl Into<String>, line_start: u32, line_end: u32) -> Self {
        SourceSpan {
            path: path.into(),
            line_start,
            line_end,
        }
    }
}

// ============================================================================
// Call Sites
// ============================================================================

/// One statically observed call expression inside a function body.
///
/// `target_contract` may be absent when the analyzer could not resolve the
/// receiver type; the call graph resolver handles that case rather than
/// ingestion rejecting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    /// Target signature, bare (`foo()`) or contract-qualified (`Lib.foo()`).
    pub target_signature: String,
    /// Receiver contract when statically resolved.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target_contract: Option<ContractKey>,
    /// Call classification.
    pub kind: CallKind,
}

impl CallSite {
    /// The signature without any contract qualifier.
    pub fn bare_signature(&self) -> &str {
        split_qualified(&self.target_signature)
            .map(|(_, sig)| sig)
            .unwrap_or(&self.target_signature)
    }

    /// Best-effort qualified form used in callee listings and the caller
    /// index: the explicit hint wins, then an existing qualifier on the
    /// target string, then the bare signature.
    pub fn qualified_target(&self) -> String {
        if let Some(hint) = &self.target_contract {
            return format!("{}.{}", hint.name, self.bare_signature());
        }
        self.target_signature.clone()
    }
}

// ============================================================================
// State Variables and Events
// ============================================================================

/// A state variable declared by a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateVariable {
    pub name: String,
    /// Declared type as a string (`uint256`, `mapping(address => uint256)`).
    pub type_name: String,
    pub visibility: Visibility,
    pub is_constant: bool,
    pub is_immutable: bool,
    /// Declaration line when known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub line: Option<u32>,
}

/// A parameter of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventParam {
    pub name: String,
    pub type_name: String,
    pub indexed: bool,
}

/// An event declared by a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFact {
    pub name: String,
    pub parameters: Vec<EventParam>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub line: Option<u32>,
}

// ============================================================================
// Detectors and Findings
// ============================================================================

/// Metadata about an available detector in the external analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorMetadata {
    /// Detector identifier (e.g. `reentrancy-eth`).
    pub name: String,
    /// What the detector checks for.
    pub description: String,
    /// Impact level: High, Medium, Low, or Informational.
    pub impact: String,
    /// Confidence level: High, Medium, or Low.
    pub confidence: String,
}

/// One finding produced by a detector run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Name of the detector that produced this finding.
    pub detector: String,
    /// Short description of what was checked.
    pub check: String,
    pub impact: String,
    pub confidence: String,
    /// Detailed description of the finding.
    pub description: String,
    /// Source locations related to this finding.
    pub locations: Vec<SourceSpan>,
}

// ============================================================================
// Function Facts
// ============================================================================

/// Per-function record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionFact {
    pub key: FunctionKey,
    pub visibility: Visibility,
    #[serde(default)]
    pub is_view: bool,
    #[serde(default)]
    pub is_pure: bool,
    #[serde(default)]
    pub is_payable: bool,
    #[serde(default)]
    pub is_constructor: bool,
    #[serde(default)]
    pub is_virtual: bool,
    /// Custom modifiers decorating the function (by name).
    #[serde(default)]
    pub modifiers: Vec<String>,
    /// Parameter types in declaration order.
    #[serde(default)]
    pub parameters: Vec<String>,
    /// Return types in declaration order.
    #[serde(default)]
    pub returns: Vec<String>,
    /// Raw call sites observed in the body.
    #[serde(default)]
    pub call_sites: Vec<CallSite>,
    pub location: SourceSpan,
}

// ============================================================================
// Contract Facts
// ============================================================================

/// Per-contract record.
///
/// `direct_parents` and `declared_functions` preserve declaration order,
/// which is significant for parent linearization and for stable listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractFact {
    pub key: ContractKey,
    pub is_abstract: bool,
    pub is_interface: bool,
    pub is_library: bool,
    pub is_fully_implemented: bool,
    /// Direct parents in declaration order.
    #[serde(default)]
    pub direct_parents: Vec<ContractKey>,
    /// Functions declared by this contract, in declaration order.
    #[serde(default)]
    pub declared_functions: Vec<FunctionKey>,
    /// Functions reachable through inheritance, keyed by their declaring
    /// contract.
    #[serde(default)]
    pub inherited_functions: Vec<FunctionKey>,
    #[serde(default)]
    pub state_variables: Vec<StateVariable>,
    #[serde(default)]
    pub events: Vec<EventFact>,
}

impl ContractFact {
    /// Whether this contract declares or inherits `signature`, using exact
    /// match first and normalized matching as a fallback.
    pub fn contains_signature(&self, signature: &str) -> bool {
        self.find_signature(signature).is_some()
    }

    /// Find the [`FunctionKey`] matching `signature` among declared functions
    /// first, then inherited ones. Exact match wins over normalized match.
    pub fn find_signature(&self, signature: &str) -> Option<&FunctionKey> {
        let exact = self
            .declared_functions
            .iter()
            .find(|k| k.signature == signature)
            .or_else(|| {
                self.inherited_functions
                    .iter()
                    .find(|k| k.signature == signature)
            });
        if exact.is_some() {
            return exact;
        }

        let normalized = normalize_signature(signature);
        self.declared_functions
            .iter()
            .find(|k| normalize_signature(&k.signature) == normalized)
            .or_else(|| {
                self.inherited_functions
                    .iter()
                    .find(|k| normalize_signature(&k.signature) == normalized)
            })
    }

    /// Find the declared [`FunctionKey`] matching `signature`, ignoring
    /// inherited functions.
    pub fn find_declared_signature(&self, signature: &str) -> Option<&FunctionKey> {
        let exact = self
            .declared_functions
            .iter()
            .find(|k| k.signature == signature);
        if exact.is_some() {
            return exact;
        }
        let normalized = normalize_signature(signature);
        self.declared_functions
            .iter()
            .find(|k| normalize_signature(&k.signature) == normalized)
    }
}

// ============================================================================
// Project Facts (Aggregate Root)
// ============================================================================

/// The immutable fact graph for one analyzed project.
///
/// Primary tables are `BTreeMap` for deterministic iteration. Derived
/// indexes are not serialized; they are rebuilt after construction and after
/// every cache load, so round-trip equality is defined over the primary
/// tables alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectFacts {
    /// Schema version, set to [`FACTS_SCHEMA_VERSION`] on construction and
    /// checked on artifact load.
    pub schema_version: u32,
    /// Absolute path of the analyzed project root.
    project_root: String,

    // Primary storage
    contracts: BTreeMap<ContractKey, ContractFact>,
    functions: BTreeMap<FunctionKey, FunctionFact>,
    detector_results: BTreeMap<String, Vec<Finding>>,
    available_detectors: Vec<DetectorMetadata>,

    // Derived indexes (rebuilt, never serialized)
    /// function → declaring contract; exactly the union of every contract's
    /// `declared_functions`.
    #[serde(skip)]
    functions_to_contract: HashMap<FunctionKey, ContractKey>,
    /// contract → direct children (reverse of `direct_parents`), each list
    /// sorted for determinism.
    #[serde(skip)]
    children_of: HashMap<ContractKey, Vec<ContractKey>>,
    /// normalized qualified target signature → callers, sorted and
    /// deduplicated. Low-level sites carry no usable target and are not
    /// indexed.
    #[serde(skip)]
    callers_of: HashMap<String, Vec<(FunctionKey, CallKind)>>,
}

impl ProjectFacts {
    /// Project root this store was built for.
    pub fn project_root(&self) -> &str {
        &self.project_root
    }

    /// All contracts, in key order.
    pub fn contracts(&self) -> &BTreeMap<ContractKey, ContractFact> {
        &self.contracts
    }

    /// All functions, in key order.
    pub fn functions(&self) -> &BTreeMap<FunctionKey, FunctionFact> {
        &self.functions
    }

    /// Findings grouped by detector name.
    pub fn detector_results(&self) -> &BTreeMap<String, Vec<Finding>> {
        &self.detector_results
    }

    /// Metadata for every detector the analyzer exposes.
    pub fn available_detectors(&self) -> &[DetectorMetadata] {
        &self.available_detectors
    }

    /// Look up a contract fact.
    pub fn contract(&self, key: &ContractKey) -> Option<&ContractFact> {
        self.contracts.get(key)
    }

    /// Look up a function fact.
    pub fn function(&self, key: &FunctionKey) -> Option<&FunctionFact> {
        self.functions.get(key)
    }

    /// Declaring contract of a function, via the denormalized index.
    pub fn owner_of(&self, key: &FunctionKey) -> Option<&ContractKey> {
        self.functions_to_contract.get(key)
    }

    /// Direct children of a contract (contracts listing it as a parent).
    pub fn children_of(&self, key: &ContractKey) -> &[ContractKey] {
        self.children_of.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Callers of a normalized qualified target signature.
    pub fn callers_of(&self, normalized_target: &str) -> &[(FunctionKey, CallKind)] {
        self.callers_of
            .get(normalized_target)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Resolve the contract that actually provides `bare_signature` when
    /// reached from `context`: the context itself if it declares the
    /// signature, otherwise the declaring contract of a matching inherited
    /// function.
    pub fn resolve_internal_target(
        &self,
        context: &ContractKey,
        bare_signature: &str,
    ) -> Option<ContractKey> {
        let contract = self.contracts.get(context)?;
        if contract.find_declared_signature(bare_signature).is_some() {
            return Some(context.clone());
        }
        let normalized = normalize_signature(bare_signature);
        contract
            .inherited_functions
            .iter()
            .find(|k| {
                k.signature == bare_signature || normalize_signature(&k.signature) == normalized
            })
            .map(|k| k.contract.clone())
    }

    /// Rebuild every derived index from the primary tables.
    ///
    /// Called by the builder and after artifact load. Deterministic: the
    /// same primary tables always produce the same indexes.
    pub(crate) fn rebuild_indexes(&mut self) {
        self.functions_to_contract.clear();
        self.children_of.clear();
        self.callers_of.clear();

        for (key, contract) in &self.contracts {
            for fkey in &contract.declared_functions {
                self.functions_to_contract
                    .insert(fkey.clone(), key.clone());
            }
            for parent in &contract.direct_parents {
                self.children_of
                    .entry(parent.clone())
                    .or_default()
                    .push(key.clone());
            }
        }
        for children in self.children_of.values_mut() {
            children.sort();
            children.dedup();
        }

        for (fkey, fact) in &self.functions {
            for site in &fact.call_sites {
                let Some(target) = Self::index_target(&self.contracts, fkey, site) else {
                    continue;
                };
                self.callers_of
                    .entry(target)
                    .or_default()
                    .push((fkey.clone(), site.kind));
            }
        }
        for callers in self.callers_of.values_mut() {
            callers.sort();
            callers.dedup();
        }

        tracing::debug!(
            contracts = self.contracts.len(),
            functions = self.functions.len(),
            "rebuilt fact store indexes"
        );
    }

    /// Index key for one call site: the normalized qualified target, with
    /// unhinted internal calls resolved against the caller's own contract.
    fn index_target(
        contracts: &BTreeMap<ContractKey, ContractFact>,
        caller: &FunctionKey,
        site: &CallSite,
    ) -> Option<String> {
        match site.kind {
            CallKind::LowLevel => None,
            CallKind::Internal if site.target_contract.is_none() => {
                let bare = site.bare_signature();
                if split_qualified(&site.target_signature).is_some() {
                    return Some(normalize_signature(&site.target_signature));
                }
                let contract = contracts.get(&caller.contract)?;
                let resolved = if contract.find_declared_signature(bare).is_some() {
                    caller.contract.name.clone()
                } else {
                    let normalized = normalize_signature(bare);
                    contract
                        .inherited_functions
                        .iter()
                        .find(|k| normalize_signature(&k.signature) == normalized)
                        .map(|k| k.contract.name.clone())?
                };
                Some(normalize_signature(&format!("{}.{}", resolved, bare)))
            }
            _ => Some(normalize_signature(&site.qualified_target())),
        }
    }
}

/// Structural equality over the primary tables only. Derived indexes are a
/// deterministic function of those tables, so comparing them would be
/// redundant (and they are empty right after deserialization).
impl PartialEq for ProjectFacts {
    fn eq(&self, other: &Self) -> bool {
        self.schema_version == other.schema_version
            && self.project_root == other.project_root
            && self.contracts == other.contracts
            && self.functions == other.functions
            && self.detector_results == other.detector_results
            && self.available_detectors == other.available_detectors
    }
}

impl Eq for ProjectFacts {}

// ============================================================================
// Raw Analyzer Records
// ============================================================================

/// Reference to a contract in analyzer-native form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawContractRef {
    pub name: String,
    pub path: String,
}

impl RawContractRef {
    fn to_key(&self) -> ContractKey {
        ContractKey::new(&self.name, &self.path)
    }
}

/// One call expression as reported by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCallSite {
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target_contract: Option<RawContractRef>,
    pub kind: CallKind,
}

/// One function as reported by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFunction {
    pub signature: String,
    pub visibility: Visibility,
    #[serde(default)]
    pub is_view: bool,
    #[serde(default)]
    pub is_pure: bool,
    #[serde(default)]
    pub is_payable: bool,
    #[serde(default)]
    pub is_constructor: bool,
    #[serde(default)]
    pub is_virtual: bool,
    #[serde(default)]
    pub modifiers: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub returns: Vec<String>,
    pub line_start: u32,
    pub line_end: u32,
    #[serde(default)]
    pub call_sites: Vec<RawCallSite>,
}

/// A function reachable by inheritance, pointing at its declaring contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawInheritedFunction {
    pub signature: String,
    pub declared_in: RawContractRef,
}

/// One contract as reported by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawContract {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub is_interface: bool,
    #[serde(default)]
    pub is_library: bool,
    #[serde(default = "default_true")]
    pub is_fully_implemented: bool,
    #[serde(default)]
    pub parents: Vec<RawContractRef>,
    #[serde(default)]
    pub functions: Vec<RawFunction>,
    #[serde(default)]
    pub inherited: Vec<RawInheritedFunction>,
    #[serde(default)]
    pub state_variables: Vec<StateVariable>,
    #[serde(default)]
    pub events: Vec<EventFact>,
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Ingestion Errors
// ============================================================================

/// Errors produced while mapping raw analyzer records into the fact store.
///
/// These are a distinct class from resolver errors: they indicate malformed
/// analyzer output, not a bad query.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Two contracts mapped to the same key.
    #[error("duplicate contract key: {key}")]
    DuplicateContract { key: ContractKey },

    /// A contract declared the same signature twice.
    #[error("duplicate function '{signature}' in contract {contract}")]
    DuplicateFunction {
        contract: ContractKey,
        signature: String,
    },

    /// A contract record without a name.
    #[error("contract record without a name (path: {path})")]
    MissingContractName { path: String },

    /// A function record without a signature.
    #[error("function record without a signature in contract {contract}")]
    MissingSignature { contract: ContractKey },
}

/// Result type for ingestion.
pub type IngestResult<T> = Result<T, IngestError>;

// ============================================================================
// Builder
// ============================================================================

/// Validated ingestion of raw analyzer records into a [`ProjectFacts`].
///
/// The builder is the only way to construct a store from analyzer output.
/// Call-site hints that do not resolve to a known contract are kept as-is;
/// partial information is tolerated, structural errors are not.
#[derive(Debug)]
pub struct ProjectFactsBuilder {
    project_root: String,
    contracts: BTreeMap<ContractKey, ContractFact>,
    functions: BTreeMap<FunctionKey, FunctionFact>,
    detector_results: BTreeMap<String, Vec<Finding>>,
    available_detectors: Vec<DetectorMetadata>,
}

impl ProjectFactsBuilder {
    /// Start a builder for the given project root.
    pub fn new(project_root: impl Into<String>) -> Self {
        ProjectFactsBuilder {
            project_root: project_root.into(),
            contracts: BTreeMap::new(),
            functions: BTreeMap::new(),
            detector_results: BTreeMap::new(),
            available_detectors: Vec::new(),
        }
    }

    /// Ingest one raw contract record, validating and mapping it into the
    /// fact tables.
    pub fn ingest_contract(&mut self, raw: RawContract) -> IngestResult<ContractKey> {
        if raw.name.is_empty() {
            return Err(IngestError::MissingContractName { path: raw.path });
        }
        let key = ContractKey::new(&raw.name, &raw.path);
        if self.contracts.contains_key(&key) {
            return Err(IngestError::DuplicateContract { key });
        }

        let mut declared = Vec::with_capacity(raw.functions.len());
        for func in raw.functions {
            if func.signature.is_empty() {
                return Err(IngestError::MissingSignature {
                    contract: key.clone(),
                });
            }
            let fkey = FunctionKey::new(key.clone(), &func.signature);
            if self.functions.contains_key(&fkey) {
                return Err(IngestError::DuplicateFunction {
                    contract: key.clone(),
                    signature: func.signature,
                });
            }
            let call_sites = func
                .call_sites
                .into_iter()
                .map(|site| CallSite {
                    target_signature: site.target,
                    target_contract: site.target_contract.as_ref().map(RawContractRef::to_key),
                    kind: site.kind,
                })
                .collect();
            let fact = FunctionFact {
                key: fkey.clone(),
                visibility: func.visibility,
                is_view: func.is_view,
                is_pure: func.is_pure,
                is_payable: func.is_payable,
                is_constructor: func.is_constructor,
                is_virtual: func.is_virtual,
                modifiers: func.modifiers,
                parameters: func.parameters,
                returns: func.returns,
                call_sites,
                location: SourceSpan::new(&key.path, func.line_start, func.line_end),
            };
            declared.push(fkey.clone());
            self.functions.insert(fkey, fact);
        }

        let inherited = raw
            .inherited
            .into_iter()
            .map(|f| FunctionKey::new(f.declared_in.to_key(), f.signature))
            .collect();

        let fact = ContractFact {
            key: key.clone(),
            is_abstract: raw.is_abstract,
            is_interface: raw.is_interface,
            is_library: raw.is_library,
            is_fully_implemented: raw.is_fully_implemented,
            direct_parents: raw.parents.iter().map(RawContractRef::to_key).collect(),
            declared_functions: declared,
            inherited_functions: inherited,
            state_variables: raw.state_variables,
            events: raw.events,
        };
        self.contracts.insert(key.clone(), fact);
        Ok(key)
    }

    /// Record the detector catalog reported by the analyzer.
    pub fn set_available_detectors(&mut self, detectors: Vec<DetectorMetadata>) {
        self.available_detectors = detectors;
    }

    /// Record findings for one detector. Findings for the same detector
    /// accumulate in arrival order.
    pub fn record_findings(&mut self, detector: impl Into<String>, findings: Vec<Finding>) {
        self.detector_results
            .entry(detector.into())
            .or_default()
            .extend(findings);
    }

    /// Finalize the store and build its derived indexes.
    pub fn finish(self) -> ProjectFacts {
        let mut facts = ProjectFacts {
            schema_version: FACTS_SCHEMA_VERSION,
            project_root: self.project_root,
            contracts: self.contracts,
            functions: self.functions,
            detector_results: self.detector_results,
            available_detectors: self.available_detectors,
            functions_to_contract: HashMap::new(),
            children_of: HashMap::new(),
            callers_of: HashMap::new(),
        };
        facts.rebuild_indexes();
        tracing::info!(
            project_root = %facts.project_root,
            contracts = facts.contracts.len(),
            "fact store built"
        );
        facts
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_function(signature: &str) -> RawFunction {
        RawFunction {
            signature: signature.to_string(),
            visibility: Visibility::Public,
            is_view: false,
            is_pure: false,
            is_payable: false,
            is_constructor: false,
            is_virtual: false,
            modifiers: vec![],
            parameters: vec![],
            returns: vec![],
            line_start: 1,
            line_end: 5,
            call_sites: vec![],
        }
    }

    fn raw_contract(name: &str, path: &str) -> RawContract {
        RawContract {
            name: name.to_string(),
            path: path.to_string(),
            is_abstract: false,
            is_interface: false,
            is_library: false,
            is_fully_implemented: true,
            parents: vec![],
            functions: vec![],
            inherited: vec![],
            state_variables: vec![],
            events: vec![],
        }
    }

    mod builder_tests {
        use super::*;

        #[test]
        fn duplicate_contract_key_is_an_error() {
            let mut builder = ProjectFactsBuilder::new("/proj");
            builder
                .ingest_contract(raw_contract("Token", "src/Token.sol"))
                .unwrap();
            let err = builder
                .ingest_contract(raw_contract("Token", "src/Token.sol"))
                .unwrap_err();
            assert!(matches!(err, IngestError::DuplicateContract { .. }));
        }

        #[test]
        fn same_name_different_path_is_not_a_duplicate() {
            let mut builder = ProjectFactsBuilder::new("/proj");
            builder
                .ingest_contract(raw_contract("Token", "src/a/Token.sol"))
                .unwrap();
            builder
                .ingest_contract(raw_contract("Token", "src/b/Token.sol"))
                .unwrap();
            assert_eq!(builder.finish().contracts().len(), 2);
        }

        #[test]
        fn missing_contract_name_is_an_error() {
            let mut builder = ProjectFactsBuilder::new("/proj");
            let err = builder
                .ingest_contract(raw_contract("", "src/Token.sol"))
                .unwrap_err();
            assert!(matches!(err, IngestError::MissingContractName { .. }));
        }

        #[test]
        fn duplicate_signature_in_contract_is_an_error() {
            let mut raw = raw_contract("Token", "src/Token.sol");
            raw.functions = vec![raw_function("foo()"), raw_function("foo()")];
            let mut builder = ProjectFactsBuilder::new("/proj");
            let err = builder.ingest_contract(raw).unwrap_err();
            assert!(matches!(err, IngestError::DuplicateFunction { .. }));
        }

        #[test]
        fn missing_signature_is_an_error() {
            let mut raw = raw_contract("Token", "src/Token.sol");
            raw.functions = vec![raw_function("")];
            let mut builder = ProjectFactsBuilder::new("/proj");
            let err = builder.ingest_contract(raw).unwrap_err();
            assert!(matches!(err, IngestError::MissingSignature { .. }));
        }

        #[test]
        fn declared_function_order_is_preserved() {
            let mut raw = raw_contract("Token", "src/Token.sol");
            raw.functions = vec![
                raw_function("zebra()"),
                raw_function("alpha()"),
                raw_function("mid()"),
            ];
            let mut builder = ProjectFactsBuilder::new("/proj");
            builder.ingest_contract(raw).unwrap();
            let facts = builder.finish();
            let key = ContractKey::new("Token", "src/Token.sol");
            let sigs: Vec<&str> = facts.contract(&key).unwrap().declared_functions
                .iter()
                .map(|k| k.signature.as_str())
                .collect();
            assert_eq!(sigs, vec!["zebra()", "alpha()", "mid()"]);
        }

        #[test]
        fn findings_accumulate_per_detector() {
            let mut builder = ProjectFactsBuilder::new("/proj");
            let finding = Finding {
                detector: "reentrancy-eth".to_string(),
                check: "reentrancy".to_string(),
                impact: "High".to_string(),
                confidence: "Medium".to_string(),
                description: "call before state update".to_string(),
                locations: vec![SourceSpan::new("src/Token.sol", 10, 20)],
            };
            builder.record_findings("reentrancy-eth", vec![finding.clone()]);
            builder.record_findings("reentrancy-eth", vec![finding]);
            let facts = builder.finish();
            assert_eq!(facts.detector_results()["reentrancy-eth"].len(), 2);
        }
    }

    mod index_tests {
        use super::*;

        fn diamond_facts() -> ProjectFacts {
            // Base <- Left, Base <- Right, {Left, Right} <- Child
            let mut builder = ProjectFactsBuilder::new("/proj");
            let mut base = raw_contract("Base", "src/Base.sol");
            base.functions = vec![raw_function("foo()")];
            builder.ingest_contract(base).unwrap();
            for name in ["Left", "Right"] {
                let mut c = raw_contract(name, &format!("src/{name}.sol"));
                c.parents = vec![RawContractRef {
                    name: "Base".to_string(),
                    path: "src/Base.sol".to_string(),
                }];
                builder.ingest_contract(c).unwrap();
            }
            let mut child = raw_contract("Child", "src/Child.sol");
            child.parents = vec![
                RawContractRef {
                    name: "Left".to_string(),
                    path: "src/Left.sol".to_string(),
                },
                RawContractRef {
                    name: "Right".to_string(),
                    path: "src/Right.sol".to_string(),
                },
            ];
            builder.ingest_contract(child).unwrap();
            builder.finish()
        }

        #[test]
        fn functions_to_contract_covers_declared_functions() {
            let facts = diamond_facts();
            let base = ContractKey::new("Base", "src/Base.sol");
            let foo = FunctionKey::new(base.clone(), "foo()");
            assert_eq!(facts.owner_of(&foo), Some(&base));
            let total: usize = facts
                .contracts()
                .values()
                .map(|c| c.declared_functions.len())
                .sum();
            assert_eq!(total, facts.functions().len());
        }

        #[test]
        fn children_index_inverts_direct_parents() {
            let facts = diamond_facts();
            let base = ContractKey::new("Base", "src/Base.sol");
            let children = facts.children_of(&base);
            assert_eq!(children.len(), 2);
            assert!(children.contains(&ContractKey::new("Left", "src/Left.sol")));
            assert!(children.contains(&ContractKey::new("Right", "src/Right.sol")));
        }

        #[test]
        fn children_index_is_sorted() {
            let facts = diamond_facts();
            let base = ContractKey::new("Base", "src/Base.sol");
            let children = facts.children_of(&base);
            let mut sorted = children.to_vec();
            sorted.sort();
            assert_eq!(children, sorted.as_slice());
        }

        #[test]
        fn caller_index_resolves_unhinted_internal_calls() {
            let mut builder = ProjectFactsBuilder::new("/proj");
            let mut base = raw_contract("Base", "src/Base.sol");
            base.functions = vec![raw_function("helper()")];
            builder.ingest_contract(base).unwrap();

            let mut derived = raw_contract("Derived", "src/Derived.sol");
            derived.parents = vec![RawContractRef {
                name: "Base".to_string(),
                path: "src/Base.sol".to_string(),
            }];
            derived.inherited = vec![RawInheritedFunction {
                signature: "helper()".to_string(),
                declared_in: RawContractRef {
                    name: "Base".to_string(),
                    path: "src/Base.sol".to_string(),
                },
            }];
            let mut caller = raw_function("entry()");
            caller.call_sites = vec![RawCallSite {
                target: "helper()".to_string(),
                target_contract: None,
                kind: CallKind::Internal,
            }];
            derived.functions = vec![caller];
            builder.ingest_contract(derived).unwrap();
            let facts = builder.finish();

            // The unhinted internal call resolves to the declaring contract.
            let callers = facts.callers_of("Base.helper()");
            assert_eq!(callers.len(), 1);
            assert_eq!(callers[0].0.signature, "entry()");
            assert_eq!(callers[0].1, CallKind::Internal);
        }

        #[test]
        fn caller_index_skips_low_level_sites() {
            let mut builder = ProjectFactsBuilder::new("/proj");
            let mut contract = raw_contract("Caller", "src/Caller.sol");
            let mut func = raw_function("send()");
            func.call_sites = vec![RawCallSite {
                target: "address.call(bytes)".to_string(),
                target_contract: None,
                kind: CallKind::LowLevel,
            }];
            contract.functions = vec![func];
            builder.ingest_contract(contract).unwrap();
            let facts = builder.finish();
            assert!(facts.callers_of("address.call(bytes)").is_empty());
        }
    }

    mod serde_tests {
        use super::*;

        #[test]
        fn store_round_trips_through_json() {
            let mut builder = ProjectFactsBuilder::new("/proj");
            let mut base = raw_contract("Base", "src/Base.sol");
            base.functions = vec![raw_function("foo()")];
            base.state_variables = vec![StateVariable {
                name: "owner".to_string(),
                type_name: "address".to_string(),
                visibility: Visibility::Private,
                is_constant: false,
                is_immutable: true,
                line: Some(4),
            }];
            builder.ingest_contract(base).unwrap();
            let facts = builder.finish();

            let json = serde_json::to_string(&facts).unwrap();
            let mut back: ProjectFacts = serde_json::from_str(&json).unwrap();
            back.rebuild_indexes();
            assert_eq!(back, facts);
            // Derived indexes come back too.
            let base_key = ContractKey::new("Base", "src/Base.sol");
            let foo = FunctionKey::new(base_key.clone(), "foo()");
            assert_eq!(back.owner_of(&foo), Some(&base_key));
        }

        #[test]
        fn call_kind_serializes_snake_case() {
            assert_eq!(
                serde_json::to_string(&CallKind::LowLevel).unwrap(),
                "\"low_level\""
            );
            assert_eq!(
                serde_json::to_string(&CallKind::Internal).unwrap(),
                "\"internal\""
            );
        }

        #[test]
        fn visibility_serializes_snake_case() {
            assert_eq!(
                serde_json::to_string(&Visibility::External).unwrap(),
                "\"external\""
            );
        }

        #[test]
        fn raw_contract_tolerates_missing_optional_fields() {
            let raw: RawContract = serde_json::from_str(
                r#"{"name":"Token","path":"src/Token.sol","functions":[
                    {"signature":"foo()","visibility":"public","line_start":1,"line_end":2}
                ]}"#,
            )
            .unwrap();
            assert_eq!(raw.functions.len(), 1);
            assert!(raw.is_fully_implemented);
            assert!(raw.parents.is_empty());
        }
    }
}
