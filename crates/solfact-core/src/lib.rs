//! Core fact graph for smart-contract analysis.
//!
//! This crate turns raw, per-contract facts from an external static
//! analyzer into a consistent, queryable fact graph:
//! - Identity keys for contracts and functions
//! - The immutable fact store with its derived indexes
//! - Inheritance resolution (ancestor/descendant trees)
//! - Call graph resolution (callees, callers, implementations)
//! - A schema-versioned artifact cache with lossless round-trip
//! - A project registry coordinating one-time construction per root
//!
//! The static analyzer itself and the transport layer exposing these
//! queries to callers are external collaborators; this crate is the library
//! they sit on.

pub mod artifacts;
pub mod callgraph;
pub mod constants;
pub mod detectors;
pub mod error;
pub mod facts;
pub mod inheritance;
pub mod keys;
pub mod pagination;
pub mod registry;
pub mod search;

pub use artifacts::{ArtifactCache, ArtifactError};
pub use callgraph::{callees, callers, implementations, Callees, Callers};
pub use error::{ErrorCode, ResolveError, SolfactError};
pub use facts::{
    ContractFact, Finding, FunctionFact, IngestError, ProjectFacts, ProjectFactsBuilder,
};
pub use inheritance::{ancestors, descendants, inherited_set, AncestorNode, DescendantTree};
pub use keys::{ContractKey, FunctionKey};
pub use registry::ProjectRegistry;
