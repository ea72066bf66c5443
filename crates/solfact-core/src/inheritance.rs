//! Inheritance hierarchy resolver: ancestor and descendant trees.
//!
//! Both directions materialize lazily, on demand, as recursive trees over
//! the frozen fact store:
//!
//! - [`ancestors`] follows `direct_parents` upward
//! - [`descendants`] follows the prebuilt reverse adjacency index downward
//!
//! # Cycle handling
//!
//! Some source ecosystems tolerate or mis-declare circular inheritance, so a
//! cycle is a recoverable anomaly, never an error: traversal carries a
//! visited set along the **current path** (cloned per branch), and a contract
//! that reappears on its own path is emitted once as a terminal node with
//! `cycle = true`.
//!
//! Diamond inheritance is deliberately not deduplicated across branches —
//! the query has tree-of-paths semantics, and each path through a diamond is
//! expanded independently. Per-path cycle detection keeps that bounded by
//! the number of distinct contracts.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::error::{ResolveError, ResolveResult};
use crate::facts::ProjectFacts;
use crate::keys::ContractKey;

// ============================================================================
// Tree Nodes
// ============================================================================

/// A node in an ancestor tree. Children are the node's direct parents,
/// recursively expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AncestorNode {
    pub key: ContractKey,
    /// Direct parents, in declaration order.
    pub parents: Vec<AncestorNode>,
    /// True when this contract reappeared on its own ancestor path and
    /// expansion stopped here.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cycle: bool,
}

/// A node in a descendant tree. Children are the contracts that directly
/// inherit from this one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescendantNode {
    pub key: ContractKey,
    pub children: Vec<DescendantNode>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cycle: bool,
}

/// Result of a descendant query: the tree plus whether any branch was cut
/// off by the depth limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescendantTree {
    pub root: DescendantNode,
    pub truncated: bool,
}

// ============================================================================
// Ancestors
// ============================================================================

/// Build the ancestor tree for a contract.
///
/// Fails with [`ResolveError::ContractNotFound`] only when the root key is
/// absent; a parent reference that does not resolve terminates its branch as
/// a leaf, since partial hierarchies are common in projects with unresolved
/// imports.
pub fn ancestors(facts: &ProjectFacts, key: &ContractKey) -> ResolveResult<AncestorNode> {
    if facts.contract(key).is_none() {
        return Err(ResolveError::ContractNotFound(key.clone()));
    }
    Ok(expand_ancestors(facts, key, HashSet::new()))
}

fn expand_ancestors(
    facts: &ProjectFacts,
    key: &ContractKey,
    mut visited: HashSet<ContractKey>,
) -> AncestorNode {
    if visited.contains(key) {
        return AncestorNode {
            key: key.clone(),
            parents: Vec::new(),
            cycle: true,
        };
    }
    visited.insert(key.clone());

    let parents = match facts.contract(key) {
        Some(contract) => contract
            .direct_parents
            .iter()
            // Each branch gets its own copy of the path set: diamonds expand
            // on every path, cycles stop on their own path only.
            .map(|parent| expand_ancestors(facts, parent, visited.clone()))
            .collect(),
        None => Vec::new(),
    };

    AncestorNode {
        key: key.clone(),
        parents,
        cycle: false,
    }
}

// ============================================================================
// Descendants
// ============================================================================

/// Build the descendant tree for a contract, optionally bounded by
/// `max_depth` levels below the root.
///
/// When the limit cuts off non-empty subtrees the result is flagged
/// `truncated` so callers can distinguish a genuine leaf from a clipped one.
pub fn descendants(
    facts: &ProjectFacts,
    key: &ContractKey,
    max_depth: Option<usize>,
) -> ResolveResult<DescendantTree> {
    if facts.contract(key).is_none() {
        return Err(ResolveError::ContractNotFound(key.clone()));
    }
    let mut truncated = false;
    let root = expand_descendants(facts, key, HashSet::new(), 0, max_depth, &mut truncated);
    Ok(DescendantTree { root, truncated })
}

fn expand_descendants(
    facts: &ProjectFacts,
    key: &ContractKey,
    mut visited: HashSet<ContractKey>,
    depth: usize,
    max_depth: Option<usize>,
    truncated: &mut bool,
) -> DescendantNode {
    if visited.contains(key) {
        return DescendantNode {
            key: key.clone(),
            children: Vec::new(),
            cycle: true,
        };
    }
    visited.insert(key.clone());

    let direct_children = facts.children_of(key);

    if let Some(limit) = max_depth {
        if depth >= limit {
            if !direct_children.is_empty() {
                *truncated = true;
            }
            return DescendantNode {
                key: key.clone(),
                children: Vec::new(),
                cycle: false,
            };
        }
    }

    let children = direct_children
        .iter()
        .map(|child| {
            expand_descendants(facts, child, visited.clone(), depth + 1, max_depth, truncated)
        })
        .collect();

    DescendantNode {
        key: key.clone(),
        children,
        cycle: false,
    }
}

// ============================================================================
// Flat Ancestor Set
// ============================================================================

/// The flat transitive ancestor set of a contract, sorted by key.
///
/// Unlike the tree queries this collapses diamonds: each ancestor appears
/// once regardless of how many paths reach it. Cycles are tolerated by the
/// same visited-set guard.
pub fn inherited_set(facts: &ProjectFacts, key: &ContractKey) -> ResolveResult<Vec<ContractKey>> {
    let root = facts
        .contract(key)
        .ok_or_else(|| ResolveError::ContractNotFound(key.clone()))?;

    let mut seen: BTreeSet<ContractKey> = BTreeSet::new();
    let mut stack: Vec<ContractKey> = root.direct_parents.clone();
    while let Some(current) = stack.pop() {
        if current == *key || !seen.insert(current.clone()) {
            continue;
        }
        if let Some(contract) = facts.contract(&current) {
            stack.extend(contract.direct_parents.iter().cloned());
        }
    }
    Ok(seen.into_iter().collect())
}

// ============================================================================
// Tests
// ============================================================================
