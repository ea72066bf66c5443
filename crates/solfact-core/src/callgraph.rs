//! Call graph resolver: callees, callers, implementations.
//!
//! All three operations are pure read queries over the frozen fact store.
//! The forward direction ([`callees`]) partitions a function's raw call
//! sites by kind; the inverse ([`callers`]) answers from the inverted index
//! built at store construction; [`implementations`] scans declared
//! signatures, optionally restricted to a descendant subtree.
//!
//! # Override disambiguation
//!
//! The same signature reached through an inherited function may resolve to
//! different implementations depending on which concrete contract the call
//! travels through. The optional `calling_context` parameter names that
//! contract: internal call sites without a static receiver hint resolve
//! against the context's declared and inherited functions first, falling
//! back to the statically-declared owner.
//!
//! Unresolved targets are never dropped — they are reported by best-effort
//! signature string, because partial information is more useful to a caller
//! than a hard failure.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{ResolveError, ResolveResult};
use crate::facts::{CallKind, FunctionFact, ProjectFacts};
use crate::inheritance::descendants;
use crate::keys::{normalize_signature, split_qualified, ContractKey, FunctionKey};

// ============================================================================
// Results
// ============================================================================

/// Callees of one function, partitioned by call kind.
///
/// Every raw call site lands in exactly one of the three lists or, for
/// low-level sites, in the `has_low_level_calls` signal. Entries are
/// qualified signature strings (`Contract.sig(args)`), best-effort when the
/// analyzer could not type the receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Callees {
    pub internal: Vec<String>,
    pub external: Vec<String>,
    pub library: Vec<String>,
    /// True when any call site is a raw address dispatch the analyzer could
    /// not type. A warning signal, not an error.
    pub has_low_level_calls: bool,
}

/// Callers of one function, grouped by how they call it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Callers {
    pub internal: Vec<FunctionKey>,
    pub external: Vec<FunctionKey>,
    pub library: Vec<FunctionKey>,
}

// ============================================================================
// Function Resolution
// ============================================================================

/// Resolve a function key against the store: the owning contract's declared
/// functions first, then its inherited set, exact signature match before
/// normalized match.
///
/// Returns the fact of the resolved function, which for an inherited
/// signature is declared by an ancestor contract.
pub fn resolve_function<'a>(
    facts: &'a ProjectFacts,
    key: &FunctionKey,
) -> ResolveResult<&'a FunctionFact> {
    let contract = facts
        .contract(&key.contract)
        .ok_or_else(|| ResolveError::ContractNotFound(key.contract.clone()))?;

    let resolved = contract.find_signature(&key.signature).ok_or_else(|| {
        ResolveError::FunctionNotFound {
            contract: key.contract.clone(),
            signature: key.signature.clone(),
        }
    })?;

    facts
        .function(resolved)
        .ok_or_else(|| ResolveError::FunctionNotFound {
            contract: resolved.contract.clone(),
            signature: resolved.signature.clone(),
        })
}

/// Resolve a bare signature project-wide without a calling context.
///
/// Exactly one declaration: returns it. None: [`ResolveError::SignatureNotFound`].
/// Several unrelated declarations: [`ResolveError::AmbiguousSignature`] with
/// every candidate, so the caller can retry with a context instead of this
/// module guessing a collapse.
pub fn lookup_signature<'a>(
    facts: &'a ProjectFacts,
    signature: &str,
) -> ResolveResult<&'a FunctionFact> {
    let normalized = normalize_signature(signature);
    let candidates: Vec<&FunctionKey> = facts
        .functions()
        .keys()
        .filter(|k| {
            k.signature == signature || normalize_signature(&k.signature) == normalized
        })
        .collect();

    match candidates.as_slice() {
        [] => Err(ResolveError::SignatureNotFound {
            signature: signature.to_string(),
        }),
        [single] => facts
            .function(single)
            .ok_or_else(|| ResolveError::SignatureNotFound {
                signature: signature.to_string(),
            }),
        _ => Err(ResolveError::AmbiguousSignature {
            signature: signature.to_string(),
            candidates: candidates.into_iter().cloned().collect(),
        }),
    }
}

// ============================================================================
// Callees
// ============================================================================

/// List the callees of a function, partitioned into internal, external, and
/// library calls.
///
/// `calling_context` disambiguates override resolution when the function is
/// reached through inheritance; without it, unhinted internal sites resolve
/// against the statically-declared owning contract.
pub fn callees(
    facts: &ProjectFacts,
    key: &FunctionKey,
    calling_context: Option<&ContractKey>,
) -> ResolveResult<Callees> {
    let fact = resolve_function(facts, key)?;

    let mut internal = Vec::new();
    let mut external = Vec::new();
    let mut library = Vec::new();
    let mut has_low_level_calls = false;

    for site in &fact.call_sites {
        match site.kind {
            CallKind::LowLevel => has_low_level_calls = true,
            CallKind::External => external.push(site.qualified_target()),
            CallKind::Library => library.push(site.qualified_target()),
            CallKind::Internal => {
                internal.push(resolve_internal_site(facts, &fact.key, site, calling_context));
            }
        }
    }

    Ok(Callees {
        internal,
        external,
        library,
        has_low_level_calls,
    })
}

/// Qualified form of an internal call site.
///
/// Hinted or already-qualified targets are taken as-is. Unhinted bare
/// targets resolve through the calling context when it provides the
/// signature, then through the statically-declared owner; if neither knows
/// the signature the bare string is reported as-is.
fn resolve_internal_site(
    facts: &ProjectFacts,
    owner: &FunctionKey,
    site: &crate::facts::CallSite,
    calling_context: Option<&ContractKey>,
) -> String {
    if site.target_contract.is_some() || split_qualified(&site.target_signature).is_some() {
        return site.qualified_target();
    }

    let bare = site.bare_signature();
    let resolved = calling_context
        .and_then(|ctx| facts.resolve_internal_target(ctx, bare))
        .or_else(|| facts.resolve_internal_target(&owner.contract, bare));

    match resolved {
        Some(contract) => format!("{}.{}", contract.name, bare),
        None => bare.to_string(),
    }
}

// ============================================================================
// Callers
// ============================================================================

/// List every function that calls `key`, grouped by call kind.
///
/// Answered from the inverted index keyed on the normalized
/// contract-qualified target signature. Two unrelated contracts exposing
/// the same signature legitimately produce callers of both; the result is
/// reported verbatim and disambiguation is left to the calling-context
/// parameter of [`callees`].
pub fn callers(facts: &ProjectFacts, key: &FunctionKey) -> ResolveResult<Callers> {
    // Verify the target exists before answering.
    resolve_function(facts, key)?;

    let target = normalize_signature(&key.qualified_signature());

    let mut internal = BTreeSet::new();
    let mut external = BTreeSet::new();
    let mut library = BTreeSet::new();
    for (caller, kind) in facts.callers_of(&target) {
        match kind {
            CallKind::Internal => internal.insert(caller.clone()),
            CallKind::External => external.insert(caller.clone()),
            CallKind::Library => library.insert(caller.clone()),
            // Low-level sites are never indexed.
            CallKind::LowLevel => continue,
        };
    }

    Ok(Callers {
        internal: internal.into_iter().collect(),
        external: external.into_iter().collect(),
        library: library.into_iter().collect(),
    })
}

// ============================================================================
// Implementations
// ============================================================================

/// Find every contract-level implementation of `signature`.
///
/// Scans declared functions only (a contract that merely inherits the
/// signature does not re-implement it). With `root` given, the scan is
/// restricted to the root's descendant subtree — the contracts that could
/// provide the implementation of an abstract or interface function declared
/// there. Results are in contract key order so repeated queries are
/// deterministic.
pub fn implementations(
    facts: &ProjectFacts,
    signature: &str,
    root: Option<&ContractKey>,
) -> ResolveResult<Vec<FunctionKey>> {
    let allowed: Option<BTreeSet<ContractKey>> = match root {
        Some(root_key) => {
            let tree = descendants(facts, root_key, None)?;
            let mut keys = BTreeSet::new();
            collect_subtree(&tree.root, &mut keys);
            keys.remove(root_key);
            Some(keys)
        }
        None => None,
    };

    let mut found = Vec::new();
    for (key, contract) in facts.contracts() {
        if let Some(allowed) = &allowed {
            if !allowed.contains(key) {
                continue;
            }
        }
        if let Some(fkey) = contract.find_declared_signature(signature) {
            found.push(fkey.clone());
        }
    }
    Ok(found)
}

fn collect_subtree(node: &crate::inheritance::DescendantNode, out: &mut BTreeSet<ContractKey>) {
    out.insert(node.key.clone());
    for child in &node.children {
        collect_subtree(child, out);
    }
}

// ============================================================================
// Tests
// ============================================================================
