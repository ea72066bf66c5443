//! Integration tests for the fact graph: ingestion through resolvers and
//! the artifact cache, exercised through the public API only.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use solfact_core::artifacts::{ArtifactCache, ArtifactError};
use solfact_core::callgraph::{callees, callers, implementations};
use solfact_core::facts::{
    CallKind, ProjectFacts, ProjectFactsBuilder, RawCallSite, RawContract, RawContractRef,
    RawFunction, RawInheritedFunction, Visibility,
};
use solfact_core::inheritance::{ancestors, descendants};
use solfact_core::keys::{ContractKey, FunctionKey};
use solfact_core::registry::ProjectRegistry;

fn contract_key(name: &str) -> ContractKey {
    ContractKey::new(name, format!("src/{name}.sol"))
}

fn function_key(contract: &str, sig: &str) -> FunctionKey {
    FunctionKey::new(contract_key(contract), sig)
}

fn contract_ref(name: &str) -> RawContractRef {
    RawContractRef {
        name: name.to_string(),
        path: format!("src/{name}.sol"),
    }
}

fn function(sig: &str, sites: Vec<RawCallSite>) -> RawFunction {
    RawFunction {
        signature: sig.to_string(),
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
        line_end: 10,
        call_sites: sites,
    }
}

fn contract(name: &str, parents: &[&str], functions: Vec<RawFunction>) -> RawContract {
    RawContract {
        name: name.to_string(),
        path: format!("src/{name}.sol"),
        is_abstract: false,
        is_interface: false,
        is_library: false,
        is_fully_implemented: true,
        parents: parents.iter().map(|p| contract_ref(p)).collect(),
        functions,
        inherited: vec![],
        state_variables: vec![],
        events: vec![],
    }
}

/// Base declares foo(); Derived inherits Base and declares nothing new.
fn base_derived_facts() -> ProjectFacts {
    let mut builder = ProjectFactsBuilder::new("/proj");
    builder
        .ingest_contract(contract("Base", &[], vec![function("foo()", vec![])]))
        .unwrap();
    let mut derived = contract("Derived", &["Base"], vec![]);
    derived.inherited = vec![RawInheritedFunction {
        signature: "foo()".to_string(),
        declared_in: contract_ref("Base"),
    }];
    builder.ingest_contract(derived).unwrap();
    builder.finish()
}

#[test]
fn test_base_derived_hierarchy_scenario() {
    let facts = base_derived_facts();

    let up = ancestors(&facts, &contract_key("Derived")).unwrap();
    assert_eq!(up.key, contract_key("Derived"));
    assert_eq!(up.parents.len(), 1);
    assert_eq!(up.parents[0].key, contract_key("Base"));

    let down = descendants(&facts, &contract_key("Base"), None).unwrap();
    assert_eq!(down.root.key, contract_key("Base"));
    assert_eq!(down.root.children.len(), 1);
    assert_eq!(down.root.children[0].key, contract_key("Derived"));

    // Derived does not redeclare foo(), so Base is the only implementation.
    let impls = implementations(&facts, "foo()", None).unwrap();
    assert_eq!(impls, vec![function_key("Base", "foo()")]);
}

#[test]
fn test_external_call_with_low_level_scenario() {
    let mut builder = ProjectFactsBuilder::new("/proj");
    builder
        .ingest_contract(contract("B", &[], vec![function("bar()", vec![])]))
        .unwrap();
    builder
        .ingest_contract(contract(
            "A",
            &[],
            vec![function(
                "someFn()",
                vec![
                    RawCallSite {
                        target: "bar()".to_string(),
                        target_contract: Some(contract_ref("B")),
                        kind: CallKind::External,
                    },
                    RawCallSite {
                        target: "address.call(bytes)".to_string(),
                        target_contract: None,
                        kind: CallKind::LowLevel,
                    },
                ],
            )],
        ))
        .unwrap();
    let facts = builder.finish();

    let result = callees(&facts, &function_key("A", "someFn()"), None).unwrap();
    assert_eq!(result.external, vec!["B.bar()".to_string()]);
    assert!(result.internal.is_empty());
    assert!(result.library.is_empty());
    assert!(result.has_low_level_calls);
}

#[test]
fn test_callers_and_callees_are_consistent() {
    let mut builder = ProjectFactsBuilder::new("/proj");
    builder
        .ingest_contract(contract(
            "Base",
            &[],
            vec![
                function("entry()", vec![RawCallSite {
                    target: "helper()".to_string(),
                    target_contract: None,
                    kind: CallKind::Internal,
                }]),
                function("helper()", vec![]),
            ],
        ))
        .unwrap();
    let facts = builder.finish();

    let forward = callees(&facts, &function_key("Base", "entry()"), None).unwrap();
    assert!(forward.internal.contains(&"Base.helper()".to_string()));

    let inverse = callers(&facts, &function_key("Base", "helper()")).unwrap();
    assert!(inverse.internal.contains(&function_key("Base", "entry()")));
    assert!(inverse.external.is_empty());
    assert!(inverse.library.is_empty());
}

#[test]
fn test_inheritance_cycle_terminates_with_marker() {
    let mut builder = ProjectFactsBuilder::new("/proj");
    builder
        .ingest_contract(contract("A", &["B"], vec![]))
        .unwrap();
    builder
        .ingest_contract(contract("B", &["A"], vec![]))
        .unwrap();
    let facts = builder.finish();

    // Terminates and the revisited node carries the cycle marker.
    let tree = ancestors(&facts, &contract_key("A")).unwrap();
    let b = &tree.parents[0];
    let a_again = &b.parents[0];
    assert!(a_again.cycle);
    assert!(a_again.parents.is_empty());
}

#[test]
fn test_artifact_round_trip_preserves_store() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ArtifactCache::new(dir.path());
    let facts = base_derived_facts();

    cache.save(&facts).unwrap();
    let loaded = cache.load().unwrap();
    assert_eq!(loaded, facts);

    // The reloaded store answers the same structural queries.
    let impls = implementations(&loaded, "foo()", None).unwrap();
    assert_eq!(impls, vec![function_key("Base", "foo()")]);
}

#[test]
fn test_newer_artifact_version_rejected_without_partial_state() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ArtifactCache::new(dir.path());
    cache.save(&base_derived_facts()).unwrap();

    // Rewrite the envelope to claim a schema version newer than supported.
    let path = cache.artifact_path();
    let content = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, content.replace("\"1.1.0\"", "\"2.0.0\"")).unwrap();

    match cache.load() {
        Err(ArtifactError::VersionMismatch { found, .. }) => assert_eq!(found, "2.0.0"),
        other => panic!("expected version mismatch, got {other:?}"),
    }
}

#[test]
fn test_concurrent_construction_analyzes_once() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(ProjectRegistry::new());
    let invocations = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let invocations = Arc::clone(&invocations);
            let root = dir.path().to_path_buf();
            std::thread::spawn(move || {
                registry
                    .get_or_build(&root, || {
                        invocations.fetch_add(1, Ordering::SeqCst);
                        Ok(base_derived_facts())
                    })
                    .unwrap()
            })
        })
        .collect();

    let stores: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    for store in &stores {
        assert_eq!(**store, *stores[0]);
    }

    // A fresh registry in a new process would be served by the artifact.
    let other = ProjectRegistry::new();
    let from_cache = other
        .get_or_build(dir.path(), || panic!("analyzer must not run"))
        .unwrap();
    assert_eq!(*from_cache, *stores[0]);
}

#[test]
fn test_callee_partition_covers_every_site() {
    let mut builder = ProjectFactsBuilder::new("/proj");
    builder
        .ingest_contract(contract("Lib", &[], vec![function("min(uint256,uint256)", vec![])]))
        .unwrap();
    builder
        .ingest_contract(contract(
            "Mixed",
            &[],
            vec![
                function("helper()", vec![]),
                function(
                    "busy()",
                    vec![
                        RawCallSite {
                            target: "helper()".to_string(),
                            target_contract: None,
                            kind: CallKind::Internal,
                        },
                        RawCallSite {
                            target: "min(uint256,uint256)".to_string(),
                            target_contract: Some(contract_ref("Lib")),
                            kind: CallKind::Library,
                        },
                        RawCallSite {
                            target: "poke()".to_string(),
                            target_contract: Some(contract_ref("Remote")),
                            kind: CallKind::External,
                        },
                        RawCallSite {
                            target: "address.call(bytes)".to_string(),
                            target_contract: None,
                            kind: CallKind::LowLevel,
                        },
                    ],
                ),
            ],
        ))
        .unwrap();
    let facts = builder.finish();

    let key = function_key("Mixed", "busy()");
    let total_sites = facts.function(&key).unwrap().call_sites.len();
    let low_level = facts
        .function(&key)
        .unwrap()
        .call_sites
        .iter()
        .filter(|s| s.kind == CallKind::LowLevel)
        .count();

    let result = callees(&facts, &key, None).unwrap();
    assert_eq!(
        result.internal.len() + result.external.len() + result.library.len() + low_level,
        total_sites
    );
    // The unresolved external target is reported, not dropped.
    assert_eq!(result.external, vec!["Remote.poke()".to_string()]);
}
