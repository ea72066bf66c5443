//! Identity keys for contracts and functions.
//!
//! Every entity in the fact graph is addressed by a structural key rather
//! than an object reference:
//!
//! - [`ContractKey`]: contract name plus the file that declares it. Two
//!   contracts with the same name in different files are distinct entities.
//! - [`FunctionKey`]: canonical parameter-typed signature plus the owning
//!   [`ContractKey`], enabling overload disambiguation.
//!
//! Both keys are immutable, hashable, and totally ordered so that every
//! listing derived from them is deterministic.
//!
//! # Canonical string form
//!
//! Keys serialize as single strings so they can be used as JSON map keys in
//! the persisted artifact:
//!
//! - `ContractKey`: `Name@dir!file.sol` (path separators encoded as `!`)
//! - `FunctionKey`: `Name.sig(args)@dir-file.sol` (path separators encoded
//!   as `-`)
//!
//! `parse(to_string(key)) == key` holds for both.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ============================================================================
// ContractKey
// ============================================================================

/// Identity of a contract: name plus declaring file path.
///
/// The path is workspace-relative (e.g. `src/Token.sol`). Equality and
/// ordering are structural over `(name, path)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContractKey {
    /// Contract name as declared in source.
    pub name: String,
    /// Workspace-relative path of the declaring file.
    pub path: String,
}

impl ContractKey {
    /// Create a new contract key.
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        ContractKey {
            name: name.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.path.replace('/', "!"))
    }
}

/// Error parsing a key from its canonical string form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid key string: {input}")]
pub struct KeyParseError {
    /// The string that failed to parse.
    pub input: String,
}

impl FromStr for ContractKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, path) = s.split_once('@').ok_or_else(|| KeyParseError {
            input: s.to_string(),
        })?;
        if name.is_empty() {
            return Err(KeyParseError {
                input: s.to_string(),
            });
        }
        Ok(ContractKey {
            name: name.to_string(),
            path: path.replace('!', "/"),
        })
    }
}

impl Serialize for ContractKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ContractKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

// ============================================================================
// FunctionKey
// ============================================================================

/// Identity of a function: owning contract plus canonical signature.
///
/// The signature is the parameter-typed form (`transfer(address,uint256)`),
/// with no visibility or return type. Ordering is contract-major so that
/// functions of the same contract group together in sorted listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionKey {
    /// The contract the function belongs to.
    pub contract: ContractKey,
    /// Canonical parameter-typed signature.
    pub signature: String,
}

impl FunctionKey {
    /// Create a new function key.
    pub fn new(contract: ContractKey, signature: impl Into<String>) -> Self {
        FunctionKey {
            contract,
            signature: signature.into(),
        }
    }

    /// The qualified signature form used in call-site listings
    /// (`Contract.sig(args)`).
    pub fn qualified_signature(&self) -> String {
        format!("{}.{}", self.contract.name, self.signature)
    }
}

impl fmt::Display for FunctionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}@{}",
            self.contract.name,
            self.signature,
            self.contract.path.replace('/', "-")
        )
    }
}

impl FromStr for FunctionKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (qualified, path) = s.split_once('@').ok_or_else(|| KeyParseError {
            input: s.to_string(),
        })?;
        let (name, signature) = qualified.split_once('.').ok_or_else(|| KeyParseError {
            input: s.to_string(),
        })?;
        if name.is_empty() || signature.is_empty() {
            return Err(KeyParseError {
                input: s.to_string(),
            });
        }
        Ok(FunctionKey {
            contract: ContractKey {
                name: name.to_string(),
                path: path.replace('-', "/"),
            },
            signature: signature.to_string(),
        })
    }
}

impl Serialize for FunctionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FunctionKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

// ============================================================================
// Signature Helpers
// ============================================================================

/// Split a qualified signature (`Contract.sig(args)`) into contract name and
/// bare signature.
///
/// Returns `None` when the string has no contract qualifier before the
/// parameter list.
pub fn split_qualified(signature: &str) -> Option<(&str, &str)> {
    let dot = signature.find('.')?;
    // A '.' inside the parameter list is a type qualifier, not a contract
    // qualifier.
    if let Some(paren) = signature.find('(') {
        if dot > paren {
            return None;
        }
    }
    let (contract, rest) = signature.split_at(dot);
    Some((contract, &rest[1..]))
}

/// Normalize a signature by stripping qualifying type prefixes from each
/// parameter.
///
/// `swap(PoolKey,IPoolManager.SwapParams,bytes)` becomes
/// `swap(PoolKey,SwapParams,bytes)`. Array suffixes are preserved. The
/// function name itself is never modified. Signatures without a parameter
/// list are returned unchanged.
pub fn normalize_signature(signature: &str) -> String {
    let Some((name, rest)) = signature.split_once('(') else {
        return signature.to_string();
    };
    let params_str = rest.trim_end_matches(')');
    if params_str.is_empty() {
        return signature.to_string();
    }

    let normalized: Vec<String> = params_str
        .split(',')
        .map(|param| {
            let param = param.trim();
            let (base, suffix) = match param.strip_suffix("[]") {
                Some(base) => (base, "[]"),
                None => (param, ""),
            };
            let base = base.rsplit('.').next().unwrap_or(base);
            format!("{}{}", base, suffix)
        })
        .collect();

    format!("{}({})", name, normalized.join(","))
}

/// Find the stored signature matching `target` in `available`.
///
/// Exact match first, then normalized comparison. Returns the stored form so
/// callers can index with it.
pub fn find_matching_signature<'a, I>(target: &str, available: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str> + Clone,
{
    for sig in available.clone() {
        if sig == target {
            return Some(sig);
        }
    }
    let normalized_target = normalize_signature(target);
    available
        .into_iter()
        .find(|sig| normalize_signature(sig) == normalized_target)
}

// ============================================================================
// Tests
// ============================================================================
