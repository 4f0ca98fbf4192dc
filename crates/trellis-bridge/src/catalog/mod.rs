//! Host Type Catalog
//!
//! Lazily built, memoized view of a host type's members as scripts see them.
//!
//! | Map               | Key                | Value            |
//! |-------------------|--------------------|------------------|
//! | instance methods  | method name        | [`HostMember`]   |
//! | static methods    | method name        | [`HostMember`]   |
//! | instance accessors| property name      | [`AccessorPair`] |
//! | static accessors  | property name      | [`AccessorPair`] |
//! | inner types       | simple type name   | `HostType`       |
//!
//! Method lookups also accept signature-qualified names such as `add(int, String)`, which
//! select one overload by parameter type names and bypass argument-driven resolution. An
//! empty name part (`(int)`) selects a constructor.

mod introspect;
pub mod member;

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use rustc_hash::FxHashSet;
use trellis_host::{HostType, InteropError, InteropResult};

pub use introspect::decapitalize;
pub use member::{AccessorPair, Getter, HostMember, Setter};

use introspect::Introspection;

use crate::adapter::{self, AdapterSpec};

// ============================================================================
// Catalog
// ============================================================================

/// Process-wide registry of catalog entries keyed by host type
#[derive(Default)]
pub struct HostCatalog {
    entries: DashMap<HostType, Arc<CatalogEntry>>,
}

impl HostCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for `ty`, created on first request
    ///
    /// Members are enumerated on the entry's first lookup, not here.
    pub fn entry(&self, ty: &HostType) -> Arc<CatalogEntry> {
        if let Some(entry) = self.entries.get(ty) {
            return entry.clone();
        }
        self.entries
            .entry(ty.clone())
            .or_insert_with(|| Arc::new(CatalogEntry::new(ty)))
            .clone()
    }

    /// Drop the entry for `ty`; the next request introspects again
    pub fn invalidate(&self, ty: &HostType) -> bool {
        self.entries.remove(ty).is_some()
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entry is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Entry
// ============================================================================

/// Members of one host type
pub struct CatalogEntry {
    ty: HostType,
    info: OnceCell<Introspection>,
}

impl CatalogEntry {
    fn new(ty: &HostType) -> Self {
        Self {
            ty: ty.clone(),
            info: OnceCell::new(),
        }
    }

    /// Type described by this entry
    pub fn host_type(&self) -> &HostType {
        &self.ty
    }

    /// Whether members have been enumerated yet
    pub fn is_introspected(&self) -> bool {
        self.info.get().is_some()
    }

    fn info(&self) -> &Introspection {
        self.info.get_or_init(|| {
            let info = introspect::introspect(&self.ty);
            tracing::debug!(
                ty = %self.ty,
                methods = info.methods.len(),
                static_methods = info.static_methods.len(),
                accessors = info.accessors.len(),
                "introspected host type"
            );
            info
        })
    }

    /// Method (or overload set) named `name`
    ///
    /// `name` may be signature-qualified. Returns `NoSuchMember` if nothing matches.
    pub fn lookup_method(&self, name: &str, is_static: bool) -> InteropResult<HostMember> {
        let info = self.info();
        let methods = if is_static {
            &info.static_methods
        } else {
            &info.methods
        };
        if let Some(member) = methods.get(name) {
            return Ok(member.clone());
        }
        if let Some((base, tokens)) = parse_signature(name) {
            let candidates = if base.is_empty() {
                if !is_static {
                    return Err(self.no_such_member(name));
                }
                info.constructors.as_ref()
            } else {
                methods.get(base)
            };
            if let Some(candidates) = candidates {
                return self.select_by_signature(name, candidates, &tokens);
            }
        }
        Err(self.no_such_member(name))
    }

    /// Whether a method (or overload set) named exactly `name` exists
    pub fn has_method(&self, name: &str, is_static: bool) -> bool {
        let info = self.info();
        if is_static {
            info.static_methods.contains_key(name)
        } else {
            info.methods.contains_key(name)
        }
    }

    /// Property accessors named `name`
    pub fn lookup_accessor(&self, name: &str, is_static: bool) -> Option<&AccessorPair> {
        let info = self.info();
        if is_static {
            info.static_accessors.get(name)
        } else {
            info.accessors.get(name)
        }
    }

    /// Public nested type with simple name `name`
    pub fn lookup_inner_type(&self, name: &str) -> Option<&HostType> {
        self.info().inner_types.get(name)
    }

    /// Public constructors, collapsed into one member
    pub fn constructors(&self) -> Option<&HostMember> {
        self.info().constructors.as_ref()
    }

    /// Constructor selected by a parameter list such as `(int, String)`
    pub fn lookup_constructor(&self, signature: &str) -> InteropResult<HostMember> {
        let qualified = if signature.starts_with('(') {
            signature.to_string()
        } else {
            format!("({signature})")
        };
        self.lookup_method(&qualified, true)
    }

    /// Names of all methods, sorted
    pub fn method_names(&self, is_static: bool) -> Vec<String> {
        let info = self.info();
        let methods = if is_static {
            &info.static_methods
        } else {
            &info.methods
        };
        let mut names: Vec<String> = methods.keys().cloned().collect();
        names.sort();
        names
    }

    /// Names of all properties, sorted
    pub fn accessor_names(&self, is_static: bool) -> Vec<String> {
        let info = self.info();
        let accessors = if is_static {
            &info.static_accessors
        } else {
            &info.accessors
        };
        let mut names: Vec<String> = accessors.keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether a bare script callable can implement this type
    ///
    /// The type must be abstract, constructible by an adapter (an interface, or a class with
    /// an accessible no-argument constructor) and declare exactly one distinct abstract
    /// method name.
    pub fn is_sam_type(&self) -> bool {
        let ty = &self.ty;
        if !ty.is_abstract() || ty.is_array() || ty.is_primitive() {
            return false;
        }
        let constructible = ty.is_interface()
            || ty.constructors().iter().any(|ctor| {
                ctor.params().is_empty() && (ctor.is_public() || ctor.is_protected())
            });
        constructible && self.abstract_method_names().len() == 1
    }

    /// Distinct names of the abstract methods an adapter of this type must delegate
    ///
    /// Same set the adapter generator plans against, so protected abstract members count.
    pub fn abstract_method_names(&self) -> FxHashSet<String> {
        match AdapterSpec::new(std::slice::from_ref(&self.ty)) {
            Ok(spec) => adapter::abstract_method_names(spec.key()),
            Err(_) => FxHashSet::default(),
        }
    }

    fn select_by_signature(
        &self,
        qualified: &str,
        candidates: &HostMember,
        tokens: &[&str],
    ) -> InteropResult<HostMember> {
        let matching: Vec<HostMember> = candidates
            .candidates()
            .into_iter()
            .filter(|member| params_match(member.params(), tokens))
            .collect();
        match matching.len() {
            0 => Err(self.no_such_member(qualified)),
            1 => Ok(matching[0].clone()),
            count => {
                let canonical: Vec<&HostMember> =
                    matching.iter().filter(|m| !m.is_bridge()).collect();
                if let [single] = canonical.as_slice() {
                    return Ok((*single).clone());
                }
                Err(InteropError::AmbiguousOverload {
                    count,
                    signatures: matching.iter().map(HostMember::signature).collect(),
                })
            }
        }
    }

    fn no_such_member(&self, name: &str) -> InteropError {
        InteropError::NoSuchMember {
            type_name: self.ty.name().to_string(),
            member: name.to_string(),
        }
    }
}

/// Split `name(T1, T2)` into `("name", ["T1", "T2"])`
fn parse_signature(name: &str) -> Option<(&str, Vec<&str>)> {
    let inner = name.strip_suffix(')')?;
    let open = inner.find('(')?;
    let tokens = inner[open + 1..]
        .split(|c: char| c == ',' || c == ' ')
        .filter(|token| !token.is_empty())
        .collect();
    Some((&inner[..open], tokens))
}

/// Fully qualified tokens match the full name; others match the simple name
fn params_match(params: &[HostType], tokens: &[&str]) -> bool {
    params.len() == tokens.len()
        && params.iter().zip(tokens).all(|(param, token)| {
            if token.contains('.') {
                param.name() == *token
            } else {
                param.simple_name() == *token
            }
        })
}
