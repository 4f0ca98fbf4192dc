//! Script adapters for host types
//!
//! An adapter is a generated concrete host type that extends one class and implements any
//! number of interfaces, with every overridable method forwarding to a script callable.
//!
//! | Module        | Role                                                              |
//! |---------------|-------------------------------------------------------------------|
//! | [`generator`] | plans overridable members and produces an [`AdapterBlueprint`]    |
//! | [`loader`]    | materializes blueprints into host types and caches them           |
//! | [`services`]  | call trampoline, delegate lookup and argument/result conversion   |
//!
//! Dispatch is table driven: each adapter instance carries a map from method name to script
//! delegate, and every generated method body consults it before falling back to class-level
//! delegates and finally to the inherited implementation.

pub mod generator;
pub mod loader;
pub mod services;

use std::fmt;

use trellis_host::{builtins, HostType, InteropError, InteropResult};

pub use generator::{
    abstract_method_names, AdapterBlueprint, AdapterGenerator, ClassBinder, GeneratedAdapterType,
};
pub use loader::AdapterLoader;

/// Method names that are never overridable by scripts
pub const EXCLUDED_METHODS: &[&str] = &["finalize", "clone"];

/// Prefix of generated call-through methods
pub const SUPER_PREFIX: &str = "super$";

/// Cache key of a generated adapter type
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AdapterKey {
    supertype: HostType,
    interfaces: Vec<HostType>,
}

impl AdapterKey {
    /// Extended class
    pub fn supertype(&self) -> &HostType {
        &self.supertype
    }

    /// Implemented interfaces in request order
    pub fn interfaces(&self) -> &[HostType] {
        &self.interfaces
    }
}

impl fmt::Debug for AdapterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        list.entry(&self.supertype.name());
        for iface in &self.interfaces {
            list.entry(&iface.name());
        }
        list.finish()
    }
}

/// Validated adapter request
///
/// At most one class (defaulting to the root class) plus any number of interfaces, all
/// public, none final, no primitives or arrays.
#[derive(Debug, Clone)]
pub struct AdapterSpec {
    key: AdapterKey,
    class_overrides: bool,
}

impl AdapterSpec {
    /// Validate and classify the requested supertypes
    pub fn new(types: &[HostType]) -> InteropResult<Self> {
        if types.is_empty() {
            return Err(InteropError::InvalidAdapterSpec(
                "at least one type is required".to_string(),
            ));
        }

        let mut supertype: Option<HostType> = None;
        let mut interfaces: Vec<HostType> = Vec::new();
        for ty in types {
            if ty.is_primitive() || ty.is_array() {
                return Err(InteropError::InvalidAdapterSpec(format!(
                    "cannot extend {}",
                    ty.name()
                )));
            }
            if ty.is_interface() {
                if !ty.is_public() {
                    return Err(InteropError::InvalidAdapterSpec(format!(
                        "cannot implement non-public interface {}",
                        ty.name()
                    )));
                }
                if !interfaces.contains(ty) {
                    interfaces.push(ty.clone());
                }
                continue;
            }
            if let Some(existing) = &supertype {
                return Err(InteropError::InvalidAdapterSpec(format!(
                    "cannot extend both {} and {}",
                    existing.name(),
                    ty.name()
                )));
            }
            if ty.is_final() {
                return Err(InteropError::InvalidAdapterSpec(format!(
                    "cannot extend final class {}",
                    ty.name()
                )));
            }
            if !ty.is_public() {
                return Err(InteropError::InvalidAdapterSpec(format!(
                    "cannot extend non-public class {}",
                    ty.name()
                )));
            }
            supertype = Some(ty.clone());
        }

        Ok(Self {
            key: AdapterKey {
                supertype: supertype.unwrap_or_else(|| builtins::object().clone()),
                interfaces,
            },
            class_overrides: false,
        })
    }

    /// Request shared class-level delegates
    pub fn with_class_overrides(mut self) -> Self {
        self.class_overrides = true;
        self
    }

    /// Cache key
    pub fn key(&self) -> &AdapterKey {
        &self.key
    }

    /// Extended class
    pub fn supertype(&self) -> &HostType {
        &self.key.supertype
    }

    /// Implemented interfaces
    pub fn interfaces(&self) -> &[HostType] {
        &self.key.interfaces
    }

    /// Whether class-level delegates are requested
    pub fn has_class_overrides(&self) -> bool {
        self.class_overrides
    }
}
