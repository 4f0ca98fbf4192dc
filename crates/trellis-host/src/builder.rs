//! Builders for host types
//!
//! Embedders describe their host classes with [`ClassBuilder`]; the bridge uses the same
//! builder to materialize generated adapter types.
//!
//! ```ignore
//! let mut point = ClassBuilder::class("geo.Point");
//! let point_ty = point.host_type();
//! let point = point
//!     .field(FieldDefinition::new("x", builtins::int()))
//!     .method(
//!         MethodDefinition::new("translate")
//!             .param(builtins::int())
//!             .returns(&point_ty)
//!             .body(|this, args| Ok(this.clone())),
//!     )
//!     .build();
//! ```

use std::sync::Arc;

use parking_lot::RwLock;

use crate::builtins;
use crate::error::InteropResult;
use crate::member::{ConstructorBody, HostConstructor, HostField, HostMethod, MethodBody};
use crate::object::HostObject;
use crate::types::{HostType, Modifiers, TypeKind, TypeMembers};
use crate::value::Value;

/// Definition for a method to be added to a host type
#[derive(Clone)]
pub struct MethodDefinition {
    /// Method name
    pub name: String,
    /// Modifier flags
    pub modifiers: Modifiers,
    /// Parameter types
    pub params: Vec<HostType>,
    /// Return type (`void` by default)
    pub return_type: HostType,
    /// Implementation; methods without one are abstract
    pub body: Option<MethodBody>,
}

impl MethodDefinition {
    /// Create a public `void` method without parameters
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modifiers: Modifiers::PUBLIC,
            params: Vec::new(),
            return_type: builtins::void().clone(),
            body: None,
        }
    }

    /// Add a parameter
    pub fn param(mut self, ty: &HostType) -> Self {
        self.params.push(ty.clone());
        self
    }

    /// Replace the parameter list
    pub fn params(mut self, params: Vec<HostType>) -> Self {
        self.params = params;
        self
    }

    /// Set return type
    pub fn returns(mut self, ty: &HostType) -> Self {
        self.return_type = ty.clone();
        self
    }

    /// Set the implementation
    pub fn body<F>(mut self, body: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> InteropResult<Value> + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(body));
        self
    }

    /// Set an already shared implementation
    pub fn shared_body(mut self, body: MethodBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Replace the modifier flags
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Mark as static method
    pub fn as_static(mut self) -> Self {
        self.modifiers = self.modifiers | Modifiers::STATIC;
        self
    }

    /// Mark as final method
    pub fn as_final(mut self) -> Self {
        self.modifiers = self.modifiers | Modifiers::FINAL;
        self
    }

    /// Mark as protected (instead of public)
    pub fn as_protected(mut self) -> Self {
        self.modifiers = self.modifiers.difference(Modifiers::PUBLIC) | Modifiers::PROTECTED;
        self
    }

    /// Mark as package-private (neither public nor protected)
    pub fn as_package_private(mut self) -> Self {
        self.modifiers = self
            .modifiers
            .difference(Modifiers::PUBLIC)
            .difference(Modifiers::PROTECTED);
        self
    }

    /// Mark as variable arity; the last parameter must be an array type
    pub fn as_varargs(mut self) -> Self {
        self.modifiers = self.modifiers | Modifiers::VARARGS;
        self
    }

    /// Mark as compiler-generated bridge method
    pub fn as_bridge(mut self) -> Self {
        self.modifiers = self.modifiers | Modifiers::BRIDGE | Modifiers::SYNTHETIC;
        self
    }
}

/// Definition for a constructor
#[derive(Clone)]
pub struct ConstructorDefinition {
    /// Modifier flags
    pub modifiers: Modifiers,
    /// Parameter types
    pub params: Vec<HostType>,
    /// Initializer run against the freshly allocated object
    pub body: ConstructorBody,
}

impl ConstructorDefinition {
    /// Create a public constructor without parameters that does nothing
    pub fn new() -> Self {
        Self {
            modifiers: Modifiers::PUBLIC,
            params: Vec::new(),
            body: Arc::new(|_, _| Ok(())),
        }
    }

    /// Add a parameter
    pub fn param(mut self, ty: &HostType) -> Self {
        self.params.push(ty.clone());
        self
    }

    /// Replace the parameter list
    pub fn params(mut self, params: Vec<HostType>) -> Self {
        self.params = params;
        self
    }

    /// Set the initializer
    pub fn body<F>(mut self, body: F) -> Self
    where
        F: Fn(&HostObject, &[Value]) -> InteropResult<()> + Send + Sync + 'static,
    {
        self.body = Arc::new(body);
        self
    }

    /// Replace the modifier flags
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Mark as protected (instead of public)
    pub fn as_protected(mut self) -> Self {
        self.modifiers = self.modifiers.difference(Modifiers::PUBLIC) | Modifiers::PROTECTED;
        self
    }

    /// Mark as private
    pub fn as_private(mut self) -> Self {
        self.modifiers = self
            .modifiers
            .difference(Modifiers::PUBLIC)
            .difference(Modifiers::PROTECTED)
            | Modifiers::PRIVATE;
        self
    }

    /// Mark as variable arity
    pub fn as_varargs(mut self) -> Self {
        self.modifiers = self.modifiers | Modifiers::VARARGS;
        self
    }
}

impl Default for ConstructorDefinition {
    fn default() -> Self {
        Self::new()
    }
}

/// Definition for a field
#[derive(Clone)]
pub struct FieldDefinition {
    /// Field name
    pub name: String,
    /// Field type
    pub ty: HostType,
    /// Modifier flags
    pub modifiers: Modifiers,
    /// Initial value (defaults to zero/null for the field type)
    pub initial_value: Option<Value>,
}

impl FieldDefinition {
    /// Create a public instance field
    pub fn new(name: impl Into<String>, ty: &HostType) -> Self {
        Self {
            name: name.into(),
            ty: ty.clone(),
            modifiers: Modifiers::PUBLIC,
            initial_value: None,
        }
    }

    /// Set the initial value
    pub fn initial_value(mut self, value: Value) -> Self {
        self.initial_value = Some(value);
        self
    }

    /// Mark as static field
    pub fn as_static(mut self) -> Self {
        self.modifiers = self.modifiers | Modifiers::STATIC;
        self
    }

    /// Mark as final
    pub fn as_final(mut self) -> Self {
        self.modifiers = self.modifiers | Modifiers::FINAL;
        self
    }

    /// Mark as package-private
    pub fn as_package_private(mut self) -> Self {
        self.modifiers = self.modifiers.difference(Modifiers::PUBLIC);
        self
    }
}

// ============================================================================
// ClassBuilder
// ============================================================================

/// Builder for classes and interfaces
///
/// The type header (name, kind, supertypes, modifiers) is frozen the first time
/// [`ClassBuilder::host_type`] is called, which allows members to refer to the type itself.
pub struct ClassBuilder {
    name: String,
    kind: TypeKind,
    modifiers: Modifiers,
    superclass: Option<HostType>,
    interfaces: Vec<HostType>,
    declared: Option<HostType>,
    methods: Vec<MethodDefinition>,
    constructors: Vec<ConstructorDefinition>,
    fields: Vec<FieldDefinition>,
    inner_types: Vec<HostType>,
}

impl ClassBuilder {
    pub(crate) fn with_kind(
        name: impl Into<String>,
        kind: TypeKind,
        superclass: Option<HostType>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            modifiers: Modifiers::PUBLIC,
            superclass,
            interfaces: Vec::new(),
            declared: None,
            methods: Vec::new(),
            constructors: Vec::new(),
            fields: Vec::new(),
            inner_types: Vec::new(),
        }
    }

    /// Public class extending the root class
    pub fn class(name: impl Into<String>) -> Self {
        Self::with_kind(name, TypeKind::Class, Some(builtins::object().clone()))
    }

    /// Public interface
    pub fn interface(name: impl Into<String>) -> Self {
        Self::with_kind(name, TypeKind::Interface, None)
    }

    /// The root class; only one should exist per process
    pub(crate) fn root(name: impl Into<String>) -> Self {
        Self::with_kind(name, TypeKind::Class, None)
    }

    /// Set the superclass
    pub fn extends(mut self, superclass: &HostType) -> Self {
        debug_assert!(self.declared.is_none(), "type header already frozen");
        self.superclass = Some(superclass.clone());
        self
    }

    /// Add an implemented (or, for interfaces, extended) interface
    pub fn implements(mut self, iface: &HostType) -> Self {
        debug_assert!(self.declared.is_none(), "type header already frozen");
        self.interfaces.push(iface.clone());
        self
    }

    /// Replace the type modifiers
    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        debug_assert!(self.declared.is_none(), "type header already frozen");
        self.modifiers = modifiers;
        self
    }

    /// Mark the class abstract
    pub fn as_abstract(self) -> Self {
        let modifiers = self.modifiers | Modifiers::ABSTRACT;
        self.modifiers(modifiers)
    }

    /// Mark the class final
    pub fn as_final(self) -> Self {
        let modifiers = self.modifiers | Modifiers::FINAL;
        self.modifiers(modifiers)
    }

    /// Mark the type package-private
    pub fn as_package_private(self) -> Self {
        let modifiers = self.modifiers.difference(Modifiers::PUBLIC);
        self.modifiers(modifiers)
    }

    /// Freeze the header and get the type handle
    pub fn host_type(&mut self) -> HostType {
        if let Some(ty) = &self.declared {
            return ty.clone();
        }
        let ty = HostType::declare(
            self.name.clone(),
            self.kind,
            self.modifiers,
            self.superclass.clone(),
            self.interfaces.clone(),
        );
        self.declared = Some(ty.clone());
        ty
    }

    /// Add a method
    pub fn method(mut self, method: MethodDefinition) -> Self {
        self.methods.push(method);
        self
    }

    /// Add a constructor
    pub fn constructor(mut self, ctor: ConstructorDefinition) -> Self {
        self.constructors.push(ctor);
        self
    }

    /// Add a field
    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    /// Register a nested type
    pub fn inner(mut self, ty: &HostType) -> Self {
        self.inner_types.push(ty.clone());
        self
    }

    /// Attach all members and return the finished type
    ///
    /// Classes without an explicit constructor get a public no-argument one.
    pub fn build(mut self) -> HostType {
        let ty = self.host_type();
        let declaring = ty.downgrade();
        let declaring_name = ty.name().to_string();
        let is_interface = ty.is_interface();

        let methods = self
            .methods
            .into_iter()
            .map(|def| {
                let mut modifiers = def.modifiers;
                if def.body.is_none() && !modifiers.is_static() {
                    modifiers = modifiers | Modifiers::ABSTRACT;
                } else if def.body.is_some() && is_interface && !modifiers.is_static() {
                    modifiers = modifiers | Modifiers::DEFAULT;
                }
                Arc::new(HostMethod {
                    name: def.name,
                    declaring: declaring.clone(),
                    declaring_name: declaring_name.clone(),
                    modifiers,
                    params: def.params,
                    return_type: def.return_type,
                    body: def.body,
                })
            })
            .collect();

        let mut constructor_defs = self.constructors;
        if constructor_defs.is_empty() && !is_interface {
            constructor_defs.push(ConstructorDefinition::new());
        }
        let constructors = constructor_defs
            .into_iter()
            .map(|def| {
                Arc::new(HostConstructor {
                    declaring: declaring.clone(),
                    declaring_name: declaring_name.clone(),
                    modifiers: def.modifiers,
                    params: def.params,
                    body: def.body,
                })
            })
            .collect();

        let fields = self
            .fields
            .into_iter()
            .map(|def| {
                let initial = def
                    .initial_value
                    .unwrap_or_else(|| Value::default_for(&def.ty));
                Arc::new(HostField {
                    name: def.name,
                    declaring: declaring.clone(),
                    declaring_name: declaring_name.clone(),
                    modifiers: def.modifiers,
                    static_value: RwLock::new(initial.clone()),
                    initial,
                    ty: def.ty,
                })
            })
            .collect();

        ty.attach_members(TypeMembers {
            methods,
            constructors,
            fields,
            inner_types: self.inner_types,
        });
        ty
    }
}
