//! Host types
//!
//! A [`HostType`] is a cheap, clonable handle to an immutable type record. Type identity is
//! the handle identity: two handles compare equal only if they point at the same record.
//! Array types are interned per component type, so `String[]` is always the same handle.
//!
//! Members are attached once, after the type header exists, which lets a class mention
//! itself in its own method signatures (see [`crate::builder::ClassBuilder`]).
//!
//! ## Assignability
//!
//! | Target            | Accepts                                                   |
//! |-------------------|-----------------------------------------------------------|
//! | primitive `p`     | only `p` itself                                           |
//! | root `Object`     | every reference type (classes, interfaces, arrays)        |
//! | class/interface   | itself, subclasses, implementors (transitively)           |
//! | array `T[]`       | `S[]` where `T` is assignable from `S`                    |

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use once_cell::sync::{Lazy, OnceCell};
use rustc_hash::FxHashSet;

use crate::member::{HostConstructor, HostField, HostMethod};

static NEXT_TYPE_ID: AtomicU64 = AtomicU64::new(1);

/// Interned array types keyed by component type id
static ARRAY_TYPES: Lazy<DashMap<TypeId, HostType>> = Lazy::new(DashMap::new);

/// Unique identifier of a host type within the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u64);

impl TypeId {
    fn next() -> Self {
        TypeId(NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

// ============================================================================
// Modifiers
// ============================================================================

/// Modifier flags for types and members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(u16);

impl Modifiers {
    /// No modifiers (package-private)
    pub const NONE: Self = Self(0x000);
    /// Public visibility
    pub const PUBLIC: Self = Self(0x001);
    /// Protected visibility
    pub const PROTECTED: Self = Self(0x002);
    /// Private visibility
    pub const PRIVATE: Self = Self(0x004);
    /// Static member
    pub const STATIC: Self = Self(0x008);
    /// Final type or member
    pub const FINAL: Self = Self(0x010);
    /// Abstract type or member
    pub const ABSTRACT: Self = Self(0x020);
    /// Compiler-generated bridge member
    pub const BRIDGE: Self = Self(0x040);
    /// Compiler-generated member
    pub const SYNTHETIC: Self = Self(0x080);
    /// Variable arity method or constructor
    pub const VARARGS: Self = Self(0x100);
    /// Interface method with a body
    pub const DEFAULT: Self = Self(0x200);

    /// Create from raw bits
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Get raw bits
    pub const fn bits(&self) -> u16 {
        self.0
    }

    /// Check if all flags in `other` are set
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of two flag sets
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Flags in `self` that are not in `other`
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Public visibility
    pub fn is_public(&self) -> bool {
        self.contains(Self::PUBLIC)
    }

    /// Protected visibility
    pub fn is_protected(&self) -> bool {
        self.contains(Self::PROTECTED)
    }

    /// Static member
    pub fn is_static(&self) -> bool {
        self.contains(Self::STATIC)
    }

    /// Final type or member
    pub fn is_final(&self) -> bool {
        self.contains(Self::FINAL)
    }

    /// Abstract type or member
    pub fn is_abstract(&self) -> bool {
        self.contains(Self::ABSTRACT)
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

// ============================================================================
// Type kinds
// ============================================================================

/// Primitive (unboxed) host types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// `boolean`
    Boolean,
    /// `byte`
    Byte,
    /// `short`
    Short,
    /// `char`
    Char,
    /// `int`
    Int,
    /// `long`
    Long,
    /// `float`
    Float,
    /// `double`
    Double,
    /// `void`, only valid as a return type
    Void,
}

impl PrimitiveKind {
    /// Source-level name of the primitive
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Void => "void",
        }
    }

    /// Whether the primitive is one of the numeric kinds
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Byte
                | PrimitiveKind::Short
                | PrimitiveKind::Int
                | PrimitiveKind::Long
                | PrimitiveKind::Float
                | PrimitiveKind::Double
        )
    }
}

/// Type kind enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Primitive types
    Primitive(PrimitiveKind),
    /// Class types (concrete or abstract)
    Class,
    /// Interface types
    Interface,
    /// Array types
    Array,
}

// ============================================================================
// HostType
// ============================================================================

/// Members declared directly on a type
#[derive(Default)]
pub struct TypeMembers {
    /// Declared methods (static and instance)
    pub methods: Vec<Arc<HostMethod>>,
    /// Declared constructors
    pub constructors: Vec<Arc<HostConstructor>>,
    /// Declared fields (static and instance)
    pub fields: Vec<Arc<HostField>>,
    /// Nested types
    pub inner_types: Vec<HostType>,
}

pub(crate) struct TypeData {
    id: TypeId,
    name: String,
    kind: TypeKind,
    modifiers: Modifiers,
    superclass: Option<HostType>,
    interfaces: Vec<HostType>,
    component: Option<HostType>,
    members: OnceCell<TypeMembers>,
}

/// Handle to a host type
#[derive(Clone)]
pub struct HostType(Arc<TypeData>);

/// Non-owning handle to a host type, used for back references from members
#[derive(Clone)]
pub struct WeakHostType(Weak<TypeData>);

impl WeakHostType {
    /// Upgrade to a strong handle if the type is still alive
    pub fn upgrade(&self) -> Option<HostType> {
        self.0.upgrade().map(HostType)
    }
}

impl HostType {
    /// Create a type header without members
    pub(crate) fn declare(
        name: String,
        kind: TypeKind,
        modifiers: Modifiers,
        superclass: Option<HostType>,
        interfaces: Vec<HostType>,
    ) -> Self {
        HostType(Arc::new(TypeData {
            id: TypeId::next(),
            name,
            kind,
            modifiers,
            superclass,
            interfaces,
            component: None,
            members: OnceCell::new(),
        }))
    }

    /// Create a primitive type
    pub(crate) fn new_primitive(kind: PrimitiveKind) -> Self {
        let ty = Self::declare(
            kind.name().to_string(),
            TypeKind::Primitive(kind),
            Modifiers::PUBLIC | Modifiers::FINAL,
            None,
            Vec::new(),
        );
        ty.attach_members(TypeMembers::default());
        ty
    }

    /// Get the array type whose elements are `component`
    pub fn array_of(component: &HostType) -> HostType {
        ARRAY_TYPES
            .entry(component.id())
            .or_insert_with(|| {
                let ty = HostType(Arc::new(TypeData {
                    id: TypeId::next(),
                    name: format!("{}[]", component.name()),
                    kind: TypeKind::Array,
                    modifiers: Modifiers::PUBLIC | Modifiers::FINAL,
                    superclass: Some(crate::builtins::object().clone()),
                    interfaces: Vec::new(),
                    component: Some(component.clone()),
                    members: OnceCell::new(),
                }));
                ty.attach_members(TypeMembers::default());
                ty
            })
            .clone()
    }

    /// Attach the member table; returns false if members were already attached
    pub(crate) fn attach_members(&self, members: TypeMembers) -> bool {
        self.0.members.set(members).is_ok()
    }

    /// Downgrade to a weak handle
    pub fn downgrade(&self) -> WeakHostType {
        WeakHostType(Arc::downgrade(&self.0))
    }

    /// Unique type id
    pub fn id(&self) -> TypeId {
        self.0.id
    }

    /// Fully qualified name, e.g. `lang.String` or `lang.String[]`
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Name without the package prefix
    pub fn simple_name(&self) -> &str {
        match self.0.name.rfind('.') {
            Some(idx) => &self.0.name[idx + 1..],
            None => &self.0.name,
        }
    }

    /// Type kind
    pub fn kind(&self) -> TypeKind {
        self.0.kind
    }

    /// Type modifiers
    pub fn modifiers(&self) -> Modifiers {
        self.0.modifiers
    }

    /// Public visibility
    pub fn is_public(&self) -> bool {
        self.0.modifiers.is_public()
    }

    /// Final types cannot be extended
    pub fn is_final(&self) -> bool {
        self.0.modifiers.is_final()
    }

    /// Interfaces and abstract classes
    pub fn is_abstract(&self) -> bool {
        self.is_interface() || self.0.modifiers.is_abstract()
    }

    /// Interface type
    pub fn is_interface(&self) -> bool {
        self.0.kind == TypeKind::Interface
    }

    /// Array type
    pub fn is_array(&self) -> bool {
        self.0.kind == TypeKind::Array
    }

    /// Primitive type (including `void`)
    pub fn is_primitive(&self) -> bool {
        matches!(self.0.kind, TypeKind::Primitive(_))
    }

    /// The `void` pseudo-type
    pub fn is_void(&self) -> bool {
        self.0.kind == TypeKind::Primitive(PrimitiveKind::Void)
    }

    /// The root class every reference type derives from
    pub fn is_root(&self) -> bool {
        self.0.kind == TypeKind::Class && self.0.superclass.is_none()
    }

    /// Primitive kind, if this is a primitive type
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.0.kind {
            TypeKind::Primitive(kind) => Some(kind),
            _ => None,
        }
    }

    /// Element type of an array type
    pub fn component_type(&self) -> Option<&HostType> {
        self.0.component.as_ref()
    }

    /// Direct superclass (none for the root class, interfaces and primitives)
    pub fn superclass(&self) -> Option<&HostType> {
        self.0.superclass.as_ref()
    }

    /// Directly implemented (or extended, for interfaces) interfaces
    pub fn interfaces(&self) -> &[HostType] {
        &self.0.interfaces
    }

    /// Methods declared directly on this type
    pub fn declared_methods(&self) -> &[Arc<HostMethod>] {
        self.0
            .members
            .get()
            .map(|m| m.methods.as_slice())
            .unwrap_or(&[])
    }

    /// Constructors declared on this type
    pub fn constructors(&self) -> &[Arc<HostConstructor>] {
        self.0
            .members
            .get()
            .map(|m| m.constructors.as_slice())
            .unwrap_or(&[])
    }

    /// Fields declared directly on this type
    pub fn declared_fields(&self) -> &[Arc<HostField>] {
        self.0
            .members
            .get()
            .map(|m| m.fields.as_slice())
            .unwrap_or(&[])
    }

    /// Nested types declared on this type
    pub fn inner_types(&self) -> &[HostType] {
        self.0
            .members
            .get()
            .map(|m| m.inner_types.as_slice())
            .unwrap_or(&[])
    }

    /// Boxed counterpart of a primitive type; reference types map to themselves
    pub fn boxed(&self) -> HostType {
        match self.0.kind {
            TypeKind::Primitive(kind) => crate::builtins::boxed(kind).clone(),
            _ => self.clone(),
        }
    }

    /// Primitive counterpart of a boxed type
    pub fn unboxed(&self) -> Option<HostType> {
        crate::builtins::unboxed(self).cloned()
    }

    /// Every supertype (superclasses first, then interfaces), excluding `self`
    pub fn ancestors(&self) -> Vec<HostType> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        let mut current = self.superclass().cloned();
        while let Some(ty) = current {
            seen.insert(ty.id());
            current = ty.superclass().cloned();
            out.push(ty);
        }
        let mut pending: Vec<HostType> = std::iter::once(self.clone())
            .chain(out.iter().cloned())
            .flat_map(|ty| ty.interfaces().to_vec())
            .collect();
        while !pending.is_empty() {
            let mut next = Vec::new();
            for iface in pending {
                if seen.insert(iface.id()) {
                    next.extend(iface.interfaces().iter().cloned());
                    out.push(iface);
                }
            }
            pending = next;
        }
        out
    }

    /// Whether a value of type `other` can be stored where `self` is expected
    pub fn is_assignable_from(&self, other: &HostType) -> bool {
        if self == other {
            return true;
        }
        if self.is_primitive() || other.is_primitive() {
            return false;
        }
        if self.is_root() {
            return true;
        }
        if other.is_array() {
            return match (self.component_type(), other.component_type()) {
                (Some(to), Some(from)) => to.is_assignable_from(from),
                _ => false,
            };
        }
        other
            .superclass()
            .map_or(false, |sup| self.is_assignable_from(sup))
            || other
                .interfaces()
                .iter()
                .any(|iface| self.is_assignable_from(iface))
    }

    /// Find the implementation a virtual call to `name(params)` dispatches to
    ///
    /// Searches the class chain first, then default methods on interfaces.
    pub fn find_method(&self, name: &str, params: &[HostType]) -> Option<Arc<HostMethod>> {
        let matches =
            |m: &&Arc<HostMethod>| !m.is_static() && m.has_body() && m.matches(name, params);
        let mut current = Some(self.clone());
        while let Some(ty) = current {
            if let Some(found) = ty.declared_methods().iter().find(matches) {
                return Some(found.clone());
            }
            current = ty.superclass().cloned();
        }
        std::iter::once(self.clone())
            .chain(self.ancestors())
            .filter(|ty| ty.is_interface())
            .find_map(|ty| ty.declared_methods().iter().find(matches).cloned())
    }
}

impl PartialEq for HostType {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for HostType {}

impl Hash for HostType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostType({})", self.0.name)
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ClassBuilder;
    use crate::builtins;

    #[test]
    fn test_modifier_flags() {
        let m = Modifiers::PUBLIC | Modifiers::STATIC;
        assert!(m.is_public());
        assert!(m.is_static());
        assert!(!m.is_final());
        assert_eq!(m.difference(Modifiers::STATIC), Modifiers::PUBLIC);
    }

    #[test]
    fn test_array_types_are_interned() {
        let a = HostType::array_of(builtins::string());
        let b = HostType::array_of(builtins::string());
        assert_eq!(a, b);
        assert_eq!(a.name(), "lang.String[]");
        assert_eq!(a.simple_name(), "String[]");
        assert_eq!(a.component_type(), Some(builtins::string()));
    }

    #[test]
    fn test_reference_assignability() {
        let object = builtins::object();
        let string = builtins::string();
        assert!(object.is_assignable_from(string));
        assert!(builtins::char_sequence().is_assignable_from(string));
        assert!(!string.is_assignable_from(object));
        assert!(!builtins::int().is_assignable_from(builtins::integer()));
        assert!(!object.is_assignable_from(builtins::int()));
    }

    #[test]
    fn test_array_covariance() {
        let strings = HostType::array_of(builtins::string());
        let objects = HostType::array_of(builtins::object());
        let ints = HostType::array_of(builtins::int());
        assert!(objects.is_assignable_from(&strings));
        assert!(!strings.is_assignable_from(&objects));
        assert!(!objects.is_assignable_from(&ints));
        assert!(builtins::object().is_assignable_from(&ints));
    }

    #[test]
    fn test_interface_inheritance_is_transitive() {
        let base = ClassBuilder::interface("demo.Base").build();
        let derived = ClassBuilder::interface("demo.Derived")
            .implements(&base)
            .build();
        let impl_ty = ClassBuilder::class("demo.Impl").implements(&derived).build();
        assert!(base.is_assignable_from(&impl_ty));
        assert!(impl_ty.ancestors().contains(&base));
        assert!(builtins::object().is_assignable_from(&base));
    }

    #[test]
    fn test_boxing_round_trip() {
        assert_eq!(&builtins::int().boxed(), builtins::integer());
        assert_eq!(builtins::integer().unboxed().as_ref(), Some(builtins::int()));
        assert_eq!(&builtins::string().boxed(), builtins::string());
    }
}
