//! Values exchanged between the scripting runtime and the host model
//!
//! One enum carries both sides of the bridge. Script-side shapes (`Undefined`, `ScriptNull`,
//! `LargeInt`, `LazyString`, `Script`, `Type`) are never instances of a specific host class;
//! host-side shapes map to a host runtime type through [`Value::host_type`].
//!
//! | Variant      | Side   | Host runtime type        |
//! |--------------|--------|--------------------------|
//! | `Undefined`  | script | (root only)              |
//! | `ScriptNull` | script | (root only)              |
//! | `Null`       | host   | none, assignable to refs |
//! | `Int`        | both   | `lang.Integer`           |
//! | `Double`     | both   | `lang.Double`            |
//! | `LargeInt`   | script | `script.LargeInteger`    |
//! | `LazyString` | script | `lang.CharSequence`      |
//! | `Class`      | host   | `lang.Class`             |

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::builtins;
use crate::object::{HostArray, HostObject};
use crate::types::{HostType, PrimitiveKind, TypeKind};

// ============================================================================
// Script references
// ============================================================================

/// Opaque handle to a script-side object or callable
///
/// The scripting runtime decides what lives behind the handle; the bridge only compares
/// handles by identity and hands them back to the runtime.
#[derive(Clone)]
pub struct ScriptRef(Arc<dyn Any + Send + Sync>);

impl ScriptRef {
    /// Wrap a runtime-specific object
    pub fn new<T: Any + Send + Sync>(inner: T) -> Self {
        ScriptRef(Arc::new(inner))
    }

    /// Borrow the runtime-specific object
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ScriptRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Stable identity hash for the lifetime of the object
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for ScriptRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScriptRef@{:x}", self.identity())
    }
}

// ============================================================================
// Lazy strings
// ============================================================================

struct LazyStringData {
    parts: Vec<Arc<str>>,
    flat: OnceCell<Arc<str>>,
}

/// Unflattened string concatenation produced by the scripting runtime
#[derive(Clone)]
pub struct LazyString(Arc<LazyStringData>);

impl LazyString {
    /// Create from the pieces of a concatenation
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        LazyString(Arc::new(LazyStringData {
            parts: parts.into_iter().map(Into::into).collect(),
            flat: OnceCell::new(),
        }))
    }

    /// Materialize the string (memoized)
    pub fn flatten(&self) -> Arc<str> {
        self.0
            .flat
            .get_or_init(|| Arc::from(self.0.parts.concat()))
            .clone()
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.0.parts.iter().map(|p| p.len()).sum()
    }

    /// True if every piece is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether [`LazyString::flatten`] has already run
    pub fn is_flat(&self) -> bool {
        self.0.flat.get().is_some()
    }
}

impl fmt::Debug for LazyString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LazyString({:?})", self.flatten())
    }
}

// ============================================================================
// Value
// ============================================================================

/// A value crossing the bridge
#[derive(Clone, Debug)]
pub enum Value {
    /// Script `undefined`
    Undefined,
    /// Script `null` sentinel
    ScriptNull,
    /// Host null reference
    Null,
    /// Boolean
    Bool(bool),
    /// Host `byte`
    Byte(i8),
    /// Host `short`
    Short(i16),
    /// Host `char` (UTF-16 code unit)
    Char(u16),
    /// 32-bit integer (script small integer / host `int`)
    Int(i32),
    /// Host `long`
    Long(i64),
    /// Host `float`
    Float(f32),
    /// 64-bit float (script number / host `double`)
    Double(f64),
    /// Script integer outside the 32-bit range
    LargeInt(i64),
    /// Flat string
    String(Arc<str>),
    /// Unflattened script string
    LazyString(LazyString),
    /// Script object or callable
    Script(ScriptRef),
    /// Host object instance
    Host(HostObject),
    /// Host array instance
    Array(HostArray),
    /// Type mirror: an instance of `lang.Class` describing a type
    Class(HostType),
    /// Static view of a type: exposes static members and constructors to scripts
    Type(HostType),
}

impl Value {
    /// Default value for a slot of type `ty` (zero for primitives, null otherwise)
    pub fn default_for(ty: &HostType) -> Value {
        match ty.kind() {
            TypeKind::Primitive(kind) => match kind {
                PrimitiveKind::Boolean => Value::Bool(false),
                PrimitiveKind::Byte => Value::Byte(0),
                PrimitiveKind::Short => Value::Short(0),
                PrimitiveKind::Char => Value::Char(0),
                PrimitiveKind::Int => Value::Int(0),
                PrimitiveKind::Long => Value::Long(0),
                PrimitiveKind::Float => Value::Float(0.0),
                PrimitiveKind::Double => Value::Double(0.0),
                PrimitiveKind::Void => Value::Undefined,
            },
            _ => Value::Null,
        }
    }

    /// Create a string value
    pub fn string(s: impl Into<Arc<str>>) -> Value {
        Value::String(s.into())
    }

    /// Host runtime type of the value, if it has one
    pub fn host_type(&self) -> Option<HostType> {
        let ty = match self {
            Value::Bool(_) => builtins::boolean_box(),
            Value::Byte(_) => builtins::byte_box(),
            Value::Short(_) => builtins::short_box(),
            Value::Char(_) => builtins::character(),
            Value::Int(_) => builtins::integer(),
            Value::Long(_) => builtins::long_box(),
            Value::Float(_) => builtins::float_box(),
            Value::Double(_) => builtins::double_box(),
            Value::LargeInt(_) => builtins::large_integer(),
            Value::String(_) => builtins::string(),
            Value::Class(_) => builtins::class(),
            Value::Host(object) => return Some(object.class().clone()),
            Value::Array(array) => return Some(array.array_type().clone()),
            Value::Undefined
            | Value::ScriptNull
            | Value::Null
            | Value::LazyString(_)
            | Value::Script(_)
            | Value::Type(_) => return None,
        };
        Some(ty.clone())
    }

    /// Whether the value is a (non-null) instance of `ty`
    pub fn is_instance_of(&self, ty: &HostType) -> bool {
        match self {
            Value::Null => false,
            Value::LazyString(_) => ty.is_root() || ty == builtins::char_sequence(),
            Value::Undefined | Value::ScriptNull | Value::Script(_) | Value::Type(_) => {
                ty.is_root()
            }
            _ => self
                .host_type()
                .map_or(false, |actual| ty.is_assignable_from(&actual)),
        }
    }

    /// Short description used in error messages
    pub fn type_name(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::ScriptNull | Value::Null => "null".to_string(),
            Value::LazyString(_) => "string".to_string(),
            Value::Script(_) => "script object".to_string(),
            Value::Type(ty) => format!("type {}", ty.name()),
            _ => self
                .host_type()
                .map(|ty| ty.name().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }

    /// Script `undefined`, script `null` or host null
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::ScriptNull | Value::Null)
    }

    /// Boxed number of any width
    pub fn is_number(&self) -> bool {
        matches!(
            self,
            Value::Byte(_)
                | Value::Short(_)
                | Value::Int(_)
                | Value::Long(_)
                | Value::Float(_)
                | Value::Double(_)
                | Value::LargeInt(_)
        )
    }

    /// Numeric value widened to `f64`
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Byte(v) => Some(v as f64),
            Value::Short(v) => Some(v as f64),
            Value::Int(v) => Some(v as f64),
            Value::Long(v) | Value::LargeInt(v) => Some(v as f64),
            Value::Float(v) => Some(v as f64),
            Value::Double(v) => Some(v),
            _ => None,
        }
    }

    /// Numeric value as `i64`, truncating floating point values toward zero
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Byte(v) => Some(v as i64),
            Value::Short(v) => Some(v as i64),
            Value::Int(v) => Some(v as i64),
            Value::Long(v) | Value::LargeInt(v) => Some(v),
            Value::Float(v) => Some(v as i64),
            Value::Double(v) => Some(v as i64),
            _ => None,
        }
    }

    /// Borrow a flat string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow a host object
    pub fn as_host_object(&self) -> Option<&HostObject> {
        match self {
            Value::Host(object) => Some(object),
            _ => None,
        }
    }

    /// Borrow a host array
    pub fn as_array(&self) -> Option<&HostArray> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    /// Primitives compare by value (floats bitwise), references by identity
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined)
            | (Value::ScriptNull, Value::ScriptNull)
            | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::LargeInt(a), Value::LargeInt(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::LazyString(a), Value::LazyString(b)) => Arc::ptr_eq(&a.0, &b.0),
            (Value::Script(a), Value::Script(b)) => a.ptr_eq(b),
            (Value::Host(a), Value::Host(b)) => a.ptr_eq(b),
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Class(a), Value::Class(b)) => a == b,
            (Value::Type(a), Value::Type(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(Arc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(Arc::from(v))
    }
}

impl From<HostObject> for Value {
    fn from(v: HostObject) -> Self {
        Value::Host(v)
    }
}

impl From<HostArray> for Value {
    fn from(v: HostArray) -> Self {
        Value::Array(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boxed_runtime_types() {
        assert_eq!(Value::Int(1).host_type().as_ref(), Some(builtins::integer()));
        assert_eq!(Value::Double(1.0).host_type().as_ref(), Some(builtins::double_box()));
        assert!(Value::Undefined.host_type().is_none());
    }

    #[test]
    fn test_script_values_are_only_roots() {
        assert!(Value::Undefined.is_instance_of(builtins::object()));
        assert!(Value::ScriptNull.is_instance_of(builtins::object()));
        assert!(!Value::Undefined.is_instance_of(builtins::string()));
        assert!(!Value::Null.is_instance_of(builtins::object()));
    }

    #[test]
    fn test_lazy_string_is_char_sequence() {
        let lazy = LazyString::new(["ab", "cd"]);
        assert!(!lazy.is_flat());
        let value = Value::LazyString(lazy.clone());
        assert!(value.is_instance_of(builtins::char_sequence()));
        assert!(!value.is_instance_of(builtins::string()));
        assert_eq!(&*lazy.flatten(), "abcd");
        assert!(lazy.is_flat());
    }

    #[test]
    fn test_float_equality_is_bitwise() {
        assert_eq!(Value::Double(f64::NAN), Value::Double(f64::NAN));
        assert_ne!(Value::Double(0.0), Value::Double(-0.0));
        assert_ne!(Value::Int(5), Value::Double(5.0));
    }
}
