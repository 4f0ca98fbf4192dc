//! Catalog members and accessors

use std::fmt;
use std::sync::Arc;

use trellis_host::{
    builtins, HostConstructor, HostField, HostMethod, HostType, InteropError, InteropResult,
    Value,
};

/// A callable member exposed to scripts
#[derive(Clone)]
pub enum HostMember {
    /// Single method
    Method(Arc<HostMethod>),
    /// Single constructor
    Constructor(Arc<HostConstructor>),
    /// Field read
    FieldGetter(Arc<HostField>),
    /// Field write
    FieldSetter(Arc<HostField>),
    /// Overload set sharing one name
    Overloaded(Arc<[HostMember]>),
}

impl HostMember {
    /// Collapse a list of members into one member
    ///
    /// Returns `None` for an empty list.
    pub fn from_overloads(mut members: Vec<HostMember>) -> Option<HostMember> {
        match members.len() {
            0 => None,
            1 => members.pop(),
            _ => Some(HostMember::Overloaded(members.into())),
        }
    }

    /// Member name (`<init>` for constructors)
    pub fn name(&self) -> &str {
        match self {
            HostMember::Method(m) => m.name(),
            HostMember::Constructor(_) => "<init>",
            HostMember::FieldGetter(f) | HostMember::FieldSetter(f) => f.name(),
            HostMember::Overloaded(list) => list.first().map_or("", HostMember::name),
        }
    }

    /// Fully qualified name of the declaring type
    pub fn declaring_name(&self) -> String {
        match self {
            HostMember::Method(m) => m.declaring_name().to_string(),
            HostMember::Constructor(c) => c.declaring_name().to_string(),
            HostMember::FieldGetter(f) | HostMember::FieldSetter(f) => f
                .declaring_type()
                .map(|ty| ty.name().to_string())
                .unwrap_or_default(),
            HostMember::Overloaded(list) => list
                .first()
                .map(HostMember::declaring_name)
                .unwrap_or_default(),
        }
    }

    /// Members without a receiver (constructors count as static)
    pub fn is_static(&self) -> bool {
        match self {
            HostMember::Method(m) => m.is_static(),
            HostMember::Constructor(_) => true,
            HostMember::FieldGetter(f) | HostMember::FieldSetter(f) => f.is_static(),
            HostMember::Overloaded(list) => list.iter().all(HostMember::is_static),
        }
    }

    /// Parameter types (empty for getters and overload sets)
    pub fn params(&self) -> &[HostType] {
        match self {
            HostMember::Method(m) => m.params(),
            HostMember::Constructor(c) => c.params(),
            HostMember::FieldGetter(_) | HostMember::Overloaded(_) => &[],
            HostMember::FieldSetter(f) => std::slice::from_ref(f.field_type()),
        }
    }

    /// Type of the value the member produces
    pub fn return_type(&self) -> HostType {
        match self {
            HostMember::Method(m) => m.return_type().clone(),
            HostMember::Constructor(c) => c
                .declaring_type()
                .unwrap_or_else(|| builtins::object().clone()),
            HostMember::FieldGetter(f) => f.field_type().clone(),
            HostMember::FieldSetter(_) => builtins::void().clone(),
            HostMember::Overloaded(_) => builtins::object().clone(),
        }
    }

    /// Variable arity member
    pub fn is_varargs(&self) -> bool {
        match self {
            HostMember::Method(m) => m.is_varargs(),
            HostMember::Constructor(c) => c.is_varargs(),
            _ => false,
        }
    }

    /// Compiler-generated member, deprioritized in tie-breaks
    pub fn is_bridge(&self) -> bool {
        match self {
            HostMember::Method(m) => m.is_bridge(),
            HostMember::Constructor(c) => c.is_bridge(),
            _ => false,
        }
    }

    /// Human readable signature
    pub fn signature(&self) -> String {
        match self {
            HostMember::Method(m) => m.signature(),
            HostMember::Constructor(c) => c.signature(),
            HostMember::FieldGetter(f) => format!(
                "{} {}.{}",
                f.field_type().simple_name(),
                self.declaring_name(),
                f.name()
            ),
            HostMember::FieldSetter(f) => format!(
                "void {}.{}={}",
                self.declaring_name(),
                f.name(),
                f.field_type().simple_name()
            ),
            HostMember::Overloaded(list) => list
                .iter()
                .map(HostMember::signature)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Single members of this member (itself unless it is an overload set)
    pub fn candidates(&self) -> Vec<HostMember> {
        match self {
            HostMember::Overloaded(list) => list.to_vec(),
            single => vec![single.clone()],
        }
    }

    /// Invoke with already converted arguments
    pub fn invoke(&self, receiver: &Value, args: &[Value]) -> InteropResult<Value> {
        match self {
            HostMember::Method(m) => m.invoke(receiver, args),
            HostMember::Constructor(c) => c.new_instance(args),
            HostMember::FieldGetter(f) => f.get(receiver),
            HostMember::FieldSetter(f) => {
                let value = args.first().cloned().unwrap_or(Value::Null);
                f.set(receiver, value)?;
                Ok(Value::Undefined)
            }
            HostMember::Overloaded(_) => Err(InteropError::UnsupportedOperation(format!(
                "{} must be resolved against arguments before invocation",
                self.name()
            ))),
        }
    }

    /// Identity comparison of the underlying member
    pub fn same_member(&self, other: &HostMember) -> bool {
        match (self, other) {
            (HostMember::Method(a), HostMember::Method(b)) => Arc::ptr_eq(a, b),
            (HostMember::Constructor(a), HostMember::Constructor(b)) => Arc::ptr_eq(a, b),
            (HostMember::FieldGetter(a), HostMember::FieldGetter(b))
            | (HostMember::FieldSetter(a), HostMember::FieldSetter(b)) => Arc::ptr_eq(a, b),
            (HostMember::Overloaded(a), HostMember::Overloaded(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for HostMember {
    fn eq(&self, other: &Self) -> bool {
        self.same_member(other)
    }
}

impl fmt::Debug for HostMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostMember::Overloaded(list) => f.debug_list().entries(list.iter()).finish(),
            single => write!(f, "HostMember({})", single.signature()),
        }
    }
}

// ============================================================================
// Accessors
// ============================================================================

/// Property read
#[derive(Clone, Debug)]
pub enum Getter {
    /// Public field
    Field(Arc<HostField>),
    /// Bean getter method (`getX`/`isX`)
    Method(HostMember),
    /// Element count of an array
    ArrayLength,
    /// Element count of a list-like object via its `size` method
    ListLength(Arc<HostMethod>),
    /// Static `class` property: the type mirror
    TypeMirror(HostType),
    /// Instance `static` property of a type mirror: the static view
    StaticView,
}

impl Getter {
    /// Read the property from `receiver` (ignored for static properties)
    pub fn get(&self, receiver: &Value) -> InteropResult<Value> {
        match self {
            Getter::Field(field) => field.get(receiver),
            Getter::Method(member) => member.invoke(receiver, &[]),
            Getter::ArrayLength => receiver
                .as_array()
                .map(|array| Value::Int(array.len() as i32))
                .ok_or_else(|| InteropError::TypeMismatch {
                    expected: "array".to_string(),
                    actual: receiver.type_name(),
                }),
            Getter::ListLength(size) => size.invoke(receiver, &[]),
            Getter::TypeMirror(ty) => Ok(Value::Class(ty.clone())),
            Getter::StaticView => match receiver {
                Value::Class(ty) => Ok(Value::Type(ty.clone())),
                other => Err(InteropError::TypeMismatch {
                    expected: builtins::class().name().to_string(),
                    actual: other.type_name(),
                }),
            },
        }
    }

    /// Type of the produced value
    pub fn value_type(&self) -> HostType {
        match self {
            Getter::Field(field) => field.field_type().clone(),
            Getter::Method(member) => member.return_type(),
            Getter::ArrayLength => builtins::int().clone(),
            Getter::ListLength(size) => size.return_type().clone(),
            Getter::TypeMirror(_) => builtins::class().clone(),
            Getter::StaticView => builtins::object().clone(),
        }
    }
}

/// Property write
#[derive(Clone, Debug)]
pub enum Setter {
    /// Public non-final field
    Field(Arc<HostField>),
    /// Bean setter method(s) (`setX`)
    Method(HostMember),
}

impl Setter {
    /// Destination type for a single setter; `None` for overloaded setters
    pub fn value_type(&self) -> Option<HostType> {
        match self {
            Setter::Field(field) => Some(field.field_type().clone()),
            Setter::Method(HostMember::Overloaded(_)) => None,
            Setter::Method(member) => member.params().first().cloned(),
        }
    }

    /// Write an already converted value
    pub fn set(&self, receiver: &Value, value: Value) -> InteropResult<()> {
        match self {
            Setter::Field(field) => field.set(receiver, value),
            Setter::Method(member) => member.invoke(receiver, &[value]).map(|_| ()),
        }
    }
}

/// Getter and setter registered under one property name
#[derive(Clone, Debug, Default)]
pub struct AccessorPair {
    /// Read side
    pub getter: Option<Getter>,
    /// Write side
    pub setter: Option<Setter>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_host::{ClassBuilder, FieldDefinition, HostArray, MethodDefinition};

    #[test]
    fn test_overload_collapse() {
        let ty = ClassBuilder::class("demo.Printer")
            .method(MethodDefinition::new("print").param(builtins::int()).body(|_, _| Ok(Value::Undefined)))
            .method(MethodDefinition::new("print").param(builtins::string()).body(|_, _| Ok(Value::Undefined)))
            .build();
        let members: Vec<_> = ty
            .declared_methods()
            .iter()
            .cloned()
            .map(HostMember::Method)
            .collect();
        let merged = HostMember::from_overloads(members).unwrap();
        assert_eq!(merged.candidates().len(), 2);
        assert_eq!(merged.name(), "print");
        assert!(merged.invoke(&Value::Undefined, &[]).is_err());
        assert!(HostMember::from_overloads(Vec::new()).is_none());
    }

    #[test]
    fn test_field_members() {
        let ty = ClassBuilder::class("demo.Box")
            .field(FieldDefinition::new("size", builtins::int()))
            .build();
        let field = ty.declared_fields()[0].clone();
        let object = Value::Host(trellis_host::HostObject::new(&ty));
        let setter = HostMember::FieldSetter(field.clone());
        assert_eq!(setter.params(), &[builtins::int().clone()]);
        setter.invoke(&object, &[Value::Int(3)]).unwrap();
        let getter = HostMember::FieldGetter(field);
        assert_eq!(getter.invoke(&object, &[]).unwrap(), Value::Int(3));
        assert_eq!(getter.signature(), "int demo.Box.size");
    }

    #[test]
    fn test_synthesized_getters() {
        let array = Value::Array(HostArray::with_length(builtins::int(), 4));
        assert_eq!(Getter::ArrayLength.get(&array).unwrap(), Value::Int(4));
        let mirror = Getter::TypeMirror(builtins::string().clone());
        let class_value = mirror.get(&Value::Undefined).unwrap();
        assert_eq!(class_value, Value::Class(builtins::string().clone()));
        assert_eq!(
            Getter::StaticView.get(&class_value).unwrap(),
            Value::Type(builtins::string().clone())
        );
    }
}
