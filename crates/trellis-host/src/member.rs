//! Host members: methods, constructors and fields with executable bodies

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{InteropError, InteropResult};
use crate::object::HostObject;
use crate::types::{HostType, Modifiers, WeakHostType};
use crate::value::Value;

/// Method implementation: `(receiver, arguments) -> result`
///
/// Static methods receive `Value::Undefined` as the receiver. Variable arity methods receive
/// their trailing arguments already packed into one array value.
pub type MethodBody = Arc<dyn Fn(&Value, &[Value]) -> InteropResult<Value> + Send + Sync>;

/// Constructor implementation: initializes a freshly allocated object
pub type ConstructorBody = Arc<dyn Fn(&HostObject, &[Value]) -> InteropResult<()> + Send + Sync>;

fn join_params(params: &[HostType]) -> String {
    params
        .iter()
        .map(|p| p.simple_name())
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Methods
// ============================================================================

/// A method declared on a host type
pub struct HostMethod {
    pub(crate) name: String,
    pub(crate) declaring: WeakHostType,
    pub(crate) declaring_name: String,
    pub(crate) modifiers: Modifiers,
    pub(crate) params: Vec<HostType>,
    pub(crate) return_type: HostType,
    pub(crate) body: Option<MethodBody>,
}

impl HostMethod {
    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declaring type, if it is still alive
    pub fn declaring_type(&self) -> Option<HostType> {
        self.declaring.upgrade()
    }

    /// Fully qualified name of the declaring type
    pub fn declaring_name(&self) -> &str {
        &self.declaring_name
    }

    /// Modifier flags
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Parameter types
    pub fn params(&self) -> &[HostType] {
        &self.params
    }

    /// Declared return type
    pub fn return_type(&self) -> &HostType {
        &self.return_type
    }

    /// Static method
    pub fn is_static(&self) -> bool {
        self.modifiers.is_static()
    }

    /// Abstract method
    pub fn is_abstract(&self) -> bool {
        self.modifiers.is_abstract()
    }

    /// Public method
    pub fn is_public(&self) -> bool {
        self.modifiers.is_public()
    }

    /// Protected method
    pub fn is_protected(&self) -> bool {
        self.modifiers.is_protected()
    }

    /// Final method
    pub fn is_final(&self) -> bool {
        self.modifiers.is_final()
    }

    /// Variable arity method; the last parameter is an array type
    pub fn is_varargs(&self) -> bool {
        self.modifiers.contains(Modifiers::VARARGS)
    }

    /// Bridge or otherwise compiler-generated method
    pub fn is_bridge(&self) -> bool {
        self.modifiers.contains(Modifiers::BRIDGE) || self.modifiers.contains(Modifiers::SYNTHETIC)
    }

    /// Whether the method carries an implementation
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Same name and parameter types
    pub fn matches(&self, name: &str, params: &[HostType]) -> bool {
        self.name == name && self.params == params
    }

    /// Same name and parameter types as `other`
    pub fn same_signature(&self, other: &HostMethod) -> bool {
        self.matches(&other.name, &other.params)
    }

    /// Human readable signature, e.g. `int demo.Calc.add(int, int)`
    pub fn signature(&self) -> String {
        format!(
            "{} {}.{}({})",
            self.return_type.simple_name(),
            self.declaring_name,
            self.name,
            join_params(&self.params)
        )
    }

    /// Invoke with virtual dispatch on the receiver's runtime type
    pub fn invoke(&self, receiver: &Value, args: &[Value]) -> InteropResult<Value> {
        if self.is_static() {
            return self.invoke_special(&Value::Undefined, args);
        }
        let runtime_type = receiver
            .host_type()
            .ok_or_else(|| InteropError::TypeMismatch {
                expected: self.declaring_name.clone(),
                actual: receiver.type_name(),
            })?;
        match runtime_type.find_method(&self.name, &self.params) {
            Some(target) => target.invoke_special(receiver, args),
            None => self.invoke_special(receiver, args),
        }
    }

    /// Invoke this exact implementation without dispatch
    pub fn invoke_special(&self, receiver: &Value, args: &[Value]) -> InteropResult<Value> {
        match &self.body {
            Some(body) => body(receiver, args),
            None => Err(InteropError::UnsupportedOperation(self.name.clone())),
        }
    }
}

impl fmt::Debug for HostMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostMethod({})", self.signature())
    }
}

// ============================================================================
// Constructors
// ============================================================================

/// A constructor declared on a host type
pub struct HostConstructor {
    pub(crate) declaring: WeakHostType,
    pub(crate) declaring_name: String,
    pub(crate) modifiers: Modifiers,
    pub(crate) params: Vec<HostType>,
    pub(crate) body: ConstructorBody,
}

impl HostConstructor {
    /// Declaring type, if it is still alive
    pub fn declaring_type(&self) -> Option<HostType> {
        self.declaring.upgrade()
    }

    /// Fully qualified name of the declaring type
    pub fn declaring_name(&self) -> &str {
        &self.declaring_name
    }

    /// Modifier flags
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Parameter types
    pub fn params(&self) -> &[HostType] {
        &self.params
    }

    /// Public constructor
    pub fn is_public(&self) -> bool {
        self.modifiers.is_public()
    }

    /// Protected constructor
    pub fn is_protected(&self) -> bool {
        self.modifiers.is_protected()
    }

    /// Variable arity constructor
    pub fn is_varargs(&self) -> bool {
        self.modifiers.contains(Modifiers::VARARGS)
    }

    /// Compiler-generated constructor
    pub fn is_bridge(&self) -> bool {
        self.modifiers.contains(Modifiers::SYNTHETIC)
    }

    /// Human readable signature, e.g. `demo.Point(int, int)`
    pub fn signature(&self) -> String {
        format!("{}({})", self.declaring_name, join_params(&self.params))
    }

    /// Run this constructor's body against an already allocated object
    pub fn initialize(&self, object: &HostObject, args: &[Value]) -> InteropResult<()> {
        (self.body)(object, args)
    }

    /// Allocate an instance of the declaring type and initialize it
    pub fn new_instance(&self, args: &[Value]) -> InteropResult<Value> {
        let ty = self.declaring_type().ok_or_else(|| {
            InteropError::host(self.declaring_name.clone(), "type is no longer loaded")
        })?;
        if ty.is_abstract() {
            return Err(InteropError::host(
                ty.name(),
                "cannot instantiate an abstract type",
            ));
        }
        let object = HostObject::new(&ty);
        self.initialize(&object, args)?;
        Ok(Value::Host(object))
    }
}

impl fmt::Debug for HostConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostConstructor({})", self.signature())
    }
}

// ============================================================================
// Fields
// ============================================================================

/// A field declared on a host type
pub struct HostField {
    pub(crate) name: String,
    pub(crate) declaring: WeakHostType,
    pub(crate) declaring_name: String,
    pub(crate) modifiers: Modifiers,
    pub(crate) ty: HostType,
    pub(crate) initial: Value,
    /// Storage for static fields
    pub(crate) static_value: RwLock<Value>,
}

impl HostField {
    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declaring type, if it is still alive
    pub fn declaring_type(&self) -> Option<HostType> {
        self.declaring.upgrade()
    }

    /// Modifier flags
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Field type
    pub fn field_type(&self) -> &HostType {
        &self.ty
    }

    /// Static field
    pub fn is_static(&self) -> bool {
        self.modifiers.is_static()
    }

    /// Final field (no setter)
    pub fn is_final(&self) -> bool {
        self.modifiers.is_final()
    }

    /// Public field
    pub fn is_public(&self) -> bool {
        self.modifiers.is_public()
    }

    /// Value a fresh instance starts with
    pub fn initial_value(&self) -> &Value {
        &self.initial
    }

    /// Read the field
    pub fn get(&self, receiver: &Value) -> InteropResult<Value> {
        if self.is_static() {
            return Ok(self.static_value.read().clone());
        }
        let object = self.instance(receiver)?;
        Ok(object
            .get_field(&self.name)
            .unwrap_or_else(|| self.initial.clone()))
    }

    /// Write the field
    pub fn set(&self, receiver: &Value, value: Value) -> InteropResult<()> {
        if self.is_final() {
            return Err(InteropError::host(
                self.declaring_name.clone(),
                format!("field {} is final", self.name),
            ));
        }
        if self.is_static() {
            *self.static_value.write() = value;
            return Ok(());
        }
        self.instance(receiver)?.set_field(&self.name, value);
        Ok(())
    }

    fn instance<'a>(&self, receiver: &'a Value) -> InteropResult<&'a HostObject> {
        receiver
            .as_host_object()
            .ok_or_else(|| InteropError::TypeMismatch {
                expected: self.declaring_name.clone(),
                actual: receiver.type_name(),
            })
    }
}

impl fmt::Debug for HostField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostField({}.{})", self.declaring_name, self.name)
    }
}
