//! Host object and array instances

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::{InteropError, InteropResult};
use crate::types::HostType;
use crate::value::Value;

// ============================================================================
// HostObject
// ============================================================================

struct ObjectData {
    class: HostType,
    fields: RwLock<FxHashMap<String, Value>>,
    extension: OnceCell<Arc<dyn Any + Send + Sync>>,
}

/// Reference to an instance of a host class
///
/// Cloning the handle shares the instance; equality is identity.
#[derive(Clone)]
pub struct HostObject(Arc<ObjectData>);

impl HostObject {
    /// Allocate an instance with every instance field set to its initial value
    pub fn new(class: &HostType) -> Self {
        let mut fields = FxHashMap::default();
        let mut current = Some(class.clone());
        while let Some(ty) = current {
            for field in ty.declared_fields().iter().filter(|f| !f.is_static()) {
                fields
                    .entry(field.name().to_string())
                    .or_insert_with(|| field.initial_value().clone());
            }
            current = ty.superclass().cloned();
        }
        HostObject(Arc::new(ObjectData {
            class: class.clone(),
            fields: RwLock::new(fields),
            extension: OnceCell::new(),
        }))
    }

    /// Runtime class of the instance
    pub fn class(&self) -> &HostType {
        &self.0.class
    }

    /// Read an instance field by name
    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.0.fields.read().get(name).cloned()
    }

    /// Write an instance field by name
    pub fn set_field(&self, name: &str, value: Value) {
        self.0.fields.write().insert(name.to_string(), value);
    }

    /// Per-instance extension state attached by the embedding (set at most once)
    pub fn extension(&self) -> Option<&Arc<dyn Any + Send + Sync>> {
        self.0.extension.get()
    }

    /// Attach extension state; returns false if state was already attached
    pub fn set_extension(&self, state: Arc<dyn Any + Send + Sync>) -> bool {
        self.0.extension.set(state).is_ok()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &HostObject) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Stable identity hash for the lifetime of the instance
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:x}", self.0.class.simple_name(), self.identity())
    }
}

// ============================================================================
// HostArray
// ============================================================================

struct ArrayData {
    array_type: HostType,
    elements: RwLock<Vec<Value>>,
}

/// Fixed-size host array
#[derive(Clone)]
pub struct HostArray(Arc<ArrayData>);

impl HostArray {
    /// Create an array of `component` holding `elements`
    pub fn new(component: &HostType, elements: Vec<Value>) -> Self {
        HostArray(Arc::new(ArrayData {
            array_type: HostType::array_of(component),
            elements: RwLock::new(elements),
        }))
    }

    /// Create an array of `len` default values
    pub fn with_length(component: &HostType, len: usize) -> Self {
        let fill = Value::default_for(component);
        Self::new(component, vec![fill; len])
    }

    /// The array type, e.g. `int[]`
    pub fn array_type(&self) -> &HostType {
        &self.0.array_type
    }

    /// Element type
    pub fn component_type(&self) -> &HostType {
        // Array types always carry a component
        self.0
            .array_type
            .component_type()
            .unwrap_or(&self.0.array_type)
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.0.elements.read().len()
    }

    /// True if the array has no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.elements.read().get(index).cloned()
    }

    /// Replace the element at `index`
    pub fn set(&self, index: usize, value: Value) -> InteropResult<()> {
        let mut elements = self.0.elements.write();
        let len = elements.len();
        match elements.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(InteropError::host(
                self.0.array_type.name(),
                format!("index {index} out of bounds for length {len}"),
            )),
        }
    }

    /// Copy of all elements
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.elements.read().clone()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &HostArray) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for HostArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:?}", self.0.array_type.name(), self.0.elements.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{ClassBuilder, FieldDefinition};
    use crate::builtins;

    #[test]
    fn test_new_object_initializes_inherited_fields() {
        let base = ClassBuilder::class("demo.Base")
            .field(FieldDefinition::new("count", builtins::int()).initial_value(Value::Int(7)))
            .build();
        let derived = ClassBuilder::class("demo.Derived")
            .extends(&base)
            .field(FieldDefinition::new("label", builtins::string()))
            .build();
        let object = HostObject::new(&derived);
        assert_eq!(object.get_field("count"), Some(Value::Int(7)));
        assert_eq!(object.get_field("label"), Some(Value::Null));
    }

    #[test]
    fn test_extension_is_set_once() {
        let object = HostObject::new(builtins::object());
        assert!(object.set_extension(Arc::new(1u32)));
        assert!(!object.set_extension(Arc::new(2u32)));
        let stored = object.extension().and_then(|e| e.downcast_ref::<u32>());
        assert_eq!(stored, Some(&1));
    }

    #[test]
    fn test_array_bounds() {
        let array = HostArray::with_length(builtins::int(), 2);
        assert_eq!(array.get(0), Some(Value::Int(0)));
        assert!(array.set(1, Value::Int(4)).is_ok());
        assert!(array.set(2, Value::Int(4)).is_err());
        assert_eq!(array.to_vec(), vec![Value::Int(0), Value::Int(4)]);
    }
}
