//! In-memory scripting runtime
//!
//! A small prototype-based object model implementing [`ScriptRuntime`]. Embedders use it to
//! exercise host bindings without a full script engine, and the bridge's own tests run on it.
//! Coercions follow the usual dynamic-language rules (`valueOf`/`toString` for ToPrimitive,
//! empty string is falsy, unparsable strings become NaN).

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::builtins;
use crate::error::{InteropError, InteropResult};
use crate::runtime::{ContextToken, PrimitiveHint, ScriptRuntime};
use crate::value::{ScriptRef, Value};

/// Native implementation of a script function: `(this, arguments) -> result`
pub type NativeFunction = Arc<dyn Fn(&Value, &[Value]) -> InteropResult<Value> + Send + Sync>;

enum ObjectKind {
    Plain,
    Function(NativeFunction),
    HostWrapper(Value),
}

/// Script object stored behind a [`ScriptRef`]
pub struct ScriptObject {
    kind: ObjectKind,
    proto: Option<ScriptRef>,
    props: RwLock<FxHashMap<String, Value>>,
}

impl ScriptObject {
    fn new(kind: ObjectKind, proto: Option<ScriptRef>) -> Self {
        Self {
            kind,
            proto,
            props: RwLock::new(FxHashMap::default()),
        }
    }
}

fn as_object(value: &Value) -> Option<&ScriptObject> {
    match value {
        Value::Script(r) => r.downcast_ref::<ScriptObject>(),
        _ => None,
    }
}

/// Format a number the way scripts print it
pub fn number_to_string(d: f64) -> String {
    if d.is_nan() {
        "NaN".to_string()
    } else if d.is_infinite() {
        if d > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if d == d.trunc() && d.abs() < 1e21 {
        format!("{}", d as i64)
    } else {
        d.to_string()
    }
}

/// Parse a string the way scripts coerce it to a number
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return i64::from_str_radix(hex, 16).map_or(f64::NAN, |v| v as f64);
    }
    if trimmed
        .chars()
        .any(|c| !(c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')))
    {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// Prototype-based in-memory runtime
pub struct MemoryRuntime {
    object_prototype: ScriptRef,
    current_context: AtomicU64,
    next_context: AtomicU64,
    context_entries: AtomicUsize,
}

impl MemoryRuntime {
    /// Create a runtime whose object prototype provides `toString` and `valueOf`
    pub fn new() -> Self {
        let proto = ScriptRef::new(ScriptObject::new(ObjectKind::Plain, None));
        if let Some(obj) = proto.downcast_ref::<ScriptObject>() {
            let mut props = obj.props.write();
            props.insert(
                "toString".to_string(),
                Self::make_function(None, |_, _| Ok(Value::from("[object Object]"))),
            );
            props.insert(
                "valueOf".to_string(),
                Self::make_function(None, |this, _| Ok(this.clone())),
            );
        }
        Self {
            object_prototype: proto,
            current_context: AtomicU64::new(0),
            next_context: AtomicU64::new(1),
            context_entries: AtomicUsize::new(0),
        }
    }

    fn make_function<F>(proto: Option<ScriptRef>, f: F) -> Value
    where
        F: Fn(&Value, &[Value]) -> InteropResult<Value> + Send + Sync + 'static,
    {
        Value::Script(ScriptRef::new(ScriptObject::new(
            ObjectKind::Function(Arc::new(f)),
            proto,
        )))
    }

    /// The shared object prototype
    pub fn object_prototype(&self) -> Value {
        Value::Script(self.object_prototype.clone())
    }

    /// Create an empty plain object
    pub fn object(&self) -> Value {
        Value::Script(ScriptRef::new(ScriptObject::new(
            ObjectKind::Plain,
            Some(self.object_prototype.clone()),
        )))
    }

    /// Create a plain object with the given own properties
    pub fn object_from<'a, I>(&self, props: I) -> Value
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        let object = self.object();
        if let Some(obj) = as_object(&object) {
            let mut map = obj.props.write();
            for (name, value) in props {
                map.insert(name.to_string(), value);
            }
        }
        object
    }

    /// Create a plain object inheriting from `proto`
    pub fn object_with_proto(&self, proto: &Value) -> Value {
        let proto = match proto {
            Value::Script(r) => Some(r.clone()),
            _ => None,
        };
        Value::Script(ScriptRef::new(ScriptObject::new(ObjectKind::Plain, proto)))
    }

    /// Create a callable
    pub fn function<F>(&self, f: F) -> Value
    where
        F: Fn(&Value, &[Value]) -> InteropResult<Value> + Send + Sync + 'static,
    {
        Self::make_function(Some(self.object_prototype.clone()), f)
    }

    /// Wrap a host value so scripts can hold it as an object
    pub fn host_wrapper(&self, value: Value) -> Value {
        Value::Script(ScriptRef::new(ScriptObject::new(
            ObjectKind::HostWrapper(value),
            Some(self.object_prototype.clone()),
        )))
    }

    /// How many times a context was entered
    pub fn context_entries(&self) -> usize {
        self.context_entries.load(Ordering::SeqCst)
    }

    /// Currently active context
    pub fn current_context(&self) -> ContextToken {
        ContextToken(self.current_context.load(Ordering::SeqCst))
    }

    fn lookup(&self, object: &ScriptObject, name: &str) -> Option<Value> {
        if let Some(found) = object.props.read().get(name) {
            return Some(found.clone());
        }
        let mut proto = object.proto.clone();
        while let Some(current) = proto {
            let obj = current.downcast_ref::<ScriptObject>()?;
            if let Some(found) = obj.props.read().get(name) {
                return Some(found.clone());
            }
            proto = obj.proto.clone();
        }
        None
    }
}

impl Default for MemoryRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptRuntime for MemoryRuntime {
    fn is_callable(&self, value: &Value) -> bool {
        matches!(as_object(value), Some(ScriptObject { kind: ObjectKind::Function(_), .. }))
    }

    fn is_object(&self, value: &Value) -> bool {
        as_object(value).is_some()
    }

    fn get_member(&self, object: &Value, name: &str) -> InteropResult<Value> {
        match object {
            Value::Undefined | Value::ScriptNull | Value::Null => Err(InteropError::Script(
                format!("Cannot read property '{name}' of {}", object.type_name()),
            )),
            _ => Ok(as_object(object)
                .and_then(|obj| self.lookup(obj, name))
                .unwrap_or(Value::Undefined)),
        }
    }

    fn has_own_member(&self, object: &Value, name: &str) -> bool {
        as_object(object).map_or(false, |obj| obj.props.read().contains_key(name))
    }

    fn set_member(&self, object: &Value, name: &str, value: Value) -> InteropResult<()> {
        let obj = as_object(object).ok_or_else(|| {
            InteropError::Script(format!(
                "Cannot set property '{name}' on {}",
                object.type_name()
            ))
        })?;
        obj.props.write().insert(name.to_string(), value);
        Ok(())
    }

    fn enter_context(&self) -> ContextToken {
        let next = self.next_context.fetch_add(1, Ordering::SeqCst);
        self.context_entries.fetch_add(1, Ordering::SeqCst);
        ContextToken(self.current_context.swap(next, Ordering::SeqCst))
    }

    fn leave_context(&self, previous: ContextToken) {
        self.current_context.store(previous.0, Ordering::SeqCst);
    }

    fn call(&self, callable: &Value, receiver: &Value, args: &[Value]) -> InteropResult<Value> {
        match as_object(callable) {
            Some(ScriptObject {
                kind: ObjectKind::Function(f),
                ..
            }) => f(receiver, args),
            _ => Err(InteropError::Script(format!(
                "{} is not a function",
                callable.type_name()
            ))),
        }
    }

    fn to_string(&self, value: &Value) -> InteropResult<Arc<str>> {
        Ok(match value {
            Value::Undefined => Arc::from("undefined"),
            Value::ScriptNull | Value::Null => Arc::from("null"),
            Value::String(s) => s.clone(),
            Value::LazyString(s) => s.flatten(),
            Value::Double(d) => Arc::from(number_to_string(*d)),
            Value::Float(f) => Arc::from(number_to_string(f64::from(*f))),
            Value::Script(_) => {
                let primitive = self.to_primitive(value, PrimitiveHint::String)?;
                return self.to_string(&primitive);
            }
            other => Arc::from(builtins::describe(other)),
        })
    }

    fn to_boolean(&self, value: &Value) -> bool {
        match value {
            Value::Undefined | Value::ScriptNull | Value::Null => false,
            Value::Bool(b) => *b,
            Value::String(s) => !s.is_empty(),
            Value::LazyString(s) => !s.is_empty(),
            Value::Double(d) => *d != 0.0 && !d.is_nan(),
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            other => other.as_i64().map_or(true, |v| v != 0),
        }
    }

    fn to_number(&self, value: &Value) -> InteropResult<f64> {
        Ok(match value {
            Value::Undefined => f64::NAN,
            Value::ScriptNull | Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::String(s) => string_to_number(s),
            Value::LazyString(s) => string_to_number(&s.flatten()),
            Value::Script(_) => {
                let primitive = self.to_primitive(value, PrimitiveHint::Number)?;
                return self.to_number(&primitive);
            }
            other => other.as_f64().unwrap_or(f64::NAN),
        })
    }

    fn to_primitive(&self, value: &Value, hint: PrimitiveHint) -> InteropResult<Value> {
        if as_object(value).is_none() {
            return Ok(value.clone());
        }
        let order = match hint {
            PrimitiveHint::Number => ["valueOf", "toString"],
            PrimitiveHint::String => ["toString", "valueOf"],
        };
        for name in order {
            let method = self.get_member(value, name)?;
            if self.is_callable(&method) {
                let result = self.call(&method, value, &[])?;
                if !self.is_object(&result) {
                    return Ok(result);
                }
            }
        }
        Err(InteropError::Script(
            "Cannot convert object to primitive value".to_string(),
        ))
    }

    fn unwrap_host(&self, value: &Value) -> Option<Value> {
        match as_object(value) {
            Some(ScriptObject {
                kind: ObjectKind::HostWrapper(inner),
                ..
            }) => Some(inner.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prototype_lookup_and_own_members() {
        let rt = MemoryRuntime::new();
        let obj = rt.object_from([("answer", Value::Int(42))]);
        assert_eq!(rt.get_member(&obj, "answer").unwrap(), Value::Int(42));
        assert!(rt.is_callable(&rt.get_member(&obj, "toString").unwrap()));
        assert!(rt.has_own_member(&obj, "answer"));
        assert!(!rt.has_own_member(&obj, "toString"));
    }

    #[test]
    fn test_to_primitive_prefers_value_of_for_numbers() {
        let rt = MemoryRuntime::new();
        let obj = rt.object_from([
            ("valueOf", rt.function(|_, _| Ok(Value::Int(7)))),
            ("toString", rt.function(|_, _| Ok(Value::from("seven")))),
        ]);
        assert_eq!(rt.to_number(&obj).unwrap(), 7.0);
        assert_eq!(&*rt.to_string(&obj).unwrap(), "seven");
    }

    #[test]
    fn test_default_object_string() {
        let rt = MemoryRuntime::new();
        assert_eq!(&*rt.to_string(&rt.object()).unwrap(), "[object Object]");
        assert!(rt.to_number(&rt.object()).unwrap().is_nan());
    }

    #[test]
    fn test_context_enter_and_leave() {
        let rt = MemoryRuntime::new();
        let outer = rt.current_context();
        let previous = rt.enter_context();
        assert_eq!(previous, outer);
        assert_ne!(rt.current_context(), outer);
        rt.leave_context(previous);
        assert_eq!(rt.current_context(), outer);
        assert_eq!(rt.context_entries(), 1);
    }

    #[test]
    fn test_number_coercions() {
        assert_eq!(string_to_number("  12 "), 12.0);
        assert_eq!(string_to_number("0x1f"), 31.0);
        assert!(string_to_number("inf").is_nan());
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(number_to_string(5.0), "5");
        assert_eq!(number_to_string(5.7), "5.7");
    }

    #[test]
    fn test_host_wrapper_unwraps() {
        let rt = MemoryRuntime::new();
        let wrapped = rt.host_wrapper(Value::Int(3));
        assert_eq!(rt.unwrap_host(&wrapped), Some(Value::Int(3)));
        assert_eq!(rt.unwrap_host(&rt.object()), None);
    }
}
