//! Runtime services used by generated adapter bodies

use std::sync::Arc;
use std::thread::ThreadId;

use trellis_host::{ContextToken, HostType, InteropError, InteropResult, ScriptRuntime, Value};

use crate::convert::primitive::identity_accepts;
use crate::convert::{host_to_script, ConversionEnv, Converter, LazySerialConverter, Tier};

/// Name whose inherited definition is ignored when looking up delegates
pub const TO_STRING: &str = "toString";

/// Fetch a callable member named `name` from a behavior object
///
/// Non-callable members count as absent. With `hide_inherited_to_string`, an inherited
/// `toString` is ignored so that every behavior object does not override it by accident.
pub fn get_function(
    runtime: &dyn ScriptRuntime,
    object: &Value,
    name: &str,
    hide_inherited_to_string: bool,
) -> InteropResult<Option<Value>> {
    if hide_inherited_to_string && name == TO_STRING && !runtime.has_own_member(object, name) {
        return Ok(None);
    }
    let member = runtime.get_member(object, name)?;
    Ok(runtime.is_callable(&member).then_some(member))
}

// ============================================================================
// Trampoline
// ============================================================================

/// Scoped execution context; the previous context is restored on drop
pub struct ContextGuard<'a> {
    runtime: &'a dyn ScriptRuntime,
    previous: Option<ContextToken>,
}

impl<'a> ContextGuard<'a> {
    /// Enter the runtime's context
    pub fn enter(runtime: &'a dyn ScriptRuntime) -> Self {
        let previous = runtime.enter_context();
        Self {
            runtime,
            previous: Some(previous),
        }
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.runtime.leave_context(previous);
        }
    }
}

/// Call a script callable inside the runtime's execution context
pub fn call_script(
    runtime: &dyn ScriptRuntime,
    callable: &Value,
    receiver: &Value,
    args: &[Value],
) -> InteropResult<Value> {
    let _context = ContextGuard::enter(runtime);
    runtime.call(callable, receiver, args)
}

/// Host arguments in script representation; a variable arity tail array is spread
pub fn to_script_args(args: &[Value], varargs: bool) -> Vec<Value> {
    let mut out = Vec::with_capacity(args.len());
    match (varargs, args.split_last()) {
        (true, Some((Value::Array(tail), fixed))) => {
            out.extend(fixed.iter().cloned().map(host_to_script));
            out.extend(tail.to_vec().into_iter().map(host_to_script));
        }
        _ => out.extend(args.iter().cloned().map(host_to_script)),
    }
    out
}

/// Fail with `CrossThreadAccess` unless running on `owner`
pub fn check_thread(owner: ThreadId, type_name: &str) -> InteropResult<()> {
    if std::thread::current().id() == owner {
        return Ok(());
    }
    tracing::error!(
        adapter = type_name,
        owner = ?owner,
        current = ?std::thread::current().id(),
        "single-threaded adapter entered from a foreign thread"
    );
    Err(InteropError::CrossThreadAccess {
        type_name: type_name.to_string(),
    })
}

// ============================================================================
// Script call handles
// ============================================================================

/// Calls a script delegate on behalf of a host method with a fixed signature
///
/// Arguments are converted to script representation (spreading a variable arity tail) and
/// the result is forced toward the declared return type.
pub struct ScriptCallHandle {
    return_type: HostType,
    varargs: bool,
    result: Option<LazySerialConverter>,
    runtime: Arc<dyn ScriptRuntime>,
}

impl ScriptCallHandle {
    /// Handle for a method returning `return_type`
    pub fn new(env: &ConversionEnv, return_type: &HostType, varargs: bool) -> Self {
        let result = (!return_type.is_void()).then(|| {
            LazySerialConverter::from_factories(return_type, Tier::Forcing.factories(), env)
        });
        Self {
            return_type: return_type.clone(),
            varargs,
            result,
            runtime: env.runtime().clone(),
        }
    }

    /// Declared return type
    pub fn return_type(&self) -> &HostType {
        &self.return_type
    }

    /// Invoke `callable` with host arguments and convert the result back
    pub fn invoke(&self, callable: &Value, receiver: &Value, args: &[Value]) -> InteropResult<Value> {
        let script_args = to_script_args(args, self.varargs);
        let result = call_script(self.runtime.as_ref(), callable, receiver, &script_args)?;
        self.from_script(result)
    }

    /// Convert a script result toward the return type
    pub fn from_script(&self, result: Value) -> InteropResult<Value> {
        let Some(converter) = &self.result else {
            return Ok(Value::Undefined);
        };
        let converted = converter.convert(result)?;
        if identity_accepts(&self.return_type, &converted) {
            Ok(converted)
        } else {
            Err(InteropError::TypeMismatch {
                expected: self.return_type.name().to_string(),
                actual: converted.type_name(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_host::{builtins, HostArray, MemoryRuntime};

    #[test]
    fn test_get_function_hides_inherited_to_string() {
        let runtime = MemoryRuntime::new();
        let plain = runtime.object();
        assert!(get_function(&runtime, &plain, "toString", true)
            .unwrap()
            .is_none());
        assert!(get_function(&runtime, &plain, "toString", false)
            .unwrap()
            .is_some());

        let own = runtime.object_from([(
            "toString",
            runtime.function(|_, _| Ok(Value::from("custom"))),
        )]);
        assert!(get_function(&runtime, &own, "toString", true)
            .unwrap()
            .is_some());

        let data = runtime.object_from([("run", Value::Int(1))]);
        assert!(get_function(&runtime, &data, "run", true).unwrap().is_none());
    }

    #[test]
    fn test_trampoline_restores_context() {
        let runtime = Arc::new(MemoryRuntime::new());
        let before = runtime.current_context();
        let inside = runtime.clone();
        let probe = runtime.function(move |_, _| Ok(Value::Long(inside.current_context().0 as i64)));
        let seen = call_script(runtime.as_ref(), &probe, &Value::Undefined, &[]).unwrap();
        assert_ne!(seen, Value::Long(before.0 as i64));
        assert_eq!(runtime.current_context(), before);
        assert_eq!(runtime.context_entries(), 1);
    }

    #[test]
    fn test_varargs_tail_is_spread() {
        let tail = HostArray::new(builtins::int(), vec![Value::Int(2), Value::Int(3)]);
        let args = to_script_args(&[Value::Null, Value::Array(tail)], true);
        assert_eq!(args, vec![Value::ScriptNull, Value::Int(2), Value::Int(3)]);
        let args = to_script_args(&[Value::Int(1)], false);
        assert_eq!(args, vec![Value::Int(1)]);
    }

    #[test]
    fn test_results_are_forced_toward_return_type() {
        let runtime = Arc::new(MemoryRuntime::new());
        let env = ConversionEnv::new(runtime.clone());
        let handle = ScriptCallHandle::new(&env, builtins::int(), false);
        assert_eq!(handle.from_script(Value::Double(7.9)).unwrap(), Value::Int(7));
        assert_eq!(handle.from_script(Value::from("12")).unwrap(), Value::Int(12));

        let void = ScriptCallHandle::new(&env, builtins::void(), false);
        assert_eq!(void.from_script(Value::Int(1)).unwrap(), Value::Undefined);

        let list = ScriptCallHandle::new(&env, builtins::list(), false);
        let err = list.from_script(Value::from("x")).unwrap_err();
        assert!(matches!(err, InteropError::TypeMismatch { .. }));
    }

    #[test]
    fn test_foreign_thread_is_fatal() {
        let owner = std::thread::current().id();
        assert!(check_thread(owner, "demo.Adapter").is_ok());
        let err = std::thread::spawn(move || check_thread(owner, "demo.Adapter"))
            .join()
            .unwrap()
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
