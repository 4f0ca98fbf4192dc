//! Script-to-host converters
//!
//! [`ScriptToHost`] wraps a factory and layers sentinel preprocessing ahead of its converter:
//!
//! | Destination                            | Preprocessing step              |
//! |----------------------------------------|---------------------------------|
//! | the root class                         | unwrap script-side host wrapper |
//! | supertypes of `String`, string parsers | flatten lazy strings            |
//! | supertypes of `Number`                 | large integer to double         |
//! | any reference type                     | script null to host null        |
//! | any reference type                     | `undefined` to host null        |
//!
//! The object-to-primitive factories defer to the runtime's own coercions.

use std::sync::Arc;

use trellis_host::{
    builtins, HostType, InteropError, InteropResult, PrimitiveHint, PrimitiveKind, Value,
};

use super::combinator::{CombineConverter, OptionalConverter};
use super::primitive::narrow;
use super::{conversion_error, target_kind, ConversionEnv, Converter, ConverterFactory};

/// Convert a host value into its script representation
pub fn host_to_script(value: Value) -> Value {
    match value {
        Value::Null => Value::ScriptNull,
        other => other,
    }
}

/// Value as seen by a wrapped factory's applicability check
fn preprocess(value: &Value) -> Value {
    match value {
        Value::LazyString(s) => Value::String(s.flatten()),
        Value::ScriptNull => Value::Null,
        other => other.clone(),
    }
}

// ============================================================================
// Preprocessing converters
// ============================================================================

struct LazyStringConverter;

impl Converter for LazyStringConverter {
    fn guard(&self, value: &Value) -> bool {
        matches!(value, Value::LazyString(_))
    }

    fn convert(&self, value: Value) -> InteropResult<Value> {
        match value {
            Value::LazyString(s) => Ok(Value::String(s.flatten())),
            other => Ok(other),
        }
    }
}

struct LargeIntConverter;

impl Converter for LargeIntConverter {
    fn guard(&self, value: &Value) -> bool {
        matches!(value, Value::LargeInt(_))
    }

    fn convert(&self, value: Value) -> InteropResult<Value> {
        match value {
            Value::LargeInt(i) => Ok(Value::Double(i as f64)),
            other => Ok(other),
        }
    }
}

struct ScriptNullConverter;

impl Converter for ScriptNullConverter {
    fn guard(&self, value: &Value) -> bool {
        matches!(value, Value::ScriptNull)
    }

    fn convert(&self, _value: Value) -> InteropResult<Value> {
        Ok(Value::Null)
    }
}

struct UndefinedConverter;

impl Converter for UndefinedConverter {
    fn guard(&self, value: &Value) -> bool {
        matches!(value, Value::Undefined)
    }

    fn convert(&self, _value: Value) -> InteropResult<Value> {
        Ok(Value::Null)
    }
}

struct HostUnwrapConverter {
    env: ConversionEnv,
}

impl Converter for HostUnwrapConverter {
    fn guard(&self, value: &Value) -> bool {
        self.env.runtime().unwrap_host(value).is_some()
    }

    fn convert(&self, value: Value) -> InteropResult<Value> {
        Ok(self.env.runtime().unwrap_host(&value).unwrap_or(value))
    }
}

// ============================================================================
// ScriptToHost
// ============================================================================

/// Wraps a factory with the script sentinel preprocessing layers
pub(crate) struct ScriptToHost(pub(crate) &'static dyn ConverterFactory);

impl ConverterFactory for ScriptToHost {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn accepts(&self, dest: &HostType) -> bool {
        self.0.accepts(dest)
    }

    fn accepts_value(&self, dest: &HostType, value: &Value, env: &ConversionEnv) -> bool {
        self.0.accepts_value(dest, &preprocess(value), env)
    }

    fn make(&self, dest: &HostType, env: &ConversionEnv) -> Arc<dyn Converter> {
        let nested = self.0;
        let mut converter = nested.make(dest, env);
        if dest.is_root() {
            converter = Arc::new(OptionalConverter::new(
                Arc::new(HostUnwrapConverter { env: env.clone() }),
                converter,
            ));
        }
        if dest.is_assignable_from(builtins::string()) || nested.parses_strings() {
            converter = Arc::new(OptionalConverter::new(Arc::new(LazyStringConverter), converter));
        }
        if dest.is_assignable_from(builtins::number()) && !nested.parses_strings() {
            converter = Arc::new(OptionalConverter::new(Arc::new(LargeIntConverter), converter));
        }
        if !dest.is_primitive() {
            converter = Arc::new(OptionalConverter::new(Arc::new(ScriptNullConverter), converter));
            converter = Arc::new(OptionalConverter::new(Arc::new(UndefinedConverter), converter));
        }
        converter
    }

    fn parses_strings(&self) -> bool {
        self.0.parses_strings()
    }
}

// ============================================================================
// Host wrappers
// ============================================================================

/// Unwraps script-side host wrappers before applying the nested factory
pub(crate) struct HostWrapperFactory(pub(crate) &'static dyn ConverterFactory);

impl ConverterFactory for HostWrapperFactory {
    fn name(&self) -> &'static str {
        "host-wrapper"
    }

    fn accepts(&self, dest: &HostType) -> bool {
        !dest.is_primitive() && self.0.accepts(dest)
    }

    fn accepts_value(&self, dest: &HostType, value: &Value, env: &ConversionEnv) -> bool {
        env.runtime()
            .unwrap_host(value)
            .map_or(false, |inner| self.0.accepts_value(dest, &inner, env))
    }

    fn make(&self, dest: &HostType, env: &ConversionEnv) -> Arc<dyn Converter> {
        Arc::new(CombineConverter::new(
            Arc::new(HostUnwrapConverter { env: env.clone() }),
            self.0.make(dest, env),
        ))
    }
}

// ============================================================================
// Functional adaptation
// ============================================================================

/// Script callable toward a function-constructible abstract type
pub(crate) struct SamTypeFactory;

impl ConverterFactory for SamTypeFactory {
    fn name(&self) -> &'static str {
        "functional"
    }

    fn accepts(&self, dest: &HostType) -> bool {
        dest.is_abstract() && !dest.is_array() && !dest.is_primitive()
    }

    fn accepts_value(&self, dest: &HostType, value: &Value, env: &ConversionEnv) -> bool {
        self.accepts(dest)
            && env.runtime().is_callable(value)
            && env
                .functional()
                .map_or(false, |adapters| adapters.is_function_constructible(dest))
    }

    fn make(&self, dest: &HostType, env: &ConversionEnv) -> Arc<dyn Converter> {
        Arc::new(SamTypeConverter {
            dest: dest.clone(),
            env: env.clone(),
        })
    }
}

struct SamTypeConverter {
    dest: HostType,
    env: ConversionEnv,
}

impl Converter for SamTypeConverter {
    fn guard(&self, value: &Value) -> bool {
        self.env.runtime().is_callable(value)
    }

    fn convert(&self, value: Value) -> InteropResult<Value> {
        let adapters = self.env.functional().ok_or_else(|| {
            InteropError::UnsupportedOperation(format!(
                "functional adaptation to {} is not available",
                self.dest
            ))
        })?;
        adapters.adapt_function(&self.dest, value)
    }
}

// ============================================================================
// Object to primitive
// ============================================================================

/// Script object toward `String` via the runtime's ToString
pub(crate) struct ObjectToStringFactory;

impl ConverterFactory for ObjectToStringFactory {
    fn name(&self) -> &'static str {
        "object-to-string"
    }

    fn accepts(&self, dest: &HostType) -> bool {
        dest == builtins::string()
    }

    fn accepts_value(&self, dest: &HostType, value: &Value, env: &ConversionEnv) -> bool {
        self.accepts(dest) && env.runtime().is_object(value)
    }

    fn make(&self, _dest: &HostType, env: &ConversionEnv) -> Arc<dyn Converter> {
        Arc::new(ObjectToStringConverter { env: env.clone() })
    }
}

struct ObjectToStringConverter {
    env: ConversionEnv,
}

impl Converter for ObjectToStringConverter {
    fn guard(&self, value: &Value) -> bool {
        self.env.runtime().is_object(value)
    }

    fn convert(&self, value: Value) -> InteropResult<Value> {
        Ok(Value::String(self.env.runtime().to_string(&value)?))
    }
}

/// Script object (or null) toward `boolean`: true unless nullish
pub(crate) struct ObjectToBooleanFactory;

impl ConverterFactory for ObjectToBooleanFactory {
    fn name(&self) -> &'static str {
        "object-to-boolean"
    }

    fn accepts(&self, dest: &HostType) -> bool {
        target_kind(dest) == Some(PrimitiveKind::Boolean)
    }

    fn accepts_value(&self, dest: &HostType, value: &Value, env: &ConversionEnv) -> bool {
        self.accepts(dest) && (env.runtime().is_object(value) || matches!(value, Value::Null))
    }

    fn make(&self, _dest: &HostType, env: &ConversionEnv) -> Arc<dyn Converter> {
        Arc::new(ObjectToBooleanConverter { env: env.clone() })
    }
}

struct ObjectToBooleanConverter {
    env: ConversionEnv,
}

impl Converter for ObjectToBooleanConverter {
    fn guard(&self, value: &Value) -> bool {
        self.env.runtime().is_object(value) || value.is_nullish()
    }

    fn convert(&self, value: Value) -> InteropResult<Value> {
        Ok(Value::Bool(!value.is_nullish()))
    }
}

/// Script object toward a number via the runtime's ToNumber, then narrowed
pub(crate) struct ObjectToNumberFactory;

impl ConverterFactory for ObjectToNumberFactory {
    fn name(&self) -> &'static str {
        "object-to-number"
    }

    fn accepts(&self, dest: &HostType) -> bool {
        matches!(
            target_kind(dest),
            Some(
                PrimitiveKind::Double
                    | PrimitiveKind::Int
                    | PrimitiveKind::Float
                    | PrimitiveKind::Long
            )
        )
    }

    fn accepts_value(&self, dest: &HostType, value: &Value, env: &ConversionEnv) -> bool {
        self.accepts(dest) && env.runtime().is_object(value)
    }

    fn make(&self, dest: &HostType, env: &ConversionEnv) -> Arc<dyn Converter> {
        Arc::new(ObjectToNumberConverter {
            dest: dest.clone(),
            env: env.clone(),
        })
    }
}

struct ObjectToNumberConverter {
    dest: HostType,
    env: ConversionEnv,
}

impl Converter for ObjectToNumberConverter {
    fn guard(&self, value: &Value) -> bool {
        self.env.runtime().is_object(value)
    }

    fn convert(&self, value: Value) -> InteropResult<Value> {
        let runtime = self.env.runtime();
        let primitive = runtime.to_primitive(&value, PrimitiveHint::Number)?;
        let number = Value::Double(runtime.to_number(&primitive)?);
        target_kind(&self.dest)
            .and_then(|kind| narrow(kind, &number))
            .ok_or_else(|| conversion_error(0, &self.dest, &value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{convert_argument, find_converter, Tier};
    use trellis_host::{LazyString, MemoryRuntime, ScriptRuntime};

    fn setup() -> (Arc<MemoryRuntime>, ConversionEnv) {
        let rt = Arc::new(MemoryRuntime::new());
        let env = ConversionEnv::new(rt.clone());
        (rt, env)
    }

    #[test]
    fn test_undefined_becomes_host_null_for_references() {
        let (_, env) = setup();
        let converted =
            convert_argument(Value::Undefined, builtins::object(), Tier::Identity, &env);
        assert_eq!(converted.unwrap(), Value::Null);
    }

    #[test]
    fn test_lazy_string_is_flattened_for_strings() {
        let (_, env) = setup();
        let lazy = Value::LazyString(LazyString::new(["tre", "llis"]));
        let converted = convert_argument(lazy, builtins::string(), Tier::Identity, &env);
        assert_eq!(converted.unwrap(), Value::from("trellis"));
    }

    #[test]
    fn test_lazy_string_parses_at_forcing_tier() {
        let (_, env) = setup();
        let lazy = Value::LazyString(LazyString::new(["4", "2"]));
        assert!(convert_argument(lazy.clone(), builtins::int(), Tier::Default, &env).is_err());
        let converted = convert_argument(lazy, builtins::int(), Tier::Forcing, &env);
        assert_eq!(converted.unwrap(), Value::Int(42));
    }

    #[test]
    fn test_large_int_becomes_double_for_numbers() {
        let (_, env) = setup();
        let converted =
            convert_argument(Value::LargeInt(1 << 40), builtins::number(), Tier::Identity, &env);
        assert_eq!(converted.unwrap(), Value::Double((1u64 << 40) as f64));
    }

    #[test]
    fn test_host_wrapper_unwraps_at_default_tier() {
        let (rt, env) = setup();
        let wrapped = rt.host_wrapper(Value::from("inner"));
        assert!(find_converter(builtins::string(), &wrapped, Tier::Identity, &env).is_none());
        let converted = convert_argument(wrapped, builtins::string(), Tier::Default, &env);
        assert_eq!(converted.unwrap(), Value::from("inner"));
    }

    #[test]
    fn test_object_to_primitive_at_forcing_tier() {
        let (rt, env) = setup();
        let obj = rt.object_from([
            ("valueOf", rt.function(|_, _| Ok(Value::Double(7.8)))),
            ("toString", rt.function(|_, _| Ok(Value::from("seven")))),
        ]);
        let text = convert_argument(obj.clone(), builtins::string(), Tier::Forcing, &env);
        assert_eq!(text.unwrap(), Value::from("seven"));
        let number = convert_argument(obj.clone(), builtins::int(), Tier::Forcing, &env);
        assert_eq!(number.unwrap(), Value::Int(7));
        let flag = convert_argument(obj, builtins::boolean(), Tier::Forcing, &env);
        assert_eq!(flag.unwrap(), Value::Bool(true));
        let null_flag =
            convert_argument(Value::ScriptNull, builtins::boolean(), Tier::Forcing, &env);
        assert_eq!(null_flag.unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_callable_needs_functional_adapters() {
        let (rt, env) = setup();
        let callable = rt.function(|_, _| Ok(Value::Undefined));
        assert!(rt.is_callable(&callable));
        let runnable = trellis_host::ClassBuilder::interface("demo.Runnable")
            .method(trellis_host::MethodDefinition::new("run"))
            .build();
        assert!(find_converter(&runnable, &callable, Tier::Default, &env).is_none());
    }

    #[test]
    fn test_host_to_script_maps_null() {
        assert_eq!(host_to_script(Value::Null), Value::ScriptNull);
        assert_eq!(host_to_script(Value::Int(1)), Value::Int(1));
    }
}
