//! Integration tests for the converter tiers

use std::sync::Arc;

use trellis_bridge::convert::find_converter;
use trellis_bridge::{convert_argument, ConversionEnv, Converter, Tier};
use trellis_host::{
    builtins, ClassBuilder, ErrorKind, HostArray, HostObject, HostType, LazyString,
    MemoryRuntime, Value,
};

fn env() -> (Arc<MemoryRuntime>, ConversionEnv) {
    let runtime = Arc::new(MemoryRuntime::new());
    let env = ConversionEnv::new(runtime.clone());
    (runtime, env)
}

fn sample_values(runtime: &MemoryRuntime) -> Vec<Value> {
    let widget = ClassBuilder::class("demo.Widget").build();
    vec![
        Value::Undefined,
        Value::ScriptNull,
        Value::Null,
        Value::Bool(true),
        Value::Int(5),
        Value::Int(-3),
        Value::Long(1 << 40),
        Value::Double(5.0),
        Value::Double(5.7),
        Value::Float(1.5),
        Value::Char(65),
        Value::LargeInt(1 << 40),
        Value::from("12"),
        Value::from(""),
        Value::LazyString(LazyString::new(["a", "b"])),
        Value::Host(HostObject::new(&widget)),
        Value::Array(HostArray::new(builtins::int(), vec![Value::Int(1)])),
        Value::Class(builtins::string().clone()),
        runtime.object(),
        runtime.function(|_, _| Ok(Value::Undefined)),
    ]
}

fn sample_types() -> Vec<HostType> {
    vec![
        builtins::object().clone(),
        builtins::string().clone(),
        builtins::char_sequence().clone(),
        builtins::number().clone(),
        builtins::int().clone(),
        builtins::integer().clone(),
        builtins::long().clone(),
        builtins::double().clone(),
        builtins::double_box().clone(),
        builtins::float().clone(),
        builtins::boolean().clone(),
        builtins::boolean_box().clone(),
        builtins::byte().clone(),
        builtins::short().clone(),
        builtins::char().clone(),
        builtins::list().clone(),
        HostType::array_of(builtins::int()),
    ]
}

#[test]
fn test_identity_converter_leaves_host_values_untouched() {
    let (runtime, env) = env();
    for value in sample_values(&runtime) {
        if value.is_nullish() || matches!(value, Value::LazyString(_) | Value::LargeInt(_)) {
            continue;
        }
        for ty in sample_types() {
            if let Some(converter) = find_converter(&ty, &value, Tier::Identity, &env) {
                let converted = converter.convert(value.clone()).unwrap();
                assert_eq!(converted, value, "identity changed {:?} toward {}", value, ty.name());
            }
        }
    }
}

#[test]
fn test_tiers_are_monotonic() {
    let (runtime, env) = env();
    for value in sample_values(&runtime) {
        for ty in sample_types() {
            let identity = find_converter(&ty, &value, Tier::Identity, &env).is_some();
            let default = find_converter(&ty, &value, Tier::Default, &env).is_some();
            let forcing = find_converter(&ty, &value, Tier::Forcing, &env).is_some();
            assert!(!identity || default, "{:?} -> {} lost at default", value, ty.name());
            assert!(!default || forcing, "{:?} -> {} lost at forcing", value, ty.name());
        }
    }
}

#[test]
fn test_integer_widens_to_double() {
    let (_, env) = env();
    let widened = convert_argument(Value::Int(5), builtins::double(), Tier::Default, &env);
    assert_eq!(widened.unwrap(), Value::Double(5.0));
    let long = convert_argument(Value::Int(5), builtins::long(), Tier::Default, &env);
    assert_eq!(long.unwrap(), Value::Long(5));
}

#[test]
fn test_double_narrows_to_int_only_when_forced() {
    let (_, env) = env();
    let int = builtins::int();
    assert!(convert_argument(Value::Double(5.7), int, Tier::Identity, &env).is_err());
    assert!(convert_argument(Value::Double(5.7), int, Tier::Default, &env).is_err());
    assert_eq!(
        convert_argument(Value::Double(5.7), int, Tier::Forcing, &env).unwrap(),
        Value::Int(5)
    );
    assert_eq!(
        convert_argument(Value::Double(-5.7), int, Tier::Forcing, &env).unwrap(),
        Value::Int(-5)
    );
    assert_eq!(
        convert_argument(Value::Double(6.0), int, Tier::Default, &env).unwrap(),
        Value::Int(6)
    );
}

#[test]
fn test_double_to_float_is_a_default_conversion() {
    let (_, env) = env();
    let float = convert_argument(Value::Double(0.1), builtins::float(), Tier::Default, &env);
    assert_eq!(float.unwrap(), Value::Float(0.1f32));
}

#[test]
fn test_strings_parse_only_when_forced() {
    let (_, env) = env();
    assert!(convert_argument(Value::from("12"), builtins::int(), Tier::Default, &env).is_err());
    assert_eq!(
        convert_argument(Value::from("12"), builtins::int(), Tier::Forcing, &env).unwrap(),
        Value::Int(12)
    );
    let err = convert_argument(Value::from("twelve"), builtins::int(), Tier::Forcing, &env)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conversion);
}

#[test]
fn test_sentinels_map_to_host_null() {
    let (_, env) = env();
    for sentinel in [Value::Undefined, Value::ScriptNull] {
        let converted = convert_argument(sentinel, builtins::string(), Tier::Identity, &env);
        assert_eq!(converted.unwrap(), Value::Null);
    }
}

#[test]
fn test_script_objects_need_forcing_for_primitives() {
    let (runtime, env) = env();
    let object = runtime.object_from([(
        "toString",
        runtime.function(|_, _| Ok(Value::from("described"))),
    )]);
    assert!(convert_argument(object.clone(), builtins::string(), Tier::Default, &env).is_err());
    assert_eq!(
        convert_argument(object, builtins::string(), Tier::Forcing, &env).unwrap(),
        Value::from("described")
    );
}
