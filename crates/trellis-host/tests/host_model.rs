//! Integration tests for the host model and the in-memory runtime

use std::sync::Arc;

use trellis_host::{
    builtins, ClassBuilder, ConstructorDefinition, FieldDefinition, HostArray, HostType,
    MemoryRuntime, MethodDefinition, ScriptRuntime, Value,
};

fn shape_hierarchy() -> (HostType, HostType) {
    let shape = ClassBuilder::class("geo.Shape")
        .as_abstract()
        .method(MethodDefinition::new("area").returns(builtins::double()))
        .method(
            MethodDefinition::new("describe")
                .returns(builtins::string())
                .body(|_, _| Ok(Value::from("shape"))),
        )
        .build();
    let square = ClassBuilder::class("geo.Square")
        .extends(&shape)
        .field(FieldDefinition::new("side", builtins::double()))
        .constructor(
            ConstructorDefinition::new()
                .param(builtins::double())
                .body(|this, args| {
                    this.set_field("side", args[0].clone());
                    Ok(())
                }),
        )
        .method(
            MethodDefinition::new("area")
                .returns(builtins::double())
                .body(|this, _| {
                    let side = this
                        .as_host_object()
                        .and_then(|o| o.get_field("side"))
                        .and_then(|v| v.as_f64())
                        .unwrap_or(0.0);
                    Ok(Value::Double(side * side))
                }),
        )
        .build();
    (shape, square)
}

#[test]
fn test_virtual_dispatch_reaches_subclass() {
    let (shape, square) = shape_hierarchy();
    let instance = square.constructors()[0]
        .new_instance(&[Value::Double(3.0)])
        .unwrap();
    let area = shape.find_method("area", &[]);
    assert!(area.is_none(), "abstract declarations are not dispatch targets");
    let declared = shape
        .declared_methods()
        .iter()
        .find(|m| m.name() == "area")
        .cloned()
        .unwrap();
    assert_eq!(declared.invoke(&instance, &[]).unwrap(), Value::Double(9.0));
    let describe = square.find_method("describe", &[]).unwrap();
    assert_eq!(describe.invoke(&instance, &[]).unwrap(), Value::from("shape"));
}

#[test]
fn test_abstract_type_cannot_be_instantiated() {
    let (shape, _) = shape_hierarchy();
    assert!(shape.constructors()[0].new_instance(&[]).is_err());
}

#[test]
fn test_array_values_report_array_types() {
    let array = HostArray::new(builtins::string(), vec![Value::from("a")]);
    let value = Value::Array(array);
    let strings = HostType::array_of(builtins::string());
    assert!(value.is_instance_of(&strings));
    assert!(value.is_instance_of(&HostType::array_of(builtins::object())));
    assert!(!value.is_instance_of(&HostType::array_of(builtins::int())));
}

#[test]
fn test_memory_runtime_calls_functions_with_receiver() {
    let rt = Arc::new(MemoryRuntime::new());
    let inner = rt.clone();
    let getter = rt.function(move |this, _| inner.get_member(this, "name"));
    let obj = rt.object_from([("name", Value::from("trellis")), ("getName", getter.clone())]);
    assert_eq!(rt.call(&getter, &obj, &[]).unwrap(), Value::from("trellis"));
    assert!(rt.call(&obj, &Value::Undefined, &[]).is_err());
}

#[test]
fn test_memory_runtime_coercions() {
    let rt = MemoryRuntime::new();
    assert!(!rt.to_boolean(&Value::from("")));
    assert!(rt.to_boolean(&rt.object()));
    assert!(rt.to_number(&Value::from("abc")).unwrap().is_nan());
    assert_eq!(rt.to_number(&Value::Bool(true)).unwrap(), 1.0);
    assert_eq!(&*rt.to_string(&Value::Double(2.5)).unwrap(), "2.5");
    assert_eq!(&*rt.to_string(&Value::Undefined).unwrap(), "undefined");
}
