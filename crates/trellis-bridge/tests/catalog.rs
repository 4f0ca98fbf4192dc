//! Integration tests for catalog-backed member access

use std::sync::Arc;

use trellis_bridge::catalog::decapitalize;
use trellis_bridge::{HostCatalog, Interop};
use trellis_host::{
    builtins, ClassBuilder, ConstructorDefinition, FieldDefinition, HostArray, HostType,
    InteropError, MemoryRuntime, MethodDefinition, Value,
};

fn interop() -> Interop {
    Interop::new(Arc::new(MemoryRuntime::new()))
}

/// Bean with a `url` property (acronym-named accessors), an overloaded setter and a field
fn endpoint() -> HostType {
    let settings = ClassBuilder::class("demo.Endpoint.Settings").build();
    ClassBuilder::class("demo.Endpoint")
        .inner(&settings)
        .field(FieldDefinition::new("port", builtins::int()).initial_value(Value::Int(80)))
        .field(
            FieldDefinition::new("DEFAULT_PORT", builtins::int())
                .as_static()
                .as_final()
                .initial_value(Value::Int(8080)),
        )
        .method(
            MethodDefinition::new("getURL")
                .returns(builtins::string())
                .body(|this, _| {
                    Ok(this
                        .as_host_object()
                        .and_then(|object| object.get_field("url"))
                        .unwrap_or(Value::Null))
                }),
        )
        .method(
            MethodDefinition::new("setURL")
                .param(builtins::string())
                .body(|this, args| {
                    if let Some(object) = this.as_host_object() {
                        object.set_field("url", args[0].clone());
                    }
                    Ok(Value::Undefined)
                }),
        )
        .method(
            MethodDefinition::new("setTimeout")
                .param(builtins::long())
                .body(|this, args| {
                    if let Some(object) = this.as_host_object() {
                        object.set_field("timeout", args[0].clone());
                    }
                    Ok(Value::Undefined)
                }),
        )
        .method(
            MethodDefinition::new("setTimeout")
                .param(builtins::string())
                .body(|this, _| {
                    if let Some(object) = this.as_host_object() {
                        object.set_field("timeout", Value::from("text"));
                    }
                    Ok(Value::Undefined)
                }),
        )
        .method(
            MethodDefinition::new("isSecure")
                .returns(builtins::boolean())
                .body(|_, _| Ok(Value::Bool(true))),
        )
        .build()
}

#[test]
fn test_decapitalize_preserves_acronyms() {
    assert_eq!(decapitalize("URL"), "URL");
    assert_eq!(decapitalize("URLPath"), "URLPath");
    assert_eq!(decapitalize("Name"), "name");
    assert_eq!(decapitalize("X"), "x");
}

#[test]
fn test_bean_properties_through_facade() {
    let interop = interop();
    let endpoint = interop.new_instance(&endpoint(), &[]).unwrap();

    interop
        .set_property(&endpoint, "URL", Value::from("https://example.org"))
        .unwrap();
    assert_eq!(
        interop.get_property(&endpoint, "URL").unwrap(),
        Value::from("https://example.org")
    );
    assert_eq!(interop.get_property(&endpoint, "secure").unwrap(), Value::Bool(true));
    assert_eq!(interop.get_property(&endpoint, "port").unwrap(), Value::Int(80));
    interop.set_property(&endpoint, "port", Value::Double(81.0)).unwrap();
    assert_eq!(interop.get_property(&endpoint, "port").unwrap(), Value::Int(81));
}

#[test]
fn test_overloaded_setter_is_resolved() {
    let interop = interop();
    let endpoint = interop.new_instance(&endpoint(), &[]).unwrap();
    let object = endpoint.as_host_object().unwrap().clone();

    interop.set_property(&endpoint, "timeout", Value::Int(5)).unwrap();
    assert_eq!(object.get_field("timeout"), Some(Value::Long(5)));

    interop
        .set_property(&endpoint, "timeout", Value::from("soon"))
        .unwrap();
    assert_eq!(object.get_field("timeout"), Some(Value::from("text")));

    let err = interop.get_property(&endpoint, "timeout").unwrap_err();
    assert!(matches!(err, InteropError::NoSuchMember { .. }));
}

#[test]
fn test_static_view_and_type_mirror() {
    let interop = interop();
    let ty = endpoint();
    let statics = Value::Type(ty.clone());

    assert_eq!(
        interop.get_property(&statics, "DEFAULT_PORT").unwrap(),
        Value::Int(8080)
    );
    let err = interop
        .set_property(&statics, "DEFAULT_PORT", Value::Int(1))
        .unwrap_err();
    assert!(matches!(err, InteropError::UnsupportedOperation(_)));

    let mirror = interop.get_property(&statics, "class").unwrap();
    assert_eq!(mirror, Value::Class(ty.clone()));
    let back = interop.get_property(&mirror, "static").unwrap();
    assert_eq!(back, statics);

    let inner = interop.get_property(&statics, "Settings").unwrap();
    assert!(matches!(inner, Value::Type(ref t) if t.simple_name() == "Settings"));
}

#[test]
fn test_length_of_arrays_and_lists() {
    let interop = interop();
    let array = Value::Array(HostArray::new(
        builtins::string(),
        vec![Value::from("a"), Value::from("b")],
    ));
    assert_eq!(interop.get_property(&array, "length").unwrap(), Value::Int(2));

    let pair = ClassBuilder::class("demo.Pair")
        .implements(builtins::list())
        .method(
            MethodDefinition::new("size")
                .returns(builtins::int())
                .body(|_, _| Ok(Value::Int(2))),
        )
        .build();
    let pair = interop.new_instance(&pair, &[]).unwrap();
    assert_eq!(interop.get_property(&pair, "length").unwrap(), Value::Int(2));
}

#[test]
fn test_signature_qualified_constructor() {
    let point = ClassBuilder::class("demo.Point")
        .constructor(
            ConstructorDefinition::new()
                .param(builtins::int())
                .param(builtins::int()),
        )
        .constructor(ConstructorDefinition::new().param(builtins::string()))
        .build();
    let catalog = HostCatalog::new();
    let entry = catalog.entry(&point);
    let ctor = entry.lookup_constructor("int,int").unwrap();
    assert_eq!(ctor.params().len(), 2);
    let ctor = entry.lookup_method("(String)", true).unwrap();
    assert_eq!(ctor.params(), &[builtins::string().clone()]);
    assert!(entry.lookup_method("(String)", false).is_err());
    assert!(entry.lookup_constructor("(double)").is_err());
}

#[test]
fn test_concurrent_first_use_builds_one_entry() {
    let catalog = Arc::new(HostCatalog::new());
    let ty = endpoint();
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let catalog = catalog.clone();
            let ty = ty.clone();
            std::thread::spawn(move || catalog.entry(&ty).method_names(false))
        })
        .collect();
    let names: Vec<Vec<String>> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();
    assert!(names.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(catalog.len(), 1);

    assert!(catalog.invalidate(&ty));
    assert!(catalog.is_empty());
    assert!(!catalog.entry(&ty).is_introspected());
}
