//! Builtin host types
//!
//! The primitive types, the root class, strings, boxed numerics, the `Class` mirror type and
//! the `List` interface. Everything is created once per process on first access.

use once_cell::sync::Lazy;

use crate::builder::{ClassBuilder, FieldDefinition, MethodDefinition};
use crate::error::{InteropError, InteropResult};
use crate::types::{HostType, PrimitiveKind, TypeKind};
use crate::value::Value;

struct Primitives {
    boolean: HostType,
    byte: HostType,
    short: HostType,
    char: HostType,
    int: HostType,
    long: HostType,
    float: HostType,
    double: HostType,
    void: HostType,
}

static PRIMITIVES: Lazy<Primitives> = Lazy::new(|| Primitives {
    boolean: HostType::new_primitive(PrimitiveKind::Boolean),
    byte: HostType::new_primitive(PrimitiveKind::Byte),
    short: HostType::new_primitive(PrimitiveKind::Short),
    char: HostType::new_primitive(PrimitiveKind::Char),
    int: HostType::new_primitive(PrimitiveKind::Int),
    long: HostType::new_primitive(PrimitiveKind::Long),
    float: HostType::new_primitive(PrimitiveKind::Float),
    double: HostType::new_primitive(PrimitiveKind::Double),
    void: HostType::new_primitive(PrimitiveKind::Void),
});

struct Builtins {
    object: HostType,
    string: HostType,
    char_sequence: HostType,
    number: HostType,
    integer: HostType,
    long: HostType,
    double: HostType,
    float: HostType,
    short: HostType,
    byte: HostType,
    character: HostType,
    boolean: HostType,
    large_integer: HostType,
    class: HostType,
    list: HostType,
}

static BUILTINS: Lazy<Builtins> = Lazy::new(Builtins::create);

// ============================================================================
// Body helpers
// ============================================================================

fn arg(args: &[Value], index: usize) -> InteropResult<&Value> {
    args.get(index).ok_or_else(|| InteropError::TypeMismatch {
        expected: format!("argument {index}"),
        actual: "missing argument".to_string(),
    })
}

fn int_arg(args: &[Value], index: usize) -> InteropResult<i64> {
    let value = arg(args, index)?;
    value.as_i64().ok_or_else(|| InteropError::TypeMismatch {
        expected: "int".to_string(),
        actual: value.type_name(),
    })
}

fn receiver_str<'a>(this: &'a Value, type_name: &str) -> InteropResult<&'a str> {
    this.as_str().ok_or_else(|| InteropError::TypeMismatch {
        expected: type_name.to_string(),
        actual: this.type_name(),
    })
}

fn receiver_type<'a>(this: &'a Value) -> InteropResult<&'a HostType> {
    match this {
        Value::Class(ty) => Ok(ty),
        other => Err(InteropError::TypeMismatch {
            expected: "lang.Class".to_string(),
            actual: other.type_name(),
        }),
    }
}

/// Default `toString` rendering used by the root class
pub fn describe(value: &Value) -> String {
    match value {
        Value::Host(object) => format!("{}@{:x}", object.class().name(), object.identity()),
        Value::String(s) => s.to_string(),
        Value::LazyString(s) => s.flatten().to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Byte(v) => v.to_string(),
        Value::Short(v) => v.to_string(),
        Value::Int(v) => v.to_string(),
        Value::Long(v) | Value::LargeInt(v) => v.to_string(),
        Value::Float(v) => format!("{v:?}"),
        Value::Double(v) => format!("{v:?}"),
        Value::Char(c) => char::from_u32(u32::from(*c))
            .map(String::from)
            .unwrap_or_default(),
        Value::Class(ty) => format!(
            "{} {}",
            if ty.is_interface() { "interface" } else { "class" },
            ty.name()
        ),
        Value::Array(array) => format!("{}@{:x}", array.array_type().name(), array.len()),
        other => other.type_name(),
    }
}

fn identity_hash(value: &Value) -> i32 {
    let raw = match value {
        Value::Host(object) => object.identity(),
        Value::Script(script) => script.identity(),
        other => describe(other)
            .bytes()
            .fold(0usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize)),
    };
    raw as i32
}

fn number_class(name: &str, number: &HostType) -> HostType {
    let p = &*PRIMITIVES;
    ClassBuilder::with_kind(name, TypeKind::Class, Some(number.clone()))
        .as_final()
        .method(
            MethodDefinition::new("intValue")
                .returns(&p.int)
                .body(|this, _| Ok(Value::Int(this.as_i64().unwrap_or(0) as i32))),
        )
        .method(
            MethodDefinition::new("longValue")
                .returns(&p.long)
                .body(|this, _| Ok(Value::Long(this.as_i64().unwrap_or(0)))),
        )
        .method(
            MethodDefinition::new("doubleValue")
                .returns(&p.double)
                .body(|this, _| Ok(Value::Double(this.as_f64().unwrap_or(f64::NAN)))),
        )
        .build()
}

impl Builtins {
    fn create() -> Self {
        let p = &*PRIMITIVES;

        let mut object_builder = ClassBuilder::root("lang.Object");
        let object = object_builder.host_type();
        let sub = |name: &str| ClassBuilder::with_kind(name, TypeKind::Class, Some(object.clone()));

        let char_sequence = ClassBuilder::with_kind("lang.CharSequence", TypeKind::Interface, None)
            .method(MethodDefinition::new("length").returns(&p.int))
            .method(
                MethodDefinition::new("charAt")
                    .param(&p.int)
                    .returns(&p.char),
            )
            .build();

        let mut string_builder = sub("lang.String").as_final().implements(&char_sequence);
        let string = string_builder.host_type();
        let mut class_builder = sub("lang.Class").as_final();
        let class = class_builder.host_type();

        let object = object_builder
            .method(
                MethodDefinition::new("toString")
                    .returns(&string)
                    .body(|this, _| Ok(Value::from(describe(this)))),
            )
            .method(
                MethodDefinition::new("hashCode")
                    .returns(&p.int)
                    .body(|this, _| Ok(Value::Int(identity_hash(this)))),
            )
            .method(
                MethodDefinition::new("equals")
                    .param(&object)
                    .returns(&p.boolean)
                    .body(|this, args| Ok(Value::Bool(arg(args, 0)? == this))),
            )
            .method(
                MethodDefinition::new("getClass")
                    .returns(&class)
                    .as_final()
                    .body(|this, _| {
                        this.host_type()
                            .map(Value::Class)
                            .ok_or_else(|| InteropError::TypeMismatch {
                                expected: "host object".to_string(),
                                actual: this.type_name(),
                            })
                    }),
            )
            .method(
                MethodDefinition::new("finalize")
                    .as_protected()
                    .body(|_, _| Ok(Value::Undefined)),
            )
            .method(
                MethodDefinition::new("clone")
                    .returns(&object)
                    .as_protected()
                    .body(|this, _| {
                        Err(InteropError::host(
                            this.type_name(),
                            "clone is not supported",
                        ))
                    }),
            )
            .build();

        let string = string_builder
            .method(
                MethodDefinition::new("length")
                    .returns(&p.int)
                    .body(|this, _| {
                        let s = receiver_str(this, "lang.String")?;
                        Ok(Value::Int(s.encode_utf16().count() as i32))
                    }),
            )
            .method(
                MethodDefinition::new("charAt")
                    .param(&p.int)
                    .returns(&p.char)
                    .body(|this, args| {
                        let s = receiver_str(this, "lang.String")?;
                        let index = int_arg(args, 0)?;
                        usize::try_from(index)
                            .ok()
                            .and_then(|i| s.encode_utf16().nth(i))
                            .map(Value::Char)
                            .ok_or_else(|| {
                                InteropError::host(
                                    "lang.String",
                                    format!("index {index} out of bounds"),
                                )
                            })
                    }),
            )
            .method(
                MethodDefinition::new("isEmpty")
                    .returns(&p.boolean)
                    .body(|this, _| Ok(Value::Bool(receiver_str(this, "lang.String")?.is_empty()))),
            )
            .method(
                MethodDefinition::new("concat")
                    .param(&string)
                    .returns(&string)
                    .body(|this, args| {
                        let s = receiver_str(this, "lang.String")?;
                        let other = receiver_str(arg(args, 0)?, "lang.String")?;
                        Ok(Value::from(format!("{s}{other}")))
                    }),
            )
            .method(
                MethodDefinition::new("toUpperCase")
                    .returns(&string)
                    .body(|this, _| {
                        Ok(Value::from(receiver_str(this, "lang.String")?.to_uppercase()))
                    }),
            )
            .method(
                MethodDefinition::new("toString")
                    .returns(&string)
                    .body(|this, _| Ok(this.clone())),
            )
            .build();

        let number = sub("lang.Number")
            .as_abstract()
            .method(MethodDefinition::new("intValue").returns(&p.int))
            .method(MethodDefinition::new("longValue").returns(&p.long))
            .method(MethodDefinition::new("doubleValue").returns(&p.double))
            .build();

        let integer = ClassBuilder::with_kind("lang.Integer", TypeKind::Class, Some(number.clone()))
            .as_final()
            .field(
                FieldDefinition::new("MAX_VALUE", &p.int)
                    .as_static()
                    .as_final()
                    .initial_value(Value::Int(i32::MAX)),
            )
            .field(
                FieldDefinition::new("MIN_VALUE", &p.int)
                    .as_static()
                    .as_final()
                    .initial_value(Value::Int(i32::MIN)),
            )
            .method(
                MethodDefinition::new("parseInt")
                    .param(&string)
                    .returns(&p.int)
                    .as_static()
                    .body(|_, args| {
                        let s = receiver_str(arg(args, 0)?, "lang.String")?;
                        s.parse::<i32>().map(Value::Int).map_err(|e| {
                            InteropError::host("lang.Integer", format!("{e}: \"{s}\""))
                        })
                    }),
            )
            .method(
                MethodDefinition::new("intValue")
                    .returns(&p.int)
                    .body(|this, _| Ok(Value::Int(this.as_i64().unwrap_or(0) as i32))),
            )
            .method(
                MethodDefinition::new("longValue")
                    .returns(&p.long)
                    .body(|this, _| Ok(Value::Long(this.as_i64().unwrap_or(0)))),
            )
            .method(
                MethodDefinition::new("doubleValue")
                    .returns(&p.double)
                    .body(|this, _| Ok(Value::Double(this.as_f64().unwrap_or(0.0)))),
            )
            .build();

        let long = number_class("lang.Long", &number);
        let double = number_class("lang.Double", &number);
        let float = number_class("lang.Float", &number);
        let short = number_class("lang.Short", &number);
        let byte = number_class("lang.Byte", &number);
        let large_integer = number_class("script.LargeInteger", &number);

        let character = sub("lang.Character").as_final().build();
        let boolean = sub("lang.Boolean")
            .as_final()
            .method(
                MethodDefinition::new("booleanValue")
                    .returns(&p.boolean)
                    .body(|this, _| Ok(Value::Bool(matches!(this, Value::Bool(true))))),
            )
            .build();

        let class = class_builder
            .method(
                MethodDefinition::new("getName")
                    .returns(&string)
                    .body(|this, _| Ok(Value::from(receiver_type(this)?.name()))),
            )
            .method(
                MethodDefinition::new("getSimpleName")
                    .returns(&string)
                    .body(|this, _| Ok(Value::from(receiver_type(this)?.simple_name()))),
            )
            .method(
                MethodDefinition::new("isInterface")
                    .returns(&p.boolean)
                    .body(|this, _| Ok(Value::Bool(receiver_type(this)?.is_interface()))),
            )
            .build();

        let list = ClassBuilder::with_kind("util.List", TypeKind::Interface, None)
            .method(MethodDefinition::new("size").returns(&p.int))
            .method(
                MethodDefinition::new("get")
                    .param(&p.int)
                    .returns(&object),
            )
            .method(
                MethodDefinition::new("isEmpty")
                    .returns(&p.boolean)
                    .body(|this, _| {
                        let size = this
                            .host_type()
                            .and_then(|ty| ty.find_method("size", &[]))
                            .ok_or_else(|| InteropError::UnsupportedOperation("size".into()))?
                            .invoke_special(this, &[])?;
                        Ok(Value::Bool(size.as_i64() == Some(0)))
                    }),
            )
            .build();

        Builtins {
            object,
            string,
            char_sequence,
            number,
            integer,
            long,
            double,
            float,
            short,
            byte,
            character,
            boolean,
            large_integer,
            class,
            list,
        }
    }
}

// ============================================================================
// Accessors
// ============================================================================

/// `lang.Object`, the root class
pub fn object() -> &'static HostType {
    &BUILTINS.object
}

/// `lang.String`
pub fn string() -> &'static HostType {
    &BUILTINS.string
}

/// `lang.CharSequence`
pub fn char_sequence() -> &'static HostType {
    &BUILTINS.char_sequence
}

/// `lang.Number`
pub fn number() -> &'static HostType {
    &BUILTINS.number
}

/// `lang.Integer`
pub fn integer() -> &'static HostType {
    &BUILTINS.integer
}

/// `lang.Long`
pub fn long_box() -> &'static HostType {
    &BUILTINS.long
}

/// `lang.Double`
pub fn double_box() -> &'static HostType {
    &BUILTINS.double
}

/// `lang.Float`
pub fn float_box() -> &'static HostType {
    &BUILTINS.float
}

/// `lang.Short`
pub fn short_box() -> &'static HostType {
    &BUILTINS.short
}

/// `lang.Byte`
pub fn byte_box() -> &'static HostType {
    &BUILTINS.byte
}

/// `lang.Character`
pub fn character() -> &'static HostType {
    &BUILTINS.character
}

/// `lang.Boolean`
pub fn boolean_box() -> &'static HostType {
    &BUILTINS.boolean
}

/// `script.LargeInteger`, the host view of script integers beyond 32 bits
pub fn large_integer() -> &'static HostType {
    &BUILTINS.large_integer
}

/// `lang.Class`, the type of type mirrors
pub fn class() -> &'static HostType {
    &BUILTINS.class
}

/// `util.List`
pub fn list() -> &'static HostType {
    &BUILTINS.list
}

/// Primitive type for `kind`
pub fn primitive(kind: PrimitiveKind) -> &'static HostType {
    let p = &*PRIMITIVES;
    match kind {
        PrimitiveKind::Boolean => &p.boolean,
        PrimitiveKind::Byte => &p.byte,
        PrimitiveKind::Short => &p.short,
        PrimitiveKind::Char => &p.char,
        PrimitiveKind::Int => &p.int,
        PrimitiveKind::Long => &p.long,
        PrimitiveKind::Float => &p.float,
        PrimitiveKind::Double => &p.double,
        PrimitiveKind::Void => &p.void,
    }
}

/// `boolean`
pub fn boolean() -> &'static HostType {
    &PRIMITIVES.boolean
}

/// `byte`
pub fn byte() -> &'static HostType {
    &PRIMITIVES.byte
}

/// `short`
pub fn short() -> &'static HostType {
    &PRIMITIVES.short
}

/// `char`
pub fn char() -> &'static HostType {
    &PRIMITIVES.char
}

/// `int`
pub fn int() -> &'static HostType {
    &PRIMITIVES.int
}

/// `long`
pub fn long() -> &'static HostType {
    &PRIMITIVES.long
}

/// `float`
pub fn float() -> &'static HostType {
    &PRIMITIVES.float
}

/// `double`
pub fn double() -> &'static HostType {
    &PRIMITIVES.double
}

/// `void`
pub fn void() -> &'static HostType {
    &PRIMITIVES.void
}

/// Boxed counterpart of a primitive kind (`void` boxes to the root class)
pub fn boxed(kind: PrimitiveKind) -> &'static HostType {
    match kind {
        PrimitiveKind::Boolean => boolean_box(),
        PrimitiveKind::Byte => byte_box(),
        PrimitiveKind::Short => short_box(),
        PrimitiveKind::Char => character(),
        PrimitiveKind::Int => integer(),
        PrimitiveKind::Long => long_box(),
        PrimitiveKind::Float => float_box(),
        PrimitiveKind::Double => double_box(),
        PrimitiveKind::Void => object(),
    }
}

/// Primitive counterpart of a boxed type
pub fn unboxed(ty: &HostType) -> Option<&'static HostType> {
    [
        PrimitiveKind::Boolean,
        PrimitiveKind::Byte,
        PrimitiveKind::Short,
        PrimitiveKind::Char,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
    ]
    .into_iter()
    .find(|kind| boxed(*kind) == ty)
    .map(primitive)
}
