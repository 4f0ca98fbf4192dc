//! Identity and primitive converters
//!
//! | Factory             | Destinations                          | Accepts                       |
//! |---------------------|---------------------------------------|-------------------------------|
//! | `IdentityFactory`   | any                                   | instances, boxes, host null   |
//! | `PrimitiveFactory`  | double, int, float, boolean, long     | lossless numbers, `undefined` |
//! | `LossyPrimitive`    | numeric primitives and their boxes    | any number                    |
//! | `StringToPrimitive` | numeric primitives, boolean, boxes    | flat strings                  |

use std::sync::Arc;

use trellis_host::{HostType, InteropError, InteropResult, PrimitiveKind, Value};

use super::{conversion_error, target_kind, ConversionEnv, Converter, ConverterFactory};

// ============================================================================
// Identity
// ============================================================================

/// Whether `value` can be passed toward `dest` untouched
pub(crate) fn identity_accepts(dest: &HostType, value: &Value) -> bool {
    value.is_instance_of(dest)
        || (!dest.is_primitive() && matches!(value, Value::Null))
        || (dest.is_primitive() && !dest.is_void() && value.is_instance_of(&dest.boxed()))
}

pub(crate) struct IdentityFactory;

impl ConverterFactory for IdentityFactory {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn accepts(&self, _dest: &HostType) -> bool {
        true
    }

    fn accepts_value(&self, dest: &HostType, value: &Value, _env: &ConversionEnv) -> bool {
        identity_accepts(dest, value)
    }

    fn make(&self, dest: &HostType, _env: &ConversionEnv) -> Arc<dyn Converter> {
        Arc::new(IdentityConverter::new(dest))
    }
}

/// Pass-through converter
pub struct IdentityConverter {
    dest: HostType,
}

impl IdentityConverter {
    /// Identity toward `dest`
    pub fn new(dest: &HostType) -> Self {
        Self { dest: dest.clone() }
    }
}

impl Converter for IdentityConverter {
    fn guard(&self, value: &Value) -> bool {
        identity_accepts(&self.dest, value)
    }

    fn convert(&self, value: Value) -> InteropResult<Value> {
        Ok(value)
    }
}

// ============================================================================
// Lossless primitives
// ============================================================================

/// Whether a double has an exact `int` counterpart (negative zero does not)
fn double_is_int(d: f64) -> bool {
    d.trunc() == d
        && d >= i32::MIN as f64
        && d <= i32::MAX as f64
        && !(d == 0.0 && d.is_sign_negative())
}

/// Lossless (or documented near-lossless) widening of `value` toward `kind`
fn widen(kind: PrimitiveKind, value: &Value) -> Option<Value> {
    match (kind, value) {
        (PrimitiveKind::Double, Value::Int(i)) => Some(Value::Double(f64::from(*i))),
        (PrimitiveKind::Double, Value::Undefined) => Some(Value::Double(f64::NAN)),
        (PrimitiveKind::Int, Value::Double(d)) if double_is_int(*d) => Some(Value::Int(*d as i32)),
        (PrimitiveKind::Int, Value::Undefined) => Some(Value::Int(0)),
        (PrimitiveKind::Float, Value::Int(i)) => Some(Value::Float(*i as f32)),
        // Lossy, but classified with the lossless widenings
        (PrimitiveKind::Float, Value::Double(d)) => Some(Value::Float(*d as f32)),
        (PrimitiveKind::Float, Value::Undefined) => Some(Value::Float(f32::NAN)),
        (PrimitiveKind::Boolean, Value::Int(i)) => Some(Value::Bool(*i != 0)),
        (PrimitiveKind::Boolean, Value::Undefined) => Some(Value::Bool(false)),
        (PrimitiveKind::Long, Value::Int(i)) => Some(Value::Long(i64::from(*i))),
        (PrimitiveKind::Long, Value::Double(d)) if (*d as i64) as f64 == *d => {
            Some(Value::Long(*d as i64))
        }
        (PrimitiveKind::Long, Value::Undefined) => Some(Value::Long(0)),
        _ => None,
    }
}

pub(crate) struct PrimitiveFactory;

impl ConverterFactory for PrimitiveFactory {
    fn name(&self) -> &'static str {
        "primitive"
    }

    fn accepts(&self, dest: &HostType) -> bool {
        matches!(
            target_kind(dest),
            Some(
                PrimitiveKind::Double
                    | PrimitiveKind::Int
                    | PrimitiveKind::Float
                    | PrimitiveKind::Boolean
                    | PrimitiveKind::Long
            )
        )
    }

    fn accepts_value(&self, dest: &HostType, value: &Value, _env: &ConversionEnv) -> bool {
        target_kind(dest).map_or(false, |kind| widen(kind, value).is_some())
    }

    fn make(&self, dest: &HostType, _env: &ConversionEnv) -> Arc<dyn Converter> {
        Arc::new(PrimitiveConverter { dest: dest.clone() })
    }
}

struct PrimitiveConverter {
    dest: HostType,
}

impl Converter for PrimitiveConverter {
    fn guard(&self, value: &Value) -> bool {
        target_kind(&self.dest).map_or(false, |kind| widen(kind, value).is_some())
    }

    fn convert(&self, value: Value) -> InteropResult<Value> {
        target_kind(&self.dest)
            .and_then(|kind| widen(kind, &value))
            .ok_or_else(|| conversion_error(0, &self.dest, &value))
    }
}

// ============================================================================
// Lossy primitives
// ============================================================================

/// Narrow a number toward `kind`, truncating toward zero and saturating floats
pub(crate) fn narrow(kind: PrimitiveKind, value: &Value) -> Option<Value> {
    let is_float = matches!(value, Value::Float(_) | Value::Double(_));
    let f = value.as_f64()?;
    let i = value.as_i64()?;
    Some(match kind {
        PrimitiveKind::Double => Value::Double(f),
        PrimitiveKind::Float => Value::Float(f as f32),
        PrimitiveKind::Long => Value::Long(if is_float { f as i64 } else { i }),
        PrimitiveKind::Int => Value::Int(if is_float { f as i32 } else { i as i32 }),
        PrimitiveKind::Short => Value::Short(if is_float { f as i16 } else { i as i16 }),
        PrimitiveKind::Byte => Value::Byte(if is_float { f as i8 } else { i as i8 }),
        PrimitiveKind::Boolean | PrimitiveKind::Char | PrimitiveKind::Void => return None,
    })
}

pub(crate) struct LossyPrimitiveFactory;

impl ConverterFactory for LossyPrimitiveFactory {
    fn name(&self) -> &'static str {
        "lossy-primitive"
    }

    fn accepts(&self, dest: &HostType) -> bool {
        target_kind(dest).map_or(false, PrimitiveKind::is_numeric)
    }

    fn accepts_value(&self, dest: &HostType, value: &Value, _env: &ConversionEnv) -> bool {
        self.accepts(dest) && value.is_number()
    }

    fn make(&self, dest: &HostType, _env: &ConversionEnv) -> Arc<dyn Converter> {
        Arc::new(LossyPrimitiveConverter { dest: dest.clone() })
    }
}

struct LossyPrimitiveConverter {
    dest: HostType,
}

impl Converter for LossyPrimitiveConverter {
    fn guard(&self, value: &Value) -> bool {
        value.is_number()
    }

    fn convert(&self, value: Value) -> InteropResult<Value> {
        target_kind(&self.dest)
            .and_then(|kind| narrow(kind, &value))
            .ok_or_else(|| conversion_error(0, &self.dest, &value))
    }
}

// ============================================================================
// String parsing
// ============================================================================

fn parse_error(dest: &HostType, s: &str) -> InteropError {
    InteropError::Conversion {
        position: 0,
        expected: dest.name().to_string(),
        actual: format!("string \"{s}\""),
    }
}

/// Parse `s` toward `kind` with host parsing rules (no trimming for integers)
pub(crate) fn parse_primitive(kind: PrimitiveKind, s: &str) -> Option<Value> {
    match kind {
        PrimitiveKind::Boolean => Some(Value::Bool(!s.is_empty())),
        PrimitiveKind::Double => s.trim().parse().ok().map(Value::Double),
        PrimitiveKind::Float => s.trim().parse().ok().map(Value::Float),
        PrimitiveKind::Long => s.parse().ok().map(Value::Long),
        PrimitiveKind::Int => s.parse().ok().map(Value::Int),
        PrimitiveKind::Short => s.parse().ok().map(Value::Short),
        PrimitiveKind::Byte => s.parse().ok().map(Value::Byte),
        PrimitiveKind::Char | PrimitiveKind::Void => None,
    }
}

pub(crate) struct StringToPrimitiveFactory;

impl ConverterFactory for StringToPrimitiveFactory {
    fn name(&self) -> &'static str {
        "string-to-primitive"
    }

    fn accepts(&self, dest: &HostType) -> bool {
        target_kind(dest).map_or(false, |kind| {
            kind.is_numeric() || kind == PrimitiveKind::Boolean
        })
    }

    fn accepts_value(&self, dest: &HostType, value: &Value, _env: &ConversionEnv) -> bool {
        self.accepts(dest) && matches!(value, Value::String(_))
    }

    fn make(&self, dest: &HostType, _env: &ConversionEnv) -> Arc<dyn Converter> {
        Arc::new(StringToPrimitiveConverter { dest: dest.clone() })
    }

    fn parses_strings(&self) -> bool {
        true
    }
}

struct StringToPrimitiveConverter {
    dest: HostType,
}

impl Converter for StringToPrimitiveConverter {
    fn guard(&self, value: &Value) -> bool {
        matches!(value, Value::String(_))
    }

    fn convert(&self, value: Value) -> InteropResult<Value> {
        let s = value
            .as_str()
            .ok_or_else(|| conversion_error(0, &self.dest, &value))?;
        target_kind(&self.dest)
            .and_then(|kind| parse_primitive(kind, s))
            .ok_or_else(|| parse_error(&self.dest, s))
    }
}
