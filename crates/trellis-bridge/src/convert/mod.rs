//! Value converter library
//!
//! A [`Converter`] is a guarded transformation: `guard` decides whether it applies to a value
//! and `convert` performs it. Converters are built by [`ConverterFactory`] values for a given
//! destination type and are immutable once built.
//!
//! Factories are grouped into three tiers of increasing permissiveness:
//!
//! | Tier       | Factories (in order)                                                  |
//! |------------|-----------------------------------------------------------------------|
//! | `Identity` | identity                                                              |
//! | `Default`  | identity, lossless primitive, functional adaptation, host unwrapping  |
//! | `Forcing`  | `Default` plus lossy narrowing, string parsing, object-to-primitive   |
//!
//! Every factory except host unwrapping is wrapped in [`script::ScriptToHost`], which layers
//! the sentinel preprocessing (script null, `undefined`, lazy strings, large integers) ahead
//! of the factory's own converter.

pub mod array;
pub mod combinator;
pub mod primitive;
pub mod script;

use std::sync::{Arc, Weak};

use trellis_host::{
    builtins, HostType, InteropError, InteropResult, PrimitiveKind, ScriptRuntime, Value,
};

pub use array::{ArrayConverter, ObjectArrayConverter, VarArgsConverter};
pub use combinator::{CombineConverter, LazySerialConverter, OptionalConverter};
pub use primitive::IdentityConverter;
pub use script::host_to_script;

use primitive::{
    IdentityFactory, LossyPrimitiveFactory, PrimitiveFactory, StringToPrimitiveFactory,
};
use script::{
    HostWrapperFactory, ObjectToBooleanFactory, ObjectToNumberFactory, ObjectToStringFactory,
    SamTypeFactory, ScriptToHost,
};

// ============================================================================
// Traits
// ============================================================================

/// Guarded value transformation
///
/// `convert` may only be called with a value for which `guard` returned true.
pub trait Converter: Send + Sync {
    /// Whether this converter applies to `value`
    fn guard(&self, value: &Value) -> bool;

    /// Transform `value`
    fn convert(&self, value: Value) -> InteropResult<Value>;
}

/// Converter over a whole argument list
pub trait ArgumentConverter: Send + Sync {
    /// Whether every positional converter applies
    fn guard(&self, args: &[Value]) -> bool;

    /// Convert the argument list into the form the member body expects
    fn convert(&self, args: &[Value]) -> InteropResult<Vec<Value>>;
}

/// Builds converters toward a destination type
pub trait ConverterFactory: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Whether this factory can ever produce a converter toward `dest`
    fn accepts(&self, dest: &HostType) -> bool;

    /// Whether this factory's converter toward `dest` applies to `value`
    fn accepts_value(&self, dest: &HostType, value: &Value, env: &ConversionEnv) -> bool;

    /// Build the converter toward `dest`
    fn make(&self, dest: &HostType, env: &ConversionEnv) -> Arc<dyn Converter>;

    /// Whether the factory parses strings into primitives
    fn parses_strings(&self) -> bool {
        false
    }
}

/// Source of function-constructible adapter instances
///
/// Implemented by the adapter loader; the converter library only sees this trait.
pub trait FunctionalAdapters: Send + Sync {
    /// Whether a bare script callable can implement `ty`
    fn is_function_constructible(&self, ty: &HostType) -> bool;

    /// Instantiate an adapter for `ty` whose single abstract member calls `callable`
    fn adapt_function(&self, ty: &HostType, callable: Value) -> InteropResult<Value>;
}

// ============================================================================
// Conversion environment
// ============================================================================

/// Collaborators a converter may need at conversion time
#[derive(Clone)]
pub struct ConversionEnv {
    runtime: Arc<dyn ScriptRuntime>,
    functional: Option<Weak<dyn FunctionalAdapters>>,
}

impl ConversionEnv {
    /// Environment without functional adaptation
    pub fn new(runtime: Arc<dyn ScriptRuntime>) -> Self {
        Self {
            runtime,
            functional: None,
        }
    }

    /// Enable conversion of script callables into function-constructible types
    pub fn with_functional_adapters(mut self, adapters: Weak<dyn FunctionalAdapters>) -> Self {
        self.functional = Some(adapters);
        self
    }

    /// The scripting runtime
    pub fn runtime(&self) -> &Arc<dyn ScriptRuntime> {
        &self.runtime
    }

    pub(crate) fn functional(&self) -> Option<Arc<dyn FunctionalAdapters>> {
        self.functional.as_ref().and_then(Weak::upgrade)
    }
}

// ============================================================================
// Tiers
// ============================================================================

/// Conversion tier, ordered by permissiveness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    /// Exact and boxing-compatible matches only
    Identity,
    /// Lossless widenings, functional adaptation, sentinel mapping
    Default,
    /// Lossy narrowing, string parsing, object-to-primitive coercion
    Forcing,
}

static IDENTITY_FACTORIES: &[&dyn ConverterFactory] = &[&ScriptToHost(&IdentityFactory)];

static DEFAULT_FACTORIES: &[&dyn ConverterFactory] = &[
    &ScriptToHost(&IdentityFactory),
    &ScriptToHost(&PrimitiveFactory),
    &ScriptToHost(&SamTypeFactory),
    &HostWrapperFactory(&IdentityFactory),
];

static FORCING_FACTORIES: &[&dyn ConverterFactory] = &[
    &ScriptToHost(&IdentityFactory),
    &ScriptToHost(&PrimitiveFactory),
    &ScriptToHost(&LossyPrimitiveFactory),
    &ScriptToHost(&StringToPrimitiveFactory),
    &ScriptToHost(&SamTypeFactory),
    &ScriptToHost(&ObjectToStringFactory),
    &ScriptToHost(&ObjectToBooleanFactory),
    &ScriptToHost(&ObjectToNumberFactory),
    &HostWrapperFactory(&IdentityFactory),
];

impl Tier {
    /// All tiers in resolution order
    pub const ALL: [Tier; 3] = [Tier::Identity, Tier::Default, Tier::Forcing];

    /// Factories of this tier in priority order
    pub fn factories(self) -> &'static [&'static dyn ConverterFactory] {
        match self {
            Tier::Identity => IDENTITY_FACTORIES,
            Tier::Default => DEFAULT_FACTORIES,
            Tier::Forcing => FORCING_FACTORIES,
        }
    }

    /// Lower-case tier name
    pub fn name(self) -> &'static str {
        match self {
            Tier::Identity => "identity",
            Tier::Default => "default",
            Tier::Forcing => "forcing",
        }
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// First converter of `tier` that applies to `value` toward `dest`
pub fn find_converter(
    dest: &HostType,
    value: &Value,
    tier: Tier,
    env: &ConversionEnv,
) -> Option<Arc<dyn Converter>> {
    tier.factories()
        .iter()
        .find(|factory| factory.accepts(dest) && factory.accepts_value(dest, value, env))
        .map(|factory| factory.make(dest, env))
}

/// Convert a script value toward `dest` using the converters of `tier`
pub fn convert_argument(
    value: Value,
    dest: &HostType,
    tier: Tier,
    env: &ConversionEnv,
) -> InteropResult<Value> {
    match find_converter(dest, &value, tier, env) {
        Some(converter) => converter.convert(value),
        None => Err(conversion_error(0, dest, &value)),
    }
}

/// Conversion failure at argument `position`
pub(crate) fn conversion_error(position: usize, dest: &HostType, value: &Value) -> InteropError {
    InteropError::Conversion {
        position,
        expected: dest.name().to_string(),
        actual: value.type_name(),
    }
}

/// Re-target a conversion failure to argument `position`
pub(crate) fn at_position(err: InteropError, position: usize) -> InteropError {
    match err {
        InteropError::Conversion {
            expected, actual, ..
        } => InteropError::Conversion {
            position,
            expected,
            actual,
        },
        other => other,
    }
}

/// Primitive kind a destination type stands for, looking through boxes
pub(crate) fn target_kind(dest: &HostType) -> Option<PrimitiveKind> {
    dest.primitive_kind()
        .or_else(|| builtins::unboxed(dest).and_then(HostType::primitive_kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_host::MemoryRuntime;

    fn env() -> ConversionEnv {
        ConversionEnv::new(Arc::new(MemoryRuntime::new()))
    }

    #[test]
    fn test_integer_widens_to_double_at_default_tier() {
        let env = env();
        assert!(convert_argument(Value::Int(5), builtins::double(), Tier::Identity, &env).is_err());
        let widened = convert_argument(Value::Int(5), builtins::double(), Tier::Default, &env);
        assert_eq!(widened.unwrap(), Value::Double(5.0));
    }

    #[test]
    fn test_forced_narrowing_truncates() {
        let env = env();
        let int = builtins::int();
        assert!(convert_argument(Value::Double(5.7), int, Tier::Identity, &env).is_err());
        assert!(convert_argument(Value::Double(5.7), int, Tier::Default, &env).is_err());
        let forced = convert_argument(Value::Double(5.7), int, Tier::Forcing, &env);
        assert_eq!(forced.unwrap(), Value::Int(5));
    }

    #[test]
    fn test_script_null_maps_to_host_null() {
        let env = env();
        let converted =
            convert_argument(Value::ScriptNull, builtins::string(), Tier::Identity, &env);
        assert_eq!(converted.unwrap(), Value::Null);
    }

    #[test]
    fn test_conversion_error_names_destination() {
        let env = env();
        let err = convert_argument(Value::from("x"), builtins::int(), Tier::Default, &env)
            .unwrap_err();
        assert!(matches!(err, InteropError::Conversion { ref expected, .. } if expected == "int"));
        assert_eq!(err.kind(), trellis_host::ErrorKind::Conversion);
    }

    #[test]
    fn test_at_position_rewrites_conversion_errors_only() {
        let err = at_position(conversion_error(0, builtins::int(), &Value::Undefined), 3);
        assert!(matches!(err, InteropError::Conversion { position: 3, .. }));
        let other = at_position(InteropError::Script("boom".into()), 3);
        assert!(matches!(other, InteropError::Script(_)));
    }

    #[test]
    fn test_target_kind_looks_through_boxes() {
        assert_eq!(target_kind(builtins::integer()), Some(PrimitiveKind::Int));
        assert_eq!(target_kind(builtins::double()), Some(PrimitiveKind::Double));
        assert_eq!(target_kind(builtins::string()), None);
    }
}
