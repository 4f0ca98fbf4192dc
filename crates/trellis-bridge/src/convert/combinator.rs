//! Converter combinators
//!
//! | Combinator   | guard(x)                          | convert(x)                                |
//! |--------------|-----------------------------------|-------------------------------------------|
//! | `Combine`    | `a.guard(x) && b.guard(a(x))`     | `b(a(x))`                                 |
//! | `Optional`   | `b.guard(a? (x))`                 | `b(a? (x))`, `a` applied only if it holds |
//! | `LazySerial` | always                            | first applicable converter, else `x`      |
//!
//! `LazySerial` builds each member converter on first use.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use trellis_host::{HostType, InteropResult, Value};

use super::{ConversionEnv, Converter, ConverterFactory};

// ============================================================================
// Combine
// ============================================================================

/// Sequential pipeline of two converters
pub struct CombineConverter {
    first: Arc<dyn Converter>,
    second: Arc<dyn Converter>,
}

impl CombineConverter {
    /// Apply `first`, then `second`
    pub fn new(first: Arc<dyn Converter>, second: Arc<dyn Converter>) -> Self {
        Self { first, second }
    }
}

impl Converter for CombineConverter {
    fn guard(&self, value: &Value) -> bool {
        self.first.guard(value)
            && self
                .first
                .convert(value.clone())
                .map_or(false, |intermediate| self.second.guard(&intermediate))
    }

    fn convert(&self, value: Value) -> InteropResult<Value> {
        let intermediate = self.first.convert(value)?;
        self.second.convert(intermediate)
    }
}

// ============================================================================
// Optional
// ============================================================================

/// Unconditional `main` converter preceded by an optional `pre` step
pub struct OptionalConverter {
    pre: Arc<dyn Converter>,
    main: Arc<dyn Converter>,
}

impl OptionalConverter {
    /// Apply `pre` when it holds, then always `main`
    pub fn new(pre: Arc<dyn Converter>, main: Arc<dyn Converter>) -> Self {
        Self { pre, main }
    }

    fn preprocess(&self, value: Value) -> InteropResult<Value> {
        if self.pre.guard(&value) {
            self.pre.convert(value)
        } else {
            Ok(value)
        }
    }
}

impl Converter for OptionalConverter {
    fn guard(&self, value: &Value) -> bool {
        self.preprocess(value.clone())
            .map_or(false, |prepared| self.main.guard(&prepared))
    }

    fn convert(&self, value: Value) -> InteropResult<Value> {
        let prepared = self.preprocess(value)?;
        self.main.convert(prepared)
    }
}

// ============================================================================
// LazySerial
// ============================================================================

/// First applicable converter from a list, identity if none applies
///
/// Member converters are built on first use.
pub struct LazySerialConverter {
    dest: HostType,
    factories: Vec<&'static dyn ConverterFactory>,
    converters: Vec<OnceCell<Arc<dyn Converter>>>,
    env: ConversionEnv,
}

impl LazySerialConverter {
    /// Lazily build converters from every factory that can target `dest`
    pub fn from_factories(
        dest: &HostType,
        factories: &[&'static dyn ConverterFactory],
        env: &ConversionEnv,
    ) -> Self {
        let factories: Vec<_> = factories
            .iter()
            .copied()
            .filter(|factory| factory.accepts(dest))
            .collect();
        let converters = factories.iter().map(|_| OnceCell::new()).collect();
        Self {
            dest: dest.clone(),
            factories,
            converters,
            env: env.clone(),
        }
    }

    /// Number of member converters built so far
    pub fn materialized(&self) -> usize {
        self.converters.iter().filter(|c| c.get().is_some()).count()
    }

    fn converter(&self, index: usize) -> &Arc<dyn Converter> {
        self.converters[index].get_or_init(|| {
            let factory = self.factories[index];
            tracing::trace!(
                dest = %self.dest,
                factory = factory.name(),
                "materializing lazy converter"
            );
            factory.make(&self.dest, &self.env)
        })
    }
}

impl Converter for LazySerialConverter {
    fn guard(&self, _value: &Value) -> bool {
        true
    }

    fn convert(&self, value: Value) -> InteropResult<Value> {
        for index in 0..self.factories.len() {
            let converter = self.converter(index);
            if converter.guard(&value) {
                return converter.convert(value);
            }
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::Tier;
    use trellis_host::{builtins, InteropError, MemoryRuntime};

    struct Doubler;

    impl Converter for Doubler {
        fn guard(&self, value: &Value) -> bool {
            matches!(value, Value::Int(_))
        }

        fn convert(&self, value: Value) -> InteropResult<Value> {
            match value {
                Value::Int(i) => Ok(Value::Int(i * 2)),
                other => Err(InteropError::Script(format!("not an int: {other:?}"))),
            }
        }
    }

    struct NullToZero;

    impl Converter for NullToZero {
        fn guard(&self, value: &Value) -> bool {
            matches!(value, Value::Null)
        }

        fn convert(&self, _value: Value) -> InteropResult<Value> {
            Ok(Value::Int(0))
        }
    }

    fn env() -> ConversionEnv {
        ConversionEnv::new(Arc::new(MemoryRuntime::new()))
    }

    #[test]
    fn test_combine_guards_on_intermediate_value() {
        let combined = CombineConverter::new(Arc::new(NullToZero), Arc::new(Doubler));
        assert!(combined.guard(&Value::Null));
        assert!(!combined.guard(&Value::Int(1)));
        assert_eq!(combined.convert(Value::Null).unwrap(), Value::Int(0));
    }

    #[test]
    fn test_optional_always_applies_main() {
        let optional = OptionalConverter::new(Arc::new(NullToZero), Arc::new(Doubler));
        assert_eq!(optional.convert(Value::Null).unwrap(), Value::Int(0));
        assert_eq!(optional.convert(Value::Int(3)).unwrap(), Value::Int(6));
        assert!(!optional.guard(&Value::from("x")));
    }

    #[test]
    fn test_lazy_serial_materializes_on_demand() {
        let env = env();
        let lazy =
            LazySerialConverter::from_factories(builtins::int(), Tier::Forcing.factories(), &env);
        assert_eq!(lazy.materialized(), 0);
        assert_eq!(lazy.convert(Value::Int(4)).unwrap(), Value::Int(4));
        assert_eq!(lazy.materialized(), 1);
        assert_eq!(lazy.convert(Value::Double(4.5)).unwrap(), Value::Int(4));
        let settled = lazy.materialized();
        assert!(settled > 1);
        lazy.convert(Value::Double(2.5)).unwrap();
        assert_eq!(lazy.materialized(), settled);
    }
}
