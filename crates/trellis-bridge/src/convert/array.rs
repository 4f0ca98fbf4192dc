//! Argument list converters
//!
//! - [`ObjectArrayConverter`] converts each positional argument independently.
//! - [`ArrayConverter`] converts values and packs them into a new host array.
//! - [`VarArgsConverter`] converts the fixed-arity prefix positionally and packs the trailing
//!   arguments into the variable arity array.

use std::sync::Arc;

use trellis_host::{HostArray, HostType, InteropResult, Value};

use super::{at_position, ArgumentConverter, Converter};

/// Positional converter over an argument list of fixed length
pub struct ObjectArrayConverter {
    converters: Vec<Arc<dyn Converter>>,
}

impl ObjectArrayConverter {
    /// One converter per argument position
    pub fn new(converters: Vec<Arc<dyn Converter>>) -> Self {
        Self { converters }
    }

    /// Number of positions
    pub fn arity(&self) -> usize {
        self.converters.len()
    }
}

impl ArgumentConverter for ObjectArrayConverter {
    fn guard(&self, args: &[Value]) -> bool {
        args.len() == self.converters.len()
            && self
                .converters
                .iter()
                .zip(args)
                .all(|(converter, arg)| converter.guard(arg))
    }

    fn convert(&self, args: &[Value]) -> InteropResult<Vec<Value>> {
        self.converters
            .iter()
            .zip(args)
            .enumerate()
            .map(|(position, (converter, arg))| {
                converter
                    .convert(arg.clone())
                    .map_err(|e| at_position(e, position))
            })
            .collect()
    }
}

/// Converts values and packs them into a fresh host array of `component`
pub struct ArrayConverter {
    component: HostType,
    converters: Vec<Arc<dyn Converter>>,
    offset: usize,
}

impl ArrayConverter {
    /// Array packer; `offset` is the argument position of the first element
    pub fn new(component: &HostType, converters: Vec<Arc<dyn Converter>>, offset: usize) -> Self {
        Self {
            component: component.clone(),
            converters,
            offset,
        }
    }

    /// Element type of the produced array
    pub fn component_type(&self) -> &HostType {
        &self.component
    }

    /// Whether every element converter applies
    pub fn guard(&self, values: &[Value]) -> bool {
        values.len() == self.converters.len()
            && self
                .converters
                .iter()
                .zip(values)
                .all(|(converter, value)| converter.guard(value))
    }

    /// Convert `values` and materialize the array
    pub fn pack(&self, values: &[Value]) -> InteropResult<Value> {
        let elements = self
            .converters
            .iter()
            .zip(values)
            .enumerate()
            .map(|(index, (converter, value))| {
                converter
                    .convert(value.clone())
                    .map_err(|e| at_position(e, self.offset + index))
            })
            .collect::<InteropResult<Vec<_>>>()?;
        Ok(Value::Array(HostArray::new(&self.component, elements)))
    }
}

/// Fixed-arity prefix plus a packed variable arity tail
pub struct VarArgsConverter {
    fixed: Vec<Arc<dyn Converter>>,
    tail: ArrayConverter,
}

impl VarArgsConverter {
    /// `fixed` converts the leading arguments; `tail` packs the rest
    pub fn new(fixed: Vec<Arc<dyn Converter>>, tail: ArrayConverter) -> Self {
        Self { fixed, tail }
    }
}

impl ArgumentConverter for VarArgsConverter {
    fn guard(&self, args: &[Value]) -> bool {
        let split = self.fixed.len();
        args.len() >= split
            && self
                .fixed
                .iter()
                .zip(args)
                .all(|(converter, arg)| converter.guard(arg))
            && self.tail.guard(&args[split..])
    }

    fn convert(&self, args: &[Value]) -> InteropResult<Vec<Value>> {
        let split = self.fixed.len().min(args.len());
        let mut converted = Vec::with_capacity(split + 1);
        for (position, (converter, arg)) in self.fixed.iter().zip(args).enumerate() {
            converted.push(
                converter
                    .convert(arg.clone())
                    .map_err(|e| at_position(e, position))?,
            );
        }
        converted.push(self.tail.pack(&args[split..])?);
        Ok(converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{IdentityConverter, Tier};
    use crate::convert::{find_converter, ConversionEnv};
    use trellis_host::{builtins, InteropError, MemoryRuntime};

    fn env() -> ConversionEnv {
        ConversionEnv::new(Arc::new(MemoryRuntime::new()))
    }

    #[test]
    fn test_object_array_converts_positionally() {
        let env = env();
        let converters = vec![
            find_converter(builtins::double(), &Value::Int(1), Tier::Default, &env).unwrap(),
            find_converter(builtins::string(), &Value::ScriptNull, Tier::Default, &env).unwrap(),
        ];
        let converter = ObjectArrayConverter::new(converters);
        let args = [Value::Int(1), Value::ScriptNull];
        assert!(converter.guard(&args));
        assert_eq!(
            converter.convert(&args).unwrap(),
            vec![Value::Double(1.0), Value::Null]
        );
    }

    #[test]
    fn test_varargs_packs_tail() {
        let env = env();
        let int = builtins::int();
        let tail = ArrayConverter::new(
            int,
            vec![
                find_converter(int, &Value::Int(1), Tier::Identity, &env).unwrap(),
                find_converter(int, &Value::Int(2), Tier::Identity, &env).unwrap(),
            ],
            1,
        );
        let fixed: Vec<Arc<dyn Converter>> = vec![Arc::new(IdentityConverter::new(builtins::string()))];
        let converter = VarArgsConverter::new(fixed, tail);
        let converted = converter
            .convert(&[Value::from("sum"), Value::Int(1), Value::Int(2)])
            .unwrap();
        assert_eq!(converted.len(), 2);
        let packed = converted[1].as_array().unwrap();
        assert_eq!(packed.array_type(), &HostType::array_of(int));
        assert_eq!(packed.to_vec(), vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_tail_errors_report_argument_position() {
        let env = env();
        let int = builtins::int();
        let lossy = find_converter(int, &Value::Double(1.5), Tier::Forcing, &env).unwrap();
        let tail = ArrayConverter::new(int, vec![lossy.clone(), lossy], 2);
        let err = tail.pack(&[Value::Double(1.5), Value::from("x")]).unwrap_err();
        assert!(matches!(err, InteropError::Conversion { position: 3, .. }));
    }
}
