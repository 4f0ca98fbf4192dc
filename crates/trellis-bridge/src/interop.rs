//! Interop facade
//!
//! The operations a scripting runtime calls into: overload resolution, argument conversion,
//! adapter construction, and member access on host objects and types.

use std::sync::Arc;

use trellis_host::{
    builtins, HostArray, HostType, InteropError, InteropResult, ScriptRuntime, Value,
};

use crate::adapter::{AdapterLoader, AdapterSpec, GeneratedAdapterType};
use crate::catalog::{AccessorPair, HostCatalog, HostMember, Setter};
use crate::convert::{self, host_to_script, Tier};
use crate::options::{ConfigError, InteropOptions};
use crate::resolve::{OverloadResolver, Resolution};

/// Entry point of the bridge for one scripting runtime
pub struct Interop {
    options: InteropOptions,
    catalog: Arc<HostCatalog>,
    loader: Arc<AdapterLoader>,
}

/// Where member lookups on a receiver go
struct Target {
    ty: HostType,
    is_static: bool,
    receiver: Value,
}

impl Interop {
    /// Bridge with default options
    pub fn new(runtime: Arc<dyn ScriptRuntime>) -> Self {
        let options = InteropOptions::default();
        let catalog = Arc::new(HostCatalog::new());
        let loader = AdapterLoader::new(runtime, catalog.clone(), options.clone());
        Self {
            options,
            catalog,
            loader,
        }
    }

    /// Bridge with validated `options`
    pub fn with_options(
        runtime: Arc<dyn ScriptRuntime>,
        options: InteropOptions,
    ) -> Result<Self, ConfigError> {
        options.validate()?;
        let catalog = Arc::new(HostCatalog::new());
        let loader = AdapterLoader::new(runtime, catalog.clone(), options.clone());
        Ok(Self {
            options,
            catalog,
            loader,
        })
    }

    /// Active options
    pub fn options(&self) -> &InteropOptions {
        &self.options
    }

    /// Member catalog
    pub fn catalog(&self) -> &Arc<HostCatalog> {
        &self.catalog
    }

    /// Adapter registry
    pub fn loader(&self) -> &Arc<AdapterLoader> {
        &self.loader
    }

    /// Overload resolver
    pub fn resolver(&self) -> &OverloadResolver {
        self.loader.resolver()
    }

    // ========================================================================
    // Resolution and conversion
    // ========================================================================

    /// Select the member of `candidates` that best fits `args`
    pub fn resolve_overload(
        &self,
        candidates: &HostMember,
        args: &[Value],
    ) -> InteropResult<Resolution> {
        self.resolver().select_best(candidates, args)
    }

    /// Convert `value` toward `dest` with the converters of `tier`
    pub fn convert_argument(
        &self,
        value: Value,
        dest: &HostType,
        tier: Tier,
    ) -> InteropResult<Value> {
        convert::convert_argument(value, dest, tier, self.loader.env())
    }

    // ========================================================================
    // Adapters
    // ========================================================================

    /// Adapter type extending/implementing `types`
    pub fn build_adapter(&self, types: &[HostType]) -> InteropResult<Arc<GeneratedAdapterType>> {
        self.loader.get_adapter(&AdapterSpec::new(types)?)
    }

    /// Fresh adapter type whose instances share the delegates of `overrides`
    pub fn build_adapter_with_overrides(
        &self,
        types: &[HostType],
        overrides: Value,
    ) -> InteropResult<Arc<GeneratedAdapterType>> {
        self.loader
            .get_adapter_with_overrides(&AdapterSpec::new(types)?, overrides)
    }

    /// Instantiate `adapter`
    ///
    /// Without a behavior source the adapter must carry class-level overrides.
    pub fn instantiate_adapter(
        &self,
        adapter: &GeneratedAdapterType,
        ctor_args: &[Value],
        behavior: Option<Value>,
    ) -> InteropResult<Value> {
        let instance = match behavior {
            Some(behavior) => adapter.instantiate(self.resolver(), ctor_args, behavior)?,
            None => adapter.instantiate_shared(self.resolver(), ctor_args)?,
        };
        Ok(host_to_script(instance))
    }

    // ========================================================================
    // Member access
    // ========================================================================

    /// Call method `name` on `receiver`
    ///
    /// A static type view (`Value::Type`) as receiver calls a static method.
    pub fn invoke_method(
        &self,
        receiver: &Value,
        name: &str,
        args: &[Value],
    ) -> InteropResult<Value> {
        let target = self.target(receiver)?;
        self.invoke_on(&target, name, args)
    }

    /// Call static method `name` of `ty`
    pub fn invoke_static(&self, ty: &HostType, name: &str, args: &[Value]) -> InteropResult<Value> {
        let target = Target {
            ty: ty.clone(),
            is_static: true,
            receiver: Value::Undefined,
        };
        self.invoke_on(&target, name, args)
    }

    fn invoke_on(&self, target: &Target, name: &str, args: &[Value]) -> InteropResult<Value> {
        let member = self
            .catalog
            .entry(&target.ty)
            .lookup_method(name, target.is_static)?;
        let resolution = self.resolver().select_best(&member, args)?;
        let result = resolution.invoke(&target.receiver, args)?;
        Ok(to_script(result, &resolution.member().return_type()))
    }

    /// Construct an instance of `ty`
    ///
    /// Array types take exactly one length argument and produce a default-filled array.
    pub fn new_instance(&self, ty: &HostType, args: &[Value]) -> InteropResult<Value> {
        if let Some(component) = ty.component_type() {
            return self.new_array(ty, component, args);
        }
        let entry = self.catalog.entry(ty);
        let constructors = entry
            .constructors()
            .ok_or_else(|| InteropError::NoSuchMember {
                type_name: ty.name().to_string(),
                member: "<init>".to_string(),
            })?;
        let resolution = self.resolver().select_best(constructors, args)?;
        let instance = resolution.invoke(&Value::Undefined, args)?;
        Ok(host_to_script(instance))
    }

    fn new_array(
        &self,
        ty: &HostType,
        component: &HostType,
        args: &[Value],
    ) -> InteropResult<Value> {
        let [length] = args else {
            return Err(InteropError::TypeMismatch {
                expected: format!("one length argument for {}", ty.name()),
                actual: format!("{} arguments", args.len()),
            });
        };
        let length = self.convert_argument(length.clone(), builtins::int(), Tier::Default)?;
        let length = match length {
            Value::Int(n) if n >= 0 => n as usize,
            other => {
                return Err(InteropError::host(
                    ty.name(),
                    format!("invalid array length {}", other.type_name()),
                ))
            }
        };
        Ok(Value::Array(HostArray::with_length(component, length)))
    }

    /// Read property `name` of `receiver`
    ///
    /// On a static type view, public inner types are visible as properties too.
    pub fn get_property(&self, receiver: &Value, name: &str) -> InteropResult<Value> {
        let target = self.target(receiver)?;
        let entry = self.catalog.entry(&target.ty);
        if let Some(getter) = entry
            .lookup_accessor(name, target.is_static)
            .and_then(|pair| pair.getter.as_ref())
        {
            let value = getter.get(&target.receiver)?;
            return Ok(to_script(value, &getter.value_type()));
        }
        if target.is_static {
            if let Some(inner) = entry.lookup_inner_type(name) {
                return Ok(Value::Type(inner.clone()));
            }
        }
        Err(no_such_member(&target.ty, name))
    }

    /// Write property `name` of `receiver`
    ///
    /// The value is converted at the Default tier; overloaded setters are resolved against it.
    pub fn set_property(&self, receiver: &Value, name: &str, value: Value) -> InteropResult<()> {
        let target = self.target(receiver)?;
        let entry = self.catalog.entry(&target.ty);
        let setter = match entry.lookup_accessor(name, target.is_static) {
            Some(AccessorPair {
                setter: Some(setter),
                ..
            }) => setter,
            Some(_) => {
                return Err(InteropError::UnsupportedOperation(format!(
                    "{}.{name} is read-only",
                    target.ty.name()
                )))
            }
            None => return Err(no_such_member(&target.ty, name)),
        };
        match (setter, setter.value_type()) {
            (_, Some(dest)) => {
                let converted = self.convert_argument(value, &dest, Tier::Default)?;
                setter.set(&target.receiver, converted)
            }
            (Setter::Method(member), None) => {
                let resolution = self.resolver().select_best(member, &[value.clone()])?;
                resolution.invoke(&target.receiver, &[value]).map(|_| ())
            }
            (Setter::Field(_), None) => Err(no_such_member(&target.ty, name)),
        }
    }

    fn target(&self, receiver: &Value) -> InteropResult<Target> {
        if let Value::Type(ty) = receiver {
            return Ok(Target {
                ty: ty.clone(),
                is_static: true,
                receiver: Value::Undefined,
            });
        }
        let ty = receiver
            .host_type()
            .ok_or_else(|| InteropError::TypeMismatch {
                expected: "host object".to_string(),
                actual: receiver.type_name(),
            })?;
        Ok(Target {
            ty,
            is_static: false,
            receiver: receiver.clone(),
        })
    }
}

/// Host result in script representation; void members yield `undefined`
fn to_script(result: Value, return_type: &HostType) -> Value {
    if return_type.is_void() {
        Value::Undefined
    } else {
        host_to_script(result)
    }
}

fn no_such_member(ty: &HostType, name: &str) -> InteropError {
    InteropError::NoSuchMember {
        type_name: ty.name().to_string(),
        member: name.to_string(),
    }
}
