//! Adapter Loader
//!
//! Materializes generated adapter blueprints and keeps a registry of them keyed by
//! `(supertype, interfaces)`. Requests with class-level overrides always produce a fresh
//! type because the overrides are bound into the type itself.

use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use trellis_host::{HostType, InteropError, InteropResult, ScriptRuntime, Value};

use super::generator::{AdapterGenerator, GeneratedAdapterType};
use super::{AdapterKey, AdapterSpec};
use crate::catalog::HostCatalog;
use crate::convert::{ConversionEnv, FunctionalAdapters};
use crate::options::InteropOptions;
use crate::resolve::OverloadResolver;

/// Adapter registry
pub struct AdapterLoader {
    generator: AdapterGenerator,
    resolver: OverloadResolver,
    catalog: Arc<HostCatalog>,
    cache: DashMap<AdapterKey, Arc<GeneratedAdapterType>>,
    cache_enabled: bool,
    /// Serializes generate, materialize and bind for class-level overrides
    class_lock: Mutex<()>,
}

impl AdapterLoader {
    /// Create a loader
    ///
    /// The loader's conversion environment can adapt script callables to
    /// function-constructible types through the loader itself.
    pub fn new(
        runtime: Arc<dyn ScriptRuntime>,
        catalog: Arc<HostCatalog>,
        options: InteropOptions,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<AdapterLoader>| {
            let functional: Weak<dyn FunctionalAdapters> = weak.clone();
            let env = ConversionEnv::new(runtime).with_functional_adapters(functional);
            AdapterLoader {
                generator: AdapterGenerator::new(env.clone(), options.clone()),
                resolver: OverloadResolver::new(env),
                catalog,
                cache: DashMap::new(),
                cache_enabled: options.cache_adapters,
                class_lock: Mutex::new(()),
            }
        })
    }

    /// Conversion environment shared with generated adapters
    pub fn env(&self) -> &ConversionEnv {
        self.resolver.env()
    }

    /// Resolver used to select adapter constructors
    pub fn resolver(&self) -> &OverloadResolver {
        &self.resolver
    }

    /// Adapter type for `spec`, reused across requests
    pub fn get_adapter(&self, spec: &AdapterSpec) -> InteropResult<Arc<GeneratedAdapterType>> {
        if spec.has_class_overrides() {
            return Err(InteropError::InvalidAdapterSpec(
                "class-level overrides require an override object".to_string(),
            ));
        }
        if !self.cache_enabled {
            return self.load(spec);
        }
        match self.cache.entry(spec.key().clone()) {
            Entry::Occupied(entry) => {
                tracing::debug!(key = ?spec.key(), "adapter cache hit");
                Ok(entry.get().clone())
            }
            Entry::Vacant(entry) => {
                tracing::debug!(key = ?spec.key(), "adapter cache miss");
                let adapter = self.load(spec)?;
                entry.insert(adapter.clone());
                Ok(adapter)
            }
        }
    }

    /// Fresh adapter type whose class-level delegates come from `overrides`
    ///
    /// Never cached.
    pub fn get_adapter_with_overrides(
        &self,
        spec: &AdapterSpec,
        overrides: Value,
    ) -> InteropResult<Arc<GeneratedAdapterType>> {
        let spec = spec.clone().with_class_overrides();
        let _guard = self.class_lock.lock();
        let (blueprint, binder) = self.generator.generate(&spec, Some(overrides))?;
        let adapter = blueprint.materialize();
        if let Some(bind) = binder {
            bind()?;
        }
        tracing::debug!(adapter = adapter.name(), "loaded adapter with class overrides");
        Ok(Arc::new(adapter))
    }

    fn load(&self, spec: &AdapterSpec) -> InteropResult<Arc<GeneratedAdapterType>> {
        let (blueprint, _) = self.generator.generate(spec, None)?;
        let adapter = blueprint.materialize();
        tracing::debug!(adapter = adapter.name(), "loaded adapter");
        Ok(Arc::new(adapter))
    }

    /// Cached adapter for `key`, if any
    pub fn cached(&self, key: &AdapterKey) -> Option<Arc<GeneratedAdapterType>> {
        self.cache.get(key).map(|entry| entry.clone())
    }

    /// Forget the cached adapter for `key`
    pub fn invalidate(&self, key: &AdapterKey) -> bool {
        self.cache.remove(key).is_some()
    }

    /// Forget every cached adapter
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Number of cached adapters
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether no adapter is cached
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl FunctionalAdapters for AdapterLoader {
    fn is_function_constructible(&self, ty: &HostType) -> bool {
        AdapterSpec::new(std::slice::from_ref(ty)).is_ok() && self.catalog.entry(ty).is_sam_type()
    }

    fn adapt_function(&self, ty: &HostType, callable: Value) -> InteropResult<Value> {
        let spec = AdapterSpec::new(std::slice::from_ref(ty))?;
        let adapter = self.get_adapter(&spec)?;
        adapter.instantiate(&self.resolver, &[], callable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_host::{builtins, ClassBuilder, MemoryRuntime, MethodDefinition};

    fn loader(options: InteropOptions) -> (Arc<MemoryRuntime>, Arc<AdapterLoader>) {
        let runtime = Arc::new(MemoryRuntime::new());
        let loader = AdapterLoader::new(runtime.clone(), Arc::new(HostCatalog::new()), options);
        (runtime, loader)
    }

    fn supplier() -> HostType {
        ClassBuilder::interface("demo.Supplier")
            .method(MethodDefinition::new("get").returns(builtins::object()))
            .build()
    }

    #[test]
    fn test_cache_reuses_types() {
        let (_, loader) = loader(InteropOptions::default());
        let spec = AdapterSpec::new(&[supplier()]).unwrap();
        let first = loader.get_adapter(&spec).unwrap();
        let second = loader.get_adapter(&spec).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.len(), 1);
        assert!(loader.invalidate(spec.key()));
        let third = loader.get_adapter(&spec).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        loader.clear();
        assert!(loader.is_empty());
    }

    #[test]
    fn test_cache_can_be_disabled() {
        let (_, loader) = loader(InteropOptions::default().with_cache_adapters(false));
        let spec = AdapterSpec::new(&[supplier()]).unwrap();
        let first = loader.get_adapter(&spec).unwrap();
        let second = loader.get_adapter(&spec).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(loader.cached(spec.key()).is_none());
    }

    #[test]
    fn test_overrides_are_never_cached() {
        let (runtime, loader) = loader(InteropOptions::default());
        let spec = AdapterSpec::new(&[supplier()]).unwrap();
        let overrides = runtime.object_from([("get", runtime.function(|_, _| Ok(Value::Int(1))))]);
        let first = loader
            .get_adapter_with_overrides(&spec, overrides.clone())
            .unwrap();
        let second = loader.get_adapter_with_overrides(&spec, overrides).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.class_delegate_names(), vec!["get".to_string()]);
        assert!(loader.is_empty());
    }

    #[test]
    fn test_function_adaptation() {
        let (runtime, loader) = loader(InteropOptions::default());
        let supplier = supplier();
        assert!(loader.is_function_constructible(&supplier));
        assert!(!loader.is_function_constructible(builtins::string()));
        let instance = loader
            .adapt_function(&supplier, runtime.function(|_, _| Ok(Value::from("made"))))
            .unwrap();
        assert!(instance.is_instance_of(&supplier));
        let get = supplier.declared_methods()[0].clone();
        assert_eq!(get.invoke(&instance, &[]).unwrap(), Value::from("made"));
    }
}
