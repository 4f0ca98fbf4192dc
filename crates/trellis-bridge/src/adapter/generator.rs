//! Adapter Generator
//!
//! Plans the members of a generated adapter type.
//!
//! # Generated members
//!
//! | Member                   | Body                                                       |
//! |--------------------------|------------------------------------------------------------|
//! | `m(P..)` per overridable | instance delegate, else class delegate, else inherited     |
//! | `super$m(P..)`           | inherited implementation (non-abstract members only)       |
//! | `<init>(P.., Object)`    | super constructor, then bind instance delegates            |
//! | `<init>(P..)`            | super constructor only (class-level overrides only)        |
//!
//! Class-level delegates are bound by the [`ClassBinder`] returned next to the blueprint.
//! The loader runs it exactly once, right after materializing the type.

use std::fmt;
use std::sync::Arc;
use std::thread::ThreadId;

use once_cell::sync::OnceCell;
use rustc_hash::{FxHashMap, FxHashSet};
use trellis_host::{
    builtins, ClassBuilder, ConstructorDefinition, HostConstructor, HostMethod, HostObject,
    HostType, InteropError, InteropResult, MethodBody, MethodDefinition, Modifiers,
    ScriptRuntime, Value,
};

use super::services::{check_thread, get_function, ScriptCallHandle};
use super::{AdapterKey, AdapterSpec, EXCLUDED_METHODS, SUPER_PREFIX};
use crate::catalog::HostMember;
use crate::convert::ConversionEnv;
use crate::options::InteropOptions;
use crate::resolve::OverloadResolver;

/// Binds class-level delegates of a freshly materialized adapter type
pub type ClassBinder = Box<dyn FnOnce() -> InteropResult<()> + Send>;

// ============================================================================
// Delegates
// ============================================================================

/// Script callable bound to one method name
#[derive(Clone)]
struct Delegate {
    callable: Value,
    receiver: Value,
}

type DelegateTable = FxHashMap<String, Delegate>;

/// Per-instance adapter state stored in the host object's extension slot
struct AdapterInstance {
    delegates: DelegateTable,
}

/// State shared by every generated body of one adapter type
pub(crate) struct AdapterShared {
    name: String,
    runtime: Arc<dyn ScriptRuntime>,
    owner: ThreadId,
    single_threaded: bool,
    hide_inherited_to_string: bool,
    class_overrides: bool,
    class_delegates: OnceCell<DelegateTable>,
    sam_name: Option<String>,
    method_names: Vec<String>,
}

impl AdapterShared {
    fn check_thread(&self) -> InteropResult<()> {
        if self.single_threaded {
            check_thread(self.owner, &self.name)
        } else {
            Ok(())
        }
    }

    /// Delegate table for a behavior source
    ///
    /// A callable implements the single abstract method of a function-constructible type;
    /// anything else must be an object whose callable members are matched by name.
    fn delegates_for(&self, behavior: &Value) -> InteropResult<DelegateTable> {
        let mut table = DelegateTable::default();
        if let Some(sam) = &self.sam_name {
            if self.runtime.is_callable(behavior) {
                table.insert(
                    sam.clone(),
                    Delegate {
                        callable: behavior.clone(),
                        receiver: Value::Undefined,
                    },
                );
                return Ok(table);
            }
        }
        if !self.runtime.is_object(behavior) {
            return Err(InteropError::TypeMismatch {
                expected: "script object".to_string(),
                actual: behavior.type_name(),
            });
        }
        for name in &self.method_names {
            let found = get_function(
                self.runtime.as_ref(),
                behavior,
                name,
                self.hide_inherited_to_string,
            )?;
            if let Some(callable) = found {
                table.insert(
                    name.clone(),
                    Delegate {
                        callable,
                        receiver: behavior.clone(),
                    },
                );
            }
        }
        Ok(table)
    }

    fn bind_instance(&self, object: &HostObject, behavior: &Value) -> InteropResult<()> {
        let delegates = self.delegates_for(behavior)?;
        if object.set_extension(Arc::new(AdapterInstance { delegates })) {
            Ok(())
        } else {
            Err(InteropError::host(
                self.name.clone(),
                "adapter delegates are already bound",
            ))
        }
    }

    fn bind_class(&self, overrides: &Value) -> InteropResult<()> {
        let delegates = self.delegates_for(overrides)?;
        tracing::debug!(
            adapter = %self.name,
            delegates = delegates.len(),
            "binding class-level delegates"
        );
        self.class_delegates.set(delegates).map_err(|_| {
            InteropError::host(self.name.clone(), "class-level delegates are already bound")
        })
    }

    fn find_delegate(&self, receiver: &Value, name: &str) -> Option<Delegate> {
        let instance = receiver
            .as_host_object()
            .and_then(HostObject::extension)
            .and_then(|state| state.downcast_ref::<AdapterInstance>())
            .and_then(|state| state.delegates.get(name));
        if let Some(delegate) = instance {
            return Some(delegate.clone());
        }
        if self.class_overrides {
            return self
                .class_delegates
                .get()
                .and_then(|table| table.get(name))
                .cloned();
        }
        None
    }
}

// ============================================================================
// Member plans
// ============================================================================

/// One overridable method of the adapter
struct MethodPlan {
    method: Arc<HostMethod>,
    inherited: Option<Arc<HostMethod>>,
    handle: ScriptCallHandle,
}

impl MethodPlan {
    fn dispatch(
        &self,
        shared: &AdapterShared,
        receiver: &Value,
        args: &[Value],
    ) -> InteropResult<Value> {
        shared.check_thread()?;
        if let Some(delegate) = shared.find_delegate(receiver, self.method.name()) {
            return self
                .handle
                .invoke(&delegate.callable, &delegate.receiver, args);
        }
        self.call_inherited(receiver, args)
    }

    fn call_inherited(&self, receiver: &Value, args: &[Value]) -> InteropResult<Value> {
        match &self.inherited {
            Some(inherited) => inherited.invoke_special(receiver, args),
            None => Err(InteropError::UnsupportedOperation(self.method.signature())),
        }
    }

    fn modifiers(&self) -> Modifiers {
        let mut modifiers = if self.method.is_protected() {
            Modifiers::PROTECTED
        } else {
            Modifiers::PUBLIC
        };
        if self.method.is_varargs() {
            modifiers = modifiers | Modifiers::VARARGS;
        }
        modifiers
    }
}

/// Constructor of the adapter: a super constructor plus an optional behavior parameter
struct ConstructorPlan {
    inherited: Arc<HostConstructor>,
    takes_behavior: bool,
}

// ============================================================================
// Blueprint
// ============================================================================

/// Fully planned adapter type, ready to be materialized by the loader
pub struct AdapterBlueprint {
    key: AdapterKey,
    shared: Arc<AdapterShared>,
    methods: Vec<Arc<MethodPlan>>,
    constructors: Vec<ConstructorPlan>,
    excluded: usize,
}

impl AdapterBlueprint {
    /// Name of the type to be generated
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Cache key
    pub fn key(&self) -> &AdapterKey {
        &self.key
    }

    /// Names of the overridable methods
    pub fn method_names(&self) -> &[String] {
        &self.shared.method_names
    }

    /// Name of the single abstract method, if function-constructible
    pub fn sam_name(&self) -> Option<&str> {
        self.shared.sam_name.as_deref()
    }

    /// Build the host type
    pub(crate) fn materialize(self) -> GeneratedAdapterType {
        let AdapterBlueprint {
            key,
            shared,
            methods,
            constructors,
            ..
        } = self;

        let mut builder = ClassBuilder::class(shared.name.clone())
            .extends(key.supertype())
            .as_final();
        for iface in key.interfaces() {
            builder = builder.implements(iface);
        }

        for plan in &methods {
            let dispatch: MethodBody = {
                let plan = plan.clone();
                let shared = shared.clone();
                Arc::new(move |receiver, args| plan.dispatch(&shared, receiver, args))
            };
            builder = builder.method(
                MethodDefinition::new(plan.method.name())
                    .params(plan.method.params().to_vec())
                    .returns(plan.method.return_type())
                    .with_modifiers(plan.modifiers())
                    .shared_body(dispatch),
            );

            if plan.inherited.is_some() {
                let call_through: MethodBody = {
                    let plan = plan.clone();
                    let shared = shared.clone();
                    Arc::new(move |receiver, args| {
                        shared.check_thread()?;
                        plan.call_inherited(receiver, args)
                    })
                };
                builder = builder.method(
                    MethodDefinition::new(format!("{SUPER_PREFIX}{}", plan.method.name()))
                        .params(plan.method.params().to_vec())
                        .returns(plan.method.return_type())
                        .with_modifiers(plan.modifiers())
                        .shared_body(call_through),
                );
            }
        }

        let behavior_constructors = constructors.iter().map(|c| c.takes_behavior).collect();
        for plan in constructors {
            builder = builder.constructor(constructor_definition(&shared, plan));
        }

        let host_type = builder.build();
        GeneratedAdapterType {
            key,
            host_type,
            shared,
            behavior_constructors,
        }
    }
}

impl fmt::Debug for AdapterBlueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterBlueprint")
            .field("name", &self.shared.name)
            .field("methods", &self.shared.method_names)
            .field("constructors", &self.constructors.len())
            .field("excluded", &self.excluded)
            .finish()
    }
}

fn constructor_definition(
    shared: &Arc<AdapterShared>,
    plan: ConstructorPlan,
) -> ConstructorDefinition {
    let ConstructorPlan {
        inherited,
        takes_behavior,
    } = plan;
    let visibility = if inherited.is_protected() {
        Modifiers::PROTECTED
    } else {
        Modifiers::PUBLIC
    };
    let shared = shared.clone();

    if takes_behavior {
        let mut params = inherited.params().to_vec();
        params.push(builtins::object().clone());
        return ConstructorDefinition::new()
            .params(params)
            .with_modifiers(visibility)
            .body(move |object, args| {
                shared.check_thread()?;
                let (behavior, ctor_args) = args.split_last().ok_or_else(|| {
                    InteropError::host(shared.name.clone(), "missing behavior argument")
                })?;
                inherited.initialize(object, ctor_args)?;
                shared.bind_instance(object, behavior)
            });
    }

    let modifiers = if inherited.is_varargs() {
        visibility | Modifiers::VARARGS
    } else {
        visibility
    };
    ConstructorDefinition::new()
        .params(inherited.params().to_vec())
        .with_modifiers(modifiers)
        .body(move |object, args| {
            shared.check_thread()?;
            inherited.initialize(object, args)
        })
}

// ============================================================================
// Generated type
// ============================================================================

/// A materialized adapter type
pub struct GeneratedAdapterType {
    key: AdapterKey,
    host_type: HostType,
    shared: Arc<AdapterShared>,
    /// Per constructor, in declaration order: whether it takes a behavior argument
    behavior_constructors: Vec<bool>,
}

impl GeneratedAdapterType {
    /// The generated host type
    pub fn host_type(&self) -> &HostType {
        &self.host_type
    }

    /// Generated type name
    pub fn name(&self) -> &str {
        self.host_type.name()
    }

    /// Key the type was generated for
    pub fn key(&self) -> &AdapterKey {
        &self.key
    }

    /// Whether the type carries class-level delegates
    pub fn has_class_overrides(&self) -> bool {
        self.shared.class_overrides
    }

    /// Whether a bare callable can serve as behavior
    pub fn is_function_constructible(&self) -> bool {
        self.shared.sam_name.is_some()
    }

    /// Name of the single abstract method, if function-constructible
    pub fn sam_name(&self) -> Option<&str> {
        self.shared.sam_name.as_deref()
    }

    /// Names of the overridable methods
    pub fn method_names(&self) -> &[String] {
        &self.shared.method_names
    }

    /// Names of methods with a class-level delegate
    pub fn class_delegate_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .shared
            .class_delegates
            .get()
            .map(|table| table.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Instantiate with `behavior` bound as the instance delegate source
    pub fn instantiate(
        &self,
        resolver: &OverloadResolver,
        ctor_args: &[Value],
        behavior: Value,
    ) -> InteropResult<Value> {
        let mut args = ctor_args.to_vec();
        args.push(behavior);
        self.construct(resolver, &args, true)
    }

    /// Instantiate relying on class-level delegates only
    pub fn instantiate_shared(
        &self,
        resolver: &OverloadResolver,
        ctor_args: &[Value],
    ) -> InteropResult<Value> {
        if !self.has_class_overrides() {
            return Err(InteropError::UnsupportedOperation(format!(
                "{} requires a behavior argument",
                self.name()
            )));
        }
        self.construct(resolver, ctor_args, false)
    }

    fn construct(
        &self,
        resolver: &OverloadResolver,
        args: &[Value],
        with_behavior: bool,
    ) -> InteropResult<Value> {
        let candidates: Vec<HostMember> = self
            .host_type
            .constructors()
            .iter()
            .zip(&self.behavior_constructors)
            .filter(|(_, takes_behavior)| **takes_behavior == with_behavior)
            .map(|(ctor, _)| HostMember::Constructor(ctor.clone()))
            .collect();
        resolver
            .select_from(&candidates, args)?
            .invoke(&Value::Undefined, args)
    }
}

impl fmt::Debug for GeneratedAdapterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedAdapterType")
            .field("name", &self.name())
            .field("key", &self.key)
            .field("class_overrides", &self.has_class_overrides())
            .finish()
    }
}

// ============================================================================
// Generator
// ============================================================================

/// Plans adapter types
#[derive(Clone)]
pub struct AdapterGenerator {
    env: ConversionEnv,
    options: InteropOptions,
}

impl AdapterGenerator {
    /// Create a generator
    pub fn new(env: ConversionEnv, options: InteropOptions) -> Self {
        Self { env, options }
    }

    /// Plan the adapter for `spec`
    ///
    /// With class-level overrides, the returned binder must be run once after the type is
    /// materialized to bind `overrides` as shared delegates.
    pub fn generate(
        &self,
        spec: &AdapterSpec,
        overrides: Option<Value>,
    ) -> InteropResult<(AdapterBlueprint, Option<ClassBinder>)> {
        let key = spec.key().clone();
        let class_overrides = spec.has_class_overrides() || overrides.is_some();
        let gathered = gather_methods(&key);
        let constructors = self.plan_constructors(&key, class_overrides)?;

        let sam_name = gathered.single_abstract_name();

        let mut method_names: Vec<String> = Vec::new();
        for (method, _) in &gathered.methods {
            if !method_names.iter().any(|n| n == method.name()) {
                method_names.push(method.name().to_string());
            }
        }

        let shared = Arc::new(AdapterShared {
            name: self.type_name(&key),
            runtime: self.env.runtime().clone(),
            owner: std::thread::current().id(),
            single_threaded: self.options.single_threaded,
            hide_inherited_to_string: self.options.hide_inherited_to_string,
            class_overrides,
            class_delegates: OnceCell::new(),
            sam_name,
            method_names,
        });

        let methods = gathered
            .methods
            .into_iter()
            .map(|(method, inherited)| {
                let handle =
                    ScriptCallHandle::new(&self.env, method.return_type(), method.is_varargs());
                Arc::new(MethodPlan {
                    method,
                    inherited,
                    handle,
                })
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            adapter = %shared.name,
            methods = methods.len(),
            excluded = gathered.excluded,
            constructors = constructors.len(),
            sam = ?shared.sam_name,
            class_overrides,
            "generated adapter blueprint"
        );

        let binder: Option<ClassBinder> = overrides.map(|overrides| {
            let shared = shared.clone();
            Box::new(move || shared.bind_class(&overrides)) as ClassBinder
        });

        Ok((
            AdapterBlueprint {
                key,
                shared,
                methods,
                constructors,
                excluded: gathered.excluded,
            },
            binder,
        ))
    }

    /// Generated type name: `<base><suffix>[$$<Iface>...]`, truncated
    pub fn type_name(&self, key: &AdapterKey) -> String {
        let naming = if key.supertype().is_root() {
            key.interfaces().first().unwrap_or(key.supertype())
        } else {
            key.supertype()
        };
        let mut name = format!("{}{}", naming.name(), self.options.adapter_suffix);
        for iface in key.interfaces() {
            if iface != naming {
                name.push_str("$$");
                name.push_str(iface.simple_name());
            }
        }
        if name.chars().count() > self.options.max_type_name_len {
            name = name.chars().take(self.options.max_type_name_len).collect();
        }
        name
    }

    /// Behavior constructors for every accessible super constructor, plus plain ones when
    /// class-level overrides are requested
    fn plan_constructors(
        &self,
        key: &AdapterKey,
        class_overrides: bool,
    ) -> InteropResult<Vec<ConstructorPlan>> {
        let accessible: Vec<Arc<HostConstructor>> = key
            .supertype()
            .constructors()
            .iter()
            .filter(|ctor| ctor.is_public() || ctor.is_protected())
            .cloned()
            .collect();
        if accessible.is_empty() {
            return Err(InteropError::NoAccessibleConstructor {
                type_name: key.supertype().name().to_string(),
            });
        }
        let mut plans: Vec<ConstructorPlan> = accessible
            .iter()
            .map(|ctor| ConstructorPlan {
                inherited: ctor.clone(),
                takes_behavior: true,
            })
            .collect();
        if class_overrides {
            plans.extend(accessible.into_iter().map(|ctor| ConstructorPlan {
                inherited: ctor,
                takes_behavior: false,
            }));
        }
        Ok(plans)
    }
}

// ============================================================================
// Method gathering
// ============================================================================

struct GatheredMethods {
    /// Overridable methods with their inherited implementation (`None` when abstract)
    methods: Vec<(Arc<HostMethod>, Option<Arc<HostMethod>>)>,
    excluded: usize,
}

impl GatheredMethods {
    fn abstract_names(&self) -> FxHashSet<String> {
        self.methods
            .iter()
            .filter(|(_, inherited)| inherited.is_none())
            .map(|(method, _)| method.name().to_string())
            .collect()
    }

    fn single_abstract_name(&self) -> Option<String> {
        let mut names = self.abstract_names().into_iter();
        match (names.next(), names.next()) {
            (Some(name), None) => Some(name),
            _ => None,
        }
    }
}

/// Distinct names of the methods an adapter for `key` has no inherited implementation for
///
/// Public and protected members both count. A bare callable can only stand in for an
/// adapter whose set has exactly one name.
pub fn abstract_method_names(key: &AdapterKey) -> FxHashSet<String> {
    gather_methods(key).abstract_names()
}

/// Every overridable method reachable from the supertype and interfaces, one per signature
fn gather_methods(key: &AdapterKey) -> GatheredMethods {
    let mut seen: Vec<Arc<HostMethod>> = Vec::new();
    let mut excluded: Vec<Arc<HostMethod>> = Vec::new();

    let roots = std::iter::once(key.supertype().clone()).chain(key.interfaces().iter().cloned());
    let mut owners: Vec<HostType> = Vec::new();
    for root in roots {
        for ty in std::iter::once(root.clone()).chain(root.ancestors()) {
            if !owners.contains(&ty) {
                owners.push(ty);
            }
        }
    }

    for owner in &owners {
        for method in owner.declared_methods() {
            if method.is_static()
                || !(method.is_public() || method.is_protected())
                || method.name().starts_with(SUPER_PREFIX)
            {
                continue;
            }
            let known = |list: &[Arc<HostMethod>]| list.iter().any(|m| m.same_signature(method));
            if known(&seen) || known(&excluded) {
                continue;
            }
            if method.is_final() || EXCLUDED_METHODS.contains(&method.name()) {
                excluded.push(method.clone());
            } else {
                seen.push(method.clone());
            }
        }
    }

    let methods = seen
        .into_iter()
        .map(|method| {
            let inherited = inherited_implementation(key, &method);
            (method, inherited)
        })
        .collect();
    GatheredMethods {
        methods,
        excluded: excluded.len(),
    }
}

/// Implementation a super call from the adapter reaches
fn inherited_implementation(key: &AdapterKey, method: &HostMethod) -> Option<Arc<HostMethod>> {
    let (name, params) = (method.name(), method.params());
    key.supertype().find_method(name, params).or_else(|| {
        key.interfaces()
            .iter()
            .find_map(|iface| iface.find_method(name, params))
    })
}
