//! One-shot member enumeration for a host type
//!
//! Walks the type and all of its ancestors once and produces the name-keyed maps a
//! [`CatalogEntry`](super::CatalogEntry) serves lookups from.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use trellis_host::{builtins, HostField, HostMethod, HostType, PrimitiveKind};

use super::member::{AccessorPair, Getter, HostMember, Setter};

/// Everything a catalog entry knows about a type
#[derive(Default)]
pub(crate) struct Introspection {
    pub(crate) methods: FxHashMap<String, HostMember>,
    pub(crate) static_methods: FxHashMap<String, HostMember>,
    pub(crate) accessors: FxHashMap<String, AccessorPair>,
    pub(crate) static_accessors: FxHashMap<String, AccessorPair>,
    pub(crate) inner_types: FxHashMap<String, HostType>,
    pub(crate) constructors: Option<HostMember>,
}

/// Enumerate the members of `ty`
pub(crate) fn introspect(ty: &HostType) -> Introspection {
    let mut out = Introspection::default();
    let public_methods = collect_public_methods(ty);

    let mut instance_groups: Vec<(String, Vec<HostMember>)> = Vec::new();
    let mut static_groups: Vec<(String, Vec<HostMember>)> = Vec::new();
    for method in &public_methods {
        let groups = if method.is_static() {
            &mut static_groups
        } else {
            &mut instance_groups
        };
        push_grouped(groups, method.name(), HostMember::Method(method.clone()));
    }

    out.accessors = bean_accessors(public_methods.iter().filter(|m| !m.is_static()));
    out.static_accessors = bean_accessors(public_methods.iter().filter(|m| m.is_static()));

    for field in public_fields(ty) {
        let accessors = if field.is_static() {
            &mut out.static_accessors
        } else {
            &mut out.accessors
        };
        if accessors.contains_key(field.name()) {
            continue;
        }
        let setter = (!field.is_final()).then(|| Setter::Field(field.clone()));
        accessors.insert(
            field.name().to_string(),
            AccessorPair {
                getter: Some(Getter::Field(field.clone())),
                setter,
            },
        );
    }

    synthesize_accessors(ty, &public_methods, &mut out);

    out.methods = collapse(instance_groups);
    out.static_methods = collapse(static_groups);

    for inner in ty.inner_types().iter().filter(|inner| inner.is_public()) {
        out.inner_types
            .insert(inner.simple_name().to_string(), inner.clone());
    }

    out.constructors = HostMember::from_overloads(
        ty.constructors()
            .iter()
            .filter(|ctor| ctor.is_public())
            .cloned()
            .map(HostMember::Constructor)
            .collect(),
    );
    out
}

/// Public methods of `ty` and its ancestors, most derived first, one per signature
///
/// A method declared on a non-public type is replaced by the same signature on a public
/// ancestor; if no public ancestor declares it, the method is not exposed.
fn collect_public_methods(ty: &HostType) -> Vec<Arc<HostMethod>> {
    let mut found: Vec<Arc<HostMethod>> = Vec::new();
    let mut declared_public: Vec<bool> = Vec::new();

    for owner in std::iter::once(ty.clone()).chain(ty.ancestors()) {
        let owner_public = owner.is_public();
        for method in owner.declared_methods() {
            if !method.is_public() {
                continue;
            }
            if method.is_static() && owner.is_interface() && &owner != ty {
                continue;
            }
            match found.iter().position(|m| m.same_signature(method)) {
                Some(index) => {
                    if !declared_public[index] && owner_public {
                        found[index] = method.clone();
                        declared_public[index] = true;
                    }
                }
                None => {
                    found.push(method.clone());
                    declared_public.push(owner_public);
                }
            }
        }
    }

    found
        .into_iter()
        .zip(declared_public)
        .filter_map(|(method, public)| public.then_some(method))
        .collect()
}

fn public_fields(ty: &HostType) -> Vec<Arc<HostField>> {
    let mut fields: Vec<Arc<HostField>> = Vec::new();
    for owner in std::iter::once(ty.clone()).chain(ty.ancestors()) {
        if !owner.is_public() {
            continue;
        }
        for field in owner.declared_fields() {
            if field.is_public() && !fields.iter().any(|f| f.name() == field.name()) {
                fields.push(field.clone());
            }
        }
    }
    fields
}

fn push_grouped(groups: &mut Vec<(String, Vec<HostMember>)>, name: &str, member: HostMember) {
    match groups.iter_mut().find(|(existing, _)| existing == name) {
        Some((_, members)) => members.push(member),
        None => groups.push((name.to_string(), vec![member])),
    }
}

fn collapse(groups: Vec<(String, Vec<HostMember>)>) -> FxHashMap<String, HostMember> {
    groups
        .into_iter()
        .filter_map(|(name, members)| HostMember::from_overloads(members).map(|m| (name, m)))
        .collect()
}

// ============================================================================
// Bean accessors
// ============================================================================

fn bean_accessors<'a>(
    methods: impl Iterator<Item = &'a Arc<HostMethod>>,
) -> FxHashMap<String, AccessorPair> {
    let mut getters: Vec<(String, Arc<HostMethod>)> = Vec::new();
    let mut setters: Vec<(String, Vec<HostMember>)> = Vec::new();

    for method in methods {
        let name = method.name();
        let arity = method.params().len();
        if arity == 0
            && name.len() > 3
            && name.starts_with("get")
            && !method.return_type().is_void()
        {
            getters.push((decapitalize(&name[3..]), method.clone()));
        } else if arity == 0
            && name.len() > 2
            && name.starts_with("is")
            && method.return_type().primitive_kind() == Some(PrimitiveKind::Boolean)
        {
            getters.push((decapitalize(&name[2..]), method.clone()));
        } else if arity == 1 && name.len() > 3 && name.starts_with("set") {
            push_grouped(
                &mut setters,
                &decapitalize(&name[3..]),
                HostMember::Method(method.clone()),
            );
        }
    }

    let mut accessors: FxHashMap<String, AccessorPair> = FxHashMap::default();
    for (property, getter) in getters {
        accessors.entry(property).or_default().getter.get_or_insert_with(|| {
            Getter::Method(HostMember::Method(getter))
        });
    }
    for (property, group) in setters {
        if let Some(member) = HostMember::from_overloads(group) {
            accessors.entry(property).or_default().setter = Some(Setter::Method(member));
        }
    }
    accessors
}

/// Lower-case the first character unless the name starts with an acronym
///
/// `Name` becomes `name`; `URLPath` stays `URLPath`.
pub fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    if first.is_lowercase() {
        return name.to_string();
    }
    if chars.next().map_or(false, char::is_uppercase) {
        return name.to_string();
    }
    first.to_lowercase().chain(name.chars().skip(1)).collect()
}

// ============================================================================
// Synthesized accessors
// ============================================================================

fn synthesize_accessors(ty: &HostType, methods: &[Arc<HostMethod>], out: &mut Introspection) {
    out.static_accessors.insert(
        "class".to_string(),
        AccessorPair {
            getter: Some(Getter::TypeMirror(ty.clone())),
            setter: None,
        },
    );

    if ty.is_array() {
        out.accessors.insert(
            "length".to_string(),
            AccessorPair {
                getter: Some(Getter::ArrayLength),
                setter: None,
            },
        );
    } else if builtins::list().is_assignable_from(ty) {
        let size = methods
            .iter()
            .find(|m| !m.is_static() && m.name() == "size" && m.params().is_empty());
        if let Some(size) = size {
            out.accessors.insert(
                "length".to_string(),
                AccessorPair {
                    getter: Some(Getter::ListLength(size.clone())),
                    setter: None,
                },
            );
        }
    }

    if ty == builtins::class() {
        out.accessors.insert(
            "static".to_string(),
            AccessorPair {
                getter: Some(Getter::StaticView),
                setter: None,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_host::{ClassBuilder, FieldDefinition, MethodDefinition, Value};

    fn constant(
        value: Value,
    ) -> impl Fn(&Value, &[Value]) -> trellis_host::InteropResult<Value> + Send + Sync + 'static
    {
        move |_, _| Ok(value.clone())
    }

    #[test]
    fn test_decapitalize() {
        assert_eq!(decapitalize("Name"), "name");
        assert_eq!(decapitalize("URLPath"), "URLPath");
        assert_eq!(decapitalize("x"), "x");
        assert_eq!(decapitalize("X"), "x");
        assert_eq!(decapitalize(""), "");
    }

    #[test]
    fn test_bean_properties() {
        let ty = ClassBuilder::class("demo.Person")
            .method(
                MethodDefinition::new("getName")
                    .returns(builtins::string())
                    .body(constant(Value::from("ada"))),
            )
            .method(
                MethodDefinition::new("isActive")
                    .returns(builtins::boolean())
                    .body(constant(Value::Bool(true))),
            )
            .method(
                MethodDefinition::new("isNamed")
                    .returns(builtins::string())
                    .body(constant(Value::from("no"))),
            )
            .method(
                MethodDefinition::new("setName")
                    .param(builtins::string())
                    .body(constant(Value::Undefined)),
            )
            .method(
                MethodDefinition::new("get")
                    .returns(builtins::string())
                    .body(constant(Value::Undefined)),
            )
            .build();
        let info = introspect(&ty);
        let name = &info.accessors["name"];
        assert!(name.getter.is_some());
        assert!(name.setter.is_some());
        assert!(info.accessors["active"].setter.is_none());
        assert!(!info.accessors.contains_key("named"));
        assert!(!info.accessors.contains_key(""));
        assert!(info.methods.contains_key("getName"));
        assert!(info.methods.contains_key("toString"));
    }

    #[test]
    fn test_void_getter_is_not_a_property() {
        let ty = ClassBuilder::class("demo.Loader")
            .method(MethodDefinition::new("getReady").body(constant(Value::Undefined)))
            .method(
                MethodDefinition::new("getCount")
                    .returns(builtins::int())
                    .body(constant(Value::Int(3))),
            )
            .build();
        let info = introspect(&ty);
        assert!(!info.accessors.contains_key("ready"));
        assert!(info.methods.contains_key("getReady"));
        assert!(info.accessors["count"].getter.is_some());
    }

    #[test]
    fn test_fields_yield_to_accessors() {
        let ty = ClassBuilder::class("demo.Config")
            .field(FieldDefinition::new("level", builtins::int()))
            .field(FieldDefinition::new("VERSION", builtins::int()).as_static().as_final())
            .field(FieldDefinition::new("title", builtins::string()))
            .method(
                MethodDefinition::new("getTitle")
                    .returns(builtins::string())
                    .body(constant(Value::from("t"))),
            )
            .build();
        let info = introspect(&ty);
        assert!(matches!(
            info.accessors["level"].getter,
            Some(Getter::Field(_))
        ));
        assert!(info.accessors["level"].setter.is_some());
        assert!(info.static_accessors["VERSION"].setter.is_none());
        assert!(matches!(
            info.accessors["title"].getter,
            Some(Getter::Method(_))
        ));
        assert!(info.static_accessors.contains_key("class"));
    }

    #[test]
    fn test_hidden_class_methods_promote_to_public_interface() {
        let greeter = ClassBuilder::interface("demo.Greeter")
            .method(MethodDefinition::new("greet").returns(builtins::string()))
            .build();
        let hidden = ClassBuilder::class("demo.HiddenGreeter")
            .as_package_private()
            .implements(&greeter)
            .method(
                MethodDefinition::new("greet")
                    .returns(builtins::string())
                    .body(constant(Value::from("hi"))),
            )
            .method(
                MethodDefinition::new("secret")
                    .returns(builtins::string())
                    .body(constant(Value::from("s"))),
            )
            .build();
        let info = introspect(&hidden);
        match &info.methods["greet"] {
            HostMember::Method(m) => assert_eq!(m.declaring_name(), "demo.Greeter"),
            other => panic!("unexpected member {other:?}"),
        }
        assert!(!info.methods.contains_key("secret"));
    }

    #[test]
    fn test_array_and_list_length() {
        let info = introspect(&HostType::array_of(builtins::string()));
        assert!(matches!(
            info.accessors["length"].getter,
            Some(Getter::ArrayLength)
        ));
        let info = introspect(builtins::list());
        assert!(matches!(
            info.accessors["length"].getter,
            Some(Getter::ListLength(_))
        ));
        let info = introspect(builtins::class());
        assert!(info.accessors.contains_key("static"));
    }
}
