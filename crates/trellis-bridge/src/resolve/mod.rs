//! Overload Resolver
//!
//! Picks one member out of an overload set for a concrete argument list.
//!
//! # Algorithm
//!
//! 1. For each tier (Identity, Default, Forcing), keep the candidates for which every
//!    argument has an applicable converter. Stop at the first tier with any survivor.
//! 2. No survivor after Forcing: `NoApplicableOverload` listing every candidate.
//! 3. Several survivors: prefer fixed arity over variable arity, then repeatedly drop any
//!    candidate whose parameters are all assignable from another candidate's parameters
//!    (but not the other way around).
//! 4. Still several: a single non-bridge survivor wins, otherwise `AmbiguousOverload`.
//!
//! Resolution is deterministic for a fixed candidate list and argument list.

use std::fmt;
use std::sync::Arc;

use trellis_host::{HostType, InteropError, InteropResult, Value};

use crate::catalog::HostMember;
use crate::convert::{
    find_converter, ArgumentConverter, ArrayConverter, ConversionEnv, Converter,
    IdentityConverter, ObjectArrayConverter, Tier, VarArgsConverter,
};

/// Selected member plus the converter that prepares its arguments
#[derive(Clone)]
pub struct Resolution {
    member: HostMember,
    converter: Arc<dyn ArgumentConverter>,
    tier: Tier,
}

impl Resolution {
    /// The selected member
    pub fn member(&self) -> &HostMember {
        &self.member
    }

    /// Converter for the argument list the member was selected for
    pub fn converter(&self) -> &Arc<dyn ArgumentConverter> {
        &self.converter
    }

    /// Tier at which the member was selected
    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Convert `args` for the member
    pub fn convert_arguments(&self, args: &[Value]) -> InteropResult<Vec<Value>> {
        self.converter.convert(args)
    }

    /// Convert `args` and invoke the member on `receiver`
    pub fn invoke(&self, receiver: &Value, args: &[Value]) -> InteropResult<Value> {
        let converted = self.convert_arguments(args)?;
        self.member.invoke(receiver, &converted)
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolution")
            .field("member", &self.member)
            .field("tier", &self.tier)
            .finish()
    }
}

/// Overload resolver bound to a conversion environment
#[derive(Clone)]
pub struct OverloadResolver {
    env: ConversionEnv,
}

struct Applicable {
    member: HostMember,
    converter: Arc<dyn ArgumentConverter>,
}

impl OverloadResolver {
    /// Create a resolver
    pub fn new(env: ConversionEnv) -> Self {
        Self { env }
    }

    /// Conversion environment used for applicability checks
    pub fn env(&self) -> &ConversionEnv {
        &self.env
    }

    /// Select the best candidate of `member` (a single member or an overload set) for `args`
    pub fn select_best(&self, member: &HostMember, args: &[Value]) -> InteropResult<Resolution> {
        self.select_from(&member.candidates(), args)
    }

    /// Select the best of `candidates` for `args`
    pub fn select_from(
        &self,
        candidates: &[HostMember],
        args: &[Value],
    ) -> InteropResult<Resolution> {
        for tier in Tier::ALL {
            let applicable: Vec<Applicable> = candidates
                .iter()
                .filter_map(|candidate| {
                    self.applicable(candidate, args, tier)
                        .map(|converter| Applicable {
                            member: candidate.clone(),
                            converter,
                        })
                })
                .collect();
            tracing::trace!(
                tier = tier.name(),
                candidates = candidates.len(),
                applicable = applicable.len(),
                "overload tier outcome"
            );
            match applicable.len() {
                0 => continue,
                1 => return Ok(into_resolution(applicable, tier)),
                _ => return self.disambiguate(applicable, tier),
            }
        }
        Err(InteropError::NoApplicableOverload {
            count: candidates.len(),
            signatures: candidates.iter().map(HostMember::signature).collect(),
        })
    }

    /// Argument converter for `candidate` at `tier`, if every argument can be converted
    pub fn applicable(
        &self,
        candidate: &HostMember,
        args: &[Value],
        tier: Tier,
    ) -> Option<Arc<dyn ArgumentConverter>> {
        let params = candidate.params();
        if !candidate.is_varargs() {
            if params.len() != args.len() {
                return None;
            }
            let converters = self.positional(params, args, tier)?;
            return Some(Arc::new(ObjectArrayConverter::new(converters)));
        }

        let (array_type, fixed_params) = params.split_last()?;
        let component = array_type.component_type()?;
        let fixed = fixed_params.len();
        if args.len() < fixed {
            return None;
        }
        let mut converters = self.positional(fixed_params, &args[..fixed], tier)?;

        if args.len() == params.len() {
            let passes_through = args[fixed]
                .host_type()
                .map_or(false, |actual| array_type.is_assignable_from(&actual));
            if passes_through {
                converters.push(Arc::new(IdentityConverter::new(array_type)));
                return Some(Arc::new(ObjectArrayConverter::new(converters)));
            }
        }

        let tail = args[fixed..]
            .iter()
            .map(|arg| find_converter(component, arg, tier, &self.env))
            .collect::<Option<Vec<_>>>()?;
        Some(Arc::new(VarArgsConverter::new(
            converters,
            ArrayConverter::new(component, tail, fixed),
        )))
    }

    fn positional(
        &self,
        params: &[HostType],
        args: &[Value],
        tier: Tier,
    ) -> Option<Vec<Arc<dyn Converter>>> {
        params
            .iter()
            .zip(args)
            .map(|(param, arg)| find_converter(param, arg, tier, &self.env))
            .collect()
    }

    fn disambiguate(
        &self,
        mut survivors: Vec<Applicable>,
        tier: Tier,
    ) -> InteropResult<Resolution> {
        if survivors.iter().any(|s| s.member.is_varargs())
            && survivors.iter().any(|s| !s.member.is_varargs())
        {
            survivors.retain(|s| !s.member.is_varargs());
        }

        while let Some(index) = most_general(&survivors) {
            survivors.remove(index);
        }

        if survivors.len() == 1 {
            return Ok(into_resolution(survivors, tier));
        }

        let canonical: Vec<usize> = survivors
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.member.is_bridge())
            .map(|(index, _)| index)
            .collect();
        if let [index] = canonical.as_slice() {
            let chosen = survivors.swap_remove(*index);
            return Ok(into_resolution(vec![chosen], tier));
        }

        let signatures: Vec<String> = survivors.iter().map(|s| s.member.signature()).collect();
        tracing::warn!(
            tier = tier.name(),
            count = survivors.len(),
            candidates = ?signatures,
            "ambiguous overload"
        );
        Err(InteropError::AmbiguousOverload {
            count: survivors.len(),
            signatures,
        })
    }
}

fn into_resolution(mut applicable: Vec<Applicable>, tier: Tier) -> Resolution {
    let Applicable { member, converter } = applicable.swap_remove(0);
    Resolution {
        member,
        converter,
        tier,
    }
}

/// Index of a candidate strictly more general than some other candidate
fn most_general(survivors: &[Applicable]) -> Option<usize> {
    (0..survivors.len()).find(|&a| {
        (0..survivors.len()).any(|b| {
            a != b
                && at_least_as_general(&survivors[a].member, &survivors[b].member)
                && !at_least_as_general(&survivors[b].member, &survivors[a].member)
        })
    })
}

/// Every parameter of `a` accepts the corresponding parameter of `b`
fn at_least_as_general(a: &HostMember, b: &HostMember) -> bool {
    let (left, right) = (a.params(), b.params());
    left.len() == right.len()
        && left
            .iter()
            .zip(right)
            .all(|(l, r)| is_assignable(l, r))
}

/// Assignability including primitive-to-boxed equivalence
pub fn is_assignable(to: &HostType, from: &HostType) -> bool {
    to.is_assignable_from(from) || (from.is_primitive() && to.is_assignable_from(&from.boxed()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_host::{builtins, ClassBuilder, MemoryRuntime, MethodDefinition};

    fn resolver() -> OverloadResolver {
        OverloadResolver::new(ConversionEnv::new(Arc::new(MemoryRuntime::new())))
    }

    fn overloads(params: &[&[&HostType]]) -> HostMember {
        let mut builder = ClassBuilder::class("demo.Overloads");
        for (index, list) in params.iter().enumerate() {
            let mut method = MethodDefinition::new("call")
                .returns(builtins::int())
                .body(move |_, _| Ok(Value::Int(index as i32)));
            for param in *list {
                method = method.param(param);
            }
            builder = builder.method(method);
        }
        let ty = builder.build();
        HostMember::from_overloads(
            ty.declared_methods()
                .iter()
                .cloned()
                .map(HostMember::Method)
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_identity_tier_wins_first() {
        let member = overloads(&[&[builtins::int()], &[builtins::double()]]);
        let resolution = resolver().select_best(&member, &[Value::Int(1)]).unwrap();
        assert_eq!(resolution.member().params(), &[builtins::int().clone()]);
        assert_eq!(resolution.tier(), Tier::Identity);
    }

    #[test]
    fn test_boxed_loses_to_primitive() {
        let member = overloads(&[&[builtins::integer()], &[builtins::int()]]);
        let resolution = resolver().select_best(&member, &[Value::Int(1)]).unwrap();
        assert_eq!(resolution.member().params(), &[builtins::int().clone()]);
    }

    #[test]
    fn test_arity_filters_candidates() {
        let member = overloads(&[&[builtins::int()], &[builtins::int(), builtins::int()]]);
        let resolution = resolver()
            .select_best(&member, &[Value::Int(1), Value::Int(2)])
            .unwrap();
        assert_eq!(resolution.member().params().len(), 2);
        let err = resolver().select_best(&member, &[]).unwrap_err();
        assert!(matches!(err, InteropError::NoApplicableOverload { count: 2, .. }));
    }

    #[test]
    fn test_unrelated_siblings_are_ambiguous() {
        let member = overloads(&[
            &[builtins::string()],
            &[builtins::char_sequence()],
            &[builtins::list()],
        ]);
        let resolution = resolver()
            .select_best(&member, &[Value::from("x")])
            .unwrap();
        assert_eq!(resolution.member().params(), &[builtins::string().clone()]);

        let member = overloads(&[&[builtins::double()], &[builtins::float()]]);
        let err = resolver()
            .select_best(&member, &[Value::Int(1)])
            .unwrap_err();
        assert!(matches!(err, InteropError::AmbiguousOverload { count: 2, .. }));
    }

    #[test]
    fn test_assignability_with_boxing() {
        assert!(is_assignable(builtins::object(), builtins::int()));
        assert!(is_assignable(builtins::number(), builtins::double()));
        assert!(!is_assignable(builtins::int(), builtins::integer()));
        assert!(is_assignable(builtins::int(), builtins::int()));
    }
}
