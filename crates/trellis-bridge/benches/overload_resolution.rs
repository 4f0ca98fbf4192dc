use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use trellis_bridge::{HostMember, Interop};
use trellis_host::{builtins, ClassBuilder, HostType, MemoryRuntime, MethodDefinition, Value};

fn overloaded(count: usize) -> HostType {
    let params = [
        builtins::int(),
        builtins::long(),
        builtins::double(),
        builtins::string(),
        builtins::object(),
        builtins::boolean(),
        builtins::char_sequence(),
        builtins::number(),
    ];
    let mut builder = ClassBuilder::class("bench.Target");
    for param in params.iter().cycle().take(count) {
        builder = builder.method(
            MethodDefinition::new("call")
                .as_static()
                .param(param)
                .param(builtins::object())
                .returns(builtins::int())
                .body(|_, _| Ok(Value::Int(0))),
        );
    }
    builder.build()
}

fn lookup(interop: &Interop, ty: &HostType) -> HostMember {
    interop
        .catalog()
        .entry(ty)
        .lookup_method("call", true)
        .unwrap()
}

fn bench_tiers(c: &mut Criterion) {
    let interop = Interop::new(Arc::new(MemoryRuntime::new()));
    let ty = overloaded(6);
    let member = lookup(&interop, &ty);
    let mut group = c.benchmark_group("resolve_by_tier");

    let cases = [
        ("identity", [Value::Int(1), Value::from("x")]),
        ("default", [Value::Undefined, Value::from("x")]),
        ("forcing", [Value::from("7"), Value::from("x")]),
    ];
    for (tier, args) in cases {
        group.bench_with_input(BenchmarkId::new("select_best", tier), &args, |b, args| {
            b.iter(|| interop.resolve_overload(black_box(&member), black_box(args)))
        });
    }
    group.finish();
}

fn bench_overload_count(c: &mut Criterion) {
    let interop = Interop::new(Arc::new(MemoryRuntime::new()));
    let mut group = c.benchmark_group("resolve_by_overload_count");
    for count in [2, 4, 8] {
        let ty = overloaded(count);
        let member = lookup(&interop, &ty);
        let args = [Value::from("a"), Value::Int(2)];
        group.bench_with_input(BenchmarkId::from_parameter(count), &args, |b, args| {
            b.iter(|| interop.resolve_overload(black_box(&member), black_box(args)))
        });
    }
    group.finish();
}

fn bench_invoke(c: &mut Criterion) {
    let interop = Interop::new(Arc::new(MemoryRuntime::new()));
    let ty = overloaded(4);
    let args = [Value::Int(3), Value::Int(4)];
    c.bench_function("invoke_static", |b| {
        b.iter(|| interop.invoke_static(black_box(&ty), "call", black_box(&args)))
    });
}

criterion_group!(benches, bench_tiers, bench_overload_count, bench_invoke);
criterion_main!(benches);
