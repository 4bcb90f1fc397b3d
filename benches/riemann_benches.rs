use criterion::{Criterion, criterion_group, criterion_main};
use riemann_explorer::numerical::riemann::Orientation;
use riemann_explorer::numerical::riemann_engine::RiemannEngine;
use riemann_explorer::symbolic::expression_compiler::ExpressionCompiler;
use std::hint::black_box;

const SOURCE: &str = "sin(x) * exp(-x/5) + x**2";

fn bench_compile(c: &mut Criterion) {
    let compiler = ExpressionCompiler::new();
    c.bench_function("compile and probe", |b| {
        b.iter(|| compiler.compile(black_box(SOURCE)))
    });
}

fn bench_riemann(c: &mut Criterion) {
    let mut group = c.benchmark_group("Riemann sum");
    let expression = ExpressionCompiler::new().compile(SOURCE).unwrap();
    for count in [100, 10_000, 1_000_000] {
        let mut engine = RiemannEngine::new();
        engine.set_function(expression.clone());
        engine.set_interval(0.0, 10.0);
        engine.set_partition(count, Orientation::Left);
        group.bench_function(format!("{} partitions", count), |b| {
            b.iter(|| engine.compute_riemann())
        });
    }
    group.finish();
}

fn bench_exact(c: &mut Criterion) {
    let mut engine = RiemannEngine::new();
    engine.set_function(ExpressionCompiler::new().compile("x*cos(x) + x**3").unwrap());
    engine.set_interval(0.0, 10.0);
    c.bench_function("exact integral", |b| b.iter(|| engine.compute_exact_integral()));
}

criterion_group!(benches, bench_compile, bench_riemann, bench_exact);
criterion_main!(benches);
