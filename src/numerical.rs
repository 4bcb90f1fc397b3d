/// intervals, partitions, Riemann sums and rectangle geometry
///
/// Example#1
/// ```
/// use riemann_explorer::numerical::riemann::{riemann_sum, Interval, Orientation, Partition};
/// use riemann_explorer::symbolic::expression_compiler::ExpressionCompiler;
/// let f = ExpressionCompiler::new().compile("x**2").unwrap();
/// let result = riemann_sum(&f, &Interval::new(0.0, 1.0), &Partition::new(1000, Orientation::Right)).unwrap();
/// println!("result = {} \n", result.approximation);
/// ```
pub mod riemann;
/// stateful engine: current function, interval and partition, cached results and change notification
///
/// Example#1
/// ```
/// use riemann_explorer::numerical::riemann::Orientation;
/// use riemann_explorer::numerical::riemann_engine::RiemannEngine;
/// use riemann_explorer::symbolic::expression_compiler::ExpressionCompiler;
/// let mut engine = RiemannEngine::new();
/// let id = engine.subscribe(|event, state| println!("{} -> {:?}", event, state.riemann_result()));
/// engine.set_function(ExpressionCompiler::new().compile("sin(x)").unwrap());
/// engine.set_interval(0.0, std::f64::consts::PI);
/// engine.set_partition(100, Orientation::Left);
/// let outcome = engine.compute();
/// println!("riemann = {:?}, exact = {:?}", outcome.riemann, outcome.exact);
/// engine.unsubscribe(id);
/// ```
pub mod riemann_engine;
