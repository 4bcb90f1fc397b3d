//! # Riemann Engine
//!
//! Holds the session state (function, interval, partition and the last computed results)
//! and produces the Riemann approximation and the exact integral on request.
//!
//! Every setter invalidates the cached results and notifies subscribers synchronously.
//! Subscribers see the state read-only and cannot call back into the engine.
//!
//! ```
//! use riemann_explorer::numerical::riemann::Orientation;
//! use riemann_explorer::numerical::riemann_engine::{ExactResult, RiemannEngine};
//! use riemann_explorer::symbolic::expression_compiler::ExpressionCompiler;
//! let mut engine = RiemannEngine::new();
//! engine.set_function(ExpressionCompiler::new().compile("x").unwrap());
//! engine.set_interval(0.0, 10.0);
//! engine.set_partition(10, Orientation::Right);
//! let outcome = engine.compute();
//! assert_eq!(outcome.riemann.unwrap().approximation, 55.0);
//! assert_eq!(outcome.exact.unwrap(), ExactResult::Value(50.0));
//! ```

use crate::Utils::config::AppConfig;
use crate::numerical::riemann::{
    Interval, NonFiniteTerm, Orientation, Partition, Rectangle, RiemannResult, rectangles,
    riemann_sum, sample_curve,
};
use crate::symbolic::expression_compiler::Expression;
use crate::symbolic::symbolic_integration::IntegrationError;
use crate::symbolic::symbolic_traits::{
    DefiniteIntegrator, IntegratorBackend, NativeIntegrator, get_integrator,
};
use log::{debug, info, warn};
use ndarray::Array1;
use std::fmt;
use strum_macros::Display;

/// Number of points `curve` is usually asked for.
pub const DEFAULT_CURVE_POINTS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExactResult {
    Value(f64),
    /// no closed form, or the integral diverges
    Undefined,
}

impl ExactResult {
    pub fn value(&self) -> Option<f64> {
        match self {
            ExactResult::Value(v) => Some(*v),
            ExactResult::Undefined => None,
        }
    }
}

impl fmt::Display for ExactResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExactResult::Value(v) => write!(f, "{}", v),
            ExactResult::Undefined => write!(f, "undefined"),
        }
    }
}

/// Why a computation could not start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NotComputableReason {
    NoFunction,
    UnorderedInterval { lower: f64, upper: f64 },
}

impl fmt::Display for NotComputableReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NotComputableReason::NoFunction => write!(f, "no function is set"),
            NotComputableReason::UnorderedInterval { lower, upper } => write!(
                f,
                "lower bound {} must be strictly less than upper bound {}",
                lower, upper
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    NotComputable(NotComputableReason),
    NonFiniteResult { sample: f64 },
    Unintegrable(IntegrationError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EngineError::NotComputable(reason) => write!(f, "Not computable: {}", reason),
            EngineError::NonFiniteResult { sample } => {
                write!(f, "Riemann sum is not finite (sample x = {})", sample)
            }
            EngineError::Unintegrable(err) => write!(f, "Exact integral unavailable: {}", err),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Unintegrable(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NonFiniteTerm> for EngineError {
    fn from(err: NonFiniteTerm) -> Self {
        EngineError::NonFiniteResult { sample: err.sample }
    }
}

impl From<IntegrationError> for EngineError {
    fn from(err: IntegrationError) -> Self {
        EngineError::Unintegrable(err)
    }
}

/// What changed, passed to every subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum EngineEvent {
    FunctionChanged,
    IntervalChanged,
    PartitionChanged,
    Recomputed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&EngineEvent, &EngineState)>;

/// Session state. Only the engine's setters change it.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    expression: Option<Expression>,
    interval: Interval,
    partition: Partition,
    riemann: Option<RiemannResult>,
    exact: Option<ExactResult>,
}

impl EngineState {
    pub fn expression(&self) -> Option<&Expression> {
        self.expression.as_ref()
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }

    pub fn riemann_result(&self) -> Option<&RiemannResult> {
        self.riemann.as_ref()
    }

    pub fn exact_result(&self) -> Option<&ExactResult> {
        self.exact.as_ref()
    }

    fn invalidate(&mut self) {
        self.riemann = None;
        self.exact = None;
    }
}

/// Both results of one `compute()` call, each with its own outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputeOutcome {
    pub riemann: Result<RiemannResult, EngineError>,
    pub exact: Result<ExactResult, EngineError>,
}

impl ComputeOutcome {
    /// |Riemann - exact| when both are available.
    pub fn absolute_error(&self) -> Option<f64> {
        match (&self.riemann, &self.exact) {
            (Ok(riemann), Ok(ExactResult::Value(exact))) => {
                Some((riemann.approximation - exact).abs())
            }
            _ => None,
        }
    }
}

pub struct RiemannEngine {
    state: EngineState,
    integrator: Box<dyn DefiniteIntegrator>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl fmt::Debug for RiemannEngine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RiemannEngine")
            .field("state", &self.state)
            .field("integrator", &self.integrator.name())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Default for RiemannEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RiemannEngine {
    /// No function, interval [0, 1], 10 left partitions, native integrator.
    pub fn new() -> Self {
        RiemannEngine {
            state: EngineState::default(),
            integrator: Box::new(NativeIntegrator::default()),
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Initial interval, partition and integrator from the `[engine]` and `[integration]`
    /// sections.
    pub fn from_config(config: &AppConfig) -> Self {
        let engine = &config.engine;
        let integration = &config.integration;
        let mut riemann_engine =
            RiemannEngine::new().with_backend(integration.backend, integration.singularity_scan);
        riemann_engine.state.interval = Interval::new(engine.lower, engine.upper);
        riemann_engine.state.partition = Partition::new(engine.partitions, engine.orientation);
        info!(
            "engine configured: interval {}, partition {}, integrator {}",
            riemann_engine.state.interval,
            riemann_engine.state.partition,
            riemann_engine.integrator.name()
        );
        riemann_engine
    }

    pub fn with_integrator(mut self, integrator: Box<dyn DefiniteIntegrator>) -> Self {
        self.integrator = integrator;
        self
    }

    /// Shorthand for `with_integrator(get_integrator(backend, scan))`.
    pub fn with_backend(self, backend: IntegratorBackend, singularity_scan: usize) -> Self {
        self.with_integrator(get_integrator(backend, singularity_scan))
    }

    pub fn integrator_name(&self) -> &str {
        self.integrator.name()
    }

    ///////////////////////////// READ ACCESS /////////////////////////////
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn expression(&self) -> Option<&Expression> {
        self.state.expression()
    }

    pub fn interval(&self) -> Interval {
        self.state.interval
    }

    pub fn partition(&self) -> Partition {
        self.state.partition
    }

    pub fn riemann_result(&self) -> Option<&RiemannResult> {
        self.state.riemann_result()
    }

    pub fn exact_result(&self) -> Option<&ExactResult> {
        self.state.exact_result()
    }

    ///////////////////////////// SETTERS /////////////////////////////
    pub fn set_function(&mut self, expression: Expression) {
        debug!("function set to {}", expression);
        self.state.expression = Some(expression);
        self.state.invalidate();
        self.notify(EngineEvent::FunctionChanged);
    }

    /// Back to the no-function state.
    pub fn clear_function(&mut self) {
        debug!("function cleared");
        self.state.expression = None;
        self.state.invalidate();
        self.notify(EngineEvent::FunctionChanged);
    }

    /// Accepts any bounds; order is checked when computing.
    pub fn set_interval(&mut self, lower: f64, upper: f64) {
        self.state.interval = Interval::new(lower, upper);
        debug!("interval set to {}", self.state.interval);
        self.state.invalidate();
        self.notify(EngineEvent::IntervalChanged);
    }

    /// `count` is clamped to at least 1.
    pub fn set_partition(&mut self, count: usize, orientation: Orientation) {
        self.state.partition = Partition::new(count, orientation);
        debug!("partition set to {}", self.state.partition);
        self.state.invalidate();
        self.notify(EngineEvent::PartitionChanged);
    }

    ///////////////////////////// COMPUTATION /////////////////////////////
    /// A function is set and lower < upper.
    pub fn is_computable(&self) -> bool {
        self.require_computable().is_ok()
    }

    /// Riemann sum over the current partition. On error the cached result is left as is.
    pub fn compute_riemann(&mut self) -> Result<RiemannResult, EngineError> {
        let result = self.run_riemann()?;
        self.notify(EngineEvent::Recomputed);
        Ok(result)
    }

    /// Exact integral. `Unintegrable` still caches `ExactResult::Undefined` and notifies.
    pub fn compute_exact_integral(&mut self) -> Result<ExactResult, EngineError> {
        let result = self.run_exact();
        if !matches!(result, Err(EngineError::NotComputable(_))) {
            self.notify(EngineEvent::Recomputed);
        }
        result
    }

    /// Both computations with a single `Recomputed` notification, sent when either cached
    /// result changed.
    pub fn compute(&mut self) -> ComputeOutcome {
        let riemann = self.run_riemann();
        let exact = self.run_exact();
        let changed = riemann.is_ok() || !matches!(exact, Err(EngineError::NotComputable(_)));
        if changed {
            self.notify(EngineEvent::Recomputed);
        }
        let outcome = ComputeOutcome { riemann, exact };
        if let Some(error) = outcome.absolute_error() {
            info!("absolute error of the Riemann sum: {:e}", error);
        }
        outcome
    }

    /// Geometry of the current Riemann rectangles.
    pub fn rectangles(&self) -> Result<Vec<Rectangle>, EngineError> {
        let expression = self.require_computable()?;
        Ok(rectangles(
            expression,
            &self.state.interval,
            &self.state.partition,
        ))
    }

    /// `points` samples of the current function over the closed interval.
    pub fn curve(&self, points: usize) -> Result<(Array1<f64>, Array1<f64>), EngineError> {
        let expression = self.require_computable()?;
        Ok(sample_curve(expression, &self.state.interval, points))
    }

    ///////////////////////////// NOTIFICATION /////////////////////////////
    /// Registers `observer`; it is called after every state change until unsubscribed.
    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&EngineEvent, &EngineState) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// False when `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(other, _)| *other != id);
        self.observers.len() != before
    }

    ///////////////////////////// INTERNALS /////////////////////////////
    fn require_computable(&self) -> Result<&Expression, EngineError> {
        let expression = self
            .state
            .expression
            .as_ref()
            .ok_or(EngineError::NotComputable(NotComputableReason::NoFunction))?;
        let interval = self.state.interval;
        if !interval.is_ordered() {
            return Err(EngineError::NotComputable(
                NotComputableReason::UnorderedInterval {
                    lower: interval.lower,
                    upper: interval.upper,
                },
            ));
        }
        Ok(expression)
    }

    fn run_riemann(&mut self) -> Result<RiemannResult, EngineError> {
        let outcome = {
            let expression = self.require_computable()?;
            riemann_sum(expression, &self.state.interval, &self.state.partition)
        };
        match outcome {
            Ok(result) => {
                info!(
                    "Riemann sum over {} with {}: {}",
                    self.state.interval, self.state.partition, result.approximation
                );
                self.state.riemann = Some(result);
                Ok(result)
            }
            Err(err) => {
                warn!("{}", err);
                Err(err.into())
            }
        }
    }

    fn run_exact(&mut self) -> Result<ExactResult, EngineError> {
        let interval = self.state.interval;
        let outcome = {
            let expression = self.require_computable()?;
            self.integrator.integrate_definite(
                expression.symbolic(),
                expression.variable(),
                interval.lower,
                interval.upper,
            )
        };
        match outcome {
            Ok(value) => {
                info!("exact integral over {}: {}", interval, value);
                let exact = ExactResult::Value(value);
                self.state.exact = Some(exact);
                Ok(exact)
            }
            Err(err) => {
                warn!("exact integral over {} is undefined: {}", interval, err);
                self.state.exact = Some(ExactResult::Undefined);
                Err(err.into())
            }
        }
    }

    fn notify(&mut self, event: EngineEvent) {
        for (_, observer) in self.observers.iter_mut() {
            observer(&event, &self.state);
        }
    }
}
