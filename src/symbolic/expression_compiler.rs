//! # Expression Compiler
//!
//! Turns a user-typed string into an [`Expression`]: the parsed symbolic tree (for exact
//! integration) together with its compiled evaluator (for sampling). A string that parses
//! is still rejected when the evaluator produces NaN or an infinity anywhere on the probe
//! domain, so an `Expression` is always fully valid.
//!
//! ```
//! use riemann_explorer::symbolic::expression_compiler::ExpressionCompiler;
//! let compiler = ExpressionCompiler::new();
//! let f = compiler.compile("x**2 + 1").unwrap();
//! assert_eq!(f.evaluate(2.0), 5.0);
//! assert!(compiler.compile("1/x").is_err());
//! ```

use crate::Utils::config::AppConfig;
use crate::symbolic::parse_expr::parse_expression_func;
pub use crate::symbolic::parse_expr::InvalidExpression;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_lambdify::Lambda;
use crate::symbolic::utils::linspace;
use log::{debug, warn};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Points every new expression is evaluated at before it is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeDomain {
    pub lower: f64,
    pub upper: f64,
    /// evenly spaced samples over [lower, upper], both ends included
    pub samples: usize,
    /// single extra point checked on its own
    pub scalar: f64,
}

impl Default for ProbeDomain {
    fn default() -> Self {
        ProbeDomain {
            lower: -10.0,
            upper: 10.0,
            samples: 100,
            scalar: 0.0,
        }
    }
}

/// A validated function of one variable.
///
/// Only [`ExpressionCompiler::compile`] creates one.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    variable: String,
    symbolic: Expr,
    evaluator: Lambda,
}

impl Expression {
    /// The text the user typed, trimmed.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Parsed tree, input to the exact integrator.
    pub fn symbolic(&self) -> &Expr {
        &self.symbolic
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        self.evaluator.eval(x)
    }

    /// Elementwise evaluation of the whole array.
    pub fn evaluate_array(&self, xs: &Array1<f64>) -> Array1<f64> {
        self.evaluator.eval_array(xs)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionCompiler {
    variable: String,
    probe: ProbeDomain,
}

impl Default for ExpressionCompiler {
    fn default() -> Self {
        ExpressionCompiler {
            variable: "x".to_string(),
            probe: ProbeDomain::default(),
        }
    }
}

impl ExpressionCompiler {
    /// Compiler for functions of `x`, probed over [-10, 10].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = variable.into();
        self
    }

    pub fn with_probe(mut self, probe: ProbeDomain) -> Self {
        self.probe = probe;
        self
    }

    /// Variable name and probe domain from the `[engine]` and `[probe]` sections.
    pub fn from_config(config: &AppConfig) -> Self {
        ExpressionCompiler {
            variable: config.engine.variable.clone(),
            probe: config.probe.clone(),
        }
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn probe(&self) -> &ProbeDomain {
        &self.probe
    }

    /// Parses, compiles and probes `source`.
    pub fn compile(&self, source: &str) -> Result<Expression, InvalidExpression> {
        match self.try_compile(source) {
            Ok(expression) => {
                debug!("compiled '{}' as {}", expression.source, expression.symbolic);
                Ok(expression)
            }
            Err(err) => {
                warn!("rejected expression '{}': {}", source.trim(), err);
                Err(err)
            }
        }
    }

    /// True when `compile` would succeed.
    pub fn is_valid(&self, source: &str) -> bool {
        self.try_compile(source).is_ok()
    }

    fn try_compile(&self, source: &str) -> Result<Expression, InvalidExpression> {
        let symbolic = parse_expression_func(source, &self.variable)?;
        // the grammar admits no other variable, so this only fails on a parser bug
        let evaluator =
            symbolic
                .compile(&self.variable)
                .map_err(|err| InvalidExpression::DisallowedIdentifier {
                    name: err.0,
                    position: 0,
                })?;
        self.run_probe(&evaluator)?;
        Ok(Expression {
            source: source.trim().to_string(),
            variable: self.variable.clone(),
            symbolic,
            evaluator,
        })
    }

    fn run_probe(&self, evaluator: &Lambda) -> Result<(), InvalidExpression> {
        let scalar = self.probe.scalar;
        if !evaluator.eval(scalar).is_finite() {
            return Err(InvalidExpression::NonFinite { at: scalar });
        }
        let xs = linspace(self.probe.lower, self.probe.upper, self.probe.samples);
        let ys = evaluator.eval_array(&xs);
        match xs.iter().zip(ys.iter()).find(|(_, y)| !y.is_finite()) {
            Some((&at, _)) => Err(InvalidExpression::NonFinite { at }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_compile_valid_expressions() {
        let compiler = ExpressionCompiler::new();
        for source in [
            "x",
            "x**2 - 3*x + 1",
            "sin(x) + cos(x)",
            "exp(-x**2/4)",
            "abs(x) * pi",
            "tan(x)",
            "sqrt(x^2 + 1)",
            "log(x^2 + 1)",
            "e^x",
            "7",
        ] {
            assert!(compiler.compile(source).is_ok(), "{} should compile", source);
        }
    }

    #[test]
    fn test_expression_keeps_both_forms() {
        let compiler = ExpressionCompiler::new();
        let f = compiler.compile("  x**2 + 1 ").unwrap();
        assert_eq!(f.source(), "x**2 + 1");
        assert_eq!(f.to_string(), "x**2 + 1");
        assert_eq!(f.variable(), "x");
        assert_eq!(f.symbolic().to_string(), "((x ^ 2) + 1)");
        assert_eq!(f.evaluate(3.0), 10.0);
        let ys = f.evaluate_array(&linspace(0.0, 2.0, 3));
        assert_eq!(ys.to_vec(), vec![1.0, 2.0, 5.0]);
    }

    #[test]
    fn test_probe_rejects_non_finite() {
        let compiler = ExpressionCompiler::new();
        assert_eq!(
            compiler.compile("1/x"),
            Err(InvalidExpression::NonFinite { at: 0.0 })
        );
        assert_eq!(
            compiler.compile("log(x)"),
            Err(InvalidExpression::NonFinite { at: 0.0 })
        );
        // finite at 0, NaN on the negative half of the probe domain
        assert_eq!(
            compiler.compile("sqrt(x + 1)"),
            Err(InvalidExpression::NonFinite { at: -10.0 })
        );
        // overflows from the first sample past x = 8.91 on
        match compiler.compile("exp(x^3)") {
            Err(InvalidExpression::NonFinite { at }) => assert!(at > 8.91 && at < 9.0, "at = {}", at),
            other => panic!("expected an overflow, got {:?}", other),
        }
        assert!(compiler.compile("x**0.5").is_err());
        assert!(compiler.compile("1/(x - 10)").is_err());
    }

    #[test]
    fn test_grammar_errors_pass_through() {
        let compiler = ExpressionCompiler::new();
        assert_eq!(compiler.compile("   "), Err(InvalidExpression::Empty));
        assert!(matches!(
            compiler.compile("__import__('os')"),
            Err(InvalidExpression::DisallowedIdentifier { .. })
        ));
        assert!(matches!(
            compiler.compile("x +"),
            Err(InvalidExpression::Syntax { .. })
        ));
    }

    #[test]
    fn test_is_valid() {
        let compiler = ExpressionCompiler::new();
        assert!(compiler.is_valid("sin(x)"));
        assert!(!compiler.is_valid("sin(y)"));
        assert!(!compiler.is_valid("1/x"));
        assert!(!compiler.is_valid(""));
    }

    #[test]
    fn test_custom_probe_domain() {
        let probe = ProbeDomain {
            lower: 1.0,
            upper: 10.0,
            samples: 50,
            scalar: 1.0,
        };
        let compiler = ExpressionCompiler::new().with_probe(probe.clone());
        assert_eq!(compiler.probe(), &probe);
        let f = compiler.compile("log(x)").unwrap();
        assert_relative_eq!(f.evaluate(std::f64::consts::E), 1.0);
        assert!(compiler.compile("1/x").is_ok());
    }

    #[test]
    fn test_custom_variable() {
        let compiler = ExpressionCompiler::new().with_variable("t");
        assert_eq!(compiler.variable(), "t");
        let f = compiler.compile("t^2").unwrap();
        assert_eq!(f.evaluate(3.0), 9.0);
        assert!(!compiler.is_valid("x^2"));
    }

    #[test]
    fn test_from_config() {
        let mut config = AppConfig::default();
        config.engine.variable = "u".to_string();
        config.probe.scalar = 5.0;
        let compiler = ExpressionCompiler::from_config(&config);
        assert_eq!(compiler.variable(), "u");
        assert_eq!(compiler.probe().scalar, 5.0);
    }
}
