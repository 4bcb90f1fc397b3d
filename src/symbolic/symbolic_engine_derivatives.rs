//! # Symbolic Engine Derivatives Module
//!
//! Analytical differentiation and direct evaluation of `Expr` trees.
//!
//! ## Key Methods
//! - `diff(var)` - derivative by the usual rules (product, quotient, chain)
//! - `eval_expression(var, value)` - evaluation without compiling a `Lambda`
//! - `all_arguments_are_variables()` - variable names in the tree, sorted
//! - `compare_num1D(...)` - checks `diff` against a central difference
//!
//! The integration rules are tested through `diff`: the derivative of every antiderivative
//! must match the integrand numerically.

use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::utils::{linspace, numerical_derivative};

impl Expr {
    /// DIFFERENTIATION
    ///
    /// The result is not simplified; call `simplify()` on it when a compact tree is wanted.
    pub fn diff(&self, var: &str) -> Expr {
        match self {
            Expr::Var(name) => {
                if name == var {
                    Expr::Const(1.0)
                } else {
                    Expr::Const(0.0)
                }
            }
            Expr::Const(_) => Expr::Const(0.0),
            Expr::Add(lhs, rhs) => lhs.diff(var) + rhs.diff(var),
            Expr::Sub(lhs, rhs) => lhs.diff(var) - rhs.diff(var),
            Expr::Mul(lhs, rhs) => {
                lhs.diff(var) * rhs.as_ref().clone() + lhs.as_ref().clone() * rhs.diff(var)
            }
            Expr::Div(lhs, rhs) => {
                let numerator =
                    lhs.diff(var) * rhs.as_ref().clone() - rhs.diff(var) * lhs.as_ref().clone();
                numerator / rhs.as_ref().clone().pow(Expr::Const(2.0))
            }
            Expr::Pow(base, exp) => {
                let base_depends = base.contains_variable(var);
                let exp_depends = exp.contains_variable(var);
                match (base_depends, exp_depends) {
                    (_, false) => {
                        // n * b^(n-1) * b'
                        exp.as_ref().clone()
                            * base
                                .as_ref()
                                .clone()
                                .pow(exp.as_ref().clone() - Expr::Const(1.0))
                            * base.diff(var)
                    }
                    (false, true) => {
                        // b^e * ln(b) * e'
                        self.clone() * base.as_ref().clone().ln() * exp.diff(var)
                    }
                    (true, true) => {
                        // b^e * (e' ln(b) + e b' / b)
                        self.clone()
                            * (exp.diff(var) * base.as_ref().clone().ln()
                                + exp.as_ref().clone() * base.diff(var) / base.as_ref().clone())
                    }
                }
            }
            Expr::Exp(expr) => Expr::Exp(expr.clone()) * expr.diff(var),
            Expr::Ln(expr) => expr.diff(var) / expr.as_ref().clone(),
            Expr::sin(expr) => Expr::cos(expr.clone()) * expr.diff(var),
            Expr::cos(expr) => Expr::Const(-1.0) * Expr::sin(expr.clone()) * expr.diff(var),
            Expr::tg(expr) => {
                expr.diff(var) / Expr::cos(expr.clone()).pow(Expr::Const(2.0))
            }
            Expr::Sqrt(expr) => expr.diff(var) / (Expr::Const(2.0) * Expr::Sqrt(expr.clone())),
            Expr::Abs(expr) => {
                expr.as_ref().clone() / Expr::Abs(expr.clone()) * expr.diff(var)
            }
        }
    }

    /// DIRECT EXPRESSION EVALUATION
    ///
    /// Evaluates the tree at `var = value`. Any other variable evaluates to NaN, which
    /// propagates to the result like a domain error would.
    pub fn eval_expression(&self, var: &str, value: f64) -> f64 {
        match self {
            Expr::Var(name) if name == var => value,
            Expr::Var(_) => f64::NAN,
            Expr::Const(val) => *val,
            Expr::Add(lhs, rhs) => lhs.eval_expression(var, value) + rhs.eval_expression(var, value),
            Expr::Sub(lhs, rhs) => lhs.eval_expression(var, value) - rhs.eval_expression(var, value),
            Expr::Mul(lhs, rhs) => lhs.eval_expression(var, value) * rhs.eval_expression(var, value),
            Expr::Div(lhs, rhs) => lhs.eval_expression(var, value) / rhs.eval_expression(var, value),
            Expr::Pow(base, exp) => base
                .eval_expression(var, value)
                .powf(exp.eval_expression(var, value)),
            Expr::Exp(expr) => expr.eval_expression(var, value).exp(),
            Expr::Ln(expr) => expr.eval_expression(var, value).ln(),
            Expr::sin(expr) => expr.eval_expression(var, value).sin(),
            Expr::cos(expr) => expr.eval_expression(var, value).cos(),
            Expr::tg(expr) => expr.eval_expression(var, value).tan(),
            Expr::Sqrt(expr) => expr.eval_expression(var, value).sqrt(),
            Expr::Abs(expr) => expr.eval_expression(var, value).abs(),
        }
    }

    /// Names of all variables in the tree, sorted and deduplicated.
    pub fn all_arguments_are_variables(&self) -> Vec<String> {
        let mut vars = Vec::new();
        match self {
            Expr::Var(name) => vars.push(name.clone()),
            Expr::Const(_) => {}
            _ => {
                for child in self.children() {
                    vars.extend(child.all_arguments_are_variables());
                }
            }
        }
        vars.sort();
        vars.dedup();
        vars
    } // end of all_arguments_are_variables

    /// Validates the analytical derivative against a central difference over `[start, end]`.
    ///
    /// # Returns
    /// Tuple of (largest absolute difference, is_within_tolerance)
    pub fn compare_num1D(
        &self,
        var: &str,
        start: f64,
        end: f64,
        num_values: usize,
        max_norm: f64,
    ) -> (f64, bool) {
        let analytical = self.diff(var);
        let domain = linspace(start, end, num_values);
        let step = 1e-6 * (end - start).abs().max(1.0);
        let numerical = numerical_derivative(
            |x| self.eval_expression(var, x),
            domain.as_slice().unwrap_or(&[]),
            step,
        );
        let norma_val = domain
            .iter()
            .zip(numerical.iter())
            .map(|(&x, &approx)| (analytical.eval_expression(var, x) - approx).abs())
            .fold(0.0, f64::max);
        (norma_val, norma_val < max_norm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::parse_expr::parse_expression_func;
    use approx::assert_relative_eq;

    fn parse(s: &str) -> Expr {
        parse_expression_func(s, "x").unwrap()
    }

    #[test]
    fn test_diff_polynomial() {
        let derivative = parse("3*x^2 + 2*x + 1").diff("x");
        assert_relative_eq!(derivative.eval_expression("x", 2.0), 14.0);
        assert_eq!(parse("7").diff("x").simplify(), Expr::Const(0.0));
    }

    #[test]
    fn test_diff_product_and_quotient() {
        let derivative = parse("x * sin(x)").diff("x");
        let x: f64 = 0.7;
        assert_relative_eq!(
            derivative.eval_expression("x", x),
            x.sin() + x * x.cos(),
            epsilon = 1e-12
        );
        let derivative = parse("x / (1 + x)").diff("x");
        assert_relative_eq!(derivative.eval_expression("x", 1.0), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_diff_chain_rule() {
        let derivative = parse("exp(2*x)").diff("x");
        assert_relative_eq!(derivative.eval_expression("x", 0.0), 2.0);
        let derivative = parse("log(x^2 + 1)").diff("x");
        assert_relative_eq!(derivative.eval_expression("x", 1.0), 1.0);
    }

    #[test]
    fn test_diff_variable_exponent() {
        let derivative = parse("2^x").diff("x");
        assert_relative_eq!(
            derivative.eval_expression("x", 1.0),
            2.0 * 2f64.ln(),
            epsilon = 1e-12
        );
        let derivative = parse("x^x").diff("x");
        assert_relative_eq!(derivative.eval_expression("x", 1.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_compare_num1d() {
        for source in ["sin(x)*cos(x)", "sqrt(x + 20)", "tan(x/20)", "abs(x - 0.5)*x", "exp(-x^2)"] {
            let (norm, ok) = parse(source).compare_num1D("x", -3.0, 3.0, 50, 1e-4);
            assert!(ok, "{} derivative off by {}", source, norm);
        }
    }

    #[test]
    fn test_eval_expression_unknown_variable_is_nan() {
        let expr = Expr::Var("y".to_string()) + parse("x");
        assert!(expr.eval_expression("x", 1.0).is_nan());
    }

    #[test]
    fn test_all_arguments_are_variables() {
        let expr = parse("x * sin(x) + x^2");
        assert_eq!(expr.all_arguments_are_variables(), vec!["x".to_string()]);
        assert!(parse("pi * e").all_arguments_are_variables().is_empty());
    }
}
