#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// a module turns a String expression into a symbolic expression, accepting only the
/// restricted grammar: one variable, + - * / ^ **, unary minus, parentheses and the
/// functions sin cos tan exp log sqrt abs
///
///# Example
/// ```
/// use riemann_explorer::symbolic::parse_expr::parse_expression_func;
/// let parsed_expression = parse_expression_func("x**2 + sin(x)", "x").unwrap();
/// println!(" parsed_expression {}", parsed_expression);
/// assert!(parse_expression_func("__import__('os')", "x").is_err());
/// ```
/// ________________________________________________________________________________________________________________________________
pub mod parse_expr;
///____________________________________________________________________________________________________________________________
/// # Symbolic engine
/// the expression tree `Expr`, its arithmetic operators and printing
pub mod symbolic_engine;
/// analytical derivatives and direct evaluation of `Expr`
pub mod symbolic_engine_derivatives;
/// rule based antiderivatives and definite integrals
///# Example
/// ```
/// use riemann_explorer::symbolic::parse_expr::parse_expression_func;
/// let f = parse_expression_func("x^2", "x").unwrap();
/// let value = f.definite_integrate("x", 0.0, 1.0, 1000).unwrap();
/// assert!((value - 1.0 / 3.0).abs() < 1e-12);
/// ```
pub mod symbolic_integration;
/// turns a symbolic expression into a Rust function
///# Example
/// ```
/// use riemann_explorer::symbolic::parse_expr::parse_expression_func;
/// let f = parse_expression_func("exp(x) - 1", "x").unwrap();
/// let lambda = f.lambdify1D("x").unwrap();
/// assert_eq!(lambda(0.0), 0.0);
/// ```
pub mod symbolic_lambdify;
pub mod symbolic_simplify;
/// pluggable definite integration backends
pub mod symbolic_traits;
pub mod utils;
///____________________________________________________________________________________________________________________________
/// # Expression compiler
/// user input -> validated `Expression` (symbolic tree + compiled evaluator), rejected when the
/// function is not finite on the probe domain
pub mod expression_compiler;
