use crate::symbolic::symbolic_engine::Expr;
use ndarray::{Array1, Zip};
use std::fmt;

/// Compiling a tree that mentions a variable other than the one it is compiled for.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownVariable(pub String);

impl fmt::Display for UnknownVariable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Unknown variable '{}' in compiled expression", self.0)
    }
}

impl std::error::Error for UnknownVariable {}

/// Compiled evaluator of a single-variable expression.
///
/// The tree mirrors `Expr` but is resolved against the free variable once, so evaluation
/// does no name lookups. Integer constant exponents are lowered to `powi`.
#[derive(Clone, Debug, PartialEq)]
pub enum Lambda {
    Var,
    Const(f64),
    Add(Box<Lambda>, Box<Lambda>),
    Sub(Box<Lambda>, Box<Lambda>),
    Mul(Box<Lambda>, Box<Lambda>),
    Div(Box<Lambda>, Box<Lambda>),
    Pow(Box<Lambda>, Box<Lambda>),
    Powi(Box<Lambda>, i32),
    Exp(Box<Lambda>),
    Ln(Box<Lambda>),
    Sin(Box<Lambda>),
    Cos(Box<Lambda>),
    Tg(Box<Lambda>),
    Sqrt(Box<Lambda>),
    Abs(Box<Lambda>),
}

fn integer_exponent(expr: &Expr) -> Option<i32> {
    match expr {
        Expr::Const(v) if v.fract() == 0.0 && v.abs() <= i32::MAX as f64 => Some(*v as i32),
        _ => None,
    }
}

fn child(expr: &Expr, var: &str) -> Result<Box<Lambda>, UnknownVariable> {
    Ok(Box::new(expr.compile(var)?))
}

impl Expr {
    /// LAMBDIFICATION - resolves the tree against `var` into an evaluator.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let x = Expr::Var("x".to_string());
    /// let f = x.pow(Expr::Const(2.0)).compile("x")?;
    /// assert_eq!(f.eval(3.0), 9.0);
    /// ```
    pub fn compile(&self, var: &str) -> Result<Lambda, UnknownVariable> {
        let lambda = match self {
            Expr::Var(name) if name == var => Lambda::Var,
            Expr::Var(name) => return Err(UnknownVariable(name.clone())),
            Expr::Const(v) => Lambda::Const(*v),
            Expr::Add(a, b) => Lambda::Add(child(a, var)?, child(b, var)?),
            Expr::Sub(a, b) => Lambda::Sub(child(a, var)?, child(b, var)?),
            Expr::Mul(a, b) => Lambda::Mul(child(a, var)?, child(b, var)?),
            Expr::Div(a, b) => Lambda::Div(child(a, var)?, child(b, var)?),
            Expr::Pow(a, b) => match integer_exponent(b) {
                Some(n) => Lambda::Powi(child(a, var)?, n),
                None => Lambda::Pow(child(a, var)?, child(b, var)?),
            },
            Expr::Exp(e) => Lambda::Exp(child(e, var)?),
            Expr::Ln(e) => Lambda::Ln(child(e, var)?),
            Expr::sin(e) => Lambda::Sin(child(e, var)?),
            Expr::cos(e) => Lambda::Cos(child(e, var)?),
            Expr::tg(e) => Lambda::Tg(child(e, var)?),
            Expr::Sqrt(e) => Lambda::Sqrt(child(e, var)?),
            Expr::Abs(e) => Lambda::Abs(child(e, var)?),
        };
        Ok(lambda)
    }

    /// Converts a single-variable symbolic expression into a thread-safe closure.
    pub fn lambdify1D(
        &self,
        var: &str,
    ) -> Result<Box<dyn Fn(f64) -> f64 + Send + Sync>, UnknownVariable> {
        let compiled = self.compile(var)?;
        Ok(Box::new(compiled.as_closure()))
    }
}

impl Lambda {
    #[inline(always)]
    pub fn eval(&self, x: f64) -> f64 {
        match self {
            Lambda::Var => x,
            Lambda::Const(v) => *v,
            Lambda::Add(a, b) => a.eval(x) + b.eval(x),
            Lambda::Sub(a, b) => a.eval(x) - b.eval(x),
            Lambda::Mul(a, b) => a.eval(x) * b.eval(x),
            Lambda::Div(a, b) => a.eval(x) / b.eval(x),
            Lambda::Pow(a, b) => a.eval(x).powf(b.eval(x)),
            Lambda::Powi(a, n) => a.eval(x).powi(*n),
            Lambda::Exp(e) => e.eval(x).exp(),
            Lambda::Ln(e) => e.eval(x).ln(),
            Lambda::Sin(e) => e.eval(x).sin(),
            Lambda::Cos(e) => e.eval(x).cos(),
            Lambda::Tg(e) => e.eval(x).tan(),
            Lambda::Sqrt(e) => e.eval(x).sqrt(),
            Lambda::Abs(e) => e.eval(x).abs(),
        }
    }

    /// Elementwise evaluation over a whole array, one tree walk per node instead of per sample.
    pub fn eval_array(&self, xs: &Array1<f64>) -> Array1<f64> {
        match self {
            Lambda::Var => xs.clone(),
            Lambda::Const(v) => Array1::from_elem(xs.len(), *v),
            Lambda::Add(a, b) => a.eval_array(xs) + b.eval_array(xs),
            Lambda::Sub(a, b) => a.eval_array(xs) - b.eval_array(xs),
            Lambda::Mul(a, b) => a.eval_array(xs) * b.eval_array(xs),
            Lambda::Div(a, b) => a.eval_array(xs) / b.eval_array(xs),
            Lambda::Pow(a, b) => {
                let mut base = a.eval_array(xs);
                let exponent = b.eval_array(xs);
                Zip::from(&mut base)
                    .and(&exponent)
                    .for_each(|b, &e| *b = b.powf(e));
                base
            }
            Lambda::Powi(a, n) => {
                let n = *n;
                a.eval_array(xs).mapv_into(|v| v.powi(n))
            }
            Lambda::Exp(e) => e.eval_array(xs).mapv_into(f64::exp),
            Lambda::Ln(e) => e.eval_array(xs).mapv_into(f64::ln),
            Lambda::Sin(e) => e.eval_array(xs).mapv_into(f64::sin),
            Lambda::Cos(e) => e.eval_array(xs).mapv_into(f64::cos),
            Lambda::Tg(e) => e.eval_array(xs).mapv_into(f64::tan),
            Lambda::Sqrt(e) => e.eval_array(xs).mapv_into(f64::sqrt),
            Lambda::Abs(e) => e.eval_array(xs).mapv_into(f64::abs),
        }
    }

    pub fn as_closure(self) -> impl Fn(f64) -> f64 + Send + Sync {
        move |x| self.eval(x)
    }
}
