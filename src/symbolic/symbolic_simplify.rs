//! # Symbolic Expression Simplification Module
//!
//! Bottom-up rewriting used before integration and after differentiation:
//!
//! 1. **Constant Folding**: arithmetic and functions on numerical constants, kept only when
//!    the folded value is finite
//! 2. **Algebraic Identities**: x + 0 = x, x * 1 = x, 0 * x = 0, x ^ 1 = x, x ^ 0 = 1
//! 3. **Constant Collection**: (c1 * e) * c2 = (c1 * c2) * e, (c1 * e) / c2 = (c1 / c2) * e
//! 4. **Power Rules**: x * x = x ^ 2, x ^ a * x ^ b = x ^ (a + b)
//!
//! Full polynomial term collection is not done here; `symbolic_integration` extracts
//! polynomial coefficients directly when it needs them.

use crate::symbolic::symbolic_engine::Expr;

fn finite_or(value: f64, fallback: Expr) -> Expr {
    if value.is_finite() {
        Expr::Const(value)
    } else {
        fallback
    }
}

fn fold_unary(arg: Expr, rebuild: fn(Box<Expr>) -> Expr, f: fn(f64) -> f64) -> Expr {
    match arg {
        Expr::Const(v) => finite_or(f(v), rebuild(Box::new(Expr::Const(v)))),
        other => rebuild(Box::new(other)),
    }
}

impl Expr {
    //___________________________________SIMPLIFICATION____________________________________

    /// One bottom-up pass of constant folding and identities.
    pub fn simplify_(&self) -> Expr {
        match self {
            Expr::Var(_) | Expr::Const(_) => self.clone(),
            Expr::Add(lhs, rhs) => {
                let lhs = lhs.simplify_();
                let rhs = rhs.simplify_();
                match (&lhs, &rhs) {
                    (Expr::Const(a), Expr::Const(b)) => Expr::Const(a + b),
                    (Expr::Const(a), _) if *a == 0.0 => rhs,
                    (_, Expr::Const(b)) if *b == 0.0 => lhs,
                    // x + (-c) = x - c
                    (_, Expr::Const(b)) if *b < 0.0 => Expr::Sub(Box::new(lhs), Box::new(Expr::Const(-b))),
                    _ => Expr::Add(Box::new(lhs), Box::new(rhs)),
                }
            }
            Expr::Sub(lhs, rhs) => {
                let lhs = lhs.simplify_();
                let rhs = rhs.simplify_();
                match (&lhs, &rhs) {
                    (Expr::Const(a), Expr::Const(b)) => Expr::Const(a - b),
                    (_, Expr::Const(b)) if *b == 0.0 => lhs,
                    (Expr::Const(a), _) if *a == 0.0 => {
                        Expr::Mul(Box::new(Expr::Const(-1.0)), Box::new(rhs)).simplify_()
                    }
                    _ if lhs == rhs => Expr::Const(0.0),
                    _ => Expr::Sub(Box::new(lhs), Box::new(rhs)),
                }
            }
            Expr::Mul(lhs, rhs) => {
                let lhs = lhs.simplify_();
                let rhs = rhs.simplify_();
                match (&lhs, &rhs) {
                    (Expr::Const(a), Expr::Const(b)) => Expr::Const(a * b),
                    (Expr::Const(a), _) | (_, Expr::Const(a)) if *a == 0.0 => Expr::Const(0.0),
                    (Expr::Const(a), _) if *a == 1.0 => rhs,
                    (_, Expr::Const(b)) if *b == 1.0 => lhs,
                    // keep constants on the left
                    (_, Expr::Const(_)) => Expr::Mul(Box::new(rhs), Box::new(lhs)).simplify_(),
                    // c2 * (c1 * e) = (c1 * c2) * e
                    (Expr::Const(c), Expr::Mul(inner_lhs, inner_rhs)) => {
                        match inner_lhs.as_ref() {
                            Expr::Const(c1) => {
                                Expr::Mul(Box::new(Expr::Const(c * c1)), inner_rhs.clone())
                                    .simplify_()
                            }
                            _ => Expr::Mul(Box::new(lhs), Box::new(rhs)),
                        }
                    }
                    // c2 * (c1 / e) = (c1 * c2) / e
                    (Expr::Const(c), Expr::Div(num, den)) => match num.as_ref() {
                        Expr::Const(c1) => Expr::Div(Box::new(Expr::Const(c * c1)), den.clone()),
                        _ => Expr::Mul(Box::new(lhs), Box::new(rhs)),
                    },
                    // (c * e1) * e2 = c * (e1 * e2)
                    (Expr::Mul(inner_lhs, inner_rhs), _) if inner_lhs.as_const().is_some() => {
                        Expr::Mul(
                            inner_lhs.clone(),
                            Box::new(Expr::Mul(inner_rhs.clone(), Box::new(rhs)).simplify_()),
                        )
                        .simplify_()
                    }
                    (_, _) if lhs == rhs => Expr::Pow(Box::new(lhs), Box::new(Expr::Const(2.0))),
                    (Expr::Pow(base1, exp1), Expr::Pow(base2, exp2)) if base1 == base2 => {
                        let new_exp = Expr::Add(exp1.clone(), exp2.clone()).simplify_();
                        Expr::Pow(base1.clone(), Box::new(new_exp)).simplify_()
                    }
                    (Expr::Pow(base, exp), other) | (other, Expr::Pow(base, exp))
                        if base.as_ref() == other =>
                    {
                        let new_exp = Expr::Add(exp.clone(), Box::new(Expr::Const(1.0))).simplify_();
                        Expr::Pow(base.clone(), Box::new(new_exp)).simplify_()
                    }
                    _ => Expr::Mul(Box::new(lhs), Box::new(rhs)),
                }
            }
            Expr::Div(lhs, rhs) => {
                let lhs = lhs.simplify_();
                let rhs = rhs.simplify_();
                match (&lhs, &rhs) {
                    (Expr::Const(a), Expr::Const(b)) if *b != 0.0 => Expr::Const(a / b),
                    (Expr::Const(a), _) if *a == 0.0 => Expr::Const(0.0),
                    (_, Expr::Const(b)) if *b == 1.0 => lhs,
                    // e / c = (1 / c) * e
                    (_, Expr::Const(c)) if *c != 0.0 => {
                        Expr::Mul(Box::new(Expr::Const(1.0 / c)), Box::new(lhs)).simplify_()
                    }
                    _ if lhs == rhs => Expr::Const(1.0),
                    (Expr::Pow(base1, exp1), Expr::Pow(base2, exp2)) if base1 == base2 => {
                        let new_exp = Expr::Sub(exp1.clone(), exp2.clone()).simplify_();
                        Expr::Pow(base1.clone(), Box::new(new_exp)).simplify_()
                    }
                    (Expr::Pow(base, exp), other) if base.as_ref() == other => {
                        let new_exp = Expr::Sub(exp.clone(), Box::new(Expr::Const(1.0))).simplify_();
                        Expr::Pow(base.clone(), Box::new(new_exp)).simplify_()
                    }
                    _ => Expr::Div(Box::new(lhs), Box::new(rhs)),
                }
            }
            Expr::Pow(base, exp) => {
                let base = base.simplify_();
                let exp = exp.simplify_();
                match (&base, &exp) {
                    (Expr::Const(a), Expr::Const(b)) => {
                        finite_or(a.powf(*b), Expr::Pow(Box::new(base.clone()), Box::new(exp.clone())))
                    }
                    (_, Expr::Const(b)) if *b == 0.0 => Expr::Const(1.0),
                    (_, Expr::Const(b)) if *b == 1.0 => base,
                    (Expr::Const(a), _) if *a == 1.0 => Expr::Const(1.0),
                    // (e ^ a) ^ b = e ^ (a * b) for integer b
                    (Expr::Pow(inner_base, inner_exp), Expr::Const(b)) if b.fract() == 0.0 => {
                        let new_exp =
                            Expr::Mul(inner_exp.clone(), Box::new(Expr::Const(*b))).simplify_();
                        Expr::Pow(inner_base.clone(), Box::new(new_exp))
                    }
                    _ => Expr::Pow(Box::new(base), Box::new(exp)),
                }
            }
            Expr::Exp(expr) => fold_unary(expr.simplify_(), Expr::Exp, f64::exp),
            Expr::Ln(expr) => match expr.simplify_() {
                Expr::Exp(inner) => *inner,
                other => fold_unary(other, Expr::Ln, f64::ln),
            },
            Expr::sin(expr) => fold_unary(expr.simplify_(), Expr::sin, f64::sin),
            Expr::cos(expr) => fold_unary(expr.simplify_(), Expr::cos, f64::cos),
            Expr::tg(expr) => fold_unary(expr.simplify_(), Expr::tg, f64::tan),
            Expr::Sqrt(expr) => fold_unary(expr.simplify_(), Expr::Sqrt, f64::sqrt),
            Expr::Abs(expr) => match expr.simplify_() {
                Expr::Abs(inner) => Expr::Abs(inner),
                other => fold_unary(other, Expr::Abs, f64::abs),
            },
        }
    }

    /// Simplifies until a fixed point, at most a few passes.
    pub fn simplify(&self) -> Expr {
        let mut current = self.simplify_();
        for _ in 0..4 {
            let next = current.simplify_();
            if next == current {
                break;
            }
            current = next;
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::parse_expr::parse_expression_func;

    fn x() -> Expr {
        Expr::Var("x".to_string())
    }

    fn parse(s: &str) -> Expr {
        parse_expression_func(s, "x").unwrap()
    }

    #[test]
    fn test_constant_folding() {
        assert_eq!(parse("2 + 3 * 4").simplify(), Expr::Const(14.0));
        assert_eq!(parse("2 ** 10").simplify(), Expr::Const(1024.0));
        assert_eq!(parse("exp(0)").simplify(), Expr::Const(1.0));
    }

    #[test]
    fn test_non_finite_constants_are_not_folded() {
        let expr = parse("log(0)");
        assert_eq!(expr.simplify(), Expr::Ln(Box::new(Expr::Const(0.0))));
        let expr = parse("1 / 0");
        assert_eq!(expr.simplify(), expr);
    }

    #[test]
    fn test_identities() {
        assert_eq!(parse("x + 0").simplify(), x());
        assert_eq!(parse("0 + x").simplify(), x());
        assert_eq!(parse("x * 1").simplify(), x());
        assert_eq!(parse("0 * sin(x)").simplify(), Expr::Const(0.0));
        assert_eq!(parse("x ^ 1").simplify(), x());
        assert_eq!(parse("x ^ 0").simplify(), Expr::Const(1.0));
        assert_eq!(parse("x - x").simplify(), Expr::Const(0.0));
        assert_eq!(parse("x / x").simplify(), Expr::Const(1.0));
        assert_eq!(parse("log(exp(x))").simplify(), x());
    }

    #[test]
    fn test_constant_collection() {
        let expected = Expr::Const(6.0) * x();
        assert_eq!(parse("(2 * x) * 3").simplify(), expected);
        assert_eq!(parse("x * 6").simplify(), expected);
        assert_eq!(parse("(12 * x) / 2").simplify(), expected);
        assert_eq!(parse("x / 4").simplify(), Expr::Const(0.25) * x());
    }

    #[test]
    fn test_unary_minus_folds_into_coefficient() {
        assert_eq!(parse("-(3 * x)").simplify(), Expr::Const(-3.0) * x());
        assert_eq!(parse("0 - x").simplify(), Expr::Const(-1.0) * x());
    }

    #[test]
    fn test_power_rules() {
        assert_eq!(parse("x * x").simplify(), x().pow(Expr::Const(2.0)));
        assert_eq!(parse("x^2 * x^3").simplify(), x().pow(Expr::Const(5.0)));
        assert_eq!(parse("x^2 * x").simplify(), x().pow(Expr::Const(3.0)));
        assert_eq!(parse("x^5 / x^2").simplify(), x().pow(Expr::Const(3.0)));
        assert_eq!(parse("(x^2)^3").simplify(), x().pow(Expr::Const(6.0)));
    }
}
