use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::utils::linspace;
use std::fmt;

/// Highest polynomial degree the coefficient arithmetic will build.
const MAX_POLY_DEGREE: usize = 64;

/// Why no exact value could be produced for an integral.
#[derive(Debug, Clone, PartialEq)]
pub enum IntegrationError {
    /// None of the rules matched; carries the offending subexpression
    NoClosedForm(String),
    /// The integrand is not finite at (or has a pole near) `at`
    Divergent { at: f64 },
    /// The antiderivative evaluated to NaN or an infinity
    NonFinite,
}

impl fmt::Display for IntegrationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IntegrationError::NoClosedForm(expr) => {
                write!(f, "No closed form antiderivative found for {}", expr)
            }
            IntegrationError::Divergent { at } => {
                write!(f, "Integrand is not finite near x = {}", at)
            }
            IntegrationError::NonFinite => write!(f, "Definite integral is not a finite number"),
        }
    }
}

impl std::error::Error for IntegrationError {}

fn no_closed_form(expr: &Expr) -> IntegrationError {
    IntegrationError::NoClosedForm(expr.to_string())
}

//___________________________________POLYNOMIAL COEFFICIENTS____________________________________
// ascending order: coeffs[k] multiplies x^k

fn poly_trim(mut coeffs: Vec<f64>) -> Vec<f64> {
    while coeffs.len() > 1 && coeffs.last() == Some(&0.0) {
        coeffs.pop();
    }
    if coeffs.is_empty() {
        coeffs.push(0.0);
    }
    coeffs
}

fn poly_add(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len().max(b.len())];
    for (k, c) in a.iter().enumerate() {
        out[k] += c;
    }
    for (k, c) in b.iter().enumerate() {
        out[k] += c;
    }
    poly_trim(out)
}

fn poly_scale(a: &[f64], factor: f64) -> Vec<f64> {
    poly_trim(a.iter().map(|c| c * factor).collect())
}

fn poly_mul(a: &[f64], b: &[f64]) -> Option<Vec<f64>> {
    if a.len() + b.len() - 2 > MAX_POLY_DEGREE {
        return None;
    }
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, ca) in a.iter().enumerate() {
        for (j, cb) in b.iter().enumerate() {
            out[i + j] += ca * cb;
        }
    }
    Some(poly_trim(out))
}

fn poly_derivative(a: &[f64]) -> Vec<f64> {
    if a.len() <= 1 {
        return vec![0.0];
    }
    a.iter()
        .enumerate()
        .skip(1)
        .map(|(k, c)| k as f64 * c)
        .collect()
}

fn poly_is_zero(a: &[f64]) -> bool {
    a.iter().all(|c| *c == 0.0)
}

/// Divides P(x) by (ax + b): returns the quotient and the constant remainder.
fn poly_divide_linear(p: &[f64], a: f64, b: f64) -> (Vec<f64>, f64) {
    if p.len() == 1 {
        return (vec![0.0], p[0]);
    }
    let root = -b / a;
    let mut quotient = vec![0.0; p.len() - 1];
    let mut carry = 0.0;
    for k in (1..p.len()).rev() {
        carry = p[k] + root * carry;
        quotient[k - 1] = carry;
    }
    let remainder = p[0] + root * carry;
    (poly_scale(&quotient, 1.0 / a), remainder)
}

/// k such that p = k * q, if any
fn poly_ratio(p: &[f64], q: &[f64]) -> Option<f64> {
    if p.len() != q.len() || poly_is_zero(q) {
        return None;
    }
    let pivot = q.iter().position(|c| *c != 0.0)?;
    let k = p[pivot] / q[pivot];
    let proportional = p
        .iter()
        .zip(q.iter())
        .all(|(pc, qc)| (pc - k * qc).abs() <= 1e-12 * pc.abs().max(1.0));
    proportional.then_some(k)
}

fn polynomial_to_expr(coeffs: &[f64], var: &str) -> Expr {
    let x = Expr::Var(var.to_string());
    let monomial = |c: f64, k: usize| {
        let power = match k {
            0 => return Expr::Const(c),
            1 => x.clone(),
            _ => x.clone().pow(Expr::Const(k as f64)),
        };
        if c == 1.0 {
            power
        } else {
            Expr::Const(c) * power
        }
    };
    let mut terms = coeffs
        .iter()
        .enumerate()
        .filter(|(_, c)| **c != 0.0)
        .map(|(k, c)| (*c, k));
    let Some((c0, k0)) = terms.next() else {
        return Expr::Const(0.0);
    };
    terms.fold(monomial(c0, k0), |acc, (c, k)| {
        if c < 0.0 {
            acc - monomial(-c, k)
        } else {
            acc + monomial(c, k)
        }
    })
}

fn integrate_polynomial(coeffs: &[f64], var: &str) -> Expr {
    let mut shifted = vec![0.0; coeffs.len() + 1];
    for (k, c) in coeffs.iter().enumerate() {
        shifted[k + 1] = c / (k as f64 + 1.0);
    }
    polynomial_to_expr(&shifted, var)
}

fn scaled(expr: Expr, factor: f64) -> Expr {
    if factor == 1.0 {
        expr
    } else {
        Expr::Const(factor) * expr
    }
}

/// Splits `c * e` into `(c, e)`; anything else has coefficient 1.
fn split_coefficient(expr: &Expr) -> (f64, Expr) {
    match expr {
        Expr::Mul(lhs, rhs) => match lhs.as_const() {
            Some(c) => (c, rhs.as_ref().clone()),
            None => (1.0, expr.clone()),
        },
        _ => (1.0, expr.clone()),
    }
}

impl Expr {
    /// Coefficients of the expression as a polynomial in `var`, lowest degree first.
    ///
    /// Products and non-negative integer powers are expanded, so `(x+1)^2` and `x*x` are
    /// recognised. Subtrees free of `var` must evaluate to a finite constant.
    pub fn as_polynomial(&self, var: &str) -> Option<Vec<f64>> {
        if !self.contains_variable(var) {
            let value = self.eval_expression(var, 0.0);
            return value.is_finite().then(|| vec![value]);
        }
        let coeffs = match self {
            Expr::Var(_) => vec![0.0, 1.0],
            Expr::Add(lhs, rhs) => poly_add(&lhs.as_polynomial(var)?, &rhs.as_polynomial(var)?),
            Expr::Sub(lhs, rhs) => poly_add(
                &lhs.as_polynomial(var)?,
                &poly_scale(&rhs.as_polynomial(var)?, -1.0),
            ),
            Expr::Mul(lhs, rhs) => poly_mul(&lhs.as_polynomial(var)?, &rhs.as_polynomial(var)?)?,
            Expr::Div(lhs, rhs) => {
                if rhs.contains_variable(var) {
                    return None;
                }
                let divisor = rhs.eval_expression(var, 0.0);
                if divisor == 0.0 || !divisor.is_finite() {
                    return None;
                }
                poly_scale(&lhs.as_polynomial(var)?, 1.0 / divisor)
            }
            Expr::Pow(base, exp) => {
                if exp.contains_variable(var) {
                    return None;
                }
                let n = exp.eval_expression(var, 0.0);
                if !(0.0..=MAX_POLY_DEGREE as f64).contains(&n) || n.fract() != 0.0 {
                    return None;
                }
                let base = base.as_polynomial(var)?;
                let mut acc = vec![1.0];
                for _ in 0..n as usize {
                    acc = poly_mul(&acc, &base)?;
                }
                acc
            }
            _ => return None,
        };
        Some(poly_trim(coeffs))
    }

    /// `(a, b)` when the expression is `a*var + b` (a may be zero).
    pub fn linear_coefficients(&self, var: &str) -> Option<(f64, f64)> {
        match self.as_polynomial(var)?.as_slice() {
            [b] => Some((0.0, *b)),
            [b, a] => Some((*a, *b)),
            _ => None,
        }
    }

    fn nonconstant_linear(&self, var: &str) -> Option<f64> {
        self.linear_coefficients(var)
            .map(|(a, _)| a)
            .filter(|a| *a != 0.0)
    }

    /// SYMBOLIC INTEGRATION
    ///
    /// Indefinite integral with respect to `var`, without the constant of integration.
    /// Works best on a simplified tree.
    pub fn integrate(&self, var: &str) -> Result<Expr, IntegrationError> {
        let x = Expr::Var(var.to_string());
        // ∫ c dx = c*x
        if !self.contains_variable(var) {
            return Ok(self.clone() * x);
        }
        // polynomials of any degree, including products that expand to one
        if let Some(coeffs) = self.as_polynomial(var) {
            return Ok(integrate_polynomial(&coeffs, var));
        }
        match self {
            // ∫ (f ± g) dx = ∫ f dx ± ∫ g dx
            Expr::Add(lhs, rhs) => Ok(lhs.integrate(var)? + rhs.integrate(var)?),
            Expr::Sub(lhs, rhs) => Ok(lhs.integrate(var)? - rhs.integrate(var)?),
            Expr::Mul(lhs, rhs) => self.integrate_multiplication(lhs, rhs, var),
            Expr::Div(lhs, rhs) => self.integrate_division(lhs, rhs, var),
            Expr::Pow(base, exp) => self.integrate_power(base, exp, var),
            Expr::Exp(arg)
            | Expr::Ln(arg)
            | Expr::sin(arg)
            | Expr::cos(arg)
            | Expr::tg(arg)
            | Expr::Sqrt(arg)
            | Expr::Abs(arg) => self.integrate_function_of_linear(arg, var),
            Expr::Var(_) | Expr::Const(_) => Err(no_closed_form(self)),
        }
    }

    /// f(ax + b) for every allow-listed f, by substitution u = ax + b.
    fn integrate_function_of_linear(
        &self,
        arg: &Expr,
        var: &str,
    ) -> Result<Expr, IntegrationError> {
        let a = arg
            .nonconstant_linear(var)
            .ok_or_else(|| no_closed_form(self))?;
        let u = arg.clone();
        let antiderivative = match self {
            // ∫ e^u du = e^u
            Expr::Exp(_) => u.exp(),
            // ∫ ln(u) du = u ln(u) - u
            Expr::Ln(_) => u.clone() * u.clone().ln() - u,
            Expr::sin(_) => -Expr::cos(u.boxed()),
            Expr::cos(_) => Expr::sin(u.boxed()),
            // ∫ tan(u) du = -ln|cos(u)|
            Expr::tg(_) => -Expr::cos(u.boxed()).abs().ln(),
            // ∫ sqrt(u) du = 2/3 u^(3/2)
            Expr::Sqrt(_) => Expr::Const(2.0 / 3.0) * u.pow(Expr::Const(1.5)),
            // ∫ |u| du = u|u|/2
            Expr::Abs(_) => u.clone() * u.abs() / Expr::Const(2.0),
            _ => return Err(no_closed_form(self)),
        };
        Ok(scaled(antiderivative, 1.0 / a))
    }

    fn integrate_multiplication(
        &self,
        lhs: &Expr,
        rhs: &Expr,
        var: &str,
    ) -> Result<Expr, IntegrationError> {
        // constant factors
        if !lhs.contains_variable(var) {
            return Ok(lhs.clone() * rhs.integrate(var)?);
        }
        if !rhs.contains_variable(var) {
            return Ok(rhs.clone() * lhs.integrate(var)?);
        }

        // polynomial * exp/sin/cos(ax + b), polynomial * ln(x)
        for (poly, other) in [(lhs, rhs), (rhs, lhs)] {
            if let Some(coeffs) = poly.as_polynomial(var) {
                if let Some(result) = integrate_polynomial_times(&coeffs, other, var) {
                    return Ok(result);
                }
            }
        }

        // distribute over sums: (f + g) * h = f*h + g*h
        match (lhs, rhs) {
            (Expr::Add(f, g), h) | (h, Expr::Add(f, g)) => {
                let distributed = f.as_ref().clone() * h.clone() + g.as_ref().clone() * h.clone();
                distributed.integrate(var)
            }
            (Expr::Sub(f, g), h) | (h, Expr::Sub(f, g)) => {
                let distributed = f.as_ref().clone() * h.clone() - g.as_ref().clone() * h.clone();
                distributed.integrate(var)
            }
            _ => Err(no_closed_form(self)),
        }
    }

    fn integrate_division(
        &self,
        lhs: &Expr,
        rhs: &Expr,
        var: &str,
    ) -> Result<Expr, IntegrationError> {
        // ∫ f(x)/c dx = (1/c) * ∫ f(x) dx
        if !rhs.contains_variable(var) {
            return Ok(lhs.integrate(var)? / rhs.clone());
        }

        // P(x) / (ax + b) = Q(x) + R/(ax + b)
        let divisor = rhs.linear_coefficients(var).filter(|(a, _)| *a != 0.0);
        if let (Some(p), Some((a, b))) = (lhs.as_polynomial(var), divisor) {
            let (quotient, remainder) = poly_divide_linear(&p, a, b);
            let log_term = scaled(rhs.clone().abs().ln(), remainder / a);
            return Ok(match (poly_is_zero(&quotient), remainder == 0.0) {
                (true, _) => log_term,
                (false, true) => integrate_polynomial(&quotient, var),
                (false, false) => integrate_polynomial(&quotient, var) + log_term,
            });
        }

        // ∫ k g'(x)/g(x) dx = k ln|g(x)|
        let derivative = rhs.diff(var).simplify();
        let (k_num, num) = split_coefficient(&lhs.simplify());
        let (k_den, den) = split_coefficient(&derivative);
        if num == den && k_den != 0.0 {
            return Ok(scaled(rhs.clone().abs().ln(), k_num / k_den));
        }
        if let (Some(p), Some(dp)) = (lhs.as_polynomial(var), derivative.as_polynomial(var)) {
            if let Some(k) = poly_ratio(&p, &dp) {
                return Ok(scaled(rhs.clone().abs().ln(), k));
            }
        }

        Err(no_closed_form(self))
    }

    fn integrate_power(
        &self,
        base: &Expr,
        exp: &Expr,
        var: &str,
    ) -> Result<Expr, IntegrationError> {
        // ∫ (ax + b)^n dx
        if !exp.contains_variable(var) {
            let n = exp.eval_expression(var, 0.0);
            if let Some(a) = base.nonconstant_linear(var).filter(|_| n.is_finite()) {
                if n == -1.0 {
                    return Ok(scaled(base.clone().abs().ln(), 1.0 / a));
                }
                let raised = base.clone().pow(Expr::Const(n + 1.0));
                return Ok(scaled(raised, 1.0 / (a * (n + 1.0))));
            }
        }
        // ∫ c^(ax + b) dx = c^(ax + b) / (a ln c)
        if !base.contains_variable(var) {
            let c = base.eval_expression(var, 0.0);
            if let Some(a) = exp.nonconstant_linear(var).filter(|_| c > 0.0 && c != 1.0) {
                return Ok(scaled(self.clone(), 1.0 / (a * c.ln())));
            }
        }
        Err(no_closed_form(self))
    }

    /// Definite integration using the fundamental theorem of calculus.
    ///
    /// The integrand is scanned at `scan_points` points over the closed interval first; a
    /// non-finite value, or a sign change of a denominator, makes the integral `Divergent`.
    pub fn definite_integrate(
        &self,
        var: &str,
        lower: f64,
        upper: f64,
        scan_points: usize,
    ) -> Result<f64, IntegrationError> {
        self.check_finite_on(var, lower, upper, scan_points)?;
        let indefinite = self.simplify().integrate(var)?;
        let value = indefinite.eval_expression(var, upper) - indefinite.eval_expression(var, lower);
        if value.is_finite() {
            Ok(value)
        } else {
            Err(IntegrationError::NonFinite)
        }
    }

    /// Looks for points of `[lower, upper]` where the integrand blows up.
    pub fn check_finite_on(
        &self,
        var: &str,
        lower: f64,
        upper: f64,
        scan_points: usize,
    ) -> Result<(), IntegrationError> {
        let grid = linspace(lower, upper, scan_points.max(2)).to_vec();
        if let Some(&at) = grid
            .iter()
            .find(|&&x| !self.eval_expression(var, x).is_finite())
        {
            return Err(IntegrationError::Divergent { at });
        }
        // the simplified tree can hide a pole of the original one, e.g. (x-c)^2/(x-c)^4
        let mut factors = self.singular_factors(var);
        factors.extend(self.simplify().singular_factors(var));
        for factor in factors {
            let values: Vec<f64> = grid.iter().map(|&x| factor.eval_expression(var, x)).collect();
            // a pole between two grid points shows up as a sign change of its denominator
            for i in 0..grid.len() - 1 {
                if values[i] * values[i + 1] < 0.0 {
                    let at = locate_sign_change(&factor, var, grid[i], grid[i + 1]);
                    return Err(IntegrationError::Divergent { at });
                }
            }
            // or, for even order zeros, as a local minimum of |factor| that reaches zero
            if let Some(at) = locate_touching_zero(&factor, var, &grid, &values) {
                return Err(IntegrationError::Divergent { at });
            }
        }
        Ok(())
    }

    /// Subexpressions whose zeros make the whole expression blow up.
    fn singular_factors(&self, var: &str) -> Vec<Expr> {
        let mut factors = Vec::new();
        self.collect_singular_factors(var, &mut factors);
        factors
    }

    fn collect_singular_factors(&self, var: &str, out: &mut Vec<Expr>) {
        match self {
            Expr::Div(_, den) if den.contains_variable(var) => out.push(den.as_ref().clone()),
            Expr::Pow(base, exp)
                if base.contains_variable(var) && exp.as_const().is_none_or(|n| n < 0.0) =>
            {
                out.push(base.as_ref().clone())
            }
            Expr::tg(arg) if arg.contains_variable(var) => out.push(Expr::cos(arg.clone())),
            Expr::Ln(arg) if arg.contains_variable(var) => out.push(arg.as_ref().clone()),
            _ => {}
        }
        for child in self.children() {
            child.collect_singular_factors(var, out);
        }
    }
}

fn locate_sign_change(factor: &Expr, var: &str, mut lo: f64, mut hi: f64) -> f64 {
    let mut f_lo = factor.eval_expression(var, lo);
    for _ in 0..60 {
        let mid = 0.5 * (lo + hi);
        let f_mid = factor.eval_expression(var, mid);
        if f_mid == 0.0 || !f_mid.is_finite() {
            return mid;
        }
        if (f_lo < 0.0) == (f_mid < 0.0) {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// |factor| below this fraction of its largest grid value counts as a zero.
const ZERO_TOLERANCE: f64 = 1e-12;

/// Refines every local minimum of |factor| on the grid and returns the first one that is zero.
fn locate_touching_zero(factor: &Expr, var: &str, grid: &[f64], values: &[f64]) -> Option<f64> {
    let magnitude: Vec<f64> = values.iter().map(|v| v.abs()).collect();
    let scale = magnitude
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(1.0, f64::max);
    let last = grid.len() - 1;
    for i in 0..=last {
        let (left, right) = (i.saturating_sub(1), (i + 1).min(last));
        if !(magnitude[i] <= magnitude[left] && magnitude[i] <= magnitude[right]) {
            continue;
        }
        let (at, smallest) = minimize_magnitude(factor, var, grid[left], grid[right]);
        if smallest <= ZERO_TOLERANCE * scale {
            return Some(at);
        }
    }
    None
}

/// Golden section search for the minimum of |factor| on [lo, hi].
fn minimize_magnitude(factor: &Expr, var: &str, mut lo: f64, mut hi: f64) -> (f64, f64) {
    let ratio = (5f64.sqrt() - 1.0) / 2.0;
    let magnitude = |x: f64| factor.eval_expression(var, x).abs();
    let mut x1 = hi - ratio * (hi - lo);
    let mut x2 = lo + ratio * (hi - lo);
    let (mut f1, mut f2) = (magnitude(x1), magnitude(x2));
    for _ in 0..100 {
        if f1 <= f2 {
            hi = x2;
            x2 = x1;
            f2 = f1;
            x1 = hi - ratio * (hi - lo);
            f1 = magnitude(x1);
        } else {
            lo = x1;
            x1 = x2;
            f1 = f2;
            x2 = lo + ratio * (hi - lo);
            f2 = magnitude(x2);
        }
        if f1 == 0.0 {
            return (x1, 0.0);
        }
    }
    if f1 <= f2 { (x1, f1) } else { (x2, f2) }
}

/// Tabular integration by parts of P(x) * other, where `other` is exp, sin or cos of a
/// linear argument, or ln(x).
fn integrate_polynomial_times(coeffs: &[f64], other: &Expr, var: &str) -> Option<Expr> {
    match other {
        // ∫ P e^u dx = e^u Σ (-1)^k P^(k) / a^(k+1)
        Expr::Exp(arg) => {
            let a = arg.nonconstant_linear(var)?;
            let mut sum = vec![0.0];
            let mut derivative = coeffs.to_vec();
            let mut k = 0;
            while !poly_is_zero(&derivative) {
                let factor = (-1f64).powi(k) / a.powi(k + 1);
                sum = poly_add(&sum, &poly_scale(&derivative, factor));
                derivative = poly_derivative(&derivative);
                k += 1;
            }
            Some(other.clone() * polynomial_to_expr(&sum, var))
        }
        Expr::sin(arg) | Expr::cos(arg) => {
            let a = arg.nonconstant_linear(var)?;
            let (even, odd) = alternating_derivative_sums(coeffs, a);
            let sin_u = Expr::sin(arg.clone());
            let cos_u = Expr::cos(arg.clone());
            let result = if matches!(other, Expr::sin(_)) {
                polynomial_to_expr(&odd, var) * sin_u - polynomial_to_expr(&even, var) * cos_u
            } else {
                polynomial_to_expr(&even, var) * sin_u + polynomial_to_expr(&odd, var) * cos_u
            };
            Some(result)
        }
        // ∫ x^k ln(x) dx = x^(k+1) (ln(x)/(k+1) - 1/(k+1)^2)
        Expr::Ln(arg) if matches!(arg.as_ref(), Expr::Var(name) if name == var) => {
            let mut log_part = vec![0.0; coeffs.len() + 1];
            let mut plain_part = vec![0.0; coeffs.len() + 1];
            for (k, c) in coeffs.iter().enumerate() {
                let k1 = k as f64 + 1.0;
                log_part[k + 1] = c / k1;
                plain_part[k + 1] = c / (k1 * k1);
            }
            Some(
                polynomial_to_expr(&log_part, var) * other.clone()
                    - polynomial_to_expr(&plain_part, var),
            )
        }
        _ => None,
    }
}

/// Σ (-1)^k P^(2k) / a^(2k+1) and Σ (-1)^k P^(2k+1) / a^(2k+2).
fn alternating_derivative_sums(coeffs: &[f64], a: f64) -> (Vec<f64>, Vec<f64>) {
    let mut even = vec![0.0];
    let mut odd = vec![0.0];
    let mut derivative = coeffs.to_vec();
    let mut order = 0;
    while !poly_is_zero(&derivative) {
        let sign = if (order / 2) % 2 == 0 { 1.0 } else { -1.0 };
        let term = poly_scale(&derivative, sign / a.powi(order + 1));
        if order % 2 == 0 {
            even = poly_add(&even, &term);
        } else {
            odd = poly_add(&odd, &term);
        }
        derivative = poly_derivative(&derivative);
        order += 1;
    }
    (even, odd)
}
