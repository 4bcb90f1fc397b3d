// SYMBOLIC TRAITS //////////////////////////////////////////////////////////////////
// Seam between the engine and whatever computes exact integrals.
// The native rule-based integrator lives in symbolic_integration.rs;
// add other backends here as needed

use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_integration::IntegrationError;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Default number of points the integrand is scanned at before integrating.
pub const DEFAULT_SINGULARITY_SCAN: usize = 1000;

/// Computes definite integrals of a symbolic expression in one variable.
///
/// Send + Sync so an engine holding a boxed integrator can still be moved across threads.
pub trait DefiniteIntegrator: Send + Sync {
    /// Exact value of ∫ expr d(var) from `lower` to `upper`.
    fn integrate_definite(
        &self,
        expr: &Expr,
        var: &str,
        lower: f64,
        upper: f64,
    ) -> Result<f64, IntegrationError>;
    /// Short name, for logs and reports
    fn name(&self) -> &str;
}

///////////////// NATIVE BACKEND /////////////////////////
/// Rule-based integrator over `Expr`: simplify, find an antiderivative, apply the
/// fundamental theorem of calculus.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeIntegrator {
    /// points scanned for non-finite values before integrating
    pub singularity_scan: usize,
}

impl Default for NativeIntegrator {
    fn default() -> Self {
        NativeIntegrator {
            singularity_scan: DEFAULT_SINGULARITY_SCAN,
        }
    }
}

impl DefiniteIntegrator for NativeIntegrator {
    fn integrate_definite(
        &self,
        expr: &Expr,
        var: &str,
        lower: f64,
        upper: f64,
    ) -> Result<f64, IntegrationError> {
        expr.definite_integrate(var, lower, upper, self.singularity_scan)
    }

    fn name(&self) -> &str {
        "native"
    }
}

/////////////////////////////////////////////////////////////////////////////////////////
// FACTORY METHODS  ////////////////////////////////////////////////////////////////////
/// Available integrator backends, selected by name from configuration.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum IntegratorBackend {
    #[default]
    Native,
    // Add other backends here as needed
}

/// Builds the integrator for `backend`.
pub fn get_integrator(
    backend: IntegratorBackend,
    singularity_scan: usize,
) -> Box<dyn DefiniteIntegrator> {
    match backend {
        IntegratorBackend::Native => Box::new(NativeIntegrator { singularity_scan }),
    }
}

/// Parses a backend name case-insensitively, e.g. "native" or "Native".
pub fn integrator_backend_from_string(name: &str) -> Result<IntegratorBackend, strum::ParseError> {
    name.trim().parse::<IntegratorBackend>()
}

//___________________________________TESTS____________________________________

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::parse_expr::parse_expression_func;
    use approx::assert_relative_eq;
    use strum::IntoEnumIterator;

    #[test]
    fn test_get_integrator() {
        let integrator = get_integrator(IntegratorBackend::Native, 500);
        assert_eq!(integrator.name(), "native");
        let expr = parse_expression_func("3*x^2", "x").unwrap();
        let value = integrator.integrate_definite(&expr, "x", 0.0, 2.0).unwrap();
        assert_relative_eq!(value, 8.0, epsilon = 1e-12);
    }

    #[test]
    fn test_integrator_reports_unintegrable() {
        let integrator = NativeIntegrator::default();
        assert_eq!(integrator.singularity_scan, DEFAULT_SINGULARITY_SCAN);
        let expr = parse_expression_func("exp(-x^2)", "x").unwrap();
        assert!(matches!(
            integrator.integrate_definite(&expr, "x", 0.0, 1.0),
            Err(IntegrationError::NoClosedForm(_))
        ));
    }

    #[test]
    fn test_backend_from_string() {
        assert_eq!(
            integrator_backend_from_string("native").unwrap(),
            IntegratorBackend::Native
        );
        assert_eq!(
            integrator_backend_from_string(" NATIVE ").unwrap(),
            IntegratorBackend::Native
        );
        assert!(integrator_backend_from_string("quadpack").is_err());
    }

    #[test]
    fn test_backend_names_round_trip() {
        for backend in IntegratorBackend::iter() {
            let name = backend.to_string();
            assert_eq!(integrator_backend_from_string(&name).unwrap(), backend);
        }
    }
}
