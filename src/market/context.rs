use std::sync::Arc;

use crate::calibration::config::ValuationConfig;
use crate::calibration::expectation::NonlinearLogNormal;
use crate::calibration::solver::Solver;
use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::error::{PricingError, Result};
use crate::market::pricer::{CreditPricer, PricerSource};
use crate::models::utils::Inversion;
use crate::quadrature::Quadrature;

/// Everything a model needs besides the option terms and forwards.
///
/// Cloning is cheap: the pricer source, quadrature and diagnostics sink are
/// shared behind `Arc`s.
#[derive(Debug, Clone)]
pub struct PricerContext {
    source: Arc<dyn PricerSource>,
    config: ValuationConfig,
    solver: Solver,
    quadrature: Arc<Quadrature>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl PricerContext {
    pub fn new(source: Arc<dyn PricerSource>, config: ValuationConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| PricingError::config(format!("{e:#}")))?;
        let quadrature = Quadrature::from_config(&config.quadrature)?;
        Ok(Self {
            source,
            solver: Solver::new(config.solver.clone()),
            quadrature: Arc::new(quadrature),
            config,
            diagnostics: Arc::new(TracingDiagnostics),
        })
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Replace the quadrature, e.g. with an explicit node table.
    pub fn with_quadrature(mut self, quadrature: Quadrature) -> Self {
        self.quadrature = Arc::new(quadrature);
        self
    }

    pub fn pricer(&self, as_of: f64, settle: f64, premium: f64) -> Result<Box<dyn CreditPricer>> {
        self.source.pricer(as_of, settle, premium)
    }

    pub fn config(&self) -> &ValuationConfig {
        &self.config
    }

    pub fn solver(&self) -> &Solver {
        &self.solver
    }

    pub fn quadrature(&self) -> &Arc<Quadrature> {
        &self.quadrature
    }

    pub fn diagnostics(&self) -> &Arc<dyn Diagnostics> {
        &self.diagnostics
    }

    pub fn inversion(&self) -> Inversion {
        Inversion::new(self.solver.clone(), self.config.implied_vol.clone())
    }

    /// Expectation engine sharing this context's quadrature and solver.
    pub fn engine(&self) -> NonlinearLogNormal {
        NonlinearLogNormal::new(Arc::clone(&self.quadrature), self.solver.clone())
    }
}
