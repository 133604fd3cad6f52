//! Log-normal quadrature.
//!
//! Two interchangeable paths compute expectations of `g(S)` for
//! `S = e^{mu + sigma·Z}`: a fixed node table ([`QuadratureNodes`]) and an
//! adaptive Gauss-Legendre integrator over a truncated normal range
//! ([`LogNormal`]). [`Quadrature`] selects the fixed path whenever its node
//! table is non-empty.

pub mod adaptive;
pub mod nodes;

pub use adaptive::{AdaptiveIntegrator, LogNormal};
pub use nodes::QuadratureNodes;

use crate::calibration::config::QuadratureConfig;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct Quadrature {
    nodes: QuadratureNodes,
    integrator: AdaptiveIntegrator,
    z_max: f64,
}

impl Quadrature {
    /// Build from configuration: `node_count == 0` keeps the node table empty.
    pub fn from_config(config: &QuadratureConfig) -> Result<Self> {
        let nodes = if config.node_count == 0 {
            QuadratureNodes::empty()
        } else {
            QuadratureNodes::gauss_hermite(config.node_count)?
        };
        Self::with_nodes(nodes, config)
    }

    pub fn with_nodes(nodes: QuadratureNodes, config: &QuadratureConfig) -> Result<Self> {
        Ok(Self {
            nodes,
            integrator: AdaptiveIntegrator::from_config(config)?,
            z_max: config.z_max,
        })
    }

    pub fn uses_nodes(&self) -> bool {
        !self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &QuadratureNodes {
        &self.nodes
    }

    /// `E[g(S)]`.
    pub fn expectation<G>(&self, mu: f64, sigma: f64, g: G) -> Result<f64>
    where
        G: Fn(f64) -> Result<f64>,
    {
        if self.uses_nodes() {
            self.nodes.expectation(mu, sigma, g)
        } else {
            LogNormal::new(mu, sigma).integral(&self.integrator, self.z_max, g)
        }
    }

    /// `E[g(S)·1{S > cutoff}]`.
    pub fn right_expectation<G>(&self, mu: f64, sigma: f64, cutoff: f64, g: G) -> Result<f64>
    where
        G: Fn(f64) -> Result<f64>,
    {
        if self.uses_nodes() {
            self.nodes.right_expectation(mu, sigma, cutoff, g)
        } else {
            LogNormal::new(mu, sigma).right_integral(&self.integrator, self.z_max, cutoff, g)
        }
    }

    /// `E[g(S)·1{S < cutoff}]`.
    pub fn left_expectation<G>(&self, mu: f64, sigma: f64, cutoff: f64, g: G) -> Result<f64>
    where
        G: Fn(f64) -> Result<f64>,
    {
        if self.uses_nodes() {
            self.nodes.left_expectation(mu, sigma, cutoff, g)
        } else {
            LogNormal::new(mu, sigma).left_integral(&self.integrator, self.z_max, cutoff, g)
        }
    }

    /// `E[g(S)·1{lower < S < upper}]`.
    pub fn between_expectation<G>(
        &self,
        mu: f64,
        sigma: f64,
        lower: f64,
        upper: f64,
        g: G,
    ) -> Result<f64>
    where
        G: Fn(f64) -> Result<f64>,
    {
        if !(lower < upper) {
            return Ok(0.0);
        }
        if self.uses_nodes() {
            let below_upper = self.nodes.left_expectation(mu, sigma, upper, &g)?;
            let below_lower = self.nodes.left_expectation(mu, sigma, lower, &g)?;
            Ok(below_upper - below_lower)
        } else {
            LogNormal::new(mu, sigma).between(&self.integrator, self.z_max, lower, upper, g)
        }
    }
}
