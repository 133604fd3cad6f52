use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Tolerances and budgets for the scalar root finder.
#[derive(Debug, Clone, Deserialize)]
pub struct SolverConfig {
    /// Relative step tolerance: iterations stop once `|x1 - x2| <= tol_x * max(|x1|, |x2|)`.
    #[serde(default = "default_tol_x")]
    pub tol_x: f64,
    /// Absolute residual tolerance on `f(x) - target`.
    #[serde(default = "default_tol_f")]
    pub tol_f: f64,
    /// Hard cap on Brent iterations per solve.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Geometric growth applied to the bracket on each expansion.
    #[serde(default = "default_bracket_growth")]
    pub bracket_growth: f64,
    /// Maximum number of bracket expansions before giving up.
    #[serde(default = "default_max_expansions")]
    pub max_expansions: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tol_x: default_tol_x(),
            tol_f: default_tol_f(),
            max_iterations: default_max_iterations(),
            bracket_growth: default_bracket_growth(),
            max_expansions: default_max_expansions(),
        }
    }
}

/// Log-normal quadrature settings.
#[derive(Debug, Clone, Deserialize)]
pub struct QuadratureConfig {
    /// Gauss-Hermite node count. `0` selects the adaptive integrator.
    #[serde(default)]
    pub node_count: usize,
    #[serde(default = "default_abs_tol")]
    pub abs_tol: f64,
    #[serde(default = "default_rel_tol")]
    pub rel_tol: f64,
    /// Maximum bisection depth of an adaptive panel.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Standard-normal range `[-z_max, z_max]` covered by the adaptive integrator.
    #[serde(default = "default_z_max")]
    pub z_max: f64,
    /// Integrand evaluations allowed per adaptive integral.
    #[serde(default = "default_max_evaluations")]
    pub max_evaluations: usize,
}

impl Default for QuadratureConfig {
    fn default() -> Self {
        Self {
            node_count: 0,
            abs_tol: default_abs_tol(),
            rel_tol: default_rel_tol(),
            max_depth: default_max_depth(),
            z_max: default_z_max(),
            max_evaluations: default_max_evaluations(),
        }
    }
}

/// Implied volatility inversion settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ImpliedVolConfig {
    /// First upper bracket tried for the volatility.
    #[serde(default = "default_initial_upper")]
    pub initial_upper: f64,
    /// Multiplier applied to the upper bracket until the target is enclosed.
    #[serde(default = "default_vol_growth")]
    pub growth: f64,
    /// Largest volatility the inversion will consider.
    #[serde(default = "default_max_volatility")]
    pub max_volatility: f64,
    /// Prices within this distance of intrinsic imply zero volatility.
    #[serde(default = "default_intrinsic_tolerance")]
    pub intrinsic_tolerance: f64,
    /// Cap on growth steps of the upper bracket.
    #[serde(default = "default_vol_expansions")]
    pub max_expansions: usize,
}

impl ImpliedVolConfig {
    /// Same settings with the bracket expressed in units scaled by `factor`,
    /// e.g. `sqrt(T)` to move from volatility to standard deviation.
    pub fn scaled_by(&self, factor: f64) -> Self {
        Self {
            initial_upper: self.initial_upper * factor,
            max_volatility: self.max_volatility * factor,
            ..self.clone()
        }
    }

    /// Upper brackets tried in turn: `initial_upper` grown by `growth` until
    /// it reaches `max_volatility`, with at most `max_expansions` steps.
    pub fn upper_brackets(&self) -> impl Iterator<Item = f64> {
        let cap = self.max_volatility;
        let growth = self.growth;
        std::iter::successors(Some(self.initial_upper.min(cap)), move |&upper| {
            (upper < cap).then(|| (upper * growth).min(cap))
        })
        .take(self.max_expansions.saturating_add(1))
    }
}

impl Default for ImpliedVolConfig {
    fn default() -> Self {
        Self {
            initial_upper: default_initial_upper(),
            growth: default_vol_growth(),
            max_volatility: default_max_volatility(),
            intrinsic_tolerance: default_intrinsic_tolerance(),
            max_expansions: default_vol_expansions(),
        }
    }
}

/// Main configuration struct for valuation
#[derive(Debug, Clone, Deserialize)]
pub struct ValuationConfig {
    #[serde(default)]
    pub solver: SolverConfig,

    #[serde(default)]
    pub quadrature: QuadratureConfig,

    #[serde(default)]
    pub implied_vol: ImpliedVolConfig,

    /// Residual above which calibration emits a precision warning.
    #[serde(default = "default_precision_tolerance")]
    pub precision_tolerance: f64,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            solver: SolverConfig::default(),
            quadrature: QuadratureConfig::default(),
            implied_vol: ImpliedVolConfig::default(),
            precision_tolerance: default_precision_tolerance(),
        }
    }
}

impl ValuationConfig {
    /// Tight tolerances on the adaptive integrator
    pub fn production() -> Self {
        Self::default()
    }

    /// 64-node Gauss-Hermite quadrature and looser solver tolerances
    pub fn fast() -> Self {
        Self {
            solver: SolverConfig {
                tol_x: 1e-12,
                tol_f: 1e-15,
                max_iterations: 1_000,
                ..SolverConfig::default()
            },
            quadrature: QuadratureConfig {
                node_count: 64,
                ..QuadratureConfig::default()
            },
            implied_vol: ImpliedVolConfig::default(),
            precision_tolerance: 1e-10,
        }
    }

    /// Adaptive integration with deeper panels and a wider tail
    pub fn research() -> Self {
        Self {
            solver: SolverConfig {
                tol_x: 1e-15,
                tol_f: 1e-17,
                max_iterations: 10_000,
                max_expansions: 80,
                ..SolverConfig::default()
            },
            quadrature: QuadratureConfig {
                node_count: 0,
                abs_tol: 1e-14,
                rel_tol: 1e-12,
                max_depth: 24,
                z_max: 9.5,
                max_evaluations: 400_000,
            },
            implied_vol: ImpliedVolConfig {
                max_volatility: 32.0,
                ..ImpliedVolConfig::default()
            },
            precision_tolerance: 1e-12,
        }
    }

    /// Minimal configuration for quick validation and debugging
    pub fn minimal() -> Self {
        Self {
            solver: SolverConfig {
                tol_x: 1e-9,
                tol_f: 1e-10,
                max_iterations: 200,
                max_expansions: 30,
                ..SolverConfig::default()
            },
            quadrature: QuadratureConfig {
                node_count: 24,
                ..QuadratureConfig::default()
            },
            implied_vol: ImpliedVolConfig {
                max_volatility: 8.0,
                intrinsic_tolerance: 1e-10,
                ..ImpliedVolConfig::default()
            },
            precision_tolerance: 1e-8,
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source).context("failed to parse valuation config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml_str(&source)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.solver.tol_x > 0.0 && self.solver.tol_f > 0.0) {
            anyhow::bail!("solver tolerances must be positive");
        }
        if self.solver.max_iterations == 0 {
            anyhow::bail!("solver.max_iterations must be at least 1");
        }
        if !(self.solver.bracket_growth > 1.0) {
            anyhow::bail!(
                "solver.bracket_growth must exceed 1, got {}",
                self.solver.bracket_growth
            );
        }
        if !(self.quadrature.z_max > 0.0) {
            anyhow::bail!("quadrature.z_max must be positive");
        }
        if self.quadrature.node_count == 1 {
            anyhow::bail!("quadrature.node_count must be 0 (adaptive) or at least 2");
        }
        if !(self.implied_vol.growth > 1.0) {
            anyhow::bail!("implied_vol.growth must exceed 1");
        }
        if !(self.implied_vol.initial_upper > 0.0
            && self.implied_vol.max_volatility >= self.implied_vol.initial_upper)
        {
            anyhow::bail!("implied_vol bracket must satisfy 0 < initial_upper <= max_volatility");
        }
        Ok(())
    }
}

fn default_tol_x() -> f64 {
    1e-14
}

fn default_tol_f() -> f64 {
    1e-16
}

fn default_max_iterations() -> usize {
    10_000
}

fn default_bracket_growth() -> f64 {
    2.0
}

fn default_max_expansions() -> usize {
    60
}

fn default_abs_tol() -> f64 {
    1e-13
}

fn default_rel_tol() -> f64 {
    1e-11
}

fn default_max_depth() -> usize {
    18
}

fn default_z_max() -> f64 {
    8.5
}

fn default_max_evaluations() -> usize {
    200_000
}

fn default_initial_upper() -> f64 {
    0.5
}

fn default_vol_growth() -> f64 {
    2.0
}

fn default_max_volatility() -> f64 {
    16.0
}

fn default_vol_expansions() -> usize {
    64
}

fn default_intrinsic_tolerance() -> f64 {
    1e-12
}

fn default_precision_tolerance() -> f64 {
    1e-12
}
