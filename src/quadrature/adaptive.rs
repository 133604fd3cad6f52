use std::cell::Cell;
use std::f64::consts::PI;

use crate::calibration::config::QuadratureConfig;
use crate::error::{PricingError, Result};

/// Order of the Gauss-Legendre panel rule.
const PANEL_ORDER: usize = 10;

fn legendre_polynomial_and_derivative(n: usize, x: f64) -> (f64, f64) {
    let mut p_nm2 = 1.0;
    let mut p_nm1 = x;
    for k in 2..=n {
        let kf = k as f64;
        let p_n = ((2.0 * kf - 1.0) * x * p_nm1 - (kf - 1.0) * p_nm2) / kf;
        p_nm2 = p_nm1;
        p_nm1 = p_n;
    }
    let dp_n = (n as f64) * (x * p_nm1 - p_nm2) / (x * x - 1.0);
    (p_nm1, dp_n)
}

/// Gauss-Legendre nodes and weights on `[-1, 1]`.
pub fn gauss_legendre_nodes_weights(n: usize) -> Result<Vec<(f64, f64)>> {
    if n < 2 {
        return Err(PricingError::input("Gauss-Legendre rule needs at least 2 nodes"));
    }

    let mut rule = vec![(0.0_f64, 0.0_f64); n];
    let nf = n as f64;
    for i in 0..n.div_ceil(2) {
        let mut z = (PI * (i as f64 + 0.75) / (nf + 0.5)).cos();
        for _ in 0..80 {
            let (p, dp) = legendre_polynomial_and_derivative(n, z);
            let dz = -p / dp;
            z += dz;
            if dz.abs() < 1e-15 {
                break;
            }
        }
        let (_, dp) = legendre_polynomial_and_derivative(n, z);
        let w = 2.0 / ((1.0 - z * z) * dp * dp);
        rule[i] = (-z, w);
        rule[n - 1 - i] = (z, w);
    }
    Ok(rule)
}

/// Adaptive Gauss-Legendre integration by panel bisection.
///
/// A panel is accepted once the two half-panel estimates agree with the
/// whole-panel estimate to within its share of the absolute tolerance, or
/// within the relative tolerance. Depth and evaluation count are capped.
#[derive(Debug, Clone)]
pub struct AdaptiveIntegrator {
    rule: Vec<(f64, f64)>,
    abs_tol: f64,
    rel_tol: f64,
    max_depth: usize,
    max_evaluations: usize,
}

impl AdaptiveIntegrator {
    pub fn from_config(config: &QuadratureConfig) -> Result<Self> {
        Ok(Self {
            rule: gauss_legendre_nodes_weights(PANEL_ORDER)?,
            abs_tol: config.abs_tol,
            rel_tol: config.rel_tol,
            max_depth: config.max_depth,
            max_evaluations: config.max_evaluations,
        })
    }

    pub fn integrate<F>(&self, f: F, a: f64, b: f64) -> Result<f64>
    where
        F: Fn(f64) -> Result<f64>,
    {
        if !(a.is_finite() && b.is_finite()) {
            return Err(PricingError::input(format!(
                "integration limits must be finite, got [{a}, {b}]"
            )));
        }
        if a == b {
            return Ok(0.0);
        }
        if a > b {
            return Ok(-self.integrate(f, b, a)?);
        }

        let evaluations = Cell::new(0usize);
        let whole = self.panel(&f, a, b, &evaluations)?;
        self.refine(&f, a, b, whole, b - a, 0, &evaluations)
    }

    #[allow(clippy::too_many_arguments)]
    fn refine<F>(
        &self,
        f: &F,
        a: f64,
        b: f64,
        whole: f64,
        total_width: f64,
        depth: usize,
        evaluations: &Cell<usize>,
    ) -> Result<f64>
    where
        F: Fn(f64) -> Result<f64>,
    {
        let mid = 0.5 * (a + b);
        let left = self.panel(f, a, mid, evaluations)?;
        let right = self.panel(f, mid, b, evaluations)?;
        let estimate = left + right;

        let local_tol = self.abs_tol * (b - a) / total_width;
        let error = (estimate - whole).abs();
        if error <= local_tol || error <= self.rel_tol * estimate.abs() || depth >= self.max_depth
        {
            return Ok(estimate);
        }

        Ok(self.refine(f, a, mid, left, total_width, depth + 1, evaluations)?
            + self.refine(f, mid, b, right, total_width, depth + 1, evaluations)?)
    }

    fn panel<F>(&self, f: &F, a: f64, b: f64, evaluations: &Cell<usize>) -> Result<f64>
    where
        F: Fn(f64) -> Result<f64>,
    {
        let used = evaluations.get() + self.rule.len();
        if used > self.max_evaluations {
            return Err(PricingError::numerical(format!(
                "adaptive quadrature exceeded {} evaluations on [{a}, {b}]",
                self.max_evaluations
            )));
        }
        evaluations.set(used);

        let c1 = 0.5 * (b - a);
        let c2 = 0.5 * (b + a);
        let mut sum = 0.0;
        for &(x, w) in &self.rule {
            sum += w * f(c1 * x + c2)?;
        }
        Ok(c1 * sum)
    }
}

/// Log-normal variable `S = e^{mu + sigma·Z}` integrated in the `Z` coordinate.
///
/// All integrals are expectations `E[g(S)·1{S in region}]`, taken over the
/// truncated range `Z in [-z_max, z_max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogNormal {
    pub mu: f64,
    pub sigma: f64,
}

impl LogNormal {
    pub fn new(mu: f64, sigma: f64) -> Self {
        Self { mu, sigma }
    }

    /// Standardized coordinate of level `x`; non-positive levels map to `-inf`.
    pub fn z_of(&self, x: f64) -> f64 {
        if x <= 0.0 {
            f64::NEG_INFINITY
        } else if x.is_infinite() {
            f64::INFINITY
        } else {
            (x.ln() - self.mu) / self.sigma
        }
    }

    pub fn integral<G>(&self, integrator: &AdaptiveIntegrator, z_max: f64, g: G) -> Result<f64>
    where
        G: Fn(f64) -> Result<f64>,
    {
        self.z_integral(integrator, -z_max, z_max, z_max, &g)
    }

    /// `E[g(S)·1{S > cutoff}]`.
    pub fn right_integral<G>(
        &self,
        integrator: &AdaptiveIntegrator,
        z_max: f64,
        cutoff: f64,
        g: G,
    ) -> Result<f64>
    where
        G: Fn(f64) -> Result<f64>,
    {
        self.z_integral(integrator, self.z_of(cutoff), f64::INFINITY, z_max, &g)
    }

    /// `E[g(S)·1{S < cutoff}]`.
    pub fn left_integral<G>(
        &self,
        integrator: &AdaptiveIntegrator,
        z_max: f64,
        cutoff: f64,
        g: G,
    ) -> Result<f64>
    where
        G: Fn(f64) -> Result<f64>,
    {
        self.z_integral(integrator, f64::NEG_INFINITY, self.z_of(cutoff), z_max, &g)
    }

    /// `E[g(S)·1{lower < S < upper}]`.
    pub fn between<G>(
        &self,
        integrator: &AdaptiveIntegrator,
        z_max: f64,
        lower: f64,
        upper: f64,
        g: G,
    ) -> Result<f64>
    where
        G: Fn(f64) -> Result<f64>,
    {
        self.z_integral(integrator, self.z_of(lower), self.z_of(upper), z_max, &g)
    }

    fn z_integral<G>(
        &self,
        integrator: &AdaptiveIntegrator,
        z_lo: f64,
        z_hi: f64,
        z_max: f64,
        g: &G,
    ) -> Result<f64>
    where
        G: Fn(f64) -> Result<f64>,
    {
        let lo = z_lo.max(-z_max);
        let hi = z_hi.min(z_max);
        if !(lo < hi) {
            return Ok(0.0);
        }
        let (mu, sigma) = (self.mu, self.sigma);
        integrator.integrate(
            |z| Ok(g((mu + sigma * z).exp())? * standard_normal_pdf(z)),
            lo,
            hi,
        )
    }
}

pub fn standard_normal_pdf(z: f64) -> f64 {
    (-0.5 * z * z).exp() / (2.0 * PI).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn integrator() -> AdaptiveIntegrator {
        AdaptiveIntegrator::from_config(&QuadratureConfig::default()).unwrap()
    }

    #[test]
    fn legendre_rule_integrates_polynomials() {
        let rule = gauss_legendre_nodes_weights(PANEL_ORDER).unwrap();
        let weight_sum: f64 = rule.iter().map(|&(_, w)| w).sum();
        assert!((weight_sum - 2.0).abs() < 1e-13);
        let x18: f64 = rule.iter().map(|&(x, w)| w * x.powi(18)).sum();
        assert!((x18 - 2.0 / 19.0).abs() < 1e-13);
        assert!(rule.windows(2).all(|p| p[0].0 < p[1].0));
    }

    #[test]
    fn integrates_oscillating_function() {
        let value = integrator().integrate(|x| Ok(x.sin()), 0.0, PI).unwrap();
        assert!((value - 2.0).abs() < 1e-12);
        let reversed = integrator().integrate(|x| Ok(x.sin()), PI, 0.0).unwrap();
        assert!((reversed + 2.0).abs() < 1e-12);
    }

    #[test]
    fn handles_kinked_integrand() {
        let value = integrator()
            .integrate(|x: f64| Ok((x - 0.3).abs()), -1.0, 1.0)
            .unwrap();
        assert!((value - 1.09).abs() < 1e-10);
    }

    #[test]
    fn budget_exhaustion_is_a_numerical_failure() {
        let config = QuadratureConfig {
            max_evaluations: 25,
            ..QuadratureConfig::default()
        };
        let tight = AdaptiveIntegrator::from_config(&config).unwrap();
        let err = tight
            .integrate(|x: f64| Ok((50.0 * x).sin().abs()), 0.0, 10.0)
            .unwrap_err();
        assert!(err.is_numerical());
    }

    #[test]
    fn lognormal_moments_and_tails() {
        let dist = LogNormal::new(-4.5, 0.8);
        let z_max = QuadratureConfig::default().z_max;
        let integ = integrator();

        let mass = dist.integral(&integ, z_max, |_| Ok(1.0)).unwrap();
        assert!((mass - 1.0).abs() < 1e-12);

        let mean = dist.integral(&integ, z_max, |s| Ok(s)).unwrap();
        assert!((mean / (-4.5f64 + 0.32).exp() - 1.0).abs() < 1e-10);

        let k = 0.012;
        let right = dist.right_integral(&integ, z_max, k, |s| Ok(s)).unwrap();
        let left = dist.left_integral(&integ, z_max, k, |s| Ok(s)).unwrap();
        assert!((right + left - mean).abs() < 1e-12);

        let middle = dist.between(&integ, z_max, 0.005, 0.02, |_| Ok(1.0)).unwrap();
        let exact = crate::models::black::norm_cdf(dist.z_of(0.02))
            - crate::models::black::norm_cdf(dist.z_of(0.005));
        assert!((middle - exact).abs() < 1e-12);
    }

    #[test]
    fn empty_regions_integrate_to_zero() {
        let dist = LogNormal::new(0.0, 0.5);
        let integ = integrator();
        assert_eq!(dist.between(&integ, 8.5, 2.0, 1.0, |_| Ok(1.0)).unwrap(), 0.0);
        assert_eq!(dist.right_integral(&integ, 8.5, 1.0e12, |_| Ok(1.0)).unwrap(), 0.0);
        let all = dist.right_integral(&integ, 8.5, 0.0, |_| Ok(1.0)).unwrap();
        assert!((all - 1.0).abs() < 1e-12);
    }
}
