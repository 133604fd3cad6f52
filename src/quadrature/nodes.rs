use crate::error::{PricingError, Result};

/// π^(-1/4), the leading coefficient of the orthonormal Hermite recurrence.
const PIM4: f64 = 0.751_125_544_464_942_5;
const NEWTON_EPS: f64 = 3.0e-14;
const NEWTON_MAX_ITER: usize = 100;

/// Fixed quadrature nodes for expectations under the standard normal measure.
///
/// Each `(point, weight)` pair approximates `E[g(Z)] ≈ Σ wᵢ·g(zᵢ)`; points are
/// sorted ascending and weights sum to one. An empty table is valid and tells
/// callers to fall back to adaptive integration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuadratureNodes {
    nodes: Vec<(f64, f64)>,
}

impl QuadratureNodes {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Validate and wrap a caller-supplied table.
    pub fn new(nodes: Vec<(f64, f64)>) -> Result<Self> {
        if nodes.is_empty() {
            return Ok(Self::empty());
        }
        if nodes
            .iter()
            .any(|&(z, w)| !z.is_finite() || !w.is_finite() || w < 0.0)
        {
            return Err(PricingError::input(
                "quadrature nodes must have finite points and non-negative weights",
            ));
        }
        if nodes.windows(2).any(|pair| pair[0].0 >= pair[1].0) {
            return Err(PricingError::input(
                "quadrature points must be strictly ascending",
            ));
        }
        let total: f64 = nodes.iter().map(|&(_, w)| w).sum();
        if (total - 1.0).abs() > 1e-8 {
            return Err(PricingError::input(format!(
                "quadrature weights sum to {total}, expected 1"
            )));
        }
        Ok(Self { nodes })
    }

    /// Gauss-Hermite rule with `n` nodes, rescaled to the standard normal density.
    pub fn gauss_hermite(n: usize) -> Result<Self> {
        if n < 2 {
            return Err(PricingError::input(format!(
                "Gauss-Hermite rule needs at least 2 nodes, got {n}"
            )));
        }

        let mut x = vec![0.0_f64; n];
        let mut w = vec![0.0_f64; n];
        let nf = n as f64;
        let m = n.div_ceil(2);
        let mut z = 0.0_f64;

        for i in 0..m {
            z = match i {
                0 => (2.0 * nf + 1.0).sqrt() - 1.85575 * (2.0 * nf + 1.0).powf(-0.16667),
                1 => z - 1.14 * nf.powf(0.426) / z,
                2 => 1.86 * z - 0.86 * x[0],
                3 => 1.91 * z - 0.91 * x[1],
                _ => 2.0 * z - x[i - 2],
            };

            let mut pp = 0.0;
            let mut converged = false;
            for _ in 0..NEWTON_MAX_ITER {
                let (p1, p2) = hermite_orthonormal(n, z);
                pp = (2.0 * nf).sqrt() * p2;
                let z1 = z;
                z = z1 - p1 / pp;
                if (z - z1).abs() <= NEWTON_EPS {
                    converged = true;
                    break;
                }
            }
            if !converged {
                return Err(PricingError::numerical(format!(
                    "Gauss-Hermite root {i} of {n} did not converge"
                )));
            }

            x[i] = z;
            x[n - 1 - i] = -z;
            w[i] = 2.0 / (pp * pp);
            w[n - 1 - i] = w[i];
        }

        let norm = std::f64::consts::PI.sqrt();
        let mut nodes: Vec<(f64, f64)> = x
            .into_iter()
            .zip(w)
            .map(|(xi, wi)| (std::f64::consts::SQRT_2 * xi, wi / norm))
            .collect();
        nodes.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(Self { nodes })
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn as_slice(&self) -> &[(f64, f64)] {
        &self.nodes
    }

    /// `E[g(e^{mu + sigma·Z})]`.
    pub fn expectation<G>(&self, mu: f64, sigma: f64, g: G) -> Result<f64>
    where
        G: Fn(f64) -> Result<f64>,
    {
        self.nodes.iter().try_fold(0.0, |acc, &(z, w)| -> Result<f64> {
            Ok(acc + w * g((mu + sigma * z).exp())?)
        })
    }

    /// `E[g(S)·1{S >= cutoff}]` over the nodes past the log cutoff.
    pub fn right_expectation<G>(&self, mu: f64, sigma: f64, cutoff: f64, g: G) -> Result<f64>
    where
        G: Fn(f64) -> Result<f64>,
    {
        let start = self.first_at_or_above(mu, sigma, cutoff);
        self.nodes[start..].iter().try_fold(0.0, |acc, &(z, w)| -> Result<f64> {
            Ok(acc + w * g((mu + sigma * z).exp())?)
        })
    }

    /// `E[g(S)·1{S < cutoff}]` over the nodes before the log cutoff.
    pub fn left_expectation<G>(&self, mu: f64, sigma: f64, cutoff: f64, g: G) -> Result<f64>
    where
        G: Fn(f64) -> Result<f64>,
    {
        let end = self.first_at_or_above(mu, sigma, cutoff);
        self.nodes[..end].iter().try_fold(0.0, |acc, &(z, w)| -> Result<f64> {
            Ok(acc + w * g((mu + sigma * z).exp())?)
        })
    }

    /// `Σ wᵢ·(A(Sᵢ) − A(K))·(Sᵢ − premium)` over nodes with `Sᵢ > K`.
    pub fn payer_correlation_term<A>(
        &self,
        mu: f64,
        sigma: f64,
        strike: f64,
        premium: f64,
        annuity: A,
    ) -> Result<f64>
    where
        A: Fn(f64) -> Result<f64>,
    {
        let start = self.first_above(mu, sigma, strike);
        if start == self.nodes.len() {
            return Ok(0.0);
        }
        let strike_annuity = annuity(strike)?;
        self.nodes[start..].iter().try_fold(0.0, |acc, &(z, w)| -> Result<f64> {
            let s = (mu + sigma * z).exp();
            Ok(acc + w * (annuity(s)? - strike_annuity) * (s - premium))
        })
    }

    /// `Σ wᵢ·(A(Sᵢ) − A(K))·(Sᵢ − premium)` over nodes with `Sᵢ < K`.
    pub fn receiver_correlation_term<A>(
        &self,
        mu: f64,
        sigma: f64,
        strike: f64,
        premium: f64,
        annuity: A,
    ) -> Result<f64>
    where
        A: Fn(f64) -> Result<f64>,
    {
        let end = self.first_at_or_above(mu, sigma, strike);
        if end == 0 {
            return Ok(0.0);
        }
        let strike_annuity = annuity(strike)?;
        self.nodes[..end].iter().try_fold(0.0, |acc, &(z, w)| -> Result<f64> {
            let s = (mu + sigma * z).exp();
            Ok(acc + w * (annuity(s)? - strike_annuity) * (s - premium))
        })
    }

    fn log_cutoff(mu: f64, sigma: f64, level: f64) -> f64 {
        if level <= 0.0 {
            f64::NEG_INFINITY
        } else {
            (level.ln() - mu) / sigma
        }
    }

    fn first_above(&self, mu: f64, sigma: f64, level: f64) -> usize {
        let d = Self::log_cutoff(mu, sigma, level);
        self.nodes
            .iter()
            .position(|&(z, _)| z > d)
            .unwrap_or(self.nodes.len())
    }

    fn first_at_or_above(&self, mu: f64, sigma: f64, level: f64) -> usize {
        let d = Self::log_cutoff(mu, sigma, level);
        self.nodes
            .iter()
            .position(|&(z, _)| z >= d)
            .unwrap_or(self.nodes.len())
    }
}

/// Orthonormal Hermite polynomials `(p_n(z), p_{n-1}(z))`.
fn hermite_orthonormal(n: usize, z: f64) -> (f64, f64) {
    let mut p1 = PIM4;
    let mut p2 = 0.0;
    for j in 0..n {
        let p3 = p2;
        p2 = p1;
        let jf = j as f64;
        p1 = z * (2.0 / (jf + 1.0)).sqrt() * p2 - (jf / (jf + 1.0)).sqrt() * p3;
    }
    (p1, p2)
}
