//! One-dimensional root finding.
//!
//! [`Solver`] wraps Brent's method from the `roots` crate with bracket expansion
//! and explicit failure. Objectives may themselves fail (nested calibrations);
//! the first inner error aborts the search and is returned unchanged.

use std::cell::{Cell, RefCell};

use roots::{find_root_brent, Convergency};

use crate::calibration::config::SolverConfig;
use crate::error::{PricingError, Result};

/// Admissible range for the unknown. Bracket expansion never leaves it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    pub min: f64,
    pub max: f64,
}

impl Domain {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub const fn unbounded() -> Self {
        Self::new(f64::NEG_INFINITY, f64::INFINITY)
    }

    /// `[0, +inf)`: hazard rates, spreads, volatilities.
    pub const fn non_negative() -> Self {
        Self::new(0.0, f64::INFINITY)
    }

    fn contains(&self, x: f64) -> bool {
        x >= self.min && x <= self.max
    }
}

/// Convergence test handed to Brent.
struct Tolerance<'a> {
    tol_x: f64,
    tol_f: f64,
    max_iterations: usize,
    aborted: &'a Cell<bool>,
}

impl Convergency<f64> for Tolerance<'_> {
    fn is_root_found(&mut self, y: f64) -> bool {
        y.abs() <= self.tol_f
    }

    fn is_converged(&mut self, x1: f64, x2: f64) -> bool {
        self.aborted.get() || x1 == x2 || (x1 - x2).abs() <= self.tol_x * x1.abs().max(x2.abs())
    }

    fn is_iteration_limit_reached(&mut self, iter: usize) -> bool {
        self.aborted.get() || iter >= self.max_iterations
    }
}

#[derive(Debug, Clone, Default)]
pub struct Solver {
    config: SolverConfig,
}

impl Solver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solve `f(x) == target` on a bracket that must already enclose a sign change.
    pub fn solve<F>(&self, f: F, target: f64, lower: f64, upper: f64) -> Result<f64>
    where
        F: Fn(f64) -> Result<f64>,
    {
        let g_lo = residual(&f, target, lower)?;
        let g_hi = residual(&f, target, upper)?;
        self.solve_bracketed(&f, target, (lower, g_lo), (upper, g_hi))
    }

    /// Solve `f(x) == target` starting from `[lower, upper]` and widening the
    /// bracket geometrically inside `domain` until the residual changes sign.
    pub fn solve_expanding<F>(
        &self,
        f: F,
        target: f64,
        lower: f64,
        upper: f64,
        domain: Domain,
    ) -> Result<f64>
    where
        F: Fn(f64) -> Result<f64>,
    {
        let (lo, hi) = self.bracket(&f, target, lower, upper, domain)?;
        self.solve_bracketed(&f, target, lo, hi)
    }

    /// Expand `[lower, upper]` until `f - target` changes sign. Returns both
    /// ends with their residuals.
    pub fn bracket<F>(
        &self,
        f: &F,
        target: f64,
        lower: f64,
        upper: f64,
        domain: Domain,
    ) -> Result<((f64, f64), (f64, f64))>
    where
        F: Fn(f64) -> Result<f64>,
    {
        let mut lo = lower.max(domain.min);
        let mut hi = upper.min(domain.max);
        if !(lo < hi) || !domain.contains(lo) || !domain.contains(hi) {
            return Err(PricingError::input(format!(
                "invalid initial bracket [{lower}, {upper}] for domain [{}, {}]",
                domain.min, domain.max
            )));
        }

        let growth = self.config.bracket_growth;
        let mut g_lo = residual(f, target, lo)?;
        let mut g_hi = residual(f, target, hi)?;

        for _ in 0..self.config.max_expansions {
            if changes_sign(g_lo, g_hi) {
                return Ok(((lo, g_lo), (hi, g_hi)));
            }

            let lower_pinned = lo <= domain.min;
            let upper_pinned = hi >= domain.max;
            if lower_pinned && upper_pinned {
                break;
            }

            let expand_lower = !lower_pinned && (upper_pinned || g_lo.abs() < g_hi.abs());
            let width = hi - lo;
            if expand_lower {
                lo = if domain.min.is_finite() && lo - growth * width < domain.min {
                    domain.min + (lo - domain.min) / growth.max(2.0)
                } else {
                    lo - growth * width
                };
                if (lo - domain.min).abs() <= f64::MIN_POSITIVE {
                    lo = domain.min;
                }
                g_lo = residual(f, target, lo)?;
            } else {
                hi = if domain.max.is_finite() && hi + growth * width > domain.max {
                    domain.max - (domain.max - hi) / growth.max(2.0)
                } else {
                    hi + growth * width
                };
                g_hi = residual(f, target, hi)?;
            }
        }

        if changes_sign(g_lo, g_hi) {
            return Ok(((lo, g_lo), (hi, g_hi)));
        }

        Err(PricingError::numerical(format!(
            "no sign change for target {target:e} within [{lo:e}, {hi:e}] \
             (residuals {g_lo:e}, {g_hi:e})"
        )))
    }

    fn solve_bracketed<F>(
        &self,
        f: &F,
        target: f64,
        (lo, g_lo): (f64, f64),
        (hi, g_hi): (f64, f64),
    ) -> Result<f64>
    where
        F: Fn(f64) -> Result<f64>,
    {
        if g_lo == 0.0 {
            return Ok(lo);
        }
        if g_hi == 0.0 {
            return Ok(hi);
        }
        if !changes_sign(g_lo, g_hi) {
            return Err(PricingError::numerical(format!(
                "bracket [{lo:e}, {hi:e}] does not enclose target {target:e}"
            )));
        }

        let failure: RefCell<Option<PricingError>> = RefCell::new(None);
        let aborted = Cell::new(false);
        let objective = |x: f64| -> f64 {
            if aborted.get() {
                return f64::NAN;
            }
            match f(x) {
                Ok(y) => y - target,
                Err(e) => {
                    aborted.set(true);
                    *failure.borrow_mut() = Some(e);
                    f64::NAN
                }
            }
        };

        let mut tol = Tolerance {
            tol_x: self.config.tol_x,
            tol_f: self.config.tol_f,
            max_iterations: self.config.max_iterations,
            aborted: &aborted,
        };
        let outcome = find_root_brent(lo, hi, &objective, &mut tol);

        if let Some(e) = failure.into_inner() {
            return Err(e);
        }
        match outcome {
            Ok(root) if root.is_finite() => Ok(root),
            Ok(root) => Err(PricingError::numerical(format!(
                "Brent returned non-finite root {root}"
            ))),
            Err(e) => Err(PricingError::numerical(format!(
                "Brent failed on [{lo:e}, {hi:e}] for target {target:e}: {e:?}"
            ))),
        }
    }
}

fn residual<F>(f: &F, target: f64, x: f64) -> Result<f64>
where
    F: Fn(f64) -> Result<f64>,
{
    let y = f(x)? - target;
    if y.is_nan() {
        return Err(PricingError::numerical(format!(
            "objective is NaN at x = {x:e}"
        )));
    }
    Ok(y)
}

fn changes_sign(a: f64, b: f64) -> bool {
    a == 0.0 || b == 0.0 || (a < 0.0) != (b < 0.0)
}
