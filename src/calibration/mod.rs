pub mod config;
pub mod expectation;
pub mod solver;

pub use config::{ImpliedVolConfig, QuadratureConfig, SolverConfig, ValuationConfig};
pub use expectation::{NonlinearLogNormal, Region};
pub use solver::{Domain, Solver};
