//! Market-side collaborators of the option models: curves, the credit
//! pricer contract and its index CDS implementation, forward snapshots, and
//! the context handed to the model factory.

pub mod context;
pub mod curves;
pub mod forwards;
pub mod pricer;

pub use context::PricerContext;
pub use curves::{DiscountCurve, FlatDiscountCurve, FlatSurvivalCurve, SurvivalCurve};
pub use forwards::{FlatForwardProvider, ForwardProvider, Forwards};
pub use pricer::{hazard_for_spread, CdsTerms, CreditPricer, IndexCdsPricer, PricerSource};
