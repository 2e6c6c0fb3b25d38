//! Stochastic processes feeding the finite-difference meshers and operators.
//!
//! Covers generalized Black-Scholes (optionally local vol), Heston and the
//! one-factor Hull-White short-rate model, plus the quanto drift helper.

pub mod black_scholes;
pub mod heston;
pub mod quanto;
pub mod short_rate;

pub use black_scholes::GeneralizedBlackScholesProcess;
pub use heston::HestonProcess;
pub use quanto::{FdmQuantoHelper, QuantoTermStructure};
pub use short_rate::HullWhite;
