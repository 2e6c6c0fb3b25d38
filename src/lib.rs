//! OpenFerric FDM provides the spatial half of a finite-difference pricer: grids, index
//! layout and the sparse generators of the usual equity and rates models.
//!
//! Multi-dimensional grids are tensor products of 1-D meshers. Operators act on the
//! flattened grid vector and are split by direction so that ADI-type time steppers
//! (Douglas, Craig-Sneyd, Hundsdorfer-Verwer) can apply and invert them axis by axis.
//!
//! References used across modules include:
//! - Tavella and Randall, *Pricing Financial Instruments: The Finite Difference Method*.
//! - in 't Hout and Foulon (2010) for ADI schemes and mesh construction under Heston.
//! - Brigo and Mercurio, *Interest Rate Models* (2nd ed.), Ch. 3 for Hull-White.
//!
//! Numerical considerations:
//! - Interior stencils are second-order on non-uniform grids; edges fall back to
//!   one-sided first derivatives and a vanishing second derivative.
//! - Concentrating meshers solve an ODE for the node map; tolerances are exposed.
//! - Heston variance grids use non-central chi-square quantiles and fall back to a
//!   uniform grid of four stationary standard deviations around `v0` and `theta`
//!   when the inversion does not converge.
//!
//! # Feature Flags
//! - `parallel`: enables Rayon-powered operator application.
//!
//! # Quick Start
//! Assemble the Black-Scholes generator on a log-spot grid:
//! ```rust
//! use std::sync::Arc;
//!
//! use openferric_fdm::prelude::*;
//!
//! let process = GeneralizedBlackScholesProcess::new(
//!     100.0,
//!     Arc::new(FlatForward::new(0.01)),
//!     Arc::new(FlatForward::new(0.05)),
//!     Arc::new(BlackConstantVol::new(0.2)),
//! );
//! let params = FdmBlackScholesMesherParams::default();
//! let mesher = FdmBlackScholesMesher::new(101, &process, 1.0, 100.0, &params).unwrap();
//! let mesher = Arc::new(FdmMesherComposite::from_mesher(mesher).unwrap());
//!
//! let mut op = FdmBlackScholesOp::new(mesher, &process, 100.0, false, None, 0, None).unwrap();
//! op.set_time(0.0, 0.01).unwrap();
//! let discounted = op.apply(&vec![1.0; 101]).unwrap();
//! assert!((discounted[50] + 0.05).abs() < 1.0e-10);
//! ```
//!
//! Build a Heston grid and operator:
//! ```rust
//! use std::sync::Arc;
//!
//! use openferric_fdm::prelude::*;
//!
//! let process = HestonProcess::new(
//!     Arc::new(FlatForward::new(0.05)),
//!     Arc::new(FlatForward::new(0.0)),
//!     100.0, 0.04, 1.5, 0.04, 0.3, -0.7,
//! )
//! .unwrap();
//! let v = FdmHestonVarianceMesher::new(
//!     21, &process, 1.0, &FdmHestonVarianceMesherParams::default(),
//! )
//! .unwrap();
//! let x = Uniform1dMesher::new(3.0, 6.2, 41).unwrap();
//! let x: Arc<dyn Mesher1d> = Arc::new(x);
//! let v: Arc<dyn Mesher1d> = Arc::new(v);
//! let mesher = Arc::new(FdmMesherComposite::new(vec![x, v]).unwrap());
//!
//! let op = FdmHestonOp::new(mesher, &process, None, None, 1.0).unwrap();
//! assert_eq!(op.size(), 2);
//! ```

pub mod core;
pub mod fdm;
pub mod market;
pub mod math;
pub mod models;

/// Common imports for ergonomic usage.
pub mod prelude {
    pub use crate::core::FdmError;
    pub use crate::fdm::layout::{FdmLinearOpIterator, FdmLinearOpLayout};
    pub use crate::fdm::meshers::{
        Concentrating1dMesher, ConcentrationPoint, Fdm1dMesher, FdmBlackScholesMesher,
        FdmBlackScholesMesherParams, FdmHestonVarianceMesher, FdmHestonVarianceMesherParams,
        FdmMesherComposite, FdmShortRateMesher, FdmShortRateMesherParams, Mesher1d,
        Predefined1dMesher, Uniform1dMesher,
    };
    pub use crate::fdm::operators::{
        FdmBlackScholesOp, FdmHestonOp, FdmHullWhiteOp, FdmLinearOp, FdmLinearOpComposite,
        FirstDerivativeOp, NinePointLinearOp, SecondDerivativeOp, SecondOrderMixedDerivativeOp,
        TripleBandLinearOp,
    };
    pub use crate::market::{
        BlackConstantVol, BlackVarianceCurve, BlackVolTermStructure, DividendEvent,
        DividendSchedule, DupireLocalVol, FlatForward, LocalConstantVol, LocalVolTermStructure,
        YieldCurve, YieldTermStructure,
    };
    pub use crate::models::{
        FdmQuantoHelper, GeneralizedBlackScholesProcess, HestonProcess, HullWhite,
    };
}
