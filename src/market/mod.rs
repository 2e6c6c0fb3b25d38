//! Market term structures consumed by meshers and model operators.
//!
//! Collaborators are shared as `Arc<dyn ...>` trait objects so a single curve
//! can back several processes and operators.

pub mod dividends;
pub mod volatility;
pub mod yield_curve;

pub use dividends::{DividendEvent, DividendKind, DividendSchedule};
pub use volatility::{
    BlackConstantVol, BlackVarianceCurve, BlackVolTermStructure, DupireLocalVol,
    LocalConstantVol, LocalVolTermStructure,
};
pub use yield_curve::{FlatForward, YieldCurve, YieldTermStructure};
