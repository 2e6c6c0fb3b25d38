//! Discount curves consumed by the model operators.
//!
//! Times are year fractions from the valuation date and all rates are
//! continuously compounded.

use std::fmt::Debug;

use crate::core::FdmError;

const INSTANTANEOUS_DT: f64 = 1.0e-4;

/// Discount-factor term structure.
pub trait YieldTermStructure: Debug + Send + Sync {
    /// Discount factor for maturity `t`.
    fn discount(&self, t: f64) -> f64;

    /// Continuously-compounded zero rate at `t`.
    fn zero_rate(&self, t: f64) -> f64 {
        if t <= 0.0 {
            return self.instantaneous_forward(0.0);
        }
        -self.discount(t).ln() / t
    }

    /// Continuously-compounded forward rate over `[t1, t2]`.
    ///
    /// Collapses to the instantaneous forward when the interval is degenerate.
    fn forward_rate(&self, t1: f64, t2: f64) -> f64 {
        if (t2 - t1).abs() < f64::EPSILON * t1.abs().max(1.0) {
            return self.instantaneous_forward(t1);
        }
        (self.discount(t1) / self.discount(t2)).ln() / (t2 - t1)
    }

    /// Instantaneous forward rate `f(0, t)`.
    fn instantaneous_forward(&self, t: f64) -> f64 {
        let t1 = (t - 0.5 * INSTANTANEOUS_DT).max(0.0);
        let t2 = t1 + INSTANTANEOUS_DT;
        (self.discount(t1) / self.discount(t2)).ln() / INSTANTANEOUS_DT
    }
}

/// Curve with a single constant continuously-compounded rate.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FlatForward {
    pub rate: f64,
}

impl FlatForward {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }
}

impl YieldTermStructure for FlatForward {
    #[inline]
    fn discount(&self, t: f64) -> f64 {
        (-self.rate * t.max(0.0)).exp()
    }

    #[inline]
    fn zero_rate(&self, _t: f64) -> f64 {
        self.rate
    }

    #[inline]
    fn forward_rate(&self, _t1: f64, _t2: f64) -> f64 {
        self.rate
    }

    #[inline]
    fn instantaneous_forward(&self, _t: f64) -> f64 {
        self.rate
    }
}

/// Discount-factor term structure keyed by maturity tenor in years.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct YieldCurve {
    /// Curve nodes as `(tenor, discount_factor)`.
    tenors: Vec<(f64, f64)>,
}

impl YieldCurve {
    /// Creates a curve from unsorted discount-factor nodes.
    pub fn new(mut tenors: Vec<(f64, f64)>) -> Result<Self, FdmError> {
        if tenors.is_empty() {
            return Err(FdmError::invalid("yield curve needs at least one node"));
        }
        if tenors
            .iter()
            .any(|(t, df)| !t.is_finite() || !df.is_finite() || *t <= 0.0 || *df <= 0.0)
        {
            return Err(FdmError::invalid(
                "yield curve nodes need positive tenors and discount factors",
            ));
        }
        tenors.sort_by(|a, b| a.0.total_cmp(&b.0));
        if tenors.windows(2).any(|w| w[1].0 <= w[0].0) {
            return Err(FdmError::invalid("yield curve tenors must be distinct"));
        }
        Ok(Self { tenors })
    }

    /// Builds a curve from continuously-compounded zero rates `(tenor, rate)`.
    pub fn from_zero_rates(rates: &[(f64, f64)]) -> Result<Self, FdmError> {
        Self::new(
            rates
                .iter()
                .map(|&(tenor, rate)| (tenor, (-rate * tenor).exp()))
                .collect(),
        )
    }

    pub fn tenors(&self) -> &[(f64, f64)] {
        &self.tenors
    }
}

impl YieldTermStructure for YieldCurve {
    /// Log-linear interpolation between nodes, flat zero rate beyond the last one.
    fn discount(&self, t: f64) -> f64 {
        if t <= 0.0 {
            return 1.0;
        }

        let first = self.tenors[0];
        if t <= first.0 {
            return log_linear_df(0.0, 1.0, first.0, first.1, t);
        }

        for window in self.tenors.windows(2) {
            let left = window[0];
            let right = window[1];
            if t <= right.0 {
                return log_linear_df(left.0, left.1, right.0, right.1, t);
            }
        }

        let (tn, dfn) = self.tenors[self.tenors.len() - 1];
        let z = -dfn.ln() / tn;
        (-z * t).exp()
    }
}

#[inline]
fn log_linear_df(t0: f64, df0: f64, t1: f64, df1: f64, t: f64) -> f64 {
    let w = (t - t0) / (t1 - t0);
    (df0.ln() + w * (df1.ln() - df0.ln())).exp()
}
