//! One-factor Hull-White short-rate model in its shifted Ornstein-Uhlenbeck form.
//!
//! `r(t) = x(t) + phi(t)` with `dx = -a x dt + sigma dW`, `x(0) = 0`, and the
//! deterministic shift `phi` fitted to the initial discount curve.

use std::sync::Arc;

use crate::core::FdmError;
use crate::market::YieldTermStructure;

const A_EPS: f64 = 1.0e-12;

/// Hull-White model `dr = (theta(t) - a r) dt + sigma dW`.
#[derive(Debug, Clone)]
pub struct HullWhite {
    /// Mean reversion speed.
    a: f64,
    /// Short-rate volatility.
    sigma: f64,
    curve: Arc<dyn YieldTermStructure>,
}

impl HullWhite {
    pub fn new(curve: Arc<dyn YieldTermStructure>, a: f64, sigma: f64) -> Result<Self, FdmError> {
        if !a.is_finite() {
            return Err(FdmError::invalid("hull-white mean reversion must be finite"));
        }
        if !(sigma >= 0.0) || !sigma.is_finite() {
            return Err(FdmError::invalid("hull-white sigma must be finite and >= 0"));
        }
        Ok(Self { a, sigma, curve })
    }

    #[inline]
    pub fn a(&self) -> f64 {
        self.a
    }

    #[inline]
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Deterministic shift `phi(t) = f(0,t) + 0.5 (sigma B(0,t))^2`.
    pub fn phi(&self, t: f64) -> f64 {
        let forward = self.curve.instantaneous_forward(t);
        let b = if self.a.abs() < A_EPS {
            self.sigma * t
        } else {
            self.sigma * (1.0 - (-self.a * t).exp()) / self.a
        };
        forward + 0.5 * b * b
    }

    /// Short rate for state `x` at time `t`.
    #[inline]
    pub fn short_rate(&self, t: f64, x: f64) -> f64 {
        x + self.phi(t)
    }

    /// Standard deviation of `x(t)` given `x(0)`.
    pub fn std_deviation(&self, t: f64) -> f64 {
        let t = t.max(0.0);
        if self.a.abs() < A_EPS {
            self.sigma * t.sqrt()
        } else {
            self.sigma * ((1.0 - (-2.0 * self.a * t).exp()) / (2.0 * self.a)).sqrt()
        }
    }
}
