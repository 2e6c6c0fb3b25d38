use std::sync::Arc;

use crate::core::FdmError;
use crate::market::YieldTermStructure;

/// Heston stochastic volatility process.
///
/// `dS/S = (r - q) dt + sqrt(v) dW1`, `dv = kappa (theta - v) dt + sigma sqrt(v) dW2`,
/// `dW1 dW2 = rho dt`.
#[derive(Debug, Clone)]
pub struct HestonProcess {
    s0: f64,
    risk_free_ts: Arc<dyn YieldTermStructure>,
    dividend_ts: Arc<dyn YieldTermStructure>,
    v0: f64,
    kappa: f64,
    theta: f64,
    sigma: f64,
    rho: f64,
}

impl HestonProcess {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        risk_free_ts: Arc<dyn YieldTermStructure>,
        dividend_ts: Arc<dyn YieldTermStructure>,
        s0: f64,
        v0: f64,
        kappa: f64,
        theta: f64,
        sigma: f64,
        rho: f64,
    ) -> Result<Self, FdmError> {
        let process = Self {
            s0,
            risk_free_ts,
            dividend_ts,
            v0,
            kappa,
            theta,
            sigma,
            rho,
        };
        process.validate()?;
        Ok(process)
    }

    fn validate(&self) -> Result<(), FdmError> {
        if !(self.s0 > 0.0) {
            return Err(FdmError::invalid("heston spot must be positive"));
        }
        if !(self.v0 >= 0.0 && self.theta >= 0.0) {
            return Err(FdmError::invalid("heston v0 and theta must be non-negative"));
        }
        if !(self.kappa >= 0.0 && self.sigma >= 0.0) {
            return Err(FdmError::invalid("heston kappa and sigma must be non-negative"));
        }
        if !(-1.0..=1.0).contains(&self.rho) {
            return Err(FdmError::invalid("heston rho must lie in [-1, 1]"));
        }
        Ok(())
    }

    #[inline]
    pub fn s0(&self) -> f64 {
        self.s0
    }

    #[inline]
    pub fn v0(&self) -> f64 {
        self.v0
    }

    #[inline]
    pub fn kappa(&self) -> f64 {
        self.kappa
    }

    #[inline]
    pub fn theta(&self) -> f64 {
        self.theta
    }

    #[inline]
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    #[inline]
    pub fn rho(&self) -> f64 {
        self.rho
    }

    pub fn risk_free_rate(&self) -> &Arc<dyn YieldTermStructure> {
        &self.risk_free_ts
    }

    pub fn dividend_yield(&self) -> &Arc<dyn YieldTermStructure> {
        &self.dividend_ts
    }

    /// Feller condition `2 kappa theta >= sigma^2`.
    pub fn satisfies_feller(&self) -> bool {
        2.0 * self.kappa * self.theta >= self.sigma * self.sigma
    }
}
