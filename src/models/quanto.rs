//! Quanto drift adjustment for equities paying in a foreign currency.

use std::sync::Arc;

use crate::market::{BlackVolTermStructure, YieldTermStructure};

/// Quanto adjustment `r_d - r_f + sigma_eq * sigma_fx * rho` over a time slice.
#[derive(Debug, Clone)]
pub struct FdmQuantoHelper {
    r_ts: Arc<dyn YieldTermStructure>,
    f_ts: Arc<dyn YieldTermStructure>,
    fx_vol_ts: Arc<dyn BlackVolTermStructure>,
    equity_fx_correlation: f64,
    exchange_rate_atm_level: f64,
}

impl FdmQuantoHelper {
    pub fn new(
        r_ts: Arc<dyn YieldTermStructure>,
        f_ts: Arc<dyn YieldTermStructure>,
        fx_vol_ts: Arc<dyn BlackVolTermStructure>,
        equity_fx_correlation: f64,
        exchange_rate_atm_level: f64,
    ) -> Self {
        Self {
            r_ts,
            f_ts,
            fx_vol_ts,
            equity_fx_correlation,
            exchange_rate_atm_level,
        }
    }

    pub fn quanto_adjustment(&self, equity_vol: f64, t1: f64, t2: f64) -> f64 {
        let r_domestic = self.r_ts.forward_rate(t1, t2);
        let r_foreign = self.f_ts.forward_rate(t1, t2);
        let fx_vol = self
            .fx_vol_ts
            .black_forward_vol(t1, t2, self.exchange_rate_atm_level);
        r_domestic - r_foreign + equity_vol * fx_vol * self.equity_fx_correlation
    }

    /// Element-wise adjustment for a slice of equity volatilities.
    pub fn quanto_adjustments(&self, equity_vol: &[f64], t1: f64, t2: f64) -> Vec<f64> {
        let r_domestic = self.r_ts.forward_rate(t1, t2);
        let r_foreign = self.f_ts.forward_rate(t1, t2);
        let fx_vol = self
            .fx_vol_ts
            .black_forward_vol(t1, t2, self.exchange_rate_atm_level);
        equity_vol
            .iter()
            .map(|v| r_domestic - r_foreign + v * fx_vol * self.equity_fx_correlation)
            .collect()
    }

    /// Dividend curve shifted by the quanto drift, used for quanto grid bounds.
    pub fn quanto_dividend_curve(
        &self,
        dividend_ts: Arc<dyn YieldTermStructure>,
        equity_vol_ts: Arc<dyn BlackVolTermStructure>,
        strike: f64,
    ) -> QuantoTermStructure {
        QuantoTermStructure {
            underlying_dividend_ts: dividend_ts,
            r_ts: Arc::clone(&self.r_ts),
            f_ts: Arc::clone(&self.f_ts),
            equity_vol_ts,
            strike,
            fx_vol_ts: Arc::clone(&self.fx_vol_ts),
            exchange_rate_atm_level: self.exchange_rate_atm_level,
            correlation: self.equity_fx_correlation,
        }
    }
}

/// Dividend yield curve with zero rate `q + r_d - r_f + rho sigma_eq sigma_fx`.
#[derive(Debug, Clone)]
pub struct QuantoTermStructure {
    underlying_dividend_ts: Arc<dyn YieldTermStructure>,
    r_ts: Arc<dyn YieldTermStructure>,
    f_ts: Arc<dyn YieldTermStructure>,
    equity_vol_ts: Arc<dyn BlackVolTermStructure>,
    strike: f64,
    fx_vol_ts: Arc<dyn BlackVolTermStructure>,
    exchange_rate_atm_level: f64,
    correlation: f64,
}

impl YieldTermStructure for QuantoTermStructure {
    fn discount(&self, t: f64) -> f64 {
        if t <= 0.0 {
            return 1.0;
        }
        (-self.zero_rate(t) * t).exp()
    }

    fn zero_rate(&self, t: f64) -> f64 {
        self.underlying_dividend_ts.zero_rate(t) + self.r_ts.zero_rate(t)
            - self.f_ts.zero_rate(t)
            + self.correlation
                * self.equity_vol_ts.black_vol(t, self.strike)
                * self.fx_vol_ts.black_vol(t, self.exchange_rate_atm_level)
    }
}
