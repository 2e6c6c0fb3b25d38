use std::sync::Arc;

use crate::core::FdmError;
use crate::market::{
    BlackVolTermStructure, DividendSchedule, LocalVolTermStructure, YieldTermStructure,
};

/// Generalized Black-Scholes process `dS/S = (r(t) - q(t)) dt + sigma dW`.
///
/// Volatility comes from the Black surface, or from an attached local
/// volatility surface when the operator asks for it.
#[derive(Debug, Clone)]
pub struct GeneralizedBlackScholesProcess {
    x0: f64,
    dividend_ts: Arc<dyn YieldTermStructure>,
    risk_free_ts: Arc<dyn YieldTermStructure>,
    black_vol: Arc<dyn BlackVolTermStructure>,
    local_vol: Option<Arc<dyn LocalVolTermStructure>>,
    dividends: DividendSchedule,
}

impl GeneralizedBlackScholesProcess {
    pub fn new(
        x0: f64,
        dividend_ts: Arc<dyn YieldTermStructure>,
        risk_free_ts: Arc<dyn YieldTermStructure>,
        black_vol: Arc<dyn BlackVolTermStructure>,
    ) -> Self {
        Self {
            x0,
            dividend_ts,
            risk_free_ts,
            black_vol,
            local_vol: None,
            dividends: DividendSchedule::default(),
        }
    }

    pub fn with_local_vol(mut self, local_vol: Arc<dyn LocalVolTermStructure>) -> Self {
        self.local_vol = Some(local_vol);
        self
    }

    /// Attaches discrete dividends paid by the underlying.
    pub fn with_dividends(mut self, dividends: DividendSchedule) -> Self {
        self.dividends = dividends;
        self
    }

    /// Spot level.
    #[inline]
    pub fn x0(&self) -> f64 {
        self.x0
    }

    pub fn dividend_yield(&self) -> &Arc<dyn YieldTermStructure> {
        &self.dividend_ts
    }

    pub fn risk_free_rate(&self) -> &Arc<dyn YieldTermStructure> {
        &self.risk_free_ts
    }

    pub fn black_volatility(&self) -> &Arc<dyn BlackVolTermStructure> {
        &self.black_vol
    }

    pub fn local_volatility(&self) -> Result<&Arc<dyn LocalVolTermStructure>, FdmError> {
        self.local_vol.as_ref().ok_or_else(|| {
            FdmError::MarketDataMissing("process has no local volatility surface".to_string())
        })
    }

    pub fn dividends(&self) -> &DividendSchedule {
        &self.dividends
    }
}
