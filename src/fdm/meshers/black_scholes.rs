//! Log-spot grid for (generalized) Black-Scholes problems.

use std::sync::Arc;

use log::debug;

use crate::core::FdmError;
use crate::market::{DividendEvent, YieldTermStructure};
use crate::math::inverse_cumulative_normal;
use crate::models::{FdmQuantoHelper, GeneralizedBlackScholesProcess};

use super::{
    Concentrating1dMesher, ConcentrationPoint, Fdm1dMesher, Mesher1d, Uniform1dMesher,
};

/// Settings of [`FdmBlackScholesMesher`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FdmBlackScholesMesherParams {
    /// Overrides the lower log-spot bound.
    pub x_min_constraint: Option<f64>,
    /// Overrides the upper log-spot bound.
    pub x_max_constraint: Option<f64>,
    /// Tail probability cut off on each side.
    pub eps: f64,
    /// Multiplier on the `sigma sqrt(T)` half-width.
    pub scale_factor: f64,
    /// Concentration point in spot units.
    pub c_point: Option<ConcentrationPoint>,
    /// Shift applied to spot before the forward is rolled.
    pub spot_adjustment: f64,
}

impl Default for FdmBlackScholesMesherParams {
    fn default() -> Self {
        Self {
            x_min_constraint: None,
            x_max_constraint: None,
            eps: 1e-4,
            scale_factor: 1.5,
            c_point: None,
            spot_adjustment: 0.0,
        }
    }
}

impl FdmBlackScholesMesherParams {
    pub fn with_constraints(mut self, x_min: Option<f64>, x_max: Option<f64>) -> Self {
        self.x_min_constraint = x_min;
        self.x_max_constraint = x_max;
        self
    }

    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    pub fn with_concentration(mut self, c_point: ConcentrationPoint) -> Self {
        self.c_point = Some(c_point);
        self
    }

    pub fn with_spot_adjustment(mut self, spot_adjustment: f64) -> Self {
        self.spot_adjustment = spot_adjustment;
        self
    }
}

/// Uniform or concentrated grid in `ln(S)` wide enough to cover the forward
/// path, including discrete dividend drops, up to maturity.
#[derive(Debug, Clone, PartialEq)]
pub struct FdmBlackScholesMesher {
    grid: Fdm1dMesher,
}

impl FdmBlackScholesMesher {
    pub fn new(
        size: usize,
        process: &GeneralizedBlackScholesProcess,
        maturity: f64,
        strike: f64,
        params: &FdmBlackScholesMesherParams,
    ) -> Result<Self, FdmError> {
        Self::build(
            size,
            process,
            maturity,
            strike,
            params,
            Arc::clone(process.dividend_yield()),
        )
    }

    /// Same grid with the dividend curve replaced by its quanto-adjusted version.
    pub fn with_quanto(
        size: usize,
        process: &GeneralizedBlackScholesProcess,
        maturity: f64,
        strike: f64,
        params: &FdmBlackScholesMesherParams,
        quanto_helper: &FdmQuantoHelper,
    ) -> Result<Self, FdmError> {
        let q_ts = quanto_helper.quanto_dividend_curve(
            Arc::clone(process.dividend_yield()),
            Arc::clone(process.black_volatility()),
            strike,
        );
        Self::build(size, process, maturity, strike, params, Arc::new(q_ts))
    }

    fn build(
        size: usize,
        process: &GeneralizedBlackScholesProcess,
        maturity: f64,
        strike: f64,
        params: &FdmBlackScholesMesherParams,
        q_ts: Arc<dyn YieldTermStructure>,
    ) -> Result<Self, FdmError> {
        let spot = process.x0();
        if !(spot > 0.0) {
            return Err(FdmError::invalid("negative or null underlying given"));
        }
        if !(maturity >= 0.0) {
            return Err(FdmError::invalid("maturity must be non-negative"));
        }
        if !(params.eps > 0.0 && params.eps < 1.0) {
            return Err(FdmError::invalid("eps must lie in (0, 1)"));
        }

        let (lowest, highest) = forward_range(
            spot + params.spot_adjustment,
            maturity,
            process.risk_free_rate().as_ref(),
            q_ts.as_ref(),
            process.dividends().events_until(maturity).copied(),
        )?;

        let norm_inv_eps = inverse_cumulative_normal(1.0 - params.eps);
        let sigma_sqrt_t = process.black_volatility().black_vol(maturity, strike) * maturity.sqrt();
        let half_width = sigma_sqrt_t * norm_inv_eps * params.scale_factor;

        let x_min = params
            .x_min_constraint
            .unwrap_or_else(|| lowest.ln() - half_width);
        let x_max = params
            .x_max_constraint
            .unwrap_or_else(|| highest.ln() + half_width);
        debug!(
            "black-scholes mesher: forward range [{lowest}, {highest}], log-spot bounds [{x_min}, {x_max}]"
        );

        let concentration = params
            .c_point
            .filter(|cp| cp.point > 0.0)
            .map(|cp| (cp.point.ln(), cp))
            .filter(|(x, _)| *x >= x_min && *x <= x_max);

        let grid = match concentration {
            Some((x, cp)) => {
                Concentrating1dMesher::new(x_min, x_max, size, Some((x, cp.density)), cp.required)?
                    .grid()
                    .clone()
            }
            None => Uniform1dMesher::new(x_min, x_max, size)?.grid().clone(),
        };

        Ok(Self { grid })
    }
}

impl Mesher1d for FdmBlackScholesMesher {
    #[inline]
    fn grid(&self) -> &Fdm1dMesher {
        &self.grid
    }
}

/// Running minimum and maximum of the forward, before and after each
/// dividend drop, over the dividends plus `max(2, floor(24 T))` even steps.
fn forward_range(
    start: f64,
    maturity: f64,
    r_ts: &dyn YieldTermStructure,
    q_ts: &dyn YieldTermStructure,
    dividends: impl Iterator<Item = DividendEvent>,
) -> Result<(f64, f64), FdmError> {
    let mut steps: Vec<(f64, Option<DividendEvent>)> =
        dividends.map(|d| (d.time, Some(d))).collect();
    let n_steps = ((24.0 * maturity) as usize).max(2);
    steps.extend((0..n_steps).map(|i| ((i + 1) as f64 * (maturity / n_steps as f64), None)));
    // dividend-free steps go first at equal times
    steps.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.is_some().cmp(&b.1.is_some())));

    let mut fwd = start;
    let mut lowest = fwd;
    let mut highest = fwd;
    let mut last_time = 0.0;
    for (time, dividend) in steps {
        fwd = fwd / r_ts.discount(time) * r_ts.discount(last_time) * q_ts.discount(time)
            / q_ts.discount(last_time);
        lowest = lowest.min(fwd);
        highest = highest.max(fwd);

        if let Some(d) = dividend {
            fwd = d.apply_jump(fwd);
            lowest = lowest.min(fwd);
            highest = highest.max(fwd);
        }
        last_time = time;
    }

    if !(lowest > 0.0) || !highest.is_finite() {
        return Err(FdmError::numerical(format!(
            "forward leaves the positive half-line: range [{lowest}, {highest}]"
        )));
    }
    Ok((lowest, highest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{BlackConstantVol, DividendSchedule, FlatForward};
    use approx::assert_relative_eq;

    fn process(spot: f64, r: f64, q: f64, vol: f64) -> GeneralizedBlackScholesProcess {
        GeneralizedBlackScholesProcess::new(
            spot,
            Arc::new(FlatForward::new(q)),
            Arc::new(FlatForward::new(r)),
            Arc::new(BlackConstantVol::new(vol)),
        )
    }

    #[test]
    fn bounds_without_dividends() {
        let p = process(100.0, 0.05, 0.0, 0.2);
        let params = FdmBlackScholesMesherParams::default();
        let m = FdmBlackScholesMesher::new(101, &p, 1.0, 100.0, &params).unwrap();

        let w = 0.2 * inverse_cumulative_normal(1.0 - 1e-4) * 1.5;
        assert_relative_eq!(m.location(0), 100f64.ln() - w, epsilon = 1e-12);
        assert_relative_eq!(m.location(100), 100f64.ln() + 0.05 + w, epsilon = 1e-12);
    }

    #[test]
    fn cash_dividend_lowers_the_lower_bound() {
        let base = process(100.0, 0.0, 0.0, 0.2);
        let with_div = base.clone().with_dividends(
            DividendSchedule::new(vec![DividendEvent::cash(0.5, 10.0).unwrap()]).unwrap(),
        );
        let params = FdmBlackScholesMesherParams::default();
        let m0 = FdmBlackScholesMesher::new(51, &base, 1.0, 100.0, &params).unwrap();
        let m1 = FdmBlackScholesMesher::new(51, &with_div, 1.0, 100.0, &params).unwrap();
        assert_relative_eq!(m0.location(0) - m1.location(0), (100.0f64 / 90.0).ln(), epsilon = 1e-12);
        assert_relative_eq!(m0.location(50), m1.location(50), epsilon = 1e-12);
    }

    #[test]
    fn constraints_and_concentration() {
        let p = process(100.0, 0.03, 0.01, 0.25);
        let params = FdmBlackScholesMesherParams::default()
            .with_constraints(Some(3.0), Some(6.0))
            .with_concentration(ConcentrationPoint::new(100.0, 0.1).with_required(true));
        let m = FdmBlackScholesMesher::new(41, &p, 1.0, 100.0, &params).unwrap();
        assert_eq!(m.location(0), 3.0);
        assert_eq!(m.location(40), 6.0);
        assert!(m.locations().iter().any(|x| (x - 100f64.ln()).abs() < 1e-12));

        // a point outside the bounds falls back to a uniform grid
        let params = params.with_concentration(ConcentrationPoint::new(1000.0, 0.1));
        let m = FdmBlackScholesMesher::new(41, &p, 1.0, 100.0, &params).unwrap();
        assert_relative_eq!(m.dplus(0).unwrap(), m.dplus(20).unwrap(), epsilon = 1e-12);
    }

    #[test]
    fn rejects_non_positive_spot() {
        let p = process(0.0, 0.03, 0.0, 0.2);
        let params = FdmBlackScholesMesherParams::default();
        assert!(matches!(
            FdmBlackScholesMesher::new(11, &p, 1.0, 100.0, &params),
            Err(FdmError::InvalidInput(_))
        ));
    }

    #[test]
    fn params_roundtrip_through_json_defaults() {
        let params: FdmBlackScholesMesherParams = serde_json::from_str(r#"{"eps": 1e-5}"#).unwrap();
        assert_eq!(params.eps, 1e-5);
        assert_eq!(params.scale_factor, 1.5);
        assert!(params.c_point.is_none());
    }
}
