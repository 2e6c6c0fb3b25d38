//! Black and local volatility term structures.

use std::fmt::Debug;

use crate::core::FdmError;
use crate::math::{ExtrapolationMode, LinearInterpolator, normal_cdf};

/// Black-implied volatility abstraction.
///
/// `strike` is in underlying price units, `t` is a year fraction.
pub trait BlackVolTermStructure: Debug + Send + Sync {
    fn black_vol(&self, t: f64, strike: f64) -> f64;

    /// Total implied variance `sigma^2 * t`.
    fn black_variance(&self, t: f64, strike: f64) -> f64 {
        let vol = self.black_vol(t, strike);
        vol * vol * t.max(0.0)
    }

    /// Implied variance accrued over `[t1, t2]`.
    fn black_forward_variance(&self, t1: f64, t2: f64, strike: f64) -> f64 {
        (self.black_variance(t2, strike) - self.black_variance(t1, strike)).max(0.0)
    }

    /// Annualized forward volatility over `[t1, t2]`.
    fn black_forward_vol(&self, t1: f64, t2: f64, strike: f64) -> f64 {
        const DT: f64 = 1.0e-5;
        let (a, b) = if t2 - t1 > DT { (t1, t2) } else { (t1, t1 + DT) };
        (self.black_forward_variance(a, b, strike) / (b - a)).sqrt()
    }
}

/// Flat Black volatility.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BlackConstantVol {
    pub vol: f64,
}

impl BlackConstantVol {
    pub fn new(vol: f64) -> Self {
        Self { vol }
    }
}

impl BlackVolTermStructure for BlackConstantVol {
    #[inline]
    fn black_vol(&self, _t: f64, _strike: f64) -> f64 {
        self.vol
    }

    #[inline]
    fn black_forward_vol(&self, _t1: f64, _t2: f64, _strike: f64) -> f64 {
        self.vol
    }
}

/// Strike-independent ATM term structure interpolated linearly in total variance.
#[derive(Debug, Clone)]
pub struct BlackVarianceCurve {
    variance: LinearInterpolator,
    last_vol: f64,
    last_time: f64,
}

impl BlackVarianceCurve {
    /// Builds the curve from `(expiry, vol)` pillars; variance must be non-decreasing.
    pub fn new(pillars: &[(f64, f64)]) -> Result<Self, FdmError> {
        if pillars.is_empty() {
            return Err(FdmError::invalid("variance curve needs at least one pillar"));
        }
        if pillars.iter().any(|&(t, v)| !(t > 0.0) || !(v >= 0.0)) {
            return Err(FdmError::invalid(
                "variance curve pillars need positive expiries and non-negative vols",
            ));
        }

        let mut times = Vec::with_capacity(pillars.len() + 1);
        let mut variances = Vec::with_capacity(pillars.len() + 1);
        times.push(0.0);
        variances.push(0.0);
        for &(t, v) in pillars {
            let var = v * v * t;
            if var < variances[variances.len() - 1] {
                return Err(FdmError::invalid("total variance must be non-decreasing"));
            }
            times.push(t);
            variances.push(var);
        }

        let (last_time, last_vol) = pillars[pillars.len() - 1];
        Ok(Self {
            variance: LinearInterpolator::new(times, variances, ExtrapolationMode::Flat)?,
            last_vol,
            last_time,
        })
    }
}

impl BlackVolTermStructure for BlackVarianceCurve {
    fn black_vol(&self, t: f64, strike: f64) -> f64 {
        if t <= 0.0 {
            return self.black_vol(1.0e-5, strike);
        }
        (self.black_variance(t, strike) / t).sqrt()
    }

    fn black_variance(&self, t: f64, _strike: f64) -> f64 {
        if t > self.last_time {
            return self.last_vol * self.last_vol * t;
        }
        self.variance.value(t.max(0.0))
    }
}

/// Local volatility abstraction `sigma(t, S)`.
///
/// Evaluation may fail, e.g. when a Dupire local variance turns negative.
pub trait LocalVolTermStructure: Debug + Send + Sync {
    fn local_vol(&self, t: f64, underlying: f64) -> Result<f64, FdmError>;

    fn max_time(&self) -> f64 {
        f64::MAX
    }

    fn min_strike(&self) -> f64 {
        0.0
    }

    fn max_strike(&self) -> f64 {
        f64::MAX
    }
}

/// Flat local volatility.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LocalConstantVol {
    pub vol: f64,
}

impl LocalConstantVol {
    pub fn new(vol: f64) -> Self {
        Self { vol }
    }
}

impl LocalVolTermStructure for LocalConstantVol {
    #[inline]
    fn local_vol(&self, _t: f64, _underlying: f64) -> Result<f64, FdmError> {
        Ok(self.vol)
    }
}

/// Dupire local volatility of a Black surface, for an underlying whose
/// forward stays at `forward` (zero carry).
///
/// Calendar and butterfly derivatives of undiscounted call prices are taken
/// by central differences with bumps `dk = K * strike_bump` and `dt`.
#[derive(Debug, Clone)]
pub struct DupireLocalVol<S> {
    surface: S,
    forward: f64,
    strike_bump: f64,
    dt: f64,
}

impl<S: BlackVolTermStructure> DupireLocalVol<S> {
    pub fn new(surface: S, forward: f64) -> Self {
        Self {
            surface,
            forward,
            strike_bump: 1e-3,
            dt: 1e-3,
        }
    }

    /// Relative strike bump and absolute time bump of the finite differences.
    pub fn with_bumps(self, strike_bump: f64, dt: f64) -> Self {
        Self {
            strike_bump: strike_bump.max(1e-6),
            dt: dt.max(1e-6),
            ..self
        }
    }

    fn undiscounted_call(&self, t: f64, strike: f64) -> f64 {
        let w = self.surface.black_variance(t, strike).max(1e-16).sqrt();
        let m = (self.forward / strike).ln() / w;
        self.forward * normal_cdf(m + 0.5 * w) - strike * normal_cdf(m - 0.5 * w)
    }
}

impl<S: BlackVolTermStructure> LocalVolTermStructure for DupireLocalVol<S> {
    fn local_vol(&self, t: f64, underlying: f64) -> Result<f64, FdmError> {
        if !(underlying > 0.0) || !(self.forward > 0.0) {
            return Err(FdmError::invalid(format!(
                "dupire local vol needs positive levels, got S={underlying}, F={}",
                self.forward
            )));
        }
        let k = underlying;
        let t = t.max(1e-6);
        let dk = k * self.strike_bump;
        let (t_lo, t_hi) = ((t - self.dt).max(0.5 * t), t + self.dt);

        let c = |t: f64, k: f64| self.undiscounted_call(t, k);
        let theta = (c(t_hi, k) - c(t_lo, k)) / (t_hi - t_lo);
        let gamma = (c(t, k + dk) - 2.0 * c(t, k) + c(t, k - dk)) / (dk * dk);

        // sigma^2 = 2 dC/dT / (K^2 d2C/dK2)
        let local_var = 2.0 * theta / (k * k * gamma);
        if gamma > 0.0 && local_var.is_finite() && local_var > 0.0 {
            Ok(local_var.sqrt())
        } else {
            Err(FdmError::numerical(format!(
                "no positive local variance at t={t}, S={underlying} (dC/dT={theta}, d2C/dK2={gamma})"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn constant_vol_forward_variance() {
        let vol = BlackConstantVol::new(0.2);
        assert_relative_eq!(vol.black_forward_variance(0.5, 1.5, 100.0), 0.04, epsilon = 1e-14);
        assert_relative_eq!(vol.black_forward_vol(1.0, 1.0, 100.0), 0.2);
    }

    #[test]
    fn variance_curve_interpolates_total_variance() {
        let curve = BlackVarianceCurve::new(&[(1.0, 0.2), (2.0, 0.3)]).unwrap();
        // var(1) = 0.04, var(2) = 0.18
        assert_relative_eq!(curve.black_variance(1.5, 100.0), 0.11, epsilon = 1e-14);
        assert_relative_eq!(curve.black_forward_vol(1.0, 2.0, 100.0), 0.14f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(curve.black_vol(3.0, 100.0), 0.3, epsilon = 1e-14);
        assert!(BlackVarianceCurve::new(&[(1.0, 0.3), (2.0, 0.1)]).is_err());
    }

    #[test]
    fn dupire_local_vol_matches_flat_surface() {
        let lv = DupireLocalVol::new(BlackConstantVol::new(0.24), 100.0);

        for &t in &[0.25, 0.5, 1.0, 2.0] {
            for &k in &[70.0, 85.0, 100.0, 120.0, 140.0] {
                let sigma_loc = lv.local_vol(t, k).unwrap();
                assert_relative_eq!(sigma_loc, 0.24, epsilon = 2e-3);
            }
        }
    }

    #[test]
    fn dupire_rejects_calendar_arbitrage() {
        #[derive(Debug)]
        struct Decaying;
        impl BlackVolTermStructure for Decaying {
            fn black_vol(&self, t: f64, _strike: f64) -> f64 {
                0.3 / (1.0 + 10.0 * t)
            }
        }
        let lv = DupireLocalVol::new(Decaying, 100.0);
        assert!(matches!(lv.local_vol(1.0, 100.0), Err(FdmError::NumericalError(_))));
    }
}
