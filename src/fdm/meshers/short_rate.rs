//! Grid for the Ornstein-Uhlenbeck state `x` of the Hull-White model.

use log::debug;

use crate::core::FdmError;
use crate::math::inverse_cumulative_normal;
use crate::models::HullWhite;

use super::{Concentrating1dMesher, ConcentrationPoint, Fdm1dMesher, Mesher1d, Uniform1dMesher};

/// Settings of [`FdmShortRateMesher`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FdmShortRateMesherParams {
    /// Number of horizons the standard deviation is averaged over.
    pub t_avg_steps: usize,
    /// Tail probability cut off on each side.
    pub epsilon: f64,
    /// Concentration point in state units.
    pub c_point: Option<ConcentrationPoint>,
}

impl Default for FdmShortRateMesherParams {
    fn default() -> Self {
        Self {
            t_avg_steps: 10,
            epsilon: 1e-4,
            c_point: None,
        }
    }
}

impl FdmShortRateMesherParams {
    pub fn with_t_avg_steps(mut self, t_avg_steps: usize) -> Self {
        self.t_avg_steps = t_avg_steps;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_concentration(mut self, c_point: ConcentrationPoint) -> Self {
        self.c_point = Some(c_point);
        self
    }
}

/// Symmetric grid `[-w, w]` around `x = 0`, `w` the `1 - epsilon` normal
/// quantile of the time-averaged state standard deviation.
#[derive(Debug, Clone, PartialEq)]
pub struct FdmShortRateMesher {
    grid: Fdm1dMesher,
}

impl FdmShortRateMesher {
    pub fn new(
        size: usize,
        model: &HullWhite,
        maturity: f64,
        params: &FdmShortRateMesherParams,
    ) -> Result<Self, FdmError> {
        if params.t_avg_steps == 0 {
            return Err(FdmError::invalid("t_avg_steps must be positive"));
        }
        if !(params.epsilon > 0.0 && params.epsilon < 0.5) {
            return Err(FdmError::invalid("epsilon must lie in (0, 0.5)"));
        }
        if !(maturity > 0.0) {
            return Err(FdmError::invalid("maturity must be positive"));
        }

        let n = params.t_avg_steps;
        let avg_std_dev = (1..=n)
            .map(|l| model.std_deviation(maturity * l as f64 / n as f64))
            .sum::<f64>()
            / n as f64;
        let x_max = avg_std_dev * inverse_cumulative_normal(1.0 - params.epsilon);
        let x_min = -x_max;
        debug!("short-rate mesher: state bounds [{x_min}, {x_max}]");

        let grid = match params
            .c_point
            .filter(|cp| cp.point >= x_min && cp.point <= x_max)
        {
            Some(cp) => Concentrating1dMesher::new(
                x_min,
                x_max,
                size,
                Some((cp.point, cp.density)),
                cp.required,
            )?
            .grid()
            .clone(),
            None => Uniform1dMesher::new(x_min, x_max, size)?.grid().clone(),
        };

        Ok(Self { grid })
    }
}

impl Mesher1d for FdmShortRateMesher {
    #[inline]
    fn grid(&self) -> &Fdm1dMesher {
        &self.grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::FlatForward;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    #[test]
    fn symmetric_bounds_from_average_std_dev() {
        let hw = HullWhite::new(Arc::new(FlatForward::new(0.03)), 0.0, 0.01).unwrap();
        let params = FdmShortRateMesherParams::default().with_t_avg_steps(1);
        let m = FdmShortRateMesher::new(21, &hw, 4.0, &params).unwrap();
        let w = 0.02 * inverse_cumulative_normal(1.0 - 1e-4);
        assert_relative_eq!(m.location(0), -w, epsilon = 1e-14);
        assert_relative_eq!(m.location(20), w, epsilon = 1e-14);
        assert_relative_eq!(m.location(10), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn zero_volatility_has_no_width() {
        let hw = HullWhite::new(Arc::new(FlatForward::new(0.03)), 0.1, 0.0).unwrap();
        let params = FdmShortRateMesherParams::default();
        assert!(FdmShortRateMesher::new(21, &hw, 4.0, &params).is_err());
    }
}
