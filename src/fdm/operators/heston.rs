//! Heston generator on a `(ln S, v)` mesh, optionally with a leverage
//! function for stochastic local volatility.

use std::sync::Arc;

use nalgebra_sparse::CsrMatrix;

use crate::core::FdmError;
use crate::fdm::meshers::FdmMesherComposite;
use crate::market::{LocalVolTermStructure, YieldTermStructure};
use crate::models::{FdmQuantoHelper, HestonProcess};

use super::{
    FdmLinearOp, FdmLinearOpComposite, FirstDerivativeOp, NinePointLinearOp, SecondDerivativeOp,
    SecondOrderMixedDerivativeOp, TripleBandLinearOp, sum_decomp,
};

const MIN_LEVERAGE: f64 = 0.01;

/// Spot direction: `(r - q - L^2 v / 2) d/dx + L^2 v / 2 d^2/dx^2 - r / 2`.
#[derive(Debug, Clone)]
pub struct FdmHestonEquityPart {
    variance_values: Vec<f64>,
    volatility_values: Vec<f64>,
    leverage: Vec<f64>,
    dx_map: TripleBandLinearOp,
    dxx_map: TripleBandLinearOp,
    map_t: TripleBandLinearOp,
    mesher: Arc<FdmMesherComposite>,
    r_ts: Arc<dyn YieldTermStructure>,
    q_ts: Arc<dyn YieldTermStructure>,
    quanto_helper: Option<Arc<FdmQuantoHelper>>,
    leverage_fct: Option<Arc<dyn LocalVolTermStructure>>,
}

impl FdmHestonEquityPart {
    pub fn new(
        mesher: Arc<FdmMesherComposite>,
        r_ts: Arc<dyn YieldTermStructure>,
        q_ts: Arc<dyn YieldTermStructure>,
        quanto_helper: Option<Arc<FdmQuantoHelper>>,
        leverage_fct: Option<Arc<dyn LocalVolTermStructure>>,
    ) -> Result<Self, FdmError> {
        let layout = mesher.layout();
        let last = layout.dim()[0] - 1;

        let mut variance_values: Vec<f64> = mesher.locations(1).iter().map(|v| 0.5 * v).collect();
        let dx_map = FirstDerivativeOp::new(0, Arc::clone(&mesher))?;
        let dxx_map = SecondDerivativeOp::new(0, Arc::clone(&mesher))?.mult(&variance_values)?;
        let map_t = TripleBandLinearOp::new(0, Arc::clone(&mesher))?;

        // the second derivative vanishes on the spot boundaries, so by Ito
        // the variance term of the drift must vanish there too
        for iter in layout.iter() {
            let c = iter.coordinates()[0];
            if c == 0 || c == last {
                variance_values[iter.index()] = 0.0;
            }
        }
        let volatility_values = variance_values.iter().map(|v| (2.0 * v).sqrt()).collect();

        Ok(Self {
            variance_values,
            volatility_values,
            leverage: vec![1.0; layout.size()],
            dx_map,
            dxx_map,
            map_t,
            mesher,
            r_ts,
            q_ts,
            quanto_helper,
            leverage_fct,
        })
    }

    pub fn set_time(&mut self, t1: f64, t2: f64) -> Result<(), FdmError> {
        let r = self.r_ts.forward_rate(t1, t2);
        let q = self.q_ts.forward_rate(t1, t2);

        self.leverage = self.leverage_fct_slice(t1, t2)?;
        let l_square: Vec<f64> = self.leverage.iter().map(|l| l * l).collect();

        let mut drift: Vec<f64> = self
            .variance_values
            .iter()
            .zip(&l_square)
            .map(|(v, l2)| r - q - v * l2)
            .collect();
        if let Some(quanto) = &self.quanto_helper {
            let vols: Vec<f64> = self
                .volatility_values
                .iter()
                .zip(&self.leverage)
                .map(|(s, l)| s * l)
                .collect();
            let adj = quanto.quanto_adjustments(&vols, t1, t2);
            drift.iter_mut().zip(adj).for_each(|(d, a)| *d -= a);
        }

        let diffusion = self.dxx_map.mult(&l_square)?;
        self.map_t
            .axpyb(&drift, &self.dx_map, &diffusion, &[-0.5 * r])
    }

    /// Leverage values for the slice, evaluated along the spot axis at the
    /// first variance node and repeated across variance.
    fn leverage_fct_slice(&self, t1: f64, t2: f64) -> Result<Vec<f64>, FdmError> {
        let layout = self.mesher.layout();
        let mut v = vec![1.0; layout.size()];
        let Some(lev) = &self.leverage_fct else {
            return Ok(v);
        };

        let time = lev.max_time().min(0.5 * (t1 + t2));
        for iter in layout.iter() {
            let nx = iter.coordinates()[0];
            if iter.coordinates()[1] == 0 {
                let x = self.mesher.location(&iter, 0).exp();
                let spot = x.max(lev.min_strike()).min(lev.max_strike());
                v[nx] = lev.local_vol(time, spot)?.max(MIN_LEVERAGE);
            } else {
                v[iter.index()] = v[nx];
            }
        }
        Ok(v)
    }

    pub fn map(&self) -> &TripleBandLinearOp {
        &self.map_t
    }

    /// Leverage values of the last `set_time`.
    pub fn leverage(&self) -> &[f64] {
        &self.leverage
    }
}

/// Variance direction: `kappa (theta - v) d/dv + sigma^2 v / 2 d^2/dv^2 - r / 2`.
#[derive(Debug, Clone)]
pub struct FdmHestonVariancePart {
    dy_map: TripleBandLinearOp,
    map_t: TripleBandLinearOp,
    r_ts: Arc<dyn YieldTermStructure>,
}

impl FdmHestonVariancePart {
    pub fn new(
        mesher: Arc<FdmMesherComposite>,
        r_ts: Arc<dyn YieldTermStructure>,
        mixed_sigma: f64,
        kappa: f64,
        theta: f64,
    ) -> Result<Self, FdmError> {
        let v = mesher.locations(1);
        let diffusion: Vec<f64> = v.iter().map(|v| 0.5 * mixed_sigma * mixed_sigma * v).collect();
        let drift: Vec<f64> = v.iter().map(|v| kappa * (theta - v)).collect();

        let dy_map = SecondDerivativeOp::new(1, Arc::clone(&mesher))?
            .mult(&diffusion)?
            .add(&FirstDerivativeOp::new(1, Arc::clone(&mesher))?.mult(&drift)?)?;
        let map_t = TripleBandLinearOp::new(1, mesher)?;

        Ok(Self {
            dy_map,
            map_t,
            r_ts,
        })
    }

    pub fn set_time(&mut self, t1: f64, t2: f64) -> Result<(), FdmError> {
        let r = self.r_ts.forward_rate(t1, t2);
        self.map_t.axpyb(&[], &self.dy_map, &self.dy_map, &[-0.5 * r])
    }

    pub fn map(&self) -> &TripleBandLinearOp {
        &self.map_t
    }
}

/// Heston operator: equity part, variance part and the `rho sigma v`
/// weighted cross derivative scaled by the leverage.
#[derive(Debug, Clone)]
pub struct FdmHestonOp {
    correlation_map: NinePointLinearOp,
    dy_map: FdmHestonVariancePart,
    dx_map: FdmHestonEquityPart,
}

impl FdmHestonOp {
    pub fn new(
        mesher: Arc<FdmMesherComposite>,
        process: &HestonProcess,
        quanto_helper: Option<Arc<FdmQuantoHelper>>,
        leverage_fct: Option<Arc<dyn LocalVolTermStructure>>,
        mixing_factor: f64,
    ) -> Result<Self, FdmError> {
        if mesher.layout().dim().len() < 2 {
            return Err(FdmError::invalid(
                "heston operator needs a spot and a variance axis",
            ));
        }

        let mixed_sigma = process.sigma() * mixing_factor;
        let cross: Vec<f64> = mesher
            .locations(1)
            .iter()
            .map(|v| process.rho() * mixed_sigma * v)
            .collect();
        let correlation_map =
            SecondOrderMixedDerivativeOp::new(0, 1, Arc::clone(&mesher))?.mult(&cross)?;

        let dy_map = FdmHestonVariancePart::new(
            Arc::clone(&mesher),
            Arc::clone(process.risk_free_rate()),
            mixed_sigma,
            process.kappa(),
            process.theta(),
        )?;
        let dx_map = FdmHestonEquityPart::new(
            mesher,
            Arc::clone(process.risk_free_rate()),
            Arc::clone(process.dividend_yield()),
            quanto_helper,
            leverage_fct,
        )?;

        Ok(Self {
            correlation_map,
            dy_map,
            dx_map,
        })
    }

    pub fn equity_part(&self) -> &FdmHestonEquityPart {
        &self.dx_map
    }

    pub fn variance_part(&self) -> &FdmHestonVariancePart {
        &self.dy_map
    }

    fn direction_error(direction: usize) -> FdmError {
        FdmError::invalid(format!("direction {direction} too large for the heston operator"))
    }
}

impl FdmLinearOp for FdmHestonOp {
    fn apply(&self, r: &[f64]) -> Result<Vec<f64>, FdmError> {
        let dy = self.dy_map.map().apply(r)?;
        let dx = self.dx_map.map().apply(r)?;
        let mixed = self.apply_mixed(r)?;
        Ok(dy
            .iter()
            .zip(&dx)
            .zip(&mixed)
            .map(|((y, x), m)| y + x + m)
            .collect())
    }

    fn to_matrix(&self) -> CsrMatrix<f64> {
        sum_decomp(self.to_matrix_decomp())
    }
}

impl FdmLinearOpComposite for FdmHestonOp {
    fn size(&self) -> usize {
        2
    }

    fn set_time(&mut self, t1: f64, t2: f64) -> Result<(), FdmError> {
        self.dx_map.set_time(t1, t2)?;
        self.dy_map.set_time(t1, t2)
    }

    fn apply_mixed(&self, r: &[f64]) -> Result<Vec<f64>, FdmError> {
        let corr = self.correlation_map.apply(r)?;
        Ok(corr
            .iter()
            .zip(self.dx_map.leverage())
            .map(|(c, l)| c * l)
            .collect())
    }

    fn apply_direction(&self, direction: usize, r: &[f64]) -> Result<Vec<f64>, FdmError> {
        match direction {
            0 => self.dx_map.map().apply(r),
            1 => self.dy_map.map().apply(r),
            _ => Err(Self::direction_error(direction)),
        }
    }

    fn solve_splitting(&self, direction: usize, r: &[f64], a: f64) -> Result<Vec<f64>, FdmError> {
        match direction {
            0 => self.dx_map.map().solve_splitting(r, a, 1.0),
            1 => self.dy_map.map().solve_splitting(r, a, 1.0),
            _ => Err(Self::direction_error(direction)),
        }
    }

    fn preconditioner(&self, r: &[f64], dt: f64) -> Result<Vec<f64>, FdmError> {
        self.solve_splitting(0, r, dt)
    }

    /// Spot part, variance part and the levered correlation part.
    fn to_matrix_decomp(&self) -> Vec<CsrMatrix<f64>> {
        let mut correlation = self.correlation_map.to_matrix();
        for (mut row, &l) in correlation.row_iter_mut().zip(self.dx_map.leverage()) {
            row.values_mut().iter_mut().for_each(|value| *value *= l);
        }
        vec![
            self.dx_map.map().to_matrix(),
            self.dy_map.map().to_matrix(),
            correlation,
        ]
    }
}
