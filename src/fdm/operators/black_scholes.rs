//! Black-Scholes generator in log-spot coordinates.

use std::sync::Arc;

use log::warn;
use nalgebra_sparse::CsrMatrix;

use crate::core::FdmError;
use crate::fdm::meshers::FdmMesherComposite;
use crate::market::{BlackVolTermStructure, LocalVolTermStructure, YieldTermStructure};
use crate::models::{FdmQuantoHelper, GeneralizedBlackScholesProcess};

use super::{
    FdmLinearOp, FdmLinearOpComposite, FirstDerivativeOp, SecondDerivativeOp, TripleBandLinearOp,
    check_len,
};

/// `L = (r - q - sigma^2 / 2) d/dx + sigma^2 / 2 d^2/dx^2 - r` along one axis,
/// `x = ln(S)`.
#[derive(Debug, Clone)]
pub struct FdmBlackScholesOp {
    mesher: Arc<FdmMesherComposite>,
    r_ts: Arc<dyn YieldTermStructure>,
    q_ts: Arc<dyn YieldTermStructure>,
    vol_ts: Arc<dyn BlackVolTermStructure>,
    local_vol: Option<Arc<dyn LocalVolTermStructure>>,
    spots: Vec<f64>,
    dx_map: TripleBandLinearOp,
    dxx_map: TripleBandLinearOp,
    map_t: TripleBandLinearOp,
    strike: f64,
    illegal_local_vol_overwrite: Option<f64>,
    direction: usize,
    quanto_helper: Option<Arc<FdmQuantoHelper>>,
}

impl FdmBlackScholesOp {
    /// With `local_vol` the diffusion is read from the process' local
    /// volatility surface; `illegal_local_vol_overwrite` replaces values the
    /// surface fails to deliver.
    pub fn new(
        mesher: Arc<FdmMesherComposite>,
        process: &GeneralizedBlackScholesProcess,
        strike: f64,
        local_vol: bool,
        illegal_local_vol_overwrite: Option<f64>,
        direction: usize,
        quanto_helper: Option<Arc<FdmQuantoHelper>>,
    ) -> Result<Self, FdmError> {
        let local_vol = if local_vol {
            Some(Arc::clone(process.local_volatility()?))
        } else {
            None
        };

        let spots = if local_vol.is_some() {
            mesher.locations(direction).iter().map(|x| x.exp()).collect()
        } else {
            Vec::new()
        };

        let dx_map = FirstDerivativeOp::new(direction, Arc::clone(&mesher))?;
        let dxx_map = SecondDerivativeOp::new(direction, Arc::clone(&mesher))?;
        let map_t = TripleBandLinearOp::new(direction, Arc::clone(&mesher))?;

        Ok(Self {
            mesher,
            r_ts: Arc::clone(process.risk_free_rate()),
            q_ts: Arc::clone(process.dividend_yield()),
            vol_ts: Arc::clone(process.black_volatility()),
            local_vol,
            spots,
            dx_map,
            dxx_map,
            map_t,
            strike,
            illegal_local_vol_overwrite,
            direction,
            quanto_helper,
        })
    }

    /// Operator assembled by the last `set_time`.
    pub fn map(&self) -> &TripleBandLinearOp {
        &self.map_t
    }

    pub fn mesher(&self) -> &Arc<FdmMesherComposite> {
        &self.mesher
    }

    fn local_variances(&self, lv: &dyn LocalVolTermStructure, t: f64) -> Result<Vec<f64>, FdmError> {
        let mut v = Vec::with_capacity(self.spots.len());
        for &spot in &self.spots {
            let sigma = match lv.local_vol(t, spot) {
                Ok(sigma) => sigma,
                Err(err) => match self.illegal_local_vol_overwrite {
                    Some(overwrite) => {
                        warn!("local vol lookup failed at t={t}, S={spot}: {err}; using {overwrite}");
                        overwrite
                    }
                    None => return Err(err),
                },
            };
            v.push(sigma * sigma);
        }
        Ok(v)
    }
}

impl FdmLinearOp for FdmBlackScholesOp {
    fn apply(&self, r: &[f64]) -> Result<Vec<f64>, FdmError> {
        self.map_t.apply(r)
    }

    fn to_matrix(&self) -> CsrMatrix<f64> {
        self.map_t.to_matrix()
    }
}

impl FdmLinearOpComposite for FdmBlackScholesOp {
    fn size(&self) -> usize {
        1
    }

    fn set_time(&mut self, t1: f64, t2: f64) -> Result<(), FdmError> {
        let r = self.r_ts.forward_rate(t1, t2);
        let q = self.q_ts.forward_rate(t1, t2);

        if let Some(lv) = &self.local_vol {
            let v = self.local_variances(lv.as_ref(), 0.5 * (t1 + t2))?;
            let mut drift: Vec<f64> = v.iter().map(|v| r - q - 0.5 * v).collect();
            if let Some(quanto) = &self.quanto_helper {
                let vols: Vec<f64> = v.iter().map(|v| v.sqrt()).collect();
                let adj = quanto.quanto_adjustments(&vols, t1, t2);
                drift.iter_mut().zip(adj).for_each(|(d, a)| *d -= a);
            }
            let half_v: Vec<f64> = v.iter().map(|v| 0.5 * v).collect();
            let diffusion = self.dxx_map.mult(&half_v)?;
            self.map_t.axpyb(&drift, &self.dx_map, &diffusion, &[-r])
        } else {
            let vol = self.vol_ts.black_forward_vol(t1, t2, self.strike);
            let v = vol * vol;
            let mut drift = r - q - 0.5 * v;
            if let Some(quanto) = &self.quanto_helper {
                drift -= quanto.quanto_adjustment(vol, t1, t2);
            }
            let half_v = vec![0.5 * v; self.mesher.layout().size()];
            let diffusion = self.dxx_map.mult(&half_v)?;
            self.map_t.axpyb(&[drift], &self.dx_map, &diffusion, &[-r])
        }
    }

    fn apply_mixed(&self, r: &[f64]) -> Result<Vec<f64>, FdmError> {
        check_len("r", r, self.map_t.size())?;
        Ok(vec![0.0; r.len()])
    }

    fn apply_direction(&self, direction: usize, r: &[f64]) -> Result<Vec<f64>, FdmError> {
        if direction == self.direction {
            self.map_t.apply(r)
        } else {
            check_len("r", r, self.map_t.size())?;
            Ok(vec![0.0; r.len()])
        }
    }

    fn solve_splitting(&self, direction: usize, r: &[f64], a: f64) -> Result<Vec<f64>, FdmError> {
        if direction == self.direction {
            self.map_t.solve_splitting(r, a, 1.0)
        } else {
            check_len("r", r, self.map_t.size())?;
            Ok(r.to_vec())
        }
    }

    fn preconditioner(&self, r: &[f64], dt: f64) -> Result<Vec<f64>, FdmError> {
        self.solve_splitting(self.direction, r, dt)
    }

    fn to_matrix_decomp(&self) -> Vec<CsrMatrix<f64>> {
        vec![self.map_t.to_matrix()]
    }
}
