//! Hull-White generator on the deviation `x = r - phi(t)`.

use std::sync::Arc;

use nalgebra_sparse::CsrMatrix;

use crate::core::FdmError;
use crate::fdm::meshers::FdmMesherComposite;
use crate::models::HullWhite;

use super::{
    FdmLinearOp, FdmLinearOpComposite, FirstDerivativeOp, SecondDerivativeOp, TripleBandLinearOp,
    check_len,
};

/// `L = -a x d/dx + sigma^2 / 2 d^2/dx^2 - (x + phi)` along `direction`,
/// with `phi` averaged over the step.
#[derive(Debug, Clone)]
pub struct FdmHullWhiteOp {
    x: Vec<f64>,
    dz_map: TripleBandLinearOp,
    map_t: TripleBandLinearOp,
    model: HullWhite,
    direction: usize,
}

impl FdmHullWhiteOp {
    pub fn new(
        mesher: Arc<FdmMesherComposite>,
        model: &HullWhite,
        direction: usize,
    ) -> Result<Self, FdmError> {
        let x = mesher.locations(direction);
        let mean_reversion: Vec<f64> = x.iter().map(|x| -x * model.a()).collect();
        let half_var = vec![0.5 * model.sigma() * model.sigma(); x.len()];

        let dz_map = FirstDerivativeOp::new(direction, Arc::clone(&mesher))?
            .mult(&mean_reversion)?
            .add(&SecondDerivativeOp::new(direction, Arc::clone(&mesher))?.mult(&half_var)?)?;
        let map_t = TripleBandLinearOp::new(direction, mesher)?;

        Ok(Self {
            x,
            dz_map,
            map_t,
            model: model.clone(),
            direction,
        })
    }

    pub fn map(&self) -> &TripleBandLinearOp {
        &self.map_t
    }
}

impl FdmLinearOp for FdmHullWhiteOp {
    fn apply(&self, r: &[f64]) -> Result<Vec<f64>, FdmError> {
        self.map_t.apply(r)
    }

    fn to_matrix(&self) -> CsrMatrix<f64> {
        self.map_t.to_matrix()
    }
}

impl FdmLinearOpComposite for FdmHullWhiteOp {
    fn size(&self) -> usize {
        1
    }

    fn set_time(&mut self, t1: f64, t2: f64) -> Result<(), FdmError> {
        let phi = 0.5 * (self.model.short_rate(t1, 0.0) + self.model.short_rate(t2, 0.0));
        let discount: Vec<f64> = self.x.iter().map(|x| -(x + phi)).collect();
        self.map_t.axpyb(&[], &self.dz_map, &self.dz_map, &discount)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fdm::meshers::{FdmShortRateMesher, FdmShortRateMesherParams, Mesher1d};
    use crate::market::FlatForward;
    use approx::assert_relative_eq;

    fn setup() -> (Arc<FdmMesherComposite>, HullWhite) {
        let model = HullWhite::new(Arc::new(FlatForward::new(0.03)), 0.1, 0.01).unwrap();
        let m = FdmShortRateMesher::new(31, &model, 5.0, &FdmShortRateMesherParams::default())
            .unwrap();
        (Arc::new(FdmMesherComposite::from_mesher(m).unwrap()), model)
    }

    #[test]
    fn constants_are_discounted_at_the_short_rate() {
        let (mesher, model) = setup();
        let mut op = FdmHullWhiteOp::new(Arc::clone(&mesher), &model, 0).unwrap();
        op.set_time(1.0, 1.5).unwrap();

        let phi = 0.5 * (model.phi(1.0) + model.phi(1.5));
        let out = op.apply(&vec![1.0; 31]).unwrap();
        for (x, v) in mesher.meshers()[0].locations().iter().zip(&out) {
            assert_relative_eq!(*v, -(x + phi), epsilon = 1e-10);
        }
    }

    #[test]
    fn mean_reversion_drift_on_linear_payoff() {
        let (mesher, model) = setup();
        let mut op = FdmHullWhiteOp::new(Arc::clone(&mesher), &model, 0).unwrap();
        op.set_time(0.0, 0.1).unwrap();

        let x = mesher.locations(0);
        let out = op.apply(&x).unwrap();
        let phi = 0.5 * (model.phi(0.0) + model.phi(0.1));
        // d/dx x = 1 everywhere, second derivative vanishes
        for (xi, v) in x.iter().zip(&out) {
            let expected = -0.1 * xi - (xi + phi) * xi;
            assert_relative_eq!(*v, expected, epsilon = 1e-10, max_relative = 1e-8);
        }
    }

    #[test]
    fn splitting_inverts_the_step() {
        let (mesher, model) = setup();
        let mut op = FdmHullWhiteOp::new(mesher, &model, 0).unwrap();
        op.set_time(2.0, 2.25).unwrap();
        let r: Vec<f64> = (0..31).map(|i| (i as f64 * 0.2).exp()).collect();
        let x = op.solve_splitting(0, &r, -0.25).unwrap();
        let lx = op.apply(&x).unwrap();
        for i in 0..31 {
            assert_relative_eq!(x[i] - 0.25 * lx[i], r[i], max_relative = 1e-10);
        }
        assert_eq!(op.solve_splitting(1, &r, 0.25).unwrap(), r);
    }
}
