//! Three-point stencil along one axis of a composite mesh.

use std::sync::Arc;

use nalgebra_sparse::{CooMatrix, CsrMatrix};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::core::FdmError;
use crate::fdm::layout::FdmLinearOpLayout;
use crate::fdm::meshers::FdmMesherComposite;

use super::{Coefficients, FdmLinearOp, check_len};

/// Operator `(L r)[i] = lower[i] r[i0[i]] + diag[i] r[i] + upper[i] r[i2[i]]`
/// where `i0`/`i2` are the mirrored neighbours along `direction`.
///
/// Index arrays are shared between copies; only the bands are owned.
#[derive(Debug, Clone)]
pub struct TripleBandLinearOp {
    direction: usize,
    i0: Arc<Vec<usize>>,
    i2: Arc<Vec<usize>>,
    reverse_index: Arc<Vec<usize>>,
    lower: Vec<f64>,
    diag: Vec<f64>,
    upper: Vec<f64>,
    mesher: Arc<FdmMesherComposite>,
}

impl TripleBandLinearOp {
    /// Zero operator along `direction`.
    pub fn new(direction: usize, mesher: Arc<FdmMesherComposite>) -> Result<Self, FdmError> {
        let layout = mesher.layout();
        let n_dims = layout.dim().len();
        if direction >= n_dims {
            return Err(FdmError::invalid(format!(
                "direction {direction} out of range for a {n_dims}-dimensional mesh"
            )));
        }

        let size = layout.size();

        // layout with `direction` as the fastest axis, strides mapped back
        let mut new_dim = layout.dim().to_vec();
        new_dim.swap(0, direction);
        let mut new_spacing = FdmLinearOpLayout::new(new_dim)?.spacing().to_vec();
        new_spacing.swap(0, direction);

        let mut i0 = vec![0; size];
        let mut i2 = vec![0; size];
        let mut reverse_index = vec![0; size];
        for iter in layout.iter() {
            let i = iter.index();
            i0[i] = layout.neighbourhood(&iter, direction, -1);
            i2[i] = layout.neighbourhood(&iter, direction, 1);
            let new_index: usize = iter
                .coordinates()
                .iter()
                .zip(&new_spacing)
                .map(|(c, s)| c * s)
                .sum();
            reverse_index[new_index] = i;
        }

        Ok(Self {
            direction,
            i0: Arc::new(i0),
            i2: Arc::new(i2),
            reverse_index: Arc::new(reverse_index),
            lower: vec![0.0; size],
            diag: vec![0.0; size],
            upper: vec![0.0; size],
            mesher,
        })
    }

    /// Same stencil structure with the given bands.
    fn with_bands(&self, lower: Vec<f64>, diag: Vec<f64>, upper: Vec<f64>) -> Self {
        Self {
            direction: self.direction,
            i0: Arc::clone(&self.i0),
            i2: Arc::clone(&self.i2),
            reverse_index: Arc::clone(&self.reverse_index),
            lower,
            diag,
            upper,
            mesher: Arc::clone(&self.mesher),
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.diag.len()
    }

    #[inline]
    pub fn direction(&self) -> usize {
        self.direction
    }

    #[inline]
    pub fn mesher(&self) -> &Arc<FdmMesherComposite> {
        &self.mesher
    }

    #[inline]
    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    #[inline]
    pub fn diag(&self) -> &[f64] {
        &self.diag
    }

    #[inline]
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Flat indices ordered so that `direction` varies fastest.
    #[inline]
    pub fn reverse_index(&self) -> &[usize] {
        &self.reverse_index
    }

    /// Overwrites the three bands at grid point `i`.
    pub(crate) fn set_row(&mut self, i: usize, lower: f64, diag: f64, upper: f64) {
        self.lower[i] = lower;
        self.diag[i] = diag;
        self.upper[i] = upper;
    }

    fn check_compatible(&self, other: &Self) -> Result<(), FdmError> {
        if self.direction != other.direction || self.size() != other.size() {
            return Err(FdmError::InconsistentOperator(format!(
                "operators differ: direction {} vs {}, size {} vs {}",
                self.direction,
                other.direction,
                self.size(),
                other.size()
            )));
        }
        Ok(())
    }

    /// `self = a * x + y + diag(b)`; `a` and `b` may be empty, scalar or full length.
    pub fn axpyb(
        &mut self,
        a: &[f64],
        x: &TripleBandLinearOp,
        y: &TripleBandLinearOp,
        b: &[f64],
    ) -> Result<(), FdmError> {
        let size = self.size();
        x.check_compatible(self)?;
        y.check_compatible(self)?;
        let a = Coefficients::from_slice("a", a, size)?;
        let b = Coefficients::from_slice("b", b, size)?;

        for i in 0..size {
            let (mut lower, mut diag, mut upper) = (y.lower[i], y.diag[i], y.upper[i]);
            if let Some(s) = a.at(i) {
                lower += s * x.lower[i];
                diag += s * x.diag[i];
                upper += s * x.upper[i];
            }
            if let Some(shift) = b.at(i) {
                diag += shift;
            }
            self.set_row(i, lower, diag, upper);
        }
        Ok(())
    }

    /// Row scaling `diag(u) * L`.
    pub fn mult(&self, u: &[f64]) -> Result<Self, FdmError> {
        check_len("u", u, self.size())?;
        let scale = |band: &[f64]| -> Vec<f64> {
            band.iter().zip(u).map(|(v, s)| v * s).collect()
        };
        Ok(self.with_bands(scale(&self.lower), scale(&self.diag), scale(&self.upper)))
    }

    /// Column scaling `L * diag(u)`.
    pub fn mult_r(&self, u: &[f64]) -> Result<Self, FdmError> {
        check_len("u", u, self.size())?;
        let size = self.size();
        let lower: Vec<f64> = (0..size).map(|i| self.lower[i] * u[self.i0[i]]).collect();
        let diag: Vec<f64> = (0..size).map(|i| self.diag[i] * u[i]).collect();
        let upper: Vec<f64> = (0..size).map(|i| self.upper[i] * u[self.i2[i]]).collect();
        Ok(self.with_bands(lower, diag, upper))
    }

    /// Band-wise sum with an operator along the same direction.
    pub fn add(&self, m: &TripleBandLinearOp) -> Result<Self, FdmError> {
        self.check_compatible(m)?;
        let sum = |l: &[f64], r: &[f64]| -> Vec<f64> {
            l.iter().zip(r).map(|(x, y)| x + y).collect()
        };
        Ok(self.with_bands(
            sum(&self.lower, &m.lower),
            sum(&self.diag, &m.diag),
            sum(&self.upper, &m.upper),
        ))
    }

    pub fn add_diagonal(&self, u: &[f64]) -> Result<Self, FdmError> {
        check_len("u", u, self.size())?;
        let diag: Vec<f64> = self.diag.iter().zip(u).map(|(d, v)| d + v).collect();
        Ok(self.with_bands(self.lower.clone(), diag, self.upper.clone()))
    }

    /// Solves `(a L + b I) x = r` line by line along `direction` with the
    /// Thomas algorithm.
    pub fn solve_splitting(&self, r: &[f64], a: f64, b: f64) -> Result<Vec<f64>, FdmError> {
        let size = self.size();
        check_len("r", r, size)?;
        self.check_line_ends()?;

        let rev = &self.reverse_index;
        let mut ret = vec![0.0; size];
        let mut tmp = vec![0.0; size];

        let mut rim1 = rev[0];
        let pivot = a * self.diag[rim1] + b;
        if pivot == 0.0 {
            return Err(FdmError::numerical("zero pivot in tridiagonal solve"));
        }
        let mut bet = 1.0 / pivot;
        ret[rim1] = r[rim1] * bet;

        for j in 1..size {
            let ri = rev[j];
            tmp[j] = a * self.upper[rim1] * bet;
            let pivot = b + a * (self.diag[ri] - tmp[j] * self.lower[ri]);
            if pivot == 0.0 {
                return Err(FdmError::numerical("zero pivot in tridiagonal solve"));
            }
            bet = 1.0 / pivot;
            ret[ri] = (r[ri] - a * self.lower[ri] * ret[rim1]) * bet;
            rim1 = ri;
        }

        for j in (0..size.saturating_sub(1)).rev() {
            ret[rev[j]] -= tmp[j + 1] * ret[rev[j + 1]];
        }

        Ok(ret)
    }

    /// The lines of the splitting solve are decoupled only if no band reaches
    /// across an axis end.
    fn check_line_ends(&self) -> Result<(), FdmError> {
        let line = self.mesher.layout().dim()[self.direction];
        for (j, &i) in self.reverse_index.iter().enumerate() {
            let c = j % line;
            if c == 0 && self.lower[i] != 0.0 {
                return Err(FdmError::InconsistentOperator(format!(
                    "lower band nonzero at the first node of a line (index {i})"
                )));
            }
            if c == line - 1 && self.upper[i] != 0.0 {
                return Err(FdmError::InconsistentOperator(format!(
                    "upper band nonzero at the last node of a line (index {i})"
                )));
            }
        }
        Ok(())
    }
}

impl FdmLinearOp for TripleBandLinearOp {
    fn apply(&self, r: &[f64]) -> Result<Vec<f64>, FdmError> {
        check_len("r", r, self.size())?;
        let row = |i: usize| {
            r[self.i0[i]] * self.lower[i] + r[i] * self.diag[i] + r[self.i2[i]] * self.upper[i]
        };

        #[cfg(feature = "parallel")]
        let out: Vec<f64> = (0..self.size()).into_par_iter().map(row).collect();
        #[cfg(not(feature = "parallel"))]
        let out: Vec<f64> = (0..self.size()).map(row).collect();

        Ok(out)
    }

    fn to_matrix(&self) -> CsrMatrix<f64> {
        let size = self.size();
        let mut coo = CooMatrix::new(size, size);
        for i in 0..size {
            coo.push(i, self.i0[i], self.lower[i]);
            coo.push(i, i, self.diag[i]);
            coo.push(i, self.i2[i], self.upper[i]);
        }
        CsrMatrix::from(&coo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fdm::meshers::{Mesher1d, Uniform1dMesher};
    use approx::assert_relative_eq;

    fn mesher_2d() -> Arc<FdmMesherComposite> {
        let x: Arc<dyn Mesher1d> = Arc::new(Uniform1dMesher::new(0.0, 1.0, 4).unwrap());
        let y: Arc<dyn Mesher1d> = Arc::new(Uniform1dMesher::new(0.0, 2.0, 3).unwrap());
        Arc::new(FdmMesherComposite::new(vec![x, y]).unwrap())
    }

    fn random_like_band(op: &TripleBandLinearOp, seed: f64) -> TripleBandLinearOp {
        let mut op = op.clone();
        let layout = op.mesher().layout().clone();
        let last = layout.dim()[op.direction()] - 1;
        for iter in layout.iter() {
            let i = iter.index();
            let c = iter.coordinates()[op.direction()];
            let f = (i as f64 + seed).sin();
            let lower = if c == 0 { 0.0 } else { 0.3 * f };
            let upper = if c == last { 0.0 } else { -0.2 * f };
            op.set_row(i, lower, 2.0 + f, upper);
        }
        op
    }

    #[test]
    fn reverse_index_makes_direction_fastest() {
        let op = TripleBandLinearOp::new(1, mesher_2d()).unwrap();
        assert_eq!(&op.reverse_index()[..6], &[0, 4, 8, 1, 5, 9]);
        let op0 = TripleBandLinearOp::new(0, mesher_2d()).unwrap();
        assert_eq!(op0.reverse_index(), (0..12).collect::<Vec<_>>().as_slice());
        assert!(TripleBandLinearOp::new(2, mesher_2d()).is_err());
    }

    #[test]
    fn solve_splitting_inverts_shifted_operator() {
        for direction in 0..2 {
            let base = TripleBandLinearOp::new(direction, mesher_2d()).unwrap();
            let op = random_like_band(&base, direction as f64);
            let r: Vec<f64> = (0..12).map(|i| (i as f64 * 0.7).cos()).collect();
            let (a, b) = (0.4, 1.3);

            let x = op.solve_splitting(&r, a, b).unwrap();
            let lx = op.apply(&x).unwrap();
            for i in 0..12 {
                assert_relative_eq!(a * lx[i] + b * x[i], r[i], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn guard_rejects_bands_across_line_ends() {
        let mut op = TripleBandLinearOp::new(0, mesher_2d()).unwrap();
        op.set_row(4, 1.0, 1.0, 0.0);
        assert!(matches!(
            op.solve_splitting(&[1.0; 12], 1.0, 1.0),
            Err(FdmError::InconsistentOperator(_))
        ));

        // index 9 is (1, 2), the last node of its line along y
        let mut op = TripleBandLinearOp::new(1, mesher_2d()).unwrap();
        op.set_row(5, 0.5, 1.0, 0.5);
        assert!(op.solve_splitting(&[1.0; 12], 1.0, 1.0).is_ok());
        op.set_row(9, 0.5, 1.0, 0.5);
        assert!(matches!(
            op.solve_splitting(&[1.0; 12], 1.0, 1.0),
            Err(FdmError::InconsistentOperator(_))
        ));
    }

    #[test]
    fn zero_pivot_is_a_numerical_error() {
        let op = TripleBandLinearOp::new(0, mesher_2d()).unwrap();
        assert!(matches!(
            op.solve_splitting(&[1.0; 12], 1.0, 0.0),
            Err(FdmError::NumericalError(_))
        ));
    }

    #[test]
    fn axpyb_broadcasts_scalars() {
        let base = TripleBandLinearOp::new(0, mesher_2d()).unwrap();
        let x = random_like_band(&base, 0.5);
        let y = random_like_band(&base, 1.5);
        let mut z = base.clone();
        z.axpyb(&[2.0], &x, &y, &[-0.25]).unwrap();
        for i in 0..12 {
            assert_relative_eq!(z.diag()[i], 2.0 * x.diag()[i] + y.diag()[i] - 0.25);
            assert_relative_eq!(z.lower()[i], 2.0 * x.lower()[i] + y.lower()[i]);
        }

        z.axpyb(&[], &x, &y, &[]).unwrap();
        assert_eq!(z.diag(), y.diag());
        assert!(z.axpyb(&[1.0, 2.0], &x, &y, &[]).is_err());
    }

    #[test]
    fn matrix_matches_apply() {
        let base = TripleBandLinearOp::new(1, mesher_2d()).unwrap();
        let op = random_like_band(&base, 0.25);
        let m = nalgebra_sparse::convert::serial::convert_csr_dense(&op.to_matrix());
        let r = nalgebra::DVector::from_iterator(12, (0..12).map(|i| 1.0 + i as f64));
        let expected = &m * &r;
        let got = op.apply(r.as_slice()).unwrap();
        for i in 0..12 {
            assert_relative_eq!(got[i], expected[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn mult_r_scales_columns() {
        let base = TripleBandLinearOp::new(0, mesher_2d()).unwrap();
        let op = random_like_band(&base, 0.1);
        let u: Vec<f64> = (0..12).map(|i| 1.0 + 0.1 * i as f64).collect();
        let r: Vec<f64> = (0..12).map(|i| (i as f64).sqrt()).collect();
        let ur: Vec<f64> = u.iter().zip(&r).map(|(a, b)| a * b).collect();
        let lhs = op.mult_r(&u).unwrap().apply(&r).unwrap();
        let rhs = op.apply(&ur).unwrap();
        for i in 0..12 {
            assert_relative_eq!(lhs[i], rhs[i], epsilon = 1e-12);
        }
    }
}
