//! Nine-point stencil on the plane spanned by two axes.

use std::sync::Arc;

use nalgebra_sparse::{CooMatrix, CsrMatrix};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::core::FdmError;
use crate::fdm::meshers::FdmMesherComposite;

use super::{FdmLinearOp, check_len};

/// Stencil slot of the neighbour at offsets `(o0, o1)` along `(d0, d1)`,
/// each offset in `-1..=1`.
#[inline]
pub(crate) fn slot(o0: isize, o1: isize) -> usize {
    ((o0 + 1) + 3 * (o1 + 1)) as usize
}

/// Operator `(L r)[i] = sum_{o0, o1} a[i][o0, o1] r[i + o0 e_d0 + o1 e_d1]`
/// with mirrored neighbours at the mesh boundary.
#[derive(Debug, Clone)]
pub struct NinePointLinearOp {
    d0: usize,
    d1: usize,
    indices: Arc<Vec<[usize; 9]>>,
    coefficients: Vec<[f64; 9]>,
    mesher: Arc<FdmMesherComposite>,
}

impl NinePointLinearOp {
    /// Zero operator on the `(d0, d1)` plane.
    pub fn new(d0: usize, d1: usize, mesher: Arc<FdmMesherComposite>) -> Result<Self, FdmError> {
        let layout = mesher.layout();
        let n_dims = layout.dim().len();
        if d0 >= n_dims || d1 >= n_dims {
            return Err(FdmError::invalid(format!(
                "directions ({d0}, {d1}) out of range for a {n_dims}-dimensional mesh"
            )));
        }
        if d0 == d1 {
            return Err(FdmError::invalid("nine-point operator needs two distinct axes"));
        }

        let mut indices = vec![[0usize; 9]; layout.size()];
        for iter in layout.iter() {
            let i = iter.index();
            let cell = &mut indices[i];
            for o1 in -1..=1isize {
                for o0 in -1..=1isize {
                    cell[slot(o0, o1)] = match (o0, o1) {
                        (0, 0) => i,
                        (0, _) => layout.neighbourhood(&iter, d1, o1),
                        (_, 0) => layout.neighbourhood(&iter, d0, o0),
                        _ => layout.neighbourhood2(&iter, d0, o0, d1, o1),
                    };
                }
            }
        }

        Ok(Self {
            d0,
            d1,
            indices: Arc::new(indices),
            coefficients: vec![[0.0; 9]; layout.size()],
            mesher,
        })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.coefficients.len()
    }

    #[inline]
    pub fn directions(&self) -> (usize, usize) {
        (self.d0, self.d1)
    }

    #[inline]
    pub fn mesher(&self) -> &Arc<FdmMesherComposite> {
        &self.mesher
    }

    /// Coefficient of the `(o0, o1)` neighbour in row `i`.
    #[inline]
    pub fn coefficient(&self, i: usize, o0: isize, o1: isize) -> f64 {
        self.coefficients[i][slot(o0, o1)]
    }

    pub(crate) fn set_stencil(&mut self, i: usize, stencil: [f64; 9]) {
        self.coefficients[i] = stencil;
    }

    /// Row scaling `diag(u) * L`.
    pub fn mult(&self, u: &[f64]) -> Result<Self, FdmError> {
        check_len("u", u, self.size())?;
        let coefficients = self
            .coefficients
            .iter()
            .zip(u)
            .map(|(row, s)| row.map(|a| a * s))
            .collect();
        Ok(Self {
            d0: self.d0,
            d1: self.d1,
            indices: Arc::clone(&self.indices),
            coefficients,
            mesher: Arc::clone(&self.mesher),
        })
    }
}

impl FdmLinearOp for NinePointLinearOp {
    fn apply(&self, r: &[f64]) -> Result<Vec<f64>, FdmError> {
        check_len("r", r, self.size())?;
        let row = |i: usize| -> f64 {
            self.indices[i]
                .iter()
                .zip(&self.coefficients[i])
                .map(|(&j, a)| a * r[j])
                .sum()
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
        for (i, (cols, row)) in self.indices.iter().zip(&self.coefficients).enumerate() {
            for (&j, &a) in cols.iter().zip(row) {
                coo.push(i, j, a);
            }
        }
        CsrMatrix::from(&coo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fdm::meshers::{Mesher1d, Uniform1dMesher};

    fn mesher() -> Arc<FdmMesherComposite> {
        let x: Arc<dyn Mesher1d> = Arc::new(Uniform1dMesher::new(0.0, 1.0, 3).unwrap());
        let y: Arc<dyn Mesher1d> = Arc::new(Uniform1dMesher::new(0.0, 1.0, 4).unwrap());
        Arc::new(FdmMesherComposite::new(vec![x, y]).unwrap())
    }

    #[test]
    fn stencil_indices_use_mirrored_neighbours() {
        let op = NinePointLinearOp::new(0, 1, mesher()).unwrap();
        // interior point (1, 1) has flat index 4
        let cell = op.indices[4];
        assert_eq!(cell[slot(-1, -1)], 0);
        assert_eq!(cell[slot(1, -1)], 2);
        assert_eq!(cell[slot(0, 1)], 7);
        assert_eq!(cell[slot(1, 1)], 8);
        // corner (0, 0): the (-1, -1) neighbour mirrors to (1, 1)
        assert_eq!(op.indices[0][slot(-1, -1)], 4);
        assert_eq!(op.indices[0][slot(-1, 0)], 1);
    }

    #[test]
    fn apply_sums_weighted_neighbours() {
        let mut op = NinePointLinearOp::new(0, 1, mesher()).unwrap();
        let mut stencil = [0.0; 9];
        stencil[slot(1, 1)] = 2.0;
        stencil[slot(-1, 0)] = -1.0;
        op.set_stencil(4, stencil);
        let r: Vec<f64> = (0..12).map(|i| i as f64).collect();
        let out = op.apply(&r).unwrap();
        assert_eq!(out[4], 2.0 * 8.0 - 3.0);
        assert_eq!(out[0], 0.0);

        let scaled = op.mult(&vec![0.5; 12]).unwrap();
        assert_eq!(scaled.apply(&r).unwrap()[4], 0.5 * out[4]);
        assert_eq!(scaled.coefficient(4, 1, 1), 1.0);
    }

    #[test]
    fn rejects_equal_axes() {
        assert!(NinePointLinearOp::new(1, 1, mesher()).is_err());
        assert!(NinePointLinearOp::new(0, 2, mesher()).is_err());
    }
}
