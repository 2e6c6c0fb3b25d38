//! Sparse differential operators on composite meshes and the model operators
//! built from them.
//!
//! Time-stepping schemes only see [`FdmLinearOpComposite`]: one operator per
//! axis for the splitting steps plus the mixed remainder.

use std::fmt::Debug;

use nalgebra_sparse::CsrMatrix;

use crate::core::FdmError;

pub mod black_scholes;
pub mod derivatives;
pub mod heston;
pub mod hull_white;
pub mod nine_point;
pub mod triple_band;

pub use black_scholes::FdmBlackScholesOp;
pub use derivatives::{FirstDerivativeOp, SecondDerivativeOp, SecondOrderMixedDerivativeOp};
pub use heston::{FdmHestonEquityPart, FdmHestonOp, FdmHestonVariancePart};
pub use hull_white::FdmHullWhiteOp;
pub use nine_point::NinePointLinearOp;
pub use triple_band::TripleBandLinearOp;

/// Linear operator on flattened grid vectors.
pub trait FdmLinearOp: Debug + Send + Sync {
    fn apply(&self, r: &[f64]) -> Result<Vec<f64>, FdmError>;

    /// Sparse matrix with `to_matrix() * r == apply(r)`.
    fn to_matrix(&self) -> CsrMatrix<f64>;
}

/// Operator split by direction, consumed by ADI-type time steppers.
///
/// `apply == sum_d apply_direction(d) + apply_mixed`.
pub trait FdmLinearOpComposite: FdmLinearOp {
    /// Number of directions.
    fn size(&self) -> usize;

    /// Rebuilds the time-dependent coefficients for the slice `[t1, t2]`, `t1 <= t2`.
    fn set_time(&mut self, t1: f64, t2: f64) -> Result<(), FdmError>;

    fn apply_mixed(&self, r: &[f64]) -> Result<Vec<f64>, FdmError>;

    fn apply_direction(&self, direction: usize, r: &[f64]) -> Result<Vec<f64>, FdmError>;

    /// Solves `(a * L_direction + I) x = r`.
    fn solve_splitting(&self, direction: usize, r: &[f64], a: f64) -> Result<Vec<f64>, FdmError>;

    fn preconditioner(&self, r: &[f64], dt: f64) -> Result<Vec<f64>, FdmError>;

    /// Per-direction matrices followed by the mixed part.
    fn to_matrix_decomp(&self) -> Vec<CsrMatrix<f64>>;
}

/// Sum of the decomposition, the full operator as one matrix.
pub(crate) fn sum_decomp(decomp: Vec<CsrMatrix<f64>>) -> CsrMatrix<f64> {
    let mut parts = decomp.into_iter();
    match parts.next() {
        Some(first) => parts.fold(first, |acc, m| &acc + &m),
        None => CsrMatrix::zeros(0, 0),
    }
}

#[inline]
pub(crate) fn check_len(what: &str, v: &[f64], size: usize) -> Result<(), FdmError> {
    if v.len() != size {
        return Err(FdmError::invalid(format!(
            "{what} has length {}, expected {size}",
            v.len()
        )));
    }
    Ok(())
}

/// Vector argument that is absent, a broadcast scalar or one value per grid point.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Coefficients<'a> {
    Absent,
    Scalar(f64),
    Full(&'a [f64]),
}

impl<'a> Coefficients<'a> {
    pub(crate) fn from_slice(what: &str, v: &'a [f64], size: usize) -> Result<Self, FdmError> {
        match v.len() {
            0 => Ok(Self::Absent),
            1 => Ok(Self::Scalar(v[0])),
            n if n == size => Ok(Self::Full(v)),
            n => Err(FdmError::invalid(format!(
                "{what} must have length 0, 1 or {size}, got {n}"
            ))),
        }
    }

    #[inline]
    pub(crate) fn at(&self, i: usize) -> Option<f64> {
        match self {
            Self::Absent => None,
            Self::Scalar(v) => Some(*v),
            Self::Full(v) => Some(v[i]),
        }
    }
}
