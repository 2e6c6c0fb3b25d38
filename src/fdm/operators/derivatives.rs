//! Finite-difference stencils on non-uniform grids.
//!
//! With `hm = x[i] - x[i-1]` and `hp = x[i+1] - x[i]` the interior stencils
//! are the exact derivatives of the quadratic through the three nodes. At the
//! first node the first derivative is the forward difference, at the last node
//! the backward one. The second derivative vanishes on both edges.

use std::sync::Arc;

use crate::core::FdmError;
use crate::fdm::meshers::FdmMesherComposite;

use super::nine_point::{NinePointLinearOp, slot};
use super::triple_band::TripleBandLinearOp;

/// `(lower, diag, upper)` weights of `d/dx`.
#[inline]
pub(crate) fn first_derivative_weights(hm: Option<f64>, hp: Option<f64>) -> [f64; 3] {
    match (hm, hp) {
        (Some(hm), Some(hp)) => [
            -hp / (hm * (hm + hp)),
            (hp - hm) / (hm * hp),
            hm / (hp * (hm + hp)),
        ],
        (None, Some(hp)) => [0.0, -1.0 / hp, 1.0 / hp],
        (Some(hm), None) => [-1.0 / hm, 1.0 / hm, 0.0],
        (None, None) => [0.0; 3],
    }
}

/// `(lower, diag, upper)` weights of `d^2/dx^2`.
#[inline]
pub(crate) fn second_derivative_weights(hm: Option<f64>, hp: Option<f64>) -> [f64; 3] {
    match (hm, hp) {
        (Some(hm), Some(hp)) => [
            2.0 / (hm * (hm + hp)),
            -2.0 / (hm * hp),
            2.0 / (hp * (hm + hp)),
        ],
        _ => [0.0; 3],
    }
}

/// First derivative along one axis.
#[derive(Debug, Clone, Copy)]
pub struct FirstDerivativeOp;

impl FirstDerivativeOp {
    #[allow(clippy::new_ret_no_self)]
    pub fn new(
        direction: usize,
        mesher: Arc<FdmMesherComposite>,
    ) -> Result<TripleBandLinearOp, FdmError> {
        build(direction, mesher, first_derivative_weights)
    }
}

/// Second derivative along one axis.
#[derive(Debug, Clone, Copy)]
pub struct SecondDerivativeOp;

impl SecondDerivativeOp {
    #[allow(clippy::new_ret_no_self)]
    pub fn new(
        direction: usize,
        mesher: Arc<FdmMesherComposite>,
    ) -> Result<TripleBandLinearOp, FdmError> {
        build(direction, mesher, second_derivative_weights)
    }
}

fn build(
    direction: usize,
    mesher: Arc<FdmMesherComposite>,
    weights: fn(Option<f64>, Option<f64>) -> [f64; 3],
) -> Result<TripleBandLinearOp, FdmError> {
    let mut op = TripleBandLinearOp::new(direction, Arc::clone(&mesher))?;
    for iter in mesher.layout().iter() {
        let hm = mesher.dminus(&iter, direction);
        let hp = mesher.dplus(&iter, direction);
        let [lower, diag, upper] = weights(hm, hp);
        op.set_row(iter.index(), lower, diag, upper);
    }
    Ok(op)
}

/// Cross derivative `d^2/(dx_d0 dx_d1)`.
///
/// The stencil is the tensor product of the first-derivative weights of both
/// axes, so the corner and edge rows pick up the one-sided differences.
#[derive(Debug, Clone, Copy)]
pub struct SecondOrderMixedDerivativeOp;

impl SecondOrderMixedDerivativeOp {
    #[allow(clippy::new_ret_no_self)]
    pub fn new(
        d0: usize,
        d1: usize,
        mesher: Arc<FdmMesherComposite>,
    ) -> Result<NinePointLinearOp, FdmError> {
        let mut op = NinePointLinearOp::new(d0, d1, Arc::clone(&mesher))?;
        for iter in mesher.layout().iter() {
            let w0 = first_derivative_weights(mesher.dminus(&iter, d0), mesher.dplus(&iter, d0));
            let w1 = first_derivative_weights(mesher.dminus(&iter, d1), mesher.dplus(&iter, d1));

            let mut stencil = [0.0; 9];
            for (k, a) in w0.iter().enumerate() {
                for (l, b) in w1.iter().enumerate() {
                    stencil[slot(k as isize - 1, l as isize - 1)] = a * b;
                }
            }
            op.set_stencil(iter.index(), stencil);
        }
        Ok(op)
    }
}
