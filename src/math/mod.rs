//! Numerical building blocks used by mesh generation: root finding, ODE
//! integration, interpolation, quadrature and distribution functions.

pub mod distributions;
pub mod interpolation;
pub mod normal;
pub mod ode;
pub mod quadrature;
pub mod solvers;

pub use distributions::{InverseNonCentralChiSquare, NonCentralChiSquare};
pub use interpolation::{ExtrapolationMode, InterpolationError, LinearInterpolator};
pub use normal::{inverse_cumulative_normal, normal_cdf};
pub use ode::AdaptiveRungeKutta;
pub use quadrature::GaussLegendre;
pub use solvers::Brent;

#[derive(Debug, Clone, PartialEq)]
pub enum MathError {
    NonConvergence(&'static str),
    StepSizeUnderflow,
    InvalidInput(&'static str),
}

/// Relative/absolute closeness test with `n` ulps-ish tolerance of `f64::EPSILON`.
#[inline]
pub fn close_n(x: f64, y: f64, n: u32) -> bool {
    if x == y {
        return true;
    }
    let diff = (x - y).abs();
    let tol = n as f64 * f64::EPSILON;
    if x == 0.0 || y == 0.0 {
        return diff < tol * tol;
    }
    diff <= tol * x.abs() && diff <= tol * y.abs()
}

#[inline]
pub fn close(x: f64, y: f64) -> bool {
    close_n(x, y, 42)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_handles_zero_and_relative_cases() {
        assert!(close(1.0, 1.0 + 1e-16));
        assert!(!close(1.0, 1.0 + 1e-10));
        assert!(close(0.0, 0.0));
        assert!(!close(0.0, 1e-10));
    }
}
