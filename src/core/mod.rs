//! Library-wide error type shared by meshers, operators and term structures.

use crate::math::MathError;
use crate::math::interpolation::InterpolationError;

/// Errors surfaced by mesh construction, operator assembly and splitting solves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FdmError {
    /// Precondition violation (bad bounds, size mismatch, missing parameter).
    InvalidInput(String),
    /// Non-convergence of an iterative numerical sub-procedure.
    ConvergenceFailure(String),
    /// Required market datum is unavailable (e.g. local vol outside its domain).
    MarketDataMissing(String),
    /// Numerical degeneracy (zero pivot, negative variance, non-monotone grid).
    NumericalError(String),
    /// Operator bands inconsistent with the requested algorithm.
    InconsistentOperator(String),
}

impl FdmError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub(crate) fn numerical(msg: impl Into<String>) -> Self {
        Self::NumericalError(msg.into())
    }

    /// Returns `true` for the iterative non-convergence variant.
    pub fn is_convergence_failure(&self) -> bool {
        matches!(self, Self::ConvergenceFailure(_))
    }
}

impl std::fmt::Display for FdmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::ConvergenceFailure(msg) => write!(f, "convergence failure: {msg}"),
            Self::MarketDataMissing(msg) => write!(f, "market data missing: {msg}"),
            Self::NumericalError(msg) => write!(f, "numerical error: {msg}"),
            Self::InconsistentOperator(msg) => write!(f, "inconsistent operator: {msg}"),
        }
    }
}

impl std::error::Error for FdmError {}

impl From<MathError> for FdmError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::NonConvergence(msg) => Self::ConvergenceFailure(msg.to_string()),
            MathError::StepSizeUnderflow => {
                Self::ConvergenceFailure("step size underflow in ode integration".to_string())
            }
            MathError::InvalidInput(msg) => Self::InvalidInput(msg.to_string()),
        }
    }
}

impl From<InterpolationError> for FdmError {
    fn from(err: InterpolationError) -> Self {
        match err {
            InterpolationError::InvalidInput(msg) => Self::InvalidInput(msg.to_string()),
        }
    }
}
