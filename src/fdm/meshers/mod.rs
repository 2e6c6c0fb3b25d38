//! One-dimensional grids and their tensor-product composite.
//!
//! Every 1-D mesher stores its node locations together with the forward and
//! backward spacings; the spacings beyond the grid ends are `None`.

use std::fmt::Debug;

use crate::core::FdmError;

pub mod black_scholes;
pub mod composite;
pub mod concentrating;
pub mod heston_variance;
pub mod predefined;
pub mod short_rate;
pub mod uniform;

pub use black_scholes::{FdmBlackScholesMesher, FdmBlackScholesMesherParams};
pub use composite::FdmMesherComposite;
pub use concentrating::Concentrating1dMesher;
pub use heston_variance::{FdmHestonVarianceMesher, FdmHestonVarianceMesherParams};
pub use predefined::Predefined1dMesher;
pub use short_rate::{FdmShortRateMesher, FdmShortRateMesherParams};
pub use uniform::Uniform1dMesher;

/// Concentration request: grid density is increased around `point`.
///
/// `density` is relative to the mesh range; smaller values concentrate harder.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConcentrationPoint {
    pub point: f64,
    pub density: f64,
    /// Places a grid node exactly on `point`.
    #[serde(default)]
    pub required: bool,
}

impl ConcentrationPoint {
    pub fn new(point: f64, density: f64) -> Self {
        Self {
            point,
            density,
            required: false,
        }
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

/// Node locations of a 1-D grid with precomputed spacings.
#[derive(Debug, Clone, PartialEq)]
pub struct Fdm1dMesher {
    locations: Vec<f64>,
    dplus: Vec<Option<f64>>,
    dminus: Vec<Option<f64>>,
}

impl Fdm1dMesher {
    /// Builds the mesher from node locations produced inside the crate.
    /// Public construction goes through [`Predefined1dMesher`], which checks
    /// the ordering.
    pub(crate) fn from_locations(locations: Vec<f64>) -> Result<Self, FdmError> {
        if locations.is_empty() {
            return Err(FdmError::invalid("mesher needs at least one location"));
        }
        if locations.iter().any(|x| !x.is_finite()) {
            return Err(FdmError::numerical("mesher locations must be finite"));
        }

        let n = locations.len();
        let mut dplus = vec![None; n];
        let mut dminus = vec![None; n];
        for i in 0..n - 1 {
            let h = locations[i + 1] - locations[i];
            dplus[i] = Some(h);
            dminus[i + 1] = Some(h);
        }

        Ok(Self {
            locations,
            dplus,
            dminus,
        })
    }

    /// Fails unless the locations increase strictly.
    pub(crate) fn ensure_strictly_increasing(&self) -> Result<(), FdmError> {
        if let Some(i) = self.locations.windows(2).position(|w| w[1] <= w[0]) {
            return Err(FdmError::numerical(format!(
                "mesher locations not strictly increasing at node {}: {} -> {}",
                i,
                self.locations[i],
                self.locations[i + 1]
            )));
        }
        Ok(())
    }
}

/// Read access shared by every 1-D mesher.
pub trait Mesher1d: Debug + Send + Sync {
    fn grid(&self) -> &Fdm1dMesher;

    #[inline]
    fn size(&self) -> usize {
        self.grid().locations.len()
    }

    #[inline]
    fn location(&self, i: usize) -> f64 {
        self.grid().locations[i]
    }

    #[inline]
    fn locations(&self) -> &[f64] {
        &self.grid().locations
    }

    /// `x[i+1] - x[i]`, `None` at the last node.
    #[inline]
    fn dplus(&self, i: usize) -> Option<f64> {
        self.grid().dplus[i]
    }

    /// `x[i] - x[i-1]`, `None` at the first node.
    #[inline]
    fn dminus(&self, i: usize) -> Option<f64> {
        self.grid().dminus[i]
    }
}

impl Mesher1d for Fdm1dMesher {
    #[inline]
    fn grid(&self) -> &Fdm1dMesher {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spacings_are_optional_at_the_ends() {
        let m = Fdm1dMesher::from_locations(vec![0.0, 0.5, 2.0]).unwrap();
        assert_eq!(m.size(), 3);
        assert_eq!(m.dminus(0), None);
        assert_eq!(m.dplus(0), Some(0.5));
        assert_eq!(m.dminus(2), Some(1.5));
        assert_eq!(m.dplus(2), None);
        for i in 0..m.size() - 1 {
            assert_eq!(m.dplus(i), m.dminus(i + 1));
        }
    }

    #[test]
    fn monotonicity_check() {
        let m = Fdm1dMesher::from_locations(vec![0.0, 1.0, 1.0]).unwrap();
        assert!(matches!(
            m.ensure_strictly_increasing(),
            Err(FdmError::NumericalError(_))
        ));
        assert!(Fdm1dMesher::from_locations(vec![]).is_err());
    }

    #[test]
    fn concentration_point_deserializes_without_required_flag() {
        let cp: ConcentrationPoint =
            serde_json::from_str(r#"{"point": 100.0, "density": 0.1}"#).unwrap();
        assert_eq!(cp, ConcentrationPoint::new(100.0, 0.1));
    }
}
