use crate::core::FdmError;

use super::{Fdm1dMesher, Mesher1d};

/// Grid on caller-supplied, strictly increasing locations.
#[derive(Debug, Clone, PartialEq)]
pub struct Predefined1dMesher {
    grid: Fdm1dMesher,
}

impl Predefined1dMesher {
    pub fn new(locations: Vec<f64>) -> Result<Self, FdmError> {
        if locations.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(FdmError::invalid(
                "predefined locations must be strictly increasing",
            ));
        }
        Ok(Self {
            grid: Fdm1dMesher::from_locations(locations)?,
        })
    }
}

impl Mesher1d for Predefined1dMesher {
    #[inline]
    fn grid(&self) -> &Fdm1dMesher {
        &self.grid
    }
}
