use crate::core::FdmError;

use super::{Fdm1dMesher, Mesher1d};

/// Equally spaced grid on `[start, end]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Uniform1dMesher {
    grid: Fdm1dMesher,
}

impl Uniform1dMesher {
    pub fn new(start: f64, end: f64, size: usize) -> Result<Self, FdmError> {
        if !(end > start) {
            return Err(FdmError::invalid("end must be larger than start"));
        }
        if size < 2 {
            return Err(FdmError::invalid("uniform mesher needs at least two points"));
        }

        let dx = (end - start) / (size - 1) as f64;
        let mut locations: Vec<f64> = (0..size).map(|i| start + i as f64 * dx).collect();
        locations[size - 1] = end;

        Ok(Self {
            grid: Fdm1dMesher::from_locations(locations)?,
        })
    }
}

impl Mesher1d for Uniform1dMesher {
    #[inline]
    fn grid(&self) -> &Fdm1dMesher {
        &self.grid
    }
}
