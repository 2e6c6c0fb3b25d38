//! Tensor product of 1-D meshers over a flat layout.

use std::sync::Arc;

use crate::core::FdmError;
use crate::fdm::layout::{FdmLinearOpIterator, FdmLinearOpLayout};

use super::Mesher1d;

/// N-dimensional mesher; axis `i` of the layout is spanned by `meshers[i]`.
#[derive(Debug, Clone)]
pub struct FdmMesherComposite {
    layout: FdmLinearOpLayout,
    meshers: Vec<Arc<dyn Mesher1d>>,
}

impl FdmMesherComposite {
    pub fn new(meshers: Vec<Arc<dyn Mesher1d>>) -> Result<Self, FdmError> {
        let layout = FdmLinearOpLayout::new(meshers.iter().map(|m| m.size()).collect())?;
        Ok(Self { layout, meshers })
    }

    /// Uses an existing layout; its axes must match the mesher sizes.
    pub fn with_layout(
        layout: FdmLinearOpLayout,
        meshers: Vec<Arc<dyn Mesher1d>>,
    ) -> Result<Self, FdmError> {
        if layout.dim().len() != meshers.len() {
            return Err(FdmError::invalid(format!(
                "layout has {} axes but {} meshers were given",
                layout.dim().len(),
                meshers.len()
            )));
        }
        for (i, (d, m)) in layout.dim().iter().zip(&meshers).enumerate() {
            if *d != m.size() {
                return Err(FdmError::invalid(format!(
                    "inconsistent layout and mesher size on axis {i}: {d} vs {}",
                    m.size()
                )));
            }
        }
        Ok(Self { layout, meshers })
    }

    /// Single-axis composite.
    pub fn from_mesher(mesher: impl Mesher1d + 'static) -> Result<Self, FdmError> {
        let mesher: Arc<dyn Mesher1d> = Arc::new(mesher);
        Self::new(vec![mesher])
    }

    #[inline]
    pub fn layout(&self) -> &FdmLinearOpLayout {
        &self.layout
    }

    #[inline]
    pub fn meshers(&self) -> &[Arc<dyn Mesher1d>] {
        &self.meshers
    }

    #[inline]
    pub fn dplus(&self, iter: &FdmLinearOpIterator, direction: usize) -> Option<f64> {
        self.meshers[direction].dplus(iter.coordinates()[direction])
    }

    #[inline]
    pub fn dminus(&self, iter: &FdmLinearOpIterator, direction: usize) -> Option<f64> {
        self.meshers[direction].dminus(iter.coordinates()[direction])
    }

    #[inline]
    pub fn location(&self, iter: &FdmLinearOpIterator, direction: usize) -> f64 {
        self.meshers[direction].location(iter.coordinates()[direction])
    }

    /// Coordinate along `direction` at every flat index.
    pub fn locations(&self, direction: usize) -> Vec<f64> {
        let mesher = &self.meshers[direction];
        self.layout
            .iter()
            .map(|iter| mesher.location(iter.coordinates()[direction]))
            .collect()
    }
}
