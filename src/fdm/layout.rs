//! Index arithmetic for the flattened multi-dimensional grid.
//!
//! Axis 0 varies fastest: `index = sum_i coordinates[i] * spacing[i]` with
//! `spacing[0] = 1` and `spacing[i + 1] = dim[i] * spacing[i]`.

use crate::core::FdmError;

/// Shape and strides of an N-dimensional grid stored as one flat vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FdmLinearOpLayout {
    dim: Vec<usize>,
    spacing: Vec<usize>,
    size: usize,
}

impl FdmLinearOpLayout {
    pub fn new(dim: Vec<usize>) -> Result<Self, FdmError> {
        if dim.is_empty() {
            return Err(FdmError::invalid("layout needs at least one axis"));
        }
        if dim.iter().any(|&d| d == 0) {
            return Err(FdmError::invalid("layout axes must have at least one point"));
        }

        let mut spacing = Vec::with_capacity(dim.len());
        spacing.push(1usize);
        for i in 1..dim.len() {
            spacing.push(dim[i - 1] * spacing[i - 1]);
        }
        let size = spacing[dim.len() - 1] * dim[dim.len() - 1];

        Ok(Self { dim, spacing, size })
    }

    #[inline]
    pub fn dim(&self) -> &[usize] {
        &self.dim
    }

    #[inline]
    pub fn spacing(&self) -> &[usize] {
        &self.spacing
    }

    /// Total number of grid points.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Flat index of `coordinates`.
    pub fn index(&self, coordinates: &[usize]) -> Result<usize, FdmError> {
        if coordinates.len() != self.dim.len() {
            return Err(FdmError::invalid(format!(
                "expected {} coordinates, got {}",
                self.dim.len(),
                coordinates.len()
            )));
        }
        if coordinates.iter().zip(&self.dim).any(|(c, d)| c >= d) {
            return Err(FdmError::invalid("coordinate outside layout"));
        }
        Ok(coordinates
            .iter()
            .zip(&self.spacing)
            .map(|(c, s)| c * s)
            .sum())
    }

    /// Flat index of the neighbour `offset` steps along axis `i`, mirrored at the boundaries.
    pub fn neighbourhood(&self, iter: &FdmLinearOpIterator, i: usize, offset: isize) -> usize {
        let coordinate = iter.coordinates[i];
        let reflected = reflect(coordinate, offset, self.dim[i]);
        iter.index - coordinate * self.spacing[i] + reflected * self.spacing[i]
    }

    /// Flat index of the neighbour displaced along two axes.
    pub fn neighbourhood2(
        &self,
        iter: &FdmLinearOpIterator,
        i1: usize,
        offset1: isize,
        i2: usize,
        offset2: isize,
    ) -> usize {
        let c1 = iter.coordinates[i1];
        let c2 = iter.coordinates[i2];
        let n1 = reflect(c1, offset1, self.dim[i1]);
        let n2 = reflect(c2, offset2, self.dim[i2]);
        iter.index - c1 * self.spacing[i1] - c2 * self.spacing[i2]
            + n1 * self.spacing[i1]
            + n2 * self.spacing[i2]
    }

    /// Neighbour along axis `i` as a full iterator.
    pub fn iter_neighbourhood(
        &self,
        iter: &FdmLinearOpIterator,
        i: usize,
        offset: isize,
    ) -> FdmLinearOpIterator {
        let mut coordinates = iter.coordinates.clone();
        coordinates[i] = reflect(coordinates[i], offset, self.dim[i]);
        FdmLinearOpIterator {
            index: self.neighbourhood(iter, i, offset),
            dim: self.dim.clone(),
            coordinates,
        }
    }

    /// Iterator positioned on the first grid point.
    pub fn begin(&self) -> FdmLinearOpIterator {
        FdmLinearOpIterator::new(self.dim.clone())
    }

    /// Past-the-end iterator; only its flat index is meaningful.
    pub fn end(&self) -> FdmLinearOpIterator {
        FdmLinearOpIterator {
            index: self.size,
            dim: self.dim.clone(),
            coordinates: vec![0; self.dim.len()],
        }
    }

    /// Visits every grid point in increasing flat index order.
    pub fn iter(&self) -> LayoutIter {
        LayoutIter {
            current: self.begin(),
            size: self.size,
        }
    }
}

#[inline]
fn reflect(coordinate: usize, offset: isize, dim: usize) -> usize {
    let n = coordinate as isize + offset;
    let last = dim as isize - 1;
    let mirrored = if n < 0 {
        -n
    } else if n > last {
        2 * last - n
    } else {
        n
    };
    // degenerate axes shorter than the offset stay on the grid
    mirrored.clamp(0, last) as usize
}

/// Position on the grid: flat index plus per-axis coordinates.
#[derive(Debug, Clone)]
pub struct FdmLinearOpIterator {
    index: usize,
    dim: Vec<usize>,
    coordinates: Vec<usize>,
}

impl FdmLinearOpIterator {
    pub fn new(dim: Vec<usize>) -> Self {
        let coordinates = vec![0; dim.len()];
        Self {
            index: 0,
            dim,
            coordinates,
        }
    }

    /// Iterator at `coordinates`, with the flat index supplied by the caller.
    pub fn with_coordinates(dim: Vec<usize>, coordinates: Vec<usize>, index: usize) -> Self {
        Self {
            index,
            dim,
            coordinates,
        }
    }

    /// Mixed-radix increment over `dim`.
    pub fn increment(&mut self) {
        self.index += 1;
        for (c, &d) in self.coordinates.iter_mut().zip(&self.dim) {
            *c += 1;
            if *c == d {
                *c = 0;
            } else {
                break;
            }
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn coordinates(&self) -> &[usize] {
        &self.coordinates
    }
}

impl PartialEq for FdmLinearOpIterator {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for FdmLinearOpIterator {}

/// Rust iterator adapter returned by [`FdmLinearOpLayout::iter`].
#[derive(Debug, Clone)]
pub struct LayoutIter {
    current: FdmLinearOpIterator,
    size: usize,
}

impl Iterator for LayoutIter {
    type Item = FdmLinearOpIterator;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.index >= self.size {
            return None;
        }
        let item = self.current.clone();
        self.current.increment();
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.size.saturating_sub(self.current.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for LayoutIter {}
