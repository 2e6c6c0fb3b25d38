//! Piecewise-linear interpolation on strictly increasing nodes.

/// Behaviour to the left of the first and right of the last node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtrapolationMode {
    /// End values are held.
    Flat,
    /// End segments are extended.
    Linear,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InterpolationError {
    InvalidInput(&'static str),
}

/// Linear interpolant through `(x[i], y[i])`.
#[derive(Debug, Clone)]
pub struct LinearInterpolator {
    x: Vec<f64>,
    y: Vec<f64>,
    extrapolation: ExtrapolationMode,
}

impl LinearInterpolator {
    pub fn new(
        x: Vec<f64>,
        y: Vec<f64>,
        extrapolation: ExtrapolationMode,
    ) -> Result<Self, InterpolationError> {
        if x.len() < 2 || x.len() != y.len() {
            return Err(InterpolationError::InvalidInput(
                "need at least two nodes and one ordinate per node",
            ));
        }
        if !x.iter().chain(&y).all(|v| v.is_finite()) {
            return Err(InterpolationError::InvalidInput("nodes must be finite"));
        }
        if x.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(InterpolationError::InvalidInput(
                "abscissas must be strictly increasing",
            ));
        }
        Ok(Self {
            x,
            y,
            extrapolation,
        })
    }

    /// Index `i` of the segment `[x[i], x[i+1]]` used for `xq`.
    #[inline]
    fn locate(&self, xq: f64) -> usize {
        let upper = self.x.partition_point(|v| *v <= xq);
        upper.clamp(1, self.x.len() - 1) - 1
    }

    pub fn value(&self, xq: f64) -> f64 {
        let n = self.x.len();
        if self.extrapolation == ExtrapolationMode::Flat {
            if xq <= self.x[0] {
                return self.y[0];
            }
            if xq >= self.x[n - 1] {
                return self.y[n - 1];
            }
        }
        let i = self.locate(xq);
        let w = (xq - self.x[i]) / (self.x[i + 1] - self.x[i]);
        self.y[i] + w * (self.y[i + 1] - self.y[i])
    }

    pub fn nodes(&self) -> (&[f64], &[f64]) {
        (&self.x, &self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn reproduces_nodes_and_interpolates_between() {
        let f = LinearInterpolator::new(
            vec![0.0, 0.5, 1.0],
            vec![0.0, 0.2, 1.0],
            ExtrapolationMode::Linear,
        )
        .unwrap();
        assert_eq!(f.value(0.5), 0.2);
        assert_relative_eq!(f.value(1.0), 1.0, epsilon = 1e-15);
        assert_relative_eq!(f.value(0.25), 0.1, epsilon = 1e-15);
        assert_relative_eq!(f.value(0.75), 0.6, epsilon = 1e-15);
    }

    #[test]
    fn end_behaviour_follows_mode() {
        let x = vec![1.0, 2.0, 3.0];
        let y = vec![1.0, 3.0, 4.0];
        let flat = LinearInterpolator::new(x.clone(), y.clone(), ExtrapolationMode::Flat).unwrap();
        let linear = LinearInterpolator::new(x, y, ExtrapolationMode::Linear).unwrap();
        assert_eq!(flat.value(0.0), 1.0);
        assert_eq!(flat.value(5.0), 4.0);
        assert_relative_eq!(linear.value(0.0), -1.0, epsilon = 1e-14);
        assert_relative_eq!(linear.value(5.0), 6.0, epsilon = 1e-14);
    }

    #[test]
    fn repeated_abscissas_are_rejected() {
        assert!(
            LinearInterpolator::new(vec![0.0, 0.0], vec![1.0, 2.0], ExtrapolationMode::Flat)
                .is_err()
        );
        assert!(LinearInterpolator::new(vec![0.0], vec![1.0], ExtrapolationMode::Flat).is_err());
    }
}
