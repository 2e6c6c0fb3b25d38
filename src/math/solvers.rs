//! One-dimensional root finding: Brent's method with automatic bracketing.

use super::{MathError, close};

const GROWTH_FACTOR: f64 = 1.6;

/// Brent root finder.
///
/// `solve` expands a bracket around a guess before switching to the
/// inverse-quadratic/bisection iteration; `solve_bracketed` starts from an
/// explicit bracket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brent {
    max_evaluations: usize,
    lower_bound: Option<f64>,
    upper_bound: Option<f64>,
}

impl Default for Brent {
    fn default() -> Self {
        Self {
            max_evaluations: 100,
            lower_bound: None,
            upper_bound: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Bracket {
    x_min: f64,
    fx_min: f64,
    x_max: f64,
    fx_max: f64,
    evaluations: usize,
}

impl Brent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of function evaluations.
    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.max_evaluations = max_evaluations;
        self
    }

    /// Keeps bracket expansion above `lower_bound`.
    pub fn with_lower_bound(mut self, lower_bound: f64) -> Self {
        self.lower_bound = Some(lower_bound);
        self
    }

    /// Keeps bracket expansion below `upper_bound`.
    pub fn with_upper_bound(mut self, upper_bound: f64) -> Self {
        self.upper_bound = Some(upper_bound);
        self
    }

    fn enforce_bounds(&self, x: f64) -> f64 {
        let x = self.lower_bound.map_or(x, |lo| x.max(lo));
        self.upper_bound.map_or(x, |hi| x.min(hi))
    }

    /// Finds a root of `f` starting at `guess`, growing a bracket by `step`.
    pub fn solve<F>(&self, mut f: F, accuracy: f64, guess: f64, step: f64) -> Result<f64, MathError>
    where
        F: FnMut(f64) -> Result<f64, MathError>,
    {
        if !(accuracy.is_finite() && guess.is_finite() && step.is_finite()) {
            return Err(MathError::InvalidInput("solver arguments must be finite"));
        }
        let accuracy = accuracy.max(f64::EPSILON);

        let root = guess;
        let f_root = f(root)?;
        if close(f_root, 0.0) {
            return Ok(root);
        }

        let mut b = if f_root > 0.0 {
            let x_min = self.enforce_bounds(root - step);
            Bracket {
                fx_min: f(x_min)?,
                x_min,
                x_max: root,
                fx_max: f_root,
                evaluations: 2,
            }
        } else {
            let x_max = self.enforce_bounds(root + step);
            Bracket {
                x_min: root,
                fx_min: f_root,
                fx_max: f(x_max)?,
                x_max,
                evaluations: 2,
            }
        };

        let mut flip_flop = -1;
        while b.evaluations <= self.max_evaluations {
            if b.fx_min * b.fx_max <= 0.0 {
                if close(b.fx_min, 0.0) {
                    return Ok(b.x_min);
                }
                if close(b.fx_max, 0.0) {
                    return Ok(b.x_max);
                }
                return self.iterate(&mut f, accuracy, b);
            }
            if b.fx_min.abs() < b.fx_max.abs() {
                b.x_min = self.enforce_bounds(b.x_min + GROWTH_FACTOR * (b.x_min - b.x_max));
                b.fx_min = f(b.x_min)?;
            } else if b.fx_min.abs() > b.fx_max.abs() {
                b.x_max = self.enforce_bounds(b.x_max + GROWTH_FACTOR * (b.x_max - b.x_min));
                b.fx_max = f(b.x_max)?;
            } else if flip_flop == -1 {
                b.x_min = self.enforce_bounds(b.x_min + GROWTH_FACTOR * (b.x_min - b.x_max));
                b.fx_min = f(b.x_min)?;
                b.evaluations += 1;
                flip_flop = 1;
            } else {
                b.x_max = self.enforce_bounds(b.x_max + GROWTH_FACTOR * (b.x_max - b.x_min));
                b.fx_max = f(b.x_max)?;
                flip_flop = -1;
            }
            b.evaluations += 1;
        }

        Err(MathError::NonConvergence("unable to bracket root"))
    }

    /// Finds a root of `f` inside `[x_min, x_max]`; the ends must bracket a sign change.
    pub fn solve_bracketed<F>(
        &self,
        mut f: F,
        accuracy: f64,
        x_min: f64,
        x_max: f64,
    ) -> Result<f64, MathError>
    where
        F: FnMut(f64) -> Result<f64, MathError>,
    {
        if !(x_min < x_max) {
            return Err(MathError::InvalidInput("invalid bracket: x_min >= x_max"));
        }
        let accuracy = accuracy.max(f64::EPSILON);

        let fx_min = f(x_min)?;
        if close(fx_min, 0.0) {
            return Ok(x_min);
        }
        let fx_max = f(x_max)?;
        if close(fx_max, 0.0) {
            return Ok(x_max);
        }
        if fx_min * fx_max >= 0.0 {
            return Err(MathError::NonConvergence("root not bracketed"));
        }

        self.iterate(
            &mut f,
            accuracy,
            Bracket {
                x_min,
                fx_min,
                x_max,
                fx_max,
                evaluations: 2,
            },
        )
    }

    fn iterate<F>(&self, f: &mut F, accuracy: f64, mut b: Bracket) -> Result<f64, MathError>
    where
        F: FnMut(f64) -> Result<f64, MathError>,
    {
        let mut root = b.x_max;
        let mut f_root = b.fx_max;
        let mut d = 0.0;
        let mut e = 0.0;

        while b.evaluations <= self.max_evaluations {
            if (f_root > 0.0 && b.fx_max > 0.0) || (f_root < 0.0 && b.fx_max < 0.0) {
                // rename so that root lies between root and x_max
                b.x_max = b.x_min;
                b.fx_max = b.fx_min;
                d = root - b.x_min;
                e = d;
            }
            if b.fx_max.abs() < f_root.abs() {
                b.x_min = root;
                root = b.x_max;
                b.x_max = b.x_min;
                b.fx_min = f_root;
                f_root = b.fx_max;
                b.fx_max = b.fx_min;
            }

            let x_acc = 2.0 * f64::EPSILON * root.abs() + 0.5 * accuracy;
            let x_mid = (b.x_max - root) / 2.0;
            if x_mid.abs() <= x_acc || close(f_root, 0.0) {
                return Ok(root);
            }

            if e.abs() >= x_acc && b.fx_min.abs() > f_root.abs() {
                let s = f_root / b.fx_min;
                let (mut p, mut q);
                if close(b.x_min, b.x_max) {
                    p = 2.0 * x_mid * s;
                    q = 1.0 - s;
                } else {
                    let qq = b.fx_min / b.fx_max;
                    let r = f_root / b.fx_max;
                    p = s * (2.0 * x_mid * qq * (qq - r) - (root - b.x_min) * (r - 1.0));
                    q = (qq - 1.0) * (r - 1.0) * (s - 1.0);
                }
                if p > 0.0 {
                    q = -q;
                }
                p = p.abs();
                let min1 = 3.0 * x_mid * q - (x_acc * q).abs();
                let min2 = (e * q).abs();
                if 2.0 * p < min1.min(min2) {
                    e = d;
                    d = p / q;
                } else {
                    d = x_mid;
                    e = d;
                }
            } else {
                d = x_mid;
                e = d;
            }

            b.x_min = root;
            b.fx_min = f_root;
            if d.abs() > x_acc {
                root += d;
            } else {
                root += x_acc.copysign(x_mid);
            }
            f_root = f(root)?;
            b.evaluations += 1;
        }

        Err(MathError::NonConvergence("maximum number of function evaluations exceeded"))
    }
}
