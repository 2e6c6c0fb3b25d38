//! Non-uniform grids clustering nodes around concentration points.
//!
//! With one point the grid is `x(u) = c + d sinh(c1 (1 - u) + c2 u)` on a
//! uniform `u`. With several points the map `u -> x` solves
//! `dx/du = a / sqrt(sum_i 1 / (beta_i + (x - p_i)^2))`, `a` chosen so the
//! grid ends at `end`.

use log::debug;

use crate::core::FdmError;
use crate::math::{AdaptiveRungeKutta, Brent, ExtrapolationMode, LinearInterpolator};
use crate::math::{MathError, close};

use super::{ConcentrationPoint, Fdm1dMesher, Mesher1d};

/// Default ODE tolerance for multi-point concentration.
pub const DEFAULT_ODE_TOLERANCE: f64 = 1e-8;

/// Grid on `[start, end]` concentrated around one or several points.
#[derive(Debug, Clone, PartialEq)]
pub struct Concentrating1dMesher {
    grid: Fdm1dMesher,
}

impl Concentrating1dMesher {
    /// Single-point concentration; `c_point` is `(point, density)`.
    ///
    /// Without a point the grid is uniform. With `require_c_point` the
    /// parameterisation is bent so that a node lands exactly on the point.
    pub fn new(
        start: f64,
        end: f64,
        size: usize,
        c_point: Option<(f64, f64)>,
        require_c_point: bool,
    ) -> Result<Self, FdmError> {
        if !(end > start) {
            return Err(FdmError::invalid("end must be larger than start"));
        }
        if size < 2 {
            return Err(FdmError::invalid("concentrating mesher needs at least two points"));
        }

        let dx = 1.0 / (size - 1) as f64;
        let mut locations = vec![0.0; size];

        match c_point {
            None => {
                if require_c_point {
                    return Err(FdmError::invalid(
                        "a concentration point is required to place a node on it",
                    ));
                }
                for (i, x) in locations.iter_mut().enumerate() {
                    *x = start + i as f64 * dx * (end - start);
                }
            }
            Some((point, density)) => {
                if !(point >= start && point <= end) {
                    return Err(FdmError::invalid(
                        "concentration point must lie between start and end",
                    ));
                }
                if !(density > 0.0) {
                    return Err(FdmError::invalid("concentration density must be positive"));
                }

                let d = density * (end - start);
                let c1 = ((start - point) / d).asinh();
                let c2 = ((end - point) / d).asinh();

                let transform = if require_c_point {
                    Some(node_transform(point, start, end, c1, c2, size)?)
                } else {
                    None
                };

                for (i, x) in locations.iter_mut().enumerate().take(size - 1).skip(1) {
                    let u = i as f64 * dx;
                    let li = match &transform {
                        Some(t) => t.value(u),
                        None => u,
                    };
                    *x = point + d * (c1 * (1.0 - li) + c2 * li).sinh();
                }
            }
        }

        locations[0] = start;
        locations[size - 1] = end;

        Ok(Self {
            grid: Fdm1dMesher::from_locations(locations)?,
        })
    }

    /// Multi-point concentration with the default ODE tolerance.
    pub fn with_points(
        start: f64,
        end: f64,
        size: usize,
        points: &[ConcentrationPoint],
    ) -> Result<Self, FdmError> {
        Self::with_points_and_tolerance(start, end, size, points, DEFAULT_ODE_TOLERANCE)
    }

    /// Multi-point concentration; required points inside `(start, end)` are
    /// placed exactly on grid nodes.
    pub fn with_points_and_tolerance(
        start: f64,
        end: f64,
        size: usize,
        points: &[ConcentrationPoint],
        tol: f64,
    ) -> Result<Self, FdmError> {
        if !(end > start) {
            return Err(FdmError::invalid("end must be larger than start"));
        }
        if size < 3 {
            return Err(FdmError::invalid(
                "multi-point concentrating mesher needs at least three points",
            ));
        }
        if points.is_empty() {
            return Self::new(start, end, size, None, false);
        }
        if points.iter().any(|p| !(p.density > 0.0)) {
            return Err(FdmError::invalid("concentration density must be positive"));
        }

        let centers: Vec<f64> = points.iter().map(|p| p.point).collect();
        let betas: Vec<f64> = points
            .iter()
            .map(|p| (p.density * (end - start)).powi(2))
            .collect();

        // exact scale for a lone point; averaged as the starting guess
        let a_init = centers
            .iter()
            .zip(&betas)
            .map(|(&p, &b)| {
                let w = b.sqrt();
                ((end - p) / w).asinh() - ((start - p) / w).asinh()
            })
            .sum::<f64>()
            / centers.len() as f64;

        let ode = ConcentrationOde {
            centers: &centers,
            betas: &betas,
            integrator: AdaptiveRungeKutta::new(tol),
        };

        let a = Brent::new().with_lower_bound(0.0).solve(
            |a| Ok(ode.solve(a, start, 0.0, 1.0)? - end),
            tol,
            a_init,
            0.1 * a_init,
        )?;
        debug!("concentrating mesher scale a={a} (initial guess {a_init})");

        let dx = 1.0 / (size - 1) as f64;
        let mut x = vec![0.0; size];
        let mut y = vec![0.0; size];
        y[0] = start;
        for i in 1..size {
            x[i] = i as f64 * dx;
            y[i] = ode.solve(a, y[i - 1], x[i - 1], x[i])?;
        }

        // remove the accumulated integration error so that y(1) == end
        let dy = y[size - 1] - end;
        for (i, yi) in y.iter_mut().enumerate().skip(1) {
            *yi -= i as f64 * dx * dy;
        }

        let ode_solution = LinearInterpolator::new(x.clone(), y.clone(), ExtrapolationMode::Linear)?;

        let mut w: Vec<(f64, f64)> = vec![(0.0, 0.0)];
        for cp in points {
            if cp.required && cp.point > start && cp.point < end {
                let j = y.partition_point(|v| *v < cp.point).min(size - 1);
                let e = Brent::new().with_lower_bound(0.0).with_upper_bound(1.0).solve(
                    |u| Ok(ode_solution.value(u) - cp.point),
                    f64::EPSILON,
                    x[j],
                    0.5 / size as f64,
                )?;
                w.push((x[size - 2].min(x[j]), e));
            }
        }
        w.push((1.0, 1.0));
        w.sort_by(|l, r| l.0.total_cmp(&r.0).then(l.1.total_cmp(&r.1)));
        w.dedup_by(|next, kept| next.0 == kept.0);

        let (u, z): (Vec<f64>, Vec<f64>) = w.into_iter().unzip();
        let transform = LinearInterpolator::new(u, z, ExtrapolationMode::Linear)?;

        let mut locations = Vec::with_capacity(size);
        for i in 0..size {
            locations.push(ode_solution.value(transform.value(i as f64 * dx)));
        }
        locations[0] = start;
        locations[size - 1] = end;

        let grid = Fdm1dMesher::from_locations(locations)?;
        grid.ensure_strictly_increasing()?;
        Ok(Self { grid })
    }
}

impl Mesher1d for Concentrating1dMesher {
    #[inline]
    fn grid(&self) -> &Fdm1dMesher {
        &self.grid
    }
}

/// Piecewise-linear map `u -> z` through `(0,0)`, `(u0,z0)`, `(1,1)` that puts
/// grid index `u0 * (size - 1)` on the concentration point.
fn node_transform(
    point: f64,
    start: f64,
    end: f64,
    c1: f64,
    c2: f64,
    size: usize,
) -> Result<LinearInterpolator, FdmError> {
    let mut u = vec![0.0];
    let mut z = vec![0.0];
    if size > 2 && !close(point, start) && !close(point, end) {
        let z0 = -c1 / (c2 - c1);
        let n = (size - 1) as f64;
        let u0 = (z0 * n).round().min((size - 2) as f64).max(1.0) / n;
        u.push(u0);
        z.push(z0);
    }
    u.push(1.0);
    z.push(1.0);
    Ok(LinearInterpolator::new(u, z, ExtrapolationMode::Linear)?)
}

struct ConcentrationOde<'a> {
    centers: &'a [f64],
    betas: &'a [f64],
    integrator: AdaptiveRungeKutta,
}

impl ConcentrationOde<'_> {
    fn solve(&self, a: f64, y0: f64, x0: f64, x1: f64) -> Result<f64, MathError> {
        self.integrator.solve_1d(
            |_x, y| {
                let s: f64 = self
                    .centers
                    .iter()
                    .zip(self.betas)
                    .map(|(p, b)| 1.0 / (b + (y - p) * (y - p)))
                    .sum();
                a / s.sqrt()
            },
            y0,
            x0,
            x1,
        )
    }
}
