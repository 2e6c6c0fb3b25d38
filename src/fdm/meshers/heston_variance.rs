//! Variance-axis grid for the Heston model.
//!
//! Nodes follow the quantiles of the CIR transition law (a scaled
//! non-central chi-square) averaged over several horizons up to maturity.

use log::{debug, warn};

use crate::core::FdmError;
use crate::math::{GaussLegendre, InverseNonCentralChiSquare, MathError, NonCentralChiSquare};
use crate::models::HestonProcess;

use super::{Fdm1dMesher, Mesher1d};

const QUANTILE_MAX_EVALUATIONS: usize = 100;
const QUANTILE_ACCURACY: f64 = 1e-8;
const VOLA_QUADRATURE_POINTS: usize = 16;

/// Settings of [`FdmHestonVarianceMesher`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FdmHestonVarianceMesherParams {
    /// Number of horizons the quantile grids are averaged over.
    pub t_avg_steps: usize,
    /// Tail probability cut off at the top of the grid.
    pub epsilon: f64,
    /// Scales the vol-of-vol, e.g. for stochastic local vol mixing.
    pub mixing_factor: f64,
}

impl Default for FdmHestonVarianceMesherParams {
    fn default() -> Self {
        Self {
            t_avg_steps: 10,
            epsilon: 1e-4,
            mixing_factor: 1.0,
        }
    }
}

impl FdmHestonVarianceMesherParams {
    pub fn with_t_avg_steps(mut self, t_avg_steps: usize) -> Self {
        self.t_avg_steps = t_avg_steps;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_mixing_factor(mut self, mixing_factor: f64) -> Self {
        self.mixing_factor = mixing_factor;
        self
    }
}

/// Heston variance grid plus the averaged volatility used to normalise
/// leverage functions.
#[derive(Debug, Clone, PartialEq)]
pub struct FdmHestonVarianceMesher {
    grid: Fdm1dMesher,
    vola_estimate: f64,
}

impl FdmHestonVarianceMesher {
    pub fn new(
        size: usize,
        process: &HestonProcess,
        maturity: f64,
        params: &FdmHestonVarianceMesherParams,
    ) -> Result<Self, FdmError> {
        if size < 2 {
            return Err(FdmError::invalid("variance mesher needs at least two points"));
        }
        if params.t_avg_steps == 0 {
            return Err(FdmError::invalid("t_avg_steps must be positive"));
        }
        if !(params.epsilon > 0.0 && params.epsilon < 1.0) {
            return Err(FdmError::invalid("epsilon must lie in (0, 1)"));
        }
        if !(maturity > 0.0) {
            return Err(FdmError::invalid("maturity must be positive"));
        }

        let mixed_sigma = process.sigma() * params.mixing_factor;

        let (mut v_grid, mut p_grid) =
            match quantile_grid(size, process, maturity, mixed_sigma, params) {
                Ok(grids) => grids,
                Err(MathError::NonConvergence(msg)) => {
                    warn!("heston variance mesher falls back to a linear grid: {msg}");
                    fallback_grid(size, process, mixed_sigma)
                }
                Err(err) => return Err(err.into()),
            };

        let skew_hint = if process.kappa() != 0.0 {
            (mixed_sigma / process.kappa()).max(1.0)
        } else {
            1.0
        };
        p_grid.sort_by(f64::total_cmp);
        let vola_estimate = integrate_vola(&p_grid, &v_grid)? * skew_hint.powf(1.5);

        snap_to_v0(&mut v_grid, process.v0());
        debug!(
            "heston variance mesher: [{}, {}], vola estimate {vola_estimate}",
            v_grid[0],
            v_grid[size - 1]
        );

        Ok(Self {
            grid: Fdm1dMesher::from_locations(v_grid)?,
            vola_estimate,
        })
    }

    /// Integral of `sqrt(v(p))` over the probability grid, skew adjusted.
    #[inline]
    pub fn vola_estimate(&self) -> f64 {
        self.vola_estimate
    }
}

impl Mesher1d for FdmHestonVarianceMesher {
    #[inline]
    fn grid(&self) -> &Fdm1dMesher {
        &self.grid
    }
}

fn quantile_grid(
    size: usize,
    process: &HestonProcess,
    maturity: f64,
    mixed_sigma: f64,
    params: &FdmHestonVarianceMesherParams,
) -> Result<(Vec<f64>, Vec<f64>), MathError> {
    let kappa = process.kappa();
    let v0 = process.v0();
    let sigma2 = mixed_sigma * mixed_sigma;
    let eps = params.epsilon;
    let df = 4.0 * process.theta() * kappa / sigma2;

    let mut points: Vec<(f64, f64)> = Vec::with_capacity(size * params.t_avg_steps);
    for l in 1..=params.t_avg_steps {
        let t = maturity * l as f64 / params.t_avg_steps as f64;
        let decay = (-kappa * t).exp();
        let ncp = 4.0 * kappa * decay / (sigma2 * (1.0 - decay)) * v0;
        let k = sigma2 * (1.0 - decay) / (4.0 * kappa);

        let inverse =
            InverseNonCentralChiSquare::new(df, ncp, QUANTILE_MAX_EVALUATIONS, QUANTILE_ACCURACY)?;
        let dist = NonCentralChiSquare::new(df, ncp)?;

        let q_min = 0.0;
        let q_max = v0.max(k * inverse.value(1.0 - eps)?);
        let min_v_step = (q_max - q_min) / (50 * size) as f64;

        let mut p = 0.0;
        let mut v_tmp = q_min;
        points.push((q_min, eps));
        for i in 1..size {
            let ps = (1.0 - eps - p) / (size - i) as f64;
            p += ps;
            let tmp = k * inverse.value(p)?;
            let vx = (v_tmp + min_v_step).max(tmp);
            p = dist.cdf(vx / k)?;
            v_tmp = vx;
            points.push((vx, p));
        }
    }
    points.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let n = points.len();
    let mut v_grid = vec![0.0; size];
    let mut p_grid = vec![0.0; size];
    for i in 0..size {
        let b = i * n / size;
        let e = (i + 1) * n / size;
        let w = (e - b) as f64;
        for &(v, p) in &points[b..e] {
            v_grid[i] += v / w;
            p_grid[i] += p / w;
        }
    }
    Ok((v_grid, p_grid))
}

fn fallback_grid(size: usize, process: &HestonProcess, mixed_sigma: f64) -> (Vec<f64>, Vec<f64>) {
    let vol = mixed_sigma * (process.theta() / (2.0 * process.kappa())).sqrt();
    let mean = process.theta();
    let v0 = process.v0();
    let upper = (v0 + 4.0 * vol).max(mean + 4.0 * vol);
    let lower = (v0 - 4.0 * vol).min(mean - 4.0 * vol).max(0.0);

    let n = (size - 1) as f64;
    let p_grid = (0..size).map(|i| i as f64 / n).collect();
    let v_grid = (0..size)
        .map(|i| lower + i as f64 * (upper - lower) / n)
        .collect();
    (v_grid, p_grid)
}

/// Piecewise Gauss-Legendre integral of the linearly interpolated `sqrt(v(p))`.
fn integrate_vola(p_grid: &[f64], v_grid: &[f64]) -> Result<f64, FdmError> {
    let rule = GaussLegendre::new(VOLA_QUADRATURE_POINTS)?;
    let mut total = 0.0;
    for i in 0..p_grid.len() - 1 {
        let (p0, p1) = (p_grid[i], p_grid[i + 1]);
        if !(p1 > p0) {
            continue;
        }
        let (v0, v1) = (v_grid[i], v_grid[i + 1]);
        total += rule.integrate(
            |p| (v0 + (p - p0) * (v1 - v0) / (p1 - p0)).max(0.0).sqrt(),
            p0,
            p1,
        );
    }
    Ok(total)
}

/// Moves the closer of the two nodes bracketing `v0` onto `v0`.
fn snap_to_v0(v_grid: &mut [f64], v0: f64) {
    for i in 1..v_grid.len() {
        if v_grid[i - 1] <= v0 && v_grid[i] >= v0 {
            if (v_grid[i - 1] - v0).abs() < (v_grid[i] - v0).abs() {
                v_grid[i - 1] = v0;
            } else {
                v_grid[i] = v0;
            }
        }
    }
}
