//! Fixed-order Gauss-Legendre quadrature.

use std::f64::consts::PI;

use super::MathError;

/// `n`-point Gauss-Legendre rule on `[-1, 1]`, exact for polynomials of
/// degree `2n - 1`.
#[derive(Debug, Clone)]
pub struct GaussLegendre {
    abscissas: Vec<f64>,
    weights: Vec<f64>,
}

impl GaussLegendre {
    pub fn new(order: usize) -> Result<Self, MathError> {
        if order == 0 {
            return Err(MathError::InvalidInput("quadrature order must be positive"));
        }

        let mut abscissas = vec![0.0; order];
        let mut weights = vec![0.0; order];
        let n = order as f64;
        for i in 0..order.div_ceil(2) {
            // Newton from the Tricomi estimate of the i-th largest root
            let mut z = (PI * (i as f64 + 0.75) / (n + 0.5)).cos();
            let mut dp = 1.0;
            for _ in 0..100 {
                let (p, d) = legendre(order, z);
                dp = d;
                let step = p / d;
                z -= step;
                if step.abs() <= 1.0e-15 {
                    dp = legendre(order, z).1;
                    break;
                }
            }
            let w = 2.0 / ((1.0 - z * z) * dp * dp);
            abscissas[i] = -z;
            abscissas[order - 1 - i] = z;
            weights[i] = w;
            weights[order - 1 - i] = w;
        }

        Ok(Self { abscissas, weights })
    }

    pub fn order(&self) -> usize {
        self.weights.len()
    }

    /// Integral of `f` over `[a, b]`.
    pub fn integrate<F: Fn(f64) -> f64>(&self, f: F, a: f64, b: f64) -> f64 {
        let half = 0.5 * (b - a);
        let mid = 0.5 * (b + a);
        half * self
            .abscissas
            .iter()
            .zip(&self.weights)
            .map(|(x, w)| w * f(mid + half * x))
            .sum::<f64>()
    }
}

/// `(P_n(z), P_n'(z))` by the three-term recurrence.
fn legendre(n: usize, z: f64) -> (f64, f64) {
    let (mut p0, mut p1) = (1.0, z);
    for k in 2..=n {
        let k = k as f64;
        let p2 = ((2.0 * k - 1.0) * z * p1 - (k - 1.0) * p0) / k;
        p0 = p1;
        p1 = p2;
    }
    if n == 0 {
        return (1.0, 0.0);
    }
    (p1, n as f64 * (z * p1 - p0) / (z * z - 1.0))
}
