//! Adaptive Runge-Kutta integration with Cash-Karp embedded error estimates.

use super::MathError;

const MAX_STEPS: usize = 10_000;
const SAFETY: f64 = 0.9;
const P_GROW: f64 = -0.2;
const P_SHRINK: f64 = -0.25;
const ERR_CON: f64 = 1.89e-4;
const TINY: f64 = 1.0e-30;
const H_INITIAL: f64 = 1.0e-4;

const A2: f64 = 0.2;
const A3: f64 = 0.3;
const A4: f64 = 0.6;
const A5: f64 = 1.0;
const A6: f64 = 0.875;
const B21: f64 = 0.2;
const B31: f64 = 3.0 / 40.0;
const B32: f64 = 9.0 / 40.0;
const B41: f64 = 0.3;
const B42: f64 = -0.9;
const B43: f64 = 1.2;
const B51: f64 = -11.0 / 54.0;
const B52: f64 = 2.5;
const B53: f64 = -70.0 / 27.0;
const B54: f64 = 35.0 / 27.0;
const B61: f64 = 1631.0 / 55296.0;
const B62: f64 = 175.0 / 512.0;
const B63: f64 = 575.0 / 13824.0;
const B64: f64 = 44275.0 / 110592.0;
const B65: f64 = 253.0 / 4096.0;
const C1: f64 = 37.0 / 378.0;
const C3: f64 = 250.0 / 621.0;
const C4: f64 = 125.0 / 594.0;
const C6: f64 = 512.0 / 1771.0;
const DC1: f64 = C1 - 2825.0 / 27648.0;
const DC3: f64 = C3 - 18575.0 / 48384.0;
const DC4: f64 = C4 - 13525.0 / 55296.0;
const DC5: f64 = -277.0 / 14336.0;
const DC6: f64 = C6 - 0.25;

/// Fifth-order Runge-Kutta integrator with step-size control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveRungeKutta {
    eps: f64,
}

impl Default for AdaptiveRungeKutta {
    fn default() -> Self {
        Self::new(1.0e-6)
    }
}

impl AdaptiveRungeKutta {
    /// Creates an integrator with relative tolerance `eps`.
    pub fn new(eps: f64) -> Self {
        Self { eps }
    }

    /// Integrates the scalar ODE `y' = f(x, y)` from `(x1, y1)` to `x2`.
    pub fn solve_1d<F>(&self, f: F, y1: f64, x1: f64, x2: f64) -> Result<f64, MathError>
    where
        F: Fn(f64, f64) -> f64,
    {
        let y = self.solve(|x, y: &[f64]| vec![f(x, y[0])], &[y1], x1, x2)?;
        Ok(y[0])
    }

    /// Integrates the system `y' = f(x, y)` from `(x1, y1)` to `x2`.
    pub fn solve<F>(&self, derivs: F, y1: &[f64], x1: f64, x2: f64) -> Result<Vec<f64>, MathError>
    where
        F: Fn(f64, &[f64]) -> Vec<f64>,
    {
        if !(self.eps > 0.0) {
            return Err(MathError::InvalidInput("ode tolerance must be positive"));
        }
        let n = y1.len();
        let mut y = y1.to_vec();
        let mut yscal = vec![0.0; n];
        let mut x = x1;
        let mut h = if x1 <= x2 { H_INITIAL } else { -H_INITIAL };

        for _ in 0..MAX_STEPS {
            let dydx = derivs(x, &y);
            for i in 0..n {
                yscal[i] = y[i].abs() + (dydx[i] * h).abs() + TINY;
            }
            if (x + h - x2) * (x + h - x1) > 0.0 {
                h = x2 - x;
            }
            let h_next = self.quality_step(&derivs, &mut y, &dydx, &mut x, h, &yscal)?;
            if (x - x2) * (x2 - x1) >= 0.0 {
                return Ok(y);
            }
            if h_next == 0.0 {
                return Err(MathError::NonConvergence("ode step size too small"));
            }
            h = h_next;
        }

        Err(MathError::NonConvergence("too many steps in adaptive runge-kutta"))
    }

    /// One step with error monitoring; advances `x` and `y`, returns the next trial step.
    fn quality_step<F>(
        &self,
        derivs: &F,
        y: &mut [f64],
        dydx: &[f64],
        x: &mut f64,
        h_try: f64,
        yscal: &[f64],
    ) -> Result<f64, MathError>
    where
        F: Fn(f64, &[f64]) -> Vec<f64>,
    {
        let mut h = h_try;
        loop {
            let (y_tmp, y_err) = cash_karp_step(derivs, y, dydx, *x, h);
            let err_max = y_err
                .iter()
                .zip(yscal)
                .map(|(e, s)| (e / s).abs())
                .fold(0.0_f64, f64::max)
                / self.eps;

            if err_max > 1.0 {
                let shrunk = SAFETY * h * err_max.powf(P_SHRINK);
                h = if h >= 0.0 {
                    shrunk.max(h / 10.0)
                } else {
                    shrunk.min(h / 10.0)
                };
                if *x + h == *x {
                    return Err(MathError::StepSizeUnderflow);
                }
                continue;
            }

            let h_next = if err_max > ERR_CON {
                SAFETY * h * err_max.powf(P_GROW)
            } else {
                5.0 * h
            };
            *x += h;
            y.copy_from_slice(&y_tmp);
            return Ok(h_next);
        }
    }
}

fn cash_karp_step<F>(derivs: &F, y: &[f64], dydx: &[f64], x: f64, h: f64) -> (Vec<f64>, Vec<f64>)
where
    F: Fn(f64, &[f64]) -> Vec<f64>,
{
    let n = y.len();
    let stage = |coeffs: &[(f64, &[f64])]| -> Vec<f64> {
        (0..n)
            .map(|i| y[i] + h * coeffs.iter().map(|(c, k)| c * k[i]).sum::<f64>())
            .collect()
    };

    let ak2 = derivs(x + A2 * h, &stage(&[(B21, dydx)]));
    let ak3 = derivs(x + A3 * h, &stage(&[(B31, dydx), (B32, ak2.as_slice())]));
    let ak4 = derivs(x + A4 * h, &stage(&[(B41, dydx), (B42, ak2.as_slice()), (B43, ak3.as_slice())]));
    let ak5 = derivs(
        x + A5 * h,
        &stage(&[(B51, dydx), (B52, ak2.as_slice()), (B53, ak3.as_slice()), (B54, ak4.as_slice())]),
    );
    let ak6 = derivs(
        x + A6 * h,
        &stage(&[(B61, dydx), (B62, ak2.as_slice()), (B63, ak3.as_slice()), (B64, ak4.as_slice()), (B65, ak5.as_slice())]),
    );

    let y_out = (0..n)
        .map(|i| y[i] + h * (C1 * dydx[i] + C3 * ak3[i] + C4 * ak4[i] + C6 * ak6[i]))
        .collect();
    let y_err = (0..n)
        .map(|i| {
            h * (DC1 * dydx[i] + DC3 * ak3[i] + DC4 * ak4[i] + DC5 * ak5[i] + DC6 * ak6[i])
        })
        .collect();
    (y_out, y_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn integrates_exponential_growth() {
        let rk = AdaptiveRungeKutta::new(1e-10);
        let y = rk.solve_1d(|_, y| y, 1.0, 0.0, 1.0).unwrap();
        assert_relative_eq!(y, std::f64::consts::E, epsilon = 1e-8);
    }

    #[test]
    fn integrates_backwards_in_x() {
        let rk = AdaptiveRungeKutta::new(1e-10);
        let y = rk.solve_1d(|x, _| 2.0 * x, 1.0, 1.0, 0.0).unwrap();
        assert_relative_eq!(y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn integrates_harmonic_oscillator_system() {
        let rk = AdaptiveRungeKutta::new(1e-10);
        let y = rk
            .solve(|_, y| vec![y[1], -y[0]], &[0.0, 1.0], 0.0, std::f64::consts::FRAC_PI_2)
            .unwrap();
        assert_relative_eq!(y[0], 1.0, epsilon = 1e-8);
        assert_relative_eq!(y[1], 0.0, epsilon = 1e-8);
    }
}
