//! Non-central chi-square distribution and its quantile.
//!
//! The distribution function follows Ding's series (Applied Statistics AS 275
//! style recursion); the quantile brackets the root by doubling and finishes
//! with Brent.

use statrs::function::gamma::ln_gamma;

use super::{Brent, MathError};

const ERR_MAX: f64 = 1.0e-12;
const ITR_MAX: usize = 10_000;

/// Non-central chi-square distribution with `df` degrees of freedom and
/// non-centrality `ncp`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NonCentralChiSquare {
    df: f64,
    ncp: f64,
}

impl NonCentralChiSquare {
    pub fn new(df: f64, ncp: f64) -> Result<Self, MathError> {
        if !(df.is_finite() && df > 0.0) {
            return Err(MathError::InvalidInput("degrees of freedom must be > 0"));
        }
        if !(ncp.is_finite() && ncp >= 0.0) {
            return Err(MathError::InvalidInput("non-centrality must be >= 0"));
        }
        Ok(Self { df, ncp })
    }

    pub fn df(&self) -> f64 {
        self.df
    }

    pub fn ncp(&self) -> f64 {
        self.ncp
    }

    /// Cumulative distribution `P(X <= x)`.
    pub fn cdf(&self, x: f64) -> Result<f64, MathError> {
        if x <= 0.0 {
            return Ok(0.0);
        }

        let lam = 0.5 * self.ncp;
        let mut u = (-lam).exp();
        let mut v = u;
        let x2 = 0.5 * x;
        let f2 = 0.5 * self.df;
        let mut f_x_2n = self.df - x;

        let mut t = (f2 * x2.ln() - x2 - ln_gamma(f2 + 1.0)).exp();
        if u == 0.0 || t == 0.0 {
            return Err(MathError::NonConvergence(
                "non-central chi-square series seed underflows",
            ));
        }

        let mut ans = v * t;
        let mut n = 1.0_f64;
        let mut f_2n = self.df + 2.0;
        f_x_2n += 2.0;

        loop {
            if f_x_2n > 0.0 && t * x / f_x_2n <= ERR_MAX {
                return Ok(ans);
            }
            if n as usize > ITR_MAX {
                return Err(MathError::NonConvergence(
                    "non-central chi-square series did not converge",
                ));
            }
            u *= lam / n;
            v += u;
            t *= x / f_2n;
            ans += v * t;
            n += 1.0;
            f_2n += 2.0;
            f_x_2n += 2.0;
        }
    }
}

/// Quantile of the non-central chi-square distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InverseNonCentralChiSquare {
    dist: NonCentralChiSquare,
    guess: f64,
    max_evaluations: usize,
    accuracy: f64,
}

impl InverseNonCentralChiSquare {
    pub fn new(
        df: f64,
        ncp: f64,
        max_evaluations: usize,
        accuracy: f64,
    ) -> Result<Self, MathError> {
        Ok(Self {
            dist: NonCentralChiSquare::new(df, ncp)?,
            guess: df + ncp,
            max_evaluations,
            accuracy,
        })
    }

    pub fn distribution(&self) -> &NonCentralChiSquare {
        &self.dist
    }

    /// Returns `x` with `P(X <= x) = p`.
    pub fn value(&self, p: f64) -> Result<f64, MathError> {
        if !(0.0..1.0).contains(&p) {
            return Err(MathError::InvalidInput("probability must be in [0, 1)"));
        }

        let mut upper = self.guess;
        let mut evaluations = self.max_evaluations;
        while self.dist.cdf(upper)? < p {
            if evaluations == 0 {
                return Err(MathError::NonConvergence(
                    "unable to bracket non-central chi-square quantile",
                ));
            }
            upper *= 2.0;
            evaluations -= 1;
        }
        let lower = if evaluations == self.max_evaluations {
            0.0
        } else {
            0.5 * upper
        };

        Brent::new()
            .with_max_evaluations(evaluations.max(2))
            .solve_bracketed(|y| Ok(self.dist.cdf(y)? - p), self.accuracy, lower, upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn central_case_matches_closed_form() {
        // df = 2, ncp = 0 is exponential with mean 2
        let dist = NonCentralChiSquare::new(2.0, 0.0).unwrap();
        for &x in &[0.1, 0.5, 1.0, 2.0, 5.0, 10.0] {
            assert_relative_eq!(dist.cdf(x).unwrap(), 1.0 - (-0.5 * x).exp(), epsilon = 1e-10);
        }
        assert_eq!(dist.cdf(-1.0).unwrap(), 0.0);
    }

    #[test]
    fn non_central_reference_values() {
        // reference values from the Poisson mixture of central chi-square laws
        let dist = NonCentralChiSquare::new(4.0, 2.5).unwrap();
        assert_relative_eq!(dist.cdf(3.0).unwrap(), 0.211_705_225_655_7, epsilon = 1e-9);
        assert_relative_eq!(dist.cdf(10.0).unwrap(), 0.818_251_234_088_3, epsilon = 1e-9);
    }

    #[test]
    fn cdf_is_monotone() {
        let dist = NonCentralChiSquare::new(3.2, 12.0).unwrap();
        let mut last = 0.0;
        for i in 1..200 {
            let p = dist.cdf(i as f64 * 0.25).unwrap();
            assert!(p >= last);
            assert!(p <= 1.0 + 1e-12);
            last = p;
        }
    }

    #[test]
    fn quantile_inverts_cdf() {
        let inv = InverseNonCentralChiSquare::new(3.2, 12.0, 100, 1e-10).unwrap();
        for &p in &[1e-4, 0.05, 0.5, 0.95, 1.0 - 1e-4] {
            let x = inv.value(p).unwrap();
            assert_relative_eq!(inv.distribution().cdf(x).unwrap(), p, epsilon = 1e-8);
        }
    }

    #[test]
    fn far_tail_reports_non_convergence() {
        let dist = NonCentralChiSquare::new(4.0, 2.0).unwrap();
        assert_relative_eq!(dist.cdf(100.0).unwrap(), 1.0, epsilon = 1e-10);
        for &x in &[19_000.0, 30_000.0] {
            assert!(matches!(dist.cdf(x), Err(MathError::NonConvergence(_))));
        }
        // exp(-ncp / 2) underflows
        let wide = NonCentralChiSquare::new(4.0, 2_000.0).unwrap();
        assert!(matches!(wide.cdf(2_000.0), Err(MathError::NonConvergence(_))));
        let inv = InverseNonCentralChiSquare::new(4.0, 2_000.0, 100, 1e-10).unwrap();
        assert!(matches!(inv.value(0.5), Err(MathError::NonConvergence(_))));
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(NonCentralChiSquare::new(0.0, 1.0).is_err());
        assert!(NonCentralChiSquare::new(1.0, -1.0).is_err());
    }
}
