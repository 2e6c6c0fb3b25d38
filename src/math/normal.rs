//! Standard normal distribution and quantile.

use statrs::function::erf::erfc;

#[inline]
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Inverse of the standard normal distribution (Acklam's rational approximation,
/// relative error below 1.2e-9 on `(0, 1)`).
///
/// Returns `NaN` outside `[0, 1]` and the matching infinity at the end points.
pub fn inverse_cumulative_normal(p: f64) -> f64 {
    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.024_25;

    let tail = |q: f64| {
        C[0].mul_add(q, C[1]).mul_add(q, C[2]).mul_add(q, C[3]).mul_add(q, C[4]).mul_add(q, C[5])
            / D[0].mul_add(q, D[1]).mul_add(q, D[2]).mul_add(q, D[3]).mul_add(q, 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        A[0].mul_add(r, A[1]).mul_add(r, A[2]).mul_add(r, A[3]).mul_add(r, A[4]).mul_add(r, A[5]) * q
            / B[0].mul_add(r, B[1]).mul_add(r, B[2]).mul_add(r, B[3]).mul_add(r, B[4]).mul_add(r, 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantile_matches_known_values() {
        assert!(inverse_cumulative_normal(0.5).abs() < 1e-10);
        let x = inverse_cumulative_normal(0.841_344_746_068_543);
        assert!((x - 1.0).abs() < 1e-6, "got {x}");
        // the 1 - 1e-4 quantile drives the default Black-Scholes grid width
        let x = inverse_cumulative_normal(1.0 - 1.0e-4);
        assert!((x - 3.719_016_485_455_68).abs() < 1e-6, "got {x}");
    }

    #[test]
    fn quantile_inverts_cdf_in_both_tails() {
        for i in 1..=199 {
            let p = i as f64 / 200.0;
            let back = normal_cdf(inverse_cumulative_normal(p));
            assert!((back - p).abs() < 5e-9, "p={p} back={back}");
        }
        for &p in &[1e-6, 1e-4, 0.01, 0.99, 1.0 - 1e-4] {
            let x = inverse_cumulative_normal(p);
            assert!((inverse_cumulative_normal(1.0 - p) + x).abs() < 1e-8);
        }
    }

    #[test]
    fn cdf_reference_values() {
        assert_eq!(normal_cdf(0.0), 0.5);
        assert!((normal_cdf(1.0) - 0.841_344_746_068_542_9).abs() < 1e-15);
        assert!((normal_cdf(-8.0) - 6.220_960_574_271_785e-16).abs() < 1e-28);
    }

    #[test]
    fn quantile_rejects_out_of_range_probabilities() {
        assert!(inverse_cumulative_normal(-0.1).is_nan());
        assert_eq!(inverse_cumulative_normal(0.0), f64::NEG_INFINITY);
        assert_eq!(inverse_cumulative_normal(1.0), f64::INFINITY);
    }
}
