use std::sync::Arc;

use approx::assert_relative_eq;
use openferric_fdm::core::FdmError;
use openferric_fdm::fdm::meshers::{
    Concentrating1dMesher, ConcentrationPoint, FdmBlackScholesMesher, FdmBlackScholesMesherParams,
    FdmHestonVarianceMesher, FdmHestonVarianceMesherParams, FdmMesherComposite,
    FdmShortRateMesher, FdmShortRateMesherParams, Mesher1d, Predefined1dMesher, Uniform1dMesher,
};
use openferric_fdm::market::{BlackConstantVol, DividendEvent, DividendSchedule, FlatForward};
use openferric_fdm::models::{GeneralizedBlackScholesProcess, HestonProcess, HullWhite};

fn bs_process(r: f64, q: f64, vol: f64) -> GeneralizedBlackScholesProcess {
    GeneralizedBlackScholesProcess::new(
        100.0,
        Arc::new(FlatForward::new(q)),
        Arc::new(FlatForward::new(r)),
        Arc::new(BlackConstantVol::new(vol)),
    )
}

fn assert_strictly_increasing(x: &[f64]) {
    for w in x.windows(2) {
        assert!(w[1] > w[0], "grid not increasing: {} then {}", w[0], w[1]);
    }
}

#[test]
fn black_scholes_mesher_centres_between_spot_and_forward() {
    let p = bs_process(0.05, 0.0, 0.2);
    let m = FdmBlackScholesMesher::new(101, &p, 1.0, 100.0, &FdmBlackScholesMesherParams::default())
        .expect("valid mesher");

    // uniform grid: the middle node is ln(sqrt(S F))
    let centre = 100f64.ln() + 0.5 * 0.05;
    assert_relative_eq!(m.location(50), centre, epsilon = 1.0e-10);

    let width = m.location(100) - m.location(0);
    assert!(width > 2.0 * 0.2 * 3.0, "grid too narrow: {width}");
    assert_strictly_increasing(m.locations());
}

#[test]
fn black_scholes_mesher_widens_for_cash_dividends() {
    let plain = bs_process(0.0, 0.0, 0.2);
    let with_div = bs_process(0.0, 0.0, 0.2)
        .with_dividends(DividendSchedule::new(vec![DividendEvent::cash(0.5, 20.0).unwrap()]).unwrap());
    let params = FdmBlackScholesMesherParams::default();

    let a = FdmBlackScholesMesher::new(51, &plain, 1.0, 100.0, &params).unwrap();
    let b = FdmBlackScholesMesher::new(51, &with_div, 1.0, 100.0, &params).unwrap();
    assert_relative_eq!(a.location(50), b.location(50), epsilon = 1.0e-12);
    assert_relative_eq!(b.location(0), a.location(0) + 80f64.ln() - 100f64.ln(), epsilon = 1.0e-12);
}

#[test]
fn concentrating_mesher_clusters_nodes_around_the_point() {
    let m = Concentrating1dMesher::new(0.0, 10.0, 41, Some((3.0, 0.05)), true).unwrap();
    let x = m.locations();
    assert_eq!(x[0], 0.0);
    assert_eq!(x[40], 10.0);
    assert_strictly_increasing(x);

    let hit = x.iter().position(|&v| (v - 3.0).abs() < 1.0e-12).expect("required point on grid");
    let near = m.dplus(hit).unwrap();
    let far = m.dminus(40).unwrap();
    assert!(near < 0.25 * far, "spacing near {near}, far {far}");
}

#[test]
fn multi_point_concentration_keeps_every_required_point() {
    let points = [
        ConcentrationPoint::new(2.0, 0.1).with_required(true),
        ConcentrationPoint::new(7.0, 0.1).with_required(true),
    ];
    let m = Concentrating1dMesher::with_points(0.0, 10.0, 51, &points).unwrap();
    let x = m.locations();
    assert_strictly_increasing(x);
    for p in [2.0, 7.0] {
        assert!(x.iter().any(|&v| (v - p).abs() < 1.0e-10), "missing {p}");
    }
}

#[test]
fn heston_variance_mesher_contains_v0() {
    let process = HestonProcess::new(
        Arc::new(FlatForward::new(0.05)),
        Arc::new(FlatForward::new(0.0)),
        100.0,
        0.04,
        1.5,
        0.04,
        0.3,
        -0.7,
    )
    .unwrap();
    let m = FdmHestonVarianceMesher::new(25, &process, 1.0, &FdmHestonVarianceMesherParams::default())
        .unwrap();
    let v = m.locations();
    assert!(v[0] >= 0.0);
    assert_strictly_increasing(v);
    assert!(v.iter().any(|&x| x == 0.04));
    assert!(m.vola_estimate() > 0.1 && m.vola_estimate() < 0.4);
}

#[test]
fn short_rate_mesher_is_symmetric() {
    let model = HullWhite::new(Arc::new(FlatForward::new(0.02)), 0.05, 0.01).unwrap();
    let m = FdmShortRateMesher::new(21, &model, 10.0, &FdmShortRateMesherParams::default()).unwrap();
    assert_relative_eq!(m.location(0), -m.location(20), epsilon = 1.0e-14);
    assert_relative_eq!(m.location(10), 0.0, epsilon = 1.0e-14);
}

#[test]
fn composite_flattens_first_axis_fastest() {
    let x: Arc<dyn Mesher1d> = Arc::new(Uniform1dMesher::new(0.0, 1.0, 3).unwrap());
    let y: Arc<dyn Mesher1d> = Arc::new(Predefined1dMesher::new(vec![0.0, 5.0]).unwrap());
    let z: Arc<dyn Mesher1d> = Arc::new(Predefined1dMesher::new(vec![-1.0, 1.0]).unwrap());
    let m = FdmMesherComposite::new(vec![x, y, z]).unwrap();

    assert_eq!(m.layout().size(), 12);
    assert_eq!(m.layout().spacing(), &[1, 3, 6]);
    let iter = m.layout().iter().nth(7).unwrap();
    assert_eq!(iter.coordinates(), &[1, 0, 1]);
    assert_eq!(m.location(&iter, 0), 0.5);
    assert_eq!(m.location(&iter, 2), 1.0);
    assert_eq!(m.dminus(&iter, 2), Some(2.0));
    assert_eq!(m.dplus(&iter, 2), None);
}

#[test]
fn meshers_reject_degenerate_ranges() {
    assert!(matches!(
        Uniform1dMesher::new(1.0, 1.0, 10),
        Err(FdmError::InvalidInput(_))
    ));
    for locations in [vec![0.0, 2.0, 1.0], vec![0.0, 1.0, 1.0, 2.0], vec![0.0, f64::NAN]] {
        assert!(matches!(
            Predefined1dMesher::new(locations),
            Err(FdmError::InvalidInput(_))
        ));
    }
}
