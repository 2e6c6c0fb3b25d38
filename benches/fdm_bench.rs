use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use openferric_fdm::fdm::meshers::{
    Concentrating1dMesher, ConcentrationPoint, FdmHestonVarianceMesher,
    FdmHestonVarianceMesherParams, FdmMesherComposite, Mesher1d,
};
use openferric_fdm::fdm::operators::{FdmHestonOp, FdmLinearOp, FdmLinearOpComposite};
use openferric_fdm::market::FlatForward;
use openferric_fdm::models::HestonProcess;

// Performance goals (guideline, measured on target hardware):
// - Heston 200x100 operator apply: < 1 ms
// - Single-axis splitting solve on the same grid: < 1 ms

fn benchmark_process() -> HestonProcess {
    HestonProcess::new(
        Arc::new(FlatForward::new(0.05)),
        Arc::new(FlatForward::new(0.0)),
        100.0,
        0.04,
        1.5,
        0.04,
        0.3,
        -0.7,
    )
    .expect("benchmark process should be valid")
}

fn heston_mesher(nx: usize, nv: usize) -> Arc<FdmMesherComposite> {
    let process = benchmark_process();
    let x: Arc<dyn Mesher1d> = Arc::new(
        Concentrating1dMesher::new(2.5, 6.7, nx, Some((100f64.ln(), 0.1)), true)
            .expect("spot mesher should build"),
    );
    let v: Arc<dyn Mesher1d> = Arc::new(
        FdmHestonVarianceMesher::new(nv, &process, 1.0, &FdmHestonVarianceMesherParams::default())
            .expect("variance mesher should build"),
    );
    Arc::new(FdmMesherComposite::new(vec![x, v]).expect("composite should build"))
}

fn bench_heston_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("heston_apply");
    for (nx, nv) in [(50_usize, 25_usize), (200, 100)] {
        let mesher = heston_mesher(nx, nv);
        let mut op = FdmHestonOp::new(mesher, &benchmark_process(), None, None, 1.0)
            .expect("operator should build");
        op.set_time(0.0, 0.01).expect("set_time should succeed");
        let r: Vec<f64> = (0..nx * nv).map(|i| (i as f64 * 0.01).sin()).collect();

        group.bench_with_input(
            BenchmarkId::new("grid", format!("{nx}x{nv}")),
            &r,
            |b, r| b.iter(|| black_box(op.apply(black_box(r)).expect("apply should succeed"))),
        );
    }
    group.finish();
}

fn bench_splitting_solve(c: &mut Criterion) {
    let mesher = heston_mesher(200, 100);
    let mut op = FdmHestonOp::new(mesher, &benchmark_process(), None, None, 1.0)
        .expect("operator should build");
    op.set_time(0.0, 0.01).expect("set_time should succeed");
    let r = vec![1.0; 200 * 100];

    let mut group = c.benchmark_group("heston_solve_splitting");
    for direction in [0_usize, 1] {
        group.bench_with_input(BenchmarkId::from_parameter(direction), &direction, |b, &d| {
            b.iter(|| {
                black_box(
                    op.solve_splitting(d, black_box(&r), -0.005)
                        .expect("splitting solve should succeed"),
                )
            })
        });
    }
    group.finish();
}

fn bench_concentrating_mesher(c: &mut Criterion) {
    let points = [
        ConcentrationPoint::new(90.0, 0.1).with_required(true),
        ConcentrationPoint::new(110.0, 0.1).with_required(true),
    ];
    c.bench_function("multi_point_concentrating_mesher_201", |b| {
        b.iter(|| {
            black_box(
                Concentrating1dMesher::with_points(50.0, 200.0, 201, black_box(&points))
                    .expect("mesher should build"),
            )
        })
    });
}

criterion_group!(
    fdm_benches,
    bench_heston_apply,
    bench_splitting_solve,
    bench_concentrating_mesher
);
criterion_main!(fdm_benches);
