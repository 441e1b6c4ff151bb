//! Whole-stack sweep tests: lattice model through solver across a
//! two-dimensional parameter grid, under different worker counts and
//! solver strategies.

use num_complex::Complex64;

use lat_algo::{ExactConfig, GreensConfig, SolverStrategy};
use lat_core::{Lattice, Modifier, Shape, System};
use lat_sweep::{
    run_sweep, FailureMode, SweepMode, SweepParameter, SweepPipeline, SweepRunnerConfig,
    SweepSpec,
};

fn chain_system(n: usize) -> System {
    let mut lat = Lattice::new(vec![[1.0, 0.0, 0.0]]).unwrap();
    let a = lat.add_sublattice("a", [0.0; 3], 0.0).unwrap();
    lat.add_hopping([1, 0, 0], a, a, -1.0).unwrap();
    System::build(lat, &Shape::finite([n, 1, 1])).unwrap()
}

fn modifiers() -> Vec<Modifier> {
    vec![
        Modifier::onsite(|block, _, params| {
            let mut out = block.clone();
            out.set(0, 0, block.get(0, 0) + Complex64::new(params["mu"], 0.0));
            out
        }),
        Modifier::hopping(|block, _, _, params| {
            let mut out = block.clone();
            out.set(0, 0, block.get(0, 0) * params["t"]);
            out
        }),
    ]
}

fn two_axis_spec() -> SweepSpec {
    SweepSpec::new(
        vec![
            SweepParameter::new("t", vec![0.5, 1.0, 1.5]),
            SweepParameter::new("mu", vec![-0.5, 0.0, 0.5, 1.0]),
        ],
        SweepMode::Cartesian,
    )
    .unwrap()
}

#[test]
fn grid_cells_carry_the_physics_of_their_coordinates() {
    let spec = two_axis_spec();
    let pipeline = SweepPipeline::new(
        chain_system(8),
        modifiers(),
        SolverStrategy::Exact(ExactConfig::default()),
    );
    let grid = run_sweep(&pipeline, &spec, SweepRunnerConfig::default()).unwrap();

    assert_eq!(grid.shape(), &[3, 4]);
    assert_eq!(grid.summary().succeeded, 12);

    // The chain spectrum is mu + 2 t cos(k pi / (n + 1)): the diagonal
    // shift mu moves every eigenvalue rigidly, t scales the bandwidth.
    for (ti, &t) in spec.parameters()[0].values.iter().enumerate() {
        for (mi, &mu) in spec.parameters()[1].values.iter().enumerate() {
            let cell = grid.cell_at(&[ti, mi]);
            let spectrum = cell.observable().unwrap().as_spectrum().unwrap();
            let e0 = spectrum.eigenvalues[0];
            let expected =
                mu + 2.0 * (-t) * (std::f64::consts::PI / 9.0).cos();
            assert!(
                (e0 - expected).abs() < 1e-10,
                "t = {t}, mu = {mu}: ground state {e0} vs {expected}"
            );
        }
    }
}

#[test]
fn worker_count_never_changes_the_grid() {
    let spec = two_axis_spec();
    let run = |workers| {
        let pipeline = SweepPipeline::new(
            chain_system(6),
            modifiers(),
            SolverStrategy::Exact(ExactConfig::default()),
        );
        let grid = run_sweep(
            &pipeline,
            &spec,
            SweepRunnerConfig {
                workers,
                failure_mode: FailureMode::CollectErrors,
            },
        )
        .unwrap();
        grid.cells()
            .map(|c| {
                c.observable()
                    .unwrap()
                    .as_spectrum()
                    .unwrap()
                    .eigenvalues
                    .clone()
            })
            .collect::<Vec<_>>()
    };

    let one = run(1);
    let many = run(4);
    assert_eq!(one, many);
}

#[test]
fn greens_strategy_sweeps_and_reports_instabilities_in_place() {
    // Broadening below the degeneracy threshold: every point fails with a
    // numerical-instability error wrapped in its sweep coordinates.
    let spec = SweepSpec::new(
        vec![SweepParameter::new("mu", vec![0.0, 0.5])],
        SweepMode::Cartesian,
    )
    .unwrap();
    let pipeline = SweepPipeline::new(
        chain_system(4),
        modifiers_onsite_only(),
        SolverStrategy::Greens(GreensConfig::new(vec![0.0], 1e-12, vec![0])),
    );
    let grid = run_sweep(
        &pipeline,
        &spec,
        SweepRunnerConfig {
            workers: 2,
            failure_mode: FailureMode::CollectErrors,
        },
    )
    .unwrap();

    assert_eq!(grid.summary().failed, 2);
    for failure in grid.failures() {
        assert!(failure.error.to_string().contains("Sweep point"));
    }

    // A sane broadening on the same pipeline succeeds everywhere.
    let pipeline = SweepPipeline::new(
        chain_system(4),
        modifiers_onsite_only(),
        SolverStrategy::Greens(GreensConfig::new(vec![0.0], 0.1, vec![0])),
    );
    let grid = run_sweep(&pipeline, &spec, SweepRunnerConfig::default()).unwrap();
    assert_eq!(grid.summary().succeeded, 2);
    for cell in grid.cells() {
        let greens = cell.observable().unwrap().as_greens().unwrap();
        // Retarded Green's function: spectral weight is non-negative.
        assert!(greens.values[0].im < 0.0);
    }
}

fn modifiers_onsite_only() -> Vec<Modifier> {
    vec![Modifier::onsite(|block, _, params| {
        let mut out = block.clone();
        out.set(0, 0, block.get(0, 0) + Complex64::new(params["mu"], 0.0));
        out
    })]
}
