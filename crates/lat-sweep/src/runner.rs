//! Parallel sweep execution.
//!
//! Each sweep point is one unit of work on one worker: decode parameters,
//! run the modifier pipeline, fill the shared sparsity pattern with values,
//! solve. The structure and pattern are computed once and shared read-only
//! (`Arc`) across the pool; workers allocate only per-point state, so the
//! structural cost is paid once no matter how many points the sweep has.
//!
//! Cells land in the result grid at their point index. Worker scheduling
//! affects wall time only, never content or order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use lat_algo::sparse::{Hamiltonian, SparsityPattern};
use lat_algo::{Observable, SolverStrategy};
use lat_core::{apply_modifiers, LatError, LatResult, Modifier, Params, System};

use crate::grid::{SweepCell, SweepGrid, SweepPointFailure};
use crate::spec::SweepSpec;

/// The fixed (per-sweep) inputs shared by every worker.
#[derive(Debug)]
pub struct SweepPipeline {
    pub system: Arc<System>,
    pub modifiers: Arc<[Modifier]>,
    pub pattern: Arc<SparsityPattern>,
    pub strategy: SolverStrategy,
}

impl SweepPipeline {
    /// Derive the shared sparsity pattern and freeze the pipeline inputs.
    pub fn new(system: System, modifiers: Vec<Modifier>, strategy: SolverStrategy) -> Self {
        let pattern = Arc::new(SparsityPattern::from_system(&system));
        SweepPipeline {
            system: Arc::new(system),
            modifiers: modifiers.into(),
            pattern,
            strategy,
        }
    }

    /// Evaluate one parameter point end to end.
    fn evaluate_point(&self, params: &Params) -> LatResult<Observable> {
        let fields = apply_modifiers(&self.system, &self.modifiers, params);
        let hamiltonian = Hamiltonian::assemble(&self.system, &fields, &self.pattern)?;
        self.strategy.evaluate(&hamiltonian)
    }
}

/// What to do when a sweep point fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Stop dispatching after the first failure; in-flight points finish,
    /// undispatched points are recorded as skipped.
    FailFast,
    /// Evaluate every point; failures stay in their cells.
    CollectErrors,
}

/// Runner knobs.
#[derive(Debug, Clone, Copy)]
pub struct SweepRunnerConfig {
    /// Worker thread count; 0 means one per available CPU.
    pub workers: usize,
    pub failure_mode: FailureMode,
}

impl Default for SweepRunnerConfig {
    fn default() -> Self {
        SweepRunnerConfig {
            workers: 0,
            failure_mode: FailureMode::CollectErrors,
        }
    }
}

/// Run a sweep to completion and collect the result grid.
pub fn run_sweep(
    pipeline: &SweepPipeline,
    spec: &SweepSpec,
    config: SweepRunnerConfig,
) -> LatResult<SweepGrid> {
    let workers = if config.workers == 0 {
        num_cpus::get()
    } else {
        config.workers
    };
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| LatError::Config(format!("failed to build sweep thread pool: {e}")))?;

    let num_points = spec.num_points();
    let abort = AtomicBool::new(false);

    let cells: Vec<SweepCell> = pool.install(|| {
        (0..num_points)
            .into_par_iter()
            .map(|index| {
                if abort.load(Ordering::Relaxed) {
                    return SweepCell::Skipped;
                }
                let (coords, params) = spec.point(index);
                match pipeline.evaluate_point(&params) {
                    Ok(observable) => SweepCell::Ok(observable),
                    Err(error) => {
                        if config.failure_mode == FailureMode::FailFast {
                            abort.store(true, Ordering::Relaxed);
                        }
                        let failure = SweepPointFailure {
                            coords: coords.clone(),
                            params,
                            error: error.at_sweep_point(coords),
                        };
                        eprintln!("Error evaluating sweep {failure}");
                        SweepCell::Failed(failure)
                    }
                }
            })
            .collect()
    });

    Ok(SweepGrid::new(spec.shape(), cells))
}
