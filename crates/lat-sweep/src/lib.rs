//! # lat-sweep: Parallel Parameter Sweeps
//!
//! Batch evaluation of the full pipeline (modifiers, Hamiltonian
//! assembly, solve) over a grid of parameter combinations, fanned out
//! across a rayon thread pool.
//!
//! The contract is determinism: a sweep's result grid depends only on the
//! [`SweepSpec`] and pipeline inputs, never on worker count or scheduling.
//! Three pieces enforce it:
//!
//! - point enumeration is row-major over the [`SweepSpec`] (last
//!   parameter fastest), so cell `i` always means the same parameter
//!   values;
//! - the structure and sparsity pattern are computed once and shared
//!   read-only across workers;
//! - every worker-visible input (ordered `Params`, seeded RNGs in the
//!   solvers) is deterministic given the configuration.
//!
//! ## Example
//!
//! ```ignore
//! use lat_sweep::{run_sweep, FailureMode, SweepMode, SweepParameter,
//!                 SweepPipeline, SweepRunnerConfig, SweepSpec};
//! use lat_algo::{ExactConfig, SolverStrategy};
//!
//! let spec = SweepSpec::new(
//!     vec![SweepParameter::new("mu", vec![0.0, 0.5, 1.0])],
//!     SweepMode::Cartesian,
//! )?;
//! let pipeline = SweepPipeline::new(
//!     system,
//!     modifiers,
//!     SolverStrategy::Exact(ExactConfig::default()),
//! );
//! let grid = run_sweep(&pipeline, &spec, SweepRunnerConfig::default())?;
//! println!("sweep finished: {}", grid.summary());
//! ```

pub mod grid;
pub mod runner;
pub mod spec;

pub use grid::{SweepCell, SweepGrid, SweepPointFailure, SweepSummary};
pub use runner::{run_sweep, FailureMode, SweepPipeline, SweepRunnerConfig};
pub use spec::{SweepMode, SweepParameter, SweepSpec, SweepSpecError};
