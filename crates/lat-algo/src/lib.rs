//! # lat-algo: Hamiltonian Assembly and Spectral Solvers
//!
//! This crate turns a concrete structure from `lat-core` into a sparse
//! Hermitian Hamiltonian and extracts spectral observables from it.
//!
//! ## Assembly
//!
//! Assembly is split in two so parameter sweeps never redo structural work:
//!
//! - [`SparsityPattern`]: CSR index structure plus contribution maps,
//!   computed once per structure and shared read-only (`Arc`) across
//!   workers.
//! - [`Hamiltonian`]: numeric values filled into the pattern from the
//!   modifier-produced fields; Hermitian by construction.
//!
//! ## Solvers
//!
//! The [`SolverStrategy`] enum selects the algorithm; all strategies share
//! one `evaluate(&Hamiltonian) -> LatResult<Observable>` entry point:
//!
//! | Strategy | Algorithm | Produces |
//! |----------|-----------|----------|
//! | [`SolverStrategy::Exact`] | dense Hermitian eigensolve (faer) | full spectrum |
//! | [`SolverStrategy::Lanczos`] | sparse Lanczos, full reorthogonalization | lowest k eigenpairs |
//! | [`SolverStrategy::Greens`] | recursive Green's function over BFS slices | local `G_ii(E)` |
//! | [`SolverStrategy::Kpm`] | Chebyshev moments + Jackson kernel | DOS / LDOS |
//!
//! ## Example
//!
//! ```ignore
//! use lat_algo::{Hamiltonian, SolverStrategy, ExactConfig, SparsityPattern};
//! use lat_core::{apply_modifiers, Params};
//! use std::sync::Arc;
//!
//! let pattern = Arc::new(SparsityPattern::from_system(&system));
//! let fields = apply_modifiers(&system, &modifiers, &Params::new());
//! let hamiltonian = Hamiltonian::assemble(&system, &fields, &pattern)?;
//!
//! let observable = SolverStrategy::Exact(ExactConfig::default())
//!     .evaluate(&hamiltonian)?;
//! let spectrum = observable.as_spectrum().unwrap();
//! println!("ground state: {}", spectrum.eigenvalues[0]);
//! ```

pub mod results;
pub mod solver;
pub mod sparse;

pub use results::{energy_grid, EigenResult, EigenVectors, GreensResult, Observable, Series};
pub use solver::{
    ExactConfig, GreensConfig, KpmConfig, KpmError, LanczosConfig, LanczosError, RgfError,
    RgfState, SolverStrategy,
};
pub use sparse::{AssembleError, Hamiltonian, SparsityPattern};
