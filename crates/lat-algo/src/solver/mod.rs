//! Solver strategies over an assembled Hamiltonian.
//!
//! Every strategy is a tagged configuration evaluated through a single
//! entry point, [`SolverStrategy::evaluate`]. This keeps the sweep runner
//! agnostic of which observable is being computed: it hands each worker a
//! Hamiltonian and gets back an [`Observable`], whatever the strategy.
//!
//! ```ignore
//! let strategy = SolverStrategy::Lanczos(LanczosConfig::default());
//! let observable = strategy.evaluate(&hamiltonian)?;
//! let spectrum = observable.as_spectrum().unwrap();
//! ```
//!
//! Choosing a strategy is a size/observable trade:
//!
//! | strategy  | cost            | produces                      |
//! |-----------|-----------------|-------------------------------|
//! | `Exact`   | O(n³)           | full spectrum + eigenvectors  |
//! | `Lanczos` | O(k · nnz)      | lowest k eigenpairs           |
//! | `Greens`  | O(Σ block³)     | local `G_ii(E)` on a grid     |
//! | `Kpm`     | O(M · nnz)      | DOS / LDOS on a grid          |

pub mod exact;
pub mod greens;
pub mod kpm;
pub mod lanczos;

use serde::{Deserialize, Serialize};

use lat_core::LatResult;

use crate::results::Observable;
use crate::sparse::Hamiltonian;

pub use exact::ExactConfig;
pub use greens::{GreensConfig, RgfError, RgfState};
pub use kpm::{KpmConfig, KpmError};
pub use lanczos::{LanczosConfig, LanczosError};

/// The configured solver, tagged for serialization in sweep manifests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SolverStrategy {
    Exact(ExactConfig),
    Lanczos(LanczosConfig),
    Greens(GreensConfig),
    Kpm(KpmConfig),
}

impl SolverStrategy {
    /// Run the configured solver against an assembled Hamiltonian.
    pub fn evaluate(&self, hamiltonian: &Hamiltonian) -> LatResult<Observable> {
        match self {
            SolverStrategy::Exact(config) => {
                Ok(Observable::Spectrum(exact::solve(hamiltonian, config)))
            }
            SolverStrategy::Lanczos(config) => {
                let result = lanczos::solve(hamiltonian, config)?;
                Ok(Observable::Spectrum(result))
            }
            SolverStrategy::Greens(config) => {
                let result = greens::solve(hamiltonian, config)?;
                Ok(Observable::Greens(result))
            }
            SolverStrategy::Kpm(config) => {
                let result = kpm::solve(hamiltonian, config)?;
                Ok(Observable::Series(result))
            }
        }
    }

    /// Short name for logs and summaries.
    pub fn name(&self) -> &'static str {
        match self {
            SolverStrategy::Exact(_) => "exact",
            SolverStrategy::Lanczos(_) => "lanczos",
            SolverStrategy::Greens(_) => "greens",
            SolverStrategy::Kpm(_) => "kpm",
        }
    }
}
