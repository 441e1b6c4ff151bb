//! Unified error types for the lat ecosystem
//!
//! This module provides a common error type [`LatError`] that can represent
//! errors from any part of the system. Domain-specific error types can be
//! converted to `LatError` for uniform error handling at API boundaries.
//!
//! # Example
//!
//! ```ignore
//! use lat_core::{LatError, LatResult};
//!
//! fn spectrum(lattice: &Lattice) -> LatResult<Vec<f64>> {
//!     let system = System::build(lattice.clone(), shape)?;
//!     solve(&system)
//! }
//! ```

use thiserror::Error;

/// Unified error type for all lat operations.
///
/// The variants follow the failure taxonomy of the pipeline: structural
/// problems are caught while building a [`crate::System`], dimension and
/// numeric faults at Hamiltonian assembly, and solver failures when a
/// strategy is evaluated. A sweep wraps any of these together with the
/// coordinates of the failing parameter point.
#[derive(Error, Debug)]
pub enum LatError {
    /// Empty or invalid lattice/shape (structure cannot be built)
    #[error("Structural error: {0}")]
    Structural(String),

    /// Modifier output disagrees with the lattice's degrees of freedom
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Green's-function recursion degeneracy or other numeric fault
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),

    /// Iterative eigensolver failed to converge
    #[error("Solver did not converge: {0}")]
    SolverNonConvergence(String),

    /// A single sweep point failed; carries the point's grid coordinates
    #[error("Sweep point {coords:?} failed: {source}")]
    SweepPoint {
        coords: Vec<usize>,
        #[source]
        source: Box<LatError>,
    },

    /// Configuration errors (bad solver or sweep parameters)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using LatError.
pub type LatResult<T> = Result<T, LatError>;

impl LatError {
    /// Tag an error with the sweep coordinates of the point that produced it.
    pub fn at_sweep_point(self, coords: Vec<usize>) -> Self {
        LatError::SweepPoint {
            coords,
            source: Box::new(self),
        }
    }
}

/// Conversion from anyhow::Error
impl From<anyhow::Error> for LatError {
    fn from(err: anyhow::Error) -> Self {
        LatError::Other(err.to_string())
    }
}

// Conversion from string-like types for convenience
impl From<String> for LatError {
    fn from(s: String) -> Self {
        LatError::Other(s)
    }
}

impl From<&str> for LatError {
    fn from(s: &str) -> Self {
        LatError::Other(s.to_string())
    }
}
