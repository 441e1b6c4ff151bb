//! # Sparse Hamiltonian Infrastructure
//!
//! Tight-binding Hamiltonians are inherently sparse: a 10,000-site
//! nearest-neighbor structure stores a few non-zeros per row against a
//! 10⁸-entry dense matrix. This module provides the CSR representations
//! that scale to large structures and large parameter sweeps.
//!
//! ## Module Organization
//!
//! - [`pattern`]: CSR sparsity pattern derived once per [`lat_core::System`]
//! - [`hamiltonian`]: Hermitian value fill over a cached pattern
//!
//! ## The pattern/value split
//!
//! The sparsity pattern depends only on the structure, never on swept
//! scalar parameters. A sweep therefore derives it once, wraps it in an
//! [`std::sync::Arc`], and hands it read-only to every worker; each
//! evaluation only re-fills numeric values. Re-assembling with different
//! parameters yields byte-identical index arrays.
//!
//! ## Usage
//!
//! ```ignore
//! use lat_algo::sparse::{SparsityPattern, Hamiltonian};
//!
//! let pattern = Arc::new(SparsityPattern::from_system(&system));
//! let fields = apply_modifiers(&system, &modifiers, &params);
//! let h = Hamiltonian::assemble(&system, &fields, &pattern)?;
//! println!("{} non-zeros ({:.4}% density)", h.nnz(), pattern.density() * 100.0);
//! ```

pub mod hamiltonian;
pub mod pattern;

// Re-export main types
pub use hamiltonian::{AssembleError, Hamiltonian};
pub use pattern::SparsityPattern;
