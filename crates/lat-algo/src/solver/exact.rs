//! Direct (dense) Hermitian eigensolver.
//!
//! Densifies the sparse Hamiltonian and runs faer's self-adjoint
//! eigendecomposition. Eigenvalues come back in ascending order (sorted
//! explicitly, ties allowed) with orthonormal eigenvectors. Suitable up to
//! a few thousand degrees of freedom; beyond that, use the Lanczos or
//! Green's-function strategies.

use faer::{FaerMat, Side};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::results::{EigenResult, EigenVectors};
use crate::sparse::Hamiltonian;

/// Configuration for the direct eigensolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExactConfig {
    /// Skip eigenvector extraction when only the spectrum is needed.
    pub compute_eigenvectors: bool,
}

impl Default for ExactConfig {
    fn default() -> Self {
        ExactConfig {
            compute_eigenvectors: true,
        }
    }
}

/// Full diagonalization of `H`.
pub fn solve(hamiltonian: &Hamiltonian, config: &ExactConfig) -> EigenResult {
    let n = hamiltonian.dim();
    let dense = hamiltonian.to_dense();

    let evd = dense.selfadjoint_eigendecomposition(Side::Lower);
    let diag = evd.s_diagonal();

    // Ascending order is part of the contract; don't rely on backend order.
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| diag.read(a, 0).re.total_cmp(&diag.read(b, 0).re));

    let eigenvalues: Vec<f64> = order.iter().map(|&k| diag.read(k, 0).re).collect();

    let eigenvectors = if config.compute_eigenvectors {
        let u = evd.u();
        let mut columns = Vec::with_capacity(n * n);
        for &k in &order {
            for i in 0..n {
                let v = u.read(i, k);
                columns.push(Complex64::new(v.re, v.im));
            }
        }
        Some(EigenVectors { dim: n, columns })
    } else {
        None
    };

    EigenResult {
        eigenvalues,
        eigenvectors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::SparsityPattern;
    use lat_core::{apply_modifiers, HoppingBlock, Lattice, Params, Shape, System};
    use std::sync::Arc;

    fn assemble(system: &System) -> Hamiltonian {
        let pattern = Arc::new(SparsityPattern::from_system(system));
        let fields = apply_modifiers(system, &[], &Params::new());
        Hamiltonian::assemble(system, &fields, &pattern).unwrap()
    }

    /// 2-site model whose Hamiltonian is σ_x + Δσ_z: closed-form
    /// eigenvalues ±√(1 + Δ²).
    fn pauli_system(delta: f64) -> System {
        let mut lat = Lattice::new(vec![[1.0, 0.0, 0.0]]).unwrap();
        let up = lat.add_sublattice("up", [0.0; 3], delta).unwrap();
        let dn = lat.add_sublattice("dn", [0.5, 0.0, 0.0], -delta).unwrap();
        lat.add_hopping([0, 0, 0], up, dn, 1.0).unwrap();
        System::build(lat, &Shape::finite([1, 1, 1])).unwrap()
    }

    #[test]
    fn pauli_eigenvalues_match_closed_form() {
        let delta = 0.75;
        let h = assemble(&pauli_system(delta));
        let result = solve(&h, &ExactConfig::default());
        let expected = (1.0 + delta * delta).sqrt();
        assert_eq!(result.eigenvalues.len(), 2);
        assert!((result.eigenvalues[0] + expected).abs() < 1e-12);
        assert!((result.eigenvalues[1] - expected).abs() < 1e-12);
    }

    #[test]
    fn eigenvalues_ascend_and_vectors_are_normalized() {
        let mut lat = Lattice::new(vec![[1.0, 0.0, 0.0]]).unwrap();
        let a = lat.add_sublattice("a", [0.0; 3], 0.0).unwrap();
        lat.add_hopping([1, 0, 0], a, a, -1.0).unwrap();
        let system = System::build(lat, &Shape::finite([8, 1, 1])).unwrap();
        let h = assemble(&system);
        let result = solve(&h, &ExactConfig::default());

        for pair in result.eigenvalues.windows(2) {
            assert!(pair[0] <= pair[1] + 1e-12);
        }
        let vectors = result.eigenvectors.as_ref().unwrap();
        for k in 0..8 {
            let norm: f64 = vectors.column(k).iter().map(|v| v.norm_sqr()).sum();
            assert!((norm - 1.0).abs() < 1e-10, "column {k} norm {norm}");
        }
    }

    #[test]
    fn open_chain_matches_analytic_spectrum() {
        // ε_k = 2t cos(kπ/(N+1)) for the open nearest-neighbor chain
        let n = 6;
        let t = -1.0;
        let mut lat = Lattice::new(vec![[1.0, 0.0, 0.0]]).unwrap();
        let a = lat.add_sublattice("a", [0.0; 3], 0.0).unwrap();
        lat.add_hopping([1, 0, 0], a, a, t).unwrap();
        let system = System::build(lat, &Shape::finite([n, 1, 1])).unwrap();
        let result = solve(&assemble(&system), &ExactConfig::default());

        let mut expected: Vec<f64> = (1..=n)
            .map(|k| 2.0 * t * (k as f64 * std::f64::consts::PI / (n as f64 + 1.0)).cos())
            .collect();
        expected.sort_by(f64::total_cmp);
        for (got, want) in result.eigenvalues.iter().zip(&expected) {
            assert!((got - want).abs() < 1e-10);
        }
    }

    #[test]
    fn multi_orbital_blocks_diagonalize() {
        let mut lat = Lattice::new(vec![[1.0, 0.0, 0.0]]).unwrap();
        let mut onsite = HoppingBlock::zeros(2);
        onsite.set(0, 1, Complex64::new(0.0, -1.0)); // σ_y upper triangle
        onsite.set(1, 0, Complex64::new(0.0, 1.0));
        lat.add_sublattice("a", [0.0; 3], onsite).unwrap();
        let system = System::build(lat, &Shape::finite([1, 1, 1])).unwrap();
        let result = solve(&assemble(&system), &ExactConfig::default());
        assert!((result.eigenvalues[0] + 1.0).abs() < 1e-12);
        assert!((result.eigenvalues[1] - 1.0).abs() < 1e-12);
    }
}
