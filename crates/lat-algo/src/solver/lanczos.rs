//! Sparse iterative eigensolver: symmetric Lanczos with full
//! reorthogonalization and locked deflation.
//!
//! Each eigenpair comes from its own short Lanczos run: the recursion
//! builds a Krylov basis through the Hamiltonian's sparse matvec,
//! diagonalizes the projected tridiagonal matrix T_k, and accepts the
//! lowest Ritz pair once the standard residual bound `|β_k · s_{k,0}|`
//! falls under the configured tolerance. Pairs already accepted are locked:
//! later runs orthogonalize every Krylov vector against them, which
//! restricts the recursion to the orthogonal complement. A repeated
//! eigenvalue therefore shows up once per copy (a single Krylov sequence
//! only ever sees one Ritz pair per distinct eigenvalue, no matter how
//! long it runs).
//!
//! Full reorthogonalization keeps the basis numerically orthogonal at the
//! cost of O(nk) extra work per step, which is the right trade for the
//! moderate eigenvalue counts used here.
//!
//! Running out of iterations is a reported [`LanczosError::NonConvergence`];
//! partial results are never returned.

use faer::{FaerMat, Mat, Side};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lat_core::LatError;

use crate::results::{EigenResult, EigenVectors};
use crate::sparse::Hamiltonian;

/// Errors from the Lanczos eigensolver
#[derive(Debug, Error)]
pub enum LanczosError {
    #[error(
        "Lanczos did not converge: {converged}/{requested} eigenpairs after {iterations} iterations"
    )]
    NonConvergence {
        requested: usize,
        converged: usize,
        iterations: usize,
    },

    #[error("Requested {requested} eigenvalues from a dimension-{dim} Hamiltonian")]
    TooManyEigenvalues { requested: usize, dim: usize },

    #[error("num_eigenvalues must be at least 1")]
    NoEigenvaluesRequested,
}

impl From<LanczosError> for LatError {
    fn from(err: LanczosError) -> Self {
        match err {
            LanczosError::NonConvergence { .. } => LatError::SolverNonConvergence(err.to_string()),
            _ => LatError::Config(err.to_string()),
        }
    }
}

/// Configuration for the Lanczos eigensolver.
///
/// The convergence tolerance and iteration cap are deliberately explicit
/// configuration rather than hard-coded constants; the defaults below are
/// documented and overridable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanczosConfig {
    /// How many of the lowest eigenpairs to compute
    pub num_eigenvalues: usize,
    /// Iteration cap per deflated run (Krylov dimension); default 300
    pub max_iterations: usize,
    /// Residual tolerance relative to `max(1, |θ|)`; default 1e-10
    pub tolerance: f64,
}

impl Default for LanczosConfig {
    fn default() -> Self {
        LanczosConfig {
            num_eigenvalues: 4,
            max_iterations: 300,
            tolerance: 1e-10,
        }
    }
}

/// Lowest `num_eigenvalues` eigenpairs of `H`, counted with multiplicity.
pub fn solve(
    hamiltonian: &Hamiltonian,
    config: &LanczosConfig,
) -> Result<EigenResult, LanczosError> {
    let n = hamiltonian.dim();
    let m = config.num_eigenvalues;
    if m == 0 {
        return Err(LanczosError::NoEigenvaluesRequested);
    }
    if m > n {
        return Err(LanczosError::TooManyEigenvalues {
            requested: m,
            dim: n,
        });
    }

    // One deflated run per pair. Each run converges the lowest eigenpair of
    // H restricted to the complement of the locked pairs, so the sequence of
    // accepted values walks the spectrum from below, multiplicities included.
    let mut eigenvalues: Vec<f64> = Vec::with_capacity(m);
    let mut locked: Vec<Vec<Complex64>> = Vec::with_capacity(m);
    for _ in 0..m {
        let (theta, vector) = lowest_deflated_pair(hamiltonian, &locked, config, m)?;
        eigenvalues.push(theta);
        locked.push(vector);
    }

    // Successive deflated minima ascend in exact arithmetic; sort anyway so
    // the ordering contract holds under rounding.
    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| eigenvalues[a].total_cmp(&eigenvalues[b]));
    let mut columns = Vec::with_capacity(m * n);
    for &i in &order {
        columns.extend_from_slice(&locked[i]);
    }
    Ok(EigenResult {
        eigenvalues: order.iter().map(|&i| eigenvalues[i]).collect(),
        eigenvectors: Some(EigenVectors { dim: n, columns }),
    })
}

/// One Lanczos run in the orthogonal complement of `locked`, returning the
/// lowest converged Ritz pair.
fn lowest_deflated_pair(
    hamiltonian: &Hamiltonian,
    locked: &[Vec<Complex64>],
    config: &LanczosConfig,
    requested: usize,
) -> Result<(f64, Vec<Complex64>), LanczosError> {
    let n = hamiltonian.dim();
    let converged = locked.len();
    let Some(v) = start_vector(n, locked) else {
        return Err(LanczosError::NonConvergence {
            requested,
            converged,
            iterations: 0,
        });
    };

    let max_steps = config.max_iterations.min(n - converged);
    let mut basis: Vec<Vec<Complex64>> = vec![v];
    let mut alphas: Vec<f64> = Vec::new();
    let mut betas: Vec<f64> = Vec::new();
    let mut w = vec![Complex64::new(0.0, 0.0); n];

    for step in 0..max_steps {
        hamiltonian.apply(&basis[step], &mut w);
        if step > 0 {
            let beta = betas[step - 1];
            for (wi, pi) in w.iter_mut().zip(&basis[step - 1]) {
                *wi -= beta * pi;
            }
        }
        let alpha = dot(&basis[step], &w).re;
        for (wi, vi) in w.iter_mut().zip(&basis[step]) {
            *wi -= alpha * vi;
        }
        // Full reorthogonalization, against the locked pairs as well as the
        // current basis, keeps the recursion inside the deflated subspace.
        for u in locked.iter().chain(basis.iter()) {
            let overlap = dot(u, &w);
            for (wi, ui) in w.iter_mut().zip(u) {
                *wi -= overlap * ui;
            }
        }
        alphas.push(alpha);
        let beta = norm(&w);

        let steps_done = step + 1;
        let (theta, s) = eigen_tridiagonal(&alphas, &betas);
        // An exhausted Krylov space is invariant, so its Ritz pairs are
        // exact regardless of the residual estimate.
        let breakdown = beta < f64::EPSILON * steps_done as f64;
        if breakdown || beta * s.read(steps_done - 1, 0).abs() <= residual_bound(config, theta[0]) {
            return Ok(ritz_pair(&basis, theta[0], &s, n));
        }
        if steps_done == max_steps {
            return Err(LanczosError::NonConvergence {
                requested,
                converged,
                iterations: steps_done,
            });
        }

        betas.push(beta);
        let mut next = w.clone();
        let inv = 1.0 / beta;
        for vi in next.iter_mut() {
            *vi *= inv;
        }
        basis.push(next);
    }

    Err(LanczosError::NonConvergence {
        requested,
        converged,
        iterations: max_steps,
    })
}

/// Deterministic start vector, orthogonalized against the locked pairs.
///
/// Reproducible across sweep workers, with no accidental symmetry against
/// lattice eigenvectors; the phase shift per attempt avoids starting
/// (numerically) inside the locked span.
fn start_vector(n: usize, locked: &[Vec<Complex64>]) -> Option<Vec<Complex64>> {
    for attempt in 0..4 {
        let phase = (37 * (locked.len() + attempt)) as f64;
        let mut v: Vec<Complex64> = (0..n)
            .map(|i| Complex64::new(1.0 + (i as f64 + 1.0 + phase).sin(), 0.0))
            .collect();
        for u in locked {
            let overlap = dot(u, &v);
            for (vi, ui) in v.iter_mut().zip(u) {
                *vi -= overlap * ui;
            }
        }
        let nrm = norm(&v);
        if nrm > 1e-8 {
            let inv = 1.0 / nrm;
            for x in v.iter_mut() {
                *x *= inv;
            }
            return Some(v);
        }
    }
    None
}

fn residual_bound(config: &LanczosConfig, theta: f64) -> f64 {
    config.tolerance * theta.abs().max(1.0)
}

fn dot(a: &[Complex64], b: &[Complex64]) -> Complex64 {
    a.iter().zip(b).map(|(x, y)| x.conj() * y).sum()
}

fn norm(v: &[Complex64]) -> f64 {
    v.iter().map(|x| x.norm_sqr()).sum::<f64>().sqrt()
}

fn normalize(v: &mut [Complex64]) {
    let inv = 1.0 / norm(v);
    for x in v.iter_mut() {
        *x *= inv;
    }
}

/// Eigendecomposition of the projected tridiagonal matrix, ascending.
fn eigen_tridiagonal(alphas: &[f64], betas: &[f64]) -> (Vec<f64>, Mat<f64>) {
    let k = alphas.len();
    let mut t = Mat::<f64>::zeros(k, k);
    for i in 0..k {
        t.write(i, i, alphas[i]);
        if i + 1 < k {
            t.write(i, i + 1, betas[i]);
            t.write(i + 1, i, betas[i]);
        }
    }
    let evd = t.selfadjoint_eigendecomposition(Side::Lower);
    let diag = evd.s_diagonal();
    let u = evd.u();

    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by(|&a, &b| diag.read(a, 0).total_cmp(&diag.read(b, 0)));

    let theta: Vec<f64> = order.iter().map(|&i| diag.read(i, 0)).collect();
    let mut s = Mat::<f64>::zeros(k, k);
    for (col, &src) in order.iter().enumerate() {
        for row in 0..k {
            s.write(row, col, u.read(row, src));
        }
    }
    (theta, s)
}

/// Assemble the lowest Ritz pair from the Krylov basis.
fn ritz_pair(basis: &[Vec<Complex64>], theta: f64, s: &Mat<f64>, n: usize) -> (f64, Vec<Complex64>) {
    let mut column = vec![Complex64::new(0.0, 0.0); n];
    for (j, vj) in basis.iter().enumerate() {
        let weight = s.read(j, 0);
        if weight == 0.0 {
            continue;
        }
        for (out, x) in column.iter_mut().zip(vj) {
            *out += weight * x;
        }
    }
    // Ritz vectors inherit orthonormality up to rounding; renormalize.
    normalize(&mut column);
    (theta, column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::exact::{self, ExactConfig};
    use crate::sparse::SparsityPattern;
    use lat_core::{apply_modifiers, Lattice, Params, Shape, System};
    use std::sync::Arc;

    fn assemble(system: &System) -> Hamiltonian {
        let pattern = Arc::new(SparsityPattern::from_system(system));
        let fields = apply_modifiers(system, &[], &Params::new());
        Hamiltonian::assemble(system, &fields, &pattern).unwrap()
    }

    fn chain_hamiltonian(n: usize) -> Hamiltonian {
        let mut lat = Lattice::new(vec![[1.0, 0.0, 0.0]]).unwrap();
        let a = lat.add_sublattice("a", [0.0; 3], 0.0).unwrap();
        lat.add_hopping([1, 0, 0], a, a, -1.0).unwrap();
        let system = System::build(lat, &Shape::finite([n, 1, 1])).unwrap();
        assemble(&system)
    }

    fn square_patch_hamiltonian(nx: usize, ny: usize) -> Hamiltonian {
        let mut lat = Lattice::new(vec![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]).unwrap();
        let a = lat.add_sublattice("a", [0.0; 3], 0.0).unwrap();
        lat.add_hopping([1, 0, 0], a, a, -1.0).unwrap();
        lat.add_hopping([0, 1, 0], a, a, -1.0).unwrap();
        let system = System::build(lat, &Shape::finite([nx, ny, 1])).unwrap();
        assemble(&system)
    }

    #[test]
    fn lowest_eigenvalues_match_dense() {
        let h = chain_hamiltonian(30);
        let config = LanczosConfig {
            num_eigenvalues: 3,
            ..LanczosConfig::default()
        };
        let sparse = solve(&h, &config).unwrap();
        let dense = exact::solve(&h, &ExactConfig::default());
        for i in 0..3 {
            assert!(
                (sparse.eigenvalues[i] - dense.eigenvalues[i]).abs() < 1e-8,
                "eigenvalue {i}: {} vs {}",
                sparse.eigenvalues[i],
                dense.eigenvalues[i]
            );
        }
    }

    #[test]
    fn repeated_eigenvalues_are_found_once_per_copy() {
        // Open square patch: ε(j,k) = -2 cos(jπ/4) - 2 cos(kπ/4), so the
        // second level, (1,2) and (2,1), is doubly degenerate. The lowest
        // four eigenvalues are -2√2, -√2, -√2, 0.
        let h = square_patch_hamiltonian(3, 3);
        let config = LanczosConfig {
            num_eigenvalues: 4,
            ..LanczosConfig::default()
        };
        let sparse = solve(&h, &config).unwrap();
        let dense = exact::solve(&h, &ExactConfig::default());
        for i in 0..4 {
            assert!(
                (sparse.eigenvalues[i] - dense.eigenvalues[i]).abs() < 1e-8,
                "eigenvalue {i}: {} vs {}",
                sparse.eigenvalues[i],
                dense.eigenvalues[i]
            );
        }
        assert!((sparse.eigenvalues[1] - sparse.eigenvalues[2]).abs() < 1e-8);
        assert!((sparse.eigenvalues[1] + std::f64::consts::SQRT_2).abs() < 1e-8);
    }

    #[test]
    fn ritz_vectors_satisfy_eigen_equation() {
        let h = chain_hamiltonian(20);
        let config = LanczosConfig {
            num_eigenvalues: 2,
            ..LanczosConfig::default()
        };
        let result = solve(&h, &config).unwrap();
        let vectors = result.eigenvectors.as_ref().unwrap();
        let mut hv = vec![Complex64::new(0.0, 0.0); 20];
        for i in 0..2 {
            h.apply(vectors.column(i), &mut hv);
            let theta = result.eigenvalues[i];
            let residual: f64 = hv
                .iter()
                .zip(vectors.column(i))
                .map(|(a, b)| (a - theta * b).norm_sqr())
                .sum::<f64>()
                .sqrt();
            assert!(residual < 1e-7, "residual {residual} for pair {i}");
        }
    }

    #[test]
    fn deflated_pairs_stay_orthogonal() {
        let h = square_patch_hamiltonian(3, 3);
        let config = LanczosConfig {
            num_eigenvalues: 4,
            ..LanczosConfig::default()
        };
        let result = solve(&h, &config).unwrap();
        let vectors = result.eigenvectors.as_ref().unwrap();
        for i in 0..4 {
            for j in (i + 1)..4 {
                let overlap = dot(vectors.column(i), vectors.column(j)).norm();
                assert!(overlap < 1e-8, "pairs {i},{j} overlap {overlap}");
            }
        }
    }

    #[test]
    fn starved_iteration_budget_reports_non_convergence() {
        let h = chain_hamiltonian(40);
        let config = LanczosConfig {
            num_eigenvalues: 6,
            max_iterations: 7,
            tolerance: 1e-12,
        };
        let err = solve(&h, &config).unwrap_err();
        assert!(matches!(err, LanczosError::NonConvergence { .. }));
        let lat_err: LatError = err.into();
        assert!(matches!(lat_err, LatError::SolverNonConvergence(_)));
    }

    #[test]
    fn over_requesting_is_a_config_error() {
        let h = chain_hamiltonian(4);
        let config = LanczosConfig {
            num_eigenvalues: 10,
            ..LanczosConfig::default()
        };
        assert!(matches!(
            solve(&h, &config),
            Err(LanczosError::TooManyEigenvalues { .. })
        ));
    }
}
