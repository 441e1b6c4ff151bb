//! Sparse Hamiltonian assembly over a cached sparsity pattern.
//!
//! `H` is Hermitian **by construction**: each hopping block is written once
//! in its canonical direction and once as its conjugate transpose from the
//! same source value, and each onsite block's upper triangle is mirrored by
//! conjugation. There is no post-hoc symmetrization step.
//!
//! Dimension mismatches between modified blocks and the lattice's degrees
//! of freedom, non-finite modifier output, and non-Hermitian onsite blocks
//! are all construction-time errors, never silently coerced.

use std::sync::Arc;

use faer::complex_native::c64;
use faer::Mat;
use num_complex::Complex64;
use sprs::CsMat;
use thiserror::Error;

use lat_core::{FieldSet, LatError, System};

use super::pattern::SparsityPattern;

/// Onsite blocks are validated against their conjugate transpose to this
/// per-element tolerance before their upper triangle is mirrored. Blocks
/// further from Hermitian than this are rejected rather than symmetrized.
pub const ONSITE_HERMITICITY_TOL: f64 = 1e-12;

/// Errors from Hamiltonian assembly
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("Pattern was built for dimension {expected}, system has {got}")]
    PatternMismatch { expected: usize, got: usize },

    #[error("Field set has {got} {kind} values, system expects {expected}")]
    FieldCount {
        kind: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Onsite block of site {site} must be {dof}x{dof}, got {rows}x{cols}")]
    OnsiteDimension {
        site: usize,
        dof: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Hopping block of edge {edge} must be {rows}x{cols}, got {got_rows}x{got_cols}")]
    HoppingDimension {
        edge: usize,
        rows: usize,
        cols: usize,
        got_rows: usize,
        got_cols: usize,
    },

    #[error("Non-finite value in onsite block of site {0} (modifier output is not sanitized)")]
    NonFiniteOnsite(usize),

    #[error("Non-finite value in hopping block of edge {0} (modifier output is not sanitized)")]
    NonFiniteHopping(usize),

    #[error("Onsite block of site {0} is not Hermitian")]
    NonHermitianOnsite(usize),
}

impl From<AssembleError> for LatError {
    fn from(err: AssembleError) -> Self {
        match err {
            AssembleError::OnsiteDimension { .. }
            | AssembleError::HoppingDimension { .. }
            | AssembleError::FieldCount { .. }
            | AssembleError::PatternMismatch { .. } => LatError::DimensionMismatch(err.to_string()),
            AssembleError::NonFiniteOnsite(_) | AssembleError::NonFiniteHopping(_) => {
                LatError::NumericalInstability(err.to_string())
            }
            AssembleError::NonHermitianOnsite(_) => LatError::Structural(err.to_string()),
        }
    }
}

/// Assembled sparse Hamiltonian in CSR format.
///
/// Keeps a handle on the shared [`SparsityPattern`] so sweep code can
/// verify (and tests can assert) that re-assemblies reuse the same index
/// structure.
#[derive(Debug, Clone)]
pub struct Hamiltonian {
    matrix: CsMat<Complex64>,
    pattern: Arc<SparsityPattern>,
}

impl Hamiltonian {
    /// Fill numeric values over the cached pattern.
    pub fn assemble(
        system: &System,
        fields: &FieldSet,
        pattern: &Arc<SparsityPattern>,
    ) -> Result<Hamiltonian, AssembleError> {
        let dim = system.total_dof();
        if pattern.dim() != dim {
            return Err(AssembleError::PatternMismatch {
                expected: pattern.dim(),
                got: dim,
            });
        }
        check_count("onsite", fields.onsite.len(), system.num_sites())?;
        check_count("hopping", fields.hoppings.len(), system.num_hoppings())?;

        let mut values = vec![Complex64::new(0.0, 0.0); pattern.nnz()];

        // Onsite blocks: upper triangle is authoritative, lower mirrored by
        // conjugation, diagonal forced real after the hermiticity check.
        for (site, entries) in pattern.onsite_entries().iter().enumerate() {
            let block = &fields.onsite[site];
            let dof = entries.dof;
            if block.rows() != dof || block.cols() != dof {
                return Err(AssembleError::OnsiteDimension {
                    site,
                    dof,
                    rows: block.rows(),
                    cols: block.cols(),
                });
            }
            if !block.is_finite() {
                return Err(AssembleError::NonFiniteOnsite(site));
            }
            if !block.is_hermitian(ONSITE_HERMITICITY_TOL) {
                return Err(AssembleError::NonHermitianOnsite(site));
            }
            for r in 0..dof {
                values[entries.entries[r * dof + r]] += Complex64::new(block.get(r, r).re, 0.0);
                for c in (r + 1)..dof {
                    let v = block.get(r, c);
                    values[entries.entries[r * dof + c]] += v;
                    values[entries.entries[c * dof + r]] += v.conj();
                }
            }
        }

        // Hopping blocks: forward value and conjugate mirror from the same
        // source element.
        for (edge, entries) in pattern.hopping_entries().iter().enumerate() {
            let block = &fields.hoppings[edge];
            if block.rows() != entries.rows || block.cols() != entries.cols {
                return Err(AssembleError::HoppingDimension {
                    edge,
                    rows: entries.rows,
                    cols: entries.cols,
                    got_rows: block.rows(),
                    got_cols: block.cols(),
                });
            }
            if !block.is_finite() {
                return Err(AssembleError::NonFiniteHopping(edge));
            }
            for r in 0..entries.rows {
                for c in 0..entries.cols {
                    let v = block.get(r, c);
                    let flat = r * entries.cols + c;
                    values[entries.forward[flat]] += v;
                    values[entries.mirror[flat]] += v.conj();
                }
            }
        }

        let matrix = CsMat::new(
            (dim, dim),
            pattern.indptr().to_vec(),
            pattern.indices().to_vec(),
            values,
        );
        Ok(Hamiltonian {
            matrix,
            pattern: Arc::clone(pattern),
        })
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.matrix.rows()
    }

    #[inline]
    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    /// The CSR matrix itself.
    #[inline]
    pub fn matrix(&self) -> &CsMat<Complex64> {
        &self.matrix
    }

    /// The shared pattern this Hamiltonian was filled over.
    #[inline]
    pub fn pattern(&self) -> &Arc<SparsityPattern> {
        &self.pattern
    }

    /// Raw CSR arrays for the binding layer: (indptr, indices, values).
    pub fn csr_arrays(&self) -> (&[usize], &[usize], &[Complex64]) {
        (
            self.pattern.indptr(),
            self.pattern.indices(),
            self.matrix.data(),
        )
    }

    /// Sparse matrix-vector product `y = H x`.
    pub fn apply(&self, x: &[Complex64], y: &mut [Complex64]) {
        debug_assert_eq!(x.len(), self.dim());
        debug_assert_eq!(y.len(), self.dim());
        for (row, row_vec) in self.matrix.outer_iterator().enumerate() {
            let mut acc = Complex64::new(0.0, 0.0);
            for (col, v) in row_vec.iter() {
                acc += v * x[col];
            }
            y[row] = acc;
        }
    }

    /// Dense copy for the direct eigensolver.
    pub fn to_dense(&self) -> Mat<c64> {
        let n = self.dim();
        let mut dense = Mat::<c64>::zeros(n, n);
        for (row, row_vec) in self.matrix.outer_iterator().enumerate() {
            for (col, v) in row_vec.iter() {
                dense.write(row, col, c64::new(v.re, v.im));
            }
        }
        dense
    }

    /// Largest per-element deviation from `H = H†`. Assembly keeps this at
    /// exactly zero; exposed so tests and callers can assert it.
    pub fn hermiticity_defect(&self) -> f64 {
        let mut defect: f64 = 0.0;
        for (row, row_vec) in self.matrix.outer_iterator().enumerate() {
            for (col, v) in row_vec.iter() {
                let mirror = self
                    .matrix
                    .get(col, row)
                    .copied()
                    .unwrap_or_else(|| Complex64::new(0.0, 0.0));
                defect = defect.max((v - mirror.conj()).norm());
            }
        }
        defect
    }
}

fn check_count(kind: &'static str, got: usize, expected: usize) -> Result<(), AssembleError> {
    if got != expected {
        return Err(AssembleError::FieldCount {
            kind,
            expected,
            got,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lat_core::{apply_modifiers, HoppingBlock, Lattice, Modifier, Params, Shape};

    fn chain_system(n: usize, t: f64) -> System {
        let mut lat = Lattice::new(vec![[1.0, 0.0, 0.0]]).unwrap();
        let a = lat.add_sublattice("a", [0.0; 3], 0.0).unwrap();
        lat.add_hopping([1, 0, 0], a, a, t).unwrap();
        System::build(lat, &Shape::finite([n, 1, 1])).unwrap()
    }

    fn assemble_plain(system: &System) -> Hamiltonian {
        let pattern = Arc::new(SparsityPattern::from_system(system));
        let fields = apply_modifiers(system, &[], &Params::new());
        Hamiltonian::assemble(system, &fields, &pattern).unwrap()
    }

    #[test]
    fn chain_matrix_values() {
        let system = chain_system(3, -1.0);
        let h = assemble_plain(&system);
        assert_eq!(h.dim(), 3);
        assert_eq!(h.matrix().get(0, 1), Some(&Complex64::new(-1.0, 0.0)));
        assert_eq!(h.matrix().get(1, 0), Some(&Complex64::new(-1.0, 0.0)));
        assert_eq!(h.matrix().get(0, 2), None);
        assert_eq!(h.hermiticity_defect(), 0.0);
    }

    #[test]
    fn complex_hopping_is_exactly_hermitian() {
        let mut lat = Lattice::new(vec![[1.0, 0.0, 0.0]]).unwrap();
        let a = lat.add_sublattice("a", [0.0; 3], 0.0).unwrap();
        lat.add_hopping(
            [1, 0, 0],
            a,
            a,
            HoppingBlock::scalar(Complex64::new(0.3, 0.7)),
        )
        .unwrap();
        let system = System::build(lat, &Shape::finite([4, 1, 1])).unwrap();
        let h = assemble_plain(&system);
        assert_eq!(h.matrix().get(1, 0), Some(&Complex64::new(0.3, -0.7)));
        assert_eq!(h.hermiticity_defect(), 0.0);
    }

    #[test]
    fn length_one_ring_accumulates_on_diagonal() {
        let mut lat = Lattice::new(vec![[1.0, 0.0, 0.0]]).unwrap();
        let a = lat.add_sublattice("a", [0.0; 3], 2.0).unwrap();
        lat.add_hopping([1, 0, 0], a, a, -1.0).unwrap();
        let shape = Shape::Primitive {
            size: [1, 1, 1],
            periodic: [true, false, false],
        };
        let system = System::build(lat, &shape).unwrap();
        let h = assemble_plain(&system);
        // onsite 2.0 plus t + t† = -2.0
        assert_eq!(h.matrix().get(0, 0), Some(&Complex64::new(0.0, 0.0)));
    }

    #[test]
    fn non_finite_modifier_output_is_a_fault() {
        let system = chain_system(3, -1.0);
        let pattern = Arc::new(SparsityPattern::from_system(&system));
        let poison = Modifier::onsite(|block, _, _| {
            let mut out = block.clone();
            out.set(0, 0, Complex64::new(f64::NAN, 0.0));
            out
        });
        let fields = apply_modifiers(&system, &[poison], &Params::new());
        let err = Hamiltonian::assemble(&system, &fields, &pattern).unwrap_err();
        assert!(matches!(err, AssembleError::NonFiniteOnsite(_)));
        let lat_err: LatError = err.into();
        assert!(matches!(lat_err, LatError::NumericalInstability(_)));
    }

    #[test]
    fn wrong_block_shape_is_a_dimension_mismatch() {
        let system = chain_system(3, -1.0);
        let pattern = Arc::new(SparsityPattern::from_system(&system));
        let widen = Modifier::onsite(|_, _, _| HoppingBlock::zeros(2));
        let fields = apply_modifiers(&system, &[widen], &Params::new());
        let err = Hamiltonian::assemble(&system, &fields, &pattern).unwrap_err();
        assert!(matches!(
            err,
            AssembleError::OnsiteDimension { site: 0, dof: 1, .. }
        ));
    }

    #[test]
    fn non_hermitian_onsite_rejected() {
        let mut lat = Lattice::new(vec![[1.0, 0.0, 0.0]]).unwrap();
        let mut onsite = HoppingBlock::zeros(2);
        onsite.set(0, 1, Complex64::new(1.0, 0.0));
        onsite.set(1, 0, Complex64::new(0.5, 0.0)); // != conj of (0,1)
        let a = lat.add_sublattice("a", [0.0; 3], onsite).unwrap();
        let b = lat.add_sublattice("b", [0.5, 0.0, 0.0], 0.0).unwrap();
        let block = HoppingBlock::from_rows(
            2,
            1,
            vec![Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)],
        );
        lat.add_hopping([0, 0, 0], a, b, block).unwrap();
        let system = System::build(lat, &Shape::finite([2, 1, 1])).unwrap();
        let pattern = Arc::new(SparsityPattern::from_system(&system));
        let fields = apply_modifiers(&system, &[], &Params::new());
        let err = Hamiltonian::assemble(&system, &fields, &pattern).unwrap_err();
        assert!(matches!(err, AssembleError::NonHermitianOnsite(_)));
    }

    #[test]
    fn matvec_matches_dense() {
        let system = chain_system(5, -1.0);
        let h = assemble_plain(&system);
        let x: Vec<Complex64> = (0..5).map(|i| Complex64::new(i as f64, 0.5)).collect();
        let mut y = vec![Complex64::new(0.0, 0.0); 5];
        h.apply(&x, &mut y);

        let dense = h.to_dense();
        for row in 0..5 {
            let mut acc = Complex64::new(0.0, 0.0);
            for col in 0..5 {
                let v = dense.read(row, col);
                acc += Complex64::new(v.re, v.im) * x[col];
            }
            assert!((acc - y[row]).norm() < 1e-14);
        }
    }
}
