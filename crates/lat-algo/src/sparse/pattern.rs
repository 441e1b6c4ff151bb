//! CSR sparsity pattern derived from a system's adjacency.
//!
//! The pattern records where Hamiltonian entries live and which structure
//! element (onsite block, hopping block or its Hermitian mirror) feeds each
//! entry, so value fills are a flat O(nnz) pass with no index arithmetic.
//! Contributions that land on the same entry (a hopping wrapping onto its
//! own site through a length-1 periodic axis, or parallel edges between
//! the same site pair) collapse into one stored entry and accumulate.

use lat_core::System;

/// Flat value positions for one site's onsite block, row-major over the
/// block's `dof × dof` elements.
#[derive(Debug, Clone)]
pub struct OnsiteEntries {
    pub row: usize,
    pub dof: usize,
    pub entries: Vec<usize>,
}

/// Flat value positions for one hopping: the forward block in template
/// order plus the positions of its conjugate mirror. Both are row-major
/// over the *forward* block's `rows × cols` elements.
#[derive(Debug, Clone)]
pub struct HoppingEntries {
    pub rows: usize,
    pub cols: usize,
    pub forward: Vec<usize>,
    pub mirror: Vec<usize>,
}

/// Immutable CSR index structure of a Hamiltonian.
///
/// Derived once per [`System`] and shared read-only across sweep workers;
/// only the value array differs between parameter points.
#[derive(Debug, Clone)]
pub struct SparsityPattern {
    dim: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    onsite: Vec<OnsiteEntries>,
    hoppings: Vec<HoppingEntries>,
}

impl SparsityPattern {
    /// Derive the pattern from a system's sites and hopping adjacency.
    pub fn from_system(system: &System) -> Self {
        let dim = system.total_dof();

        // Collect the column set of every row.
        let mut columns: Vec<Vec<usize>> = vec![Vec::new(); dim];
        for site in 0..system.num_sites() {
            let offset = system.dof_offset(site);
            let dof = system.site_dof(site);
            for r in 0..dof {
                for c in 0..dof {
                    columns[offset + r].push(offset + c);
                }
            }
        }
        for (from, to, _) in system.hoppings() {
            let row = system.dof_offset(from);
            let col = system.dof_offset(to);
            let rows = system.site_dof(from);
            let cols = system.site_dof(to);
            for r in 0..rows {
                for c in 0..cols {
                    columns[row + r].push(col + c);
                    columns[col + c].push(row + r);
                }
            }
        }
        for row in columns.iter_mut() {
            row.sort_unstable();
            row.dedup();
        }

        let mut indptr = Vec::with_capacity(dim + 1);
        let mut indices = Vec::new();
        indptr.push(0);
        for row in &columns {
            indices.extend_from_slice(row);
            indptr.push(indices.len());
        }

        let entry_index = |row: usize, col: usize| -> usize {
            let slice = &indices[indptr[row]..indptr[row + 1]];
            // Column exists by construction; binary search over the sorted row.
            indptr[row] + slice.binary_search(&col).expect("entry present in pattern")
        };

        let onsite = (0..system.num_sites())
            .map(|site| {
                let row = system.dof_offset(site);
                let dof = system.site_dof(site);
                let mut entries = Vec::with_capacity(dof * dof);
                for r in 0..dof {
                    for c in 0..dof {
                        entries.push(entry_index(row + r, row + c));
                    }
                }
                OnsiteEntries { row, dof, entries }
            })
            .collect();

        let hoppings = system
            .hoppings()
            .map(|(from, to, _)| {
                let row = system.dof_offset(from);
                let col = system.dof_offset(to);
                let rows = system.site_dof(from);
                let cols = system.site_dof(to);
                let mut forward = Vec::with_capacity(rows * cols);
                let mut mirror = Vec::with_capacity(rows * cols);
                for r in 0..rows {
                    for c in 0..cols {
                        forward.push(entry_index(row + r, col + c));
                        mirror.push(entry_index(col + c, row + r));
                    }
                }
                HoppingEntries {
                    rows,
                    cols,
                    forward,
                    mirror,
                }
            })
            .collect();

        SparsityPattern {
            dim,
            indptr,
            indices,
            onsite,
            hoppings,
        }
    }

    /// Matrix dimension (total degrees of freedom).
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Fraction of the dense matrix that is stored.
    pub fn density(&self) -> f64 {
        if self.dim == 0 {
            return 0.0;
        }
        self.nnz() as f64 / (self.dim as f64 * self.dim as f64)
    }

    /// CSR row pointers.
    #[inline]
    pub fn indptr(&self) -> &[usize] {
        &self.indptr
    }

    /// CSR column indices.
    #[inline]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub(crate) fn onsite_entries(&self) -> &[OnsiteEntries] {
        &self.onsite
    }

    pub(crate) fn hopping_entries(&self) -> &[HoppingEntries] {
        &self.hoppings
    }

    /// Column indices of one row (the dof-level adjacency used for
    /// Green's-function slicing).
    pub fn row_columns(&self, row: usize) -> &[usize] {
        &self.indices[self.indptr[row]..self.indptr[row + 1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lat_core::{Lattice, Shape, System};

    fn chain(n: usize) -> System {
        let mut lat = Lattice::new(vec![[1.0, 0.0, 0.0]]).unwrap();
        let a = lat.add_sublattice("a", [0.0; 3], 0.0).unwrap();
        lat.add_hopping([1, 0, 0], a, a, -1.0).unwrap();
        System::build(lat, &Shape::finite([n, 1, 1])).unwrap()
    }

    #[test]
    fn chain_pattern_is_tridiagonal() {
        let pattern = SparsityPattern::from_system(&chain(4));
        assert_eq!(pattern.dim(), 4);
        // 4 diagonal + 2 × 3 off-diagonal entries
        assert_eq!(pattern.nnz(), 10);
        assert_eq!(pattern.row_columns(0), &[0, 1]);
        assert_eq!(pattern.row_columns(1), &[0, 1, 2]);
        assert_eq!(pattern.row_columns(3), &[2, 3]);
    }

    #[test]
    fn pattern_is_structurally_symmetric() {
        let pattern = SparsityPattern::from_system(&chain(6));
        for row in 0..pattern.dim() {
            for &col in pattern.row_columns(row) {
                assert!(
                    pattern.row_columns(col).contains(&row),
                    "missing mirror of ({row}, {col})"
                );
            }
        }
    }

    #[test]
    fn wrap_onto_self_collapses_to_diagonal() {
        // Periodic length-1 ring: the +1 hopping wraps onto the site itself.
        let mut lat = Lattice::new(vec![[1.0, 0.0, 0.0]]).unwrap();
        let a = lat.add_sublattice("a", [0.0; 3], 0.0).unwrap();
        lat.add_hopping([1, 0, 0], a, a, -1.0).unwrap();
        let shape = Shape::Primitive {
            size: [1, 1, 1],
            periodic: [true, false, false],
        };
        let system = System::build(lat, &shape).unwrap();
        let pattern = SparsityPattern::from_system(&system);
        assert_eq!(pattern.dim(), 1);
        assert_eq!(pattern.nnz(), 1);
        let hop = &pattern.hopping_entries()[0];
        // Forward and mirror both land on the single diagonal entry.
        assert_eq!(hop.forward, vec![0]);
        assert_eq!(hop.mirror, vec![0]);
    }

    #[test]
    fn density_matches_nnz() {
        let pattern = SparsityPattern::from_system(&chain(10));
        let expected = pattern.nnz() as f64 / 100.0;
        assert!((pattern.density() - expected).abs() < 1e-15);
    }
}
