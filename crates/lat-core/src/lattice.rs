//! Lattice model: sublattices and hopping templates.
//!
//! A [`Lattice`] is the abstract periodic template of a tight-binding model:
//! one to three lattice vectors, a set of sublattice sites inside the unit
//! cell, and hopping templates connecting sublattices across cell offsets.
//! It is pure data; [`crate::System::build`] turns it into a concrete
//! structure.
//!
//! Hopping templates are registered in one canonical direction only. The
//! Hermitian conjugate (B→A at offset −d with the conjugate-transpose block)
//! is implied and produced at assembly time; registering it manually is a
//! [`LatticeError::ConjugateHopping`].

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::LatError;

/// Errors raised while declaring a lattice model
#[derive(Debug, Error)]
pub enum LatticeError {
    #[error("Sublattice name can't be blank")]
    BlankSublatticeName,

    #[error("Sublattice '{0}' already exists")]
    DuplicateSublattice(String),

    #[error("Unknown sublattice id {0}")]
    UnknownSublattice(usize),

    #[error("Hopping for ({0} -> {0}) at zero offset belongs in the onsite energy")]
    SelfHopping(String),

    #[error("Hopping ({from} -> {to}) at offset {offset:?} already exists")]
    DuplicateHopping {
        from: String,
        to: String,
        offset: [i32; 3],
    },

    #[error("Don't define the conjugate of hopping ({from} -> {to}) manually")]
    ConjugateHopping { from: String, to: String },

    #[error("Onsite block of '{name}' must be {dof}x{dof}, got {rows}x{cols}")]
    OnsiteDimension {
        name: String,
        dof: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Hopping block ({from} -> {to}) must be {rows}x{cols}, got {got_rows}x{got_cols}")]
    HoppingDimension {
        from: String,
        to: String,
        rows: usize,
        cols: usize,
        got_rows: usize,
        got_cols: usize,
    },

    #[error("A lattice needs 1 to 3 lattice vectors, got {0}")]
    BadDimensionality(usize),
}

impl From<LatticeError> for LatError {
    fn from(err: LatticeError) -> Self {
        LatError::Structural(err.to_string())
    }
}

/// Identifies a sublattice within a [`Lattice`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SublatticeId(usize);

impl SublatticeId {
    #[inline]
    pub fn new(value: usize) -> Self {
        SublatticeId(value)
    }

    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

/// Small dense complex block attached to a site or a hopping.
///
/// Stored row-major. For a sublattice with `dof` orbitals the onsite block
/// is `dof × dof`; a hopping block between sublattices couples their
/// orbital spaces and may be rectangular.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoppingBlock {
    rows: usize,
    cols: usize,
    data: Vec<Complex64>,
}

impl HoppingBlock {
    /// A 1x1 block holding a single complex amplitude.
    pub fn scalar(value: impl Into<Complex64>) -> Self {
        HoppingBlock {
            rows: 1,
            cols: 1,
            data: vec![value.into()],
        }
    }

    /// Build from a row-major element list. Panics if `data` length
    /// disagrees with `rows * cols` (a programming error, not input data).
    pub fn from_rows(rows: usize, cols: usize, data: Vec<Complex64>) -> Self {
        assert_eq!(
            data.len(),
            rows * cols,
            "block data length must equal rows * cols"
        );
        HoppingBlock { rows, cols, data }
    }

    /// Square block of zeros.
    pub fn zeros(dof: usize) -> Self {
        HoppingBlock {
            rows: dof,
            cols: dof,
            data: vec![Complex64::new(0.0, 0.0); dof * dof],
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Complex64 {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: Complex64) {
        self.data[row * self.cols + col] = value;
    }

    /// Conjugate transpose of the block (the implied reverse hopping).
    pub fn conj_transpose(&self) -> Self {
        let mut data = Vec::with_capacity(self.data.len());
        for col in 0..self.cols {
            for row in 0..self.rows {
                data.push(self.get(row, col).conj());
            }
        }
        HoppingBlock {
            rows: self.cols,
            cols: self.rows,
            data,
        }
    }

    /// True when every element is finite (no NaN/∞).
    pub fn is_finite(&self) -> bool {
        self.data
            .iter()
            .all(|v| v.re.is_finite() && v.im.is_finite())
    }

    /// True for square blocks with `B == B†` within `tol` per element.
    pub fn is_hermitian(&self, tol: f64) -> bool {
        if self.rows != self.cols {
            return false;
        }
        for row in 0..self.rows {
            for col in row..self.cols {
                let diff = self.get(row, col) - self.get(col, row).conj();
                if diff.norm() > tol {
                    return false;
                }
            }
        }
        true
    }
}

impl From<f64> for HoppingBlock {
    fn from(value: f64) -> Self {
        HoppingBlock::scalar(Complex64::new(value, 0.0))
    }
}

/// One site of the unit cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sublattice {
    pub name: String,
    /// Position relative to the unit-cell origin (Cartesian)
    pub offset: [f64; 3],
    /// Onsite energy block, `dof × dof`
    pub onsite: HoppingBlock,
}

impl Sublattice {
    /// Number of orbitals (degrees of freedom) on this sublattice.
    #[inline]
    pub fn dof(&self) -> usize {
        self.onsite.rows()
    }
}

/// A hopping rule: couple `from` to `to` in the cell displaced by
/// `cell_offset` lattice vectors, with amplitude `block`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoppingTemplate {
    pub cell_offset: [i32; 3],
    pub from: SublatticeId,
    pub to: SublatticeId,
    pub block: HoppingBlock,
}

/// Abstract periodic template of a tight-binding model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lattice {
    vectors: Vec<[f64; 3]>,
    sublattices: Vec<Sublattice>,
    hoppings: Vec<HoppingTemplate>,
    /// Sites with fewer neighbors are pruned after construction
    pub min_neighbors: usize,
}

impl Lattice {
    /// Create a lattice from its translation vectors (1 to 3).
    pub fn new(vectors: Vec<[f64; 3]>) -> Result<Self, LatticeError> {
        if vectors.is_empty() || vectors.len() > 3 {
            return Err(LatticeError::BadDimensionality(vectors.len()));
        }
        Ok(Lattice {
            vectors,
            sublattices: Vec::new(),
            hoppings: Vec::new(),
            min_neighbors: 0,
        })
    }

    /// Number of periodic directions.
    #[inline]
    pub fn ndim(&self) -> usize {
        self.vectors.len()
    }

    #[inline]
    pub fn vectors(&self) -> &[[f64; 3]] {
        &self.vectors
    }

    #[inline]
    pub fn sublattices(&self) -> &[Sublattice] {
        &self.sublattices
    }

    #[inline]
    pub fn hoppings(&self) -> &[HoppingTemplate] {
        &self.hoppings
    }

    pub fn sublattice(&self, id: SublatticeId) -> Result<&Sublattice, LatticeError> {
        self.sublattices
            .get(id.value())
            .ok_or(LatticeError::UnknownSublattice(id.value()))
    }

    /// Look up a sublattice id by name.
    pub fn sublattice_id(&self, name: &str) -> Option<SublatticeId> {
        self.sublattices
            .iter()
            .position(|sub| sub.name == name)
            .map(SublatticeId::new)
    }

    /// Register a sublattice site; returns its id.
    ///
    /// The onsite block must be square; its upper triangle is authoritative
    /// at assembly time (the lower triangle is mirrored by conjugation).
    pub fn add_sublattice(
        &mut self,
        name: impl Into<String>,
        offset: [f64; 3],
        onsite: impl Into<HoppingBlock>,
    ) -> Result<SublatticeId, LatticeError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(LatticeError::BlankSublatticeName);
        }
        if self.sublattices.iter().any(|sub| sub.name == name) {
            return Err(LatticeError::DuplicateSublattice(name));
        }
        let onsite = onsite.into();
        if onsite.rows() != onsite.cols() {
            return Err(LatticeError::OnsiteDimension {
                name,
                dof: onsite.rows(),
                rows: onsite.rows(),
                cols: onsite.cols(),
            });
        }
        let id = SublatticeId::new(self.sublattices.len());
        self.sublattices.push(Sublattice {
            name,
            offset,
            onsite,
        });
        Ok(id)
    }

    /// Register a hopping template in its canonical direction.
    ///
    /// Rejects duplicates and Hermitian conjugates of existing templates:
    /// the reverse hopping is derived during assembly, never stored.
    pub fn add_hopping(
        &mut self,
        cell_offset: [i32; 3],
        from: SublatticeId,
        to: SublatticeId,
        block: impl Into<HoppingBlock>,
    ) -> Result<(), LatticeError> {
        let from_sub = self.sublattice(from)?.clone();
        let to_sub = self.sublattice(to)?.clone();
        let block = block.into();

        if from == to && cell_offset == [0, 0, 0] {
            return Err(LatticeError::SelfHopping(from_sub.name));
        }
        let from_dof = from_sub.dof();
        let to_dof = to_sub.dof();
        if block.rows() != from_dof || block.cols() != to_dof {
            return Err(LatticeError::HoppingDimension {
                from: from_sub.name,
                to: to_sub.name,
                rows: from_dof,
                cols: to_dof,
                got_rows: block.rows(),
                got_cols: block.cols(),
            });
        }
        for existing in &self.hoppings {
            if existing.from == from && existing.to == to && existing.cell_offset == cell_offset {
                return Err(LatticeError::DuplicateHopping {
                    from: from_sub.name,
                    to: to_sub.name,
                    offset: cell_offset,
                });
            }
            let mirrored = [
                -existing.cell_offset[0],
                -existing.cell_offset[1],
                -existing.cell_offset[2],
            ];
            if existing.from == to && existing.to == from && mirrored == cell_offset {
                return Err(LatticeError::ConjugateHopping {
                    from: from_sub.name,
                    to: to_sub.name,
                });
            }
        }
        self.hoppings.push(HoppingTemplate {
            cell_offset,
            from,
            to,
            block,
        });
        Ok(())
    }
}
