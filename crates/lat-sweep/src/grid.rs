//! Result grid: one cell per sweep point, in parameter order.
//!
//! The grid is preallocated before any work is dispatched, so cell order
//! is decided by point index alone and never by worker completion order.
//! Failed cells keep their error and parameter values; under fail-fast,
//! points that were never dispatched stay [`SweepCell::Skipped`].

use std::fmt;

use lat_algo::Observable;
use lat_core::{LatError, Params};

/// A sweep point that did not evaluate.
#[derive(Debug)]
pub struct SweepPointFailure {
    /// Grid coordinates of the failed point
    pub coords: Vec<usize>,
    /// Parameter values at the failed point
    pub params: Params,
    pub error: LatError,
}

impl fmt::Display for SweepPointFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "point {:?} (", self.coords)?;
        for (i, (name, value)) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name} = {value}")?;
        }
        write!(f, "): {}", self.error)
    }
}

/// One evaluated (or skipped) sweep point.
#[derive(Debug)]
pub enum SweepCell {
    Ok(Observable),
    Failed(SweepPointFailure),
    Skipped,
}

impl SweepCell {
    pub fn observable(&self) -> Option<&Observable> {
        match self {
            SweepCell::Ok(obs) => Some(obs),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&SweepPointFailure> {
        match self {
            SweepCell::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Outcome counts for one sweep run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl fmt::Display for SweepSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} failed, {} skipped",
            self.succeeded, self.failed, self.skipped
        )
    }
}

/// Results of a full sweep, indexed by grid coordinates.
#[derive(Debug)]
pub struct SweepGrid {
    shape: Vec<usize>,
    cells: Vec<SweepCell>,
}

impl SweepGrid {
    pub(crate) fn new(shape: Vec<usize>, cells: Vec<SweepCell>) -> Self {
        debug_assert_eq!(shape.iter().product::<usize>(), cells.len());
        SweepGrid { shape, cells }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn num_points(&self) -> usize {
        self.cells.len()
    }

    /// Cell at a flat point index.
    pub fn cell(&self, index: usize) -> &SweepCell {
        &self.cells[index]
    }

    /// Cell at grid coordinates (row-major, last axis fastest).
    pub fn cell_at(&self, coords: &[usize]) -> &SweepCell {
        let mut index = 0;
        for (c, extent) in coords.iter().zip(&self.shape) {
            debug_assert!(c < extent);
            index = index * extent + c;
        }
        &self.cells[index]
    }

    pub fn cells(&self) -> impl Iterator<Item = &SweepCell> {
        self.cells.iter()
    }

    pub fn failures(&self) -> impl Iterator<Item = &SweepPointFailure> {
        self.cells.iter().filter_map(SweepCell::failure)
    }

    pub fn summary(&self) -> SweepSummary {
        let mut summary = SweepSummary {
            succeeded: 0,
            failed: 0,
            skipped: 0,
        };
        for cell in &self.cells {
            match cell {
                SweepCell::Ok(_) => summary.succeeded += 1,
                SweepCell::Failed(_) => summary.failed += 1,
                SweepCell::Skipped => summary.skipped += 1,
            }
        }
        summary
    }
}
