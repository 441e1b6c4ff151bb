//! Shape specifications for instantiating finite or periodic structures.
//!
//! A [`Shape`] tells [`crate::System::build`] which unit cells of a lattice
//! to realize and which axes keep their translational symmetry:
//!
//! - [`Shape::Primitive`] takes an explicit number of unit cells per axis
//!   with optional periodic boundaries;
//! - [`Shape::Rectangle`] and [`Shape::Circle`] carve a finite footprint out
//!   of Cartesian space, always with open boundaries.
//!
//! Hoppings that cross a truncated (non-periodic) boundary are dropped by
//! the builder, never wrapped.

use serde::{Deserialize, Serialize};

use crate::lattice::Lattice;

/// Geometric specification of the structure to build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    /// `size[i]` unit cells along lattice vector `i`; `periodic[i]` wraps
    /// that axis instead of truncating it.
    Primitive {
        size: [usize; 3],
        periodic: [bool; 3],
    },
    /// Axis-aligned rectangle centered on the origin, open boundary.
    Rectangle { width: f64, height: f64 },
    /// Disc of `radius` around `center`, open boundary.
    Circle { radius: f64, center: [f64; 3] },
}

impl Shape {
    /// A finite `nx × ny × nz` block of unit cells, open boundaries.
    pub fn finite(size: [usize; 3]) -> Self {
        Shape::Primitive {
            size,
            periodic: [false; 3],
        }
    }

    /// Which axes keep their translational symmetry.
    pub fn periodic_axes(&self) -> [bool; 3] {
        match self {
            Shape::Primitive { periodic, .. } => *periodic,
            Shape::Rectangle { .. } | Shape::Circle { .. } => [false; 3],
        }
    }

    /// Inclusive cell-index ranges to enumerate, per axis.
    ///
    /// For Cartesian shapes this is a conservative bounding box derived
    /// from the shape extent and the lattice vector lengths; candidate
    /// sites are filtered through [`Shape::contains`] afterwards.
    pub fn bounding_cells(&self, lattice: &Lattice) -> [(i32, i32); 3] {
        match self {
            Shape::Primitive { size, .. } => {
                let mut ranges = [(0, 0); 3];
                for (axis, range) in ranges.iter_mut().enumerate() {
                    if axis < lattice.ndim() {
                        *range = (0, size[axis].max(1) as i32 - 1);
                    }
                }
                ranges
            }
            Shape::Rectangle { width, height } => {
                let extent = 0.5 * width.max(*height) * std::f64::consts::SQRT_2;
                cartesian_bounds(lattice, extent)
            }
            Shape::Circle { radius, center } => {
                let offset = (center[0].powi(2) + center[1].powi(2) + center[2].powi(2)).sqrt();
                cartesian_bounds(lattice, radius + offset)
            }
        }
    }

    /// Whether a candidate site position lies inside the shape.
    ///
    /// Primitive shapes select cells by index, so every enumerated
    /// position is inside by construction.
    pub fn contains(&self, position: [f64; 3]) -> bool {
        match self {
            Shape::Primitive { .. } => true,
            Shape::Rectangle { width, height } => {
                position[0].abs() <= 0.5 * width + POSITION_TOL
                    && position[1].abs() <= 0.5 * height + POSITION_TOL
            }
            Shape::Circle { radius, center } => {
                let dx = position[0] - center[0];
                let dy = position[1] - center[1];
                let dz = position[2] - center[2];
                (dx * dx + dy * dy + dz * dz).sqrt() <= radius + POSITION_TOL
            }
        }
    }
}

/// Absorbs floating-point jitter when testing sites against shape edges.
const POSITION_TOL: f64 = 1e-9;

fn cartesian_bounds(lattice: &Lattice, extent: f64) -> [(i32, i32); 3] {
    let mut ranges = [(0, 0); 3];
    for (axis, range) in ranges.iter_mut().enumerate().take(lattice.ndim()) {
        let v = lattice.vectors()[axis];
        let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
        // Factor 2 covers skewed lattices where cell indices don't align
        // with Cartesian axes.
        let n = ((2.0 * extent / len).ceil() as i32).max(1);
        *range = (-n, n);
    }
    ranges
}
