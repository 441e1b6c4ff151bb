//! Concrete structures instantiated from a lattice model and a shape.
//!
//! A [`System`] is an immutable realization of a [`Lattice`] over a
//! [`Shape`]: an ordered list of sites and the hopping adjacency between
//! them, stored as a public petgraph structure like the rest of the
//! toolkit's domain graphs. Orbital (degree-of-freedom) bookkeeping is
//! precomputed so downstream code can map a site to its rows of the
//! Hamiltonian in O(1).
//!
//! **Build algorithm:**
//! 1. Enumerate unit cells inside the shape's bounding region and keep
//!    sites whose position passes the shape test.
//! 2. Connect neighbors from the lattice's hopping templates. Cell offsets
//!    leaving the structure wrap around periodic axes (flagged on the
//!    edge) and are dropped across truncated boundaries.
//! 3. Prune sites with fewer than `lattice.min_neighbors` neighbors and
//!    re-index.
//!
//! Each template instance stores exactly one edge in its canonical
//! direction; the Hermitian mirror is produced at assembly time.

use std::collections::HashMap;

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use thiserror::Error;

use crate::error::LatError;
use crate::lattice::{Lattice, SublatticeId};
use crate::shape::Shape;

/// Errors from structure construction
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Shape doesn't contain a single lattice site")]
    EmptyStructure,

    #[error("All sites were pruned by the min_neighbors = {0} rule")]
    PrunedToNothing(usize),

    #[error("Lattice has no sublattices")]
    NoSublattices,
}

impl From<BuildError> for LatError {
    fn from(err: BuildError) -> Self {
        LatError::Structural(err.to_string())
    }
}

/// One concrete site of a built structure.
#[derive(Debug, Clone)]
pub struct Site {
    /// Unit-cell index the site came from
    pub cell: [i32; 3],
    pub sublattice: SublatticeId,
    /// Cartesian position (before any position modifiers)
    pub position: [f64; 3],
}

/// One concrete hopping between two sites.
///
/// `template` indexes into `lattice.hoppings()`; the edge direction is the
/// template's canonical direction (edge source = `from` site).
#[derive(Debug, Clone, Copy)]
pub struct Hop {
    pub template: usize,
    /// True when the hopping wraps around a periodic boundary
    pub wrapped: bool,
}

/// Immutable concrete structure: sites plus hopping adjacency.
#[derive(Debug, Clone)]
pub struct System {
    /// Site/hopping graph; no mutable access after construction.
    graph: UnGraph<Site, Hop>,
    lattice: Lattice,
    dof_offsets: Vec<usize>,
    total_dof: usize,
}

impl System {
    /// Instantiate a concrete structure from a lattice and a shape.
    pub fn build(lattice: Lattice, shape: &Shape) -> Result<System, BuildError> {
        if lattice.sublattices().is_empty() {
            return Err(BuildError::NoSublattices);
        }

        let bounds = shape.bounding_cells(&lattice);
        let periodic = shape.periodic_axes();

        // Step 1: enumerate candidate sites.
        let mut sites: Vec<Site> = Vec::new();
        let mut index: HashMap<([i32; 3], usize), usize> = HashMap::new();
        for cx in bounds[0].0..=bounds[0].1 {
            for cy in bounds[1].0..=bounds[1].1 {
                for cz in bounds[2].0..=bounds[2].1 {
                    let cell = [cx, cy, cz];
                    for (sub_idx, sub) in lattice.sublattices().iter().enumerate() {
                        let position = cell_position(&lattice, cell, sub.offset);
                        if !shape.contains(position) {
                            continue;
                        }
                        index.insert((cell, sub_idx), sites.len());
                        sites.push(Site {
                            cell,
                            sublattice: SublatticeId::new(sub_idx),
                            position,
                        });
                    }
                }
            }
        }
        if sites.is_empty() {
            return Err(BuildError::EmptyStructure);
        }

        // Step 2: connect neighbors, wrapping periodic axes.
        let mut edges: Vec<(usize, usize, Hop)> = Vec::new();
        for (site_idx, site) in sites.iter().enumerate() {
            for (template_idx, template) in lattice.hoppings().iter().enumerate() {
                if template.from != site.sublattice {
                    continue;
                }
                let mut target = [
                    site.cell[0] + template.cell_offset[0],
                    site.cell[1] + template.cell_offset[1],
                    site.cell[2] + template.cell_offset[2],
                ];
                let mut wrapped = false;
                let mut dropped = false;
                for axis in 0..3 {
                    let (lo, hi) = bounds[axis];
                    if target[axis] >= lo && target[axis] <= hi {
                        continue;
                    }
                    if periodic[axis] {
                        let span = hi - lo + 1;
                        target[axis] = lo + (target[axis] - lo).rem_euclid(span);
                        wrapped = true;
                    } else {
                        // Truncated boundary: the hopping is dropped, not
                        // wrapped.
                        dropped = true;
                        break;
                    }
                }
                if dropped {
                    continue;
                }
                if let Some(&other) = index.get(&(target, template.to.value())) {
                    edges.push((
                        site_idx,
                        other,
                        Hop {
                            template: template_idx,
                            wrapped,
                        },
                    ));
                }
            }
        }

        // Step 3: prune under-connected sites until stable.
        let keep = prune_dangling(sites.len(), &edges, lattice.min_neighbors);
        let remap: Vec<Option<usize>> = {
            let mut next = 0;
            keep.iter()
                .map(|&kept| {
                    if kept {
                        next += 1;
                        Some(next - 1)
                    } else {
                        None
                    }
                })
                .collect()
        };
        if remap.iter().all(|slot| slot.is_none()) {
            return Err(BuildError::PrunedToNothing(lattice.min_neighbors));
        }

        let mut graph = UnGraph::<Site, Hop>::default();
        for (site_idx, site) in sites.into_iter().enumerate() {
            if keep[site_idx] {
                graph.add_node(site);
            }
        }
        for (from, to, hop) in edges {
            if let (Some(from), Some(to)) = (remap[from], remap[to]) {
                graph.add_edge(NodeIndex::new(from), NodeIndex::new(to), hop);
            }
        }

        // Orbital bookkeeping: site -> first Hamiltonian row.
        let mut dof_offsets = Vec::with_capacity(graph.node_count());
        let mut total_dof = 0;
        for node in graph.node_indices() {
            dof_offsets.push(total_dof);
            let sub = graph[node].sublattice;
            total_dof += lattice.sublattices()[sub.value()].dof();
        }

        Ok(System {
            graph,
            lattice,
            dof_offsets,
            total_dof,
        })
    }

    #[inline]
    pub fn num_sites(&self) -> usize {
        self.graph.node_count()
    }

    #[inline]
    pub fn num_hoppings(&self) -> usize {
        self.graph.edge_count()
    }

    /// Total Hamiltonian dimension (sum of site degrees of freedom).
    #[inline]
    pub fn total_dof(&self) -> usize {
        self.total_dof
    }

    #[inline]
    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    #[inline]
    pub fn site(&self, index: usize) -> &Site {
        &self.graph[NodeIndex::new(index)]
    }

    /// First Hamiltonian row/column belonging to a site.
    #[inline]
    pub fn dof_offset(&self, site: usize) -> usize {
        self.dof_offsets[site]
    }

    /// Number of orbitals on a site.
    pub fn site_dof(&self, site: usize) -> usize {
        let sub = self.site(site).sublattice;
        self.lattice.sublattices()[sub.value()].dof()
    }

    /// Hoppings in edge-index order: `(from, to, hop)` with `from` the
    /// canonical (template) direction.
    pub fn hoppings(&self) -> impl Iterator<Item = (usize, usize, &Hop)> + '_ {
        self.graph
            .edge_references()
            .map(|edge| (edge.source().index(), edge.target().index(), edge.weight()))
    }

    /// Neighbor site indices (self-loops from length-1 periodic wrap
    /// excluded).
    pub fn neighbors(&self, site: usize) -> impl Iterator<Item = usize> + '_ {
        self.graph
            .neighbors(NodeIndex::new(site))
            .map(|n| n.index())
            .filter(move |&n| n != site)
    }

    /// Site positions in site order.
    pub fn positions(&self) -> Vec<[f64; 3]> {
        self.graph
            .node_indices()
            .map(|node| self.graph[node].position)
            .collect()
    }
}

fn cell_position(lattice: &Lattice, cell: [i32; 3], offset: [f64; 3]) -> [f64; 3] {
    let mut position = offset;
    for (axis, vector) in lattice.vectors().iter().enumerate() {
        let steps = cell[axis] as f64;
        position[0] += steps * vector[0];
        position[1] += steps * vector[1];
        position[2] += steps * vector[2];
    }
    position
}

/// Iteratively drop sites with fewer than `min_neighbors` distinct
/// neighbors; removal can expose new dangling sites, so loop to a fixed
/// point. Returns the keep mask.
fn prune_dangling(
    num_sites: usize,
    edges: &[(usize, usize, Hop)],
    min_neighbors: usize,
) -> Vec<bool> {
    let mut keep = vec![true; num_sites];
    if min_neighbors == 0 {
        return keep;
    }
    loop {
        let mut degree = vec![0usize; num_sites];
        for &(from, to, _) in edges {
            if from != to && keep[from] && keep[to] {
                degree[from] += 1;
                degree[to] += 1;
            }
        }
        let mut changed = false;
        for site in 0..num_sites {
            if keep[site] && degree[site] < min_neighbors {
                keep[site] = false;
                changed = true;
            }
        }
        if !changed {
            return keep;
        }
    }
}
