//! Modifier pipeline: ordered, deterministic field transformations.
//!
//! Modifiers adjust site energies, hopping amplitudes, or site positions
//! before Hamiltonian assembly. They are applied strictly in registration
//! order (the pipeline composes, it does not commute), and each modifier
//! sees the output of the ones before it, including updated positions.
//!
//! A modifier may depend on site position, sublattice id, and the current
//! sweep parameters only; it never sees the assembled Hamiltonian. The
//! [`System`] itself is never mutated: applying the pipeline produces a
//! detached [`FieldSet`].
//!
//! Non-finite modifier output is deliberately not sanitized here; the
//! assembler detects it and fails that pipeline evaluation.

use std::collections::BTreeMap;
use std::fmt;

use crate::lattice::{HoppingBlock, SublatticeId};
use crate::system::System;

/// Sweep parameters visible to modifiers at one parameter point.
///
/// Ordered map so iteration (and anything derived from it) is
/// deterministic across workers.
pub type Params = BTreeMap<String, f64>;

/// The part of a site a modifier is allowed to see.
#[derive(Debug, Clone, Copy)]
pub struct SiteView<'a> {
    pub index: usize,
    /// Current position, including earlier position modifiers
    pub position: [f64; 3],
    pub sublattice: SublatticeId,
    pub sublattice_name: &'a str,
}

type OnsiteFn = dyn Fn(&HoppingBlock, &SiteView, &Params) -> HoppingBlock + Send + Sync;
type HoppingFn = dyn Fn(&HoppingBlock, &SiteView, &SiteView, &Params) -> HoppingBlock + Send + Sync;
type PositionFn = dyn Fn([f64; 3], &SiteView, &Params) -> [f64; 3] + Send + Sync;

/// A single registered transformation.
///
/// Closures must be deterministic given their inputs so sweep results are
/// reproducible regardless of worker scheduling.
pub enum Modifier {
    Onsite(Box<OnsiteFn>),
    Hopping(Box<HoppingFn>),
    Position(Box<PositionFn>),
}

impl Modifier {
    /// Transform onsite energy blocks.
    pub fn onsite<F>(f: F) -> Self
    where
        F: Fn(&HoppingBlock, &SiteView, &Params) -> HoppingBlock + Send + Sync + 'static,
    {
        Modifier::Onsite(Box::new(f))
    }

    /// Transform hopping blocks (canonical direction; the Hermitian mirror
    /// is derived at assembly).
    pub fn hopping<F>(f: F) -> Self
    where
        F: Fn(&HoppingBlock, &SiteView, &SiteView, &Params) -> HoppingBlock + Send + Sync + 'static,
    {
        Modifier::Hopping(Box::new(f))
    }

    /// Transform site positions (e.g. strain fields).
    pub fn position<F>(f: F) -> Self
    where
        F: Fn([f64; 3], &SiteView, &Params) -> [f64; 3] + Send + Sync + 'static,
    {
        Modifier::Position(Box::new(f))
    }
}

impl fmt::Debug for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modifier::Onsite(_) => f.write_str("Modifier::Onsite"),
            Modifier::Hopping(_) => f.write_str("Modifier::Hopping"),
            Modifier::Position(_) => f.write_str("Modifier::Position"),
        }
    }
}

/// Modified field values for one pipeline evaluation.
///
/// `onsite[i]` belongs to site `i`; `hoppings[e]` to the system's edge `e`
/// in its canonical direction.
#[derive(Debug, Clone)]
pub struct FieldSet {
    pub positions: Vec<[f64; 3]>,
    pub onsite: Vec<HoppingBlock>,
    pub hoppings: Vec<HoppingBlock>,
}

impl FieldSet {
    /// Seed unmodified fields from a system.
    pub fn from_system(system: &System) -> Self {
        let lattice = system.lattice();
        let onsite = (0..system.num_sites())
            .map(|site| {
                let sub = system.site(site).sublattice;
                lattice.sublattices()[sub.value()].onsite.clone()
            })
            .collect();
        let hoppings = system
            .hoppings()
            .map(|(_, _, hop)| lattice.hoppings()[hop.template].block.clone())
            .collect();
        FieldSet {
            positions: system.positions(),
            onsite,
            hoppings,
        }
    }
}

/// Apply a modifier pipeline in registration order.
pub fn apply_modifiers(system: &System, modifiers: &[Modifier], params: &Params) -> FieldSet {
    let mut fields = FieldSet::from_system(system);
    let lattice = system.lattice();
    let view = |fields: &FieldSet, site: usize| -> SiteView<'_> {
        let sub = system.site(site).sublattice;
        SiteView {
            index: site,
            position: fields.positions[site],
            sublattice: sub,
            sublattice_name: &lattice.sublattices()[sub.value()].name,
        }
    };

    for modifier in modifiers {
        match modifier {
            Modifier::Position(f) => {
                for site in 0..system.num_sites() {
                    let site_view = view(&fields, site);
                    fields.positions[site] = f(fields.positions[site], &site_view, params);
                }
            }
            Modifier::Onsite(f) => {
                for site in 0..system.num_sites() {
                    let site_view = view(&fields, site);
                    fields.onsite[site] = f(&fields.onsite[site], &site_view, params);
                }
            }
            Modifier::Hopping(f) => {
                for (edge, (from, to, _)) in system.hoppings().enumerate() {
                    let from_view = view(&fields, from);
                    let to_view = view(&fields, to);
                    fields.hoppings[edge] = f(&fields.hoppings[edge], &from_view, &to_view, params);
                }
            }
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::Lattice;
    use crate::shape::Shape;
    use num_complex::Complex64;

    fn two_site_system() -> System {
        let mut lat = Lattice::new(vec![[1.0, 0.0, 0.0]]).unwrap();
        let a = lat.add_sublattice("a", [0.0; 3], 0.0).unwrap();
        lat.add_hopping([1, 0, 0], a, a, -1.0).unwrap();
        System::build(lat, &Shape::finite([2, 1, 1])).unwrap()
    }

    fn shift(amount: f64) -> Modifier {
        Modifier::onsite(move |block, _, _| {
            let mut out = block.clone();
            out.set(0, 0, block.get(0, 0) + Complex64::new(amount, 0.0));
            out
        })
    }

    fn double() -> Modifier {
        Modifier::onsite(|block, _, _| {
            let mut out = block.clone();
            out.set(0, 0, block.get(0, 0) * 2.0);
            out
        })
    }

    #[test]
    fn pipeline_is_order_sensitive() {
        // (0 + 1) * 2 = 2 vs (0 * 2) + 1 = 1: the pair doesn't commute.
        let system = two_site_system();
        let params = Params::new();

        let ab = apply_modifiers(&system, &[shift(1.0), double()], &params);
        let ba = apply_modifiers(&system, &[double(), shift(1.0)], &params);

        assert_eq!(ab.onsite[0].get(0, 0), Complex64::new(2.0, 0.0));
        assert_eq!(ba.onsite[0].get(0, 0), Complex64::new(1.0, 0.0));
        assert_ne!(ab.onsite[0], ba.onsite[0]);
    }

    #[test]
    fn later_modifiers_see_updated_positions() {
        let system = two_site_system();
        let params = Params::new();
        let stretch = Modifier::position(|pos, _, _| [pos[0] * 2.0, pos[1], pos[2]]);
        // Potential proportional to the *modified* x coordinate.
        let ramp = Modifier::onsite(|block, site, _| {
            let mut out = block.clone();
            out.set(0, 0, Complex64::new(site.position[0], 0.0));
            out
        });

        let fields = apply_modifiers(&system, &[stretch, ramp], &params);
        assert_eq!(fields.positions[1][0], 2.0);
        assert_eq!(fields.onsite[1].get(0, 0), Complex64::new(2.0, 0.0));
    }

    #[test]
    fn parameters_reach_the_closures() {
        let system = two_site_system();
        let mut params = Params::new();
        params.insert("w".to_string(), 0.5);
        let field = Modifier::hopping(|block, _, _, params| {
            let mut out = block.clone();
            out.set(0, 0, block.get(0, 0) * params["w"]);
            out
        });

        let fields = apply_modifiers(&system, &[field], &params);
        assert_eq!(fields.hoppings[0].get(0, 0), Complex64::new(-0.5, 0.0));
    }

    #[test]
    fn system_is_not_mutated() {
        let system = two_site_system();
        let params = Params::new();
        let stretch = Modifier::position(|pos, _, _| [pos[0] + 10.0, pos[1], pos[2]]);
        let fields = apply_modifiers(&system, &[stretch], &params);
        assert_eq!(fields.positions[0][0], 10.0);
        // Original positions untouched
        assert_eq!(system.site(0).position[0], 0.0);
    }
}
