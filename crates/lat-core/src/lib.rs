//! # lat-core: Tight-Binding Lattice Modeling Core
//!
//! Provides the fundamental data structures for tight-binding simulations:
//! lattice models, shapes, concrete systems, and the modifier pipeline.
//!
//! ## Design Philosophy
//!
//! Structures are modeled as **undirected multigraphs** where:
//! - **Nodes**: concrete lattice sites (cell index, sublattice, position)
//! - **Edges**: hoppings instantiated from the lattice's templates
//!
//! A [`Lattice`] is the abstract periodic template; [`System::build`]
//! realizes it over a [`Shape`] into an immutable structure. Modifiers
//! adjust field values (onsite energies, hoppings, positions) without ever
//! mutating the system, which lets one structure be shared read-only
//! across many parameter-sweep evaluations.
//!
//! ## Quick Start
//!
//! ```rust
//! use lat_core::{Lattice, Shape, System};
//!
//! // Nearest-neighbor chain with hopping t = -1
//! let mut lattice = Lattice::new(vec![[1.0, 0.0, 0.0]]).unwrap();
//! let a = lattice.add_sublattice("a", [0.0; 3], 0.0).unwrap();
//! lattice.add_hopping([1, 0, 0], a, a, -1.0).unwrap();
//!
//! let system = System::build(lattice, &Shape::finite([10, 1, 1])).unwrap();
//! assert_eq!(system.num_sites(), 10);
//! assert_eq!(system.num_hoppings(), 9);
//! ```
//!
//! ## Modules
//!
//! - [`lattice`] - Sublattices, hopping templates, complex blocks
//! - [`shape`] - Finite/periodic structure footprints
//! - [`system`] - Concrete structure builder and adjacency
//! - [`modifier`] - Ordered field-transformation pipeline
//! - [`linalg`] - Process-wide dense-backend thread configuration
//! - [`error`] - Unified [`LatError`] taxonomy

pub mod error;
pub mod lattice;
pub mod linalg;
pub mod modifier;
pub mod shape;
pub mod system;

pub use error::{LatError, LatResult};
pub use lattice::{HoppingBlock, HoppingTemplate, Lattice, LatticeError, Sublattice, SublatticeId};
pub use linalg::{linalg_threads, set_linalg_threads};
pub use modifier::{apply_modifiers, FieldSet, Modifier, Params, SiteView};
pub use shape::Shape;
pub use system::{BuildError, Hop, Site, System};
