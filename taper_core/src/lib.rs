//! # taper_core - Continuous Section Field Engine
//!
//! `taper_core` computes continuously varying cross-sectional geometry and
//! homogenized stiffness properties for non-prismatic structural members.
//! A member is described by two anchor cross-sections of weighted polygons
//! (at stations z0 and z1); the engine interpolates the geometry, resolves
//! material weights through polygon containment, and integrates section
//! properties and torsion-constant estimates at any station in between.
//!
//! ## Design Philosophy
//!
//! - **Stateless queries**: the field is immutable after construction and
//!   every query is a pure function of `z` - safe to map over stations in
//!   parallel from the caller's side
//! - **JSON-First**: all inputs and result records implement
//!   Serialize/Deserialize so export adapters consume plain data
//! - **Rich Errors**: structured error types with precise locations, not
//!   just strings
//! - **Validate once**: topology and winding invariants are enforced at
//!   construction so per-query code never re-checks them
//!
//! ## Quick Start
//!
//! ```rust
//! use taper_core::geometry::{Point, Polygon, Section};
//! use taper_core::field::ContinuousSectionField;
//!
//! let rect = |h: f64| {
//!     vec![
//!         Point::new(0.0, 0.0),
//!         Point::new(1.0, 0.0),
//!         Point::new(1.0, h),
//!         Point::new(0.0, h),
//!     ]
//! };
//! let s0 = Section::new(0.0, vec![Polygon::new("deck", rect(1.0), 1.0).unwrap()]).unwrap();
//! let s1 = Section::new(10.0, vec![Polygon::new("deck", rect(2.0), 1.0).unwrap()]).unwrap();
//! let field = ContinuousSectionField::new(s0, s1).unwrap();
//!
//! let records = field.stations(11).unwrap();
//! assert_eq!(records.len(), 11);
//! ```
//!
//! ## Modules
//!
//! - [`geometry`] - points, weighted polygons, sections, tag classification
//! - [`tolerance`] - derived scale and epsilons used by every predicate
//! - [`containment`] - strict-interior partial order and direct containers
//! - [`weight_law`] - sandboxed per-pair weight expressions and lookup tables
//! - [`properties`] - weighted polygonal integrals and derived quantities
//! - [`torsion`] - competing torsion estimators and the selection policy
//! - [`diagnostics`] - advisory warnings (self-intersection, inspector)
//! - [`field`] - the continuous section field and its query surface
//! - [`errors`] - structured error types

pub mod containment;
pub mod diagnostics;
pub mod errors;
pub mod field;
pub mod geometry;
pub mod properties;
pub mod tolerance;
pub mod torsion;
pub mod weight_law;

// Re-export commonly used types at crate root for convenience
pub use errors::{FieldError, FieldResult};
pub use field::{ContinuousSectionField, SectionAnalysis, StationRecord};
pub use geometry::{Point, Polygon, PolygonClass, Section, SectionSpec};
pub use properties::SectionProperties;
pub use torsion::{TorsionAnalysis, TorsionModel, TorsionOptions};
