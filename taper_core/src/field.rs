//! # Continuous Section Field
//!
//! The owning object of the engine: two validated anchor sections, the
//! derived tolerance context, the compiled weight laws, and the lookup
//! cache. Immutable after construction; every query is a pure function of
//! `z`, so concurrent queries against one field need no synchronization.
//!
//! ## Query surface
//!
//! - [`ContinuousSectionField::section`] - raw interpolated geometry
//! - [`ContinuousSectionField::section_properties`] - integrated property set
//! - [`ContinuousSectionField::section_full_analysis`] - superset with torsion
//! - [`ContinuousSectionField::stations`] / [`stations_at`](ContinuousSectionField::stations_at) -
//!   ordered export records for the OpenSees/SAP2000 adapters
//!
//! ## Example
//!
//! ```rust
//! use taper_core::geometry::{Point, Polygon, Section};
//! use taper_core::field::ContinuousSectionField;
//!
//! // Rectangle tapering from 1.0 to 2.0 deep over a 10-unit member
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
//!
//! let field = ContinuousSectionField::new(s0, s1).unwrap();
//! let props = field.section_properties(1.0).unwrap();
//! assert!((props.area - 1.1).abs() < 1e-12);
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::containment::ContainmentForest;
use crate::diagnostics::{self, Warning};
use crate::errors::{FieldError, FieldResult};
use crate::geometry::{Point, Section, SectionSpec};
use crate::properties::{compute_properties, SectionProperties};
use crate::tolerance::ToleranceContext;
use crate::torsion::{self, TorsionAnalysis, TorsionModel, TorsionOptions};
use crate::weight_law::{LawBinding, LawScope, LookupCache, WeightLaw};

/// Full analysis record at one station: property set plus torsion block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionAnalysis {
    pub properties: SectionProperties,
    pub torsion: TorsionAnalysis,
}

/// Flat export record consumed by the station exporters. Reproducible from
/// (anchor geometry, weight laws) alone - adapters never need engine
/// internals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    pub z: f64,
    pub a: f64,
    pub cx: f64,
    pub cy: f64,
    pub ix: f64,
    pub iy: f64,
    pub ixy: f64,
    pub jp: f64,
    /// Selected torsion constant (policy-chosen, see [`crate::torsion`])
    pub torsion: f64,
    pub torsion_model: TorsionModel,
}

impl From<&SectionAnalysis> for StationRecord {
    fn from(analysis: &SectionAnalysis) -> Self {
        let p = &analysis.properties;
        StationRecord {
            z: p.z,
            a: p.area,
            cx: p.cx,
            cy: p.cy,
            ix: p.ix,
            iy: p.iy,
            ixy: p.ixy,
            jp: p.jp,
            torsion: analysis.torsion.j,
            torsion_model: analysis.torsion.model,
        }
    }
}

/// Continuously varying cross-section description of a non-prismatic
/// member, anchored by two sections with identical polygon topology.
#[derive(Debug)]
pub struct ContinuousSectionField {
    s0: Section,
    s1: Section,
    laws: HashMap<(String, String), WeightLaw>,
    tol: ToleranceContext,
    lookups: LookupCache,
    torsion_options: TorsionOptions,
}

impl ContinuousSectionField {
    /// Validate the anchor pair and construct the field.
    ///
    /// Enforced here, once, so queries never re-check:
    /// - `z1 > z0`
    /// - identical polygon name sets
    /// - identical per-name vertex counts
    pub fn new(s0: Section, s1: Section) -> FieldResult<Self> {
        if s1.z() <= s0.z() {
            return Err(FieldError::invalid_input(
                "z1",
                s1.z().to_string(),
                format!("end station must exceed start station z0 = {}", s0.z()),
            ));
        }

        if s0.len() != s1.len() {
            return Err(FieldError::topology_mismatch(
                "<section>",
                format!(
                    "anchor polygon counts differ ({} vs {})",
                    s0.len(),
                    s1.len()
                ),
            ));
        }
        for p0 in s0.polygons() {
            let p1 = s1.polygon(p0.name()).ok_or_else(|| {
                FieldError::topology_mismatch(p0.name(), "polygon missing from end anchor")
            })?;
            if p0.vertex_count() != p1.vertex_count() {
                return Err(FieldError::topology_mismatch(
                    p0.name(),
                    format!(
                        "vertex counts differ ({} vs {})",
                        p0.vertex_count(),
                        p1.vertex_count()
                    ),
                ));
            }
        }

        let tol = ToleranceContext::derive(&s0, &s1);
        log::debug!(
            "section field constructed: {} polygons, z in [{}, {}], scale {}",
            s0.len(),
            s0.z(),
            s1.z(),
            tol.scale
        );

        Ok(ContinuousSectionField {
            s0,
            s1,
            laws: HashMap::new(),
            tol,
            lookups: LookupCache::new(),
            torsion_options: TorsionOptions::default(),
        })
    }

    /// Construct from serialized anchor descriptions.
    pub fn from_specs(s0: &SectionSpec, s1: &SectionSpec) -> FieldResult<Self> {
        ContinuousSectionField::new(Section::from_spec(s0)?, Section::from_spec(s1)?)
    }

    /// Bind a weight law to a polygon pair. The expression is compiled
    /// here; syntax and sandbox violations are rejected at registration,
    /// not at first query.
    pub fn with_weight_law(
        mut self,
        start: impl Into<String>,
        end: impl Into<String>,
        expression: &str,
    ) -> FieldResult<Self> {
        let law = WeightLaw::compile(expression)?;
        self.laws.insert((start.into(), end.into()), law);
        Ok(self)
    }

    /// Bind a list of serialized law records.
    pub fn with_law_bindings(mut self, bindings: &[LawBinding]) -> FieldResult<Self> {
        for binding in bindings {
            self = self.with_weight_law(
                binding.start.clone(),
                binding.end.clone(),
                &binding.expression,
            )?;
        }
        Ok(self)
    }

    /// Override the torsion settings (solid α, strict thickness mode).
    pub fn with_torsion_options(mut self, options: TorsionOptions) -> Self {
        self.torsion_options = options;
        self
    }

    pub fn z0(&self) -> f64 {
        self.s0.z()
    }

    pub fn z1(&self) -> f64 {
        self.s1.z()
    }

    /// Member length z1 - z0
    pub fn length(&self) -> f64 {
        self.s1.z() - self.s0.z()
    }

    pub fn tolerance(&self) -> &ToleranceContext {
        &self.tol
    }

    pub fn anchors(&self) -> (&Section, &Section) {
        (&self.s0, &self.s1)
    }

    /// Interpolation parameter t ∈ [0, 1] for an in-domain station.
    /// Stations within `eps_lin` of an end are accepted and clamped.
    fn parameter(&self, z: f64) -> FieldResult<f64> {
        if z < self.z0() - self.tol.eps_lin || z > self.z1() + self.tol.eps_lin {
            return Err(FieldError::OutOfDomain {
                z,
                z0: self.z0(),
                z1: self.z1(),
            });
        }
        Ok(((z - self.z0()) / self.length()).clamp(0.0, 1.0))
    }

    /// Interpolated section at station `z`.
    ///
    /// Vertex matching is strictly index-based: vertex k of the result is
    /// `(1-t)·vertex_k(s0) + t·vertex_k(s1)`. No geometric re-ordering or
    /// nearest-point heuristics - pairing was fixed at construction.
    pub fn section(&self, z: f64) -> FieldResult<Section> {
        let t = self.parameter(z)?;
        let mut polygons = Vec::with_capacity(self.s0.len());

        for p0 in self.s0.polygons() {
            let p1 = self
                .s1
                .polygon(p0.name())
                .expect("anchor topology validated at construction");

            let vertices: Vec<Point> = p0
                .vertices()
                .iter()
                .zip(p1.vertices())
                .map(|(a, b)| Point::new(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y)))
                .collect();

            let w_linear = p0.weight() + t * (p1.weight() - p0.weight());
            let mut polygon = p0.with_geometry(vertices, w_linear)?;

            let key = (p0.name().to_string(), p1.name().to_string());
            if let Some(law) = self.laws.get(&key) {
                let scope = LawScope {
                    z,
                    w0: p0.weight(),
                    w1: p1.weight(),
                    length: self.length(),
                    current: &polygon,
                    start: p0,
                    end: p1,
                    lookups: &self.lookups,
                };
                let weight = law.evaluate(&scope)?;
                polygon = polygon.with_weight(weight);
            }
            polygons.push(polygon);
        }

        Section::new(z, polygons)
    }

    /// Resolve effective weights: `w_eff(P) = w_P - w_C` against the
    /// direct container C, else the declared weight. This is the only
    /// mechanism for voids, overlays and degradation - a void declares
    /// weight 0 and nets out its container without boolean geometry.
    pub fn effective_weights(&self, section: &Section) -> FieldResult<Vec<f64>> {
        let forest = ContainmentForest::build(section, &self.tol)?;
        let declared: Vec<f64> = section.polygons().iter().map(|p| p.weight()).collect();
        Ok(declared
            .iter()
            .enumerate()
            .map(|(i, &w)| match forest.direct_container(i) {
                Some(c) => w - declared[c],
                None => w,
            })
            .collect())
    }

    /// Integrated section properties at `z`, with diagnostics attached.
    pub fn section_properties(&self, z: f64) -> FieldResult<SectionProperties> {
        let section = self.section(z)?;
        let effective = self.effective_weights(&section)?;
        let mut props = compute_properties(z, section.polygons(), &effective, &self.tol)?;
        props.warnings = self.run_diagnostics(&section, &effective);
        Ok(props)
    }

    /// Full analysis: properties plus the torsion block.
    pub fn section_full_analysis(&self, z: f64) -> FieldResult<SectionAnalysis> {
        let section = self.section(z)?;
        let effective = self.effective_weights(&section)?;
        let mut properties = compute_properties(z, section.polygons(), &effective, &self.tol)?;
        properties.warnings = self.run_diagnostics(&section, &effective);

        let torsion = torsion::analyze(
            z,
            section.polygons(),
            &effective,
            properties.area,
            properties.jp,
            &self.tol,
            &self.torsion_options,
        );

        Ok(SectionAnalysis { properties, torsion })
    }

    /// Advisory side channel: self-intersection scan and the inspector
    /// weight-plausibility pass. Never fails.
    fn run_diagnostics(&self, section: &Section, effective: &[f64]) -> Vec<Warning> {
        let mut warnings = Vec::new();
        for polygon in section.polygons() {
            warnings.extend(diagnostics::self_intersections(polygon, &self.tol));
        }
        warnings.extend(diagnostics::inspect_weights(section, effective));
        warnings
    }

    /// Export records at `count` evenly spaced stations (endpoints
    /// included). `count` must be at least 2.
    pub fn stations(&self, count: usize) -> FieldResult<Vec<StationRecord>> {
        if count < 2 {
            return Err(FieldError::invalid_input(
                "station_count",
                count.to_string(),
                "at least two stations are required",
            ));
        }
        let step = self.length() / (count - 1) as f64;
        let zs: Vec<f64> = (0..count)
            .map(|i| {
                if i == count - 1 {
                    self.z1() // land exactly on the end anchor
                } else {
                    self.z0() + i as f64 * step
                }
            })
            .collect();
        self.stations_at(&zs)
    }

    /// Export records at explicit stations, in the given order.
    pub fn stations_at(&self, zs: &[f64]) -> FieldResult<Vec<StationRecord>> {
        zs.iter()
            .map(|&z| Ok(StationRecord::from(&self.section_full_analysis(z)?)))
            .collect()
    }
}
