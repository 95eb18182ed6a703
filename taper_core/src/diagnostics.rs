//! # Diagnostics
//!
//! Advisory checks that run beside property computation and never block it:
//! self-intersection scans over each polygon and the "inspector" physical
//! plausibility pass over resolved weights. Findings are returned as
//! [`Warning`] records attached to results - warnings accumulate, they are
//! never thrown.

use serde::{Deserialize, Serialize};

use crate::containment::segments_cross;
use crate::geometry::{Polygon, PolygonClass, Section};
use crate::tolerance::ToleranceContext;

/// Advisory finding categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Two non-adjacent edges of one polygon properly cross
    SelfIntersection,
    /// Resolved weight is physically implausible for the polygon's class
    ImplausibleWeight,
    /// A torsion estimator was skipped (scoped model error)
    TorsionModelSkipped,
    /// The selection policy fell back to the low-fidelity empirical estimate
    TorsionFallback,
}

/// A non-fatal finding attached to a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: WarningKind,
    /// Offending polygon, when the finding is polygon-scoped
    pub polygon: Option<String>,
    /// Station the finding was observed at
    pub z: Option<f64>,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Warning {
            kind,
            polygon: None,
            z: None,
            message: message.into(),
        }
    }

    pub fn for_polygon(mut self, polygon: impl Into<String>) -> Self {
        self.polygon = Some(polygon.into());
        self
    }

    pub fn at_station(mut self, z: f64) -> Self {
        self.z = Some(z);
        self
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.polygon, &self.z) {
            (Some(p), Some(z)) => write!(f, "[{:?}] {} (polygon '{p}', z = {z})", self.kind, self.message),
            (Some(p), None) => write!(f, "[{:?}] {} (polygon '{p}')", self.kind, self.message),
            (None, Some(z)) => write!(f, "[{:?}] {} (z = {z})", self.kind, self.message),
            (None, None) => write!(f, "[{:?}] {}", self.kind, self.message),
        }
    }
}

/// Scan one polygon for proper crossings between non-adjacent edges.
///
/// Adjacent edges (sharing a vertex) and collinear overlaps are skipped:
/// the bridge edges of a `@cell` dual-loop encoding retrace the same
/// segment in opposite directions and must not be flagged. Zero-length
/// edges (explicit loop closes) cannot properly cross anything.
pub fn self_intersections(polygon: &Polygon, tol: &ToleranceContext) -> Vec<Warning> {
    let verts = polygon.vertices();
    let n = verts.len();
    let mut warnings = Vec::new();

    for i in 0..n {
        let a1 = verts[i];
        let a2 = verts[(i + 1) % n];
        for j in (i + 2)..n {
            // Skip the wrap-around adjacency between the last and first edge
            if i == 0 && j == n - 1 {
                continue;
            }
            let b1 = verts[j];
            let b2 = verts[(j + 1) % n];
            if segments_cross(a1, a2, b1, b2, tol.eps_area) {
                warnings.push(
                    Warning::new(
                        WarningKind::SelfIntersection,
                        format!("edges {}-{} and {}-{} cross", i + 1, i + 2, j + 1, j + 2),
                    )
                    .for_polygon(polygon.name()),
                );
            }
        }
    }
    warnings
}

/// Inspector pass: flag physically implausible resolved weights without
/// altering them. A polygon classified `Solid` nominally represents
/// material; a negative declared or effective weight there is suspicious,
/// while on overlay/void polygons negative effective weights are how
/// subtraction works and stay silent.
pub fn inspect_weights(section: &Section, effective: &[f64]) -> Vec<Warning> {
    let mut warnings = Vec::new();
    for (polygon, &w_eff) in section.polygons().iter().zip(effective) {
        if polygon.class() != PolygonClass::Solid {
            continue;
        }
        if polygon.weight() < 0.0 {
            warnings.push(
                Warning::new(
                    WarningKind::ImplausibleWeight,
                    format!("declared weight {} is negative on a solid polygon", polygon.weight()),
                )
                .for_polygon(polygon.name())
                .at_station(section.z()),
            );
        } else if w_eff < 0.0 {
            warnings.push(
                Warning::new(
                    WarningKind::ImplausibleWeight,
                    format!("effective weight {w_eff} is negative on a solid polygon"),
                )
                .for_polygon(polygon.name())
                .at_station(section.z()),
            );
        }
    }
    warnings
}
