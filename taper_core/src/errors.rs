//! # Error Types
//!
//! Structured error types for taper_core. Every fatal condition carries the
//! location that triggered it (polygon name, station z, expression text,
//! file path) so callers can report it without reaching into engine state.
//!
//! Errors follow the taxonomy of the engine contract:
//!
//! - **Construction-time** - topology mismatch, invalid polygon, duplicate
//!   names. Rejected before any query is served.
//! - **Query-time geometry** - out-of-domain z, ambiguous containment,
//!   degenerate section. Abort the single query that triggered them.
//! - **Weight-law** - syntax/sandbox violations, non-finite results,
//!   missing or malformed lookup tables.
//! - **Torsion-model** - malformed `@cell` encodings and missing `@t=` tags
//!   are scoped to one estimator; the torsion module converts them to
//!   warnings and falls through. They only surface as errors from the
//!   estimator internals.
//!
//! Warnings are never represented here - see [`crate::diagnostics`].
//!
//! ## Example
//!
//! ```rust
//! use taper_core::errors::{FieldError, FieldResult};
//!
//! fn validate_station_count(n: usize) -> FieldResult<()> {
//!     if n < 2 {
//!         return Err(FieldError::invalid_input(
//!             "station_count",
//!             n.to_string(),
//!             "At least two stations are required",
//!         ));
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for taper_core operations
pub type FieldResult<T> = Result<T, FieldError>;

/// Structured error type for section field operations.
///
/// Each variant provides specific context about what went wrong, enabling
/// programmatic handling by the action runner and exporters.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum FieldError {
    /// An input value is invalid (out of range, wrong count, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// A polygon failed geometric validation (too few vertices, CW winding,
    /// non-positive area, unparseable tag)
    #[error("Invalid polygon '{polygon}': {reason}")]
    InvalidPolygon { polygon: String, reason: String },

    /// Two polygons in one section share a name
    #[error("Duplicate polygon name '{polygon}' in section at z = {z}")]
    DuplicatePolygon { polygon: String, z: f64 },

    /// The two anchor sections disagree on polygon names or vertex counts
    #[error("Anchor topology mismatch for '{polygon}': {reason}")]
    TopologyMismatch { polygon: String, reason: String },

    /// Query station lies outside [z0, z1]
    #[error("Station z = {z} outside field domain [{z0}, {z1}]")]
    OutOfDomain { z: f64, z0: f64, z1: f64 },

    /// Two polygon interiors intersect without full containment.
    /// There is no boolean/clip fallback; the geometry must be fixed.
    #[error("Ambiguous containment between '{polygon_a}' and '{polygon_b}' at z = {z}: interiors overlap without full containment")]
    AmbiguousContainment {
        polygon_a: String,
        polygon_b: String,
        z: f64,
    },

    /// Net weighted area is zero within tolerance; centroid and moduli
    /// would be undefined
    #[error("Degenerate section at z = {z}: net area {area} is zero within tolerance")]
    DegenerateSection { z: f64, area: f64 },

    /// Weight-law expression failed to parse
    #[error("Syntax error in weight law '{expression}' at offset {position}: {reason}")]
    ExprSyntax {
        expression: String,
        position: usize,
        reason: String,
    },

    /// Weight-law expression referenced a symbol outside the allow-list
    #[error("Sandboxed weight law '{expression}' references disallowed symbol '{symbol}'")]
    SandboxViolation { expression: String, symbol: String },

    /// Weight-law evaluation produced NaN or infinity
    #[error("Weight law '{expression}' produced non-finite value {value} at z = {z}")]
    NumericInvalid {
        expression: String,
        z: f64,
        value: String,
    },

    /// `E_lookup` target file does not exist
    #[error("Lookup table not found: '{path}'")]
    LookupMissing { path: String },

    /// `E_lookup` target file exists but cannot be parsed
    #[error("Malformed lookup table '{path}' at line {line}: {reason}")]
    LookupMalformed {
        path: String,
        line: usize,
        reason: String,
    },

    /// `@cell` polygon does not follow the strict dual-loop vertex encoding
    #[error("Malformed closed-cell encoding in '{polygon}': {reason}")]
    CellEncoding { polygon: String, reason: String },

    /// Strict-thickness mode requires an explicit `@t=` tag
    #[error("Polygon '{polygon}' has no @t= thickness tag (strict mode)")]
    MissingThickness { polygon: String },
}

impl FieldError {
    /// Create an InvalidInput error
    pub fn invalid_input(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        FieldError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidPolygon error
    pub fn invalid_polygon(polygon: impl Into<String>, reason: impl Into<String>) -> Self {
        FieldError::InvalidPolygon {
            polygon: polygon.into(),
            reason: reason.into(),
        }
    }

    /// Create a TopologyMismatch error
    pub fn topology_mismatch(polygon: impl Into<String>, reason: impl Into<String>) -> Self {
        FieldError::TopologyMismatch {
            polygon: polygon.into(),
            reason: reason.into(),
        }
    }

    /// Create an ExprSyntax error
    pub fn expr_syntax(
        expression: impl Into<String>,
        position: usize,
        reason: impl Into<String>,
    ) -> Self {
        FieldError::ExprSyntax {
            expression: expression.into(),
            position,
            reason: reason.into(),
        }
    }

    /// Create a CellEncoding error
    pub fn cell_encoding(polygon: impl Into<String>, reason: impl Into<String>) -> Self {
        FieldError::CellEncoding {
            polygon: polygon.into(),
            reason: reason.into(),
        }
    }

    /// True for errors scoped to a single torsion estimator. The selection
    /// policy converts these to warnings and falls through; everything else
    /// aborts the query that raised it.
    pub fn is_torsion_scoped(&self) -> bool {
        matches!(
            self,
            FieldError::CellEncoding { .. } | FieldError::MissingThickness { .. }
        )
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            FieldError::InvalidInput { .. } => "INVALID_INPUT",
            FieldError::InvalidPolygon { .. } => "INVALID_POLYGON",
            FieldError::DuplicatePolygon { .. } => "DUPLICATE_POLYGON",
            FieldError::TopologyMismatch { .. } => "TOPOLOGY_MISMATCH",
            FieldError::OutOfDomain { .. } => "OUT_OF_DOMAIN",
            FieldError::AmbiguousContainment { .. } => "AMBIGUOUS_CONTAINMENT",
            FieldError::DegenerateSection { .. } => "DEGENERATE_SECTION",
            FieldError::ExprSyntax { .. } => "EXPR_SYNTAX",
            FieldError::SandboxViolation { .. } => "SANDBOX_VIOLATION",
            FieldError::NumericInvalid { .. } => "NUMERIC_INVALID",
            FieldError::LookupMissing { .. } => "LOOKUP_MISSING",
            FieldError::LookupMalformed { .. } => "LOOKUP_MALFORMED",
            FieldError::CellEncoding { .. } => "CELL_ENCODING",
            FieldError::MissingThickness { .. } => "MISSING_THICKNESS",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = FieldError::invalid_polygon("web", "signed area is not positive");
        let json = serde_json::to_string(&error).unwrap();
        let roundtrip: FieldError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            FieldError::OutOfDomain {
                z: 12.0,
                z0: 0.0,
                z1: 10.0
            }
            .error_code(),
            "OUT_OF_DOMAIN"
        );
        assert_eq!(
            FieldError::LookupMissing {
                path: "mods.txt".to_string()
            }
            .error_code(),
            "LOOKUP_MISSING"
        );
    }

    #[test]
    fn test_torsion_scoping() {
        assert!(FieldError::cell_encoding("tube@cell", "odd vertex count").is_torsion_scoped());
        assert!(FieldError::MissingThickness {
            polygon: "web@wall".to_string()
        }
        .is_torsion_scoped());
        assert!(!FieldError::DegenerateSection { z: 1.0, area: 0.0 }.is_torsion_scoped());
    }
}
