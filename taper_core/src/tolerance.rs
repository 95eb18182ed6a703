//! # Tolerance Context
//!
//! Every geometric predicate downstream of field construction compares
//! against epsilons derived from the problem's own scale, not absolute
//! constants. The scale is the larger of the combined anchor bounding box
//! extents, the member length, and 1 (so tiny models never collapse the
//! epsilons to denormals).
//!
//! Derived once per field, read-only afterward.

use serde::{Deserialize, Serialize};

use crate::geometry::Section;

/// Relative factor for linear comparisons
const REL_LINEAR: f64 = 1e-9;

/// Derived numeric-scale object threaded through every predicate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceContext {
    /// Problem scale S = max(bbox_dx, bbox_dy, L, 1)
    pub scale: f64,
    /// Linear tolerance, ∝ S
    pub eps_lin: f64,
    /// Area tolerance, ∝ S²
    pub eps_area: f64,
    /// Matrix / plain numeric tolerance (scale-free)
    pub eps_num: f64,
}

impl ToleranceContext {
    /// Derive from the two anchor sections of a field.
    pub fn derive(s0: &Section, s1: &Section) -> Self {
        let bb = s0.bbox().merge(&s1.bbox());
        let length = (s1.z() - s0.z()).abs();
        let scale = bb.width().max(bb.height()).max(length).max(1.0);
        ToleranceContext {
            scale,
            eps_lin: REL_LINEAR * scale,
            eps_area: REL_LINEAR * scale * scale,
            eps_num: 1e-12,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Polygon, Section};

    fn rect(name: &str, w: f64, h: f64, z: f64) -> Section {
        Section::new(
            z,
            vec![Polygon::new(
                name,
                vec![
                    Point::new(0.0, 0.0),
                    Point::new(w, 0.0),
                    Point::new(w, h),
                    Point::new(0.0, h),
                ],
                1.0,
            )
            .unwrap()],
        )
        .unwrap()
    }

    #[test]
    fn test_scale_floor_is_one() {
        let tol = ToleranceContext::derive(&rect("a", 0.01, 0.01, 0.0), &rect("a", 0.01, 0.01, 0.5));
        assert_eq!(tol.scale, 1.0);
        assert_eq!(tol.eps_lin, 1e-9);
    }

    #[test]
    fn test_length_dominates() {
        let tol = ToleranceContext::derive(&rect("a", 2.0, 1.0, 0.0), &rect("a", 2.0, 1.0, 40.0));
        assert_eq!(tol.scale, 40.0);
        assert!((tol.eps_area - 1e-9 * 1600.0).abs() < 1e-18);
    }

    #[test]
    fn test_bbox_dominates() {
        let tol = ToleranceContext::derive(&rect("a", 80.0, 1.0, 0.0), &rect("a", 2.0, 1.0, 10.0));
        assert_eq!(tol.scale, 80.0);
    }
}
