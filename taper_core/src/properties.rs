//! # Section Property Integrator
//!
//! Computes the homogenized property set of a weighted polygon collection
//! via closed-form polygonal integrals: signed shoelace sums per polygon,
//! each scaled by its effective weight, summed, then transported to the
//! composite centroid with the parallel-axis theorem.
//!
//! ## Notation
//!
//! - `A` = net weighted area
//! - `Cx`, `Cy` = weighted centroid
//! - `Ix`, `Iy`, `Ixy` = centroidal second moments / product of inertia
//! - `Jp = Ix + Iy` = polar moment about the centroid (**not** the
//!   Saint-Venant torsion constant - see [`crate::torsion`])
//! - `I1`, `I2` = principal moments, `rx`, `ry` = radii of gyration
//! - `Wx`, `Wy` = elastic moduli from extreme-fiber distances
//! - `Q_na` = first moment of the sub-area above the neutral axis
//!
//! ## Reference
//!
//! - Green's-theorem vertex sums: any structural mechanics text
//! - Parallel axis: I_centroid = I_origin - A·d²

use serde::{Deserialize, Serialize};

use crate::diagnostics::Warning;
use crate::errors::{FieldError, FieldResult};
use crate::geometry::{loop_integrals, Point, Polygon};
use crate::tolerance::ToleranceContext;

/// Homogenized cross-section properties at one station.
///
/// All moments are centroidal. Serialized flat so exporters consume the
/// record without engine types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionProperties {
    /// Station coordinate
    pub z: f64,
    /// Net weighted area
    pub area: f64,
    /// Weighted centroid
    pub cx: f64,
    pub cy: f64,
    /// Centroidal second moments
    pub ix: f64,
    pub iy: f64,
    pub ixy: f64,
    /// Polar moment Ix + Iy (not Saint-Venant torsion)
    pub jp: f64,
    /// Principal moments and axis angle (radians from x to axis of I1)
    pub i1: f64,
    pub i2: f64,
    pub principal_angle: f64,
    /// Radii of gyration √(I/A)
    pub rx: f64,
    pub ry: f64,
    /// Elastic moduli I / c_max
    pub wx: f64,
    pub wy: f64,
    /// First moment of the sub-area above the neutral axis
    pub q_na: f64,
    /// Advisory findings accumulated during the query
    #[serde(default)]
    pub warnings: Vec<Warning>,
}

/// Clip a vertex loop against the half-plane `y >= cut`
/// (Sutherland-Hodgman, single clip edge).
fn clip_above(vertices: &[Point], cut: f64) -> Vec<Point> {
    let n = vertices.len();
    let mut out = Vec::with_capacity(n + 2);
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        let a_in = a.y >= cut;
        let b_in = b.y >= cut;
        if a_in {
            out.push(a);
        }
        if a_in != b_in {
            let t = (cut - a.y) / (b.y - a.y);
            out.push(Point::new(a.x + t * (b.x - a.x), cut));
        }
    }
    out
}

/// Integrate the weighted polygon set.
///
/// `effective[i]` is the resolved effective weight of `polygons[i]` (the
/// container subtraction already applied). A net area within the area
/// tolerance of zero is the hard `DegenerateSection` error: centroid and
/// moduli would be undefined, and nothing downstream can use them.
pub fn compute_properties(
    z: f64,
    polygons: &[Polygon],
    effective: &[f64],
    tol: &ToleranceContext,
) -> FieldResult<SectionProperties> {
    debug_assert_eq!(polygons.len(), effective.len());

    // === Weighted origin-referenced sums ===
    let mut area = 0.0;
    let mut qx = 0.0;
    let mut qy = 0.0;
    let mut ixx = 0.0;
    let mut iyy = 0.0;
    let mut ixy_o = 0.0;
    for (polygon, &w) in polygons.iter().zip(effective) {
        let g = polygon.integrals();
        area += w * g.area;
        qx += w * g.qx;
        qy += w * g.qy;
        ixx += w * g.ixx;
        iyy += w * g.iyy;
        ixy_o += w * g.ixy;
    }

    if area.abs() <= tol.eps_area {
        return Err(FieldError::DegenerateSection { z, area });
    }

    // === Centroid and parallel-axis transport ===
    let cx = qy / area;
    let cy = qx / area;
    let ix = ixx - area * cy * cy;
    let iy = iyy - area * cx * cx;
    let ixy = ixy_o - area * cx * cy;
    let jp = ix + iy;

    // === Principal moments: 2x2 eigen-decomposition in closed form ===
    let avg = (ix + iy) / 2.0;
    let half_diff = (ix - iy) / 2.0;
    let radius = (half_diff * half_diff + ixy * ixy).sqrt();
    let i1 = avg + radius;
    let i2 = avg - radius;
    let principal_angle = if radius <= tol.eps_num {
        0.0
    } else {
        0.5 * (-ixy).atan2(half_diff)
    };

    // Magnitude radii; the sign of a net weight carries no length meaning
    let rx = (ix / area).abs().sqrt();
    let ry = (iy / area).abs().sqrt();

    // === Extreme-fiber distances over weight-bearing polygons ===
    let mut cx_max: f64 = 0.0;
    let mut cy_max: f64 = 0.0;
    for (polygon, &w) in polygons.iter().zip(effective) {
        if w.abs() <= tol.eps_num {
            continue;
        }
        for v in polygon.vertices() {
            cx_max = cx_max.max((v.x - cx).abs());
            cy_max = cy_max.max((v.y - cy).abs());
        }
    }
    let wx = if cy_max > tol.eps_lin { ix / cy_max } else { 0.0 };
    let wy = if cx_max > tol.eps_lin { iy / cx_max } else { 0.0 };

    // === First moment above the neutral axis ===
    let mut q_na = 0.0;
    for (polygon, &w) in polygons.iter().zip(effective) {
        let clipped = clip_above(polygon.vertices(), cy);
        if clipped.len() < 3 {
            continue;
        }
        let g = loop_integrals(&clipped);
        q_na += w * (g.qx - cy * g.area);
    }

    Ok(SectionProperties {
        z,
        area,
        cx,
        cy,
        ix,
        iy,
        ixy,
        jp,
        i1,
        i2,
        principal_angle,
        rx,
        ry,
        wx,
        wy,
        q_na,
        warnings: Vec::new(),
    })
}
