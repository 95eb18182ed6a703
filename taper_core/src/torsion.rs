//! # Torsion Estimators
//!
//! Three independent torsion-constant models with distinct validity
//! domains, plus a Roark-corrected closed-cell estimate with a fidelity
//! index, combined by a deterministic three-state selection policy. None
//! of this solves the Saint-Venant boundary-value problem; every output is
//! a closed-form or thin-wall approximation with bounded validity.
//!
//! ## Models
//!
//! - **Solid**: `J ≈ α·Jp` with a caller-supplied shape calibration α
//!   (1.0 exact for circles, ≈0.8436 the reference value for squares).
//!   No shape classification is attempted.
//! - **Open thin-wall** (`@wall` polygons): strip formula `b·t³/3` in the
//!   equivalent form `A·t²/3`, thickness explicit (`@t=`) or estimated as
//!   `2A/P`; contributions accumulate as `Σ|w|·Jᵢ`.
//! - **Closed thin-wall** (`@cell` polygons): Bredt-Batho
//!   `J = 4·Am²·t/bm` over the cell midline, decoded from the strict
//!   dual-loop vertex encoding.
//! - **Roark-corrected closed cell**: `J·(1 + t²/(4·r_eq²))` with
//!   `r_eq = bm/(2π)` - exact for a circular tube of any wall ratio.
//!
//! ## Selection policy (acyclic, no retries)
//!
//! 1. closed cell decoded and fidelity ≥ 0.6 → Roark value
//! 2. no closed cell present → open estimate if any wall, else solid
//! 3. otherwise → empirical `K ≈ A⁴/(40·Jp)` with an explicit warning
//!
//! Estimator-scoped failures (malformed cell encoding, missing `@t=` in
//! strict mode) abort only that estimator: they become warnings and the
//! policy falls through.

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Warning, WarningKind};
use crate::errors::{FieldError, FieldResult};
use crate::geometry::{loop_area, loop_perimeter, Point, Polygon, PolygonClass};
use crate::tolerance::ToleranceContext;

/// Fidelity gate below which the Roark closed-cell value is not trusted
const FIDELITY_GATE: f64 = 0.6;

/// Caller-tunable torsion settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TorsionOptions {
    /// Shape calibration for the solid approximation `J ≈ α·Jp`
    pub alpha: f64,
    /// Require explicit `@t=` tags on thin-wall polygons instead of
    /// estimating thickness from geometry
    pub strict_thickness: bool,
}

impl Default for TorsionOptions {
    fn default() -> Self {
        TorsionOptions {
            alpha: 1.0,
            strict_thickness: false,
        }
    }
}

/// Which estimator the selection policy settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TorsionModel {
    RoarkClosedCell,
    OpenThinWall,
    SolidApprox,
    Empirical,
}

impl TorsionModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TorsionModel::RoarkClosedCell => "roark-closed-cell",
            TorsionModel::OpenThinWall => "open-thin-wall",
            TorsionModel::SolidApprox => "solid-approx",
            TorsionModel::Empirical => "empirical",
        }
    }
}

impl std::fmt::Display for TorsionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All torsion outputs at one station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorsionAnalysis {
    /// Solid approximation α·Jp (always defined)
    pub j_solid: f64,
    /// Open thin-wall sum over `@wall` polygons, if any applied
    pub j_open: Option<f64>,
    /// Bredt-Batho sum over `@cell` polygons, if any decoded
    pub j_bredt: Option<f64>,
    /// Roark-corrected closed-cell sum
    pub j_roark: Option<f64>,
    /// Thin-wall fidelity index in [0, 1], worst cell governs
    pub fidelity: Option<f64>,
    /// Selected model per the policy above
    pub model: TorsionModel,
    /// Selected torsion constant
    pub j: f64,
    /// Estimator-scoped findings (skips, fallback notices)
    #[serde(default)]
    pub warnings: Vec<Warning>,
}

/// Decoded midline geometry of one closed cell.
#[derive(Debug)]
struct CellGeometry {
    /// Midline enclosed area
    a_mid: f64,
    /// Midline perimeter
    b_mid: f64,
    thickness: f64,
    fidelity: f64,
}

/// Decode the strict dual-loop `@cell` vertex encoding.
///
/// Layout: outer loop CCW explicitly closed by repeating its first vertex,
/// then inner loop CW explicitly closed likewise. Equal loop lengths,
/// phase-aligned index correspondence. Any violation is a hard
/// `CellEncoding` error; the encoding is never repaired by resampling.
fn decode_cell(
    polygon: &Polygon,
    tol: &ToleranceContext,
    strict_thickness: bool,
) -> FieldResult<CellGeometry> {
    let verts = polygon.vertices();
    let m = verts.len();
    let fail = |reason: &str| FieldError::cell_encoding(polygon.name(), reason);

    if m < 8 || m % 2 != 0 {
        return Err(fail("dual-loop encoding needs an even vertex count of at least 8"));
    }
    let half = m / 2;
    let closes = |a: Point, b: Point| a.distance_to(&b) <= tol.eps_lin;
    if !closes(verts[half - 1], verts[0]) {
        return Err(fail("outer loop is not explicitly closed"));
    }
    if !closes(verts[m - 1], verts[half]) {
        return Err(fail("inner loop is not explicitly closed"));
    }

    let outer = &verts[..half - 1];
    let inner = &verts[half..m - 1];
    let a_outer = loop_area(outer);
    if a_outer <= 0.0 {
        return Err(fail("outer loop must wind CCW"));
    }
    let a_inner_signed = loop_area(inner);
    if a_inner_signed >= 0.0 {
        return Err(fail("inner loop must wind CW"));
    }
    let a_inner = -a_inner_signed;

    // The dual loops must account for the polygon's net area exactly;
    // disagreement means the encoding is corrupt, not thin-walled.
    let net = a_outer - a_inner;
    if (net - polygon.area()).abs() > tol.eps_area {
        return Err(fail("outer minus inner loop area disagrees with net polygon area"));
    }

    // Midline: point-wise average of outer vertices with the reversed
    // (phase-aligned) inner loop
    let k = half - 1;
    let mut mid = Vec::with_capacity(k);
    for j in 0..k {
        let paired = if j == 0 { inner[0] } else { inner[k - j] };
        mid.push(outer[j].midpoint(&paired));
    }
    let a_mid = loop_area(&mid);
    let b_mid = loop_perimeter(&mid);
    if a_mid <= tol.eps_area || b_mid <= tol.eps_lin {
        return Err(fail("degenerate midline loop"));
    }

    let thickness = match polygon.class().explicit_thickness() {
        Some(t) => t,
        None if strict_thickness => {
            return Err(FieldError::MissingThickness {
                polygon: polygon.name().to_string(),
            });
        }
        None => net / b_mid,
    };

    // Fidelity: thin-wall validity term times isoperimetric regularity.
    // A circular tube at t/r = 0.1 scores ~0.8; a square box ~0.74; a
    // thick or ragged cell falls under the 0.6 gate.
    let r_eq = b_mid / (2.0 * std::f64::consts::PI);
    let thin = (1.0 - (thickness / r_eq) / 0.5).clamp(0.0, 1.0);
    let regularity = (4.0 * std::f64::consts::PI * a_mid / (b_mid * b_mid)).clamp(0.0, 1.0);

    Ok(CellGeometry {
        a_mid,
        b_mid,
        thickness,
        fidelity: thin * regularity,
    })
}

/// Run every applicable estimator and apply the selection policy.
///
/// `jp` and `area` are the centroidal polar moment and net weighted area
/// of the same weighted polygon set (from the property integrator).
pub fn analyze(
    z: f64,
    polygons: &[Polygon],
    effective: &[f64],
    area: f64,
    jp: f64,
    tol: &ToleranceContext,
    opts: &TorsionOptions,
) -> TorsionAnalysis {
    let mut warnings = Vec::new();
    let j_solid = opts.alpha * jp;

    // === Open thin-wall accumulation over @wall polygons ===
    let mut has_walls = false;
    let mut open_sum = 0.0;
    let mut open_failed = false;
    for (polygon, &w) in polygons.iter().zip(effective) {
        let PolygonClass::OpenWall { thickness } = polygon.class() else {
            continue;
        };
        has_walls = true;
        let a = polygon.area();
        let t = match thickness {
            Some(t) => t,
            None if opts.strict_thickness => {
                warnings.push(
                    Warning::new(
                        WarningKind::TorsionModelSkipped,
                        FieldError::MissingThickness {
                            polygon: polygon.name().to_string(),
                        }
                        .to_string(),
                    )
                    .for_polygon(polygon.name())
                    .at_station(z),
                );
                open_failed = true;
                continue;
            }
            None => 2.0 * a / polygon.perimeter(),
        };
        open_sum += w.abs() * a * t * t / 3.0;
    }
    let j_open = (has_walls && !open_failed).then_some(open_sum);

    // === Closed-cell accumulation over @cell polygons ===
    let mut has_cells = false;
    let mut bredt_sum = 0.0;
    let mut roark_sum = 0.0;
    let mut fidelity: Option<f64> = None;
    let mut cells_failed = false;
    for (polygon, &w) in polygons.iter().zip(effective) {
        let PolygonClass::ClosedCell { .. } = polygon.class() else {
            continue;
        };
        has_cells = true;
        match decode_cell(polygon, tol, opts.strict_thickness) {
            Ok(cell) => {
                let j_cell = 4.0 * cell.a_mid * cell.a_mid * cell.thickness / cell.b_mid;
                let r_eq = cell.b_mid / (2.0 * std::f64::consts::PI);
                let correction = 1.0 + cell.thickness * cell.thickness / (4.0 * r_eq * r_eq);
                bredt_sum += w.abs() * j_cell;
                roark_sum += w.abs() * j_cell * correction;
                fidelity = Some(fidelity.map_or(cell.fidelity, |f: f64| f.min(cell.fidelity)));
            }
            Err(err) => {
                warnings.push(
                    Warning::new(WarningKind::TorsionModelSkipped, err.to_string())
                        .for_polygon(polygon.name())
                        .at_station(z),
                );
                cells_failed = true;
            }
        }
    }
    let cells_ok = has_cells && !cells_failed;
    let j_bredt = cells_ok.then_some(bredt_sum);
    let j_roark = cells_ok.then_some(roark_sum);
    if !cells_ok {
        fidelity = None;
    }

    // === Selection: 3-state, acyclic ===
    let (model, j) = if cells_ok && fidelity.is_some_and(|f| f >= FIDELITY_GATE) {
        (TorsionModel::RoarkClosedCell, roark_sum)
    } else if !has_cells {
        match j_open {
            Some(jo) => (TorsionModel::OpenThinWall, jo),
            None => (TorsionModel::SolidApprox, j_solid),
        }
    } else {
        let k = area.powi(4) / (40.0 * jp);
        log::warn!("torsion fell back to empirical estimate at z = {z} (K = {k})");
        warnings.push(
            Warning::new(
                WarningKind::TorsionFallback,
                "closed cell unusable (low fidelity or malformed); using empirical K = A^4/(40*Jp)",
            )
            .at_station(z),
        );
        (TorsionModel::Empirical, k)
    };

    TorsionAnalysis {
        j_solid,
        j_open,
        j_bredt,
        j_roark,
        fidelity,
        model,
        j,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::compute_properties;

    fn tol() -> ToleranceContext {
        ToleranceContext {
            scale: 10.0,
            eps_lin: 1e-8,
            eps_area: 1e-7,
            eps_num: 1e-12,
        }
    }

    fn rect(name: &str, x0: f64, y0: f64, w: f64, h: f64) -> Polygon {
        Polygon::new(
            name,
            vec![
                Point::new(x0, y0),
                Point::new(x0 + w, y0),
                Point::new(x0 + w, y0 + h),
                Point::new(x0, y0 + h),
            ],
            1.0,
        )
        .unwrap()
    }

    /// Dual-loop circular tube: outer CCW then inner CW, both explicitly
    /// closed, phase-aligned at angle 0.
    fn tube(name: &str, r_out: f64, r_in: f64, n: usize) -> Polygon {
        let mut verts = Vec::with_capacity(2 * n + 2);
        for k in 0..n {
            let a = 2.0 * std::f64::consts::PI * k as f64 / n as f64;
            verts.push(Point::new(r_out * a.cos(), r_out * a.sin()));
        }
        verts.push(verts[0]);
        for k in 0..n {
            let a = -2.0 * std::f64::consts::PI * k as f64 / n as f64;
            verts.push(Point::new(r_in * a.cos(), r_in * a.sin()));
        }
        verts.push(verts[n + 1]);
        Polygon::new(name, verts, 1.0).unwrap()
    }

    fn run(polygons: Vec<Polygon>, opts: &TorsionOptions) -> TorsionAnalysis {
        let effective: Vec<f64> = polygons.iter().map(|p| p.weight()).collect();
        let props = compute_properties(0.0, &polygons, &effective, &tol()).unwrap();
        analyze(0.0, &polygons, &effective, props.area, props.jp, &tol(), opts)
    }

    #[test]
    fn test_solid_rectangle_uses_alpha_jp() {
        let opts = TorsionOptions {
            alpha: 0.8436,
            ..Default::default()
        };
        let result = run(vec![rect("plate", 0.0, 0.0, 1.0, 1.0)], &opts);
        assert_eq!(result.model, TorsionModel::SolidApprox);
        // Unit square: Jp = 2/12, J = α·Jp
        assert!((result.j - 0.8436 / 6.0).abs() < 1e-9);
        assert!(result.j_open.is_none());
        assert!(result.j_bredt.is_none());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_open_i_section_never_attempts_cells() {
        // I-shape: two flanges and a web, all @wall with explicit t
        let polygons = vec![
            rect("top@wall@t=0.1", 0.0, 1.9, 2.0, 0.1),
            rect("web@wall@t=0.08", 0.96, 0.1, 0.08, 1.8),
            rect("bottom@wall@t=0.1", 0.0, 0.0, 2.0, 0.1),
        ];
        let expected: f64 = [
            (2.0 * 0.1, 0.1),
            (0.08 * 1.8, 0.08),
            (2.0 * 0.1, 0.1),
        ]
        .iter()
        .map(|(a, t)| a * t * t / 3.0)
        .sum();

        let result = run(polygons, &TorsionOptions::default());
        assert_eq!(result.model, TorsionModel::OpenThinWall);
        assert!((result.j - expected).abs() < 1e-12);
        assert!(result.j_bredt.is_none());
        assert!(result.fidelity.is_none());
    }

    #[test]
    fn test_estimated_thickness_2a_over_p() {
        // Single strip 10 x 0.2: t_est = 2A/P = 2·2/20.4
        let result = run(
            vec![rect("strip@wall", 0.0, 0.0, 10.0, 0.2)],
            &TorsionOptions::default(),
        );
        let t = 2.0 * 2.0 / 20.4;
        assert_eq!(result.model, TorsionModel::OpenThinWall);
        assert!((result.j - 2.0 * t * t / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_circular_tube_selects_roark() {
        // Midline r = 1, t = 0.1: exact J = 2πr³t·(1 + t²/(4r²))
        let result = run(vec![tube("tube@cell", 1.05, 0.95, 64)], &TorsionOptions::default());
        assert_eq!(result.model, TorsionModel::RoarkClosedCell);
        let fidelity = result.fidelity.unwrap();
        assert!(fidelity >= 0.6, "fidelity = {fidelity}");

        let exact = 2.0 * std::f64::consts::PI * 0.1 * (1.0 + 0.01 / 4.0);
        assert!(
            (result.j - exact).abs() / exact < 0.02,
            "J = {} vs exact {exact}",
            result.j
        );
        // Bredt value is below the Roark-corrected one
        assert!(result.j_bredt.unwrap() < result.j_roark.unwrap());
    }

    #[test]
    fn test_thick_tube_falls_back_to_empirical() {
        // t/r = 0.6 violates the thin-wall assumption outright
        let result = run(vec![tube("thick@cell", 1.3, 0.7, 64)], &TorsionOptions::default());
        assert!(result.fidelity.unwrap() < 0.6);
        assert_eq!(result.model, TorsionModel::Empirical);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::TorsionFallback));
    }

    #[test]
    fn test_malformed_cell_is_scoped_not_fatal() {
        // @cell tag on a plain single-loop polygon: decode fails, analysis
        // still returns with a skip warning
        let result = run(
            vec![rect("fake@cell", 0.0, 0.0, 2.0, 2.0)],
            &TorsionOptions::default(),
        );
        assert!(result.j_bredt.is_none());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::TorsionModelSkipped));
        assert_eq!(result.model, TorsionModel::Empirical);
    }

    #[test]
    fn test_strict_mode_requires_explicit_thickness() {
        let result = run(
            vec![rect("strip@wall", 0.0, 0.0, 10.0, 0.2)],
            &TorsionOptions {
                strict_thickness: true,
                ..Default::default()
            },
        );
        // Open estimator aborted; policy falls through to solid
        assert!(result.j_open.is_none());
        assert_eq!(result.model, TorsionModel::SolidApprox);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::TorsionModelSkipped));
    }

    #[test]
    fn test_phase_misaligned_cell_rejected() {
        // Outer closed, inner not explicitly closed: encoding error
        let n = 8;
        let mut verts = Vec::new();
        for k in 0..n {
            let a = 2.0 * std::f64::consts::PI * k as f64 / n as f64;
            verts.push(Point::new(2.0 * a.cos(), 2.0 * a.sin()));
        }
        verts.push(verts[0]);
        for k in 0..n {
            let a = -2.0 * std::f64::consts::PI * k as f64 / n as f64;
            verts.push(Point::new(a.cos(), a.sin()));
        }
        // Close the inner loop on the wrong vertex
        verts.push(Point::new(0.5, 0.5));
        let polygon = Polygon::new("bad@cell", verts, 1.0).unwrap();
        let err = decode_cell(&polygon, &tol(), false).unwrap_err();
        assert!(matches!(err, FieldError::CellEncoding { .. }));
    }
}
