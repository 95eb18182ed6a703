//! # Geometry Primitives
//!
//! Points, weighted polygons, and sections - the inputs every other module
//! consumes. Polygons are validated at construction: at least three distinct
//! vertices and a strictly positive signed (shoelace) area, i.e. CCW winding.
//!
//! ## Notation
//!
//! - `A` = signed polygon area from the shoelace formula
//! - `Qx`, `Qy` = first moments of area about the coordinate axes
//! - `Ixx`, `Iyy`, `Ixy` = second moments / product of inertia about the origin
//!
//! All integral quantities use the closed-form Green's-theorem sums over the
//! vertex loop; zero-length edges (explicit loop closes in `@cell` encodings)
//! contribute nothing and are therefore safe to keep in the vertex list.
//!
//! ## Name tags
//!
//! A polygon name may carry torsion-model tags as `@` suffixes, parsed once
//! at construction into [`PolygonClass`]:
//!
//! - `web@wall` - open thin-wall strip
//! - `tube@cell` (or `@closed`) - closed thin-wall cell, dual-loop encoded
//! - `web@wall@t=0.012` - explicit thickness in model units
//!
//! The full name (tags included) remains the pairing key between anchors.

use serde::{Deserialize, Serialize};

use crate::errors::{FieldError, FieldResult};

/// Immutable 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Midpoint of the segment to another point
    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    /// Degenerate box around a single point
    fn at(p: Point) -> Self {
        BoundingBox { min: p, max: p }
    }

    fn expand(&mut self, p: Point) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    /// Union with another box
    pub fn merge(&self, other: &BoundingBox) -> BoundingBox {
        let mut out = *self;
        out.expand(other.min);
        out.expand(other.max);
        out
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

/// Torsion-model classification parsed from name suffixes.
///
/// Classification happens once at polygon construction so the torsion
/// estimators never re-parse name strings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind")]
pub enum PolygonClass {
    /// No tag - participates in the solid torsion approximation only
    #[default]
    Solid,
    /// `@wall` - open thin-wall strip, optional explicit `@t=` thickness
    OpenWall { thickness: Option<f64> },
    /// `@cell` / `@closed` - closed thin-wall cell in dual-loop encoding,
    /// optional explicit `@t=` thickness
    ClosedCell { thickness: Option<f64> },
}

impl PolygonClass {
    /// Parse `@` suffix tags from a polygon name.
    ///
    /// The first segment is the base name and is ignored here; every
    /// following segment must be a recognized tag.
    fn parse(name: &str) -> FieldResult<Self> {
        let mut wall = false;
        let mut cell = false;
        let mut thickness: Option<f64> = None;

        for tag in name.split('@').skip(1) {
            match tag {
                "wall" => wall = true,
                "cell" | "closed" => cell = true,
                _ if tag.starts_with("t=") => {
                    let value: f64 = tag[2..].parse().map_err(|_| {
                        FieldError::invalid_polygon(
                            name,
                            format!("unparseable thickness tag '@{tag}'"),
                        )
                    })?;
                    if value <= 0.0 {
                        return Err(FieldError::invalid_polygon(
                            name,
                            format!("thickness tag '@{tag}' must be positive"),
                        ));
                    }
                    thickness = Some(value);
                }
                other => {
                    return Err(FieldError::invalid_polygon(
                        name,
                        format!("unrecognized tag '@{other}'"),
                    ));
                }
            }
        }

        match (wall, cell) {
            (true, true) => Err(FieldError::invalid_polygon(
                name,
                "polygon tagged both @wall and @cell",
            )),
            (true, false) => Ok(PolygonClass::OpenWall { thickness }),
            (false, true) => Ok(PolygonClass::ClosedCell { thickness }),
            (false, false) => {
                if thickness.is_some() {
                    Err(FieldError::invalid_polygon(
                        name,
                        "@t= tag requires @wall or @cell",
                    ))
                } else {
                    Ok(PolygonClass::Solid)
                }
            }
        }
    }

    /// Explicit `@t=` thickness, if tagged
    pub fn explicit_thickness(&self) -> Option<f64> {
        match self {
            PolygonClass::Solid => None,
            PolygonClass::OpenWall { thickness } | PolygonClass::ClosedCell { thickness } => {
                *thickness
            }
        }
    }
}

/// Where a point sits relative to a polygon, under a linear tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointLocation {
    /// Strictly interior (farther than the tolerance from every edge)
    Inside,
    /// Within the tolerance of some edge
    Boundary,
    /// Strictly exterior
    Outside,
}

/// Origin-referenced integral quantities of one polygon loop.
///
/// `area` is signed; the moments carry the same sign so weighted sums over
/// mixed-orientation loops (closed-cell encodings) stay consistent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LoopIntegrals {
    /// Signed area ∫dA
    pub area: f64,
    /// First moment about the x-axis ∫y dA
    pub qx: f64,
    /// First moment about the y-axis ∫x dA
    pub qy: f64,
    /// Second moment ∫y² dA
    pub ixx: f64,
    /// Second moment ∫x² dA
    pub iyy: f64,
    /// Product of inertia ∫xy dA
    pub ixy: f64,
}

/// Signed shoelace area of a raw vertex loop (implicitly closed).
pub(crate) fn loop_area(vertices: &[Point]) -> f64 {
    let n = vertices.len();
    let mut sum = 0.0;
    for i in 0..n {
        let p = vertices[i];
        let q = vertices[(i + 1) % n];
        sum += p.x * q.y - q.x * p.y;
    }
    sum / 2.0
}

/// Perimeter of a raw vertex loop (implicitly closed).
pub(crate) fn loop_perimeter(vertices: &[Point]) -> f64 {
    let n = vertices.len();
    (0..n)
        .map(|i| vertices[i].distance_to(&vertices[(i + 1) % n]))
        .sum()
}

/// Closed-form Green's-theorem integrals of a raw vertex loop.
pub(crate) fn loop_integrals(vertices: &[Point]) -> LoopIntegrals {
    let n = vertices.len();
    let mut out = LoopIntegrals::default();
    for i in 0..n {
        let p = vertices[i];
        let q = vertices[(i + 1) % n];
        let cross = p.x * q.y - q.x * p.y;
        out.area += cross;
        out.qy += (p.x + q.x) * cross;
        out.qx += (p.y + q.y) * cross;
        out.iyy += (p.x * p.x + p.x * q.x + q.x * q.x) * cross;
        out.ixx += (p.y * p.y + p.y * q.y + q.y * q.y) * cross;
        out.ixy += (p.x * q.y + 2.0 * p.x * p.y + 2.0 * q.x * q.y + q.x * p.y) * cross;
    }
    out.area /= 2.0;
    out.qx /= 6.0;
    out.qy /= 6.0;
    out.ixx /= 12.0;
    out.iyy /= 12.0;
    out.ixy /= 24.0;
    out
}

/// Distance from a point to a segment
pub(crate) fn segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let abx = b.x - a.x;
    let aby = b.y - a.y;
    let len2 = abx * abx + aby * aby;
    if len2 == 0.0 {
        return p.distance_to(&a);
    }
    let t = (((p.x - a.x) * abx + (p.y - a.y) * aby) / len2).clamp(0.0, 1.0);
    p.distance_to(&Point::new(a.x + t * abx, a.y + t * aby))
}

/// Ordered weighted polygon: a CCW vertex loop, a scalar weight, and a name.
///
/// ## Invariants (enforced by [`Polygon::new`])
///
/// - at least 3 vertices after stripping a repeated closing vertex
/// - strictly positive signed shoelace area (CCW winding)
/// - recognizable `@` tags in the name
///
/// The weight is an arbitrary sign-significant scalar: a modular material
/// ratio, density, or degradation factor. `weight = 0` inside a container
/// models a void (see the effective-weight rule on the field).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polygon {
    name: String,
    vertices: Vec<Point>,
    weight: f64,
    class: PolygonClass,
}

impl Polygon {
    /// Validate and construct a polygon.
    ///
    /// A trailing vertex equal to the first (a repeated closing vertex on
    /// the *whole* loop) is stripped; the interior explicit closes of a
    /// `@cell` dual-loop encoding are untouched because the last vertex of
    /// that encoding closes the inner loop, not the outer one.
    pub fn new(
        name: impl Into<String>,
        mut vertices: Vec<Point>,
        weight: f64,
    ) -> FieldResult<Self> {
        let name = name.into();
        let class = PolygonClass::parse(&name)?;

        if vertices.len() > 3 {
            let first = vertices[0];
            let last = vertices[vertices.len() - 1];
            if first == last {
                vertices.pop();
            }
        }
        if vertices.len() < 3 {
            return Err(FieldError::invalid_polygon(
                &name,
                format!("{} vertices, need at least 3", vertices.len()),
            ));
        }

        let area = loop_area(&vertices);
        if area <= 0.0 {
            return Err(FieldError::invalid_polygon(
                &name,
                format!("signed area {area} is not positive (vertices must wind CCW)"),
            ));
        }

        Ok(Polygon {
            name,
            vertices,
            weight,
            class,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Declared weight (not the effective weight - containment subtraction
    /// happens on the field)
    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn class(&self) -> PolygonClass {
        self.class
    }

    /// Signed shoelace area; strictly positive by construction
    pub fn area(&self) -> f64 {
        loop_area(&self.vertices)
    }

    pub fn perimeter(&self) -> f64 {
        loop_perimeter(&self.vertices)
    }

    /// Origin-referenced integral quantities
    pub fn integrals(&self) -> LoopIntegrals {
        loop_integrals(&self.vertices)
    }

    /// Area centroid
    pub fn centroid(&self) -> Point {
        let g = self.integrals();
        Point::new(g.qy / g.area, g.qx / g.area)
    }

    pub fn bbox(&self) -> BoundingBox {
        let mut bb = BoundingBox::at(self.vertices[0]);
        for v in &self.vertices[1..] {
            bb.expand(*v);
        }
        bb
    }

    /// Distance between two 1-based vertex indices (weight-law `d` primitive)
    pub fn vertex_distance(&self, i: usize, j: usize) -> FieldResult<f64> {
        let n = self.vertices.len();
        for (label, idx) in [("i", i), ("j", j)] {
            if idx < 1 || idx > n {
                return Err(FieldError::invalid_input(
                    format!("vertex index {label}"),
                    idx.to_string(),
                    format!("polygon '{}' has {n} vertices (indices are 1-based)", self.name),
                ));
            }
        }
        Ok(self.vertices[i - 1].distance_to(&self.vertices[j - 1]))
    }

    /// Classify a point against this polygon under a linear tolerance.
    ///
    /// Boundary wins: anything within `eps` of an edge reports `Boundary`
    /// regardless of which side the ray count would put it on. Crossing
    /// counts use the half-open edge interval so shared vertices are not
    /// double-counted.
    pub fn locate_point(&self, p: Point, eps: f64) -> PointLocation {
        let n = self.vertices.len();
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            if segment_distance(p, a, b) <= eps {
                return PointLocation::Boundary;
            }
        }

        let mut crossings = 0usize;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            if a.y == b.y {
                continue;
            }
            let (y_min, y_max) = if a.y < b.y { (a.y, b.y) } else { (b.y, a.y) };
            if y_min <= p.y && p.y < y_max {
                let t = (p.y - a.y) / (b.y - a.y);
                let x = a.x + t * (b.x - a.x);
                if x > p.x {
                    crossings += 1;
                }
            }
        }
        if crossings % 2 == 1 {
            PointLocation::Inside
        } else {
            PointLocation::Outside
        }
    }

    /// Same polygon with a different declared weight (weight-law override).
    /// Geometry is untouched, so no revalidation is needed.
    pub(crate) fn with_weight(mut self, weight: f64) -> Polygon {
        self.weight = weight;
        self
    }

    /// Rebuild this polygon with new vertices and weight, keeping name and
    /// class. Used by the interpolator; revalidates the area invariant.
    pub(crate) fn with_geometry(&self, vertices: Vec<Point>, weight: f64) -> FieldResult<Polygon> {
        let area = loop_area(&vertices);
        if area <= 0.0 {
            return Err(FieldError::invalid_polygon(
                &self.name,
                format!("interpolated signed area {area} is not positive"),
            ));
        }
        Ok(Polygon {
            name: self.name.clone(),
            vertices,
            weight,
            class: self.class,
        })
    }
}

/// Serializable polygon description consumed from geometry input files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolygonSpec {
    /// Full polygon name, `@` tags included
    pub name: String,
    /// Declared weight at this anchor
    pub weight: f64,
    /// Ordered vertex loop as `[x, y]` pairs
    pub vertices: Vec<[f64; 2]>,
}

/// Serializable section description: one anchor of a field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionSpec {
    /// Longitudinal coordinate of this anchor
    pub z: f64,
    /// Ordered polygon list
    pub polygons: Vec<PolygonSpec>,
}

/// Ordered collection of polygons sharing one longitudinal coordinate.
///
/// Invariant: polygon names are unique within a section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    z: f64,
    polygons: Vec<Polygon>,
}

impl Section {
    pub fn new(z: f64, polygons: Vec<Polygon>) -> FieldResult<Self> {
        if polygons.is_empty() {
            return Err(FieldError::invalid_input(
                "polygons",
                "0",
                "section needs at least one polygon",
            ));
        }
        for (i, p) in polygons.iter().enumerate() {
            if polygons[..i].iter().any(|q| q.name() == p.name()) {
                return Err(FieldError::DuplicatePolygon {
                    polygon: p.name().to_string(),
                    z,
                });
            }
        }
        Ok(Section { z, polygons })
    }

    /// Build a section from its serialized description
    pub fn from_spec(spec: &SectionSpec) -> FieldResult<Self> {
        let polygons = spec
            .polygons
            .iter()
            .map(|p| {
                let vertices = p.vertices.iter().map(|v| Point::new(v[0], v[1])).collect();
                Polygon::new(p.name.clone(), vertices, p.weight)
            })
            .collect::<FieldResult<Vec<_>>>()?;
        Section::new(spec.z, polygons)
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn polygon(&self, name: &str) -> Option<&Polygon> {
        self.polygons.iter().find(|p| p.name() == name)
    }

    pub fn bbox(&self) -> BoundingBox {
        let mut bb = self.polygons[0].bbox();
        for p in &self.polygons[1..] {
            bb = bb.merge(&p.bbox());
        }
        bb
    }
}

// =============================================================================
// UNIT TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9 || (a - b).abs() / b.abs().max(1.0) < 1e-9
    }

    fn unit_square(name: &str, weight: f64) -> Polygon {
        Polygon::new(
            name,
            vec![
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
                Point::new(1.0, 1.0),
                Point::new(0.0, 1.0),
            ],
            weight,
        )
        .unwrap()
    }

    #[test]
    fn test_square_area_and_centroid() {
        let sq = unit_square("solid", 1.0);
        assert!(approx_eq(sq.area(), 1.0));
        assert!(approx_eq(sq.perimeter(), 4.0));
        let c = sq.centroid();
        assert!(approx_eq(c.x, 0.5));
        assert!(approx_eq(c.y, 0.5));
    }

    #[test]
    fn test_square_second_moments() {
        // Unit square with corner at origin:
        // Ixx = ∫y² dA = 1/3, Iyy = 1/3, Ixy = 1/4
        let g = unit_square("solid", 1.0).integrals();
        assert!(approx_eq(g.ixx, 1.0 / 3.0));
        assert!(approx_eq(g.iyy, 1.0 / 3.0));
        assert!(approx_eq(g.ixy, 0.25));
        assert!(approx_eq(g.qx, 0.5));
        assert!(approx_eq(g.qy, 0.5));
    }

    #[test]
    fn test_triangle_integrals() {
        // Right triangle (0,0)-(1,0)-(0,1): A = 1/2, Ixy about origin = 1/24
        let tri = Polygon::new(
            "tri",
            vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(0.0, 1.0)],
            1.0,
        )
        .unwrap();
        let g = tri.integrals();
        assert!(approx_eq(g.area, 0.5));
        assert!(approx_eq(g.ixy, 1.0 / 24.0));
        assert!(approx_eq(g.ixx, 1.0 / 12.0));
    }

    #[test]
    fn test_cw_polygon_rejected() {
        let result = Polygon::new(
            "cw",
            vec![
                Point::new(0.0, 0.0),
                Point::new(0.0, 1.0),
                Point::new(1.0, 1.0),
                Point::new(1.0, 0.0),
            ],
            1.0,
        );
        assert!(matches!(result, Err(FieldError::InvalidPolygon { .. })));
    }

    #[test]
    fn test_closing_vertex_stripped() {
        let sq = Polygon::new(
            "closed",
            vec![
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
                Point::new(1.0, 1.0),
                Point::new(0.0, 1.0),
                Point::new(0.0, 0.0),
            ],
            1.0,
        )
        .unwrap();
        assert_eq!(sq.vertex_count(), 4);
    }

    #[test]
    fn test_too_few_vertices() {
        let result = Polygon::new("seg", vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)], 1.0);
        assert!(result.is_err());
    }

    #[test]
    fn test_tag_parsing() {
        assert_eq!(unit_square("plate", 1.0).class(), PolygonClass::Solid);
        assert_eq!(
            unit_square("web@wall", 1.0).class(),
            PolygonClass::OpenWall { thickness: None }
        );
        assert_eq!(
            unit_square("web@wall@t=0.02", 1.0).class(),
            PolygonClass::OpenWall {
                thickness: Some(0.02)
            }
        );
        assert_eq!(
            unit_square("box@closed", 1.0).class(),
            PolygonClass::ClosedCell { thickness: None }
        );
    }

    #[test]
    fn test_bad_tags_rejected() {
        let verts = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
        ];
        assert!(Polygon::new("p@hole", verts.clone(), 1.0).is_err());
        assert!(Polygon::new("p@t=abc", verts.clone(), 1.0).is_err());
        assert!(Polygon::new("p@t=0.5", verts.clone(), 1.0).is_err()); // @t= without @wall/@cell
        assert!(Polygon::new("p@wall@cell", verts, 1.0).is_err());
    }

    #[test]
    fn test_point_location() {
        let sq = unit_square("solid", 1.0);
        assert_eq!(
            sq.locate_point(Point::new(0.5, 0.5), 1e-9),
            PointLocation::Inside
        );
        assert_eq!(
            sq.locate_point(Point::new(1.5, 0.5), 1e-9),
            PointLocation::Outside
        );
        assert_eq!(
            sq.locate_point(Point::new(1.0, 0.5), 1e-9),
            PointLocation::Boundary
        );
        // Ray through a vertex must not double-count
        assert_eq!(
            sq.locate_point(Point::new(0.5, 0.0), 1e-12),
            PointLocation::Boundary
        );
    }

    #[test]
    fn test_vertex_distance_one_based() {
        let sq = unit_square("solid", 1.0);
        assert!(approx_eq(sq.vertex_distance(1, 2).unwrap(), 1.0));
        assert!(approx_eq(sq.vertex_distance(1, 3).unwrap(), 2f64.sqrt()));
        assert!(sq.vertex_distance(0, 2).is_err());
        assert!(sq.vertex_distance(1, 5).is_err());
    }

    #[test]
    fn test_section_duplicate_names() {
        let result = Section::new(0.0, vec![unit_square("a", 1.0), unit_square("a", 2.0)]);
        assert!(matches!(result, Err(FieldError::DuplicatePolygon { .. })));
    }

    #[test]
    fn test_section_from_spec() {
        let spec = SectionSpec {
            z: 0.0,
            polygons: vec![PolygonSpec {
                name: "deck".to_string(),
                weight: 1.0,
                vertices: vec![[0.0, 0.0], [2.0, 0.0], [2.0, 1.0], [0.0, 1.0]],
            }],
        };
        let section = Section::from_spec(&spec).unwrap();
        assert_eq!(section.len(), 1);
        assert!(approx_eq(section.polygon("deck").unwrap().area(), 2.0));
    }

    #[test]
    fn test_bbox_merge() {
        let s = Section::new(
            0.0,
            vec![
                unit_square("a", 1.0),
                Polygon::new(
                    "b",
                    vec![
                        Point::new(2.0, 2.0),
                        Point::new(3.0, 2.0),
                        Point::new(3.0, 4.0),
                        Point::new(2.0, 4.0),
                    ],
                    1.0,
                )
                .unwrap(),
            ],
        )
        .unwrap();
        let bb = s.bbox();
        assert!(approx_eq(bb.width(), 3.0));
        assert!(approx_eq(bb.height(), 4.0));
    }
}
