//! # Containment Resolver
//!
//! Builds the strict partial order "strictly interior to" over the polygons
//! of one section and derives each polygon's unique direct container.
//!
//! The relation `A ≺ B` holds when the interior of A lies inside the
//! interior of B. Touching boundaries are tolerated (a vertex of A on the
//! boundary of B does not break containment) but never *establish* it: a
//! polygon whose vertices all sit on another's boundary is not contained.
//!
//! Partial interior overlap - some of A strictly inside B, some strictly
//! outside, or any proper edge crossing - is a hard geometry error. There
//! is no boolean/clip fallback; overlapping input geometry must be fixed
//! at the source.
//!
//! The forest is stored as a parent-index array over the section's polygon
//! order (an arena of integer ids), recomputed per query since interpolated
//! geometry changes with z.

use crate::errors::{FieldError, FieldResult};
use crate::geometry::{Point, PointLocation, Polygon, Section};
use crate::tolerance::ToleranceContext;

/// How two polygon interiors relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relation {
    Disjoint,
    AInsideB,
    BInsideA,
    Overlapping,
}

/// Orientation of point `c` relative to segment `a -> b`, tolerant to `eps`
/// (an area-scaled epsilon): +1 left, -1 right, 0 collinear.
fn orientation(a: Point, b: Point, c: Point, eps: f64) -> i8 {
    let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
    if cross > eps {
        1
    } else if cross < -eps {
        -1
    } else {
        0
    }
}

/// True when segments `a1-a2` and `b1-b2` properly cross (strict crossing,
/// no shared endpoints, no collinear overlap).
pub(crate) fn segments_cross(a1: Point, a2: Point, b1: Point, b2: Point, eps: f64) -> bool {
    let o1 = orientation(a1, a2, b1, eps);
    let o2 = orientation(a1, a2, b2, eps);
    let o3 = orientation(b1, b2, a1, eps);
    let o4 = orientation(b1, b2, a2, eps);
    o1 != 0 && o2 != 0 && o3 != 0 && o4 != 0 && o1 != o2 && o3 != o4
}

/// True when any edge of `a` properly crosses any edge of `b`.
fn edges_cross(a: &Polygon, b: &Polygon, eps_area: f64) -> bool {
    let va = a.vertices();
    let vb = b.vertices();
    for i in 0..va.len() {
        let a1 = va[i];
        let a2 = va[(i + 1) % va.len()];
        for j in 0..vb.len() {
            if segments_cross(a1, a2, vb[j], vb[(j + 1) % vb.len()], eps_area) {
                return true;
            }
        }
    }
    false
}

/// Count strictly-inside / strictly-outside vertices of `a` against `b`,
/// ignoring boundary-touching ones.
fn vertex_split(a: &Polygon, b: &Polygon, eps_lin: f64) -> (usize, usize) {
    let mut inside = 0;
    let mut outside = 0;
    for v in a.vertices() {
        match b.locate_point(*v, eps_lin) {
            PointLocation::Inside => inside += 1,
            PointLocation::Outside => outside += 1,
            PointLocation::Boundary => {}
        }
    }
    (inside, outside)
}

fn relate(a: &Polygon, b: &Polygon, tol: &ToleranceContext) -> Relation {
    if edges_cross(a, b, tol.eps_area) {
        return Relation::Overlapping;
    }
    let (a_in, a_out) = vertex_split(a, b, tol.eps_lin);
    let (b_in, b_out) = vertex_split(b, a, tol.eps_lin);
    if a_in > 0 && a_out > 0 {
        return Relation::Overlapping;
    }
    if b_in > 0 && b_out > 0 {
        return Relation::Overlapping;
    }
    if a_in > 0 && b_in > 0 {
        // Mutual strict inclusion is geometrically impossible; if the
        // tolerant tests report it, the overlap is ambiguous.
        return Relation::Overlapping;
    }
    if a_in > 0 {
        Relation::AInsideB
    } else if b_in > 0 {
        Relation::BInsideA
    } else {
        Relation::Disjoint
    }
}

/// Per-section containment forest: each polygon's unique direct container,
/// held as a parent-index array over the section's polygon order.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainmentForest {
    parent: Vec<Option<usize>>,
}

impl ContainmentForest {
    /// O(n²) pairwise containment tests, then direct-container extraction.
    ///
    /// The direct container of A is the minimal-area polygon strictly
    /// containing A: strict nesting makes any intermediate container
    /// strictly larger, so minimal area identifies the immediate parent
    /// without a transitive reduction pass.
    pub fn build(section: &Section, tol: &ToleranceContext) -> FieldResult<Self> {
        let polys = section.polygons();
        let n = polys.len();
        // containers[i] = indices of polygons strictly containing polys[i]
        let mut containers: Vec<Vec<usize>> = vec![Vec::new(); n];

        for i in 0..n {
            for j in (i + 1)..n {
                match relate(&polys[i], &polys[j], tol) {
                    Relation::AInsideB => containers[i].push(j),
                    Relation::BInsideA => containers[j].push(i),
                    Relation::Disjoint => {}
                    Relation::Overlapping => {
                        return Err(FieldError::AmbiguousContainment {
                            polygon_a: polys[i].name().to_string(),
                            polygon_b: polys[j].name().to_string(),
                            z: section.z(),
                        });
                    }
                }
            }
        }

        let parent = containers
            .iter()
            .map(|cs| {
                cs.iter()
                    .copied()
                    .min_by(|&a, &b| {
                        polys[a]
                            .area()
                            .partial_cmp(&polys[b].area())
                            .expect("polygon areas are finite")
                    })
            })
            .collect();

        Ok(ContainmentForest { parent })
    }

    /// Index of the direct container of polygon `idx`, or None for roots
    pub fn direct_container(&self, idx: usize) -> Option<usize> {
        self.parent[idx]
    }

    /// Indices of polygons with no container
    pub fn roots(&self) -> Vec<usize> {
        self.parent
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_none())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(name: &str, origin: f64, size: f64) -> Polygon {
        Polygon::new(
            name,
            vec![
                Point::new(origin, origin),
                Point::new(origin + size, origin),
                Point::new(origin + size, origin + size),
                Point::new(origin, origin + size),
            ],
            1.0,
        )
        .unwrap()
    }

    fn tol_for(section: &Section) -> ToleranceContext {
        ToleranceContext::derive(section, section)
    }

    #[test]
    fn test_nested_squares_forest() {
        // 10x10 ⊃ 6x6 ⊃ 2x2, plus a disjoint square off to the side
        let section = Section::new(
            0.0,
            vec![
                square("outer", 0.0, 10.0),
                square("mid", 2.0, 6.0),
                square("inner", 4.0, 2.0),
                Polygon::new(
                    "island",
                    vec![
                        Point::new(20.0, 0.0),
                        Point::new(22.0, 0.0),
                        Point::new(22.0, 2.0),
                        Point::new(20.0, 2.0),
                    ],
                    1.0,
                )
                .unwrap(),
            ],
        )
        .unwrap();
        let forest = ContainmentForest::build(&section, &tol_for(&section)).unwrap();
        assert_eq!(forest.direct_container(0), None);
        assert_eq!(forest.direct_container(1), Some(0));
        // Direct container of the innermost square is "mid", not "outer"
        assert_eq!(forest.direct_container(2), Some(1));
        assert_eq!(forest.direct_container(3), None);
        assert_eq!(forest.roots(), vec![0, 3]);
    }

    #[test]
    fn test_partial_overlap_is_hard_error() {
        let section = Section::new(
            0.0,
            vec![square("a", 0.0, 4.0), square("b", 2.0, 4.0)],
        )
        .unwrap();
        let result = ContainmentForest::build(&section, &tol_for(&section));
        assert!(matches!(
            result,
            Err(FieldError::AmbiguousContainment { .. })
        ));
    }

    #[test]
    fn test_boundary_touch_does_not_contain() {
        // Two squares sharing an edge: touching, neither contains the other
        let section = Section::new(
            0.0,
            vec![square("left", 0.0, 2.0), {
                Polygon::new(
                    "right",
                    vec![
                        Point::new(2.0, 0.0),
                        Point::new(4.0, 0.0),
                        Point::new(4.0, 2.0),
                        Point::new(2.0, 2.0),
                    ],
                    1.0,
                )
                .unwrap()
            }],
        )
        .unwrap();
        let forest = ContainmentForest::build(&section, &tol_for(&section)).unwrap();
        assert_eq!(forest.direct_container(0), None);
        assert_eq!(forest.direct_container(1), None);
    }

    #[test]
    fn test_inner_touching_container_boundary_still_contained() {
        // Inner square shares its bottom edge with the container's bottom
        // edge; interior inclusion still holds.
        let section = Section::new(
            0.0,
            vec![square("outer", 0.0, 10.0), {
                Polygon::new(
                    "flush",
                    vec![
                        Point::new(3.0, 0.0),
                        Point::new(5.0, 0.0),
                        Point::new(5.0, 2.0),
                        Point::new(3.0, 2.0),
                    ],
                    1.0,
                )
                .unwrap()
            }],
        )
        .unwrap();
        let forest = ContainmentForest::build(&section, &tol_for(&section)).unwrap();
        assert_eq!(forest.direct_container(1), Some(0));
    }

    #[test]
    fn test_segments_cross() {
        let eps = 1e-12;
        assert!(segments_cross(
            Point::new(0.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
            Point::new(2.0, 0.0),
            eps
        ));
        // Shared endpoint is not a proper crossing
        assert!(!segments_cross(
            Point::new(0.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(2.0, 2.0),
            Point::new(4.0, 0.0),
            eps
        ));
        // Collinear overlap is not a proper crossing
        assert!(!segments_cross(
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(3.0, 0.0),
            eps
        ));
    }
}
