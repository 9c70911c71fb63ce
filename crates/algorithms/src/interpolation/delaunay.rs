//! Delaunay triangulation with linear (barycentric) interpolation
//!
//! Triangulation and point location are done by `spade`, whose exact
//! orientation predicates keep thin and nearly collinear surveys fully
//! triangulated across their convex hull.

use gpsraster_core::{Error, Result};
use spade::{
    DelaunayTriangulation, HasPosition, Point2, PositionInTriangulation, Triangulation as _,
};

use super::SamplePoint;

/// Vertex payload: planar position plus the index of the input point
#[derive(Debug, Clone, Copy)]
struct Node {
    position: Point2<f64>,
    index: usize,
}

impl HasPosition for Node {
    type Scalar = f64;

    fn position(&self) -> Point2<f64> {
        self.position
    }
}

/// Signed doubled area of triangle (p0, p1, p2)
#[inline]
fn twice_area(p0: &SamplePoint, p1: &SamplePoint, p2: &SamplePoint) -> f64 {
    (p1.x - p0.x) * (p2.y - p0.y) - (p2.x - p0.x) * (p1.y - p0.y)
}

/// Barycentric coordinates of (px, py) within triangle (p0, p1, p2).
///
/// Returns (u, v, w) where the interpolated value is u*v0 + v*v1 + w*v2,
/// or `None` when the triangle has no area.
fn barycentric(
    px: f64,
    py: f64,
    p0: &SamplePoint,
    p1: &SamplePoint,
    p2: &SamplePoint,
) -> Option<(f64, f64, f64)> {
    let v0x = p1.x - p0.x;
    let v0y = p1.y - p0.y;
    let v1x = p2.x - p0.x;
    let v1y = p2.y - p0.y;
    let v2x = px - p0.x;
    let v2y = py - p0.y;

    let dot00 = v0x * v0x + v0y * v0y;
    let dot01 = v0x * v1x + v0y * v1y;
    let dot02 = v0x * v2x + v0y * v2y;
    let dot11 = v1x * v1x + v1y * v1y;
    let dot12 = v1x * v2x + v1y * v2y;

    let denom = dot00 * dot11 - dot01 * dot01;
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }

    let inv_denom = 1.0 / denom;
    let v = (dot11 * dot02 - dot01 * dot12) * inv_denom;
    let w = (dot00 * dot12 - dot01 * dot02) * inv_denom;
    let u = 1.0 - v - w;

    Some((u, v, w))
}

/// Linear interpolation along segment (a, b) at the projection of (px, py)
fn along_edge(px: f64, py: f64, a: &SamplePoint, b: &SamplePoint) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return a.value;
    }
    let t = (((px - a.x) * dx + (py - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    a.value + t * (b.value - a.value)
}

/// Delaunay triangulation of a planar point set
#[derive(Debug, Clone)]
pub struct Triangulation {
    vertices: Vec<SamplePoint>,
    tin: DelaunayTriangulation<Node>,
}

impl Triangulation {
    /// Triangulate `points`.
    ///
    /// Points must have distinct positions. Fewer than three points, or a
    /// fully collinear set, yield a triangulation without triangles.
    pub fn build(points: &[SamplePoint]) -> Result<Self> {
        let nodes = points
            .iter()
            .enumerate()
            .map(|(index, p)| Node {
                position: Point2::new(p.x, p.y),
                index,
            })
            .collect();
        let tin = DelaunayTriangulation::<Node>::bulk_load_stable(nodes)
            .map_err(|e| Error::Other(format!("triangulation failed: {e:?}")))?;

        Ok(Self {
            vertices: points.to_vec(),
            tin,
        })
    }

    pub fn vertices(&self) -> &[SamplePoint] {
        &self.vertices
    }

    pub fn triangle_count(&self) -> usize {
        self.tin.num_inner_faces()
    }

    pub fn is_empty(&self) -> bool {
        self.tin.num_inner_faces() == 0
    }

    /// Vertex indices of every triangle
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.tin
            .inner_faces()
            .map(|face| face.vertices().map(|v| v.data().index))
    }

    /// Total area covered by the triangles
    pub fn area(&self) -> f64 {
        self.triangles()
            .map(|[a, b, c]| {
                0.5 * twice_area(&self.vertices[a], &self.vertices[b], &self.vertices[c]).abs()
            })
            .sum()
    }

    /// Linear interpolation inside the triangulation; `None` outside it
    pub fn interpolate(&self, x: f64, y: f64) -> Option<f64> {
        if self.is_empty() {
            return None;
        }

        match self.tin.locate(Point2::new(x, y)) {
            PositionInTriangulation::OnVertex(v) => {
                Some(self.vertices[self.tin.vertex(v).data().index].value)
            }
            PositionInTriangulation::OnEdge(e) => {
                // Lower index first so the result does not depend on direction
                let [a, b] = self.tin.directed_edge(e).vertices().map(|v| v.data().index);
                let (a, b) = (a.min(b), a.max(b));
                Some(along_edge(x, y, &self.vertices[a], &self.vertices[b]))
            }
            PositionInTriangulation::OnFace(f) => {
                let [p0, p1, p2] = self
                    .tin
                    .face(f)
                    .vertices()
                    .map(|v| &self.vertices[v.data().index]);
                let (u, v, w) = barycentric(x, y, p0, p1, p2)?;
                Some(u * p0.value + v * p1.value + w * p2.value)
            }
            PositionInTriangulation::OutsideOfConvexHull(_)
            | PositionInTriangulation::NoTriangulation => None,
        }
    }

    /// Number of distinct triangle edges
    pub fn edge_count(&self) -> usize {
        self.tin.num_undirected_edges()
    }
}
