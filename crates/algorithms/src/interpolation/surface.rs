//! Hybrid elevation surface: Delaunay inside the hull, IDW outside.
//!
//! Sampling order for a query (x, y):
//!
//! 1. a node within the snap distance returns its own elevation exactly
//! 2. inside a triangle, barycentric interpolation of the three vertices
//! 3. otherwise IDW over the k nearest nodes
//!
//! so the field reproduces every node and is defined over the whole plane.

use geo::{Area, ConvexHull};
use geo_types::{MultiPoint, Point};
use gpsraster_core::{Error, ProjectedPoint, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::delaunay::Triangulation;
use super::idw::{Idw, IdwParams};
use super::kdtree::KdTree;
use super::{SamplePoint, Surface};

/// Hull area below this fraction of the squared extent diagonal counts as
/// zero (collinear input)
const DEGENERATE_AREA_RATIO: f64 = 1e-10;

/// Parameters for fitting a [`SurfaceField`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceParams {
    /// IDW fallback used outside the triangulation
    pub idw: IdwParams,
    /// Projected points closer than this (metres) are merged
    pub merge_distance: f64,
}

impl Default for SurfaceParams {
    fn default() -> Self {
        Self {
            idw: IdwParams::default(),
            merge_distance: 1e-6,
        }
    }
}

/// Continuous elevation field fitted to projected survey points
#[derive(Debug, Clone)]
pub struct SurfaceField {
    triangulation: Triangulation,
    idw: Idw,
    hull_area: f64,
    merged: usize,
}

impl SurfaceField {
    /// Fit the field to `points`.
    ///
    /// Points that coincide after projection are merged first. Fails with
    /// `InsufficientPoints` when fewer than three distinct nodes remain and
    /// with `DegeneratePointSet` when they are collinear.
    pub fn fit(points: &[ProjectedPoint], params: &SurfaceParams) -> Result<Self> {
        let nodes = merge_coincident(points, params.merge_distance);
        let merged = points.len() - nodes.len();
        if merged > 0 {
            warn!(merged, "merged points that coincide after projection");
        }

        if nodes.len() < 3 {
            return Err(Error::InsufficientPoints {
                found: nodes.len(),
                required: 3,
            });
        }

        let coords: Vec<(f64, f64)> = nodes.iter().map(|p| (p.x, p.y)).collect();
        let hull_area = ensure_not_collinear(&coords)?;

        let triangulation = Triangulation::build(&nodes)?;
        if triangulation.is_empty() {
            return Err(Error::DegeneratePointSet(
                "triangulation produced no triangles".into(),
            ));
        }

        debug!(
            nodes = nodes.len(),
            triangles = triangulation.triangle_count(),
            hull_area,
            triangulated_area = triangulation.area(),
            "fitted surface"
        );

        Ok(Self {
            idw: Idw::new(&nodes, params.idw),
            triangulation,
            hull_area,
            merged,
        })
    }

    /// Elevation at (x, y)
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        if let Some(z) = self.idw.snapped(x, y) {
            return z;
        }
        if let Some(z) = self.triangulation.interpolate(x, y) {
            return z;
        }
        // fit() guarantees at least three nodes
        self.idw.interpolate(x, y).unwrap_or(f64::NAN)
    }

    /// Nodes the field interpolates, after merging
    pub fn nodes(&self) -> &[SamplePoint] {
        self.triangulation.vertices()
    }

    pub fn node_count(&self) -> usize {
        self.nodes().len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangulation.triangle_count()
    }

    /// Area of the nodes' convex hull (m²)
    pub fn hull_area(&self) -> f64 {
        self.hull_area
    }

    /// How many input points were absorbed by coincident neighbours
    pub fn merged_count(&self) -> usize {
        self.merged
    }
}

impl Surface for SurfaceField {
    fn sample(&self, x: f64, y: f64) -> f64 {
        SurfaceField::sample(self, x, y)
    }
}

/// Merge points within `tolerance` of each other into their centroid,
/// averaging elevation. Output follows first-occurrence order.
fn merge_coincident(points: &[ProjectedPoint], tolerance: f64) -> Vec<SamplePoint> {
    let samples: Vec<SamplePoint> = points.iter().copied().map(SamplePoint::from).collect();
    let tree = KdTree::build(&samples);
    let mut taken = vec![false; samples.len()];
    let mut nodes = Vec::with_capacity(samples.len());

    for (i, p) in samples.iter().enumerate() {
        if taken[i] {
            continue;
        }

        let (mut sx, mut sy, mut sz, mut n) = (0.0, 0.0, 0.0, 0usize);
        for hit in tree.within_radius(p.x, p.y, tolerance) {
            if taken[hit.index] {
                continue;
            }
            taken[hit.index] = true;
            sx += hit.point.x;
            sy += hit.point.y;
            sz += hit.point.value;
            n += 1;
        }

        if n <= 1 {
            nodes.push(*p);
        } else {
            let k = n as f64;
            nodes.push(SamplePoint::new(sx / k, sy / k, sz / k));
        }
    }

    nodes
}

/// Convex hull area of `coords`, failing with `DegeneratePointSet` when it
/// is negligible against the squared bounding-box diagonal (collinear input)
pub(crate) fn ensure_not_collinear(coords: &[(f64, f64)]) -> Result<f64> {
    let cloud: MultiPoint<f64> = coords.iter().map(|&(x, y)| Point::new(x, y)).collect();
    let hull_area = cloud.convex_hull().unsigned_area();

    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for &(x, y) in coords {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    let diag_sq = (max_x - min_x).powi(2) + (max_y - min_y).powi(2);

    if !(hull_area > DEGENERATE_AREA_RATIO * diag_sq) {
        return Err(Error::DegeneratePointSet(format!(
            "{} points are collinear (hull area {hull_area:.3e})",
            coords.len()
        )));
    }
    Ok(hull_area)
}
