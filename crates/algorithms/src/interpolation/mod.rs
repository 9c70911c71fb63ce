//! Surface interpolation from scattered survey points
//!
//! - Delaunay: Bowyer-Watson triangulation with barycentric interpolation
//! - IDW: inverse distance weighting over the k nearest points
//! - SurfaceField: the two combined, exact at nodes and defined everywhere

mod delaunay;
mod idw;
pub mod kdtree;
mod surface;

pub use delaunay::Triangulation;
pub use idw::{Idw, IdwParams};
pub use kdtree::{KdTree, NearestResult};
pub use surface::{SurfaceField, SurfaceParams};

pub(crate) use surface::ensure_not_collinear;

/// A sample point with x, y coordinates and a value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

impl SamplePoint {
    pub fn new(x: f64, y: f64, value: f64) -> Self {
        Self { x, y, value }
    }

    /// Squared Euclidean distance to another point
    #[inline]
    pub fn dist_sq(&self, other_x: f64, other_y: f64) -> f64 {
        let dx = self.x - other_x;
        let dy = self.y - other_y;
        dx * dx + dy * dy
    }
}

impl From<gpsraster_core::ProjectedPoint> for SamplePoint {
    fn from(p: gpsraster_core::ProjectedPoint) -> Self {
        Self::new(p.x, p.y, p.z)
    }
}

/// A continuous scalar field over the plane.
///
/// Implementations must be safe to sample from several threads at once.
pub trait Surface: Sync {
    /// Field value at planar position (x, y)
    fn sample(&self, x: f64, y: f64) -> f64;
}

impl<F> Surface for F
where
    F: Fn(f64, f64) -> f64 + Sync,
{
    fn sample(&self, x: f64, y: f64) -> f64 {
        self(x, y)
    }
}
