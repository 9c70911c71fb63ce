//! Geographic <-> local planar projection
//!
//! A survey covers a few kilometres, so a single transverse Mercator centred
//! on the survey itself keeps distortion negligible and avoids the seams of a
//! fixed zone system such as UTM.

mod tmerc;

pub use tmerc::LocalTransverseMercator;

use gpsraster_core::{GeoPoint, ProjectedPoint, CRS};

/// A pair of mutually inverse maps between WGS84 and a planar system in metres
pub trait Projector: Sync {
    /// Project a point; elevation passes through unchanged
    fn project(&self, point: &GeoPoint) -> ProjectedPoint;

    /// Map planar coordinates back to (latitude, longitude) in degrees
    fn unproject(&self, x: f64, y: f64) -> (f64, f64);

    /// Description of the planar system
    fn crs(&self) -> CRS;

    /// Project every point, preserving order
    fn project_all(&self, points: &[GeoPoint]) -> Vec<ProjectedPoint> {
        points.iter().map(|p| self.project(p)).collect()
    }
}
