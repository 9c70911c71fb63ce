//! Inverse Distance Weighting (IDW) interpolation
//!
//! Estimates values at unknown locations as a weighted average of the k
//! nearest sample points, where weights are inversely proportional to
//! distance raised to a power parameter.
//!
//! Reference:
//! Shepard, D. (1968). A two-dimensional interpolation function for
//! irregularly-spaced data. ACM National Conference.

use serde::{Deserialize, Serialize};

use super::kdtree::KdTree;
use super::SamplePoint;

/// Parameters for IDW interpolation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IdwParams {
    /// Power parameter (default: 2.0).
    /// Higher values give more weight to nearby points.
    pub power: f64,
    /// Number of nearest points blended per query (default: 6)
    pub neighbors: usize,
    /// A sample closer than this to the query supplies its value directly
    /// (avoids the singularity at d = 0).
    pub snap_distance: f64,
}

impl Default for IdwParams {
    fn default() -> Self {
        Self {
            power: 2.0,
            neighbors: 6,
            snap_distance: 1e-9,
        }
    }
}

/// IDW interpolator over an indexed point set
#[derive(Debug, Clone)]
pub struct Idw {
    tree: KdTree,
    params: IdwParams,
}

impl Idw {
    pub fn new(points: &[SamplePoint], params: IdwParams) -> Self {
        Self {
            tree: KdTree::build(points),
            params,
        }
    }

    pub fn params(&self) -> &IdwParams {
        &self.params
    }

    /// Value of a sample lying within the snap distance of (x, y)
    pub fn snapped(&self, x: f64, y: f64) -> Option<f64> {
        let snap = self.params.snap_distance;
        self.tree
            .nearest(x, y)
            .filter(|n| n.distance_sq <= snap * snap)
            .map(|n| n.point.value)
    }

    /// Interpolated value at (x, y); `None` only for an empty point set.
    ///
    /// ```text
    /// z(x,y) = Σ(wi * zi) / Σ(wi)
    /// where wi = 1 / d(x,y, xi,yi)^p
    /// ```
    pub fn interpolate(&self, x: f64, y: f64) -> Option<f64> {
        let neighbors = self.tree.k_nearest(x, y, self.params.neighbors.max(1));
        let nearest = neighbors.first()?;

        let snap = self.params.snap_distance;
        if nearest.distance_sq <= snap * snap {
            return Some(nearest.point.value);
        }

        let half_power = 0.5 * self.params.power;
        let mut sum_w = 0.0;
        let mut sum_wz = 0.0;
        for n in &neighbors {
            let w = n.distance_sq.powf(-half_power);
            sum_w += w;
            sum_wz += w * n.point.value;
        }

        if sum_w > 0.0 && sum_w.is_finite() {
            Some(sum_wz / sum_w)
        } else {
            // Weights under/overflowed at extreme distances
            Some(nearest.point.value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_points() -> Vec<SamplePoint> {
        vec![
            SamplePoint::new(0.5, 9.5, 10.0), // top-left
            SamplePoint::new(9.5, 9.5, 20.0), // top-right
            SamplePoint::new(0.5, 0.5, 30.0), // bottom-left
            SamplePoint::new(9.5, 0.5, 40.0), // bottom-right
        ]
    }

    #[test]
    fn test_idw_exact_at_samples() {
        let idw = Idw::new(&sample_points(), IdwParams::default());
        for p in sample_points() {
            assert_eq!(idw.interpolate(p.x, p.y), Some(p.value));
            assert_eq!(idw.snapped(p.x, p.y), Some(p.value));
        }
        assert_eq!(idw.snapped(5.0, 5.0), None);
    }

    #[test]
    fn test_idw_center_is_mean() {
        // Equidistant from all four samples
        let idw = Idw::new(&sample_points(), IdwParams::default());
        let v = idw.interpolate(5.0, 5.0).unwrap();
        assert!((v - 25.0).abs() < 1e-10, "got {v}");
    }

    #[test]
    fn test_idw_stays_within_sample_range() {
        let idw = Idw::new(&sample_points(), IdwParams::default());
        for row in -5..15 {
            for col in -5..15 {
                let v = idw.interpolate(col as f64, row as f64).unwrap();
                assert!((10.0..=40.0).contains(&v), "{v} at ({col}, {row})");
            }
        }
    }

    #[test]
    fn test_idw_power_sharpens() {
        let pts = sample_points();
        let soft = Idw::new(&pts, IdwParams { power: 1.0, ..Default::default() });
        let sharp = Idw::new(&pts, IdwParams { power: 4.0, ..Default::default() });

        // Near the top-left sample: higher power pulls harder toward 10
        let a = soft.interpolate(1.5, 8.5).unwrap();
        let b = sharp.interpolate(1.5, 8.5).unwrap();
        assert!((b - 10.0).abs() < (a - 10.0).abs());
    }

    #[test]
    fn test_idw_neighbor_limit() {
        let pts = sample_points();
        let one = Idw::new(&pts, IdwParams { neighbors: 1, ..Default::default() });
        assert_eq!(one.interpolate(8.0, 1.0), Some(40.0));
    }

    #[test]
    fn test_idw_empty() {
        let idw = Idw::new(&[], IdwParams::default());
        assert_eq!(idw.interpolate(0.0, 0.0), None);
    }
}
