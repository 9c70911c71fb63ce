//! Planar extent of a survey and the raster grid laid over it

use crate::error::{Error, Result};
use crate::geo::ProjectedPoint;
use crate::raster::GeoTransform;
use serde::{Deserialize, Serialize};

/// Relative slack added to the cell size so the grid strictly encloses the
/// extent despite rounding.
const CELL_SLACK: f64 = 1e-9;

/// Axis-aligned bounding box in planar metres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Tight bounding box of a point set, `None` when empty
    pub fn from_points(points: &[ProjectedPoint]) -> Option<Self> {
        let first = points.first()?;
        let init = Self::new(first.x, first.y, first.x, first.y);
        Some(points.iter().fold(init, |e, p| {
            Self::new(e.min_x.min(p.x), e.min_y.min(p.y), e.max_x.max(p.x), e.max_y.max(p.y))
        }))
    }

    /// Grow each side by `fraction` of the extent's size along that axis
    pub fn expanded(&self, fraction: f64) -> Self {
        let dx = self.width() * fraction;
        let dy = self.height() * fraction;
        Self::new(self.min_x - dx, self.min_y - dy, self.max_x + dx, self.max_y + dy)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f64, f64) {
        (
            0.5 * (self.min_x + self.max_x),
            0.5 * (self.min_y + self.max_y),
        )
    }

    /// Inclusive point-in-box test
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Whether `other` lies entirely inside this extent
    pub fn contains_extent(&self, other: &Extent) -> bool {
        self.contains(other.min_x, other.min_y) && self.contains(other.max_x, other.max_y)
    }
}

/// Geometry of the output raster: a north-up grid of square cells.
///
/// Row 0 is the northern edge; pixel `(0, 0)` is the top-left corner of the
/// top-left cell and `(width, height)` the bottom-right corner of the last.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    transform: GeoTransform,
    width: usize,
    height: usize,
}

impl Grid {
    /// Lay a grid over `extent` whose longer side spans `max_dimension`
    /// cells. The shorter side gets as many cells as needed to cover it, and
    /// the grid is centred on the extent.
    pub fn covering(extent: &Extent, max_dimension: usize) -> Result<Self> {
        if max_dimension == 0 {
            return Err(Error::InvalidParameter {
                name: "max_dimension",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        let longer = extent.width().max(extent.height());
        if !longer.is_finite() || longer <= 0.0 {
            return Err(Error::DegeneratePointSet(format!(
                "extent {:.3} x {:.3} m has no area to rasterize",
                extent.width(),
                extent.height()
            )));
        }

        let cell = longer / max_dimension as f64 * (1.0 + CELL_SLACK);
        let cells = |span: f64| ((span / cell) + CELL_SLACK).ceil().max(1.0) as usize;
        let width = cells(extent.width()).min(max_dimension);
        let height = cells(extent.height()).min(max_dimension);

        if width.checked_mul(height).is_none() || width.max(height) > u32::MAX as usize {
            return Err(Error::InvalidDimensions { width, height });
        }

        let (cx, cy) = extent.center();
        let origin_x = cx - 0.5 * width as f64 * cell;
        let origin_y = cy + 0.5 * height as f64 * cell;

        Ok(Self {
            transform: GeoTransform::new(origin_x, origin_y, cell, -cell),
            width,
            height,
        })
    }

    /// Build a grid from an explicit transform and size
    pub fn from_transform(transform: GeoTransform, width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        Ok(Self {
            transform,
            width,
            height,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Planar X of the grid's western edge
    pub fn origin_x(&self) -> f64 {
        self.transform.origin_x
    }

    /// Planar Y of the grid's northern edge
    pub fn origin_y(&self) -> f64 {
        self.transform.origin_y
    }

    pub fn cell_size_x(&self) -> f64 {
        self.transform.pixel_width
    }

    /// Negative: rows advance southwards
    pub fn cell_size_y(&self) -> f64 {
        self.transform.pixel_height
    }

    /// Planar coordinates of a cell centre
    pub fn cell_center(&self, col: usize, row: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    /// Planar coordinates of a fractional pixel position
    pub fn pixel_to_plane(&self, px: f64, py: f64) -> (f64, f64) {
        self.transform.apply(px, py)
    }

    /// Planar area covered by the grid
    pub fn extent(&self) -> Extent {
        let (min_x, min_y, max_x, max_y) = self.transform.bounds(self.width, self.height);
        Extent::new(min_x, min_y, max_x, max_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pts(coords: &[(f64, f64)]) -> Vec<ProjectedPoint> {
        coords.iter().map(|&(x, y)| ProjectedPoint::new(x, y, 0.0)).collect()
    }

    #[test]
    fn test_extent_from_points() {
        let e = Extent::from_points(&pts(&[(1.0, 5.0), (-2.0, 3.0), (4.0, -1.0)])).unwrap();
        assert_eq!(e, Extent::new(-2.0, -1.0, 4.0, 5.0));
        assert!(Extent::from_points(&[]).is_none());
    }

    #[test]
    fn test_expanded_margin() {
        let e = Extent::new(0.0, 0.0, 100.0, 50.0).expanded(0.05);
        assert_relative_eq!(e.min_x, -5.0);
        assert_relative_eq!(e.max_x, 105.0);
        assert_relative_eq!(e.min_y, -2.5);
        assert_relative_eq!(e.max_y, 52.5);
    }

    #[test]
    fn test_grid_preserves_aspect_ratio() {
        let extent = Extent::new(0.0, 0.0, 200.0, 100.0);
        let grid = Grid::covering(&extent, 1024).unwrap();
        assert_eq!(grid.width(), 1024);
        assert_eq!(grid.height(), 512);
        assert_relative_eq!(grid.cell_size_x(), -grid.cell_size_y());
        assert!(grid.extent().contains_extent(&extent));
    }

    #[test]
    fn test_grid_covers_awkward_extents() {
        for &(w, h, dim) in &[
            (123.456, 7.89, 1024),
            (0.37, 0.91, 17),
            (1e-3, 5.0, 1),
            (3000.0, 2999.9999, 1024),
        ] {
            let extent = Extent::new(-w / 3.0, 10.0, 2.0 * w / 3.0, 10.0 + h);
            let grid = Grid::covering(&extent, dim).unwrap();
            assert!(grid.width() >= 1 && grid.height() >= 1);
            assert!(grid.width().max(grid.height()) <= dim);
            assert!(
                grid.extent().contains_extent(&extent),
                "grid {:?} misses extent {:?}",
                grid.extent(),
                extent
            );
        }
    }

    #[test]
    fn test_grid_rejects_empty_extent() {
        let extent = Extent::new(1.0, 1.0, 1.0, 1.0);
        assert!(matches!(
            Grid::covering(&extent, 16),
            Err(Error::DegeneratePointSet(_))
        ));
        let extent = Extent::new(0.0, 0.0, 1.0, 1.0);
        assert!(Grid::covering(&extent, 0).is_err());
    }

    #[test]
    fn test_grid_rejects_unaddressable_sizes() {
        let extent = Extent::new(0.0, 0.0, 100.0, 100.0);
        assert!(matches!(
            Grid::covering(&extent, usize::MAX),
            Err(Error::InvalidDimensions { .. })
        ));
        assert!(matches!(
            Grid::covering(&extent, u32::MAX as usize + 1),
            Err(Error::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_cell_center_and_corners() {
        let grid = Grid::from_transform(GeoTransform::new(0.0, 10.0, 1.0, -1.0), 10, 10).unwrap();
        assert_eq!(grid.cell_center(0, 0), (0.5, 9.5));
        assert_eq!(grid.pixel_to_plane(10.0, 10.0), (10.0, 0.0));
        assert!(Grid::from_transform(GeoTransform::default(), 0, 4).is_err());
    }
}
