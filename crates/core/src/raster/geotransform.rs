//! Affine geotransformation for rasters

use serde::{Deserialize, Serialize};

/// Affine transformation coefficients for georeferencing rasters.
///
/// Converts between pixel coordinates (col, row) and map coordinates (x, y):
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// The planar grid of a survey raster is north-up (`row_rotation` and
/// `col_rotation` are 0, `pixel_height` negative). A transform fitted from
/// control points onto longitude/latitude generally carries small rotation
/// terms, because the local projection's grid north is not parallel to the
/// meridians away from the centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Pixel width (cell size in X direction)
    pub pixel_width: f64,
    /// Pixel height (cell size in Y direction, usually negative)
    pub pixel_height: f64,
    /// Contribution of the row index to X
    pub row_rotation: f64,
    /// Contribution of the column index to Y
    pub col_rotation: f64,
}

impl GeoTransform {
    /// Create a new GeoTransform with no rotation (north-up image)
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// Least-squares affine fit through `(col, row) -> (x, y)` correspondences.
    ///
    /// Returns `None` for fewer than three pairs or when the pixel positions
    /// are collinear.
    pub fn from_control_points(pairs: &[((f64, f64), (f64, f64))]) -> Option<Self> {
        if pairs.len() < 3 {
            return None;
        }

        let n = pairs.len() as f64;
        let (mut mc, mut mr, mut mx, mut my) = (0.0, 0.0, 0.0, 0.0);
        for &((c, r), (x, y)) in pairs {
            mc += c;
            mr += r;
            mx += x;
            my += y;
        }
        mc /= n;
        mr /= n;
        mx /= n;
        my /= n;

        // Centred normal equations decouple the intercept from the slopes
        let (mut scc, mut scr, mut srr) = (0.0, 0.0, 0.0);
        let (mut scx, mut srx, mut scy, mut sry) = (0.0, 0.0, 0.0, 0.0);
        for &((c, r), (x, y)) in pairs {
            let (dc, dr, dx, dy) = (c - mc, r - mr, x - mx, y - my);
            scc += dc * dc;
            scr += dc * dr;
            srr += dr * dr;
            scx += dc * dx;
            srx += dr * dx;
            scy += dc * dy;
            sry += dr * dy;
        }

        let det = scc * srr - scr * scr;
        if det.abs() <= 1e-12 * (scc * srr).max(f64::MIN_POSITIVE) {
            return None;
        }

        let pixel_width = (scx * srr - srx * scr) / det;
        let row_rotation = (srx * scc - scx * scr) / det;
        let col_rotation = (scy * srr - sry * scr) / det;
        let pixel_height = (sry * scc - scy * scr) / det;

        Some(Self {
            origin_x: mx - pixel_width * mc - row_rotation * mr,
            origin_y: my - col_rotation * mc - pixel_height * mr,
            pixel_width,
            pixel_height,
            row_rotation,
            col_rotation,
        })
    }

    /// Convert fractional pixel coordinates to map coordinates
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let x = self.origin_x + col * self.pixel_width + row * self.row_rotation;
        let y = self.origin_y + col * self.col_rotation + row * self.pixel_height;
        (x, y)
    }

    /// Convert pixel coordinates to map coordinates
    ///
    /// Returns the coordinates of the pixel center
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Convert pixel coordinates to map coordinates (top-left corner)
    pub fn pixel_to_geo_corner(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64, row as f64)
    }

    /// Convert map coordinates to pixel coordinates
    ///
    /// Returns fractional pixel coordinates; use `.floor()` to get integer indices
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;

        if det.abs() < 1e-20 {
            return (f64::NAN, f64::NAN);
        }

        let dx = x - self.origin_x;
        let dy = y - self.origin_y;

        let col = (self.pixel_height * dx - self.row_rotation * dy) / det;
        let row = (-self.col_rotation * dx + self.pixel_width * dy) / det;

        (col, row)
    }

    /// Calculate the bounding box (min_x, min_y, max_x, max_y) for a raster
    /// of given dimensions
    pub fn bounds(&self, width: usize, height: usize) -> (f64, f64, f64, f64) {
        let (x0, y0) = self.pixel_to_geo_corner(0, 0);
        let (x1, y1) = self.pixel_to_geo_corner(width, 0);
        let (x2, y2) = self.pixel_to_geo_corner(0, height);
        let (x3, y3) = self.pixel_to_geo_corner(width, height);

        let min_x = x0.min(x1).min(x2).min(x3);
        let max_x = x0.max(x1).max(x2).max(x3);
        let min_y = y0.min(y1).min(y2).min(y3);
        let max_y = y0.max(y1).max(y2).max(y3);

        (min_x, min_y, max_x, max_y)
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}
