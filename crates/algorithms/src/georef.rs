//! Ground control points for a rasterized grid
//!
//! Grid corners (and optionally an interior lattice) are mapped from pixel
//! space to the plane through the grid geometry, then to WGS84 through the
//! projection's inverse.

use gpsraster_core::io::ControlPoint;
use gpsraster_core::raster::Grid;
use gpsraster_core::{Error, Result};

use crate::projection::Projector;

/// Pixel positions of the four grid corners in control-point order:
/// top-left, top-right, bottom-left, bottom-right.
pub fn corner_pixels(grid: &Grid) -> [(f64, f64); 4] {
    let (w, h) = (grid.width() as f64, grid.height() as f64);
    [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)]
}

/// Pixel positions of an `n` x `n` control lattice: the corners first, then
/// the remaining lattice nodes row by row.
pub fn lattice_pixels(grid: &Grid, n: usize) -> Result<Vec<(f64, f64)>> {
    if n < 2 {
        return Err(Error::InvalidParameter {
            name: "control_grid",
            value: n.to_string(),
            reason: "needs at least 2 points per side".into(),
        });
    }

    let mut pixels = corner_pixels(grid).to_vec();
    let (w, h) = (grid.width() as f64, grid.height() as f64);
    let last = n - 1;
    for j in 0..n {
        for i in 0..n {
            let is_corner = (i == 0 || i == last) && (j == 0 || j == last);
            if !is_corner {
                let px = w * i as f64 / last as f64;
                let py = h * j as f64 / last as f64;
                pixels.push((px, py));
            }
        }
    }
    Ok(pixels)
}

/// Control points for `grid` on an `n` x `n` lattice (`n = 2`: corners only)
pub fn derive_control_points<P: Projector + ?Sized>(
    grid: &Grid,
    projector: &P,
    n: usize,
) -> Result<Vec<ControlPoint>> {
    lattice_pixels(grid, n)?
        .into_iter()
        .map(|(px, py)| {
            let (x, y) = grid.pixel_to_plane(px, py);
            let (lat, lon) = projector.unproject(x, y);
            if !(lat.is_finite() && lon.is_finite()) || lat.abs() > 90.0 {
                return Err(Error::Projection(format!(
                    "pixel ({px}, {py}) at planar ({x:.3}, {y:.3}) has no geographic position"
                )));
            }
            Ok(ControlPoint::new(px, py, lon, lat))
        })
        .collect()
}
