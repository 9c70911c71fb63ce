//! Rasterization of a surface onto a regular grid
//!
//! Two passes: sample the surface at every cell centre, then quantize the
//! samples linearly between their own minimum and maximum. The sampled range
//! can exceed the input points' range between nodes, which is why it is
//! measured on the samples rather than taken from the points.

use gpsraster_core::raster::{BitDepth, Extent, Grid, PixelGrid, Raster};
use gpsraster_core::{Error, Result};
use tracing::debug;

use crate::interpolation::Surface;
use crate::maybe_rayon::*;

/// Sample `surface` at every cell centre of `grid`, rows processed in
/// parallel when the `parallel` feature is on.
pub fn sample_grid<S: Surface + ?Sized>(surface: &S, grid: &Grid) -> Result<Raster<f64>> {
    let (rows, cols) = (grid.height(), grid.width());
    let cells = rows
        .checked_mul(cols)
        .ok_or(Error::InvalidDimensions { width: cols, height: rows })?;
    let mut data = vec![0.0f64; cells];

    data.par_chunks_mut(cols)
        .enumerate()
        .for_each(|(row, row_data)| {
            for (col, cell) in row_data.iter_mut().enumerate() {
                let (x, y) = grid.cell_center(col, row);
                *cell = surface.sample(x, y);
            }
        });

    if let Some(i) = data.iter().position(|v| !v.is_finite()) {
        let (row, col) = (i / cols, i % cols);
        let (x, y) = grid.cell_center(col, row);
        return Err(Error::Other(format!(
            "surface is undefined at cell ({row}, {col}), planar ({x:.3}, {y:.3})"
        )));
    }

    let mut samples = Raster::from_vec(data, rows, cols)?;
    samples.set_transform(*grid.transform());
    Ok(samples)
}

/// Map samples onto `0..=bit_depth.scale_max()`:
///
/// ```text
/// value = round((elev - min) / (max - min) * scale_max)
/// ```
///
/// A flat field (max == min) quantizes to 0 everywhere.
pub fn quantize(samples: &Raster<f64>, bit_depth: BitDepth) -> Result<PixelGrid> {
    let stats = samples.statistics();
    let (Some(min), Some(max)) = (stats.min, stats.max) else {
        return Err(Error::Other("no finite samples to quantize".into()));
    };

    let scale_max = bit_depth.scale_max() as f64;
    let range = max - min;
    let pixels = samples.data().mapv(|e| {
        if range > 0.0 {
            ((e - min) / range * scale_max).round().clamp(0.0, scale_max) as u16
        } else {
            0
        }
    });

    let mut raster = Raster::from_array(pixels);
    raster.set_transform(*samples.transform());
    PixelGrid::new(raster, bit_depth, min, max)
}

/// Lay a grid over `extent` (longer side `max_dimension` cells), sample
/// `surface` on it and quantize the result.
pub fn rasterize<S: Surface + ?Sized>(
    surface: &S,
    extent: &Extent,
    max_dimension: usize,
    bit_depth: BitDepth,
) -> Result<(Grid, PixelGrid)> {
    let grid = Grid::covering(extent, max_dimension)?;
    debug!(
        width = grid.width(),
        height = grid.height(),
        cell_size = grid.cell_size_x(),
        "laid out grid"
    );

    let samples = sample_grid(surface, &grid)?;
    let pixels = quantize(&samples, bit_depth)?;
    debug!(
        min = pixels.elevation_min(),
        max = pixels.elevation_max(),
        %bit_depth,
        "quantized samples"
    );

    Ok((grid, pixels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_cell_centres() {
        let extent = Extent::new(0.0, 0.0, 4.0, 2.0);
        let grid = Grid::covering(&extent, 4).unwrap();
        let samples = sample_grid(&|x: f64, _y: f64| x, &grid).unwrap();
        assert_eq!(samples.shape(), (grid.height(), grid.width()));
        let (cx, _) = grid.cell_center(0, 0);
        assert_eq!(samples.get(0, 0).unwrap(), cx);
    }

    #[test]
    fn test_quantize_full_range() {
        let extent = Extent::new(0.0, 0.0, 10.0, 10.0);
        let (grid, pixels) = rasterize(&|x: f64, y: f64| x + y, &extent, 16, BitDepth::Sixteen).unwrap();
        assert_eq!((pixels.width(), pixels.height()), (grid.width(), grid.height()));

        let values = pixels.pixels().to_row_major_vec();
        assert_eq!(values.iter().copied().min(), Some(0));
        assert_eq!(values.iter().copied().max(), Some(u16::MAX));
        // Bottom-left holds the lowest sample, top-right the highest
        assert_eq!(pixels.pixels().get(grid.height() - 1, 0).unwrap(), 0);
        assert_eq!(pixels.pixels().get(0, grid.width() - 1).unwrap(), u16::MAX);
    }

    #[test]
    fn test_quantize_rounds() {
        let samples = Raster::from_vec(vec![0.0, 0.5, 1.0, 1.0 / 255.0 * 0.49], 2, 2).unwrap();
        let pixels = quantize(&samples, BitDepth::Eight).unwrap();
        assert_eq!(pixels.pixels().to_row_major_vec(), vec![0, 128, 255, 0]);
        assert_eq!(pixels.elevation_min(), 0.0);
        assert_eq!(pixels.elevation_max(), 1.0);
    }

    #[test]
    fn test_flat_surface_is_zero() {
        let extent = Extent::new(0.0, 0.0, 3.0, 1.0);
        let (_, pixels) = rasterize(&|_: f64, _: f64| 42.0, &extent, 8, BitDepth::Eight).unwrap();
        assert!(pixels.pixels().data().iter().all(|&v| v == 0));
        assert_eq!(pixels.elevation_min(), 42.0);
        assert_eq!(pixels.scale(), 0.0);
    }

    #[test]
    fn test_undefined_surface_fails() {
        let extent = Extent::new(0.0, 0.0, 2.0, 2.0);
        let err = rasterize(&|x: f64, _: f64| if x > 1.0 { f64::NAN } else { x }, &extent, 4, BitDepth::Eight)
            .unwrap_err();
        assert!(matches!(err, Error::Other(_)));
    }

    #[test]
    fn test_oversized_grid_is_rejected() {
        use gpsraster_core::GeoTransform;

        let grid = Grid::from_transform(GeoTransform::new(0.0, 0.0, 1.0, -1.0), usize::MAX, 2).unwrap();
        let err = sample_grid(&|x: f64, _: f64| x, &grid).unwrap_err();
        assert!(matches!(err, Error::InvalidDimensions { height: 2, .. }), "{err}");

        let extent = Extent::new(0.0, 0.0, 10.0, 10.0);
        let err = rasterize(&|x: f64, _: f64| x, &extent, usize::MAX, BitDepth::Eight).unwrap_err();
        assert!(matches!(err, Error::InvalidDimensions { .. }), "{err}");
    }
}
