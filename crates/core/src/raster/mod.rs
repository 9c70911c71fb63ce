//! Raster data structures: cell storage, affine georeferencing, grid geometry
//! and quantized pixel grids

mod element;
mod extent;
mod geotransform;
mod grid;
mod pixels;

pub use element::RasterElement;
pub use extent::{Extent, Grid};
pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterStatistics};
pub use pixels::{BitDepth, PixelGrid};
