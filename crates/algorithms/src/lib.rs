//! # gpsraster algorithms
//!
//! The computational stages that turn survey points into a raster.
//!
//! ## Modules
//!
//! - **projection**: local transverse Mercator between WGS84 and metres
//! - **interpolation**: Delaunay/IDW hybrid surface, k-d tree
//! - **rasterize**: grid sampling and quantization
//! - **georef**: ground control points for the grid
//! - **pipeline**: `RasterCreator`, running everything end to end

pub mod georef;
pub mod interpolation;
pub(crate) mod maybe_rayon;
pub mod pipeline;
pub mod projection;
pub mod rasterize;

pub use pipeline::{build_raster, create_raster, RasterCreator, RasterParams, RasterProduct};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::georef::{corner_pixels, derive_control_points};
    pub use crate::interpolation::{IdwParams, SamplePoint, Surface, SurfaceField, SurfaceParams};
    pub use crate::pipeline::{
        build_raster, create_raster, RasterCreator, RasterParams, RasterProduct,
    };
    pub use crate::projection::{LocalTransverseMercator, Projector};
    pub use crate::rasterize::{quantize, rasterize, sample_grid};
    pub use gpsraster_core::prelude::*;
}
