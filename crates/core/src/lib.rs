//! # gpsraster core
//!
//! Core types and I/O for turning field GPS samples into georeferenced rasters.
//!
//! This crate provides:
//! - `GeoPoint` / `ProjectedPoint`: survey samples before and after projection
//! - `Extent`, `Grid`, `GeoTransform`: planar raster geometry
//! - `Raster<T>` and `PixelGrid`: sampled and quantized cell storage
//! - `ControlPoint` sidecars and GeoTIFF encoding
//! - `Error` / `ErrorKind`: the failure taxonomy of the pipeline

pub mod crs;
pub mod error;
pub mod geo;
pub mod io;
pub mod raster;

pub use crs::CRS;
pub use error::{Error, ErrorKind, Result};
pub use geo::{dedup_points, GeoPoint, ProjectedPoint};
pub use raster::{BitDepth, Extent, GeoTransform, Grid, PixelGrid, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::geo::{GeoPoint, ProjectedPoint};
    pub use crate::io::{ControlPoint, SidecarFormat};
    pub use crate::raster::{BitDepth, Extent, GeoTransform, Grid, PixelGrid, Raster};
    pub use crate::Algorithm;
}

/// Core trait for the pipeline stages.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
