//! I/O: GeoTIFF encoding of pixel grids and control-point sidecars

mod control_points;
mod native;

pub use control_points::{
    fit_affine, format_control_points, parse_control_points, read_control_points,
    write_control_points, ControlPoint, SidecarFormat,
};
pub use native::{
    read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer,
    DecodedImage, GeoTiffOptions,
};
