//! End-to-end raster creation from survey points
//!
//! validate → dedup → project → fit surface → rasterize → control points,
//! then encode the image and write it and the sidecar. Every stage fails
//! fast; nothing is written unless every computation succeeded.

use std::path::Path;

use gpsraster_core::io::{
    write_control_points, write_geotiff_to_buffer, ControlPoint, GeoTiffOptions, SidecarFormat,
};
use gpsraster_core::raster::{BitDepth, Extent, Grid, PixelGrid};
use gpsraster_core::{dedup_points, Algorithm, Error, GeoPoint, Result, CRS};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::georef::derive_control_points;
use crate::interpolation::{ensure_not_collinear, IdwParams, SurfaceField, SurfaceParams};
use crate::projection::{LocalTransverseMercator, Projector};
use crate::rasterize::rasterize;

/// Horizontal projection round-trip error (m) above which a run fails
const ROUNDTRIP_TOLERANCE_M: f64 = 0.5;

/// Minimum number of distinct survey points
const MIN_POINTS: usize = 3;

/// Largest accepted raster side, in cells
pub const MAX_DIMENSION: usize = 65_536;

/// Parameters for raster creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterParams {
    /// Cells along the longer side of the raster
    pub max_dimension: usize,
    /// Fraction of the point extent added on every side
    pub margin: f64,
    pub bit_depth: BitDepth,
    /// IDW power outside the triangulation
    pub idw_power: f64,
    /// IDW neighbours outside the triangulation
    pub idw_neighbors: usize,
    /// Survey span (m) beyond which a single local projection is flagged
    pub max_span_m: f64,
    /// Control points per side; 2 gives the four corners
    pub control_grid: usize,
    /// Sidecar layout; inferred from the sidecar extension when `None`
    pub sidecar_format: Option<SidecarFormat>,
    /// Embed control points as GeoTIFF tiepoints in the image
    pub embed_tiepoints: bool,
}

impl Default for RasterParams {
    fn default() -> Self {
        Self {
            max_dimension: 1024,
            margin: 0.05,
            bit_depth: BitDepth::Sixteen,
            idw_power: 2.0,
            idw_neighbors: 6,
            max_span_m: 1_000_000.0,
            control_grid: 2,
            sidecar_format: None,
            embed_tiepoints: true,
        }
    }
}

impl RasterParams {
    /// Reject values no run could succeed with
    pub fn validate(&self) -> Result<()> {
        fn invalid(name: &'static str, value: impl ToString, reason: &str) -> Error {
            Error::InvalidParameter {
                name,
                value: value.to_string(),
                reason: reason.into(),
            }
        }

        if self.max_dimension == 0 || self.max_dimension > MAX_DIMENSION {
            return Err(invalid(
                "max_dimension",
                self.max_dimension,
                "must lie in [1, 65536]",
            ));
        }
        if !(self.margin.is_finite() && (0.0..=1.0).contains(&self.margin)) {
            return Err(invalid("margin", self.margin, "must lie in [0, 1]"));
        }
        if !(self.idw_power.is_finite() && self.idw_power > 0.0) {
            return Err(invalid("idw_power", self.idw_power, "must be positive"));
        }
        if self.idw_neighbors < 3 {
            return Err(invalid("idw_neighbors", self.idw_neighbors, "must be at least 3"));
        }
        if !(self.max_span_m.is_finite() && self.max_span_m > 0.0) {
            return Err(invalid("max_span_m", self.max_span_m, "must be positive"));
        }
        if self.control_grid < 2 {
            return Err(invalid("control_grid", self.control_grid, "must be at least 2"));
        }
        Ok(())
    }

    fn surface_params(&self) -> SurfaceParams {
        SurfaceParams {
            idw: IdwParams {
                power: self.idw_power,
                neighbors: self.idw_neighbors,
                ..IdwParams::default()
            },
            ..SurfaceParams::default()
        }
    }
}

/// Everything a run computes, ready to be written
#[derive(Debug, Clone)]
pub struct RasterProduct {
    pub grid: Grid,
    pub pixels: PixelGrid,
    /// Corners first (TL, TR, BL, BR), then any interior lattice points
    pub control_points: Vec<ControlPoint>,
    /// The local projection the grid is laid out in
    pub projection: CRS,
    /// Points supplied by the caller
    pub input_points: usize,
    /// Points merged into others, geographically or after projection
    pub merged_duplicates: usize,
    pub sidecar_format: Option<SidecarFormat>,
    pub embed_tiepoints: bool,
}

impl RasterProduct {
    /// Layout used for a sidecar written to `path`
    pub fn sidecar_format_for(&self, path: &Path) -> SidecarFormat {
        self.sidecar_format
            .unwrap_or_else(|| SidecarFormat::from_path(path))
    }

    /// The four corner control points (TL, TR, BL, BR)
    pub fn corners(&self) -> &[ControlPoint] {
        &self.control_points[..self.control_points.len().min(4)]
    }

    /// Write the image to `raster_path`, then the sidecar to `sidecar_path`.
    ///
    /// The image is encoded in memory first, so encoding failures leave no
    /// file behind. A failure while writing may leave either file partial.
    pub fn write(&self, raster_path: &Path, sidecar_path: &Path) -> Result<()> {
        if raster_path == sidecar_path {
            return Err(Error::InvalidParameter {
                name: "sidecar_path",
                value: sidecar_path.display().to_string(),
                reason: "must differ from the raster path".into(),
            });
        }

        let options = GeoTiffOptions {
            tiepoints: if self.embed_tiepoints {
                self.control_points.clone()
            } else {
                Vec::new()
            },
        };
        let image = write_geotiff_to_buffer(&self.pixels, &options)?;

        std::fs::write(raster_path, &image)?;
        debug!(path = %raster_path.display(), bytes = image.len(), "wrote raster");
        write_control_points(
            &self.control_points,
            sidecar_path,
            self.sidecar_format_for(sidecar_path),
        )?;

        Ok(())
    }
}

/// Run every computation of the pipeline without touching the filesystem
pub fn build_raster(points: &[GeoPoint], params: &RasterParams) -> Result<RasterProduct> {
    params.validate()?;

    for (i, p) in points.iter().enumerate() {
        p.validate(i)?;
    }

    let unique = dedup_points(points);
    let duplicates = points.len() - unique.len();
    if duplicates > 0 {
        warn!(duplicates, "averaged points sharing a position");
    }
    if unique.len() < MIN_POINTS {
        return Err(Error::InsufficientPoints {
            found: unique.len(),
            required: MIN_POINTS,
        });
    }

    let projector = LocalTransverseMercator::centered_on(&unique)?;
    // Collinear in latitude/longitude; projection curvature would otherwise
    // lift such a line just off zero area
    let offsets: Vec<(f64, f64)> = unique
        .iter()
        .map(|p| projector.angular_offset(p.latitude, p.longitude))
        .collect();
    ensure_not_collinear(&offsets)?;

    let worst = projector.verify(&unique, ROUNDTRIP_TOLERANCE_M)?;
    let projected = projector.project_all(&unique);
    let (lat0, lon0) = projector.center();
    debug!(lat0, lon0, roundtrip_error_m = worst, "projected points");

    // Fits the point extent; always succeeds for a non-empty slice
    let bounds = Extent::from_points(&projected)
        .ok_or_else(|| Error::Other("no projected points".into()))?;
    let span = bounds.width().hypot(bounds.height());
    if span > params.max_span_m {
        warn!(
            span_m = span,
            limit_m = params.max_span_m,
            "survey spans more than a local projection should cover"
        );
    }

    let surface = SurfaceField::fit(&projected, &params.surface_params())?;

    let extent = bounds.expanded(params.margin);
    let (grid, pixels) = rasterize(&surface, &extent, params.max_dimension, params.bit_depth)?;

    let control_points = derive_control_points(&grid, &projector, params.control_grid)?;

    info!(
        points = points.len(),
        nodes = surface.node_count(),
        width = grid.width(),
        height = grid.height(),
        "built raster"
    );

    Ok(RasterProduct {
        grid,
        pixels,
        control_points,
        projection: projector.crs(),
        input_points: points.len(),
        merged_duplicates: duplicates + surface.merged_count(),
        sidecar_format: params.sidecar_format,
        embed_tiepoints: params.embed_tiepoints,
    })
}

/// Build the raster for `points` and write the image and control-point sidecar
pub fn create_raster(
    points: &[GeoPoint],
    raster_path: &Path,
    sidecar_path: &Path,
    params: &RasterParams,
) -> Result<RasterProduct> {
    let product = build_raster(points, params)?;
    product.write(raster_path, sidecar_path)?;
    info!(
        raster = %raster_path.display(),
        sidecar = %sidecar_path.display(),
        "raster created"
    );
    Ok(product)
}

/// Raster creation bound to a parameter set
#[derive(Debug, Clone, Default)]
pub struct RasterCreator {
    params: RasterParams,
}

impl RasterCreator {
    pub fn new(params: RasterParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &RasterParams {
        &self.params
    }

    /// Compute the raster and control points in memory
    pub fn build(&self, points: &[GeoPoint]) -> Result<RasterProduct> {
        build_raster(points, &self.params)
    }

    /// Compute and write both output files
    pub fn create(
        &self,
        points: &[GeoPoint],
        raster_path: &Path,
        sidecar_path: &Path,
    ) -> Result<RasterProduct> {
        create_raster(points, raster_path, sidecar_path, &self.params)
    }
}

impl Algorithm for RasterCreator {
    type Input = Vec<GeoPoint>;
    type Output = RasterProduct;
    type Params = RasterParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "RasterCreator"
    }

    fn description(&self) -> &'static str {
        "Interpolate GPS survey points into a georeferenced elevation raster"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        build_raster(&input, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warsaw() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(52.2297, 21.0122, 100.0),
            GeoPoint::new(52.2300, 21.0130, 105.0),
            GeoPoint::new(52.2305, 21.0115, 95.0),
        ]
    }

    #[test]
    fn test_default_params_validate() {
        assert!(RasterParams::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_params() {
        let cases = [
            RasterParams { max_dimension: 0, ..Default::default() },
            RasterParams { max_dimension: MAX_DIMENSION + 1, ..Default::default() },
            RasterParams { max_dimension: usize::MAX, ..Default::default() },
            RasterParams { margin: -0.1, ..Default::default() },
            RasterParams { margin: f64::NAN, ..Default::default() },
            RasterParams { idw_power: 0.0, ..Default::default() },
            RasterParams { idw_neighbors: 2, ..Default::default() },
            RasterParams { max_span_m: f64::INFINITY, ..Default::default() },
            RasterParams { control_grid: 1, ..Default::default() },
        ];
        for params in cases {
            let err = build_raster(&warsaw(), &params).unwrap_err();
            assert!(matches!(err, Error::InvalidParameter { .. }), "{params:?}: {err}");
        }
    }

    #[test]
    fn test_build_small_raster() {
        let params = RasterParams { max_dimension: 64, ..Default::default() };
        let product = build_raster(&warsaw(), &params).unwrap();

        assert_eq!(product.grid.width().max(product.grid.height()), 64);
        assert_eq!(product.pixels.width(), product.grid.width());
        assert_eq!(product.pixels.height(), product.grid.height());
        assert_eq!(product.control_points.len(), 4);
        assert_eq!(product.corners().len(), 4);
        assert_eq!(product.input_points, 3);
        assert_eq!(product.merged_duplicates, 0);
        assert!(product.projection.proj().unwrap().starts_with("+proj=tmerc"));

        // Both interpolants blend node values convexly
        assert!(product.pixels.elevation_min() >= 95.0 - 1e-9);
        assert!(product.pixels.elevation_max() <= 105.0 + 1e-9);
        assert!(product.pixels.elevation_max() > product.pixels.elevation_min());
    }

    #[test]
    fn test_invalid_point_reported_by_index() {
        let mut points = warsaw();
        points.push(GeoPoint::new(91.0, 0.0, 0.0));
        let err = build_raster(&points, &RasterParams::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidGeoPoint { index: 3, .. }), "{err}");
    }

    #[test]
    fn test_algorithm_trait() {
        let creator = RasterCreator::default();
        assert_eq!(creator.name(), "RasterCreator");
        let product = creator
            .execute(warsaw(), RasterParams { max_dimension: 16, ..Default::default() })
            .unwrap();
        assert_eq!(product.grid.width().max(product.grid.height()), 16);
    }

    #[test]
    fn test_write_rejects_same_path() {
        let product = build_raster(&warsaw(), &RasterParams { max_dimension: 8, ..Default::default() })
            .unwrap();
        let path = Path::new("out.tif");
        let err = product.write(path, path).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "sidecar_path", .. }));
        assert!(!path.exists());
    }
}
