//! Ground control points and their sidecar files
//!
//! Two layouts are supported:
//!
//! - **QGIS georeferencer** (`.points`): a `#CRS:` line carrying the WGS84
//!   WKT, then `mapX,mapY,sourceX,sourceY,enable,dX,dY,residual` records.
//!   QGIS counts image rows downwards as negative `sourceY`.
//! - **CSV**: `pixelX,pixelY,longitude,latitude` records.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::GeoTransform;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

const QGIS_HEADER: &str = "mapX,mapY,sourceX,sourceY,enable,dX,dY,residual";
const CSV_HEADER: &str = "pixelX,pixelY,longitude,latitude";

/// Correspondence between a raster pixel position and a WGS84 location.
///
/// Pixel coordinates address cell corners: `(0, 0)` is the top-left corner
/// of the image and `(width, height)` the bottom-right one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub pixel_x: f64,
    pub pixel_y: f64,
    pub longitude: f64,
    pub latitude: f64,
}

impl ControlPoint {
    pub fn new(pixel_x: f64, pixel_y: f64, longitude: f64, latitude: f64) -> Self {
        Self {
            pixel_x,
            pixel_y,
            longitude,
            latitude,
        }
    }
}

/// Least-squares pixel -> (longitude, latitude) affine through control points
pub fn fit_affine(points: &[ControlPoint]) -> Option<GeoTransform> {
    let pairs: Vec<_> = points
        .iter()
        .map(|cp| ((cp.pixel_x, cp.pixel_y), (cp.longitude, cp.latitude)))
        .collect();
    GeoTransform::from_control_points(&pairs)
}

/// Layout of the control-point sidecar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SidecarFormat {
    QgisPoints,
    Csv,
}

impl SidecarFormat {
    /// `.points` selects the QGIS layout, anything else CSV
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("points") => SidecarFormat::QgisPoints,
            _ => SidecarFormat::Csv,
        }
    }
}

impl FromStr for SidecarFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "qgis" | "points" => Ok(SidecarFormat::QgisPoints),
            "csv" => Ok(SidecarFormat::Csv),
            _ => Err(Error::InvalidParameter {
                name: "sidecar_format",
                value: s.to_string(),
                reason: "expected qgis or csv".into(),
            }),
        }
    }
}

/// Render control points in the given layout
pub fn format_control_points(points: &[ControlPoint], format: SidecarFormat) -> String {
    let mut out = String::new();
    match format {
        SidecarFormat::QgisPoints => {
            let crs = CRS::wgs84();
            let _ = writeln!(out, "#CRS: {}", crs.wkt().unwrap_or_default());
            let _ = writeln!(out, "{QGIS_HEADER}");
            let residuals = pixel_residuals(points);
            for (cp, (dx, dy)) in points.iter().zip(residuals) {
                let _ = writeln!(
                    out,
                    "{:.10},{:.10},{:.6},{:.6},1,{:.6},{:.6},{:.6}",
                    cp.longitude,
                    cp.latitude,
                    cp.pixel_x,
                    0.0 - cp.pixel_y,
                    dx,
                    dy,
                    dx.hypot(dy)
                );
            }
        }
        SidecarFormat::Csv => {
            let _ = writeln!(out, "{CSV_HEADER}");
            for cp in points {
                let _ = writeln!(
                    out,
                    "{:.6},{:.6},{:.10},{:.10}",
                    cp.pixel_x, cp.pixel_y, cp.longitude, cp.latitude
                );
            }
        }
    }
    out
}

/// Write control points to `path`, creating or truncating the file.
///
/// On failure the file may be missing or partially written.
pub fn write_control_points<P: AsRef<Path>>(
    points: &[ControlPoint],
    path: P,
    format: SidecarFormat,
) -> Result<()> {
    std::fs::write(path.as_ref(), format_control_points(points, format))?;
    debug!(path = %path.as_ref().display(), points = points.len(), ?format, "wrote control points");
    Ok(())
}

/// Read a sidecar in either layout
pub fn read_control_points<P: AsRef<Path>>(path: P) -> Result<Vec<ControlPoint>> {
    let text = std::fs::read_to_string(path.as_ref())?;
    parse_control_points(&text)
}

/// Parse sidecar text; the layout is recognised from its header line
pub fn parse_control_points(text: &str) -> Result<Vec<ControlPoint>> {
    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'));

    let header = lines
        .next()
        .ok_or_else(|| Error::Other("control point file is empty".into()))?;
    let qgis = match header {
        QGIS_HEADER => true,
        CSV_HEADER => false,
        other => return Err(Error::Other(format!("unrecognised sidecar header: {other}"))),
    };

    lines
        .enumerate()
        .map(|(i, line)| {
            let fields = line
                .split(',')
                .map(|f| f.trim().parse::<f64>())
                .collect::<std::result::Result<Vec<f64>, _>>()
                .map_err(|e| Error::Other(format!("record {}: {}", i + 1, e)))?;
            match (qgis, fields.as_slice()) {
                (true, [lon, lat, sx, sy, ..]) if fields.len() == 8 => {
                    Ok(ControlPoint::new(*sx, -*sy, *lon, *lat))
                }
                (false, [px, py, lon, lat]) => Ok(ControlPoint::new(*px, *py, *lon, *lat)),
                _ => Err(Error::Other(format!(
                    "record {}: unexpected field count {}",
                    i + 1,
                    fields.len()
                ))),
            }
        })
        .collect()
}

/// Per-point pixel residuals (dX, dY in QGIS source orientation) of the
/// affine fit through all points; zeros when no fit is possible.
fn pixel_residuals(points: &[ControlPoint]) -> Vec<(f64, f64)> {
    let Some(affine) = fit_affine(points) else {
        return vec![(0.0, 0.0); points.len()];
    };
    points
        .iter()
        .map(|cp| {
            let (col, row) = affine.geo_to_pixel(cp.longitude, cp.latitude);
            (col - cp.pixel_x, -(row - cp.pixel_y))
        })
        .collect()
}
