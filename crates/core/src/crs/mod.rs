//! Coordinate Reference System handling

use serde::{Deserialize, Serialize};
use std::fmt;

/// WKT2 definition of WGS 84 (EPSG:4326), as expected by QGIS in the
/// `#CRS:` header of a `.points` file.
pub const WGS84_WKT: &str = concat!(
    r#"GEOGCRS["WGS 84",ENSEMBLE["World Geodetic System 1984 ensemble","#,
    r#"MEMBER["World Geodetic System 1984 (Transit)"],"#,
    r#"MEMBER["World Geodetic System 1984 (G730)"],"#,
    r#"MEMBER["World Geodetic System 1984 (G873)"],"#,
    r#"MEMBER["World Geodetic System 1984 (G1150)"],"#,
    r#"MEMBER["World Geodetic System 1984 (G1674)"],"#,
    r#"MEMBER["World Geodetic System 1984 (G1762)"],"#,
    r#"MEMBER["World Geodetic System 1984 (G2139)"],"#,
    r#"MEMBER["World Geodetic System 1984 (G2296)"],"#,
    r#"ELLIPSOID["WGS 84",6378137,298.257223563,LENGTHUNIT["metre",1]],"#,
    r#"ENSEMBLEACCURACY[2.0]],"#,
    r#"PRIMEM["Greenwich",0,ANGLEUNIT["degree",0.0174532925199433]],"#,
    r#"CS[ellipsoidal,2],"#,
    r#"AXIS["geodetic latitude (Lat)",north,ORDER[1],ANGLEUNIT["degree",0.0174532925199433]],"#,
    r#"AXIS["geodetic longitude (Lon)",east,ORDER[2],ANGLEUNIT["degree",0.0174532925199433]],"#,
    r#"USAGE[SCOPE["Horizontal component of 3D system."],AREA["World."],BBOX[-90,-180,90,180]],"#,
    r#"ID["EPSG",4326]]"#
);

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// WKT representation
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
    /// PROJ string if available
    proj: Option<String>,
}

impl CRS {
    /// Create a CRS from a PROJ string
    pub fn from_proj(proj: impl Into<String>) -> Self {
        Self {
            wkt: None,
            epsg: None,
            proj: Some(proj.into()),
        }
    }

    /// WGS84 geographic CRS (EPSG:4326), with its WKT2 definition attached
    pub fn wgs84() -> Self {
        Self {
            wkt: Some(WGS84_WKT.to_string()),
            epsg: Some(4326),
            proj: None,
        }
    }

    /// Transverse Mercator on WGS84 with unit scale, whose false origin sits
    /// at (`lat0`, `lon0`) so coordinates are metres east/north of that point.
    pub fn local_transverse_mercator(lat0: f64, lon0: f64) -> Self {
        Self::from_proj(format!(
            "+proj=tmerc +lat_0={lat0:.9} +lon_0={lon0:.9} +k=1 +x_0=0 +y_0=0 +datum=WGS84 +units=m +no_defs"
        ))
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Get PROJ string
    pub fn proj(&self) -> Option<&str> {
        self.proj.as_deref()
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(proj) = &self.proj {
            return proj.clone();
        }
        if let Some(wkt) = &self.wkt {
            return format!("WKT:{}", &wkt[..wkt.len().min(50)]);
        }
        "Unknown".to_string()
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}
