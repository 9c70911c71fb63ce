//! Survey points in geographic and projected space

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A GPS sample collected in the field: WGS84 latitude/longitude in degrees
/// and elevation in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64, elevation: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation,
        }
    }

    /// Whether latitude lies in [-90, 90] and longitude in [-180, 180]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
            && self.elevation.is_finite()
    }

    /// Validate this point, reporting `index` as its position in the input
    pub fn validate(&self, index: usize) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(Error::InvalidGeoPoint {
                index,
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }

    /// Bitwise key of the horizontal position (`-0.0` folds onto `0.0`)
    fn position_key(&self) -> (u64, u64) {
        ((self.latitude + 0.0).to_bits(), (self.longitude + 0.0).to_bits())
    }
}

impl From<(f64, f64, f64)> for GeoPoint {
    fn from((latitude, longitude, elevation): (f64, f64, f64)) -> Self {
        Self::new(latitude, longitude, elevation)
    }
}

/// A point in the local planar system: metres east (`x`) and north (`y`) of
/// the projection centre, with elevation `z`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl ProjectedPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Merge points sharing an identical (latitude, longitude), averaging their
/// elevations.
///
/// Output order follows the first occurrence of each position, so the result
/// is deterministic for a given input sequence.
pub fn dedup_points(points: &[GeoPoint]) -> Vec<GeoPoint> {
    let mut slots: HashMap<(u64, u64), usize> = HashMap::with_capacity(points.len());
    let mut merged: Vec<(GeoPoint, f64, usize)> = Vec::with_capacity(points.len());

    for p in points {
        match slots.get(&p.position_key()) {
            Some(&slot) => {
                let entry = &mut merged[slot];
                entry.1 += p.elevation;
                entry.2 += 1;
            }
            None => {
                slots.insert(p.position_key(), merged.len());
                merged.push((*p, p.elevation, 1));
            }
        }
    }

    merged
        .into_iter()
        .map(|(p, sum, count)| GeoPoint {
            elevation: sum / count as f64,
            ..p
        })
        .collect()
}
