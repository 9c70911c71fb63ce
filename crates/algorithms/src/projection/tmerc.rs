//! Local transverse Mercator on the WGS84 ellipsoid (Snyder 1987, USGS
//! Prof. Paper 1395, pp. 61-64).
//!
//! Unit scale on the central meridian and a false origin at the projection
//! centre: planar coordinates are metres east (`x`) and north (`y`) of it.
//! The series expansions are accurate to well below a millimetre within a
//! few degrees of the central meridian.

use gpsraster_core::{Error, GeoPoint, ProjectedPoint, Result, CRS};

use super::Projector;

// ── WGS84 ellipsoid constants ────────────────────────────────────────────

const A: f64 = 6_378_137.0; // semi-major axis (m)
const F: f64 = 1.0 / 298.257_223_563; // flattening
const E2: f64 = 2.0 * F - F * F; // eccentricity squared
const E_PRIME2: f64 = E2 / (1.0 - E2); // second eccentricity squared
const MEAN_RADIUS: f64 = 6_371_008.8;

/// Transverse Mercator centred on a survey
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalTransverseMercator {
    lat0: f64,
    lon0: f64,
    /// Meridional arc from the equator to `lat0`
    m0: f64,
}

impl LocalTransverseMercator {
    /// Projection centred on (`lat0`, `lon0`), in degrees
    pub fn new(lat0: f64, lon0: f64) -> Result<Self> {
        if !(lat0.abs() < 90.0) || !(-180.0..=180.0).contains(&lon0) {
            return Err(Error::Projection(format!(
                "cannot centre a transverse Mercator on ({lat0}, {lon0})"
            )));
        }
        Ok(Self {
            lat0,
            lon0,
            m0: meridional_arc(lat0.to_radians()),
        })
    }

    /// Projection centred on the centroid of `points`.
    ///
    /// The centre longitude is a circular mean, so surveys straddling the
    /// antimeridian centre correctly.
    pub fn centered_on(points: &[GeoPoint]) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::Projection("no points to centre the projection on".into()));
        }

        let n = points.len() as f64;
        let lat0 = points.iter().map(|p| p.latitude).sum::<f64>() / n;
        let (sin_sum, cos_sum) = points.iter().fold((0.0, 0.0), |(s, c), p| {
            let lon = p.longitude.to_radians();
            (s + lon.sin(), c + lon.cos())
        });
        let lon0 = sin_sum.atan2(cos_sum).to_degrees();

        Self::new(lat0, lon0)
    }

    /// Projection centre as (latitude, longitude)
    pub fn center(&self) -> (f64, f64) {
        (self.lat0, self.lon0)
    }

    /// Offset of a point from the centre in degrees of arc, longitude scaled
    /// by the cosine of the centre latitude (plate carrée about the centre).
    ///
    /// Points on a straight line in latitude/longitude stay exactly on a
    /// straight line here, unlike after `forward`.
    pub fn angular_offset(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let dlon = wrap_degrees(lon_deg - self.lon0);
        (dlon * self.lat0.to_radians().cos(), lat_deg - self.lat0)
    }

    /// (latitude, longitude) in degrees to (x, y) in metres
    pub fn forward(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let lat = lat_deg.to_radians();
        let dlon = wrap_degrees(lon_deg - self.lon0).to_radians();

        let sin_lat = lat.sin();
        let cos_lat = lat.cos();
        let tan_lat = lat.tan();

        let n = A / (1.0 - E2 * sin_lat * sin_lat).sqrt();
        let t = tan_lat * tan_lat;
        let c = E_PRIME2 * cos_lat * cos_lat;
        let a_coeff = cos_lat * dlon;

        let a2 = a_coeff * a_coeff;
        let a4 = a2 * a2;
        let a6 = a4 * a2;

        // Snyder eq. 8-9
        let x = n
            * (a_coeff
                + (1.0 - t + c) * a2 * a_coeff / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * E_PRIME2) * a4 * a_coeff / 120.0);

        // Snyder eq. 8-10
        let y = meridional_arc(lat) - self.m0
            + n * tan_lat
                * (a2 / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * E_PRIME2) * a6 / 720.0);

        (x, y)
    }

    /// (x, y) in metres to (latitude, longitude) in degrees
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let phi1 = footpoint_latitude(self.m0 + y);

        let sin1 = phi1.sin();
        let cos1 = phi1.cos();
        let tan1 = phi1.tan();

        let c1 = E_PRIME2 * cos1 * cos1;
        let t1 = tan1 * tan1;
        let w = 1.0 - E2 * sin1 * sin1;
        let n1 = A / w.sqrt();
        let r1 = A * (1.0 - E2) / (w * w.sqrt());
        let d = x / n1;

        let d2 = d * d;
        let d4 = d2 * d2;
        let d6 = d4 * d2;

        // Snyder eq. 8-17
        let lat = phi1
            - (n1 * tan1 / r1)
                * (d2 / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * E_PRIME2) * d4 / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                        - 252.0 * E_PRIME2
                        - 3.0 * c1 * c1)
                        * d6
                        / 720.0);

        // Snyder eq. 8-18
        let dlon = (d - (1.0 + 2.0 * t1 + c1) * d2 * d / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * E_PRIME2 + 24.0 * t1 * t1)
                * d4
                * d
                / 120.0)
            / cos1;

        (
            lat.to_degrees(),
            wrap_degrees(self.lon0 + dlon.to_degrees()),
        )
    }

    /// Horizontal distance in metres between `point` and its image after a
    /// project/unproject round trip (infinite if the round trip breaks down)
    pub fn roundtrip_error_m(&self, point: &GeoPoint) -> f64 {
        let (x, y) = self.forward(point.latitude, point.longitude);
        let (lat, lon) = self.inverse(x, y);
        let dn = (lat - point.latitude).to_radians() * MEAN_RADIUS;
        let de = wrap_degrees(lon - point.longitude).to_radians()
            * MEAN_RADIUS
            * point.latitude.to_radians().cos();
        let err = dn.hypot(de);
        if err.is_finite() {
            err
        } else {
            f64::INFINITY
        }
    }

    /// Check the round trip of every point against `tolerance_m`, returning
    /// the largest error observed
    pub fn verify(&self, points: &[GeoPoint], tolerance_m: f64) -> Result<f64> {
        let mut worst = 0.0f64;
        for (i, p) in points.iter().enumerate() {
            let err = self.roundtrip_error_m(p);
            if !(err <= tolerance_m) {
                return Err(Error::Projection(format!(
                    "point #{i} ({}, {}) does not survive a projection round trip \
                     (error {err:.3} m > {tolerance_m} m)",
                    p.latitude, p.longitude
                )));
            }
            worst = worst.max(err);
        }
        Ok(worst)
    }
}

impl Projector for LocalTransverseMercator {
    fn project(&self, point: &GeoPoint) -> ProjectedPoint {
        let (x, y) = self.forward(point.latitude, point.longitude);
        ProjectedPoint::new(x, y, point.elevation)
    }

    fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        self.inverse(x, y)
    }

    fn crs(&self) -> CRS {
        CRS::local_transverse_mercator(self.lat0, self.lon0)
    }
}

/// Fold an angle in degrees into [-180, 180)
fn wrap_degrees(deg: f64) -> f64 {
    (deg + 180.0).rem_euclid(360.0) - 180.0
}

/// Meridional arc from equator to latitude `lat` (radians).
/// Snyder eq. 3-21.
fn meridional_arc(lat: f64) -> f64 {
    let e2 = E2;
    let e4 = e2 * e2;
    let e6 = e4 * e2;

    A * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
        - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}

/// Latitude (radians) whose meridional arc is `m`.
/// Snyder eqs. 3-24 and 7-19.
fn footpoint_latitude(m: f64) -> f64 {
    let e4 = E2 * E2;
    let e6 = e4 * E2;
    let mu = m / (A * (1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

    let root = (1.0 - E2).sqrt();
    let e1 = (1.0 - root) / (1.0 + root);
    let e1_2 = e1 * e1;
    let e1_3 = e1_2 * e1;
    let e1_4 = e1_3 * e1;

    mu + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: assert two values are within `tol` of each other.
    fn assert_close(a: f64, b: f64, tol: f64, msg: &str) {
        let diff = (a - b).abs();
        assert!(
            diff < tol,
            "{msg}: expected {b}, got {a}, diff {diff} exceeds tolerance {tol}"
        );
    }

    #[test]
    fn centre_maps_to_origin() {
        let tm = LocalTransverseMercator::new(52.23, 21.01).unwrap();
        let (x, y) = tm.forward(52.23, 21.01);
        assert_close(x, 0.0, 1e-9, "x at centre");
        assert_close(y, 0.0, 1e-9, "y at centre");
    }

    // Meridian degree at 52°N ≈ 111 267 m; parallel degree ≈ 68 677 m
    #[test]
    fn distances_near_warsaw() {
        let tm = LocalTransverseMercator::new(52.0, 21.0).unwrap();
        let (x, y) = tm.forward(52.01, 21.0);
        assert_close(x, 0.0, 1e-6, "due north keeps x");
        assert_close(y, 1112.67, 1.0, "0.01° of latitude");

        let (x, y) = tm.forward(52.0, 21.01);
        assert_close(x, 686.77, 1.0, "0.01° of longitude");
        assert!(y > 0.0 && y < 0.1, "parallel curves slightly north, got {y}");
    }

    #[test]
    fn roundtrip_is_sub_millimetre() {
        for &(lat0, lon0) in &[(52.2297, 21.0122), (-34.6037, -58.3816), (0.0, 0.0), (78.2, 15.6)] {
            let tm = LocalTransverseMercator::new(lat0, lon0).unwrap();
            for i in -5..=5 {
                for j in -5..=5 {
                    let p = GeoPoint::new(lat0 + i as f64 * 0.01, lon0 + j as f64 * 0.01, 0.0);
                    let err = tm.roundtrip_error_m(&p);
                    assert!(err < 1e-3, "round trip error {err} m at {p:?}");
                }
            }
        }
    }

    #[test]
    fn centered_on_uses_circular_mean() {
        let points = [
            GeoPoint::new(-16.5, 179.99, 0.0),
            GeoPoint::new(-16.5, -179.99, 0.0),
            GeoPoint::new(-16.51, 179.995, 0.0),
        ];
        let tm = LocalTransverseMercator::centered_on(&points).unwrap();
        let (_, lon0) = tm.center();
        assert!(lon0.abs() > 179.9, "centre should sit on the antimeridian, got {lon0}");

        for p in &points {
            let q = tm.project(p);
            assert!(q.x.abs() < 3_000.0 && q.y.abs() < 3_000.0, "{q:?}");
        }
        assert!(tm.verify(&points, 0.01).is_ok());
    }

    #[test]
    fn unproject_inverts_project() {
        let tm = LocalTransverseMercator::new(40.4168, -3.7037).unwrap();
        let (lat, lon) = tm.unproject(1500.0, -2500.0);
        let back = tm.project(&GeoPoint::new(lat, lon, 7.0));
        assert_close(back.x, 1500.0, 1e-4, "x");
        assert_close(back.y, -2500.0, 1e-4, "y");
        assert_eq!(back.z, 7.0);
    }

    #[test]
    fn rejects_polar_centre() {
        assert!(LocalTransverseMercator::new(90.0, 0.0).is_err());
        assert!(LocalTransverseMercator::new(0.0, 181.0).is_err());
        assert!(LocalTransverseMercator::centered_on(&[]).is_err());
    }

    #[test]
    fn crs_describes_centre() {
        let tm = LocalTransverseMercator::new(52.0, 21.0).unwrap();
        let crs = tm.crs();
        assert!(crs.proj().unwrap().contains("+proj=tmerc +lat_0=52.000000000"));
    }

    #[test]
    fn angular_offset_wraps_and_scales() {
        let tm = LocalTransverseMercator::new(60.0, 179.9).unwrap();
        let (dx, dy) = tm.angular_offset(60.5, -179.9);
        assert!((dx - 0.1).abs() < 1e-9, "{dx}");
        assert!((dy - 0.5).abs() < 1e-12);
        assert_eq!(tm.angular_offset(60.0, 179.9), (0.0, 0.0));
    }

    #[test]
    fn wrap_degrees_range() {
        assert_eq!(wrap_degrees(190.0), -170.0);
        assert_eq!(wrap_degrees(-190.0), 170.0);
        assert_eq!(wrap_degrees(180.0), -180.0);
        assert_eq!(wrap_degrees(45.0), 45.0);
    }
}
