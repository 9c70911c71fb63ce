//! Survey point files: one `latitude,longitude,elevation` record per line.
//!
//! Blank lines and lines starting with `#` are ignored, as is a leading
//! header row whose first field is not a number.

use anyhow::{bail, Context, Result};
use gpsraster_core::GeoPoint;
use std::path::Path;

pub fn read_points(path: &Path) -> Result<Vec<GeoPoint>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read points from {}", path.display()))?;
    parse_points(&text).with_context(|| format!("Invalid points file {}", path.display()))
}

pub fn parse_points(text: &str) -> Result<Vec<GeoPoint>> {
    let mut points = Vec::new();

    for (lineno, line) in text.lines().enumerate().map(|(i, l)| (i + 1, l.trim())) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if points.is_empty() && fields.first().is_some_and(|f| f.parse::<f64>().is_err()) {
            // header
            continue;
        }
        if fields.len() != 3 {
            bail!("line {lineno}: expected latitude,longitude,elevation, got {line:?}");
        }

        let value = |i: usize, name: &str| -> Result<f64> {
            fields[i]
                .parse::<f64>()
                .with_context(|| format!("line {lineno}: invalid {name} {:?}", fields[i]))
        };
        points.push(GeoPoint::new(
            value(0, "latitude")?,
            value(1, "longitude")?,
            value(2, "elevation")?,
        ));
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_header_and_comments() {
        let text = "latitude,longitude,elevation\n\
                    # morning walk\n\
                    52.2297, 21.0122, 100.0\n\
                    \n\
                    52.2300,21.0130,105\n";
        let points = parse_points(text).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0], GeoPoint::new(52.2297, 21.0122, 100.0));
        assert_eq!(points[1].elevation, 105.0);
    }

    #[test]
    fn test_rejects_malformed_records() {
        assert!(parse_points("1,2\n").is_err());
        assert!(parse_points("1,2,3\n4,x,6\n").is_err());
    }

    #[test]
    fn test_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.csv");
        std::fs::write(&path, "0,0,1\n0,1,2\n1,0,3\n").unwrap();
        assert_eq!(read_points(&path).unwrap().len(), 3);
        assert!(read_points(&dir.path().join("missing.csv")).is_err());
    }
}
