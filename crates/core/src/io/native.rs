//! Native GeoTIFF reading/writing of quantized pixel grids
//!
//! Uses the `tiff` crate. Images are single-band grayscale (8 or 16 bit),
//! stored row-major with the northern row first. Georeferencing is carried
//! as GeoTIFF tiepoints (one per control point) in WGS84, and the
//! pixel-to-elevation mapping as a `GDAL_METADATA` offset/scale pair.

use crate::error::{Error, Result};
use crate::io::ControlPoint;
use crate::raster::{BitDepth, PixelGrid, Raster};
use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{Gray16, Gray8};
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKindStandard};
use tiff::tags::Tag;
use tiff::ColorType;
use tracing::debug;

const MODEL_TIEPOINT_TAG: u16 = 33922;
const GEO_KEY_DIRECTORY_TAG: u16 = 34735;
const GDAL_METADATA_TAG: u16 = 42112;

/// Options for writing GeoTIFF files
#[derive(Debug, Clone, Default)]
pub struct GeoTiffOptions {
    /// Control points embedded as GeoTIFF tiepoints; none when empty
    pub tiepoints: Vec<ControlPoint>,
}

/// Contents of a decoded image
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub pixels: Raster<u16>,
    pub bit_depth: BitDepth,
    pub tiepoints: Vec<ControlPoint>,
    /// Elevation of pixel value 0, when recorded
    pub offset: Option<f64>,
    /// Metres per pixel-value step, when recorded
    pub scale: Option<f64>,
}

impl DecodedImage {
    /// Rebuild the pixel grid, recovering its elevation range from the
    /// recorded offset/scale (or the raw value range when absent)
    pub fn into_pixel_grid(self) -> Result<PixelGrid> {
        let scale_max = self.bit_depth.scale_max() as f64;
        let (min, max) = match (self.offset, self.scale) {
            (Some(offset), Some(scale)) => (offset, offset + scale * scale_max),
            _ => (0.0, scale_max),
        };
        PixelGrid::new(self.pixels, self.bit_depth, min, max)
    }
}

/// Write a pixel grid to a GeoTIFF file
pub fn write_geotiff<P: AsRef<Path>>(
    grid: &PixelGrid,
    path: P,
    options: &GeoTiffOptions,
) -> Result<()> {
    check_dimensions(grid)?;
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    encode_geotiff(grid, &mut writer, options)?;
    writer.flush()?;
    debug!(
        path = %path.as_ref().display(),
        width = grid.width(),
        height = grid.height(),
        tiepoints = options.tiepoints.len(),
        "wrote GeoTIFF"
    );
    Ok(())
}

/// Encode a pixel grid into an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer(grid: &PixelGrid, options: &GeoTiffOptions) -> Result<Vec<u8>> {
    check_dimensions(grid)?;
    let mut buf = Vec::new();
    encode_geotiff(grid, Cursor::new(&mut buf), options)?;
    Ok(buf)
}

/// Read a GeoTIFF written by [`write_geotiff`] (or any 8/16-bit grayscale TIFF)
pub fn read_geotiff<P: AsRef<Path>>(path: P) -> Result<DecodedImage> {
    let file = File::open(path.as_ref())?;
    decode_geotiff(file)
}

/// Read a GeoTIFF from an in-memory buffer
pub fn read_geotiff_from_buffer(data: &[u8]) -> Result<DecodedImage> {
    decode_geotiff(Cursor::new(data))
}

fn check_dimensions(grid: &PixelGrid) -> Result<()> {
    let (width, height) = (grid.width(), grid.height());
    if width == 0 || height == 0 || u32::try_from(width).is_err() || u32::try_from(height).is_err()
    {
        return Err(Error::InvalidDimensions { width, height });
    }
    Ok(())
}

/// Internal: encode into any `Write + Seek` sink
fn encode_geotiff<W: Write + Seek>(
    grid: &PixelGrid,
    writer: W,
    options: &GeoTiffOptions,
) -> Result<()> {
    let mut encoder = TiffEncoder::new(writer)?;
    let (cols, rows) = (grid.width() as u32, grid.height() as u32);

    match grid.bit_depth() {
        BitDepth::Eight => {
            let data = grid.to_u8_vec().unwrap_or_default();
            let mut image = encoder.new_image::<Gray8>(cols, rows)?;
            write_geo_tags(image.encoder(), grid, options)?;
            image.write_data(&data)?;
        }
        BitDepth::Sixteen => {
            let data = grid.pixels().to_row_major_vec();
            let mut image = encoder.new_image::<Gray16>(cols, rows)?;
            write_geo_tags(image.encoder(), grid, options)?;
            image.write_data(&data)?;
        }
    }

    Ok(())
}

fn write_geo_tags<W: Write + Seek>(
    dir: &mut DirectoryEncoder<'_, W, TiffKindStandard>,
    grid: &PixelGrid,
    options: &GeoTiffOptions,
) -> Result<()> {
    if !options.tiepoints.is_empty() {
        // ModelTiepointTag: (I, J, K, X, Y, Z) per control point
        let tiepoints: Vec<f64> = options
            .tiepoints
            .iter()
            .flat_map(|cp| [cp.pixel_x, cp.pixel_y, 0.0, cp.longitude, cp.latitude, 0.0])
            .collect();
        dir.write_tag(Tag::Unknown(MODEL_TIEPOINT_TAG), tiepoints.as_slice())?;

        // GTModelTypeGeoKey = Geographic, GTRasterTypeGeoKey = PixelIsArea,
        // GeographicTypeGeoKey = EPSG:4326
        let geokeys: Vec<u16> = vec![
            1, 1, 0, 3, //
            1024, 0, 1, 2, //
            1025, 0, 1, 1, //
            2048, 0, 1, 4326,
        ];
        dir.write_tag(Tag::Unknown(GEO_KEY_DIRECTORY_TAG), geokeys.as_slice())?;
    }

    let metadata = format!(
        "<GDALMetadata>\
         <Item name=\"OFFSET\" sample=\"0\" role=\"offset\">{:.12}</Item>\
         <Item name=\"SCALE\" sample=\"0\" role=\"scale\">{:.12e}</Item>\
         </GDALMetadata>",
        grid.offset(),
        grid.scale()
    );
    dir.write_tag(Tag::Unknown(GDAL_METADATA_TAG), metadata.as_str())?;

    Ok(())
}

/// Internal: decode from any `Read + Seek` source
fn decode_geotiff<R: Read + Seek>(reader: R) -> Result<DecodedImage> {
    let mut decoder = Decoder::new(reader)?;
    let (width, height) = decoder.dimensions()?;
    let (rows, cols) = (height as usize, width as usize);

    let bit_depth = match decoder.colortype()? {
        ColorType::Gray(8) => BitDepth::Eight,
        ColorType::Gray(16) => BitDepth::Sixteen,
        other => {
            return Err(Error::Encode(format!(
                "unsupported pixel format {other:?}, expected 8/16-bit grayscale"
            )))
        }
    };

    let data: Vec<u16> = match decoder.read_image()? {
        DecodingResult::U8(buf) => buf.into_iter().map(u16::from).collect(),
        DecodingResult::U16(buf) => buf,
        _ => return Err(Error::Encode("unsupported sample format".into())),
    };
    let pixels = Raster::from_vec(data, rows, cols)?;

    let tiepoints = match decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_TIEPOINT_TAG)) {
        Ok(values) => values
            .chunks_exact(6)
            .map(|t| ControlPoint::new(t[0], t[1], t[3], t[4]))
            .collect(),
        Err(_) => Vec::new(),
    };

    let metadata = decoder
        .get_tag_ascii_string(Tag::Unknown(GDAL_METADATA_TAG))
        .ok();
    let offset = metadata.as_deref().and_then(|m| metadata_item(m, "OFFSET"));
    let scale = metadata.as_deref().and_then(|m| metadata_item(m, "SCALE"));
    debug!(width, height, %bit_depth, tiepoints = tiepoints.len(), "decoded GeoTIFF");

    Ok(DecodedImage {
        pixels,
        bit_depth,
        tiepoints,
        offset,
        scale,
    })
}

/// Extract a numeric `<Item name="...">value</Item>` from GDAL metadata XML
fn metadata_item(xml: &str, name: &str) -> Option<f64> {
    let start = xml.find(&format!("<Item name=\"{name}\""))?;
    let rest = &xml[start..];
    let open_end = rest.find('>')? + 1;
    let close = rest.find("</Item>")?;
    rest.get(open_end..close)?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn gradient(bit_depth: BitDepth) -> PixelGrid {
        let max = bit_depth.scale_max() as usize;
        let data: Vec<u16> = (0..12).map(|i| (i * max / 11) as u16).collect();
        let raster = Raster::from_vec(data, 3, 4).unwrap();
        PixelGrid::new(raster, bit_depth, 95.0, 105.0).unwrap()
    }

    fn corners() -> Vec<ControlPoint> {
        vec![
            ControlPoint::new(0.0, 0.0, 21.011, 52.2307),
            ControlPoint::new(4.0, 0.0, 21.0135, 52.2307),
            ControlPoint::new(0.0, 3.0, 21.011, 52.2295),
            ControlPoint::new(4.0, 3.0, 21.0135, 52.2295),
        ]
    }

    #[test]
    fn test_roundtrip_16bit_with_tiepoints() {
        let grid = gradient(BitDepth::Sixteen);
        let options = GeoTiffOptions {
            tiepoints: corners(),
        };
        let buf = write_geotiff_to_buffer(&grid, &options).unwrap();
        let decoded = read_geotiff_from_buffer(&buf).unwrap();

        assert_eq!(decoded.bit_depth, BitDepth::Sixteen);
        assert_eq!(decoded.pixels, *grid.pixels());
        assert_eq!(decoded.tiepoints, corners());
        assert_relative_eq!(decoded.offset.unwrap(), 95.0, epsilon = 1e-9);
        assert_relative_eq!(decoded.scale.unwrap(), grid.scale(), max_relative = 1e-9);

        let back = decoded.into_pixel_grid().unwrap();
        assert_relative_eq!(back.elevation_max(), 105.0, epsilon = 1e-6);
    }

    #[test]
    fn test_roundtrip_8bit_file() {
        let grid = gradient(BitDepth::Eight);
        let tmp = tempfile::NamedTempFile::with_suffix(".tif").unwrap();
        write_geotiff(&grid, tmp.path(), &GeoTiffOptions::default()).unwrap();

        let decoded = read_geotiff(tmp.path()).unwrap();
        assert_eq!(decoded.bit_depth, BitDepth::Eight);
        assert_eq!(decoded.pixels, *grid.pixels());
        assert!(decoded.tiepoints.is_empty());
    }

    #[test]
    fn test_rejects_empty_grid() {
        let grid = PixelGrid::new(Raster::new(0, 5), BitDepth::Sixteen, 0.0, 1.0).unwrap();
        let err = write_geotiff_to_buffer(&grid, &GeoTiffOptions::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidDimensions { width: 5, height: 0 }));
    }

    #[test]
    fn test_unwritable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.tif");
        let err = write_geotiff(&gradient(BitDepth::Eight), &path, &GeoTiffOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_metadata_item() {
        let xml = "<GDALMetadata><Item name=\"OFFSET\" sample=\"0\">12.5</Item>\
                   <Item name=\"SCALE\">2e-3</Item></GDALMetadata>";
        assert_eq!(metadata_item(xml, "OFFSET"), Some(12.5));
        assert_eq!(metadata_item(xml, "SCALE"), Some(0.002));
        assert_eq!(metadata_item(xml, "UNITS"), None);
    }
}
