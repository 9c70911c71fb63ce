//! Quantized single-band pixel grids

use crate::error::{Error, Result};
use crate::raster::Raster;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bits per pixel of the output image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BitDepth {
    Eight,
    #[default]
    Sixteen,
}

impl BitDepth {
    pub fn bits(self) -> u16 {
        match self {
            BitDepth::Eight => 8,
            BitDepth::Sixteen => 16,
        }
    }

    /// Largest pixel value; the highest sampled elevation maps onto it
    pub fn scale_max(self) -> u16 {
        match self {
            BitDepth::Eight => u8::MAX as u16,
            BitDepth::Sixteen => u16::MAX,
        }
    }

    pub fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            8 => Some(BitDepth::Eight),
            16 => Some(BitDepth::Sixteen),
            _ => None,
        }
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

impl FromStr for BitDepth {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_end_matches("-bit").trim_end_matches("bit");
        trimmed
            .parse::<u16>()
            .ok()
            .and_then(BitDepth::from_bits)
            .ok_or_else(|| Error::InvalidParameter {
                name: "bit_depth",
                value: s.to_string(),
                reason: "expected 8 or 16".into(),
            })
    }
}

/// Quantized elevation raster ready for encoding.
///
/// Values are stored as `u16` regardless of bit depth; every value is at most
/// `bit_depth.scale_max()`. The elevation range the quantization was derived
/// from is kept so pixel values can be mapped back to metres.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelGrid {
    pixels: Raster<u16>,
    bit_depth: BitDepth,
    elevation_min: f64,
    elevation_max: f64,
}

impl PixelGrid {
    pub fn new(
        pixels: Raster<u16>,
        bit_depth: BitDepth,
        elevation_min: f64,
        elevation_max: f64,
    ) -> Result<Self> {
        let limit = bit_depth.scale_max();
        if let Some(&bad) = pixels.data().iter().find(|&&v| v > limit) {
            return Err(Error::InvalidParameter {
                name: "pixels",
                value: bad.to_string(),
                reason: format!("exceeds {bit_depth} range"),
            });
        }
        if !(elevation_min.is_finite() && elevation_max.is_finite())
            || elevation_max < elevation_min
        {
            return Err(Error::InvalidParameter {
                name: "elevation_range",
                value: format!("[{elevation_min}, {elevation_max}]"),
                reason: "must be a finite, ordered interval".into(),
            });
        }
        Ok(Self {
            pixels,
            bit_depth,
            elevation_min,
            elevation_max,
        })
    }

    pub fn width(&self) -> usize {
        self.pixels.cols()
    }

    pub fn height(&self) -> usize {
        self.pixels.rows()
    }

    pub fn bit_depth(&self) -> BitDepth {
        self.bit_depth
    }

    pub fn pixels(&self) -> &Raster<u16> {
        &self.pixels
    }

    pub fn elevation_min(&self) -> f64 {
        self.elevation_min
    }

    pub fn elevation_max(&self) -> f64 {
        self.elevation_max
    }

    /// Elevation of pixel value 0
    pub fn offset(&self) -> f64 {
        self.elevation_min
    }

    /// Metres per pixel-value step
    pub fn scale(&self) -> f64 {
        (self.elevation_max - self.elevation_min) / self.bit_depth.scale_max() as f64
    }

    /// Elevation represented by a pixel value
    pub fn to_elevation(&self, value: u16) -> f64 {
        self.offset() + value as f64 * self.scale()
    }

    /// Row-major values narrowed to 8 bits; `None` for 16-bit grids
    pub fn to_u8_vec(&self) -> Option<Vec<u8>> {
        match self.bit_depth {
            BitDepth::Eight => Some(self.pixels.data().iter().map(|&v| v as u8).collect()),
            BitDepth::Sixteen => None,
        }
    }
}
