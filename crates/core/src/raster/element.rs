//! Raster element trait for generic cell values

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// Elevation samples are kept as `f64`; quantized pixels as `u8`/`u16`.
pub trait RasterElement:
    Copy + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Largest value representable by this type, as `f64`
    fn max_f64() -> f64;

    /// Convert self to f64 (NaN when not representable)
    fn to_f64(self) -> f64 {
        <f64 as NumCast>::from(self).unwrap_or(f64::NAN)
    }
}

macro_rules! impl_raster_element {
    ($t:ty) => {
        impl RasterElement for $t {
            fn max_f64() -> f64 {
                <$t>::MAX as f64
            }
        }
    };
}

impl_raster_element!(u8);
impl_raster_element!(u16);
impl_raster_element!(f32);
impl_raster_element!(f64);
