//! Error types for gpsraster

use thiserror::Error;

/// Main error type for gpsraster operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Insufficient points: {found} usable point(s), at least {required} required")]
    InsufficientPoints { found: usize, required: usize },

    #[error("Invalid GPS point #{index}: latitude {latitude}, longitude {longitude} out of range")]
    InvalidGeoPoint {
        index: usize,
        latitude: f64,
        longitude: f64,
    },

    #[error("Degenerate point set: {0}")]
    DegeneratePointSet(String),

    #[error("Projection error: {0}")]
    Projection(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    Encode(String),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

/// Failure categories reported to callers of the pipeline.
///
/// Several [`Error`] variants collapse onto one kind: anything that prevents
/// the image or sidecar from being written is an [`ErrorKind::IoFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InsufficientPoints,
    InvalidGeoPoint,
    DegeneratePointSet,
    Projection,
    IoFailure,
    InvalidParameter,
    Internal,
}

impl Error {
    /// Failure category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InsufficientPoints { .. } => ErrorKind::InsufficientPoints,
            Error::InvalidGeoPoint { .. } => ErrorKind::InvalidGeoPoint,
            Error::DegeneratePointSet(_) => ErrorKind::DegeneratePointSet,
            Error::Projection(_) => ErrorKind::Projection,
            Error::Io(_) | Error::Encode(_) | Error::InvalidDimensions { .. } => {
                ErrorKind::IoFailure
            }
            Error::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            Error::Other(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn encode(e: impl std::fmt::Display) -> Self {
        Error::Encode(e.to_string())
    }
}

impl From<tiff::TiffError> for Error {
    fn from(e: tiff::TiffError) -> Self {
        match e {
            tiff::TiffError::IoError(io) => Error::Io(io),
            other => Error::encode(other),
        }
    }
}

/// Result type alias for gpsraster operations
pub type Result<T> = std::result::Result<T, Error>;
