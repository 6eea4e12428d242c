//! Error types for fieldcheck core

use thiserror::Error;

/// Main error type for core operations
#[derive(Error, Debug)]
pub enum Error {
    /// The raw polygon text could not be decoded as nested arrays.
    #[error("invalid geometry encoding: {0}")]
    InvalidGeometryEncoding(String),

    /// The polygon decoded but does not describe a usable ring.
    #[error("invalid geometry shape: {0}")]
    InvalidGeometryShape(String),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the error was caused by malformed client input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidGeometryEncoding(_) | Error::InvalidGeometryShape(_)
        )
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;
