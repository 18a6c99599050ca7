/// Error types for the FABLE core library
use thiserror::Error;

/// Main error type for FABLE data loading and fetching
#[derive(Error, Debug)]
pub enum FableError {
    /// HTTP request failed
    #[cfg(feature = "api")]
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Forecast provider answered, but not with usable data
    #[error("Failed to parse provider response: {0}")]
    ResponseParse(String),

    /// Failed to parse CSV data
    #[error("Failed to parse CSV: {0}")]
    CsvParse(#[from] csv::Error),

    /// Failed to parse or serialize JSON data
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Timestamp parsing failed
    #[error("Failed to parse timestamp: {0}")]
    TimeParse(String),

    /// Time axis is not strictly increasing
    #[error("Time axis not strictly increasing at index {index}")]
    NonIncreasingTime { index: usize },

    /// A model or wave array does not match the time axis length
    #[error("Array '{name}' has {found} values, time axis has {expected}")]
    Misaligned {
        name: String,
        expected: usize,
        found: usize,
    },

    /// Invalid site definition
    #[error("Invalid site definition: {0}")]
    InvalidSite(String),

    /// Invalid onshore sector definition
    #[error("Invalid onshore sector: {0}")]
    InvalidSector(String),

    /// Weather model name not recognized
    #[error("Unknown model '{0}' (valid: ecmwf_ifs04, icon_seamless, gfs_seamless; aliases: default, fast, robust)")]
    UnknownModel(String),
}

/// Type alias for Results using FableError
pub type Result<T> = std::result::Result<T, FableError>;
