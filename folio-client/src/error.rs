use thiserror::Error;

/// Main client error type
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{0}")]
    Backend(#[from] BackendError),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Backend call errors
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Connection failed to backend at {url}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request failed (status {status}): {message}")]
    Request { status: u16, message: String },

    #[error("Invalid response from backend")]
    InvalidResponse {
        #[source]
        source: reqwest::Error,
    },
}

/// Upload validation errors, raised before any network call is made
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Only PDF files are allowed: {filename}")]
    UnsupportedFormat { filename: String },

    #[error("File too large: {size} bytes (max {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Failed to read {path}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;
