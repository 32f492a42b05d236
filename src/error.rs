use thiserror::Error;

/// Error returned by every API operation, real or mock.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered 401. The session has already been torn down and
    /// the login view requested, so callers should not report this as a fault.
    #[error("Session expired")]
    SessionExpired,

    /// The server (or mock) rejected the operation with this message.
    #[error("{0}")]
    Api(String),

    /// The body was not the JSON envelope every endpoint must return.
    #[error("Invalid response format")]
    InvalidResponse,

    /// The envelope payload did not match the expected type.
    #[error("Unexpected response payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    pub fn api(message: impl Into<String>) -> Self {
        ApiError::Api(message.into())
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
    }
}

/// Failure reading or writing durable client storage.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt storage file: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ApiError>;
