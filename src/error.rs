#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("token must not be empty")]
    EmptyToken,

    #[error("unauthorized")]
    Unauthorized,

    #[error("unsupported media type")]
    UnsupportedMediaType,

    #[error("server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid json: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;
