/// All errors that can occur while driving a studio session.
#[derive(Debug, thiserror::Error)]
pub enum StudioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid path: {0:?}")]
    InvalidPath(String),

    #[error("Path conflict at {path}: expected a {expected}, found a {found}")]
    PathConflict {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("No API key configured. Set one with `codestudio set-key <key>`.")]
    MissingApiKey,

    #[error("{0}")]
    Remote(String),

    #[error("A generation is already in progress")]
    Busy,

    #[error("{0}")]
    Custom(String),
}

pub type Result<T> = std::result::Result<T, StudioError>;
