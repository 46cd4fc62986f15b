#[derive(thiserror::Error, Debug)]
pub enum RelayError {
    #[error("telegram bot token and channel id are required")]
    ConfigMissing,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("telegram api error: {0}")]
    RemoteApi(String),

    #[error("network error: {0}")]
    Network(reqwest::Error),

    #[error("video not found: {0}")]
    NotFound(String),

    #[error("video with this id already exists: {0}")]
    AlreadyExists(String),

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Persistence(format!("json: {err}"))
    }
}

pub type RelayResult<T> = Result<T, RelayError>;
