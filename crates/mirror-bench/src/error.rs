use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid site config: {0}")]
    InvalidSiteConfig(String),
    #[error("a measurement run is already in progress")]
    RunInProgress,
}

pub type BenchResult<T> = Result<T, BenchError>;
