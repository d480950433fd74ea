use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Remote service rejected the request: {0}")]
    Rejected(String),

    #[error("Task execution not found or not running")]
    NotRunning,

    #[error("Task queue is closed")]
    QueueClosed,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Http(err.to_string())
    }
}
