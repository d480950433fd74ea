use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("HTTP status {status} fetching {context}")]
    Status { status: u16, context: String },

    #[error("Integrity error: content for {id} hashed to {got}")]
    Integrity { id: String, got: String },

    #[error("No artifact found with id {0}")]
    NotFound(String),

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Storage API error: {0}")]
    Api(String),
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::Http(err.to_string())
    }
}
