use thiserror::Error;

/// A storage operation failed.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[cfg(test)]
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
