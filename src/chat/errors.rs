//! Error types for the chat backend

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("API request failed: {0}")]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type BackendResult<T> = Result<T, BackendError>;
