//! Error types for senvec.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Model not loaded: {0}")]
    ModelUnavailable(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Search index '{0}' does not exist")]
    IndexNotFound(String),

    #[error("Timed out after {0} ms")]
    Timeout(u64),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
