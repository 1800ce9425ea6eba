//! Error types for the prediction core

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AircastError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Model artifact not found: {0}")]
    ArtifactNotFound(PathBuf),

    #[error("Model not loaded: {0}")]
    ModelNotLoaded(String),

    #[error("Explanation unavailable: {0}")]
    ExplanationUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AircastError>;
