use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StowError {
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("node not found: {0}")]
    NodeNotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("corrupt graph cache file {}: {reason}", .file.display())]
    Corrupt { file: PathBuf, reason: String },
    #[error("provider did not create {}", .0.display())]
    NotCreated(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StowError {
    pub fn not_a_directory<P: Into<PathBuf>>(path: P) -> Self {
        StowError::NotADirectory(path.into())
    }

    pub fn node_not_found<T: Into<String>>(msg: T) -> Self {
        StowError::NodeNotFound(msg.into())
    }

    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        StowError::InvalidInput(msg.into())
    }

    pub fn corrupt<P: Into<PathBuf>, T: Into<String>>(file: P, reason: T) -> Self {
        StowError::Corrupt {
            file: file.into(),
            reason: reason.into(),
        }
    }
}

pub type StowResult<T> = Result<T, StowError>;
