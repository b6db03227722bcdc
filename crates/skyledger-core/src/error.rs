use std::path::PathBuf;

use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data root does not exist: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid unit identifier: {0}")]
    InvalidUnit(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid FITS header in {}: {reason}", .path.display())]
    FitsHeader { path: PathBuf, reason: String },

    #[error("Tile catalog line {line}: {reason}")]
    Catalog { line: usize, reason: String },

    #[error("Worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
