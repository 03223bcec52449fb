//! Error types for all FlintKV operations.

use std::io;
use thiserror::Error;

/// Top-level error type for FlintKV operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("corrupted page: {0}")]
    CorruptedPage(String),
}

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("key exceeds maximum size of {max} bytes (got {actual})")]
    KeyTooLarge { max: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
