use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FarolError>;

#[derive(Debug, Error)]
pub enum FarolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("{0} disconnected")]
    Disconnected(&'static str),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("worker thread panicked")]
    WorkerPanicked,
}
