use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Object {0} {1} R is not an image XObject")]
    NotAnImage(u32, u16),

    #[error("Stream decode error: {0}")]
    Decode(String),

    #[error("Unsupported image: {0}")]
    Unsupported(String),

    #[error("PNG encoding error: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Failed to start worker process {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker process exited before answering task {0}")]
    WorkerExited(String),

    #[error("Worker protocol error: {0}")]
    Protocol(#[from] serde_json::Error),

    #[error("Extraction of image {stem} failed: {message}")]
    Worker { stem: String, message: String },

    #[error("Only {completed} of {total} images were extracted")]
    Incomplete { completed: usize, total: usize },
}

pub type Result<T> = std::result::Result<T, ExtractError>;
