//! Error types for every pipeline stage.
//!
//! Only [`DocumentError`] is fatal. Page, chunk and match failures are
//! recovered inside their stage and surface as empty results.

use std::time::Duration;

use thiserror::Error;

/// The source document could not be read at all.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Document is empty")]
    Empty,

    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Corrupt or unreadable document: {0}")]
    Unreadable(String),

    #[error("Document reader task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One page's OCR pass failed.
#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR engine timed out after {0:?}")]
    Timeout(Duration),

    #[error("OCR engine failed: {0}")]
    Engine(String),

    #[error("Unparsable OCR output: {0}")]
    Parse(String),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One language-model request failed.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Language model request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Language model authentication failed")]
    Auth,

    #[error("Language model rate limited")]
    RateLimited,

    #[error("Language model returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid language model response: {0}")]
    InvalidResponse(String),

    #[error("API key not configured (set {0})")]
    MissingApiKey(String),
}

/// Configuration file problems.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid TOML in {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// The whole request failed. Only an unreadable source document gets here.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Document(#[from] DocumentError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
