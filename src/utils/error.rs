// src/utils/error.rs
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode), // e.g., 401 bad key, 429 quota

    #[error("Failed to parse search response: {0}")]
    Parse(String),
}

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("TLS handshake failed: {0}")]
    Tls(String),

    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("PDF parsing error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Extraction task failed: {0}")]
    Task(String),
}

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("LLM API error {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("No content in LLM response")]
    EmptyResponse,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Search failed: {0}")]
    Search(#[from] SearchError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Download client setup failed: {0}")]
    Download(#[from] DownloadError),

    #[error("LLM client setup failed: {0}")]
    Llm(#[from] LlmError),
}
