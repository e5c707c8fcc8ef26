// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 The HieroScribe contributors

//! Error types for HieroScribe

use thiserror::Error;

/// Result type alias for HieroScribe operations
pub type Result<T> = std::result::Result<T, HieroError>;

/// HieroScribe error types
#[derive(Error, Debug)]
pub enum HieroError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Generation service error: {0}")]
    Service(String),

    #[error("History persistence error: {0}")]
    Persistence(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Encoding error: {0}")]
    Encoding(#[from] base64::DecodeError),
}
