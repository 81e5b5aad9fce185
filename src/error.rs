//! Error types for the off-screen host view

use thiserror::Error;

/// Result type alias for surface operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving an off-screen surface
#[derive(Error, Debug)]
pub enum Error {
    /// A resize was requested with a zero dimension or non-positive scale
    #[error("Invalid size {width}x{height} @ {scale_factor}")]
    InvalidSize {
        width: u32,
        height: u32,
        scale_factor: f32,
    },

    /// Pixel data handed to `on_paint` does not cover the painted region
    #[error("Invalid paint: {0}")]
    InvalidPaint(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// No render target is attached yet
    #[error("No render target attached")]
    NotAttached,

    /// The render target refused an input event
    #[error("Input dispatch failed: {0}")]
    Input(String),

    /// Unknown overlay or mismatched overlay bitmap
    #[error("Overlay error: {0}")]
    Overlay(String),

    /// Failed to encode a frame snapshot
    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Encode(err.to_string())
    }
}
