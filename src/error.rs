//! Error types for the cutout pipeline

use thiserror::Error;

/// Result alias used by every pipeline stage
pub type Result<T> = std::result::Result<T, CutoutError>;

#[derive(Error, Debug)]
pub enum CutoutError {
    /// Upload rejected before decoding (wrong extension or container)
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Uploaded bytes are not a usable image
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Rectangle is empty or does not fit the image
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    /// The iterative solver could not run on this input
    #[error("Segmentation failed: {0}")]
    Segmentation(String),

    #[error("Mask is {mask_width}x{mask_height} but image is {image_width}x{image_height}")]
    ShapeMismatch {
        mask_width: u32,
        mask_height: u32,
        image_width: u32,
        image_height: u32,
    },

    /// Action requested in a session state that does not allow it
    #[error("Session not ready: {0}")]
    NotReady(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Model error: {0}")]
    Model(String),

    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),
}

impl CutoutError {
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    pub fn invalid_region<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRegion(msg.into())
    }

    pub fn segmentation<S: Into<String>>(msg: S) -> Self {
        Self::Segmentation(msg.into())
    }

    pub fn not_ready<S: Into<String>>(msg: S) -> Self {
        Self::NotReady(msg.into())
    }

    /// Region errors keep the selector waiting instead of surfacing to the user
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::InvalidRegion(_))
    }
}
