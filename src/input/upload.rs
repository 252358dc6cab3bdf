use crate::error::{CutoutError, Result};
use image::{ImageFormat, RgbImage};
use std::path::Path;

/// File extensions the upload widget lets through
pub const ACCEPTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Raw bytes handed over by the upload surface
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new<S: Into<String>>(file_name: S, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read an upload from disk, keeping only the file name
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        tracing::debug!("Read {} bytes from {}", bytes.len(), path.display());

        Ok(Self::new(file_name, bytes))
    }

    /// Reject names the upload widget would not accept
    pub fn check_extension(&self) -> Result<()> {
        let extension = Path::new(&self.file_name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase());

        match extension {
            Some(ext) if ACCEPTED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
            _ => Err(CutoutError::UnsupportedFormat(format!(
                "{} (expected one of: {})",
                self.file_name,
                ACCEPTED_EXTENSIONS.join(", ")
            ))),
        }
    }

    pub fn decode(&self) -> Result<RgbImage> {
        self.check_extension()?;
        decode_image(&self.bytes)
    }
}

/// Decode PNG or JPEG bytes into an RGB pixel grid
///
/// Alpha and grayscale layouts are flattened to three channels.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage> {
    let _span = tracing::debug_span!("decode").entered();

    let format = image::guess_format(bytes)
        .map_err(|e| CutoutError::decode(format!("unrecognised image data: {e}")))?;

    if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
        return Err(CutoutError::UnsupportedFormat(format!("{format:?}")));
    }

    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| CutoutError::decode(e.to_string()))?;

    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(CutoutError::decode("image has zero area"));
    }

    tracing::debug!(
        "Decoded {:?} image {}x{}",
        format,
        decoded.width(),
        decoded.height()
    );

    Ok(decoded.to_rgb8())
}
