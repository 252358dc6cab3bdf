//! One-shot background removal with a pretrained matting model.

use crate::input::Upload;
use crate::output::{apply_matte, Download};
use crate::segmentation::{Matte, SegmentationModel};
use anyhow::{Context, Result};
use image::{DynamicImage, RgbaImage};
use std::time::Instant;

pub struct RemovalResult {
    pub matte: Matte,
    pub image: RgbaImage,
    pub download: Download,
}

/// Decode an upload, run the model once and cut out the foreground
///
/// The image keeps its original size; transparency comes from the matte.
pub fn remove_background(
    model: &mut dyn SegmentationModel,
    upload: &Upload,
) -> Result<RemovalResult> {
    let image = upload.decode().context("Failed to load upload")?;

    let start = Instant::now();
    let matte = model
        .segment(&image)
        .context("Failed to segment image")?;
    tracing::info!(
        "Model {:?} segmented {}x{} in {:.1}ms",
        model.input_size(),
        image.width(),
        image.height(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    let cutout = apply_matte(&image, &matte)?;
    let download = Download::png(&DynamicImage::ImageRgba8(cutout.clone()))?;

    Ok(RemovalResult {
        matte,
        image: cutout,
        download,
    })
}
