use crate::error::{CutoutError, Result};
use crate::segmentation::Mask;
use image::{Rgb, RgbImage, Rgba, RgbaImage};

fn check_shape(image: &RgbImage, mask: &Mask) -> Result<()> {
    let (image_width, image_height) = image.dimensions();
    let (mask_width, mask_height) = mask.dimensions();
    if (image_width, image_height) != (mask_width, mask_height) {
        return Err(CutoutError::ShapeMismatch {
            mask_width,
            mask_height,
            image_width,
            image_height,
        });
    }
    Ok(())
}

/// Zero every background pixel; foreground passes through untouched
pub fn composite(image: &RgbImage, mask: &Mask) -> Result<RgbImage> {
    check_shape(image, mask)?;
    let _span = tracing::debug_span!("composite").entered();

    Ok(RgbImage::from_fn(image.width(), image.height(), |x, y| {
        if mask.is_foreground(x, y) {
            *image.get_pixel(x, y)
        } else {
            Rgb([0, 0, 0])
        }
    }))
}

/// Like [`composite`] but background becomes fully transparent
pub fn composite_transparent(image: &RgbImage, mask: &Mask) -> Result<RgbaImage> {
    check_shape(image, mask)?;
    let _span = tracing::debug_span!("composite").entered();

    Ok(RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        if mask.is_foreground(x, y) {
            let [r, g, b] = image.get_pixel(x, y).0;
            Rgba([r, g, b, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    }))
}

/// Use a soft matte as the alpha channel
///
/// Pixels whose alpha rounds to zero are cleared completely.
pub fn apply_matte(image: &RgbImage, matte: &[f32]) -> Result<RgbaImage> {
    let (width, height) = image.dimensions();
    if matte.len() != width as usize * height as usize {
        return Err(CutoutError::Model(format!(
            "matte has {} values for a {}x{} image",
            matte.len(),
            width,
            height
        )));
    }

    Ok(RgbaImage::from_fn(width, height, |x, y| {
        let idx = (y * width + x) as usize;
        let alpha = (matte[idx] * 255.0).round().clamp(0.0, 255.0) as u8;
        if alpha > 0 {
            let [r, g, b] = image.get_pixel(x, y).0;
            Rgba([r, g, b, alpha])
        } else {
            Rgba([0, 0, 0, 0])
        }
    }))
}
