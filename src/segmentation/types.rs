use anyhow::Result;
use image::RgbImage;

/// Per-pixel foreground opacity in `0.0..=1.0`, row-major, same size as the image
pub type Matte = Vec<f32>;

/// A pretrained model that mattes a whole image in one call
///
/// Implemented by [`super::OnnxMatting`]; tests plug in fixed-output models.
pub trait SegmentationModel {
    /// Matte `image` at its own resolution
    fn segment(&mut self, image: &RgbImage) -> Result<Matte>;

    /// Square side (width, height) the network runs at
    fn input_size(&self) -> (u32, u32);
}
