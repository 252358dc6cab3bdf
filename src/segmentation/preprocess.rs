use anyhow::{ensure, Result};
use image::{imageops, RgbImage};
use ndarray::Array4;

/// ImageNet channel means used by u2net-family models
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet channel standard deviations used by u2net-family models
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Preprocessor for converting RGB images to model input tensors
pub struct Preprocessor {
    target_width: u32,
    target_height: u32,
    mean: [f32; 3],
    std: [f32; 3],
}

impl Preprocessor {
    pub fn new(target_width: u32, target_height: u32) -> Self {
        Self {
            target_width,
            target_height,
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
        }
    }

    /// Preprocess an RGB image into a normalized NCHW tensor
    ///
    /// Steps:
    /// 1. Resize to target dimensions
    /// 2. Scale to [0, 1] and standardize each channel with mean/std
    /// 3. Transpose from HWC to NCHW format
    ///
    /// Returns: Array4<f32> with shape [1, 3, height, width]
    pub fn preprocess(&self, image: &RgbImage) -> Result<Array4<f32>> {
        let _span = tracing::debug_span!("preprocess").entered();

        let resized = if image.dimensions() != (self.target_width, self.target_height) {
            imageops::resize(
                image,
                self.target_width,
                self.target_height,
                imageops::FilterType::Lanczos3,
            )
        } else {
            image.clone()
        };

        let (width, height) = resized.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                let value = f32::from(pixel[c]) / 255.0;
                tensor[[0, c, y as usize, x as usize]] = (value - self.mean[c]) / self.std[c];
            }
        }

        Ok(tensor)
    }

    /// Turn a raw saliency map into a matte at the original image size
    ///
    /// The map is min-max normalized to [0, 1] before resizing, since
    /// saliency models do not emit calibrated probabilities.
    ///
    /// Returns: Resized matte flattened in row-major order
    pub fn postprocess_matte(
        raw: &[f32],
        matte_width: u32,
        matte_height: u32,
        target_width: u32,
        target_height: u32,
    ) -> Result<Vec<f32>> {
        let _span = tracing::debug_span!("postprocess").entered();

        ensure!(
            raw.len() == matte_width as usize * matte_height as usize,
            "matte has {} values, expected {}x{}",
            raw.len(),
            matte_width,
            matte_height
        );

        let (lo, hi) = raw
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let range = hi - lo;
        let normalized: Vec<f32> = if range > f32::EPSILON {
            raw.iter().map(|&v| (v - lo) / range).collect()
        } else {
            raw.iter().map(|&v| v.clamp(0.0, 1.0)).collect()
        };

        if matte_width == target_width && matte_height == target_height {
            return Ok(normalized);
        }

        let gray_image = image::GrayImage::from_fn(matte_width, matte_height, |x, y| {
            let idx = (y * matte_width + x) as usize;
            let value = (normalized[idx] * 255.0).round().clamp(0.0, 255.0) as u8;
            image::Luma([value])
        });

        let resized = imageops::resize(
            &gray_image,
            target_width,
            target_height,
            imageops::FilterType::Lanczos3,
        );

        Ok(resized.pixels().map(|p| f32::from(p[0]) / 255.0).collect())
    }

    /// Convert matte to grayscale RGB image for visualization
    pub fn matte_to_rgb(matte: &[f32], width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let idx = (y * width + x) as usize;
            let value = (matte[idx] * 255.0).clamp(0.0, 255.0) as u8;
            image::Rgb([value, value, value])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn preprocess_produces_standardized_nchw() {
        let image = RgbImage::from_pixel(8, 4, Rgb([255, 0, 128]));
        let tensor = Preprocessor::new(8, 4).preprocess(&image).unwrap();

        assert_eq!(tensor.shape(), &[1, 3, 4, 8]);
        let red = (1.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0];
        let green = (0.0 - IMAGENET_MEAN[1]) / IMAGENET_STD[1];
        assert!((tensor[[0, 0, 2, 5]] - red).abs() < 1e-5);
        assert!((tensor[[0, 1, 0, 0]] - green).abs() < 1e-5);
    }

    #[test]
    fn preprocess_resizes_to_model_input() {
        let image = RgbImage::new(30, 10);
        let tensor = Preprocessor::new(16, 16).preprocess(&image).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 16, 16]);
    }

    #[test]
    fn postprocess_normalizes_range() {
        let raw = [2.0, 4.0, 6.0, 10.0];
        let matte = Preprocessor::postprocess_matte(&raw, 2, 2, 2, 2).unwrap();
        assert_eq!(matte, vec![0.0, 0.25, 0.5, 1.0]);
    }

    #[test]
    fn postprocess_resizes_to_image() {
        let raw = vec![0.5; 16];
        let matte = Preprocessor::postprocess_matte(&raw, 4, 4, 10, 6).unwrap();
        assert_eq!(matte.len(), 60);
    }

    #[test]
    fn postprocess_rejects_wrong_length() {
        assert!(Preprocessor::postprocess_matte(&[0.0; 3], 2, 2, 2, 2).is_err());
    }

    #[test]
    fn matte_renders_as_gray() {
        let rgb = Preprocessor::matte_to_rgb(&[0.0, 1.0], 2, 1);
        assert_eq!(rgb.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(rgb.get_pixel(1, 0).0, [255, 255, 255]);
    }
}
