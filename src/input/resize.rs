use crate::cv;
use crate::error::Result;
use image::RgbImage;
use opencv::core::{Mat, Size};
use opencv::imgproc;

/// Dimensions after bounding the largest side to `max_dimension`
///
/// Both sides are scaled by the same factor and rounded, never below 1.
pub fn target_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let largest = width.max(height);
    if largest <= max_dimension {
        return (width, height);
    }

    let scale = f64::from(max_dimension) / f64::from(largest);
    let scaled = |side: u32| ((f64::from(side) * scale).round() as u32).max(1);

    (scaled(width), scaled(height))
}

/// Shrink an image so neither side exceeds `max_dimension`
///
/// Uses OpenCV's area interpolation so fine detail is blended instead of
/// aliased. Images already within bounds come back unchanged.
pub fn resize_to_fit(image: &RgbImage, max_dimension: u32) -> Result<RgbImage> {
    let (width, height) = image.dimensions();
    let (target_width, target_height) = target_dimensions(width, height, max_dimension);

    if (target_width, target_height) == (width, height) {
        return Ok(image.clone());
    }

    let _span = tracing::debug_span!("resize").entered();
    tracing::debug!(
        "Resizing {}x{} -> {}x{}",
        width,
        height,
        target_width,
        target_height
    );

    let src = cv::rgb_to_mat(image)?;
    let mut dst = Mat::default();
    imgproc::resize(
        &src,
        &mut dst,
        Size::new(target_width as i32, target_height as i32),
        0.0,
        0.0,
        imgproc::INTER_AREA,
    )?;

    cv::mat_to_rgb(&dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn small_images_are_returned_unchanged() {
        let image = RgbImage::from_fn(300, 200, |x, y| Rgb([x as u8, y as u8, 7]));
        let resized = resize_to_fit(&image, 800).unwrap();
        assert_eq!(resized, image);

        let exact = RgbImage::from_fn(800, 10, |x, _| Rgb([x as u8, 0, 0]));
        assert_eq!(resize_to_fit(&exact, 800).unwrap(), exact);
    }

    #[test]
    fn large_images_are_bounded_with_aspect_ratio() {
        assert_eq!(target_dimensions(1000, 500, 800), (800, 400));
        assert_eq!(target_dimensions(500, 1000, 800), (400, 800));
        assert_eq!(target_dimensions(1920, 1080, 800), (800, 450));
        assert_eq!(target_dimensions(1001, 333, 800), (800, 266));

        let image = RgbImage::new(1000, 500);
        assert_eq!(resize_to_fit(&image, 800).unwrap().dimensions(), (800, 400));
    }

    #[test]
    fn thin_images_keep_at_least_one_pixel() {
        assert_eq!(target_dimensions(5000, 1, 800), (800, 1));
        assert_eq!(target_dimensions(1, 5000, 100), (1, 100));

        let image = RgbImage::from_pixel(5000, 1, Rgb([1, 2, 3]));
        assert_eq!(resize_to_fit(&image, 800).unwrap().dimensions(), (800, 1));
    }

    #[test]
    fn uniform_color_survives_shrinking() {
        let image = RgbImage::from_pixel(999, 555, Rgb([12, 200, 77]));
        let resized = resize_to_fit(&image, 400).unwrap();
        assert!(resized.pixels().all(|p| p.0 == [12, 200, 77]));
    }

    #[test]
    fn halving_averages_blocks() {
        // 2x2 checkerboard cells collapse to their mean
        let image = RgbImage::from_fn(400, 200, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        let resized = resize_to_fit(&image, 200).unwrap();
        assert_eq!(resized.dimensions(), (200, 100));
        assert!(resized.pixels().all(|p| p.0 == [128, 128, 128]));
    }

    #[test]
    fn channels_are_not_swapped() {
        let image = RgbImage::from_pixel(40, 20, Rgb([250, 10, 0]));
        let resized = resize_to_fit(&image, 10).unwrap();
        assert_eq!(resized.get_pixel(3, 2).0, [250, 10, 0]);
    }
}
