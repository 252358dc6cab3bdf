use super::mask::{Label, LabelMap, Mask};
use crate::config::DEFAULT_ITERATIONS;
use crate::cv;
use crate::error::{CutoutError, Result};
use crate::region::Region;
use image::RgbImage;
use opencv::core::{self, Mat, Rect as CvRect};
use opencv::imgproc;
use opencv::prelude::*;
use std::time::Instant;

/// Seed for OpenCV's thread-local generator, which picks the k-means centers
const RNG_SEED: i32 = 0x5eed;

/// Rectangle-seeded GrabCut segmenter backed by `cv::grabCut`
///
/// Pixels outside the seed are fixed as background; pixels inside start as
/// probable foreground and are refined by alternating color-model fitting and
/// a min-cut over the 8-connected pixel graph. The random generator is reseeded
/// before every run, so equal inputs give equal masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrabCut {
    iterations: usize,
}

impl Default for GrabCut {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS)
    }
}

impl GrabCut {
    pub fn new(iterations: usize) -> Self {
        Self { iterations }
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Segment `image` seeded with `region`
    pub fn segment(&self, image: &RgbImage, region: &Region) -> Result<Mask> {
        let _span = tracing::debug_span!("grabcut").entered();

        let (width, height) = image.dimensions();
        if region.x() + region.width() > width || region.y() + region.height() > height {
            return Err(CutoutError::invalid_region(format!(
                "seed {}x{} at ({}, {}) does not fit a {}x{} image",
                region.width(),
                region.height(),
                region.x(),
                region.y(),
                width,
                height
            )));
        }

        let rect = CvRect::new(
            region.x() as i32,
            region.y() as i32,
            region.width() as i32,
            region.height() as i32,
        );
        let labels = self.run(image, Mat::default(), rect, imgproc::GC_INIT_WITH_RECT)?;

        Ok(labels.collapse())
    }

    /// Refine an existing label map in place
    ///
    /// Definite labels are never changed; probable ones follow the cut.
    pub fn refine(&self, image: &RgbImage, labels: &mut LabelMap) -> Result<()> {
        let (width, height) = image.dimensions();
        if labels.dimensions() != (width, height) {
            let (mask_width, mask_height) = labels.dimensions();
            return Err(CutoutError::ShapeMismatch {
                mask_width,
                mask_height,
                image_width: width,
                image_height: height,
            });
        }

        let mask = cv::bytes_to_mat(width, height, &labels.to_bytes())?;
        *labels = self.run(image, mask, CvRect::default(), imgproc::GC_INIT_WITH_MASK)?;
        Ok(())
    }

    /// Initialise with `mode`, then run the iterations one at a time so each
    /// can be logged
    fn run(&self, image: &RgbImage, mut mask: Mat, rect: CvRect, mode: i32) -> Result<LabelMap> {
        let (width, height) = image.dimensions();
        let start = Instant::now();

        let img = cv::rgb_to_mat(image)?;
        let mut bgd_model = Mat::default();
        let mut fgd_model = Mat::default();
        // cv::grabCut reports empty sample sets through CV_Assert
        let solver_error = |e: opencv::Error| CutoutError::segmentation(e.message);

        core::set_rng_seed(RNG_SEED)?;
        let first = self.iterations.min(1) as i32;
        imgproc::grab_cut(&img, &mut mask, rect, &mut bgd_model, &mut fgd_model, first, mode)
            .map_err(solver_error)?;
        if first > 0 {
            log_iteration(1, &mask)?;
        }

        for iteration in 1..self.iterations {
            imgproc::grab_cut(
                &img,
                &mut mask,
                rect,
                &mut bgd_model,
                &mut fgd_model,
                1,
                imgproc::GC_EVAL,
            )
            .map_err(solver_error)?;
            log_iteration(iteration + 1, &mask)?;
        }

        let labels = LabelMap::from_bytes(width, height, mask.data_bytes()?).ok_or_else(|| {
            CutoutError::segmentation("solver returned a mask with unexpected values")
        })?;

        tracing::info!(
            "GrabCut finished {} iterations on {}x{} in {:.1}ms",
            self.iterations,
            width,
            height,
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(labels)
    }
}

fn log_iteration(iteration: usize, mask: &Mat) -> Result<()> {
    if tracing::enabled!(tracing::Level::DEBUG) {
        let foreground = mask
            .data_bytes()?
            .iter()
            .filter(|&&b| Label::from_raw(b).is_some_and(Label::is_foreground))
            .count();
        tracing::debug!("Iteration {}: foreground={}", iteration, foreground);
    }
    Ok(())
}
