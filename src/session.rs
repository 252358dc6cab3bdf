//! Per-user interaction state and the shared engine behind it.

use crate::cache::{ContentKey, MemoCache};
use crate::config::CutoutConfig;
use crate::error::{CutoutError, Result};
use crate::input::{decode_image, resize_to_fit, Upload};
use crate::output::{composite, composite_transparent, Download};
use crate::region::{draw_selection, select_region, CanvasState, Rect, Region};
use crate::segmentation::{GrabCut, Mask};
use image::{DynamicImage, RgbImage};
use std::sync::Arc;
use std::time::Instant;

/// Stateless processing stages plus the memo tables they share
///
/// One engine can serve many sessions; it holds no per-user data.
pub struct Engine {
    config: CutoutConfig,
    grabcut: GrabCut,
    images: MemoCache<RgbImage>,
    masks: MemoCache<Mask>,
}

/// Output of one confirmed segmentation
#[derive(Debug, Clone)]
pub struct CutoutResult {
    pub mask: Arc<Mask>,
    pub image: DynamicImage,
    pub download: Download,
}

impl Engine {
    pub fn new(config: CutoutConfig) -> Self {
        tracing::debug!("Creating engine with {:?}", config);
        Self {
            grabcut: GrabCut::new(config.iterations),
            images: MemoCache::new("image", config.cache_capacity),
            masks: MemoCache::new("mask", config.cache_capacity),
            config,
        }
    }

    /// Decode an upload and bound its size
    ///
    /// Memoized on the uploaded bytes and the size bound.
    pub fn load(&self, upload: &Upload) -> Result<Arc<RgbImage>> {
        upload.check_extension()?;

        let max_dimension = self.config.max_dimension;
        let key = ContentKey::builder()
            .update(b"load")
            .update(&upload.bytes)
            .update(&max_dimension.to_le_bytes())
            .finish();

        self.images.get_or_try_insert_with(key, || {
            let start = Instant::now();
            let decoded = decode_image(&upload.bytes)?;
            let resized = resize_to_fit(&decoded, max_dimension)?;
            tracing::info!(
                "Loaded {} ({}x{} -> {}x{}) in {:.1}ms",
                upload.file_name,
                decoded.width(),
                decoded.height(),
                resized.width(),
                resized.height(),
                start.elapsed().as_secs_f64() * 1000.0
            );
            Ok(resized)
        })
    }

    /// Run GrabCut, memoized on image content, seed and iteration count
    pub fn segment(&self, image: &RgbImage, region: &Region) -> Result<Arc<Mask>> {
        let key = ContentKey::builder()
            .update(b"grabcut")
            .update(&image.width().to_le_bytes())
            .update(&image.height().to_le_bytes())
            .update(image.as_raw())
            .update(&region.to_le_bytes())
            .update(&(self.grabcut.iterations() as u64).to_le_bytes())
            .finish();

        self.masks
            .get_or_try_insert_with(key, || self.grabcut.segment(image, region))
    }

    /// Segment and composite into a downloadable result
    pub fn cutout(&self, image: &RgbImage, region: &Region) -> Result<CutoutResult> {
        let mask = self.segment(image, region)?;

        let start = Instant::now();
        let result = if self.config.transparent {
            DynamicImage::ImageRgba8(composite_transparent(image, &mask)?)
        } else {
            DynamicImage::ImageRgb8(composite(image, &mask)?)
        };
        let download = Download::png(&result)?;
        tracing::info!(
            "Composited {} foreground pixels in {:.1}ms",
            mask.foreground_count(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(CutoutResult {
            mask,
            image: result,
            download,
        })
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            images: self.images.stats(),
            masks: self.masks.stats(),
        }
    }
}

/// (hits, misses) of each memo table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub images: (u64, u64),
    pub masks: (u64, u64),
}

/// Where a session is in the upload → draw → confirm flow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    AwaitingImage,
    AwaitingRegion,
    RegionReady,
    Segmenting,
    Done,
}

/// Everything one user has uploaded, drawn and computed
///
/// Sessions never share mutable state; the only shared piece is the
/// [`Engine`] passed into each step.
#[derive(Debug, Default)]
pub struct Session {
    state: SessionState,
    image: Option<Arc<RgbImage>>,
    rect: Option<Rect>,
    region: Option<Region>,
    result: Option<CutoutResult>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The resized image currently being worked on
    pub fn image(&self) -> Option<&RgbImage> {
        self.image.as_deref()
    }

    pub fn region(&self) -> Option<Region> {
        self.region
    }

    pub fn result(&self) -> Option<&CutoutResult> {
        self.result.as_ref()
    }

    /// Start over with a new upload
    ///
    /// On failure the session is left waiting for an image.
    pub fn upload(&mut self, engine: &Engine, upload: &Upload) -> Result<()> {
        *self = Self::default();

        let image = engine.load(upload)?;
        tracing::info!(
            "Session image ready: {}x{}",
            image.width(),
            image.height()
        );
        self.image = Some(image);
        self.state = SessionState::AwaitingRegion;
        Ok(())
    }

    /// Take the canvas' current shapes as the seed
    ///
    /// Only the first shape counts. A missing or unusable shape puts the
    /// session back to waiting without raising an error.
    pub fn draw(&mut self, canvas: Option<&CanvasState>) -> SessionState {
        let Some(image) = self.image.as_deref() else {
            tracing::debug!("Ignoring drawing, no image uploaded");
            return self.state;
        };

        self.result = None;
        match select_region(canvas, image.width(), image.height()) {
            Ok(Some(region)) => {
                self.rect = canvas.and_then(CanvasState::first_rect);
                self.region = Some(region);
                self.state = SessionState::RegionReady;
            }
            Ok(None) => {
                self.rect = None;
                self.region = None;
                self.state = SessionState::AwaitingRegion;
            }
            Err(e) => {
                tracing::debug!("Waiting for a usable rectangle: {}", e);
                self.rect = canvas.and_then(CanvasState::first_rect);
                self.region = None;
                self.state = SessionState::AwaitingRegion;
            }
        }
        self.state
    }

    /// Image with the drawn rectangle outlined, for display
    pub fn selection_preview(&self) -> Option<RgbImage> {
        let image = self.image.as_deref()?;
        let rect = self.rect.as_ref()?;
        Some(draw_selection(image, rect))
    }

    /// Run the segmentation for the drawn rectangle
    ///
    /// Only allowed once a valid rectangle is ready. A segmentation failure
    /// returns the session to `RegionReady` so a new rectangle can be tried.
    pub fn confirm(&mut self, engine: &Engine) -> Result<&CutoutResult> {
        if self.state != SessionState::RegionReady {
            return Err(CutoutError::not_ready(format!(
                "cannot segment while {:?}",
                self.state
            )));
        }
        let (Some(image), Some(region)) = (self.image.clone(), self.region) else {
            return Err(CutoutError::not_ready("no image or rectangle"));
        };

        self.state = SessionState::Segmenting;
        match engine.cutout(&image, &region) {
            Ok(result) => {
                self.state = SessionState::Done;
                Ok(self.result.insert(result))
            }
            Err(e) => {
                tracing::warn!("Segmentation failed: {}", e);
                self.state = SessionState::RegionReady;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    fn png_upload(name: &str, image: &RgbImage) -> Upload {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, ImageFormat::Png).unwrap();
        Upload::new(name, buf.into_inner())
    }

    fn scene() -> RgbImage {
        RgbImage::from_fn(48, 32, |x, y| {
            let dx = f64::from(x) - 24.0;
            let dy = f64::from(y) - 16.0;
            if dx * dx + dy * dy < 64.0 {
                Rgb([230, 40, 30])
            } else {
                Rgb([30, 60 + (x % 5) as u8, 180 + (y % 7) as u8])
            }
        })
    }

    fn canvas(left: f64, top: f64, width: f64, height: f64) -> CanvasState {
        CanvasState::from_json(&format!(
            r#"{{"objects": [{{"type": "rect", "left": {left}, "top": {top}, "width": {width}, "height": {height}}}]}}"#
        ))
        .unwrap()
    }

    #[test]
    fn walks_through_every_state() {
        let engine = Engine::new(CutoutConfig::default());
        let mut session = Session::new();
        assert_eq!(session.state(), SessionState::AwaitingImage);

        session.upload(&engine, &png_upload("scene.png", &scene())).unwrap();
        assert_eq!(session.state(), SessionState::AwaitingRegion);

        assert_eq!(session.draw(None), SessionState::AwaitingRegion);
        assert_eq!(
            session.draw(Some(&canvas(12.0, 6.0, 24.0, 20.0))),
            SessionState::RegionReady
        );

        let result = session.confirm(&engine).unwrap();
        assert_eq!(result.download.file_name, "fixed.png");
        assert_eq!(result.mask.dimensions(), (48, 32));
        assert_eq!(session.state(), SessionState::Done);
    }

    #[test]
    fn invalid_rectangle_keeps_waiting() {
        let engine = Engine::new(CutoutConfig::default());
        let mut session = Session::new();
        session.upload(&engine, &png_upload("scene.png", &scene())).unwrap();

        for bad in [
            canvas(10.0, 10.0, 0.0, 5.0),
            canvas(10.0, 10.0, 5.0, -4.0),
            canvas(40.0, 0.0, 20.0, 10.0),
            canvas(0.0, 30.0, 10.0, 10.0),
        ] {
            assert_eq!(session.draw(Some(&bad)), SessionState::AwaitingRegion);
            assert!(matches!(
                session.confirm(&engine),
                Err(CutoutError::NotReady(_))
            ));
        }
        assert_eq!(engine.cache_stats().masks, (0, 0));
    }

    #[test]
    fn drawing_before_upload_is_ignored() {
        let mut session = Session::new();
        assert_eq!(
            session.draw(Some(&canvas(0.0, 0.0, 5.0, 5.0))),
            SessionState::AwaitingImage
        );
    }

    #[test]
    fn failed_upload_resets_session() {
        let engine = Engine::new(CutoutConfig::default());
        let mut session = Session::new();
        session.upload(&engine, &png_upload("scene.png", &scene())).unwrap();

        let err = session
            .upload(&engine, &Upload::new("broken.png", b"nope".to_vec()))
            .unwrap_err();
        assert!(matches!(err, CutoutError::Decode(_)));
        assert_eq!(session.state(), SessionState::AwaitingImage);
        assert!(session.image().is_none());
    }

    #[test]
    fn segmentation_failure_returns_to_region_ready() {
        let engine = Engine::new(CutoutConfig::default());
        let mut session = Session::new();
        session.upload(&engine, &png_upload("scene.png", &scene())).unwrap();
        session.draw(Some(&canvas(0.0, 0.0, 48.0, 32.0)));

        let err = session.confirm(&engine).unwrap_err();
        assert!(matches!(err, CutoutError::Segmentation(_)));
        assert_eq!(session.state(), SessionState::RegionReady);
        assert!(session.result().is_none());

        session.draw(Some(&canvas(12.0, 6.0, 24.0, 20.0)));
        assert!(session.confirm(&engine).is_ok());
    }

    #[test]
    fn repeated_requests_hit_the_cache() {
        let engine = Engine::new(CutoutConfig::default());
        let upload = png_upload("scene.png", &scene());

        let mut first = Session::new();
        first.upload(&engine, &upload).unwrap();
        first.draw(Some(&canvas(12.0, 6.0, 24.0, 20.0)));
        let first_mask = Arc::clone(&first.confirm(&engine).unwrap().mask);

        let mut second = Session::new();
        second.upload(&engine, &upload).unwrap();
        second.draw(Some(&canvas(12.4, 6.9, 24.2, 20.0)));
        let second_mask = Arc::clone(&second.confirm(&engine).unwrap().mask);

        assert!(Arc::ptr_eq(&first_mask, &second_mask));
        let stats = engine.cache_stats();
        assert_eq!(stats.images, (1, 1));
        assert_eq!(stats.masks, (1, 1));
    }

    #[test]
    fn selection_preview_outlines_rectangle() {
        let engine = Engine::new(CutoutConfig::default());
        let mut session = Session::new();
        assert!(session.selection_preview().is_none());

        session.upload(&engine, &png_upload("scene.png", &scene())).unwrap();
        session.draw(Some(&canvas(2.0, 2.0, 10.0, 10.0)));

        let preview = session.selection_preview().unwrap();
        assert_eq!(preview.get_pixel(2, 2).0, [0, 255, 0]);
    }

    #[test]
    fn transparent_config_emits_rgba() {
        let engine = Engine::new(CutoutConfig {
            transparent: true,
            ..CutoutConfig::default()
        });
        let image = scene();
        let region = Rect::new(12, 6, 24, 20).within(48, 32).unwrap();

        let result = engine.cutout(&image, &region).unwrap();
        let rgba = result.image.to_rgba8();
        assert_eq!(rgba.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn large_uploads_are_shrunk() {
        let engine = Engine::new(CutoutConfig {
            max_dimension: 20,
            ..CutoutConfig::default()
        });
        let image = engine.load(&png_upload("scene.png", &scene())).unwrap();
        assert_eq!(image.dimensions(), (20, 13));
    }
}
