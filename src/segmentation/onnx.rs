use super::preprocess::Preprocessor;
use super::types::{Matte, SegmentationModel};
use crate::config::RemoverConfig;
use anyhow::{anyhow, bail, Context, Result};
use image::RgbImage;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;

/// Pretrained single-pass matting model (u2net-style)
///
/// One input tensor in, one saliency map out. Stateless: every call is
/// independent and needs no seed rectangle.
pub struct OnnxMatting {
    session: Session,
    preprocessor: Preprocessor,
    width: u32,
    height: u32,
}

impl OnnxMatting {
    /// Load the model described by `config`
    ///
    /// # Default Configuration
    /// - Input size: 320x320, the resolution u2net was trained at
    /// - Graph optimization level 3, 4 intra-op threads
    pub fn new(config: &RemoverConfig) -> Result<Self> {
        let path = &config.model_path;

        tracing::info!("Loading matting model from {}", path.display());

        let session = Session::builder()
            .map_err(|e| anyhow!("Failed to create session builder: {e}"))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| anyhow!("Failed to set optimization level: {e}"))?
            .with_intra_threads(4)
            .map_err(|e| anyhow!("Failed to set thread count: {e}"))?
            .commit_from_file(path)
            .map_err(|e| anyhow!("{e}"))
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        tracing::info!("Matting model loaded successfully");

        let width = config.input_size;
        let height = config.input_size;

        Ok(Self {
            session,
            preprocessor: Preprocessor::new(width, height),
            width,
            height,
        })
    }
}

impl SegmentationModel for OnnxMatting {
    fn segment(&mut self, frame: &RgbImage) -> Result<Matte> {
        let _span = tracing::debug_span!("onnx_segment").entered();

        let input_tensor = self.preprocessor.preprocess(frame)?;
        let input_value = Tensor::from_array(input_tensor)
            .map_err(|e| anyhow!("Failed to convert input tensor: {e}"))?;

        let _infer_span = tracing::debug_span!("inference").entered();
        let outputs = self
            .session
            .run(ort::inputs![input_value])
            .map_err(|e| anyhow!("Failed to run inference: {e}"))?;
        drop(_infer_span);

        // Saliency map is the first output, shape [1, 1, H, W]
        let keys: Vec<_> = outputs.keys().collect();
        let Some(first_key) = keys.first() else {
            bail!("Model produced no outputs");
        };
        let pha = outputs
            .get(first_key)
            .ok_or_else(|| anyhow!("Output {first_key} not found"))?
            .try_extract_array::<f32>()
            .map_err(|e| anyhow!("Failed to extract output tensor: {e}"))?;

        let shape = pha.shape().to_vec();
        let (matte_height, matte_width) = match shape.as_slice() {
            [.., h, w] => (*h, *w),
            _ => bail!("Unexpected output shape {:?}", shape),
        };
        let matte_flat: Vec<f32> = pha.iter().copied().collect();

        let (frame_width, frame_height) = frame.dimensions();
        Preprocessor::postprocess_matte(
            &matte_flat,
            matte_width as u32,
            matte_height as u32,
            frame_width,
            frame_height,
        )
    }

    fn input_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
