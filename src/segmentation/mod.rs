mod grabcut;
mod mask;
mod onnx;
mod preprocess;
pub mod types;

pub use grabcut::GrabCut;
pub use mask::{Label, LabelMap, Mask};
pub use onnx::OnnxMatting;
pub use preprocess::Preprocessor;
pub use types::{Matte, SegmentationModel};

use crate::config::RemoverConfig;
use anyhow::Result;

/// Create the default whole-image matting model (ONNX)
pub fn create_default_model(config: &RemoverConfig) -> Result<Box<dyn SegmentationModel>> {
    let model = OnnxMatting::new(config)?;
    Ok(Box::new(model))
}
