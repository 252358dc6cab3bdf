use std::path::PathBuf;

/// Largest image side kept after upload
pub const DEFAULT_MAX_DIMENSION: u32 = 800;

/// GrabCut refinement passes
pub const DEFAULT_ITERATIONS: usize = 5;

/// Entries per memo table
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Square input side for u2net-style matting models
pub const DEFAULT_MODEL_INPUT_SIZE: u32 = 320;

/// Tunables for the rectangle-seeded flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CutoutConfig {
    /// Uploads larger than this on either side are shrunk
    pub max_dimension: u32,
    pub iterations: usize,
    pub cache_capacity: usize,
    /// Emit RGBA with transparent background instead of black
    pub transparent: bool,
}

impl Default for CutoutConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            iterations: DEFAULT_ITERATIONS,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            transparent: false,
        }
    }
}

/// Settings for the model-based background remover
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoverConfig {
    pub model_path: PathBuf,
    pub input_size: u32,
}

impl RemoverConfig {
    pub fn new<P: Into<PathBuf>>(model_path: P) -> Self {
        Self {
            model_path: model_path.into(),
            input_size: DEFAULT_MODEL_INPUT_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_flow() {
        let config = CutoutConfig::default();
        assert_eq!(config.max_dimension, 800);
        assert_eq!(config.iterations, 5);
        assert!(!config.transparent);
    }

    #[test]
    fn remover_defaults_to_u2net_input() {
        let config = RemoverConfig::new("u2net.onnx");
        assert_eq!(config.input_size, 320);
        assert_eq!(config.model_path, PathBuf::from("u2net.onnx"));
    }
}
