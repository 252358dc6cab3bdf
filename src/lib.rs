//! Rectangle-seeded background removal.
//!
//! An upload is decoded and shrunk, the user's first drawn rectangle seeds an
//! iterative GrabCut segmentation, and the resulting mask blanks out the
//! background before the image is offered as `fixed.png`. A second, one-shot
//! flow runs a pretrained ONNX matting model instead.

pub mod cache;
pub mod config;
mod cv;
pub mod error;
pub mod input;
pub mod output;
pub mod region;
pub mod remove;
pub mod segmentation;
pub mod session;

pub use config::{CutoutConfig, RemoverConfig};
pub use error::{CutoutError, Result};
pub use input::Upload;
pub use output::Download;
pub use region::{CanvasState, Rect, Region};
pub use segmentation::{GrabCut, Mask};
pub use session::{CutoutResult, Engine, Session, SessionState};
