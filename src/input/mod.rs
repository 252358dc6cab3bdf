mod resize;
mod upload;

pub use resize::{resize_to_fit, target_dimensions};
pub use upload::{decode_image, Upload, ACCEPTED_EXTENSIONS};
