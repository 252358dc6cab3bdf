use crate::error::Result;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Name offered for every downloaded result
pub const DOWNLOAD_FILE_NAME: &str = "fixed.png";

pub const DOWNLOAD_MIME_TYPE: &str = "image/png";

/// Result image serialized for the download button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: &'static str,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl Download {
    pub fn png(image: &DynamicImage) -> Result<Self> {
        Ok(Self {
            file_name: DOWNLOAD_FILE_NAME,
            mime_type: DOWNLOAD_MIME_TYPE,
            bytes: encode_png(image)?,
        })
    }
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn download_is_named_png() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 0])));
        let download = Download::png(&image).unwrap();

        assert_eq!(download.file_name, "fixed.png");
        assert_eq!(download.mime_type, "image/png");
        assert_eq!(&download.bytes[1..4], b"PNG");

        let decoded = image::load_from_memory(&download.bytes).unwrap();
        assert_eq!(decoded.to_rgba8(), image.to_rgba8());
    }
}
