mod composite;
mod download;
mod png_file;

pub use composite::{apply_matte, composite, composite_transparent};
pub use download::{Download, DOWNLOAD_FILE_NAME, DOWNLOAD_MIME_TYPE};
pub use png_file::PngFileSink;

use anyhow::Result;

/// Trait for result destinations
pub trait OutputSink {
    /// Hand a finished download to the destination
    fn write_download(&mut self, download: &Download) -> Result<()>;
}
