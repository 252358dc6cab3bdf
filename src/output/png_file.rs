use super::{Download, OutputSink};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Writes downloads to a file on disk
pub struct PngFileSink {
    path: PathBuf,
}

impl PngFileSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl OutputSink for PngFileSink {
    fn write_download(&mut self, download: &Download) -> Result<()> {
        std::fs::write(&self.path, &download.bytes)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;

        tracing::info!(
            "Wrote {} ({} bytes, {})",
            self.path.display(),
            download.bytes.len(),
            download.mime_type
        );

        Ok(())
    }
}
