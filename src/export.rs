//! Bundling selected files into one new archive.

use crate::error::ZiptreeError;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// One file to place in an exported archive.
#[derive(Debug, Clone)]
pub struct ExportItem {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Produces a single archive from an ordered list of items. Items arrive
/// already read; the exporter only arranges and compresses them.
#[allow(async_fn_in_trait)]
pub trait ArchiveExporter {
    async fn export(&self, items: Vec<ExportItem>) -> Result<ExportOutput, ZiptreeError>;
}

#[derive(Debug)]
pub struct ExportOutput {
    pub bytes: Vec<u8>,
    pub written: Vec<String>,
}

/// Writes DEFLATE-compressed ZIP archives.
#[derive(Debug, Clone, Copy)]
pub struct ZipExporter {
    pub compression_level: i64,
}

impl Default for ZipExporter {
    fn default() -> Self {
        Self {
            compression_level: 5,
        }
    }
}

impl ArchiveExporter for ZipExporter {
    async fn export(&self, items: Vec<ExportItem>) -> Result<ExportOutput, ZiptreeError> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(self.compression_level));
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let mut written = Vec::with_capacity(items.len());
        for item in items {
            writer
                .start_file(item.name.as_str(), options)
                .map_err(|e| ZiptreeError::Export(e.to_string()))?;
            writer
                .write_all(&item.bytes)
                .map_err(|e| ZiptreeError::Export(e.to_string()))?;
            written.push(item.name);
            tokio::task::yield_now().await;
        }
        let bytes = writer
            .finish()
            .map_err(|e| ZiptreeError::Export(e.to_string()))?
            .into_inner();
        tracing::debug!("Exported {} file(s), {} bytes", written.len(), bytes.len());
        Ok(ExportOutput { bytes, written })
    }
}
