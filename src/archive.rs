//! Archive decoding: turns an archive's bytes into the flat entry list the
//! tree builder consumes.

use crate::error::ZiptreeError;
use crate::source::{SharedZip, ZipEntrySource};
use crate::types::{ArchiveEntry, Payload};
use std::io::Cursor;
use std::sync::Arc;

/// Resolves an archive payload into its entries.
///
/// Fails with [`ZiptreeError::CorruptArchive`] when the bytes cannot be decoded
/// and [`ZiptreeError::EmptyArchive`] when the archive holds no entries.
#[allow(async_fn_in_trait)]
pub trait ArchiveDecoder {
    async fn decode(&self, name: &str, payload: &Payload) -> Result<Vec<ArchiveEntry>, ZiptreeError>;
}

/// Decoder for ZIP archives. The archive is kept in memory and entry payloads
/// decompress on demand.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipDecoder;

impl ArchiveDecoder for ZipDecoder {
    async fn decode(&self, name: &str, payload: &Payload) -> Result<Vec<ArchiveEntry>, ZiptreeError> {
        let bytes = payload.read()?;
        tokio::task::yield_now().await;
        decode_zip(name, bytes.into())
    }
}

pub fn decode_zip(name: &str, bytes: Arc<[u8]>) -> Result<Vec<ArchiveEntry>, ZiptreeError> {
    let mut archive: SharedZip =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ZiptreeError::corrupt(name, e))?;
    if archive.is_empty() {
        return Err(ZiptreeError::EmptyArchive {
            name: name.to_string(),
        });
    }
    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let (path, is_dir, size) = {
            let file = archive
                .by_index_raw(index)
                .map_err(|e| ZiptreeError::corrupt(name, e))?;
            (file.name().to_string(), file.is_dir(), file.size())
        };
        if is_dir {
            entries.push(ArchiveEntry::directory(path));
        } else {
            let source = ZipEntrySource::new(archive.clone(), index, path.clone(), size);
            entries.push(ArchiveEntry::file(path, Payload::new(source)));
        }
    }
    tracing::debug!("Decoded {} entries from {}", entries.len(), name);
    Ok(entries)
}
