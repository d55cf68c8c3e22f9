//! Scoped byte buffers handed to consumers such as a PDF preview or a
//! download. A [`Blob`] is released when dropped; the registry counts the
//! blobs still alive so leaks show up in tests.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

pub const PDF_MIME: &str = "application/pdf";
pub const ZIP_MIME: &str = "application/zip";

#[derive(Debug, Clone, Default)]
pub struct BlobRegistry {
    live: Arc<AtomicUsize>,
    next_id: Arc<AtomicU64>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, bytes: Vec<u8>, mime: &'static str) -> Blob {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.live.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("Issued blob {} ({} bytes, {})", id, bytes.len(), mime);
        Blob {
            id,
            mime,
            bytes,
            live: Arc::clone(&self.live),
        }
    }

    /// Blobs issued by this registry and not yet released.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }
}

pub struct Blob {
    id: u64,
    mime: &'static str,
    bytes: Vec<u8>,
    live: Arc<AtomicUsize>,
}

impl Blob {
    pub fn id(&self) -> u64 {
        self.id
    }
    pub fn mime(&self) -> &'static str {
        self.mime
    }
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
    pub fn len(&self) -> usize {
        self.bytes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("id", &self.id)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Drop for Blob {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::Relaxed);
        tracing::trace!("Released blob {}", self.id);
    }
}
