use crate::error::ZiptreeError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation, checked by builds at every yield point.
///
/// Clones share the same flag, so a handle can be kept by whoever drives the
/// UI while the build holds another.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
    /// Re-arms the flag for the next batch.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
    pub(crate) fn check(&self) -> Result<(), ZiptreeError> {
        if self.is_cancelled() {
            Err(ZiptreeError::Cancelled)
        } else {
            Ok(())
        }
    }
}
