use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::SortError;

/// Cooperative cancellation shared between a caller and a running sort.
///
/// The sort checks the token once per record. Cancelling leaves run files produced so far on
/// disk, cleaning them up is the responsibility of the caller.
#[derive(Clone, Debug, Default)]
pub struct Cancellation {
    cancelled: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Cancellation {
        Cancellation::default()
    }

    /// Request cancellation. Every clone of this token observes the request.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub(crate) fn check(&self) -> Result<(), SortError> {
        if self.is_cancelled() {
            Err(SortError::Cancelled)
        } else {
            Ok(())
        }
    }
}
