//! Cooperative cancellation context threaded through every public operation.
//!
//! Every public operation takes a `Ctx`. Cancellation is checked at stage
//! boundaries, before each in-stage batch, and before each external service
//! call; an observed cancellation transitions the coordinator to `Failed`
//! and propagates a `PipelineError::Cancelled`.

use crate::error::{PipelineError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cheaply-cloneable cancellation flag shared across a document's stages.
#[derive(Clone, Default)]
pub struct Ctx {
    cancelled: Arc<AtomicBool>,
}

impl Ctx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Check the flag, returning `Err(Cancelled)` if it has been tripped.
    /// Call this at stage boundaries, before each in-stage batch, and
    /// before each external service call.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncancelled_context_checks_ok() {
        let ctx = Ctx::new();
        assert!(ctx.check().is_ok());
    }

    #[test]
    fn cancel_propagates_through_clones() {
        let ctx = Ctx::new();
        let clone = ctx.clone();
        clone.cancel();
        assert!(ctx.is_cancelled());
        assert!(matches!(ctx.check(), Err(PipelineError::Cancelled)));
    }
}
