use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Abort signal shared between a caller and a long-running prediction.
/// Raised from any thread; checked by the predictor between samples.
#[derive(Debug, Clone, Default)]
pub struct AbortFlag {
    raised: Arc<AtomicBool>,
}

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}
