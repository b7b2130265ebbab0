//! Test identifiers: predictable ids in generation order.

use std::sync::atomic::{AtomicUsize, Ordering};

use offer_item_core::id::IdGenerator;

/// Yields `id-0001`, `id-0002`, ... in call order.
#[derive(Debug, Default)]
pub struct SequenceIdGenerator {
    next: AtomicUsize,
}

impl SequenceIdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ids handed out so far.
    #[must_use]
    pub fn issued(&self) -> usize {
        self.next.load(Ordering::SeqCst)
    }
}

impl IdGenerator for SequenceIdGenerator {
    fn generate(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        format!("id-{n:04}")
    }
}
