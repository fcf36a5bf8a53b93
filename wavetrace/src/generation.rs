use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-wide render generation.
///
/// Created once per renderer and advanced exactly once per `render()` call;
/// an in-flight render compares its captured [`Generation`] against the
/// counter after every suspension point and bails out once it's been
/// superseded.
#[derive(Clone, Debug, Default)]
pub struct GenerationCounter {
    current: Arc<AtomicU64>,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self) -> Generation {
        let id = self.current.fetch_add(1, Ordering::AcqRel) + 1;

        Generation {
            id,
            counter: Arc::clone(&self.current),
        }
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }
}

#[derive(Clone, Debug)]
pub struct Generation {
    id: u64,
    counter: Arc<AtomicU64>,
}

impl Generation {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_current(&self) -> bool {
        self.counter.load(Ordering::Acquire) == self.id
    }
}
