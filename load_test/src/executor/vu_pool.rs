//! VU pool - bounded set of concurrent execution slots

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Hands out VUs to iterations. `pre_allocated` VUs are considered ready at
/// start; the pool grows on demand up to `max`, never beyond.
#[derive(Debug, Clone)]
pub struct VuPool {
    slots: Arc<Semaphore>,
    pre_allocated: usize,
    max: usize,
    initialized: Arc<AtomicUsize>,
    growth_reported: Arc<AtomicBool>,
}

impl VuPool {
    pub fn new(pre_allocated: usize, max: usize) -> Self {
        let max = max.max(1);
        let pre_allocated = pre_allocated.min(max);

        Self {
            slots: Arc::new(Semaphore::new(max)),
            pre_allocated,
            max,
            initialized: Arc::new(AtomicUsize::new(pre_allocated)),
            growth_reported: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Take an idle VU, or `None` if all `max` VUs are busy.
    /// The VU returns to the pool when the permit is dropped.
    pub fn try_acquire(&self) -> Option<OwnedSemaphorePermit> {
        let permit = Arc::clone(&self.slots).try_acquire_owned().ok()?;

        let in_use = self.in_use();
        let previous = self.initialized.fetch_max(in_use, Ordering::Relaxed);
        if in_use > previous && !self.growth_reported.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                "Insufficient pre-allocated VUs ({}), initializing more (max {})",
                self.pre_allocated,
                self.max
            );
        }

        Some(permit)
    }

    pub fn in_use(&self) -> usize {
        self.max - self.slots.available_permits()
    }

    /// VUs initialized so far, i.e. the pre-allocated floor or the peak
    /// concurrency observed, whichever is higher.
    pub fn initialized(&self) -> usize {
        self.initialized.load(Ordering::Relaxed)
    }

    pub fn max(&self) -> usize {
        self.max
    }
}
