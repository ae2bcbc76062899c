//! Batch fan-out/fan-in accumulator.
//!
//! `batch` enqueues each sub-request as an independent task sharing one
//! accumulator. Sub-requests may complete in any order (each is scheduled
//! through the engine independently, and reads genuinely run concurrently);
//! the accumulator holds a reply slot per position and only yields the
//! assembled batch once every slot is filled, preserving the caller's
//! original ordering.

use std::sync::Mutex;

/// Shared state for one in-flight `batch` call.
pub struct BatchAccumulator<T> {
    slots: Mutex<Vec<Option<T>>>,
}

impl<T> BatchAccumulator<T> {
    /// Start an accumulator sized for `len` sub-requests.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self { slots: Mutex::new((0..len).map(|_| None).collect()) }
    }

    /// Record the reply for sub-request `index`. Returns every reply, in
    /// original order, once this was the last outstanding slot; otherwise
    /// returns `None`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range for the accumulator's length.
    pub fn complete(&self, index: usize, reply: T) -> Option<Vec<T>> {
        let mut slots = self.slots.lock().expect("batch accumulator lock poisoned");
        assert!(index < slots.len(), "batch sub-request index out of range");
        slots[index] = Some(reply);

        if slots.iter().all(Option::is_some) {
            Some(slots.iter_mut().map(|slot| slot.take().expect("checked above")).collect())
        } else {
            None
        }
    }

    /// Number of sub-requests this accumulator was sized for.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().expect("batch accumulator lock poisoned").len()
    }

    /// Whether this accumulator has zero sub-requests.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
