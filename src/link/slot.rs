//! Single-slot hand-off between an event-driven producer and the poll loop.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

/// Holds at most one pending sample. A new sample overwrites an unread one;
/// intermediate samples are dropped, never queued.
///
/// Clones share the same slot, so the producer keeps one handle and the
/// polling side keeps another.
#[derive(Debug)]
pub struct SampleSlot<T> {
    inner: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for SampleSlot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for SampleSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SampleSlot<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
        }
    }

    // A panicked producer cannot leave the Option half-written.
    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `value`, returning true if an unread sample was overwritten.
    pub fn offer(&self, value: T) -> bool {
        let overwritten = self.lock().replace(value).is_some();
        if overwritten {
            trace!("Pending sample overwritten before it was polled");
        }
        overwritten
    }

    /// Removes and returns the pending sample, if any.
    pub fn take(&self) -> Option<T> {
        self.lock().take()
    }

    pub fn is_pending(&self) -> bool {
        self.lock().is_some()
    }

    pub fn clear(&self) {
        self.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_value_wins() {
        let slot = SampleSlot::new();
        assert!(!slot.offer(1u8));
        assert!(slot.offer(2u8));
        assert!(slot.offer(3u8));
        assert_eq!(slot.take(), Some(3));
        assert_eq!(slot.take(), None);
    }

    #[test]
    fn test_clones_share_the_slot() {
        let producer = SampleSlot::new();
        let consumer = producer.clone();

        producer.offer(0x10u8);
        assert!(consumer.is_pending());
        assert_eq!(consumer.take(), Some(0x10));
        assert!(!producer.is_pending());
    }

    #[test]
    fn test_producer_on_another_thread() {
        let slot = SampleSlot::new();
        let producer = slot.clone();

        std::thread::spawn(move || {
            for mask in 0..=0x20u8 {
                producer.offer(mask);
            }
        })
        .join()
        .unwrap();

        assert_eq!(slot.take(), Some(0x20));
        slot.clear();
        assert!(!slot.is_pending());
    }
}
