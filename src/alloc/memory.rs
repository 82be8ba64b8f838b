//! An in-memory counter store.

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Mutex, PoisonError,
};

use super::store::{Counter, CounterStore, CounterStoreError};

/// A mutex-backed counter store with no persistence.
///
/// Used by the allocator tests and benchmarks; also handy for callers that
/// want allocator semantics over state they persist themselves. Read faults
/// can be injected to exercise the hint-fallback path.
#[derive(Debug)]
pub struct MemoryCounterStore {
    inner: Mutex<Counter>,
    fail_reads: AtomicU32,
}

impl MemoryCounterStore {
    /// Creates a store that will hand out `initial` as the first sequence.
    #[must_use]
    pub fn new(initial: u32) -> Self {
        Self {
            inner: Mutex::new(Counter::new(initial)),
            fail_reads: AtomicU32::new(0),
        }
    }

    /// Makes the next `count` reads fail with an I/O error.
    pub fn fail_next_reads(&self, count: u32) {
        self.fail_reads.store(count, Ordering::SeqCst);
    }
}

impl Default for MemoryCounterStore {
    fn default() -> Self {
        Self::new(1)
    }
}

impl CounterStore for MemoryCounterStore {
    fn read(&self) -> Result<Counter, CounterStoreError> {
        let remaining = self.fail_reads.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_reads.store(remaining - 1, Ordering::SeqCst);
            return Err(CounterStoreError::Io(std::io::Error::other(
                "injected read failure",
            )));
        }

        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.clone())
    }

    fn compare_and_swap(&self, expected: &Counter, value: u32) -> Result<bool, CounterStoreError> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if *guard != *expected {
            return Ok(false);
        }
        *guard = Counter::new(value);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_returns_initial_value() {
        let store = MemoryCounterStore::new(7);
        assert_eq!(store.read().unwrap().value, 7);
    }

    #[test]
    fn injected_failures_are_consumed() {
        let store = MemoryCounterStore::new(1);
        store.fail_next_reads(2);

        assert!(store.read().is_err());
        assert!(store.read().is_err());
        assert_eq!(store.read().unwrap().value, 1);
    }

    #[test]
    fn compare_and_swap_detects_interleaved_write() {
        let store = MemoryCounterStore::new(1);
        let stale = store.read().unwrap();
        assert!(store.compare_and_swap(&stale, 2).unwrap());
        assert!(!store.compare_and_swap(&stale, 3).unwrap());
        assert_eq!(store.read().unwrap().value, 2);
    }
}
