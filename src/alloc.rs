//! Sequential case-number allocation.
//!
//! A single global [`Counter`](store::Counter) hands out sequence numbers
//! through an optimistic conditional update: read the counter and its token,
//! then commit `value + 1` only if the token is unchanged. At most one
//! caller wins per counter state, so concurrent allocations receive
//! pairwise-distinct, contiguous values. Losers back off and retry up to a
//! bounded attempt budget, then surface a [`AllocateError::Contended`] error
//! instead of spinning forever.
//!
//! Deleting the record that held a year's highest sequence may lower the
//! counter again (see [`Allocator::lower_to`]). That rollback is best-effort
//! cleanup: it can race with concurrent allocations and leave the counter
//! higher than minimal, which is accepted.

pub mod file;
pub mod gaps;
pub mod memory;
pub mod store;

use std::{num::NonZeroU32, thread, time::Duration};

pub use file::FileCounterStore;
pub use gaps::missing_sequences;
pub use memory::MemoryCounterStore;
pub use store::{Counter, CounterStore, CounterStoreError};

/// Retry behaviour for the allocation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts (reads and conditional updates) before giving up.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled each further attempt.
    pub base_delay: Duration,
    /// Upper bound on the per-attempt delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// The backoff delay after the given (1-based) failed attempt.
    #[must_use]
    fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let factor = 2_u32.saturating_pow(exponent);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// The outcome of an allocation that may have used the fallback path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    /// The allocated sequence number.
    pub sequence: NonZeroU32,
    /// Where the sequence came from.
    pub source: AllocationSource,
}

/// Where an allocated sequence number came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationSource {
    /// Won a conditional update against the global counter.
    Counter,
    /// The counter was unreadable; the caller's hint was used verbatim.
    ///
    /// This path is not protected against concurrent duplicates.
    Fallback,
}

impl Allocation {
    /// Whether this allocation bypassed the counter.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self.source, AllocationSource::Fallback)
    }
}

/// Errors raised by the allocator.
#[derive(Debug, thiserror::Error)]
pub enum AllocateError {
    /// The counter could not be read, even after retries.
    #[error("counter could not be read: {0}")]
    Unavailable(#[source] CounterStoreError),

    /// The counter could not be written.
    #[error("counter could not be written: {0}")]
    Store(#[from] CounterStoreError),

    /// Every attempt lost the conditional-update race.
    #[error("allocation contended after {attempts} attempts, try again")]
    Contended {
        /// How many attempts were made before giving up.
        attempts: u32,
    },

    /// The stored counter value cannot be handed out as a sequence.
    #[error("counter value {0} is not a valid sequence")]
    Corrupt(u32),
}

/// Hands out unique sequence numbers from a [`CounterStore`].
#[derive(Debug)]
pub struct Allocator<S> {
    store: S,
    policy: RetryPolicy,
}

impl<S: CounterStore> Allocator<S> {
    /// Creates an allocator with the default retry policy.
    pub fn new(store: S) -> Self {
        Self::with_policy(store, RetryPolicy::default())
    }

    /// Creates an allocator with an explicit retry policy.
    pub const fn with_policy(store: S, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// The underlying counter store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Allocates the next sequence number.
    ///
    /// Reads the counter, then conditionally commits `value + 1`. The value
    /// that was read is the allocated sequence. Lost races and failed reads
    /// are retried with exponential backoff up to the policy's attempt
    /// budget.
    ///
    /// # Errors
    ///
    /// - [`AllocateError::Contended`] when every attempt lost the race.
    /// - [`AllocateError::Unavailable`] when the counter could not be read.
    /// - [`AllocateError::Store`] when the conditional update itself failed.
    /// - [`AllocateError::Corrupt`] when the stored value is not usable.
    pub fn allocate(&self) -> Result<NonZeroU32, AllocateError> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let counter = match self.store.read() {
                Ok(counter) => counter,
                Err(e) => {
                    if attempt >= self.policy.max_attempts {
                        return Err(AllocateError::Unavailable(e));
                    }
                    tracing::debug!(attempt, "Counter read failed: {e}; retrying");
                    thread::sleep(self.policy.delay(attempt));
                    continue;
                }
            };

            let sequence =
                NonZeroU32::new(counter.value).ok_or(AllocateError::Corrupt(counter.value))?;
            let next = counter
                .value
                .checked_add(1)
                .ok_or(AllocateError::Corrupt(counter.value))?;

            if self.store.compare_and_swap(&counter, next)? {
                tracing::debug!(sequence = sequence.get(), attempt, "Allocated sequence");
                return Ok(sequence);
            }

            if attempt >= self.policy.max_attempts {
                return Err(AllocateError::Contended { attempts: attempt });
            }

            tracing::trace!(attempt, "Lost counter race; backing off");
            thread::sleep(self.policy.delay(attempt));
        }
    }

    /// Allocates the next sequence number, falling back to `hint` when the
    /// counter cannot be read.
    ///
    /// The fallback trades strictness for availability: the hint is used
    /// verbatim (never adjusted), the degradation is logged at WARN, and the
    /// returned [`Allocation`] records which path was taken. Contention and
    /// write failures still surface as errors; only unreadable counters
    /// trigger the fallback.
    ///
    /// # Errors
    ///
    /// Returns any [`AllocateError`] other than
    /// [`AllocateError::Unavailable`].
    pub fn allocate_or(&self, hint: NonZeroU32) -> Result<Allocation, AllocateError> {
        match self.allocate() {
            Ok(sequence) => Ok(Allocation {
                sequence,
                source: AllocationSource::Counter,
            }),
            Err(AllocateError::Unavailable(e)) => {
                tracing::warn!(
                    hint = hint.get(),
                    "Counter unreadable after retries ({e}); using fallback sequence. \
                     Concurrent creations may collide until the counter recovers"
                );
                Ok(Allocation {
                    sequence: hint,
                    source: AllocationSource::Fallback,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Conditionally lowers the counter to `floor`.
    ///
    /// Commits only while the counter's current value is strictly greater
    /// than `floor`: the counter is never raised and never taken below the
    /// floor. Returns whether the counter was lowered.
    ///
    /// Used after deleting the record that held a year's maximum sequence,
    /// so the counter does not drift upward on create/delete churn at the
    /// tail. A concurrent allocation can win the race instead, in which case
    /// the counter stays where the winner put it.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Allocator::allocate`].
    pub fn lower_to(&self, floor: NonZeroU32) -> Result<bool, AllocateError> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let counter = match self.store.read() {
                Ok(counter) => counter,
                Err(e) => {
                    if attempt >= self.policy.max_attempts {
                        return Err(AllocateError::Unavailable(e));
                    }
                    tracing::debug!(attempt, "Counter read failed: {e}; retrying");
                    thread::sleep(self.policy.delay(attempt));
                    continue;
                }
            };

            if counter.value <= floor.get() {
                return Ok(false);
            }

            if self.store.compare_and_swap(&counter, floor.get())? {
                tracing::debug!(
                    from = counter.value,
                    to = floor.get(),
                    "Lowered counter after tail deletion"
                );
                return Ok(true);
            }

            if attempt >= self.policy.max_attempts {
                return Err(AllocateError::Contended { attempts: attempt });
            }

            thread::sleep(self.policy.delay(attempt));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    /// A policy that retries aggressively without sleeping, for tests.
    const FAST: RetryPolicy = RetryPolicy {
        max_attempts: 10_000,
        base_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    };

    /// A store whose conditional update always loses.
    struct AlwaysConflict;

    impl CounterStore for AlwaysConflict {
        fn read(&self) -> Result<Counter, CounterStoreError> {
            Ok(Counter::new(1))
        }

        fn compare_and_swap(&self, _: &Counter, _: u32) -> Result<bool, CounterStoreError> {
            Ok(false)
        }
    }

    #[test]
    fn allocate_returns_the_value_that_was_read() {
        let allocator = Allocator::new(MemoryCounterStore::new(1));
        assert_eq!(allocator.allocate().unwrap().get(), 1);
        assert_eq!(allocator.allocate().unwrap().get(), 2);
        assert_eq!(allocator.store().read().unwrap().value, 3);
    }

    #[test]
    fn concurrent_allocations_are_distinct_and_contiguous() {
        const THREADS: u32 = 8;
        const PER_THREAD: u32 = 25;

        let allocator = Arc::new(Allocator::with_policy(MemoryCounterStore::new(1), FAST));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let allocator = Arc::clone(&allocator);
                thread::spawn(move || {
                    (0..PER_THREAD)
                        .map(|_| allocator.allocate().unwrap().get())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut allocated: Vec<u32> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        allocated.sort_unstable();

        // Pairwise distinct and a contiguous ascending run from the initial
        // counter value.
        let expected: Vec<u32> = (1..=THREADS * PER_THREAD).collect();
        assert_eq!(allocated, expected);
    }

    #[test]
    fn contention_exhaustion_is_a_distinguishable_error() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        };
        let allocator = Allocator::with_policy(AlwaysConflict, policy);

        match allocator.allocate() {
            Err(AllocateError::Contended { attempts }) => assert_eq!(attempts, 3),
            other => panic!("expected Contended, got {other:?}"),
        }
    }

    #[test]
    fn transient_read_failures_are_retried() {
        let store = MemoryCounterStore::new(5);
        store.fail_next_reads(2);
        let allocator = Allocator::with_policy(store, FAST);

        assert_eq!(allocator.allocate().unwrap().get(), 5);
    }

    #[test]
    fn exhausted_reads_surface_as_unavailable() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        };
        let store = MemoryCounterStore::new(1);
        store.fail_next_reads(u32::MAX);
        let allocator = Allocator::with_policy(store, policy);

        assert!(matches!(
            allocator.allocate(),
            Err(AllocateError::Unavailable(_))
        ));
    }

    #[test]
    fn fallback_uses_the_hint_verbatim() {
        let policy = RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        };
        let store = MemoryCounterStore::new(1);
        store.fail_next_reads(u32::MAX);
        let allocator = Allocator::with_policy(store, policy);

        let hint = NonZeroU32::new(17).unwrap();
        let allocation = allocator.allocate_or(hint).unwrap();
        assert_eq!(allocation.sequence, hint);
        assert!(allocation.is_fallback());
    }

    #[test]
    fn allocate_or_prefers_the_counter() {
        let allocator = Allocator::new(MemoryCounterStore::new(3));
        let allocation = allocator.allocate_or(NonZeroU32::new(99).unwrap()).unwrap();
        assert_eq!(allocation.sequence.get(), 3);
        assert!(!allocation.is_fallback());
    }

    #[test]
    fn zero_counter_value_is_corrupt() {
        let allocator = Allocator::new(MemoryCounterStore::new(0));
        assert!(matches!(
            allocator.allocate(),
            Err(AllocateError::Corrupt(0))
        ));
    }

    #[test]
    fn lower_to_lowers_only_from_above() {
        let allocator = Allocator::new(MemoryCounterStore::new(10));
        let floor = NonZeroU32::new(6).unwrap();

        assert!(allocator.lower_to(floor).unwrap());
        assert_eq!(allocator.store().read().unwrap().value, 6);

        // Already at the floor: nothing to do, and never raised.
        assert!(!allocator.lower_to(floor).unwrap());
        assert!(!allocator.lower_to(NonZeroU32::new(9).unwrap()).unwrap());
        assert_eq!(allocator.store().read().unwrap().value, 6);
    }

    #[test]
    fn backoff_delay_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 64,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(250),
        };
        assert_eq!(policy.delay(1), Duration::from_millis(10));
        assert_eq!(policy.delay(2), Duration::from_millis(20));
        assert_eq!(policy.delay(5), Duration::from_millis(160));
        assert_eq!(policy.delay(6), Duration::from_millis(250));
        assert_eq!(policy.delay(60), Duration::from_millis(250));
    }
}
