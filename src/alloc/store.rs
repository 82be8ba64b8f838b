//! The counter storage seam.
//!
//! A [`CounterStore`] holds the single global counter record and exposes the
//! one serialization point in the numbering scheme: a conditional update
//! guarded by the counter's last-updated token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A snapshot of the global sequence counter.
///
/// `value` is the next sequence to hand out. `updated_at` doubles as the
/// optimistic-concurrency token: a conditional update succeeds only while the
/// stored token still matches the one that was read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    /// The next sequence number to hand out. Always at least 1.
    pub value: u32,
    /// When the counter was last written. Used as the concurrency token.
    pub updated_at: DateTime<Utc>,
}

impl Counter {
    /// Creates a counter that will hand out `value` next, stamped now.
    #[must_use]
    pub fn new(value: u32) -> Self {
        Self {
            value,
            updated_at: Utc::now(),
        }
    }
}

/// Backing storage for the global counter.
///
/// Implementations must guarantee that for a given stored counter state, at
/// most one [`compare_and_swap`](CounterStore::compare_and_swap) call
/// succeeds. That is the only guarantee the allocator relies on.
pub trait CounterStore {
    /// Reads the current counter and its concurrency token.
    ///
    /// # Errors
    ///
    /// Returns an error if the counter cannot be read.
    fn read(&self) -> Result<Counter, CounterStoreError>;

    /// Conditionally replaces the counter value.
    ///
    /// Writes `value` (with a fresh token) only if the stored counter still
    /// matches `expected`. Returns `true` if the update was committed, and
    /// `false` if another writer got there first.
    ///
    /// # Errors
    ///
    /// Returns an error if the counter cannot be read or written. A lost
    /// race is not an error.
    fn compare_and_swap(&self, expected: &Counter, value: u32) -> Result<bool, CounterStoreError>;
}

/// Errors raised by a counter store.
#[derive(Debug, thiserror::Error)]
pub enum CounterStoreError {
    /// The counter record does not exist.
    #[error("counter record not found")]
    NotFound,

    /// An I/O error occurred while reading or writing the counter.
    #[error("counter i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored counter could not be parsed.
    #[error("counter record is malformed: {0}")]
    Parse(#[from] toml::de::Error),

    /// The counter could not be serialized for writing.
    #[error("counter record could not be serialized: {0}")]
    Serialize(#[from] toml::ser::Error),
}
