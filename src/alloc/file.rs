//! A TOML-file-backed counter store.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::store::{Counter, CounterStore, CounterStoreError};

/// A counter store persisted as a single TOML file.
///
/// The conditional update is implemented as read-compare-rename under an
/// in-process mutex: the replacement file is written next to the counter and
/// atomically renamed over it, so a crash never leaves a half-written
/// counter. The compare-and-swap guarantee holds within one process; callers
/// that need multi-process safety must put a real conditional store behind
/// the [`CounterStore`] trait instead.
#[derive(Debug)]
pub struct FileCounterStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCounterStore {
    /// Opens the counter at `path`, creating it with `initial` as the first
    /// sequence to hand out if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the counter file cannot be read, parsed, or
    /// created.
    pub fn open_or_seed(path: PathBuf, initial: u32) -> Result<Self, CounterStoreError> {
        let store = Self {
            path,
            lock: Mutex::new(()),
        };

        match store.read_file() {
            Ok(_) => {}
            Err(CounterStoreError::NotFound) => {
                tracing::debug!(initial, "Seeding counter at {}", store.path.display());
                store.write_file(&Counter::new(initial))?;
            }
            Err(e) => return Err(e),
        }

        Ok(store)
    }

    /// The path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Result<Counter, CounterStoreError> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                CounterStoreError::NotFound
            } else {
                CounterStoreError::Io(e)
            }
        })?;
        let file: CounterFile = toml::from_str(&content)?;
        Ok(file.into())
    }

    fn write_file(&self, counter: &Counter) -> Result<(), CounterStoreError> {
        let content = toml::to_string_pretty(&CounterFile::from(counter.clone()))?;

        // Write-then-rename keeps the counter file whole even if the process
        // dies mid-write.
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CounterStore for FileCounterStore {
    fn read(&self) -> Result<Counter, CounterStoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read_file()
    }

    fn compare_and_swap(&self, expected: &Counter, value: u32) -> Result<bool, CounterStoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let current = self.read_file()?;
        if current != *expected {
            return Ok(false);
        }

        self.write_file(&Counter::new(value))?;
        Ok(true)
    }
}

/// The serialized versions of the counter record.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum CounterFile {
    #[serde(rename = "1")]
    V1 {
        value: u32,
        updated_at: DateTime<Utc>,
    },
}

impl From<CounterFile> for Counter {
    fn from(file: CounterFile) -> Self {
        match file {
            CounterFile::V1 { value, updated_at } => Self { value, updated_at },
        }
    }
}

impl From<Counter> for CounterFile {
    fn from(counter: Counter) -> Self {
        Self::V1 {
            value: counter.value,
            updated_at: counter.updated_at,
        }
    }
}
