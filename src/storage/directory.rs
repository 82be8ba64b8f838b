//! A filesystem backed store of records.
//!
//! The [`Directory`] manages the records root: one markdown file per record,
//! named after its case number, plus a `.registro/` metadata directory
//! holding the configuration and the sequence counter.

use std::{
    collections::HashMap,
    ffi::OsStr,
    fmt, fs, io,
    num::NonZeroU32,
    path::{Path, PathBuf},
};

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::{
    alloc::{
        missing_sequences, AllocateError, Allocator, CounterStore, CounterStoreError,
        FileCounterStore,
    },
    domain::{CaseNumber, Category, Config, Record},
    storage::{
        markdown::MarkdownRecord,
        path_parser::{parse_number_from_path, record_path},
        registry::Registry,
    },
};

/// The metadata directory under the records root.
const META_DIR: &str = ".registro";

/// The path of the configuration file under `root`.
#[must_use]
pub fn config_path(root: &Path) -> PathBuf {
    root.join(META_DIR).join("config.toml")
}

fn counter_path(root: &Path) -> PathBuf {
    root.join(META_DIR).join("counter.toml")
}

/// Where the sequence number for a new record comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberSource {
    /// Allocate the next sequence from the counter.
    Next,
    /// Reuse a specific sequence, typically one recovered from a gap.
    Reuse(NonZeroU32),
}

/// A gap between the counter and the registry that would allow duplicate
/// numbers to be handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterDrift {
    /// The counter's current value.
    pub value: u32,
    /// The smallest value the counter must hold to stay collision-free.
    pub required: u32,
}

/// A filesystem backed store of records.
#[derive(Debug)]
pub struct Directory {
    /// The root of the directory records are stored in.
    root: PathBuf,
    config: Config,
    registry: Registry,
    /// On-disk path of each loaded record. Hand-written files may spell the
    /// number with non-canonical padding, so the path seen at load time is
    /// authoritative.
    paths: HashMap<Uuid, PathBuf>,
    duplicates: Vec<CaseNumber>,
    allocator: Allocator<FileCounterStore>,
}

impl Directory {
    /// Initialises a records root at the given path.
    ///
    /// Creates the metadata directory, writes a default configuration if
    /// none exists, and seeds the counter. Already-initialised roots are
    /// left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata directory, configuration, or counter
    /// cannot be created.
    pub fn init(root: &Path) -> Result<(), InitError> {
        fs::create_dir_all(root.join(META_DIR))?;

        let config = config_path(root);
        if !config.exists() {
            Config::default().save(&config).map_err(InitError::Config)?;
        }

        FileCounterStore::open_or_seed(counter_path(root), 1)?;
        tracing::info!("Initialised records root at {}", root.display());
        Ok(())
    }

    /// Opens a records root and loads all records from disk.
    ///
    /// This method has different behaviour depending on the configuration
    /// file in the records root. If `allow_unrecognised` is `true`, then any
    /// markdown files with names that are not valid case numbers, or any
    /// files that cannot be parsed as records, are skipped. If
    /// `allow_unrecognised` is `false` (the default), then any unrecognised
    /// or invalid markdown files in the directory will return an error.
    ///
    /// The counter is seeded from the highest live sequence when it does not
    /// exist yet, so a root created by hand still allocates collision-free.
    ///
    /// # Errors
    ///
    /// Returns an error if unrecognised files are present (and not allowed),
    /// or if the counter cannot be opened.
    pub fn open(root: PathBuf) -> Result<Self, OpenError> {
        let config = load_config(&root);
        let md_paths = collect_markdown_paths(&root);

        let (records, unrecognised_paths): (Vec<_>, Vec<_>) = md_paths
            .par_iter()
            .map(|path| try_load_record(path).map(|record| (path.clone(), record)))
            .partition(Result::is_ok);

        let records: Vec<_> = records.into_iter().map(Result::unwrap).collect();
        let unrecognised_paths: Vec<_> = unrecognised_paths
            .into_iter()
            .map(Result::unwrap_err)
            .collect();

        if !config.allow_unrecognised && !unrecognised_paths.is_empty() {
            return Err(OpenError::UnrecognisedFiles(unrecognised_paths));
        }

        let mut registry = Registry::with_capacity(records.len());
        let mut paths = HashMap::with_capacity(records.len());
        let mut duplicates = Vec::new();
        for (path, record) in records {
            paths.insert(record.uuid(), path);
            if let Some(displaced) = registry.insert(record) {
                paths.remove(&displaced.uuid());
                duplicates.push(displaced.number().clone());
            }
        }

        fs::create_dir_all(root.join(META_DIR))?;
        let initial = registry.global_max().saturating_add(1);
        let store = FileCounterStore::open_or_seed(counter_path(&root), initial)?;

        Ok(Self {
            root,
            config,
            registry,
            paths,
            duplicates,
            allocator: Allocator::new(store),
        })
    }

    /// The root of the records directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The loaded configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Creates a new record and writes it to disk.
    ///
    /// With [`NumberSource::Next`], the sequence comes from the counter;
    /// when the counter cannot be read, the allocation falls back to one
    /// past the highest live sequence. With [`NumberSource::Reuse`], the
    /// given sequence is used as-is, which recovers a previously freed
    /// number.
    ///
    /// # Errors
    ///
    /// Returns an error if the sequence slot is already occupied, if the
    /// counter allocation fails, or if the record cannot be written.
    pub fn create(
        &mut self,
        category: Category,
        year: i32,
        title: String,
        body: String,
        source: NumberSource,
    ) -> Result<Record, CreateError> {
        let sequence = match source {
            NumberSource::Reuse(sequence) => sequence,
            NumberSource::Next => {
                let hint = NonZeroU32::new(self.registry.global_max().saturating_add(1))
                    .unwrap_or(NonZeroU32::MIN);
                self.allocator.allocate_or(hint)?.sequence
            }
        };

        let abbreviation = self.config.abbreviation_for(category);
        let number = CaseNumber::new(year, sequence, abbreviation);

        if self.registry.is_taken(year, sequence) {
            return Err(CreateError::NumberTaken(number));
        }

        let record = Record::new(number, category, title, body);
        record.save(&self.root, &self.config)?;
        self.paths.insert(
            record.uuid(),
            record_path(&self.root, record.number(), self.config.digits()),
        );
        self.registry.insert(record.clone());

        tracing::info!("Created record {}", record.number());
        Ok(record)
    }

    /// Deletes a record from disk and from the registry.
    ///
    /// When the deleted record held the highest live sequence, the counter
    /// is lowered to one past the new maximum so the freed run is handed out
    /// again. The rollback is best-effort cleanup: a concurrent allocation
    /// can win the race, and a failed rollback only leaves unused numbers
    /// behind (recoverable via gap reuse), so failures are logged and
    /// swallowed.
    ///
    /// # Errors
    ///
    /// Returns an error if no record has the given number or if the file
    /// cannot be removed.
    pub fn delete(&mut self, number: &CaseNumber) -> Result<Record, DeleteError> {
        let Some(path) = self.record_file(number) else {
            return Err(DeleteError::NotFound(number.clone()));
        };

        fs::remove_file(path)?;

        let Some(record) = self.registry.remove(number) else {
            return Err(DeleteError::NotFound(number.clone()));
        };
        self.paths.remove(&record.uuid());

        tracing::info!("Deleted record {}", record.number());
        self.rollback_after_delete(record.number().sequence());
        Ok(record)
    }

    fn rollback_after_delete(&self, deleted: NonZeroU32) {
        let max = self.registry.global_max();
        if deleted.get() <= max {
            // Not the tail; the counter is unaffected.
            return;
        }

        let Some(floor) = NonZeroU32::new(max.saturating_add(1)) else {
            return;
        };

        if let Err(e) = self.allocator.lower_to(floor) {
            tracing::warn!(
                floor = floor.get(),
                "Could not lower counter after deleting tail record: {e}. \
                 The freed numbers remain recoverable via gap reuse"
            );
        }
    }

    /// Looks up a record by its full case number.
    #[must_use]
    pub fn find(&self, number: &CaseNumber) -> Option<&Record> {
        self.registry.find(number)
    }

    /// The on-disk path of a loaded record, or `None` when no record has the
    /// given number.
    ///
    /// The path remembered at load time is returned, so a hand-written file
    /// whose name spells the number with non-canonical padding stays
    /// reachable.
    #[must_use]
    pub fn record_file(&self, number: &CaseNumber) -> Option<PathBuf> {
        let record = self.registry.find(number)?;
        Some(self.paths.get(&record.uuid()).cloned().unwrap_or_else(|| {
            record_path(&self.root, record.number(), self.config.digits())
        }))
    }

    /// Paths of record files whose name differs from the canonical spelling
    /// of their number.
    #[must_use]
    pub fn non_canonical_files(&self) -> Vec<PathBuf> {
        let digits = self.config.digits();
        self.registry
            .records()
            .filter_map(|record| {
                let actual = self.paths.get(&record.uuid())?;
                let canonical = record_path(&self.root, record.number(), digits);
                (*actual != canonical).then(|| actual.clone())
            })
            .collect()
    }

    /// Iterates over all loaded records in unspecified order.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.registry.records()
    }

    /// The number of loaded records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Whether the directory holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// The years that have at least one record, in ascending order.
    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.registry.years()
    }

    /// The sequence numbers missing from a year, in ascending order.
    ///
    /// A missing sequence lies strictly between 1 and the year's highest
    /// live sequence. Years with no records report no gaps.
    #[must_use]
    pub fn gaps(&self, year: i32) -> Vec<NonZeroU32> {
        missing_sequences(&self.registry.sequences_for_year(year))
    }

    /// The gaps of a year, formatted as full case numbers for the given
    /// category.
    #[must_use]
    pub fn gap_numbers(&self, year: i32, category: Category) -> Vec<CaseNumber> {
        let abbreviation = self.config.abbreviation_for(category);
        self.gaps(year)
            .into_iter()
            .map(|sequence| CaseNumber::new(year, sequence, abbreviation.clone()))
            .collect()
    }

    /// Case numbers whose `(year, sequence)` slot was claimed by more than
    /// one file on disk.
    ///
    /// Only the last-loaded record of a contested slot is kept; the numbers
    /// returned here belong to the records that were displaced. Uniqueness is
    /// application-enforced, so a slot can only be contested by files written
    /// outside this tool.
    #[must_use]
    pub fn duplicate_numbers(&self) -> &[CaseNumber] {
        &self.duplicates
    }

    /// The counter's current value.
    ///
    /// # Errors
    ///
    /// Returns an error if the counter cannot be read.
    pub fn counter_value(&self) -> Result<u32, CounterStoreError> {
        Ok(self.allocator.store().read()?.value)
    }

    /// Checks the counter against the loaded records.
    ///
    /// The counter must always be at least one past the highest live
    /// sequence; anything lower would eventually hand out a duplicate.
    /// Returns the drift when that invariant is violated.
    ///
    /// # Errors
    ///
    /// Returns an error if the counter cannot be read.
    pub fn counter_drift(&self) -> Result<Option<CounterDrift>, CounterStoreError> {
        let value = self.counter_value()?;
        let required = self.registry.global_max().saturating_add(1);
        Ok((value < required).then_some(CounterDrift { value, required }))
    }
}

fn load_config(root: &Path) -> Config {
    Config::load(&config_path(root)).unwrap_or_else(|e| {
        tracing::debug!("Failed to load config: {e}");
        Config::default()
    })
}

fn collect_markdown_paths(root: &PathBuf) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| {
            // Skip the metadata directory (config and counter)
            !entry.path().components().any(|c| c.as_os_str() == META_DIR)
        })
        .filter(|entry| entry.path().extension() == Some(OsStr::new("md")))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

fn try_load_record(path: &Path) -> Result<Record, PathBuf> {
    let number = match parse_number_from_path(path) {
        Ok(number) => number,
        Err(e) => {
            tracing::debug!(
                "Skipping file with invalid case number at {}: {:?}",
                path.display(),
                e
            );
            return Err(path.to_path_buf());
        }
    };

    let md = match read_markdown(path) {
        Ok(md) => md,
        Err(e) => {
            tracing::debug!("Failed to load record from {}: {:?}", path.display(), e);
            return Err(path.to_path_buf());
        }
    };

    // The heading and the filename must agree on the case number, otherwise
    // two files could claim the same number.
    if md.number() != &number {
        tracing::debug!(
            "Skipping {}: heading number {} does not match filename",
            path.display(),
            md.number()
        );
        return Err(path.to_path_buf());
    }

    Ok(Record::from(md))
}

fn read_markdown(path: &Path) -> Result<MarkdownRecord, crate::storage::markdown::LoadError> {
    use std::io::BufReader;

    let file = fs::File::open(path).map_err(|io_error| match io_error.kind() {
        io::ErrorKind::NotFound => crate::storage::markdown::LoadError::NotFound,
        _ => crate::storage::markdown::LoadError::Io(io_error),
    })?;

    let mut reader = BufReader::new(file);
    MarkdownRecord::read(&mut reader)
}

/// Errors that can occur when initialising a records root.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// The metadata directory could not be created.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The default configuration could not be written.
    #[error("{0}")]
    Config(String),
    /// The counter could not be seeded.
    #[error(transparent)]
    Counter(#[from] CounterStoreError),
}

/// Errors that can occur when opening a records root.
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    /// Markdown files that could not be recognised as records.
    UnrecognisedFiles(Vec<PathBuf>),
    /// The metadata directory could not be created.
    Io(#[from] io::Error),
    /// The counter could not be opened.
    Counter(#[from] CounterStoreError),
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognisedFiles(paths) => {
                write!(f, "Unrecognised files: ")?;
                for (i, path) in paths.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", path.display())?;
                }
                Ok(())
            }
            Self::Io(e) => write!(f, "{e}"),
            Self::Counter(e) => write!(f, "{e}"),
        }
    }
}

/// Errors that can occur when creating a record.
#[derive(Debug, thiserror::Error)]
pub enum CreateError {
    /// The sequence slot for that year is already occupied.
    #[error("case number {0} is already taken")]
    NumberTaken(CaseNumber),
    /// The counter allocation failed.
    #[error(transparent)]
    Allocate(#[from] AllocateError),
    /// The record file could not be written.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Errors that can occur when deleting a record.
#[derive(Debug, thiserror::Error)]
pub enum DeleteError {
    /// No record has the given case number.
    #[error("no record with case number {0}")]
    NotFound(CaseNumber),
    /// The record file could not be removed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn setup() -> (TempDir, Directory) {
        let tmp = TempDir::new().expect("failed to create temp dir");
        Directory::init(tmp.path()).unwrap();
        let dir = Directory::open(tmp.path().to_path_buf()).unwrap();
        (tmp, dir)
    }

    fn create_next(dir: &mut Directory, year: i32) -> Record {
        dir.create(
            Category::Expression,
            year,
            "A record".to_string(),
            String::new(),
            NumberSource::Next,
        )
        .unwrap()
    }

    #[test]
    fn init_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        Directory::init(tmp.path()).unwrap();

        let mut dir = Directory::open(tmp.path().to_path_buf()).unwrap();
        create_next(&mut dir, 2024);

        // A second init must not reset the counter or the config.
        Directory::init(tmp.path()).unwrap();
        let dir = Directory::open(tmp.path().to_path_buf()).unwrap();
        assert_eq!(dir.counter_value().unwrap(), 2);
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn create_assigns_sequential_numbers() {
        let (_tmp, mut dir) = setup();

        let r1 = create_next(&mut dir, 2024);
        let r2 = create_next(&mut dir, 2024);

        assert_eq!(r1.number().to_string(), "2024-0001-EXP");
        assert_eq!(r2.number().to_string(), "2024-0002-EXP");
    }

    #[test]
    fn created_records_survive_reopening() {
        let (tmp, mut dir) = setup();
        let r1 = create_next(&mut dir, 2024);

        let reopened = Directory::open(tmp.path().to_path_buf()).unwrap();
        let loaded = reopened.find(r1.number()).unwrap();
        assert_eq!(loaded.uuid(), r1.uuid());
        assert_eq!(loaded.title(), r1.title());
    }

    #[test]
    fn sequences_are_global_across_years() {
        let (_tmp, mut dir) = setup();

        let r1 = create_next(&mut dir, 2023);
        let r2 = create_next(&mut dir, 2024);

        assert_eq!(r1.number().sequence().get(), 1);
        assert_eq!(r2.number().sequence().get(), 2);
    }

    #[test]
    fn reuse_fills_a_gap() {
        let (_tmp, mut dir) = setup();
        create_next(&mut dir, 2024);
        let r2 = create_next(&mut dir, 2024);
        create_next(&mut dir, 2024);

        dir.delete(&r2.number().clone()).unwrap();
        assert_eq!(
            dir.gaps(2024),
            vec![NonZeroU32::new(2).unwrap()],
            "deleting the middle record leaves a gap"
        );

        let reused = dir
            .create(
                Category::Petition,
                2024,
                "Reused".to_string(),
                String::new(),
                NumberSource::Reuse(NonZeroU32::new(2).unwrap()),
            )
            .unwrap();
        assert_eq!(reused.number().to_string(), "2024-0002-PET");
        assert!(dir.gaps(2024).is_empty());
    }

    #[test]
    fn reuse_of_occupied_slot_fails() {
        let (_tmp, mut dir) = setup();
        create_next(&mut dir, 2024);

        let result = dir.create(
            Category::Petition,
            2024,
            "Duplicate".to_string(),
            String::new(),
            NumberSource::Reuse(NonZeroU32::new(1).unwrap()),
        );
        assert!(matches!(result, Err(CreateError::NumberTaken(_))));
    }

    #[test]
    fn reuse_does_not_touch_the_counter() {
        let (_tmp, mut dir) = setup();
        create_next(&mut dir, 2024);
        let r2 = create_next(&mut dir, 2024);
        create_next(&mut dir, 2024);
        dir.delete(&r2.number().clone()).unwrap();

        let before = dir.counter_value().unwrap();
        dir.create(
            Category::Expression,
            2024,
            "Reused".to_string(),
            String::new(),
            NumberSource::Reuse(NonZeroU32::new(2).unwrap()),
        )
        .unwrap();
        assert_eq!(dir.counter_value().unwrap(), before);
    }

    #[test]
    fn delete_removes_the_file() {
        let (tmp, mut dir) = setup();
        let r1 = create_next(&mut dir, 2024);

        let path = record_path(tmp.path(), r1.number(), dir.config().digits());
        assert!(path.exists());

        dir.delete(&r1.number().clone()).unwrap();
        assert!(!path.exists());
        assert!(dir.is_empty());
    }

    #[test]
    fn delete_missing_record_fails() {
        let (_tmp, mut dir) = setup();
        let r1 = create_next(&mut dir, 2024);
        dir.delete(&r1.number().clone()).unwrap();

        assert!(matches!(
            dir.delete(&r1.number().clone()),
            Err(DeleteError::NotFound(_))
        ));
    }

    #[test]
    fn deleting_the_tail_lowers_the_counter() {
        let (_tmp, mut dir) = setup();
        create_next(&mut dir, 2024);
        create_next(&mut dir, 2024);
        let r3 = create_next(&mut dir, 2024);
        assert_eq!(dir.counter_value().unwrap(), 4);

        dir.delete(&r3.number().clone()).unwrap();
        assert_eq!(dir.counter_value().unwrap(), 3);

        // The freed number is handed out again.
        let next = create_next(&mut dir, 2024);
        assert_eq!(next.number().sequence().get(), 3);
    }

    #[test]
    fn deleting_in_the_middle_leaves_the_counter() {
        let (_tmp, mut dir) = setup();
        create_next(&mut dir, 2024);
        let r2 = create_next(&mut dir, 2024);
        create_next(&mut dir, 2024);

        dir.delete(&r2.number().clone()).unwrap();
        assert_eq!(dir.counter_value().unwrap(), 4);
    }

    #[test]
    fn deleting_the_last_record_of_a_year_keeps_later_years_safe() {
        let (_tmp, mut dir) = setup();
        let old = create_next(&mut dir, 2023);
        create_next(&mut dir, 2024);

        // 2023's only record is not the global tail; deleting it must not
        // lower the counter below 2024's numbers.
        dir.delete(&old.number().clone()).unwrap();
        assert_eq!(dir.counter_value().unwrap(), 3);
    }

    #[test]
    fn gap_numbers_use_the_configured_abbreviation() {
        let (_tmp, mut dir) = setup();
        create_next(&mut dir, 2024);
        let r2 = create_next(&mut dir, 2024);
        create_next(&mut dir, 2024);
        dir.delete(&r2.number().clone()).unwrap();

        let numbers: Vec<String> = dir
            .gap_numbers(2024, Category::Petition)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(numbers, vec!["2024-0002-PET"]);
    }

    #[test]
    fn unrecognised_files_fail_the_load() {
        let tmp = TempDir::new().unwrap();
        Directory::init(tmp.path()).unwrap();
        fs::write(tmp.path().join("notes.md"), "not a record").unwrap();

        let result = Directory::open(tmp.path().to_path_buf());
        assert!(matches!(result, Err(OpenError::UnrecognisedFiles(_))));
    }

    #[test]
    fn unrecognised_files_are_skipped_when_allowed() {
        let tmp = TempDir::new().unwrap();
        Directory::init(tmp.path()).unwrap();
        fs::write(
            config_path(tmp.path()),
            "_version = \"1\"\nallow_unrecognised = true\n",
        )
        .unwrap();
        fs::write(tmp.path().join("notes.md"), "not a record").unwrap();

        let dir = Directory::open(tmp.path().to_path_buf()).unwrap();
        assert!(dir.is_empty());
    }

    #[test]
    fn mismatched_heading_is_unrecognised() {
        let tmp = TempDir::new().unwrap();
        Directory::init(tmp.path()).unwrap();
        fs::write(
            tmp.path().join("2024-0001-EXP.md"),
            "---\n_version: '1'\nuuid: 12b3f5c5-b1a8-4aa8-a882-20ff1c2aab53\n\
             created: 2025-07-14T07:15:00Z\ncategory: expression\n---\n\
             # 2024-0002-EXP Wrong heading\n",
        )
        .unwrap();

        let result = Directory::open(tmp.path().to_path_buf());
        assert!(matches!(result, Err(OpenError::UnrecognisedFiles(_))));
    }

    #[test]
    fn contested_slots_are_reported_as_duplicates() {
        let (tmp, mut dir) = setup();
        create_next(&mut dir, 2024);

        // A second file claiming sequence 1 under a different abbreviation.
        fs::write(
            tmp.path().join("2024-0001-PET.md"),
            "---\n_version: '1'\nuuid: 12b3f5c5-b1a8-4aa8-a882-20ff1c2aab53\n\
             created: 2025-07-14T07:15:00Z\ncategory: petition\n---\n\
             # 2024-0001-PET Contested\n",
        )
        .unwrap();

        let dir = Directory::open(tmp.path().to_path_buf()).unwrap();
        assert_eq!(dir.len(), 1);
        assert_eq!(dir.duplicate_numbers().len(), 1);
    }

    #[test]
    fn unpadded_filenames_stay_reachable() {
        let tmp = TempDir::new().unwrap();
        Directory::init(tmp.path()).unwrap();

        // A hand-written file spelling the number without padding.
        let path = tmp.path().join("2024-42-EXP.md");
        fs::write(
            &path,
            "---\n_version: '1'\nuuid: 12b3f5c5-b1a8-4aa8-a882-20ff1c2aab53\n\
             created: 2025-07-14T07:15:00Z\ncategory: expression\n---\n\
             # 2024-42-EXP Hand written\n",
        )
        .unwrap();

        let mut dir = Directory::open(tmp.path().to_path_buf()).unwrap();
        let number: CaseNumber = "2024-0042-EXP".parse().unwrap();
        assert!(dir.find(&number).is_some());
        assert_eq!(dir.record_file(&number), Some(path.clone()));
        assert_eq!(dir.non_canonical_files(), vec![path.clone()]);

        dir.delete(&number).unwrap();
        assert!(!path.exists());
        assert!(dir.is_empty());
    }

    #[test]
    fn canonical_filenames_are_not_flagged() {
        let (tmp, mut dir) = setup();
        let r1 = create_next(&mut dir, 2024);

        assert!(dir.non_canonical_files().is_empty());
        assert_eq!(
            dir.record_file(r1.number()),
            Some(record_path(tmp.path(), r1.number(), dir.config().digits()))
        );
    }

    #[test]
    fn counter_is_seeded_from_existing_records() {
        let tmp = TempDir::new().unwrap();
        Directory::init(tmp.path()).unwrap();
        let mut dir = Directory::open(tmp.path().to_path_buf()).unwrap();
        create_next(&mut dir, 2024);
        create_next(&mut dir, 2024);

        // Simulate a missing counter (e.g. a root copied without metadata).
        fs::remove_file(counter_path(tmp.path())).unwrap();

        let mut dir = Directory::open(tmp.path().to_path_buf()).unwrap();
        assert_eq!(dir.counter_value().unwrap(), 3);
        let next = create_next(&mut dir, 2024);
        assert_eq!(next.number().sequence().get(), 3);
    }

    #[test]
    fn counter_drift_is_reported() {
        let (tmp, mut dir) = setup();
        create_next(&mut dir, 2024);
        create_next(&mut dir, 2024);
        assert_eq!(dir.counter_drift().unwrap(), None);

        // Wind the counter back by hand to fabricate drift.
        fs::write(
            counter_path(tmp.path()),
            "_version = \"1\"\nvalue = 1\nupdated_at = \"2025-01-01T00:00:00Z\"\n",
        )
        .unwrap();

        let drift = dir.counter_drift().unwrap().unwrap();
        assert_eq!(drift.value, 1);
        assert_eq!(drift.required, 3);
    }
}
