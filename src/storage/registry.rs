//! The in-memory index of loaded records.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    num::NonZeroU32,
};

use uuid::Uuid;

use crate::domain::{CaseNumber, Record};

/// An index of records keyed by UUID and by `(year, sequence)`.
///
/// The registry holds every record loaded from the records root. Because
/// records are stored one per file named after their case number, the
/// filesystem already guarantees that each `(year, sequence)` pair maps to at
/// most one file; the registry mirrors that uniqueness in memory.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Registry {
    records: HashMap<Uuid, Record>,
    by_number: BTreeMap<i32, BTreeMap<NonZeroU32, Uuid>>,
}

impl Registry {
    /// Creates an empty registry with room for `capacity` records.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: HashMap::with_capacity(capacity),
            by_number: BTreeMap::new(),
        }
    }

    /// The number of records in the registry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the registry holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Inserts a record, returning any record that previously held the same
    /// sequence slot.
    pub fn insert(&mut self, record: Record) -> Option<Record> {
        let number = record.number();
        let slot = self
            .by_number
            .entry(number.year())
            .or_default()
            .insert(number.sequence(), record.uuid());

        let displaced = slot.and_then(|uuid| self.records.remove(&uuid));
        self.records.insert(record.uuid(), record);
        displaced
    }

    /// Removes and returns the record with the given case number.
    ///
    /// The full number must match, including the abbreviation.
    pub fn remove(&mut self, number: &CaseNumber) -> Option<Record> {
        if self.find(number).is_none() {
            return None;
        }

        let year = self.by_number.get_mut(&number.year())?;
        let uuid = year.remove(&number.sequence())?;
        if year.is_empty() {
            self.by_number.remove(&number.year());
        }

        self.records.remove(&uuid)
    }

    /// Looks up a record by its full case number.
    #[must_use]
    pub fn find(&self, number: &CaseNumber) -> Option<&Record> {
        let uuid = self.by_number.get(&number.year())?.get(&number.sequence())?;
        let record = self.records.get(uuid)?;
        (record.number() == number).then_some(record)
    }

    /// Whether the sequence slot for `(year, sequence)` is occupied,
    /// regardless of abbreviation.
    #[must_use]
    pub fn is_taken(&self, year: i32, sequence: NonZeroU32) -> bool {
        self.by_number
            .get(&year)
            .is_some_and(|sequences| sequences.contains_key(&sequence))
    }

    /// The live sequence numbers of a year, in ascending order.
    #[must_use]
    pub fn sequences_for_year(&self, year: i32) -> BTreeSet<NonZeroU32> {
        self.by_number
            .get(&year)
            .map(|sequences| sequences.keys().copied().collect())
            .unwrap_or_default()
    }

    /// The years that have at least one record, in ascending order.
    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.by_number.keys().copied()
    }

    /// The highest sequence number across all years, or 0 if the registry is
    /// empty.
    #[must_use]
    pub fn global_max(&self) -> u32 {
        self.by_number
            .values()
            .filter_map(|sequences| sequences.last_key_value())
            .map(|(sequence, _)| sequence.get())
            .max()
            .unwrap_or(0)
    }

    /// Iterates over all records in unspecified order.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Abbreviation, Category};

    fn record(year: i32, sequence: u32, abbreviation: &str) -> Record {
        let number = CaseNumber::new(
            year,
            NonZeroU32::new(sequence).unwrap(),
            Abbreviation::new(abbreviation.to_string()).unwrap(),
        );
        Record::new(
            number,
            Category::Expression,
            format!("Record {year}-{sequence}"),
            String::new(),
        )
    }

    #[test]
    fn insert_and_find() {
        let mut registry = Registry::default();
        let r = record(2024, 3, "EXP");
        registry.insert(r.clone());

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.find(r.number()), Some(&r));
    }

    #[test]
    fn find_requires_matching_abbreviation() {
        let mut registry = Registry::default();
        registry.insert(record(2024, 3, "EXP"));

        let other = record(2024, 3, "PET");
        assert!(registry.find(other.number()).is_none());
        // The slot is still occupied.
        assert!(registry.is_taken(2024, NonZeroU32::new(3).unwrap()));
    }

    #[test]
    fn insert_reports_the_displaced_record() {
        let mut registry = Registry::default();
        let first = record(2024, 3, "EXP");
        assert!(registry.insert(first.clone()).is_none());

        let second = record(2024, 3, "PET");
        let displaced = registry.insert(second).unwrap();
        assert_eq!(displaced.uuid(), first.uuid());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_clears_the_slot() {
        let mut registry = Registry::default();
        let r = record(2024, 3, "EXP");
        registry.insert(r.clone());

        let removed = registry.remove(r.number()).unwrap();
        assert_eq!(removed.uuid(), r.uuid());
        assert!(registry.is_empty());
        assert!(!registry.is_taken(2024, NonZeroU32::new(3).unwrap()));
    }

    #[test]
    fn remove_missing_is_none() {
        let mut registry = Registry::default();
        assert!(registry.remove(record(2024, 1, "EXP").number()).is_none());
    }

    #[test]
    fn sequences_are_scoped_by_year() {
        let mut registry = Registry::default();
        registry.insert(record(2023, 1, "EXP"));
        registry.insert(record(2024, 1, "EXP"));
        registry.insert(record(2024, 4, "PET"));

        let sequences: Vec<u32> = registry
            .sequences_for_year(2024)
            .into_iter()
            .map(NonZeroU32::get)
            .collect();
        assert_eq!(sequences, vec![1, 4]);
        assert_eq!(registry.years().collect::<Vec<_>>(), vec![2023, 2024]);
    }

    #[test]
    fn global_max_spans_years() {
        let mut registry = Registry::default();
        assert_eq!(registry.global_max(), 0);

        registry.insert(record(2023, 7, "EXP"));
        registry.insert(record(2024, 3, "PET"));
        assert_eq!(registry.global_max(), 7);
    }
}
