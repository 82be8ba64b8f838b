//! Gap detection over a year's live sequence numbers.

use std::{collections::BTreeSet, num::NonZeroU32};

/// Returns the sequences missing from `present`, in ascending order.
///
/// A gap is an integer in `[1, max)` that is not in the set, where `max` is
/// the largest present sequence. An empty set has no maximum to scan to, so
/// it has no gaps; a dense set reports none either.
#[must_use]
pub fn missing_sequences(present: &BTreeSet<NonZeroU32>) -> Vec<NonZeroU32> {
    let Some(max) = present.last() else {
        return Vec::new();
    };

    (1..max.get())
        .filter_map(NonZeroU32::new)
        .filter(|candidate| !present.contains(candidate))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequences(values: &[u32]) -> BTreeSet<NonZeroU32> {
        values
            .iter()
            .map(|&v| NonZeroU32::new(v).unwrap())
            .collect()
    }

    fn gaps(values: &[u32]) -> Vec<u32> {
        missing_sequences(&sequences(values))
            .into_iter()
            .map(NonZeroU32::get)
            .collect()
    }

    #[test]
    fn reports_missing_sequences_in_order() {
        assert_eq!(gaps(&[1, 2, 4, 6]), vec![3, 5]);
    }

    #[test]
    fn dense_set_has_no_gaps() {
        assert_eq!(gaps(&[1, 2, 3]), Vec::<u32>::new());
    }

    #[test]
    fn empty_set_has_no_gaps() {
        assert_eq!(gaps(&[]), Vec::<u32>::new());
    }

    #[test]
    fn leading_gap_is_detected() {
        assert_eq!(gaps(&[3]), vec![1, 2]);
    }

    #[test]
    fn single_record_at_one_has_no_gaps() {
        assert_eq!(gaps(&[1]), Vec::<u32>::new());
    }
}
