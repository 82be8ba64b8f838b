//! Path construction and parsing for record files.
//!
//! Each record is stored as a single markdown file directly under the
//! records root, named after its formatted case number. For example,
//! `2024-0042-EXP.md`. Because the filesystem forbids duplicate names, the
//! layout itself enforces that no two files claim the same case number.

use std::path::{Path, PathBuf};

use crate::domain::{number, CaseNumber};

/// Constructs the canonical file path for a case number.
///
/// The file is placed directly in the root, named with the formatted number
/// padded to `digits`.
#[must_use]
pub fn record_path(root: &Path, number: &CaseNumber, digits: usize) -> PathBuf {
    root.join(number.display(digits).to_string())
        .with_extension("md")
}

/// Parses a case number from a record file path.
///
/// Only the file stem is considered; padding width does not matter when
/// parsing, so `2024-42-EXP.md` and `2024-0042-EXP.md` name the same record.
///
/// # Errors
///
/// Returns an error if the path has no usable stem or if the stem is not a
/// valid case number.
pub fn parse_number_from_path(path: &Path) -> Result<CaseNumber, ParseError> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or(ParseError::InvalidPath)?;

    stem.parse().map_err(ParseError::Number)
}

/// Errors that can occur when parsing a case number from a path.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The path has no UTF-8 file stem.
    #[error("path has no usable file stem")]
    InvalidPath,
    /// The file stem is not a valid case number.
    #[error(transparent)]
    Number(number::Error),
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use super::*;
    use crate::domain::Abbreviation;

    fn number() -> CaseNumber {
        CaseNumber::new(
            2024,
            NonZeroU32::new(42).unwrap(),
            Abbreviation::new("EXP".to_string()).unwrap(),
        )
    }

    #[test]
    fn path_uses_configured_padding() {
        let path = record_path(Path::new("/records"), &number(), 4);
        assert_eq!(path, Path::new("/records/2024-0042-EXP.md"));

        let path = record_path(Path::new("/records"), &number(), 3);
        assert_eq!(path, Path::new("/records/2024-042-EXP.md"));
    }

    #[test]
    fn parse_recovers_the_number() {
        let parsed = parse_number_from_path(Path::new("/records/2024-0042-EXP.md")).unwrap();
        assert_eq!(parsed, number());
    }

    #[test]
    fn parse_ignores_padding_width() {
        let parsed = parse_number_from_path(Path::new("2024-42-EXP.md")).unwrap();
        assert_eq!(parsed, number());
    }

    #[test]
    fn parse_rejects_non_number_stems() {
        assert!(matches!(
            parse_number_from_path(Path::new("notes.md")),
            Err(ParseError::Number(_))
        ));
    }

    #[test]
    fn round_trip_through_path() {
        let path = record_path(Path::new("root"), &number(), 4);
        assert_eq!(parse_number_from_path(&path).unwrap(), number());
    }
}
