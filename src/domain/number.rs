use std::{fmt, num::NonZeroU32, ops::Deref, str::FromStr};

use non_empty_string::NonEmptyString;

/// Default zero-padding width for the sequence component of a case number.
pub const DEFAULT_DIGITS: usize = 4;

/// Fixed fallback code used when no category-specific abbreviation is
/// configured.
const FALLBACK_ABBREVIATION: &str = "REG";

/// A validated category abbreviation containing only uppercase alphabetic
/// characters ([A-Z]+).
///
/// Used as the trailing segment of a [`CaseNumber`] to identify the record's
/// category at a glance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Abbreviation(NonEmptyString);

impl Abbreviation {
    /// Creates a new `Abbreviation` from a string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAbbreviationError` if the string is empty or contains
    /// characters other than uppercase letters (A-Z).
    pub fn new(s: String) -> Result<Self, InvalidAbbreviationError> {
        let non_empty =
            NonEmptyString::new(s.clone()).map_err(|_| InvalidAbbreviationError(s.clone()))?;

        if !s.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(InvalidAbbreviationError(s));
        }

        Ok(Self(non_empty))
    }

    /// The fixed fallback abbreviation, used when no category-specific code
    /// is available.
    #[must_use]
    pub fn fallback() -> Self {
        Self(
            NonEmptyString::new(FALLBACK_ABBREVIATION.to_string())
                .expect("this must never fail"),
        )
    }

    /// Returns the string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for Abbreviation {
    type Error = InvalidAbbreviationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Abbreviation {
    type Error = InvalidAbbreviationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value.to_string())
    }
}

impl AsRef<str> for Abbreviation {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl Deref for Abbreviation {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0.as_str()
    }
}

impl fmt::Display for Abbreviation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Abbreviation {
    type Err = InvalidAbbreviationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

/// Error returned when a string doesn't match the required pattern [A-Z]+.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid abbreviation '{0}': must be non-empty and contain only uppercase letters (A-Z)")]
pub struct InvalidAbbreviationError(String);

/// The human-readable case number assigned to a record.
///
/// Format: `{YEAR}-{SEQUENCE}-{ABBREVIATION}`, where:
/// - `YEAR` is the calendar year the record belongs to (e.g. `2024`)
/// - `SEQUENCE` is a positive non-zero integer, unique among the live records
///   of that year, zero-padded when displayed (e.g. `0042`)
/// - `ABBREVIATION` is an uppercase alphabetic category code (e.g. `EXP`,
///   `PET`)
///
/// Examples: `2024-0042-EXP`, `2023-0007-PET`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CaseNumber {
    year: i32,
    sequence: NonZeroU32,
    abbreviation: Abbreviation,
}

impl CaseNumber {
    /// Create a case number from pre-validated components.
    #[must_use]
    pub const fn new(year: i32, sequence: NonZeroU32, abbreviation: Abbreviation) -> Self {
        Self {
            year,
            sequence,
            abbreviation,
        }
    }

    /// Returns the year component.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Returns the sequence component.
    #[must_use]
    pub const fn sequence(&self) -> NonZeroU32 {
        self.sequence
    }

    /// Returns the abbreviation component.
    #[must_use]
    pub const fn abbreviation(&self) -> &Abbreviation {
        &self.abbreviation
    }

    /// Returns a displayable representation with the specified digit width.
    ///
    /// The sequence is left-padded with `0` characters to the given width.
    /// Padding is non-destructive: a sequence wider than `digits` is printed
    /// in full.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::num::NonZeroU32;
    ///
    /// use registro::domain::number::{Abbreviation, CaseNumber};
    ///
    /// let abbr = Abbreviation::new("EXP".to_string()).unwrap();
    /// let number = CaseNumber::new(2024, NonZeroU32::new(42).unwrap(), abbr);
    ///
    /// assert_eq!(number.display(4).to_string(), "2024-0042-EXP");
    /// assert_eq!(number.display(3).to_string(), "2024-042-EXP");
    /// assert_eq!(number.display(1).to_string(), "2024-42-EXP");
    /// ```
    #[must_use]
    pub const fn display(&self, digits: usize) -> FormattedCaseNumber<'_> {
        FormattedCaseNumber {
            number: self,
            digits,
        }
    }
}

/// The default rendering pads the sequence to [`DEFAULT_DIGITS`] digits.
impl fmt::Display for CaseNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.display(DEFAULT_DIGITS).fmt(f)
    }
}

/// A wrapper type that formats a case number with a specified digit width.
///
/// This type is returned by [`CaseNumber::display`] and implements
/// [`fmt::Display`] to format the number with the configured padding.
#[derive(Debug, Clone, Copy)]
pub struct FormattedCaseNumber<'a> {
    number: &'a CaseNumber,
    digits: usize,
}

impl fmt::Display for FormattedCaseNumber<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}-{:0width$}-{}",
            self.number.year,
            self.number.sequence,
            self.number.abbreviation,
            width = self.digits
        )
    }
}

/// Errors that can occur during case number parsing or construction.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// Invalid case number format (malformed structure).
    #[error("Invalid case number format: {0}")]
    Syntax(String),

    /// Invalid year value (non-numeric).
    #[error("Invalid year in case number '{0}': expected an integer, got {1}")]
    Year(String, String),

    /// Invalid sequence value (non-numeric or zero).
    #[error("Invalid sequence in case number '{0}': expected a non-zero integer, got {1}")]
    Sequence(String, String),

    /// Invalid abbreviation (not uppercase alphabetic).
    #[error(transparent)]
    Abbreviation(InvalidAbbreviationError),
}

impl From<InvalidAbbreviationError> for Error {
    fn from(err: InvalidAbbreviationError) -> Self {
        Self::Abbreviation(err)
    }
}

impl FromStr for CaseNumber {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.starts_with('-') || s.ends_with('-') || s.contains("--") {
            return Err(Error::Syntax(s.to_string()));
        }

        let parts: Vec<&str> = s.split('-').collect();

        // Exactly YEAR-SEQUENCE-ABBREVIATION
        if parts.len() != 3 {
            return Err(Error::Syntax(s.to_string()));
        }

        let year = parts[0]
            .parse::<i32>()
            .map_err(|_| Error::Year(s.to_string(), parts[0].to_string()))?;

        let sequence_u32 = parts[1]
            .parse::<u32>()
            .map_err(|_| Error::Sequence(s.to_string(), parts[1].to_string()))?;
        let sequence = NonZeroU32::new(sequence_u32)
            .ok_or_else(|| Error::Sequence(s.to_string(), parts[1].to_string()))?;

        let abbreviation = Abbreviation::new(parts[2].to_string())?;

        Ok(Self::new(year, sequence, abbreviation))
    }
}

impl TryFrom<&str> for CaseNumber {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_str(value)
    }
}
