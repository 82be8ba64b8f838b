use std::{collections::BTreeSet, fmt, io, path::Path, str::FromStr};

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[doc(hidden)]
pub use crate::storage::markdown::LoadError;
use crate::{domain::CaseNumber, storage::markdown::MarkdownRecord};

/// The category of a tracked record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// A citizen expression submitted to the office.
    Expression,
    /// A legislative petition.
    Petition,
}

impl Category {
    /// Returns the lowercase identifier used in configuration and
    /// frontmatter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Expression => "expression",
            Self::Petition => "petition",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a recognised category.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Unknown category '{0}': expected 'expression' or 'petition'")]
pub struct UnknownCategoryError(String);

impl FromStr for Category {
    type Err = UnknownCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "expression" => Ok(Self::Expression),
            "petition" => Ok(Self::Petition),
            other => Err(UnknownCategoryError(other.to_string())),
        }
    }
}

/// A tracked record: a citizen expression or a legislative petition.
///
/// Records are identified by a stable UUID and by a human-readable
/// [`CaseNumber`] unique among the live records of its year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// The record's content (title, markdown body, tags).
    pub(crate) content: Content,
    /// The record's metadata (UUID, case number, category, creation time).
    pub(crate) metadata: Metadata,
}

/// The operator-authored content of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Content {
    /// Short title shown in listings.
    pub(crate) title: String,
    /// Markdown body of the record.
    pub(crate) body: String,
    /// Set of tags associated with the record.
    pub(crate) tags: BTreeSet<String>,
}

/// Record metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Metadata {
    /// Globally unique, perpetually stable identifier.
    pub(crate) uuid: Uuid,

    /// Human-readable case number.
    ///
    /// Unique among live records of the same year; may be reassigned only by
    /// deleting and recreating the record.
    pub(crate) number: CaseNumber,

    /// The record's category.
    pub(crate) category: Category,

    /// Timestamp recording when the record was created.
    pub(crate) created: DateTime<Utc>,
}

impl Record {
    /// Construct a new [`Record`] from its case number, category, and
    /// content.
    ///
    /// A new UUID is automatically generated.
    #[must_use]
    pub(crate) fn new(number: CaseNumber, category: Category, title: String, body: String) -> Self {
        Self::new_with_uuid(number, category, title, body, Uuid::new_v4())
    }

    pub(crate) fn new_with_uuid(
        number: CaseNumber,
        category: Category,
        title: String,
        body: String,
        uuid: Uuid,
    ) -> Self {
        let content = Content {
            title,
            body,
            tags: BTreeSet::default(),
        };

        let metadata = Metadata {
            uuid,
            number,
            category,
            created: Utc::now(),
        };

        Self { content, metadata }
    }

    /// The record's stable unique identifier.
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.metadata.uuid
    }

    /// The record's human-readable case number.
    #[must_use]
    pub const fn number(&self) -> &CaseNumber {
        &self.metadata.number
    }

    /// The record's category.
    #[must_use]
    pub const fn category(&self) -> Category {
        self.metadata.category
    }

    /// When the record was created.
    #[must_use]
    pub const fn created(&self) -> DateTime<Utc> {
        self.metadata.created
    }

    /// The record's title, shown in listings.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.content.title
    }

    /// The markdown body of the record.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.content.body
    }

    /// Tags associated with the record.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.content.tags.iter().map(String::as_str)
    }

    /// Writes the record to its canonical path under `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written to.
    pub fn save(&self, root: &Path, config: &crate::domain::Config) -> io::Result<()> {
        MarkdownRecord::from(self.clone()).save(root, config)
    }

    /// Reads the record with the given case number from `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be found, read, or parsed.
    pub fn load(
        root: &Path,
        number: &CaseNumber,
        config: &crate::domain::Config,
    ) -> Result<Self, LoadError> {
        let md = MarkdownRecord::load(root, number, config)?;
        Ok(Self::from(md))
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use super::*;
    use crate::domain::Abbreviation;

    fn number() -> CaseNumber {
        CaseNumber::new(
            2024,
            NonZeroU32::new(7).unwrap(),
            Abbreviation::new("EXP".to_string()).unwrap(),
        )
    }

    #[test]
    fn new_record_has_fresh_uuid() {
        let a = Record::new(
            number(),
            Category::Expression,
            "Title".to_string(),
            String::new(),
        );
        let b = Record::new(
            number(),
            Category::Expression,
            "Title".to_string(),
            String::new(),
        );
        assert_ne!(a.uuid(), b.uuid());
    }

    #[test]
    fn accessors_return_constructed_values() {
        let record = Record::new(
            number(),
            Category::Petition,
            "A petition".to_string(),
            "Body text".to_string(),
        );
        assert_eq!(record.number(), &number());
        assert_eq!(record.category(), Category::Petition);
        assert_eq!(record.title(), "A petition");
        assert_eq!(record.body(), "Body text");
        assert_eq!(record.tags().count(), 0);
    }

    #[test]
    fn category_parsing_is_case_insensitive() {
        assert_eq!("Expression".parse::<Category>(), Ok(Category::Expression));
        assert_eq!("PETITION".parse::<Category>(), Ok(Category::Petition));
        assert!("proposal".parse::<Category>().is_err());
    }

    #[test]
    fn category_display_round_trips() {
        for category in [Category::Expression, Category::Petition] {
            assert_eq!(category.to_string().parse::<Category>(), Ok(category));
        }
    }
}
