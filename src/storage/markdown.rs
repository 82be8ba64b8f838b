use std::{
    collections::BTreeSet,
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    number,
    record::{Category, Content, Metadata},
    CaseNumber, Record,
};

/// A record serialized in markdown format with YAML frontmatter.
///
/// The case number and title live in the first markdown heading; everything
/// machine-managed (UUID, creation time, category, tags) lives in the
/// frontmatter.
#[derive(Debug, Clone)]
pub struct MarkdownRecord {
    frontmatter: FrontMatter,
    number: CaseNumber,
    title: String,
    body: String,
}

impl MarkdownRecord {
    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let frontmatter = serde_yaml::to_string(&self.frontmatter).expect("this must never fail");

        // Construct the heading with the case number and title
        let heading = format!("# {} {}", self.number, self.title);

        let result = if self.body.is_empty() {
            format!("---\n{frontmatter}---\n{heading}\n")
        } else {
            format!("---\n{frontmatter}---\n{heading}\n\n{}\n", self.body)
        };

        writer.write_all(result.as_bytes())
    }

    pub(crate) fn read<R: BufRead>(reader: &mut R) -> Result<Self, LoadError> {
        let mut lines = reader.lines();

        // Ensure frontmatter starts correctly
        let first_line = lines
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "Empty input"))?
            .map_err(LoadError::from)?;

        if first_line.trim() != "---" {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Expected frontmatter starting with '---'",
            )
            .into());
        }

        // Collect lines until next '---'
        let frontmatter = lines
            .by_ref()
            .map_while(|line| match line {
                Ok(content) if content.trim() == "---" => None,
                Ok(content) => Some(Ok(content)),
                Err(e) => Some(Err(e)),
            })
            .collect::<Result<Vec<_>, _>>()?
            .join("\n");

        // The rest of the lines are markdown content
        let content = lines.collect::<Result<Vec<_>, _>>()?.join("\n");

        let front: FrontMatter = serde_yaml::from_str(&frontmatter)?;

        let (number, title, body) = parse_content(&content)?;

        Ok(Self {
            frontmatter: front,
            number,
            title,
            body,
        })
    }

    /// The case number found in the record's heading.
    #[must_use]
    pub(crate) const fn number(&self) -> &CaseNumber {
        &self.number
    }

    /// Writes the record to its canonical path under `root`.
    ///
    /// The filename is the formatted case number, padded with the configured
    /// digit width. Parent directories are created automatically if they
    /// don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written to.
    pub fn save(&self, root: &Path, config: &crate::domain::Config) -> io::Result<()> {
        let file_path = super::path_parser::record_path(root, &self.number, config.digits());
        self.save_to_path(&file_path)
    }

    /// Writes the record to a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written to.
    pub fn save_to_path(&self, file_path: &Path) -> io::Result<()> {
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(file_path)?;
        let mut writer = BufWriter::new(file);
        self.write(&mut writer)
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
        let file_path = super::path_parser::record_path(root, number, config.digits());

        let file = File::open(&file_path).map_err(|io_error| match io_error.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound,
            _ => LoadError::Io(io_error),
        })?;

        let mut reader = BufReader::new(file);
        Self::read(&mut reader)
    }
}

/// Parses markdown content into case number, title, and body.
///
/// The case number must be the first token in the first heading (after the
/// `#` markers), followed by the title. The body is everything after the
/// first heading.
///
/// # Errors
///
/// Returns an error if no heading is found or if the case number cannot be
/// parsed.
fn parse_content(content: &str) -> Result<(CaseNumber, String, String), LoadError> {
    // Find the first non-empty line that starts with '#'
    let (heading_line_idx, line) = content
        .lines()
        .enumerate()
        .find(|(_, line)| line.trim().starts_with('#'))
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                "No heading found in content - case number must be in the first heading",
            )
        })?;

    let trimmed = line.trim();
    let after_hashes = trimmed.trim_start_matches('#').trim();

    // Extract the first token (should be the case number)
    let first_token = after_hashes.split_whitespace().next().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidData, "No case number found in title")
    })?;

    let number = first_token.parse::<CaseNumber>().map_err(LoadError::from)?;

    // The rest after the case number is the title
    let title = after_hashes
        .strip_prefix(first_token)
        .unwrap_or("")
        .trim()
        .to_string();

    // The body is everything after the heading line
    let body = content
        .lines()
        .skip(heading_line_idx + 1)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();

    Ok((number, title, body))
}

/// Errors that can occur when loading a record from markdown.
#[derive(Debug, thiserror::Error)]
#[error("failed to read from markdown")]
pub enum LoadError {
    /// The record file was not found.
    NotFound,
    /// An I/O error occurred.
    Io(#[from] io::Error),
    /// The YAML frontmatter could not be parsed.
    Yaml(#[from] serde_yaml::Error),
    /// The case number could not be parsed.
    Number(#[from] number::Error),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(from = "FrontMatterVersion")]
#[serde(into = "FrontMatterVersion")]
struct FrontMatter {
    uuid: Uuid,
    created: DateTime<Utc>,
    category: Category,
    tags: BTreeSet<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum FrontMatterVersion {
    #[serde(rename = "1")]
    V1 {
        uuid: Uuid,
        created: DateTime<Utc>,
        category: Category,
        #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
        tags: BTreeSet<String>,
    },
}

impl From<FrontMatterVersion> for FrontMatter {
    fn from(version: FrontMatterVersion) -> Self {
        match version {
            FrontMatterVersion::V1 {
                uuid,
                created,
                category,
                tags,
            } => Self {
                uuid,
                created,
                category,
                tags,
            },
        }
    }
}

impl From<FrontMatter> for FrontMatterVersion {
    fn from(front_matter: FrontMatter) -> Self {
        let FrontMatter {
            uuid,
            created,
            category,
            tags,
        } = front_matter;
        Self::V1 {
            uuid,
            created,
            category,
            tags,
        }
    }
}

impl From<Record> for MarkdownRecord {
    fn from(record: Record) -> Self {
        let Record {
            content: Content { title, body, tags },
            metadata:
                Metadata {
                    uuid,
                    number,
                    category,
                    created,
                },
        } = record;

        let frontmatter = FrontMatter {
            uuid,
            created,
            category,
            tags,
        };

        Self {
            frontmatter,
            number,
            title,
            body,
        }
    }
}

impl From<MarkdownRecord> for Record {
    fn from(md: MarkdownRecord) -> Self {
        let MarkdownRecord {
            frontmatter:
                FrontMatter {
                    uuid,
                    created,
                    category,
                    tags,
                },
            number,
            title,
            body,
        } = md;

        Self {
            content: Content { title, body, tags },
            metadata: Metadata {
                uuid,
                number,
                category,
                created,
            },
        }
    }
}
