use std::{cmp::Ordering, path::PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use registro::{storage::record_path, Category, Directory};
use serde::Serialize;
use tracing::instrument;

const DEFAULT_LIMIT: usize = 200;

/// Command arguments for `registro list`.
#[derive(Debug, Parser)]
#[command(about = "List records with filters")]
pub struct List {
    /// Columns to display (comma-separated).
    #[arg(long, value_delimiter = ',', value_name = "COL")]
    columns: Vec<ListColumn>,

    /// Sort field (default: number).
    #[arg(long, value_enum, default_value_t)]
    sort: SortField,

    /// Output format (default: table).
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,

    /// Suppress headers and format rows for scripting.
    #[arg(long)]
    quiet: bool,

    /// Filter by year (comma-separated).
    #[arg(long, value_delimiter = ',', value_name = "YEAR")]
    year: Vec<i32>,

    /// Filter by category (comma-separated, case-insensitive).
    #[arg(long, value_delimiter = ',', value_name = "CATEGORY")]
    category: Vec<Category>,

    /// Filter by tag (comma-separated, case-insensitive).
    #[arg(long, value_delimiter = ',', value_name = "TAG")]
    tag: Vec<String>,

    /// Case-insensitive substring match against title/body.
    #[arg(long)]
    contains: Option<String>,

    /// Limit number of rows returned.
    #[arg(long)]
    limit: Option<usize>,

    /// Skip the first N rows.
    #[arg(long)]
    offset: Option<usize>,
}

/// Supported output formats.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

/// Sortable fields.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum SortField {
    #[default]
    Number,
    Title,
    Category,
    Created,
}

/// Available table columns.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum ListColumn {
    #[default]
    Number,
    Title,
    Category,
    Tags,
    Path,
    Created,
}

/// Parsed record snapshot used for listing.
#[derive(Debug, Clone)]
struct Entry {
    year: i32,
    sequence: u32,
    number: String,
    title: String,
    category: Category,
    tags: Vec<String>,
    created: DateTime<Utc>,
    body: String,
    path: PathBuf,
}

#[derive(Debug, Clone)]
struct Filters {
    years: Vec<i32>,
    categories: Vec<Category>,
    tags: Vec<String>,
    contains: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct SerializableRow<'a> {
    number: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created: Option<String>,
}

impl List {
    #[instrument(level = "debug", skip_all)]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let directory = Directory::open(root)?;

        let mut entries = collect_entries(&directory);

        let filters = Filters::new(&self);
        entries.retain(|entry| filters.matches(entry));

        entries.sort_by(|a, b| compare_entries(a, b, self.sort));

        let effective_limit = self
            .limit
            .and_then(|value| (value > 0).then_some(value))
            .unwrap_or(DEFAULT_LIMIT);

        let entries = apply_offset_limit(entries, self.offset, effective_limit);

        render_entries(&entries, &self.columns, self.output, self.quiet)
    }
}

impl Filters {
    fn new(cmd: &List) -> Self {
        Self {
            years: cmd.year.clone(),
            categories: cmd.category.clone(),
            tags: cmd
                .tag
                .iter()
                .map(String::as_str)
                .map(str::to_ascii_lowercase)
                .collect(),
            contains: cmd.contains.as_deref().map(str::to_ascii_lowercase),
        }
    }

    fn matches(&self, entry: &Entry) -> bool {
        if !self.years.is_empty() && !self.years.contains(&entry.year) {
            return false;
        }

        if !self.categories.is_empty() && !self.categories.contains(&entry.category) {
            return false;
        }

        if !self.tags.is_empty() {
            let tag_set: Vec<String> = entry
                .tags
                .iter()
                .map(String::as_str)
                .map(str::to_ascii_lowercase)
                .collect();
            if !self
                .tags
                .iter()
                .any(|tag| tag_set.iter().any(|entry_tag| entry_tag == tag))
            {
                return false;
            }
        }

        if let Some(search) = &self.contains {
            if !entry.title.to_ascii_lowercase().contains(search)
                && !entry.body.to_ascii_lowercase().contains(search)
            {
                return false;
            }
        }

        true
    }
}

fn collect_entries(directory: &Directory) -> Vec<Entry> {
    let digits = directory.config().digits();

    directory
        .records()
        .map(|record| {
            let number = record.number();
            Entry {
                year: number.year(),
                sequence: number.sequence().get(),
                number: number.display(digits).to_string(),
                title: record.title().to_string(),
                category: record.category(),
                tags: record.tags().map(str::to_string).collect(),
                created: record.created(),
                body: record.body().to_string(),
                path: directory
                    .record_file(number)
                    .unwrap_or_else(|| record_path(directory.root(), number, digits)),
            }
        })
        .collect()
}

fn compare_entries(a: &Entry, b: &Entry, sort_field: SortField) -> Ordering {
    let by_number = |a: &Entry, b: &Entry| (a.year, a.sequence).cmp(&(b.year, b.sequence));

    match sort_field {
        SortField::Number => by_number(a, b),
        SortField::Title => a.title.cmp(&b.title).then_with(|| by_number(a, b)),
        SortField::Category => a.category.cmp(&b.category).then_with(|| by_number(a, b)),
        SortField::Created => a.created.cmp(&b.created).then_with(|| by_number(a, b)),
    }
}

fn apply_offset_limit(mut entries: Vec<Entry>, offset: Option<usize>, limit: usize) -> Vec<Entry> {
    if let Some(off) = offset {
        if off < entries.len() {
            entries = entries.into_iter().skip(off).collect();
        } else {
            entries.clear();
        }
    }

    entries.truncate(limit);
    entries
}

fn render_entries(
    entries: &[Entry],
    columns: &[ListColumn],
    output: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    match output {
        OutputFormat::Table => {
            render_table(entries, columns, quiet);
            Ok(())
        }
        OutputFormat::Json => render_json(entries, columns),
        OutputFormat::Csv => {
            render_csv(entries, columns, quiet);
            Ok(())
        }
    }
}

fn render_table(entries: &[Entry], columns: &[ListColumn], quiet: bool) {
    let selected_columns = if columns.is_empty() {
        if quiet {
            vec![ListColumn::Number]
        } else {
            vec![
                ListColumn::Number,
                ListColumn::Title,
                ListColumn::Category,
                ListColumn::Tags,
            ]
        }
    } else {
        columns.to_vec()
    };

    let mut headers = Vec::new();
    let mut data: Vec<Vec<String>> = Vec::new();

    if !quiet {
        headers = selected_columns
            .iter()
            .map(|column| column.header().to_string())
            .collect();
    }

    for entry in entries {
        let row: Vec<String> = selected_columns
            .iter()
            .map(|column| column.value(entry))
            .collect();
        data.push(row);
    }

    if quiet {
        for row in data {
            println!("{}", row.join("\t"));
        }
        return;
    }

    // Determine column widths for alignment.
    let widths = headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            data.iter()
                .map(|row| row[idx].len())
                .max()
                .unwrap_or(0)
                .max(header.len())
        })
        .collect::<Vec<_>>();

    if !headers.is_empty() {
        for (header, width) in headers.iter().zip(&widths) {
            print!("{header:<width$}  ");
        }
        println!();

        for width in &widths {
            print!("{:-<width$}  ", "");
        }
        println!();
    }

    for row in data {
        for (idx, value) in row.iter().enumerate() {
            let width = widths[idx];
            print!("{value:<width$}  ");
        }
        println!();
    }
}

fn render_json(entries: &[Entry], columns: &[ListColumn]) -> anyhow::Result<()> {
    let selected_columns = if columns.is_empty() {
        vec![
            ListColumn::Number,
            ListColumn::Title,
            ListColumn::Category,
            ListColumn::Tags,
            ListColumn::Path,
            ListColumn::Created,
        ]
    } else {
        columns.to_vec()
    };

    let rows: Vec<_> = entries
        .iter()
        .map(|entry| build_serializable_row(entry, &selected_columns))
        .collect();

    serde_json::to_writer_pretty(std::io::stdout(), &rows)
        .context("failed to render json output")?;
    println!();
    Ok(())
}

fn render_csv(entries: &[Entry], columns: &[ListColumn], quiet: bool) {
    let selected_columns = if columns.is_empty() {
        vec![
            ListColumn::Number,
            ListColumn::Title,
            ListColumn::Category,
            ListColumn::Tags,
            ListColumn::Path,
        ]
    } else {
        columns.to_vec()
    };

    if !quiet {
        let header_line = selected_columns
            .iter()
            .map(|column| csv_escape(column.header()))
            .collect::<Vec<_>>()
            .join(",");
        println!("{header_line}");
    }

    for entry in entries {
        let values = selected_columns
            .iter()
            .map(|column| csv_escape(&column.value(entry)))
            .collect::<Vec<_>>();
        println!("{}", values.join(","));
    }
}

fn build_serializable_row<'a>(entry: &'a Entry, columns: &[ListColumn]) -> SerializableRow<'a> {
    let mut row = SerializableRow {
        number: &entry.number,
        title: None,
        category: None,
        tags: None,
        path: None,
        created: None,
    };

    for column in columns {
        match column {
            ListColumn::Number => {}
            ListColumn::Title => {
                row.title = Some(&entry.title);
            }
            ListColumn::Category => {
                row.category = Some(entry.category.as_str());
            }
            ListColumn::Tags => {
                if !entry.tags.is_empty() {
                    row.tags = Some(entry.tags.join(", "));
                }
            }
            ListColumn::Path => {
                row.path = Some(entry.path.display().to_string());
            }
            ListColumn::Created => {
                row.created = Some(entry.created.to_rfc3339());
            }
        }
    }

    row
}

fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        let escaped = value.replace('"', "\"\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}

impl ListColumn {
    const fn header(self) -> &'static str {
        match self {
            Self::Number => "Number",
            Self::Title => "Title",
            Self::Category => "Category",
            Self::Tags => "Tags",
            Self::Path => "Path",
            Self::Created => "Created",
        }
    }

    fn value(self, entry: &Entry) -> String {
        match self {
            Self::Number => entry.number.clone(),
            Self::Title => entry.title.clone(),
            Self::Category => entry.category.as_str().to_string(),
            Self::Tags => entry.tags.join(", "),
            Self::Path => entry.path.display().to_string(),
            Self::Created => entry.created.to_rfc3339(),
        }
    }
}
