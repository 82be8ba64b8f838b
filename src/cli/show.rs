use std::path::{Path, PathBuf};

use clap::Parser;
use registro::{storage::record_path, CaseNumber, Directory, Record};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Display detailed information about a record")]
pub struct Show {
    /// The case number of the record to display
    #[clap(value_parser = super::parse_number)]
    number: CaseNumber,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "pretty")]
    output: OutputFormat,

    /// Include the full markdown body in output
    #[arg(long)]
    with_content: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Pretty,
    Json,
    Markdown,
    Raw,
}

impl Show {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let directory = Directory::open(root)?;
        let digits = directory.config().digits();

        let Some(record) = directory.find(&self.number) else {
            eprintln!("Record {} not found", self.number.display(digits));
            std::process::exit(1);
        };

        // The on-disk spelling can differ from the canonical padded name.
        let path = directory
            .record_file(&self.number)
            .unwrap_or_else(|| record_path(directory.root(), &self.number, digits));

        match self.output {
            OutputFormat::Pretty => self.output_pretty(record, &path, digits),
            OutputFormat::Json => self.output_json(record, &path, digits)?,
            OutputFormat::Markdown => self.output_markdown(record, digits),
            OutputFormat::Raw => Self::output_raw(&path)?,
        }

        Ok(())
    }

    fn output_pretty(&self, record: &Record, path: &Path, digits: usize) {
        println!("# {}", record.number().display(digits));
        println!("{}\n", record.title());

        println!("{}", "Metadata".dim());
        println!("  Category: {}", record.category());
        println!("  UUID:     {}", record.uuid());
        println!("  Created:  {}", record.created());
        println!("  Path:     {}", path.display());

        let tags: Vec<&str> = record.tags().collect();
        if !tags.is_empty() {
            println!("\n{}", "Tags".dim());
            for tag in tags {
                println!("  • {tag}");
            }
        }

        if self.with_content && !record.body().is_empty() {
            println!("\n{}", "Content".dim());
            println!("{}", record.body());
        }
    }

    fn output_json(&self, record: &Record, path: &Path, digits: usize) -> anyhow::Result<()> {
        use serde_json::json;

        let tags: Vec<&str> = record.tags().collect();

        let mut output = json!({
            "number": record.number().display(digits).to_string(),
            "category": record.category().as_str(),
            "uuid": record.uuid().to_string(),
            "created": record.created().to_rfc3339(),
            "title": record.title(),
            "tags": tags,
            "path": path,
        });

        if self.with_content {
            output["body"] = json!(record.body());
        }

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_markdown(&self, record: &Record, digits: usize) {
        println!("# {} {}\n", record.number().display(digits), record.title());

        println!("| Property | Value |");
        println!("| --- | --- |");
        println!("| Category | {} |", record.category());
        println!("| UUID | `{}` |", record.uuid());
        println!("| Created | {} |", record.created());

        if self.with_content && !record.body().is_empty() {
            println!("\n## Content\n");
            println!("{}", record.body());
        }
    }

    fn output_raw(path: &Path) -> anyhow::Result<()> {
        // The file on disk, byte for byte.
        let content = std::fs::read_to_string(path)?;
        print!("{content}");
        Ok(())
    }
}
