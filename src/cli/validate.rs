use std::path::PathBuf;

use clap::Parser;
use registro::{storage::OpenError, Directory};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Validate records and counter health")]
pub struct Validate {
    /// Types of checks to run (can be specified multiple times)
    #[arg(long, value_name = "TYPE")]
    check: Vec<CheckType>,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress all output except errors
    #[arg(long, short)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum, PartialEq, Eq)]
enum CheckType {
    /// Check record files (filenames, frontmatter, headings)
    Structure,
    /// Check the counter against the live records
    Counter,
    /// Run all checks
    All,
}

#[derive(Debug, Default)]
struct ValidationResult {
    unrecognised: Vec<PathBuf>,
    duplicates: Vec<String>,
    non_canonical: Vec<PathBuf>,
    counter_issues: Vec<String>,
}

impl Validate {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let checks = if self.check.is_empty() || self.check.contains(&CheckType::All) {
            vec![CheckType::Structure, CheckType::Counter]
        } else {
            self.check.clone()
        };

        let mut result = ValidationResult::default();

        // Unrecognised files surface when the directory is opened, and
        // without a directory there is no counter to check.
        let directory = match Directory::open(root) {
            Ok(directory) => Some(directory),
            Err(OpenError::UnrecognisedFiles(paths)) => {
                result.unrecognised = paths;
                None
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(directory) = &directory {
            if checks.contains(&CheckType::Structure) {
                Self::check_structure(directory, &mut result);
            }
            if checks.contains(&CheckType::Counter) {
                Self::check_counter(directory, &mut result);
            }
        }

        if !checks.contains(&CheckType::Structure) {
            result.unrecognised.clear();
        }

        match self.output {
            OutputFormat::Table => self.output_table(&result, directory.as_ref()),
            OutputFormat::Json => Self::output_json(&result)?,
            OutputFormat::Summary => Self::output_summary(&result),
        }

        if count_issues(&result) > 0 {
            std::process::exit(2);
        }

        Ok(())
    }

    fn check_structure(directory: &Directory, result: &mut ValidationResult) {
        let digits = directory.config().digits();
        for number in directory.duplicate_numbers() {
            result
                .duplicates
                .push(number.display(digits).to_string());
        }
        result.non_canonical = directory.non_canonical_files();
    }

    fn check_counter(directory: &Directory, result: &mut ValidationResult) {
        match directory.counter_drift() {
            Ok(None) => {}
            Ok(Some(drift)) => result.counter_issues.push(format!(
                "counter is {} but must be at least {}",
                drift.value, drift.required
            )),
            Err(e) => result
                .counter_issues
                .push(format!("counter unreadable: {e}")),
        }
    }

    fn output_table(&self, result: &ValidationResult, directory: Option<&Directory>) {
        if self.quiet {
            return;
        }

        println!("Validating records...\n");

        if result.unrecognised.is_empty()
            && result.duplicates.is_empty()
            && result.non_canonical.is_empty()
        {
            let count = directory.map_or(0, Directory::len);
            println!("✓ Structure:  {count} records, all recognised");
        } else {
            if !result.unrecognised.is_empty() {
                println!(
                    "{}",
                    format!(
                        "✗ Structure:  {} unrecognised files",
                        result.unrecognised.len()
                    )
                    .warning()
                );
                for path in &result.unrecognised {
                    println!("    • {}", path.display());
                }
            }
            if !result.duplicates.is_empty() {
                println!(
                    "{}",
                    format!(
                        "✗ Structure:  {} contested sequence slots",
                        result.duplicates.len()
                    )
                    .warning()
                );
                for number in &result.duplicates {
                    println!("    • {number}");
                }
            }
            if !result.non_canonical.is_empty() {
                println!(
                    "{}",
                    format!(
                        "✗ Structure:  {} non-canonical filenames",
                        result.non_canonical.len()
                    )
                    .warning()
                );
                for path in &result.non_canonical {
                    println!("    • {}", path.display());
                }
            }
        }

        if result.counter_issues.is_empty() {
            if directory.is_some() {
                println!("✓ Counter:    At least one past the highest live sequence");
            } else {
                println!("- Counter:    Skipped (directory could not be opened)");
            }
        } else {
            for issue in &result.counter_issues {
                println!("{}", format!("✗ Counter:    {issue}").warning());
            }
        }

        let total_issues = count_issues(result);
        if total_issues == 0 {
            println!("\n{}", "Records are healthy (0 issues)".success());
        } else {
            println!(
                "\n{}",
                format!("Summary: {total_issues} issues found").warning()
            );
            if !result.unrecognised.is_empty() {
                println!(
                    "\n{}",
                    "Fix or remove unrecognised files, or set allow_unrecognised = true.".dim()
                );
            }
            if !result.non_canonical.is_empty() {
                println!(
                    "\n{}",
                    "Rename non-canonical files to their padded spelling.".dim()
                );
            }
        }
    }

    fn output_json(result: &ValidationResult) -> anyhow::Result<()> {
        use serde_json::json;

        let total_issues = count_issues(result);

        let output = json!({
            "status": if total_issues == 0 { "healthy" } else { "issues_found" },
            "issues": {
                "unrecognised": result.unrecognised,
                "duplicates": result.duplicates,
                "non_canonical": result.non_canonical,
                "counter": result.counter_issues,
            },
            "summary": {
                "total_issues": total_issues,
            }
        });

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_summary(result: &ValidationResult) {
        let total = count_issues(result);
        println!("issues={total}");
    }
}

fn count_issues(result: &ValidationResult) -> usize {
    result.unrecognised.len()
        + result.duplicates.len()
        + result.non_canonical.len()
        + result.counter_issues.len()
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
    Summary,
}
