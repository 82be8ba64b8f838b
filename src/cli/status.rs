use std::{collections::BTreeMap, path::PathBuf, process};

use clap::Parser;
use registro::{Category, Directory};
use tracing::instrument;

use super::terminal::{is_narrow, Colorize};

#[derive(Debug, Parser, Default)]
#[command(about = "Show record counts, gaps, and counter health")]
pub struct Status {
    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress headers and format for scripting
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug)]
struct YearRow {
    year: i32,
    count: usize,
    gaps: usize,
}

impl Status {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let directory = Directory::open(root)?;

        if directory.is_empty() {
            println!("No records found yet. Create one with 'registro create'.");
            return Ok(());
        }

        let years: Vec<YearRow> = directory
            .years()
            .map(|year| YearRow {
                year,
                count: directory
                    .records()
                    .filter(|record| record.number().year() == year)
                    .count(),
                gaps: directory.gaps(year).len(),
            })
            .collect();

        let mut categories: BTreeMap<String, usize> = BTreeMap::new();
        for record in directory.records() {
            *categories
                .entry(record.category().to_string())
                .or_insert(0) += 1;
        }

        let total = directory.len();
        let gap_total: usize = years.iter().map(|row| row.gaps).sum();

        let counter = match directory.counter_value() {
            Ok(value) => Some(value),
            Err(e) => {
                eprintln!("{}", format!("Counter unreadable: {e}").warning());
                None
            }
        };

        let drift = directory.counter_drift().unwrap_or_default();

        match self.output {
            OutputFormat::Json => {
                Self::output_json(&years, &categories, total, gap_total, counter, drift)?;
            }
            OutputFormat::Table => {
                if self.quiet {
                    Self::output_quiet(total, gap_total, counter);
                } else {
                    Self::output_table(&years, &categories, total, gap_total, counter, drift);
                }
            }
        }

        // A counter behind the records will eventually hand out duplicates.
        if drift.is_some() {
            process::exit(2);
        }

        Ok(())
    }

    fn output_json(
        years: &[YearRow],
        categories: &BTreeMap<String, usize>,
        total: usize,
        gap_total: usize,
        counter: Option<u32>,
        drift: Option<registro::storage::CounterDrift>,
    ) -> anyhow::Result<()> {
        use serde_json::json;

        let year_rows: Vec<_> = years
            .iter()
            .map(|row| {
                json!({
                    "year": row.year,
                    "count": row.count,
                    "gaps": row.gaps,
                })
            })
            .collect();

        let drift_json = drift.map(|d| {
            json!({
                "value": d.value,
                "required": d.required,
            })
        });

        let output = json!({
            "years": year_rows,
            "categories": categories,
            "total": total,
            "gaps": gap_total,
            "counter": {
                "value": counter,
                "drift": drift_json,
            }
        });

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_quiet(total: usize, gap_total: usize, counter: Option<u32>) {
        let counter = counter.map_or_else(|| "-".to_string(), |value| value.to_string());
        println!("total={total} gaps={gap_total} counter={counter}");
    }

    fn output_table(
        years: &[YearRow],
        categories: &BTreeMap<String, usize>,
        total: usize,
        gap_total: usize,
        counter: Option<u32>,
        drift: Option<registro::storage::CounterDrift>,
    ) {
        let narrow = is_narrow();

        println!("Record counts");
        println!("{}", "─────────────".dim());

        if narrow {
            // Stacked output for narrow terminals
            for row in years {
                println!("{}: {} ({} gaps)", row.year, row.count, row.gaps);
            }
            println!("Total: {total}");
        } else {
            println!("{:<6} {:<6} Gaps", "Year", "Count");
            for row in years {
                println!("{:<6} {:<6} {}", row.year, row.count, row.gaps);
            }
            println!("Total  {total}");
        }

        println!();

        for category in [Category::Expression, Category::Petition] {
            let count = categories.get(category.as_str()).copied().unwrap_or(0);
            println!("{}: {count}", category.as_str().info());
        }

        println!();

        if gap_total == 0 {
            println!("Gaps: {} ✅", "0".success());
        } else {
            println!("Gaps: {}", gap_total.to_string().warning());
            println!("{}", "Run 'registro gaps' to list reusable numbers.".dim());
        }

        println!();

        match counter {
            Some(value) => match drift {
                None => println!("Counter: {} ✅", value.to_string().success()),
                Some(d) => {
                    println!(
                        "Counter: {} ⚠️  (must be at least {})",
                        d.value.to_string().warning(),
                        d.required
                    );
                    println!(
                        "{}",
                        "A counter behind the records will hand out duplicate numbers.".dim()
                    );
                }
            },
            None => println!("Counter: {}", "unreadable".warning()),
        }
    }
}
