use std::{num::NonZeroU32, path::PathBuf};

mod list;
mod show;
mod status;
mod terminal;
mod validate;

use chrono::{Datelike, Utc};
use clap::ArgAction;
use list::List;
use registro::{CaseNumber, Category, Directory, NumberSource};
use show::Show;
use status::Status;
use tracing::instrument;
use validate::Validate;

/// Parse a case number from a string, normalizing to uppercase.
///
/// This is a CLI boundary function that accepts lowercase input
/// and normalizes it before parsing.
fn parse_number(s: &str) -> Result<CaseNumber, String> {
    let uppercase = s.to_uppercase();
    uppercase.parse().map_err(|e| format!("{e}"))
}

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global=true)]
    verbose: u8,

    /// The path to the root of the records directory
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command
            .unwrap_or_else(|| Command::Status(Status::default()))
            .run(self.root)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Show directory status (default)
    Status(Status),

    /// Initialize a new records directory
    Init,

    /// Create a new record
    Create(Create),

    /// Delete a record
    Delete(Delete),

    /// List the reusable number gaps of a year
    Gaps(Gaps),

    /// Validate records and counter health
    Validate(Validate),

    /// Show detailed information about a record
    Show(Show),

    /// List records with filters
    List(List),

    /// Show or modify configuration settings
    Config(Config),
}

impl Command {
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        match self {
            Self::Status(command) => command.run(root)?,
            Self::Init => Init::run(&root)?,
            Self::Create(command) => command.run(root)?,
            Self::Delete(command) => command.run(root)?,
            Self::Gaps(command) => command.run(root)?,
            Self::Validate(command) => command.run(root)?,
            Self::Show(command) => command.run(root)?,
            Self::List(command) => command.run(root)?,
            Self::Config(command) => command.run(&root)?,
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Init {}

impl Init {
    #[instrument]
    fn run(root: &PathBuf) -> anyhow::Result<()> {
        let config = registro::storage::config_path(root);
        if config.exists() {
            anyhow::bail!("Directory already initialized (found existing {})", config.display());
        }

        Directory::init(root).map_err(|e| anyhow::anyhow!("Failed to initialize: {e}"))?;

        println!("Initialized records directory in {}", root.display());
        println!("  Created: .registro/config.toml");
        println!("  Created: .registro/counter.toml");
        println!();
        println!("Next steps:");
        println!("  registro create expression --title \"Your First Record\"");

        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Create {
    /// The category of record to create ('expression' or 'petition').
    category: Category,

    /// The year component of the case number (defaults to the current year).
    #[clap(long, short)]
    year: Option<i32>,

    /// The title of the record.
    #[clap(long, short)]
    title: Option<String>,

    /// The body text of the record.
    #[clap(long, short)]
    body: Option<String>,

    /// Reuse a freed sequence number instead of allocating a new one.
    #[clap(long, value_name = "SEQ")]
    reuse: Option<NonZeroU32>,

    /// Pick a freed sequence number from an interactive list of gaps.
    #[clap(long, conflicts_with = "reuse")]
    pick: bool,
}

impl Create {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        use terminal::Colorize;

        let mut directory = Directory::open(root)?;
        let digits = directory.config().digits();
        let year = self.year.unwrap_or_else(|| Utc::now().year());

        let source = if let Some(sequence) = self.reuse {
            NumberSource::Reuse(sequence)
        } else if self.pick {
            Self::pick_gap(&directory, year, self.category)?
        } else {
            NumberSource::Next
        };

        let record = directory.create(
            self.category,
            year,
            self.title.unwrap_or_default(),
            self.body.unwrap_or_default(),
            source,
        )?;

        println!(
            "{}",
            format!("Created record {}", record.number().display(digits)).success()
        );
        Ok(())
    }

    fn pick_gap(
        directory: &Directory,
        year: i32,
        category: Category,
    ) -> anyhow::Result<NumberSource> {
        let digits = directory.config().digits();
        let gaps = directory.gap_numbers(year, category);
        if gaps.is_empty() {
            anyhow::bail!("No gaps to reuse in {year}");
        }

        let items: Vec<String> = gaps
            .iter()
            .map(|number| number.display(digits).to_string())
            .collect();

        let selection = dialoguer::Select::new()
            .with_prompt("Reuse which number?")
            .items(&items)
            .default(0)
            .interact_opt()?;

        let Some(index) = selection else {
            println!("Cancelled");
            std::process::exit(130);
        };

        Ok(NumberSource::Reuse(gaps[index].sequence()))
    }
}

#[derive(Debug, clap::Parser)]
pub struct Delete {
    /// The case number of the record to delete
    #[clap(value_parser = parse_number)]
    number: CaseNumber,

    /// Skip confirmation prompts
    #[arg(long, short)]
    yes: bool,
}

impl Delete {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        use terminal::Colorize;

        let mut directory = Directory::open(root)?;
        let digits = directory.config().digits();

        let Some(record) = directory.find(&self.number) else {
            anyhow::bail!("Record {} not found", self.number.display(digits));
        };
        let number = record.number().clone();

        if !self.yes {
            println!("Will delete {} ({})", number.display(digits), record.title());

            let confirmed = dialoguer::Confirm::new()
                .with_prompt("Proceed?")
                .default(false)
                .interact_opt()?;
            if confirmed != Some(true) {
                println!("Cancelled");
                std::process::exit(130);
            }
        }

        directory.delete(&number)?;

        println!(
            "{}",
            format!("Deleted record {}", number.display(digits)).success()
        );
        println!(
            "{}",
            "The freed number can be reused with 'registro create --pick'.".dim()
        );
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Gaps {
    /// The year to scan (defaults to every year with records)
    year: Option<i32>,

    /// The category used to format the reusable numbers
    #[clap(long, short, default_value_t = Category::Expression)]
    category: Category,

    /// Print bare numbers only
    #[arg(long)]
    quiet: bool,
}

impl Gaps {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        use terminal::Colorize;

        let directory = Directory::open(root)?;
        let digits = directory.config().digits();

        let years: Vec<i32> = match self.year {
            Some(year) => vec![year],
            None => directory.years().collect(),
        };

        let mut total = 0;
        for year in years {
            for number in directory.gap_numbers(year, self.category) {
                total += 1;
                println!("{}", number.display(digits));
            }
        }

        if total == 0 && !self.quiet {
            println!("{}", "No gaps: every sequence up to the maximum is live.".info());
        }

        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Config {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Debug, clap::Parser)]
enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key to set
        key: String,

        /// Value to set
        value: String,
    },
}

impl Config {
    #[instrument]
    fn run(self, root: &std::path::Path) -> anyhow::Result<()> {
        use terminal::Colorize;

        let config_path = registro::storage::config_path(root);

        match self.command {
            ConfigCommand::Show => {
                let config = Self::load(&config_path)?;

                println!("Configuration:");
                println!("  digits: {}", config.digits());
                println!("  allow_unrecognised: {}", config.allow_unrecognised);
                for category in [Category::Expression, Category::Petition] {
                    println!(
                        "  abbreviation.{category}: {}",
                        config.abbreviation_for(category)
                    );
                }
            }
            ConfigCommand::Set { key, value } => {
                let mut config = Self::load(&config_path)?;

                match key.as_str() {
                    "digits" => {
                        let digits = value
                            .parse::<usize>()
                            .map_err(|_| anyhow::anyhow!("Value must be a positive integer"))?;
                        config.set_digits(digits);
                    }
                    "allow_unrecognised" => {
                        let allowed = value
                            .parse::<bool>()
                            .map_err(|_| anyhow::anyhow!("Value must be 'true' or 'false'"))?;
                        config.allow_unrecognised = allowed;
                    }
                    "abbreviation.expression" | "abbreviation.petition" => {
                        let category: Category = key
                            .strip_prefix("abbreviation.")
                            .unwrap_or_default()
                            .parse()?;
                        let abbreviation = registro::Abbreviation::new(value.to_uppercase())
                            .map_err(|e| anyhow::anyhow!("{e}"))?;
                        config.set_abbreviation(category, &abbreviation);
                    }
                    _ => {
                        return Err(anyhow::anyhow!(
                            "Unknown configuration key: '{key}'\nSupported keys: digits, \
                             allow_unrecognised, abbreviation.expression, abbreviation.petition",
                        ));
                    }
                }

                if let Some(parent) = config_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                config
                    .save(&config_path)
                    .map_err(|e| anyhow::anyhow!("{e}"))?;

                println!("{}", format!("Set {key} = {value}").success());
            }
        }

        Ok(())
    }

    fn load(config_path: &std::path::Path) -> anyhow::Result<registro::Config> {
        if config_path.exists() {
            registro::Config::load(config_path).map_err(|e| anyhow::anyhow!("{e}"))
        } else {
            Ok(registro::Config::default())
        }
    }
}
