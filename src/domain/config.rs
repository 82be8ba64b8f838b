use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};

use crate::domain::{number::Abbreviation, record::Category};

/// Configuration for the registry.
///
/// This struct holds settings that control how case numbers are rendered and
/// how the records directory is scanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// The number of digits in the sequence component of a case number.
    ///
    /// Sequences are padded to this width with leading zeros.
    /// For example, '0042' (4 digits) or '042' (3 digits).
    digits: usize,

    /// Whether to allow the records directory to contain markdown files with
    /// names that are not valid case numbers.
    pub allow_unrecognised: bool,

    /// Category abbreviations, keyed by category identifier
    /// (`expression`, `petition`).
    ///
    /// A category without a configured abbreviation falls back to the fixed
    /// fallback code.
    abbreviations: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            digits: default_digits(),
            allow_unrecognised: false,
            abbreviations: default_abbreviations(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or
    /// if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// Returns the number of digits for padding sequence numbers.
    #[must_use]
    pub const fn digits(&self) -> usize {
        self.digits
    }

    /// Sets the number of digits for padding sequence numbers.
    pub const fn set_digits(&mut self, digits: usize) {
        self.digits = digits;
    }

    /// Resolves the abbreviation for a category.
    ///
    /// Falls back to the fixed fallback code when the category has no
    /// configured abbreviation, or when the configured value is not a valid
    /// abbreviation.
    #[must_use]
    pub fn abbreviation_for(&self, category: Category) -> Abbreviation {
        self.abbreviations
            .get(category.as_str())
            .and_then(|raw| match Abbreviation::new(raw.clone()) {
                Ok(abbreviation) => Some(abbreviation),
                Err(e) => {
                    tracing::debug!("Ignoring configured abbreviation for {category}: {e}");
                    None
                }
            })
            .unwrap_or_else(Abbreviation::fallback)
    }

    /// Sets the abbreviation for a category.
    pub fn set_abbreviation(&mut self, category: Category, abbreviation: &Abbreviation) {
        self.abbreviations
            .insert(category.as_str().to_string(), abbreviation.to_string());
    }
}

const fn default_digits() -> usize {
    4
}

fn default_abbreviations() -> BTreeMap<String, String> {
    BTreeMap::from([
        (Category::Expression.as_str().to_string(), "EXP".to_string()),
        (Category::Petition.as_str().to_string(), "PET".to_string()),
    ])
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the
/// domain type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        /// The number of digits in the sequence component of a case number.
        #[serde(default = "default_digits")]
        digits: usize,

        #[serde(default)]
        allow_unrecognised: bool,

        #[serde(default = "default_abbreviations")]
        abbreviations: BTreeMap<String, String>,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                digits,
                allow_unrecognised,
                abbreviations,
            } => Self {
                digits,
                allow_unrecognised,
                abbreviations,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            digits: config.digits,
            allow_unrecognised: config.allow_unrecognised,
            abbreviations: config.abbreviations,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn load_reads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"_version = \"1\"\ndigits = 3\nallow_unrecognised = true\n\n[abbreviations]\nexpression = \"ASG\"\n",
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.digits(), 3);
        assert!(config.allow_unrecognised);
        assert_eq!(
            config.abbreviation_for(Category::Expression).as_str(),
            "ASG"
        );
    }

    #[test]
    fn load_missing_file_returns_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.toml");

        let error = Config::load(&missing).unwrap_err();
        assert!(error.starts_with("Failed to read config file:"));
    }

    #[test]
    fn load_invalid_toml_returns_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"_version = \"1\"\ndigits = \"four\"\n")
            .unwrap();

        let error = Config::load(file.path()).unwrap_err();
        assert!(error.starts_with("Failed to parse config file:"));
    }

    #[test]
    fn empty_file_returns_default() {
        // Deserialising a version tag alone yields the default configuration.
        let expected = Config::default();
        let actual: Config = toml::from_str(r#"_version = "1""#).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn default_abbreviations_are_configured() {
        let config = Config::default();
        assert_eq!(
            config.abbreviation_for(Category::Expression).as_str(),
            "EXP"
        );
        assert_eq!(config.abbreviation_for(Category::Petition).as_str(), "PET");
    }

    #[test]
    fn unconfigured_category_falls_back() {
        let config: Config =
            toml::from_str("_version = \"1\"\n[abbreviations]\npetition = \"PET\"\n").unwrap();
        assert_eq!(
            config.abbreviation_for(Category::Expression).as_str(),
            Abbreviation::fallback().as_str()
        );
    }

    #[test]
    fn invalid_configured_abbreviation_falls_back() {
        let config: Config =
            toml::from_str("_version = \"1\"\n[abbreviations]\nexpression = \"exp1\"\n").unwrap();
        assert_eq!(
            config.abbreviation_for(Category::Expression).as_str(),
            Abbreviation::fallback().as_str()
        );
    }

    #[test]
    fn save_and_reload_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");

        let mut config = Config::default();
        config.set_digits(5);
        config.set_abbreviation(
            Category::Petition,
            &Abbreviation::new("LEG".to_string()).unwrap(),
        );
        config.save(&path).unwrap();

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded, config);
    }
}
