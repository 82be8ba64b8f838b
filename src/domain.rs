//! Domain types for the registry.
//!
//! Case numbers, record content and metadata, categories, and the registry
//! configuration.

/// The registry configuration.
pub mod config;
/// Case numbers and category abbreviations.
pub mod number;
/// Record content and metadata.
pub mod record;

pub use config::Config;
pub use number::{Abbreviation, CaseNumber};
pub use record::{Category, Record};
