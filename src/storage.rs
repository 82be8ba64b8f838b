/// The filesystem backed record store.
pub mod directory;
/// Markdown serialization for records.
pub mod markdown;
mod path_parser;
mod registry;

pub use directory::{
    config_path, CounterDrift, CreateError, DeleteError, Directory, InitError, NumberSource,
    OpenError,
};
pub use markdown::{LoadError, MarkdownRecord};
pub use path_parser::{parse_number_from_path, record_path, ParseError};
pub use registry::Registry;
