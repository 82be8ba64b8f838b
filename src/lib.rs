//! Sequential case numbering for citizen expressions and petitions
//!
//! Records are markdown documents stored in a directory. Each record carries
//! a case number of the form `YEAR-SEQUENCE-ABBREVIATION` (for example
//! `2024-0042-EXP`), allocated from a single optimistically-updated counter
//! so that concurrent creations never collide. Deleted numbers leave gaps
//! that can be found and deliberately reused.

pub mod alloc;
pub use alloc::{AllocateError, Allocator};

pub mod domain;
pub use domain::{Abbreviation, CaseNumber, Category, Config, Record};

/// Filesystem storage and directory management for records.
pub mod storage;
pub use storage::{Directory, NumberSource};
