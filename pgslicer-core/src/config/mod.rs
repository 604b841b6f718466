//! Configuration types for a slicing run.
//!
//! - `ConnectionConfig`: where and how to connect
//! - `SliceOptions`: row limits, full dumps and custom conditions
//! - `ConfigFile`: the optional `pg-slicer.yml`
//!
//! Command-line and environment values always win over the file; the
//! binary layers them with [`ConnectionSection::or`] and the
//! [`SliceOptions`] builders.

mod connection;
mod file;
mod options;

pub use connection::{ConnectionConfig, DEFAULT_PORT};
pub use file::{
    ConfigFile, ConnectionSection, DumpSection, HOME_FILE_NAME, LOCAL_FILE_NAME, TableLimit,
    TableSection,
};
pub use options::{DEFAULT_LIMIT, SliceOptions};
