//! Filesystem-facing infrastructure: platform paths and configuration storage.

pub mod config_storage;
pub mod paths;

pub use config_storage::ConfigStorage;
pub use paths::{DeskPaths, PathError};
