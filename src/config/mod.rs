//! Store configuration
//!
//! Describes where the defaults and user layers live and how each is
//! encoded on disk.

mod options;

pub use options::{LayerOptions, OptionsError, StoreOptions, DEFAULTS_FILE_NAME, USER_FILE_NAME};
