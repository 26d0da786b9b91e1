//! Paramstore - layered parameter store
//!
//! Reads a shipped defaults layer and a user-writable overrides layer,
//! serves their deep merge through dot-path lookups, and writes the user
//! layer back atomically under one of the codec's obfuscation modes.

pub mod config;
pub mod store;

pub use config::{LayerOptions, OptionsError, StoreOptions};
pub use paramstore_codec as codec;
pub use paramstore_codec::{Codec, CodecError, ObfuscationMode};
pub use store::{
    deep_merge, LayerKind, LayerReport, LayerStatus, Lookup, ParamStore, Phase, StoreError,
    StoreResult,
};
