//! # haml-rs-core
//!
//! Core types for haml-rs: the shared error type, settings, settings
//! loading, and logging setup. This crate has no dependency on the compiler
//! and is the foundation for the other workspace crates.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Compiler, cache, and logging settings
//! - [`settings_loader`] - Loading settings from TOML/JSON files and the environment
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use error::{HamlError, HamlResult};
pub use settings::{CacheSettings, CompilerSettings, OutputFormat, Settings, SilentCommentPolicy};
