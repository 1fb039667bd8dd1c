//! # haml-rs
//!
//! An indentation-sensitive markup compiler that emits Django template
//! language, plus a loader that caches compiled output keyed by source file
//! identity and freshness.
//!
//! This is the meta-crate that re-exports the sub-crates for convenient
//! access. Depend on `haml-rs` to get everything, or on individual crates
//! for finer-grained control.
//!
//! ```
//! # #[cfg(feature = "template")] {
//! use haml_rs::template::Compiler;
//!
//! let compiled = Compiler::default().compile_str("%ul\n  - for x in xs\n    %li= x").unwrap();
//! assert_eq!(compiled, "<ul>{% for x in xs %}<li>{{ x }}</li>{% endfor %}</ul>");
//! # }
//! ```

/// Error type, settings, settings loading, and logging.
pub use haml_rs_core as core;

/// Compiler, filters, storage backends, and the loading engine.
#[cfg(feature = "template")]
pub use haml_rs_template as template;

/// The `hamlrs` command framework and built-in commands.
#[cfg(feature = "cli")]
pub use haml_rs_cli as cli;

/// Re-exported so hosts can build `Settings::globals` without a direct dependency.
pub use serde_json;

/// Re-exported so hosts share the crate's tracing version.
pub use tracing;

pub use haml_rs_core::{HamlError, HamlResult, Settings};

#[cfg(feature = "template")]
pub use haml_rs_template::{Compiler, Engine, FileStorage, InMemoryStorage, Loader, Storage};
