//! # haml-rs-template
//!
//! The haml-rs compiler and loader. Translates indentation-structured
//! markup into Django template language output and caches compiled results
//! keyed by source file identity and freshness.
//!
//! ## Modules
//!
//! - [`lexer`] - Source lines and indentation measurement
//! - [`classifier`] - Line classification
//! - [`element`] - Element heads and attributes
//! - [`node`] - The node model
//! - [`interpolate`] - `#{expr}` interpolation
//! - [`parser`] - Indentation-driven tree construction
//! - [`render`] - Rendering nodes to compiled output
//! - [`compiler`] - Source text in, compiled text out
//! - [`filters`] - The filter container and built-in filters
//! - [`context`] - Bindings and values for content evaluation
//! - [`evaluator`] - Post-compilation content evaluators
//! - [`storage`] - Cache storage backends
//! - [`loader`] - The load protocol
//! - [`engine`] - The engine tying it all together

pub mod classifier;
pub mod compiler;
pub mod context;
pub mod element;
pub mod engine;
pub mod evaluator;
pub mod filters;
pub mod interpolate;
pub mod lexer;
pub mod loader;
pub mod node;
pub mod parser;
pub mod render;
pub mod storage;

pub use compiler::Compiler;
pub use engine::Engine;
pub use filters::{Filter, FilterContainer};
pub use loader::Loader;
pub use storage::{FileId, FileStorage, InMemoryStorage, Storage};
