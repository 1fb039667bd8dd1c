//! Core error types for haml-rs.
//!
//! This module provides the [`HamlError`] enum shared by every crate in the
//! workspace. Compile-time failures (bad indentation, unknown filters) and
//! cache failures (missing backend, failed writes) are reported through the
//! same type so that a host view layer can decide how to present them.

use thiserror::Error;

/// The primary error type for haml-rs.
///
/// Variants carry the offending line number and content where available.
/// A failed compilation never produces partial output and never writes a
/// cache entry, so callers can surface any of these errors directly.
#[derive(Error, Debug)]
pub enum HamlError {
    // ── Compilation ─────────────────────────────────────────────────

    /// The template's indentation or nesting is malformed.
    #[error("Structural error on line {line}: {message} (in {content:?})")]
    StructuralError {
        /// 1-based line number of the offending line.
        line: usize,
        /// The raw text of the offending line.
        content: String,
        /// What is wrong with it.
        message: String,
    },

    /// A filter block names a filter that is not registered.
    #[error("Unknown filter ':{name}' on line {line}")]
    UnknownFilter {
        /// The filter name as written after `:`.
        name: String,
        /// 1-based line number of the filter line.
        line: usize,
    },

    /// The template source could not be found or read.
    #[error("Template does not exist: {0}")]
    TemplateDoesNotExist(String),

    // ── Storage ─────────────────────────────────────────────────────

    /// A load was requested but no storage backend is configured.
    #[error("Storage unavailable: no storage backend is configured")]
    StorageUnavailable,

    /// The storage backend failed to persist a cache entry.
    #[error("Failed to write cache entry '{id}': {source}")]
    StorageWriteError {
        /// The cache key that was being written.
        id: String,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A cache entry was fetched but does not exist.
    #[error("Cache entry not found: {0}")]
    CacheEntryNotFound(String),

    // ── Configuration ───────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ── Serialization ───────────────────────────────────────────────

    /// An error occurred during serialization or deserialization.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // ── IO ──────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl HamlError {
    /// Creates a [`HamlError::StructuralError`].
    pub fn structural(
        line: usize,
        content: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::StructuralError {
            line,
            content: content.into(),
            message: message.into(),
        }
    }

    /// Returns the 1-based source line this error points at, if any.
    pub const fn line(&self) -> Option<usize> {
        match self {
            Self::StructuralError { line, .. } | Self::UnknownFilter { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// Returns a stable short code for this error.
    ///
    /// Host layers can key error pages or metrics on these codes without
    /// matching on the display text.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::StructuralError { .. } => "structural",
            Self::UnknownFilter { .. } => "unknown_filter",
            Self::TemplateDoesNotExist(_) => "template_does_not_exist",
            Self::StorageUnavailable => "storage_unavailable",
            Self::StorageWriteError { .. } => "storage_write",
            Self::CacheEntryNotFound(_) => "cache_entry_not_found",
            Self::ConfigurationError(_) => "configuration",
            Self::SerializationError(_) => "serialization",
            Self::IoError(_) => "io",
        }
    }

    /// Returns `true` for errors raised while compiling a template.
    pub const fn is_compile_error(&self) -> bool {
        matches!(
            self,
            Self::StructuralError { .. } | Self::UnknownFilter { .. } | Self::TemplateDoesNotExist(_)
        )
    }
}

/// A convenience type alias for `Result<T, HamlError>`.
pub type HamlResult<T> = Result<T, HamlError>;
