//! Settings for haml-rs.
//!
//! This module provides the [`Settings`] struct, which holds compiler,
//! cache, and logging configuration with sensible defaults. Settings are
//! constructed explicitly (see [`settings_loader`](crate::settings_loader))
//! and passed to the engine; there is no process-wide settings instance.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The markup flavor the compiler emits.
///
/// Affects doctype defaults, void element closing (`<br>` vs `<br />`), and
/// boolean attributes (`checked` vs `checked="checked"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// HTML5 output.
    #[default]
    Html5,
    /// XHTML 1.x output.
    Xhtml,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Html5 => write!(f, "html5"),
            Self::Xhtml => write!(f, "xhtml"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "html5" | "html" => Ok(Self::Html5),
            "xhtml" => Ok(Self::Xhtml),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

/// What happens to lines nested under a silent (`-#`) comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SilentCommentPolicy {
    /// Nested lines are skipped without being parsed.
    #[default]
    Drop,
    /// Nested lines are parsed and rendered, and the output is discarded.
    /// Errors inside the comment still fail the compile.
    Discard,
}

impl fmt::Display for SilentCommentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drop => write!(f, "drop"),
            Self::Discard => write!(f, "discard"),
        }
    }
}

impl FromStr for SilentCommentPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "discard" => Ok(Self::Discard),
            other => Err(format!("unknown silent comment policy '{other}'")),
        }
    }
}

/// Compiler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerSettings {
    /// Whether `=` output and `#{}` interpolation are HTML-escaped.
    pub escape_html: bool,
    /// The markup flavor to emit.
    pub format: OutputFormat,
    /// The tag used when an element line has no `%name` (e.g. `.box`).
    pub default_tag: String,
    /// Handling of lines nested under `-#` comments.
    pub silent_comments: SilentCommentPolicy,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            escape_html: false,
            format: OutputFormat::Html5,
            default_tag: "div".to_string(),
            silent_comments: SilentCommentPolicy::Drop,
        }
    }
}

/// Compiled-template cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Whether fresh cache entries are reused. When `false`, every load
    /// recompiles.
    pub enabled: bool,
    /// Root directory of the file cache. Loads fail when this is unset and
    /// no other storage is supplied.
    pub dir: Option<PathBuf>,
    /// File extension of cache entries.
    pub extension: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            extension: ".cache".to_string(),
        }
    }
}

/// The complete set of haml-rs settings.
///
/// # Examples
///
/// ```
/// use haml_rs_core::settings::{OutputFormat, Settings};
///
/// let settings = Settings::default();
/// assert!(settings.debug);
/// assert_eq!(settings.compiler.format, OutputFormat::Html5);
/// assert_eq!(settings.compiler.default_tag, "div");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // ── Core ─────────────────────────────────────────────────────────

    /// Whether debug mode is enabled.
    pub debug: bool,

    // ── Logging ──────────────────────────────────────────────────────

    /// The log level (e.g. "info", "debug", "warn").
    pub log_level: String,

    // ── Compiler ─────────────────────────────────────────────────────

    /// Compiler options.
    pub compiler: CompilerSettings,

    // ── Cache ────────────────────────────────────────────────────────

    /// Compiled-template cache options.
    pub cache: CacheSettings,

    // ── Content evaluation ───────────────────────────────────────────

    /// Variables bound into every compiled template before it is cached.
    pub globals: HashMap<String, serde_json::Value>,

    // ── Escape hatch ─────────────────────────────────────────────────

    /// Custom settings that don't fit into the above categories.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            log_level: "info".to_string(),
            compiler: CompilerSettings::default(),
            cache: CacheSettings::default(),
            globals: HashMap::new(),
            extra: HashMap::new(),
        }
    }
}
