//! Settings loading from configuration files.
//!
//! This module provides functions to load [`Settings`] from TOML files, JSON
//! files, and to apply environment variable overrides.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON file (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `HAML_DEBUG` | `debug` |
//! | `HAML_LOG_LEVEL` | `log_level` |
//! | `HAML_ESCAPE_HTML` | `compiler.escape_html` |
//! | `HAML_FORMAT` | `compiler.format` |
//! | `HAML_DEFAULT_TAG` | `compiler.default_tag` |
//! | `HAML_SILENT_COMMENTS` | `compiler.silent_comments` |
//! | `HAML_CACHE_ENABLED` | `cache.enabled` |
//! | `HAML_CACHE_DIR` | `cache.dir` |
//! | `HAML_CACHE_EXTENSION` | `cache.extension` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use haml_rs_core::settings_loader;
//!
//! // Load from TOML
//! let settings = settings_loader::from_toml_file("config/haml.toml").unwrap();
//!
//! // Load from JSON with environment overrides
//! let settings = settings_loader::from_json_file_with_env("config/haml.json").unwrap();
//! ```

use std::path::{Path, PathBuf};

use crate::error::HamlError;
use crate::settings::Settings;

/// Loads settings from a TOML string.
///
/// Any fields not present in the TOML keep their default values.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or cannot be deserialized.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, HamlError> {
    // Deserialize into a serde_json::Value first and merge it over the
    // defaults, so that partial files keep defaults for nested sections.
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| HamlError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;

    let json_value = toml_to_json(toml_value);
    merge_over_defaults(json_value, "TOML")
}

/// Loads settings from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, HamlError> {
    let content = read_config(path.as_ref(), "TOML")?;
    from_toml_str(&content)
}

/// Loads settings from a TOML file and then applies environment variable overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, HamlError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or cannot be deserialized.
pub fn from_json_str(json_str: &str) -> Result<Settings, HamlError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| HamlError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;

    merge_over_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the JSON is malformed.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<Settings, HamlError> {
    let content = read_config(path.as_ref(), "JSON")?;
    from_json_str(&content)
}

/// Loads settings from a JSON file and then applies environment variable overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the JSON is malformed.
pub fn from_json_file_with_env(path: impl AsRef<Path>) -> Result<Settings, HamlError> {
    let mut settings = from_json_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a file, picking the format from its extension
/// (`.json` is JSON, anything else is TOML), then applies environment
/// variable overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Settings, HamlError> {
    let path = path.as_ref();
    if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
        from_json_file_with_env(path)
    } else {
        from_toml_file_with_env(path)
    }
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies environment variable overrides to a settings struct.
///
/// Boolean variables accept "true"/"1"/"yes" as true and anything else as
/// false. Unparseable enum values (format, silent comment policy) are
/// ignored and logged.
pub fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(val) = std::env::var("HAML_DEBUG") {
        settings.debug = parse_bool(&val);
    }

    if let Ok(val) = std::env::var("HAML_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Ok(val) = std::env::var("HAML_ESCAPE_HTML") {
        settings.compiler.escape_html = parse_bool(&val);
    }

    if let Ok(val) = std::env::var("HAML_FORMAT") {
        match val.parse() {
            Ok(format) => settings.compiler.format = format,
            Err(e) => tracing::warn!("Ignoring HAML_FORMAT: {e}"),
        }
    }

    if let Ok(val) = std::env::var("HAML_DEFAULT_TAG") {
        settings.compiler.default_tag = val;
    }

    if let Ok(val) = std::env::var("HAML_SILENT_COMMENTS") {
        match val.parse() {
            Ok(policy) => settings.compiler.silent_comments = policy,
            Err(e) => tracing::warn!("Ignoring HAML_SILENT_COMMENTS: {e}"),
        }
    }

    if let Ok(val) = std::env::var("HAML_CACHE_ENABLED") {
        settings.cache.enabled = parse_bool(&val);
    }

    if let Ok(val) = std::env::var("HAML_CACHE_DIR") {
        settings.cache.dir = if val.is_empty() {
            None
        } else {
            Some(PathBuf::from(val))
        };
    }

    if let Ok(val) = std::env::var("HAML_CACHE_EXTENSION") {
        settings.cache.extension = val;
    }
}

// ============================================================
// Helpers
// ============================================================

fn parse_bool(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "true" | "1" | "yes")
}

fn read_config(path: &Path, kind: &str) -> Result<String, HamlError> {
    std::fs::read_to_string(path).map_err(|e| {
        HamlError::ConfigurationError(format!(
            "Failed to read {kind} file '{}': {e}",
            path.display()
        ))
    })
}

fn merge_over_defaults(value: serde_json::Value, kind: &str) -> Result<Settings, HamlError> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        HamlError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, value);
    serde_json::from_value(merged).map_err(|e| {
        HamlError::ConfigurationError(format!("Failed to deserialize settings from {kind}: {e}"))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => {
            let map: serde_json::Map<String, serde_json::Value> = table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect();
            serde_json::Value::Object(map)
        }
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = if let Some(base_v) = base_map.remove(&key) {
                    merge_json(base_v, override_v)
                } else {
                    override_v
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{OutputFormat, SilentCommentPolicy};

    // ── TOML loading ────────────────────────────────────────────────

    #[test]
    fn test_from_toml_str_basic() {
        let toml = r#"
            debug = false
            log_level = "debug"

            [compiler]
            escape_html = true
            format = "xhtml"
        "#;

        let settings = from_toml_str(toml).unwrap();
        assert!(!settings.debug);
        assert_eq!(settings.log_level, "debug");
        assert!(settings.compiler.escape_html);
        assert_eq!(settings.compiler.format, OutputFormat::Xhtml);
        // Defaults preserved inside a partially specified section
        assert_eq!(settings.compiler.default_tag, "div");
        assert_eq!(settings.cache.extension, ".cache");
    }

    #[test]
    fn test_from_toml_str_cache() {
        let toml = r#"
            [cache]
            dir = "/var/cache/haml"
            enabled = false
        "#;

        let settings = from_toml_str(toml).unwrap();
        assert_eq!(settings.cache.dir, Some(PathBuf::from("/var/cache/haml")));
        assert!(!settings.cache.enabled);
    }

    #[test]
    fn test_from_toml_str_globals() {
        let toml = r#"
            [globals]
            site_name = "Example"
            year = 2024
        "#;

        let settings = from_toml_str(toml).unwrap();
        assert_eq!(settings.globals["site_name"], "Example");
        assert_eq!(settings.globals["year"], 2024);
    }

    #[test]
    fn test_from_toml_str_empty() {
        let settings = from_toml_str("").unwrap();
        assert!(settings.debug);
        assert!(settings.cache.dir.is_none());
    }

    #[test]
    fn test_from_toml_str_invalid() {
        let result = from_toml_str("[[invalid toml content");
        assert!(result.is_err());
    }

    #[test]
    fn test_from_toml_str_bad_enum() {
        let result = from_toml_str("[compiler]\nformat = \"html4\"");
        assert!(matches!(result, Err(HamlError::ConfigurationError(_))));
    }

    // ── JSON loading ────────────────────────────────────────────────

    #[test]
    fn test_from_json_str_basic() {
        let json = r#"{
            "debug": false,
            "compiler": { "silent_comments": "discard", "default_tag": "section" }
        }"#;

        let settings = from_json_str(json).unwrap();
        assert!(!settings.debug);
        assert_eq!(settings.compiler.silent_comments, SilentCommentPolicy::Discard);
        assert_eq!(settings.compiler.default_tag, "section");
        assert!(!settings.compiler.escape_html);
    }

    #[test]
    fn test_from_json_str_empty_object() {
        let settings = from_json_str("{}").unwrap();
        assert!(settings.debug);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_from_json_str_invalid() {
        let result = from_json_str("{invalid json");
        assert!(result.is_err());
    }

    // ── File loading ────────────────────────────────────────────────

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("haml.toml");
        std::fs::write(&path, "debug = false\n[compiler]\nescape_html = true\n").unwrap();

        let settings = from_toml_file(&path).unwrap();
        assert!(!settings.debug);
        assert!(settings.compiler.escape_html);
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("haml.json");
        std::fs::write(&path, r#"{"log_level": "warn"}"#).unwrap();

        let settings = from_json_file(&path).unwrap();
        assert_eq!(settings.log_level, "warn");
    }

    #[test]
    fn test_from_file_with_env_picks_format() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("haml.json");
        std::fs::write(&json_path, r#"{"compiler": {"default_tag": "span"}}"#).unwrap();
        let toml_path = dir.path().join("haml.toml");
        std::fs::write(&toml_path, "[compiler]\ndefault_tag = \"p\"\n").unwrap();

        assert_eq!(from_file_with_env(&json_path).unwrap().compiler.default_tag, "span");
        assert_eq!(from_file_with_env(&toml_path).unwrap().compiler.default_tag, "p");
    }

    #[test]
    fn test_from_toml_file_missing() {
        let result = from_toml_file("/nonexistent/path/haml.toml");
        assert!(matches!(result, Err(HamlError::ConfigurationError(_))));
    }

    #[test]
    fn test_from_json_file_missing() {
        let result = from_json_file("/nonexistent/path/haml.json");
        assert!(result.is_err());
    }

    // ── Environment variable overrides ──────────────────────────────
    //
    // Each test touches its own variable so they can run in parallel.

    #[test]
    fn test_apply_env_overrides_escape_html() {
        let mut settings = Settings::default();
        std::env::set_var("HAML_ESCAPE_HTML", "yes");
        apply_env_overrides(&mut settings);
        assert!(settings.compiler.escape_html);
        std::env::remove_var("HAML_ESCAPE_HTML");
    }

    #[test]
    fn test_apply_env_overrides_format() {
        let mut settings = Settings::default();
        std::env::set_var("HAML_FORMAT", "xhtml");
        apply_env_overrides(&mut settings);
        assert_eq!(settings.compiler.format, OutputFormat::Xhtml);
        std::env::remove_var("HAML_FORMAT");
    }

    #[test]
    fn test_apply_env_overrides_invalid_policy_ignored() {
        let mut settings = Settings::default();
        std::env::set_var("HAML_SILENT_COMMENTS", "keep-everything");
        apply_env_overrides(&mut settings);
        assert_eq!(settings.compiler.silent_comments, SilentCommentPolicy::Drop);
        std::env::remove_var("HAML_SILENT_COMMENTS");
    }

    #[test]
    fn test_apply_env_overrides_cache_dir() {
        let mut settings = Settings::default();
        std::env::set_var("HAML_CACHE_DIR", "/tmp/haml-cache");
        apply_env_overrides(&mut settings);
        assert_eq!(settings.cache.dir, Some(PathBuf::from("/tmp/haml-cache")));
        std::env::remove_var("HAML_CACHE_DIR");
    }

    #[test]
    fn test_apply_env_overrides_cache_enabled_false() {
        let mut settings = Settings::default();
        std::env::set_var("HAML_CACHE_ENABLED", "0");
        apply_env_overrides(&mut settings);
        assert!(!settings.cache.enabled);
        std::env::remove_var("HAML_CACHE_ENABLED");
    }

    #[test]
    fn test_from_env_default_tag() {
        std::env::set_var("HAML_DEFAULT_TAG", "article");
        let settings = from_env();
        assert_eq!(settings.compiler.default_tag, "article");
        std::env::remove_var("HAML_DEFAULT_TAG");
    }

    // ── merge_json helper ───────────────────────────────────────────

    #[test]
    fn test_merge_json_basic() {
        let base = serde_json::json!({"a": 1, "b": 2});
        let over = serde_json::json!({"b": 3, "c": 4});
        let merged = merge_json(base, over);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 3);
        assert_eq!(merged["c"], 4);
    }

    #[test]
    fn test_merge_json_nested() {
        let base = serde_json::json!({"outer": {"a": 1, "b": 2}});
        let over = serde_json::json!({"outer": {"b": 3}});
        let merged = merge_json(base, over);
        assert_eq!(merged["outer"]["a"], 1);
        assert_eq!(merged["outer"]["b"], 3);
    }
}
