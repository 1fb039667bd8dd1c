//! The `check` command.
//!
//! Validates the settings and compiles every template under the given paths,
//! reporting problems without writing any cache entries.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use haml_rs_core::{HamlError, Settings};
use haml_rs_template::Compiler;

use crate::command::CliCommand;

/// Runs configuration and template checks.
pub struct CheckCommand;

/// The result of a single check.
#[derive(Debug, Clone)]
pub struct CheckMessage {
    /// The severity level of this check result.
    pub level: CheckLevel,
    /// A human-readable description of the issue.
    pub msg: String,
    /// An optional hint for how to resolve the issue.
    pub hint: Option<String>,
    /// A unique identifier for this check (e.g. "cache.W001").
    pub id: String,
}

impl CheckMessage {
    fn new(level: CheckLevel, id: &str, msg: impl Into<String>, hint: Option<&str>) -> Self {
        Self {
            level,
            msg: msg.into(),
            hint: hint.map(str::to_string),
            id: id.to_string(),
        }
    }
}

/// Severity levels for check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CheckLevel {
    /// Informational message.
    Info,
    /// A warning that may indicate a problem.
    Warning,
    /// An error that must be resolved.
    Error,
    /// A critical error that prevents templates from loading at all.
    Critical,
}

impl std::fmt::Display for CheckLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Runs configuration checks against the given settings.
pub fn run_checks(settings: &Settings) -> Vec<CheckMessage> {
    let mut messages = Vec::new();

    let tag = &settings.compiler.default_tag;
    if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        messages.push(CheckMessage::new(
            CheckLevel::Error,
            "compiler.E001",
            format!("default_tag {tag:?} is not a valid tag name"),
            Some("Use a plain tag name such as \"div\""),
        ));
    }

    if !settings.compiler.escape_html && !settings.debug {
        messages.push(CheckMessage::new(
            CheckLevel::Warning,
            "compiler.W001",
            "escape_html is disabled with debug=false",
            Some("Enable escape_html unless the host escapes output itself"),
        ));
    }

    match &settings.cache.dir {
        None => messages.push(CheckMessage::new(
            CheckLevel::Warning,
            "cache.W001",
            "No cache directory configured",
            Some("Set cache.dir, or loads fail with StorageUnavailable"),
        )),
        Some(dir) if dir.exists() && !dir.is_dir() => messages.push(CheckMessage::new(
            CheckLevel::Critical,
            "cache.E001",
            format!("Cache path {} is not a directory", dir.display()),
            None,
        )),
        Some(_) => {}
    }

    if !settings.cache.extension.is_empty() && !settings.cache.extension.starts_with('.') {
        messages.push(CheckMessage::new(
            CheckLevel::Warning,
            "cache.W002",
            format!(
                "Cache extension {:?} does not start with '.'",
                settings.cache.extension
            ),
            Some("The extension is appended to the cache key as is"),
        ));
    }

    let level = settings.log_level.to_lowercase();
    if !level.contains('=') && !LOG_LEVELS.contains(&level.as_str()) {
        messages.push(CheckMessage::new(
            CheckLevel::Warning,
            "logging.W001",
            format!("Unknown log level {:?}", settings.log_level),
            Some("Logging falls back to \"info\""),
        ));
    }

    messages
}

/// Compiles every template under `paths` and reports failures.
///
/// Directories are searched recursively for files with a `.haml` extension;
/// files named directly are compiled whatever their extension.
pub fn check_templates(paths: &[PathBuf], settings: &Settings) -> Vec<CheckMessage> {
    let compiler = Compiler::with_settings(settings.compiler.clone());
    let mut messages = Vec::new();
    let mut templates = Vec::new();

    for path in paths {
        if path.is_dir() {
            if let Err(e) = collect_templates(path, &mut templates) {
                messages.push(CheckMessage::new(
                    CheckLevel::Error,
                    "template.E002",
                    format!("{}: {e}", path.display()),
                    None,
                ));
            }
        } else if path.is_file() {
            templates.push(path.clone());
        } else {
            messages.push(CheckMessage::new(
                CheckLevel::Error,
                "template.E002",
                format!("{} does not exist", path.display()),
                None,
            ));
        }
    }

    templates.sort();
    for template in &templates {
        if let Err(e) = compiler.compile(template) {
            messages.push(CheckMessage::new(
                CheckLevel::Error,
                "template.E001",
                format!("{}: {e}", template.display()),
                None,
            ));
        }
    }
    tracing::debug!(count = templates.len(), "checked templates");

    messages
}

fn collect_templates(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_templates(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "haml") {
            out.push(path);
        }
    }
    Ok(())
}

#[async_trait]
impl CliCommand for CheckCommand {
    fn name(&self) -> &'static str {
        "check"
    }

    fn help(&self) -> &'static str {
        "Check settings and compile templates"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("paths")
                .num_args(0..)
                .value_parser(clap::value_parser!(PathBuf))
                .help("Template files or directories to compile"),
        )
        .arg(
            clap::Arg::new("fail-level")
                .long("fail-level")
                .value_parser(["warning", "error"])
                .default_value("error")
                .help("Lowest severity that makes the check fail"),
        )
    }

    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), HamlError> {
        let paths: Vec<PathBuf> = matches
            .get_many::<PathBuf>("paths")
            .map(|values| values.cloned().collect())
            .unwrap_or_default();
        let fail_level = match matches.get_one::<String>("fail-level").map(String::as_str) {
            Some("warning") => CheckLevel::Warning,
            _ => CheckLevel::Error,
        };

        let mut messages = run_checks(settings);
        messages.extend(check_templates(&paths, settings));

        if messages.is_empty() {
            tracing::info!("Check identified no issues");
            return Ok(());
        }

        let errors = messages.iter().filter(|m| m.level >= CheckLevel::Error).count();
        let warnings = messages.iter().filter(|m| m.level == CheckLevel::Warning).count();

        for msg in &messages {
            let hint_text = msg
                .hint
                .as_ref()
                .map_or(String::new(), |h| format!("\n\tHINT: {h}"));
            tracing::warn!("{} ({}): {}{}", msg.level, msg.id, msg.msg, hint_text);
        }

        tracing::info!(
            "Check identified {} issue(s) ({} error(s), {} warning(s))",
            messages.len(),
            errors,
            warnings
        );

        let failing = messages.iter().filter(|m| m.level >= fail_level).count();
        if failing > 0 {
            return Err(HamlError::ConfigurationError(format!(
                "Check found {failing} issue(s) at or above {fail_level}"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean_settings() -> Settings {
        let mut settings = Settings::default();
        settings.cache.dir = Some(std::env::temp_dir());
        settings
    }

    fn matches(args: &[&str]) -> clap::ArgMatches {
        CheckCommand
            .add_arguments(clap::Command::new("check"))
            .try_get_matches_from(args)
            .unwrap()
    }

    #[test]
    fn test_clean_settings_have_no_issues() {
        assert!(run_checks(&clean_settings()).is_empty());
    }

    #[test]
    fn test_missing_cache_dir_warns() {
        let messages = run_checks(&Settings::default());
        assert!(messages.iter().any(|m| m.id == "cache.W001"));
    }

    #[test]
    fn test_cache_dir_is_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut settings = clean_settings();
        settings.cache.dir = Some(file.path().to_path_buf());
        let messages = run_checks(&settings);
        assert!(messages
            .iter()
            .any(|m| m.id == "cache.E001" && m.level == CheckLevel::Critical));
    }

    #[test]
    fn test_bad_default_tag() {
        let mut settings = clean_settings();
        settings.compiler.default_tag = "my tag".to_string();
        assert!(run_checks(&settings).iter().any(|m| m.id == "compiler.E001"));
    }

    #[test]
    fn test_escape_disabled_in_production() {
        let mut settings = clean_settings();
        settings.debug = false;
        assert!(run_checks(&settings).iter().any(|m| m.id == "compiler.W001"));
        settings.compiler.escape_html = true;
        assert!(run_checks(&settings).is_empty());
    }

    #[test]
    fn test_extension_and_log_level() {
        let mut settings = clean_settings();
        settings.cache.extension = "cache".to_string();
        settings.log_level = "loud".to_string();
        let ids: Vec<_> = run_checks(&settings).into_iter().map(|m| m.id).collect();
        assert!(ids.contains(&"cache.W002".to_string()));
        assert!(ids.contains(&"logging.W001".to_string()));

        settings.log_level = "haml_rs_template=debug".to_string();
        assert!(run_checks(&settings).iter().all(|m| m.id != "logging.W001"));
    }

    #[test]
    fn test_check_templates_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("partials")).unwrap();
        std::fs::write(dir.path().join("ok.haml"), "%p ok").unwrap();
        std::fs::write(dir.path().join("partials/bad.haml"), ":nope\n  x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "%div\n      %p").unwrap();

        let messages = check_templates(&[dir.path().to_path_buf()], &Settings::default());
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "template.E001");
        assert!(messages[0].msg.contains("bad.haml"));
    }

    #[test]
    fn test_check_templates_missing_path() {
        let messages =
            check_templates(&[PathBuf::from("/no/such/dir")], &Settings::default());
        assert!(messages.iter().any(|m| m.id == "template.E002"));
    }

    #[test]
    fn test_check_level_display() {
        assert_eq!(CheckLevel::Info.to_string(), "INFO");
        assert_eq!(CheckLevel::Warning.to_string(), "WARNING");
        assert_eq!(CheckLevel::Error.to_string(), "ERROR");
        assert_eq!(CheckLevel::Critical.to_string(), "CRITICAL");
    }

    #[test]
    fn test_check_level_ordering() {
        assert!(CheckLevel::Info < CheckLevel::Warning);
        assert!(CheckLevel::Warning < CheckLevel::Error);
        assert!(CheckLevel::Error < CheckLevel::Critical);
    }

    #[tokio::test]
    async fn test_handle_fails_on_template_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.haml"), "%div\n  %p\n      %b").unwrap();
        let m = matches(&["check", dir.path().to_str().unwrap()]);
        let err = CheckCommand.handle(&m, &clean_settings()).await.unwrap_err();
        assert!(matches!(err, HamlError::ConfigurationError(_)));
    }

    #[tokio::test]
    async fn test_handle_warnings_pass_by_default() {
        let m = matches(&["check"]);
        assert!(CheckCommand.handle(&m, &Settings::default()).await.is_ok());

        let m = matches(&["check", "--fail-level", "warning"]);
        assert!(CheckCommand.handle(&m, &Settings::default()).await.is_err());
    }
}
