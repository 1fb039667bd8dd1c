//! The `load` command.
//!
//! Loads a template through the configured file cache, compiling it only
//! when the cached entry is missing or stale.

use std::path::PathBuf;

use async_trait::async_trait;
use haml_rs_core::{HamlError, Settings};
use haml_rs_template::Engine;

use super::emit;
use crate::command::CliCommand;

/// Loads one template through the cache.
///
/// Requires `cache.dir` in the settings (or `--cache-dir`).
pub struct LoadCommand;

#[async_trait]
impl CliCommand for LoadCommand {
    fn name(&self) -> &'static str {
        "load"
    }

    fn help(&self) -> &'static str {
        "Load a template through the compiled-template cache"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("template")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf))
                .help("The template to load"),
        )
        .arg(
            clap::Arg::new("cache-dir")
                .long("cache-dir")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Cache directory, overriding cache.dir"),
        )
        .arg(
            clap::Arg::new("no-cache")
                .long("no-cache")
                .action(clap::ArgAction::SetTrue)
                .help("Recompile even if the cached entry is fresh"),
        )
        .arg(
            clap::Arg::new("output")
                .long("output")
                .short('o')
                .value_parser(clap::value_parser!(PathBuf))
                .help("Write the content to this file instead of stdout"),
        )
    }

    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), HamlError> {
        let template = matches
            .get_one::<PathBuf>("template")
            .ok_or_else(|| HamlError::ConfigurationError("No template given".to_string()))?;

        let mut settings = settings.clone();
        if let Some(dir) = matches.get_one::<PathBuf>("cache-dir") {
            settings.cache.dir = Some(dir.clone());
        }
        if matches.get_flag("no-cache") {
            settings.cache.enabled = false;
        }

        let engine = Engine::from_settings(&settings);
        let content = engine.load_file(template)?;
        emit(&content, matches.get_one::<PathBuf>("output").map(PathBuf::as_path))?;
        Ok(())
    }
}
