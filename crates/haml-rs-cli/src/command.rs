//! Subcommand dispatch for `hamlrs`.
//!
//! Each subcommand implements [`CliCommand`]; a [`CommandRegistry`] turns the
//! registered commands into a clap parser and routes parsed arguments back
//! to the matching handler together with the loaded [`Settings`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use haml_rs_core::{HamlError, Settings};

/// A `hamlrs` subcommand.
#[async_trait]
pub trait CliCommand: Send + Sync {
    /// The subcommand name.
    fn name(&self) -> &'static str;

    /// One-line help text.
    fn help(&self) -> &'static str;

    /// Adds the subcommand's arguments.
    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd
    }

    /// Runs the subcommand.
    async fn handle(&self, matches: &clap::ArgMatches, settings: &Settings)
        -> Result<(), HamlError>;
}

/// The registered subcommands, ordered by name.
#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<&'static str, Box<dyn CliCommand>>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command, replacing any command with the same name.
    pub fn register(&mut self, command: Box<dyn CliCommand>) {
        self.commands.insert(command.name(), command);
    }

    /// Builds the `hamlrs` parser: one subcommand per registered command and
    /// a global `--settings` file option.
    pub fn build_cli(&self) -> clap::Command {
        let settings = clap::Arg::new("settings")
            .long("settings")
            .short('s')
            .global(true)
            .value_parser(clap::value_parser!(PathBuf))
            .help("Settings file (TOML, or JSON with a .json extension)");

        self.commands.values().fold(
            clap::Command::new("hamlrs")
                .about("Compile and cache haml templates")
                .subcommand_required(true)
                .arg(settings),
            |app, cmd| {
                app.subcommand(cmd.add_arguments(clap::Command::new(cmd.name()).about(cmd.help())))
            },
        )
    }

    /// Runs the subcommand selected in `matches`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` when no registered subcommand was
    /// selected, and otherwise whatever the subcommand returns.
    pub async fn execute(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), HamlError> {
        let (name, sub_matches) = matches
            .subcommand()
            .ok_or_else(|| HamlError::ConfigurationError("No subcommand given".to_string()))?;
        let cmd = self
            .commands
            .get(name)
            .ok_or_else(|| HamlError::ConfigurationError(format!("Unknown command: {name}")))?;

        tracing::debug!(command = name, "running command");
        cmd.handle(sub_matches, settings).await
    }
}
