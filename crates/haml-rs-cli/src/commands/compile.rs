//! The `compile` command.
//!
//! Compiles a single template and prints the result without touching any
//! cache.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use haml_rs_core::settings::{CompilerSettings, OutputFormat};
use haml_rs_core::{HamlError, Settings};
use haml_rs_template::Compiler;

use super::emit;
use crate::command::CliCommand;

/// Compiles one template to stdout or to a file.
pub struct CompileCommand;

/// Applies command-line overrides on top of the configured compiler settings.
pub fn compiler_settings(
    matches: &clap::ArgMatches,
    settings: &Settings,
) -> Result<CompilerSettings, HamlError> {
    let mut compiler = settings.compiler.clone();
    if let Some(format) = matches.get_one::<String>("format") {
        compiler.format = format
            .parse::<OutputFormat>()
            .map_err(HamlError::ConfigurationError)?;
    }
    if matches.get_flag("escape-html") {
        compiler.escape_html = true;
    }
    Ok(compiler)
}

/// Compiles `template` with `settings` and the built-in filters.
pub fn compile_template(template: &Path, settings: CompilerSettings) -> Result<String, HamlError> {
    Compiler::with_settings(settings).compile(template)
}

#[async_trait]
impl CliCommand for CompileCommand {
    fn name(&self) -> &'static str {
        "compile"
    }

    fn help(&self) -> &'static str {
        "Compile a template and print the result"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("template")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf))
                .help("The template to compile"),
        )
        .arg(
            clap::Arg::new("output")
                .long("output")
                .short('o')
                .value_parser(clap::value_parser!(PathBuf))
                .help("Write the compiled output to this file instead of stdout"),
        )
        .arg(
            clap::Arg::new("format")
                .long("format")
                .short('f')
                .help("Output format: html5 or xhtml"),
        )
        .arg(
            clap::Arg::new("escape-html")
                .long("escape-html")
                .action(clap::ArgAction::SetTrue)
                .help("Escape `=` output and interpolation"),
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
        let compiler = compiler_settings(matches, settings)?;

        let compiled = compile_template(template, compiler)?;
        tracing::info!(
            template = %template.display(),
            bytes = compiled.len(),
            "compiled template"
        );
        emit(&compiled, matches.get_one::<PathBuf>("output").map(PathBuf::as_path))?;
        Ok(())
    }
}
