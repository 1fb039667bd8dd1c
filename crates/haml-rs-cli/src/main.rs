//! The `hamlrs` binary.

use std::path::PathBuf;

use haml_rs_cli::command::CommandRegistry;
use haml_rs_cli::commands::register_builtin_commands;
use haml_rs_core::logging::setup_logging;
use haml_rs_core::settings_loader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut registry = CommandRegistry::new();
    register_builtin_commands(&mut registry);

    let matches = registry.build_cli().get_matches();
    let settings = match matches.get_one::<PathBuf>("settings") {
        Some(path) => settings_loader::from_file_with_env(path)?,
        None => settings_loader::from_env(),
    };
    setup_logging(&settings);

    registry.execute(&matches, &settings).await?;
    Ok(())
}
