//! Built-in commands.
//!
//! Each command implements the
//! [`CliCommand`](crate::command::CliCommand) trait.

pub mod check;
pub mod compile;
pub mod load;

pub use check::CheckCommand;
pub use compile::CompileCommand;
pub use load::LoadCommand;

use crate::command::CommandRegistry;

/// Registers all built-in commands into the given registry.
pub fn register_builtin_commands(registry: &mut CommandRegistry) {
    registry.register(Box::new(CompileCommand));
    registry.register(Box::new(LoadCommand));
    registry.register(Box::new(CheckCommand));
}

/// Writes `content` to `output`, or to stdout followed by a newline when no
/// output path is given.
pub(crate) fn emit(content: &str, output: Option<&std::path::Path>) -> std::io::Result<()> {
    use std::io::Write;

    match output {
        Some(path) => std::fs::write(path, content),
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{content}")
        }
    }
}
