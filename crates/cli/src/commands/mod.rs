pub mod registry;
pub mod stack;

pub use registry::handle_registry_command;
pub use stack::handle_stack_command;

use eyre::Result;
use serde::Serialize;

/// Print a value as pretty JSON on stdout
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
