//! AI tool command handlers.

use tracker_core::tools::{self, ToolOutput};

use super::Session;
use super::args::ToolsCommands;

/// Handle tools subcommands.
pub fn handle_tools_command(session: &Session, command: ToolsCommands) -> bool {
    match command {
        ToolsCommands::List => {
            for definition in tools::definitions() {
                println!("{}", definition.name);
                println!("  {}", definition.description);
            }
            true
        }
        ToolsCommands::Call { name, arguments } => {
            let arguments = match serde_json::from_str(&arguments) {
                Ok(arguments) => arguments,
                Err(e) => {
                    eprintln!("✗ Tool arguments must be a JSON object: {}", e);
                    return false;
                }
            };

            let output: ToolOutput = session.runtime.block_on(tools::execute_named(
                session.remote.as_ref(),
                &name,
                arguments,
            ));

            match serde_json::to_string_pretty(&output) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("✗ Could not render tool output: {}", e),
            }
            output.success
        }
    }
}
