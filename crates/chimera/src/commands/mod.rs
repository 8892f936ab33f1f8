//! Command dispatch: bridges CLI args -> session calls -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod summary;
pub mod util;

use chimera_core::Session;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Whether a command needs the device inventory loaded first.
pub fn needs_inventory(cmd: &Command) -> bool {
    !matches!(cmd, Command::Categories)
}

/// Dispatch a service-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Devices(args) => devices::handle(session, args, global).await,
        Command::Summary => summary::summary(session, global),
        Command::Categories => summary::categories(session, global),
        Command::Status => summary::status(session, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
