//! Command dispatch: bridges CLI args to task handlers.

pub mod config_cmd;
pub mod info;
pub mod tag_audit;
pub mod wildfire;
pub mod zone_split;

use crate::cli::{Command, GlobalOpts};
use crate::config::Config;
use crate::error::CliError;

/// Dispatch a device- or service-bound command to its handler.
pub async fn dispatch(cmd: Command, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Info => info::handle(config, global).await,
        Command::TagAudit(args) => tag_audit::handle(&args, config, global).await,
        Command::Wildfire(args) => wildfire::handle(&args, config, global).await,
        Command::ZoneSplit(args) => zone_split::handle(&args, config, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
