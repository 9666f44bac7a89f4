//! Connectivity check: connect, classify, report system information.

use crate::cli::GlobalOpts;
use crate::config::Config;
use crate::connect;
use crate::error::CliError;
use crate::runlog::RunLog;

pub async fn handle(config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let session = connect::establish(global, config).await?;

    let mut log = RunLog::open(&config.log_file);
    let info = session.system_info();
    log.line(&format!("Connected to {}", session.mode()));
    log.line(&format!("  hostname:   {}", info.hostname));
    log.line(&format!("  model:      {}", info.model));
    if let Some(version) = &info.sw_version {
        log.line(&format!("  sw-version: {version}"));
    }
    if let Some(serial) = &info.serial {
        log.line(&format!("  serial:     {serial}"));
    }
    Ok(())
}
