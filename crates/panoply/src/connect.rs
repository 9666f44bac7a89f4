//! Credential acquisition and session establishment.
//!
//! Host, username, and password come from flags or interactive prompts;
//! password input is masked. Interrupting a prompt aborts the whole run
//! with a clean message instead of proceeding with partial credentials.

use secrecy::SecretString;

use panoply_api::{Panorama, Session};

use crate::cli::GlobalOpts;
use crate::config::Config;
use crate::error::CliError;

/// Target endpoint plus login material for one run.
pub struct Credentials {
    pub host: String,
    pub username: String,
    pub password: SecretString,
}

/// Fill in anything missing from the flags by prompting.
pub fn gather(global: &GlobalOpts) -> Result<Credentials, CliError> {
    let host = match &global.ip {
        Some(ip) => ip.clone(),
        None => prompt_text("Enter the name or IP of the firewall/Panorama")?,
    };
    let username = match &global.username {
        Some(user) => user.clone(),
        None => prompt_text("Enter the user login")?,
    };
    let password = match &global.password {
        Some(pw) => SecretString::from(pw.clone()),
        None => prompt_password()?,
    };

    Ok(Credentials {
        host,
        username,
        password,
    })
}

/// Gather credentials and open the single authenticated session of the
/// run. No automatic retry: connection failures are operator-actionable.
///
/// Prompting runs on a blocking thread raced against Ctrl-C; registering
/// the signal handler before the first prompt keeps an interrupt from
/// killing the process mid-prompt, and the select arm turns it into a
/// clean cancellation.
pub async fn establish(global: &GlobalOpts, config: &Config) -> Result<Session, CliError> {
    let creds = {
        let global = global.clone();
        let prompts = tokio::task::spawn_blocking(move || gather(&global));
        tokio::select! {
            res = prompts => res.map_err(|e| CliError::Io(std::io::Error::other(e)))??,
            _ = tokio::signal::ctrl_c() => return Err(CliError::Interrupted),
        }
    };

    let session = Session::connect(
        &creds.host,
        &creds.username,
        &creds.password,
        &config.transport(),
    )
    .await?;
    Ok(session)
}

/// Unwrap a Panorama session or reject with the task name.
pub fn require_panorama(session: Session, task: &str) -> Result<Panorama, CliError> {
    match session {
        Session::Panorama(pano) => Ok(pano),
        Session::Firewall(fw) => Err(CliError::RequiresPanorama {
            task: task.to_owned(),
            host: fw.client().host().to_owned(),
        }),
    }
}

// ── Prompt helpers ───────────────────────────────────────────────────

fn prompt_text(prompt: &str) -> Result<String, CliError> {
    dialoguer::Input::<String>::new()
        .with_prompt(prompt)
        .interact_text()
        .map_err(prompt_err)
}

fn prompt_password() -> Result<SecretString, CliError> {
    rpassword::prompt_password("Password: ")
        .map(SecretString::from)
        .map_err(io_prompt_err)
}

fn prompt_err(err: dialoguer::Error) -> CliError {
    match err {
        dialoguer::Error::IO(io) => io_prompt_err(io),
    }
}

fn io_prompt_err(err: std::io::Error) -> CliError {
    if err.kind() == std::io::ErrorKind::Interrupted {
        CliError::Interrupted
    } else {
        CliError::Io(err)
    }
}
