//! Clap derive structures for the `panoply` CLI.
//!
//! Defines the command tree, global flags, and shared argument types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// panoply -- administrative automation for firewalls and Panorama
#[derive(Debug, Parser)]
#[command(
    name = "panoply",
    version,
    about = "Automate firewall/Panorama administration from the command line",
    long_about = "Small administrative automations for Palo Alto Networks\n\
        firewalls and Panorama: audit tagged objects against dynamic address\n\
        groups, query WildFire verdicts for file hashes, and split multi-zone\n\
        security rules into single-zone clones.\n\n\
        Host, username, and password may be passed as flags; anything missing\n\
        is prompted for interactively (password input is masked).",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Clone, Args)]
pub struct GlobalOpts {
    /// Name or IP address of the firewall/Panorama
    #[arg(long = "ip", short = 'i', env = "PANOPLY_HOST", global = true)]
    pub ip: Option<String>,

    /// User login
    #[arg(long, short = 'u', env = "PANOPLY_USERNAME", global = true)]
    pub username: Option<String>,

    /// Login password (prompted for when omitted)
    #[arg(
        long,
        short = 'p',
        env = "PANOPLY_PASSWORD",
        global = true,
        hide_env = true
    )]
    pub password: Option<String>,

    /// Accept self-signed TLS certificates on the management interface
    #[arg(long, short = 'k', env = "PANOPLY_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "PANOPLY_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Path to the configuration file
    #[arg(long, env = "PANOPLY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect, classify the endpoint, and print system information
    Info,

    /// Report address objects that carry tags but sit in no dynamic group
    #[command(alias = "audit")]
    TagAudit(TagAuditArgs),

    /// Submit file hashes to WildFire and report verdict totals
    #[command(alias = "wf")]
    Wildfire(WildfireArgs),

    /// Split multi-zone security rules into single-zone clones
    #[command(alias = "split")]
    ZoneSplit(ZoneSplitArgs),

    /// Inspect or initialize the configuration file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  TAG AUDIT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct TagAuditArgs {
    /// CSV file for known (group, member) memberships
    #[arg(long)]
    pub members_csv: Option<PathBuf>,

    /// CSV file for tagged-but-ungrouped anomalies
    #[arg(long)]
    pub anomalies_csv: Option<PathBuf>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WILDFIRE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WildfireArgs {
    /// Newline-delimited file of content hashes to submit
    #[arg(value_name = "HASH_FILE")]
    pub hash_file: PathBuf,

    /// WildFire API key (falls back to config / environment)
    #[arg(long, env = "PANOPLY_WILDFIRE_API_KEY", hide_env = true)]
    pub api_key: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ZONE SPLIT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ZoneSplitArgs {
    /// Device group whose post-rulebase is processed (overrides config)
    #[arg(long, short = 'g')]
    pub device_group: Option<String>,

    /// Marker tag applied to originals and clones (overrides config)
    #[arg(long)]
    pub tag: Option<String>,

    /// Clone name suffix before the sequence number (overrides config)
    #[arg(long)]
    pub suffix: Option<String>,

    /// Also split rules that are currently disabled
    #[arg(long)]
    pub include_disabled: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the resolved configuration (secrets redacted)
    Show,

    /// Write a commented default configuration file
    Init,

    /// Print the configuration file location
    Path,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
