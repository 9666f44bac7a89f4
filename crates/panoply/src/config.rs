//! CLI configuration: a flat TOML file with named, validated fields and
//! documented defaults, merged with `PANOPLY_`-prefixed environment
//! variables and CLI flags.
//!
//! Replaces the mutable per-deployment constants module the original
//! workflow relied on: everything is loaded once at startup.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use panoply_api::{TlsMode, TransportConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── TOML config structs ──────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Base name for the per-run log file; a timestamp and `.log` are
    /// appended.
    #[serde(default = "default_log_file")]
    pub log_file: String,

    /// Device group the zone-split task operates on.
    pub device_group: Option<String>,

    /// Marker tag applied to split originals and their clones.
    #[serde(default = "default_rule_tag")]
    pub rule_tag: String,

    /// Clone name suffix; the 1-based sequence number is appended.
    #[serde(default = "default_rule_suffix")]
    pub rule_suffix: String,

    /// Split rules even when they are disabled.
    #[serde(default)]
    pub include_disabled: bool,

    /// Rules carrying any of these tags are never split.
    #[serde(default)]
    pub ignore_tags: Vec<String>,

    /// CSV output for known (group, member) dynamic memberships.
    #[serde(default = "default_members_csv")]
    pub members_csv: PathBuf,

    /// CSV output for tagged-but-ungrouped address objects.
    #[serde(default = "default_anomalies_csv")]
    pub anomalies_csv: PathBuf,

    /// Accept self-signed certificates on the management interface.
    /// Defaults to true: management interfaces ship self-signed.
    #[serde(default = "default_insecure")]
    pub insecure: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default)]
    pub wildfire: WildfireConfig,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WildfireConfig {
    /// API key (plaintext -- prefer api_key_env or the environment).
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,

    /// WildFire endpoint base URL.
    #[serde(default = "default_wildfire_url")]
    pub url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
            device_group: None,
            rule_tag: default_rule_tag(),
            rule_suffix: default_rule_suffix(),
            include_disabled: false,
            ignore_tags: Vec::new(),
            members_csv: default_members_csv(),
            anomalies_csv: default_anomalies_csv(),
            insecure: default_insecure(),
            timeout: default_timeout(),
            wildfire: WildfireConfig::default(),
        }
    }
}

impl Default for WildfireConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: None,
            url: default_wildfire_url(),
        }
    }
}

fn default_log_file() -> String {
    "panoply".into()
}
fn default_rule_tag() -> String {
    "ZONE_SPLIT".into()
}
fn default_rule_suffix() -> String {
    "_clone_".into()
}
fn default_members_csv() -> PathBuf {
    "dag_members.csv".into()
}
fn default_anomalies_csv() -> PathBuf {
    "tagged_not_grouped.csv".into()
}
fn default_insecure() -> bool {
    true
}
fn default_timeout() -> u64 {
    30
}
fn default_wildfire_url() -> String {
    "https://wildfire.paloaltonetworks.com".into()
}

// ── Config file path ─────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("net", "panoply", "panoply")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("panoply");
            p.push("config.toml");
            p
        })
}

// ── Config loading ───────────────────────────────────────────────────

/// Load the configuration: defaults, then the TOML file, then
/// `PANOPLY_`-prefixed environment variables.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = global.config.clone().unwrap_or_else(config_path);

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("PANOPLY_CFG_").split("__"));

    let mut config: Config = figment.extract()?;

    if global.insecure {
        config.insecure = true;
    }
    if let Some(timeout) = global.timeout {
        config.timeout = timeout;
    }

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<(), CliError> {
    if config.timeout == 0 {
        return Err(CliError::Validation {
            field: "timeout".into(),
            reason: "must be greater than zero".into(),
        });
    }
    if config.rule_tag.trim().is_empty() {
        return Err(CliError::Validation {
            field: "rule_tag".into(),
            reason: "must not be empty".into(),
        });
    }
    if config.rule_suffix.trim().is_empty() {
        return Err(CliError::Validation {
            field: "rule_suffix".into(),
            reason: "must not be empty".into(),
        });
    }
    if config.log_file.trim().is_empty() {
        return Err(CliError::Validation {
            field: "log_file".into(),
            reason: "must not be empty".into(),
        });
    }
    Ok(())
}

impl Config {
    /// Translate the resolved settings into API transport settings.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: if self.insecure {
                TlsMode::DangerAcceptInvalid
            } else {
                TlsMode::System
            },
            timeout: Duration::from_secs(self.timeout),
        }
    }

    /// Resolve the WildFire API key through the credential chain:
    /// flag, named environment variable, config file.
    pub fn resolve_wildfire_key(&self, flag: Option<&str>) -> Result<SecretString, CliError> {
        if let Some(key) = flag {
            return Ok(SecretString::from(key.to_owned()));
        }

        if let Some(ref env_name) = self.wildfire.api_key_env {
            if let Ok(val) = std::env::var(env_name) {
                return Ok(SecretString::from(val));
            }
        }

        if let Some(ref key) = self.wildfire.api_key {
            return Ok(SecretString::from(key.clone()));
        }

        Err(CliError::NoApiKey)
    }
}

/// Commented template written by `panoply config init`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# panoply configuration
#
# Every field has a default; uncomment what you need to change.
# Values can also be supplied as PANOPLY_CFG_* environment variables.

# Base name for the per-run log file (timestamp + .log appended).
#log_file = "panoply"

# Device group the zone-split task operates on.
#device_group = "branch-offices"

# Marker tag applied to split originals and their clones.
#rule_tag = "ZONE_SPLIT"

# Clone name suffix; a 1-based sequence number is appended
# (e.g. "my_rule_clone_1").
#rule_suffix = "_clone_"

# Split rules even when they are disabled.
#include_disabled = false

# Rules carrying any of these tags are never split.
#ignore_tags = []

# CSV audit outputs for the tag-audit task.
#members_csv = "dag_members.csv"
#anomalies_csv = "tagged_not_grouped.csv"

# Accept self-signed certificates on the management interface.
#insecure = true

# Request timeout in seconds.
#timeout = 30

[wildfire]
# API key for verdict lookups; prefer api_key_env over plaintext.
#api_key = ""
#api_key_env = "WILDFIRE_API_KEY"
#url = "https://wildfire.paloaltonetworks.com"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn global_defaults() -> GlobalOpts {
        GlobalOpts {
            ip: None,
            username: None,
            password: None,
            insecure: false,
            timeout: None,
            config: None,
            verbose: 0,
        }
    }

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(validate(&config).is_ok());
        assert_eq!(config.rule_tag, "ZONE_SPLIT");
        assert_eq!(config.rule_suffix, "_clone_");
        assert!(!config.include_disabled);
    }

    #[test]
    fn template_parses_back_into_defaults() {
        let parsed: Config = toml::from_str(DEFAULT_CONFIG_TEMPLATE).expect("parse template");
        assert_eq!(parsed.rule_tag, Config::default().rule_tag);
        assert_eq!(parsed.wildfire.url, default_wildfire_url());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
                device_group = "branch"
                rule_tag = "SPLIT_DONE"
                ignore_tags = ["no-touch"]
                [wildfire]
                api_key = "k"
            "#,
        )
        .expect("write config");

        let mut global = global_defaults();
        global.config = Some(path);
        let config = load(&global).expect("load");
        assert_eq!(config.device_group.as_deref(), Some("branch"));
        assert_eq!(config.rule_tag, "SPLIT_DONE");
        assert_eq!(config.ignore_tags, ["no-touch"]);
        assert_eq!(config.wildfire.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut global = global_defaults();
        global.timeout = Some(0);
        let result = load(&global);
        assert!(matches!(result, Err(CliError::Validation { .. })));
    }

    #[test]
    fn wildfire_key_chain_prefers_the_flag() {
        let config = Config {
            wildfire: WildfireConfig {
                api_key: Some("from-config".into()),
                ..WildfireConfig::default()
            },
            ..Config::default()
        };
        use secrecy::ExposeSecret;
        let key = config
            .resolve_wildfire_key(Some("from-flag"))
            .expect("key");
        assert_eq!(key.expose_secret(), "from-flag");

        let key = config.resolve_wildfire_key(None).expect("key");
        assert_eq!(key.expose_secret(), "from-config");
    }

    #[test]
    fn missing_wildfire_key_is_an_error() {
        let config = Config::default();
        assert!(matches!(
            config.resolve_wildfire_key(None),
            Err(CliError::NoApiKey)
        ));
    }
}
