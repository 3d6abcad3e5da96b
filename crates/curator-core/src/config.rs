use crate::error::{CuratorError, Result};
use crate::rules::{Rule, RuleTable};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Nodes used when the config lists none.
pub const DEFAULT_NODES: &[&str] = &["https://api.steemit.com"];

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Opaque credentials handed to the broadcast service.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub access_token: String,
    /// Overrides the default broadcast endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broadcast_url: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("broadcast_url", &self.broadcast_url)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ScannerSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerSettings {
    #[serde(default = "default_max_fetch_retries")]
    pub max_fetch_retries: u32,
    #[serde(default)]
    pub fetch_retry_pause_ms: u64,
    /// Used until the ledger reports its block interval.
    #[serde(default = "default_block_interval_secs")]
    pub default_block_interval_secs: u64,
}

fn default_max_fetch_retries() -> u32 {
    3
}

fn default_block_interval_secs() -> u64 {
    3
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            max_fetch_retries: default_max_fetch_retries(),
            fetch_retry_pause_ms: 0,
            default_block_interval_secs: default_block_interval_secs(),
        }
    }
}

impl ScannerSettings {
    pub fn fetch_retry_pause(&self) -> Duration {
        Duration::from_millis(self.fetch_retry_pause_ms)
    }

    pub fn default_block_interval(&self) -> Duration {
        Duration::from_secs(self.default_block_interval_secs)
    }
}

// ---------------------------------------------------------------------------
// SchedulerSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Total submit attempts per event, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_pause_ms")]
    pub retry_pause_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_pause_ms() -> u64 {
    3_000
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_pause_ms: default_retry_pause_ms(),
        }
    }
}

impl SchedulerSettings {
    pub fn retry_pause(&self) -> Duration {
        Duration::from_millis(self.retry_pause_ms)
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Account that casts the votes.
    pub account: String,
    #[serde(default)]
    pub nodes: Vec<String>,
    #[serde(default, alias = "keys")]
    pub credentials: Credentials,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub scanner: ScannerSettings,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CuratorError::ConfigNotFound(path.display().to_string()));
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Configured nodes, or [`DEFAULT_NODES`] when none are listed.
    pub fn effective_nodes(&self) -> Vec<String> {
        if self.nodes.is_empty() {
            DEFAULT_NODES.iter().map(|n| n.to_string()).collect()
        } else {
            self.nodes.clone()
        }
    }

    pub fn rule_table(&self) -> Result<RuleTable> {
        RuleTable::from_rules(self.rules.iter().cloned())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut error = |message: String| {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message,
            })
        };

        if self.account.trim().is_empty() {
            error("account must not be empty".to_string());
        }

        for node in &self.nodes {
            if !(node.starts_with("http://") || node.starts_with("https://")) {
                error(format!("node '{node}' is not an http(s) URL"));
            }
        }

        let mut seen = HashSet::new();
        for rule in &self.rules {
            if rule.author.trim().is_empty() {
                error("rule with empty author".to_string());
            } else if !seen.insert(rule.author.as_str()) {
                error(format!("duplicate rule for author '{}'", rule.author));
            }
        }

        if self.scheduler.max_attempts == 0 {
            error("scheduler.max_attempts must be at least 1".to_string());
        }

        if self.rules.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "no rules configured: nothing will be voted on".to_string(),
            });
        }

        if self.credentials.access_token.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "credentials.access_token is empty: votes will be rejected".to_string(),
            });
        }

        warnings
    }

    /// Load and reject configs with any error-level finding.
    pub fn load_validated(path: &Path) -> Result<(Self, Vec<ConfigWarning>)> {
        let cfg = Self::load(path)?;
        let findings = cfg.validate();
        if let Some(first) = findings.iter().find(|w| w.level == WarnLevel::Error) {
            return Err(CuratorError::InvalidConfig(first.message.clone()));
        }
        Ok((cfg, findings))
    }
}
