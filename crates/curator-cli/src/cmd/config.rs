use crate::output::print_json;
use clap::Subcommand;
use curator_core::config::WarnLevel;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Parse and validate a config file without touching the network
    Validate {
        /// Path to the config file (YAML or JSON)
        config: PathBuf,
    },
}

pub fn run(subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Validate { config } => validate(&config, json),
    }
}

fn validate(path: &Path, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(path)?;
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "account": config.account,
            "rules": config.rules.len(),
            "nodes": config.effective_nodes(),
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!(
            "Config is valid: {} rule(s) for account '{}'.",
            config.rules.len(),
            config.account
        );
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}
