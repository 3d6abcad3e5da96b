pub mod config;
pub mod history;
pub mod run;
pub mod status;

use anyhow::Context;
use curator_core::config::Config;
use curator_core::paths;
use curator_core::store::StateDb;
use std::path::{Path, PathBuf};

/// Load the config file and open its state database.
///
/// `state_dir` (`--state-dir` / `CURATOR_STATE_DIR`) wins over the config's
/// own `state_dir`.
pub(crate) fn open_state(config: &Config, state_dir: Option<&Path>) -> anyhow::Result<(PathBuf, StateDb)> {
    let dir = paths::resolve_state_dir(state_dir, config.state_dir.as_deref())?;
    let db_path = paths::state_db_path(&dir);
    let db = StateDb::open(&db_path)
        .with_context(|| format!("failed to open state database {}", db_path.display()))?;
    Ok((db_path, db))
}

pub(crate) fn load_config(path: &Path) -> anyhow::Result<Config> {
    Config::load(path).with_context(|| format!("failed to load config {}", path.display()))
}
