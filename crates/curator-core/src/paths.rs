use crate::error::{CuratorError, Result};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const STATE_DIR: &str = ".curator";
pub const STATE_DB: &str = "state.redb";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// Resolve the state directory.
///
/// Priority:
/// 1. `explicit` (`--state-dir` flag / `CURATOR_STATE_DIR`)
/// 2. `configured` (`state_dir` in the config file)
/// 3. `~/.curator`
pub fn resolve_state_dir(explicit: Option<&Path>, configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = explicit.or(configured) {
        return Ok(p.to_path_buf());
    }
    let home = home::home_dir().ok_or(CuratorError::HomeNotFound)?;
    Ok(home.join(STATE_DIR))
}

pub fn state_db_path(state_dir: &Path) -> PathBuf {
    state_dir.join(STATE_DB)
}
