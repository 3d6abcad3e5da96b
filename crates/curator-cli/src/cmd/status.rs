use crate::output::{print_fields, print_json};
use curator_core::store::CheckpointStore;
use std::path::Path;

pub fn run(config_path: &Path, state_dir: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let (db_path, db) = super::open_state(&config, state_dir)?;
    let checkpoint = db.load_checkpoint()?;
    let records = db.record_count()?;

    if json {
        let value = serde_json::json!({
            "account": config.account,
            "state_db": db_path,
            "checkpoint": checkpoint,
            "records": records,
            "rules": config.rules.len(),
        });
        return print_json(&value);
    }

    print_fields(&[
        ("account", config.account.clone()),
        ("state db", db_path.display().to_string()),
        (
            "checkpoint",
            checkpoint.map_or_else(|| "none".to_string(), |h| h.to_string()),
        ),
        ("votes recorded", records.to_string()),
        ("rules", config.rules.len().to_string()),
    ]);
    Ok(())
}
