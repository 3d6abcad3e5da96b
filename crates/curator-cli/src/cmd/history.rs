use crate::output::{print_json, print_table};
use std::path::Path;

pub fn run(config_path: &Path, state_dir: Option<&Path>, limit: usize, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let (_, db) = super::open_state(&config, state_dir)?;
    let mut records = db.list_records()?;
    records.truncate(limit);

    if json {
        return print_json(&records);
    }

    if records.is_empty() {
        println!("No votes recorded.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            vec![
                r.acted_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                r.target().to_string(),
            ]
        })
        .collect();
    print_table(&["ACTED AT (UTC)", "CONTENT"], &rows);
    Ok(())
}
