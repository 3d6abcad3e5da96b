//! Persistent state using redb.
//!
//! # Table design
//!
//! ```text
//! checkpoint: &str -> u64     single key "last_block"
//! actions:    &str -> &[u8]   "author/content_id" -> JSON ActionRecord
//! ```
//!
//! Every mutation is its own write transaction, so a crash never loses a
//! committed checkpoint or record.

use std::path::Path;

use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};

use crate::error::{CuratorError, Result};
use crate::types::{ActionRecord, ContentRef};

use super::{CheckpointStore, DedupLedger};

// ---------------------------------------------------------------------------
// Table definitions
// ---------------------------------------------------------------------------

const CHECKPOINT: TableDefinition<&str, u64> = TableDefinition::new("checkpoint");
const ACTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("actions");

const LAST_BLOCK_KEY: &str = "last_block";

fn db_err(e: impl std::fmt::Display) -> CuratorError {
    CuratorError::Store(e.to_string())
}

// ---------------------------------------------------------------------------
// StateDb
// ---------------------------------------------------------------------------

pub struct StateDb {
    db: Database,
}

impl StateDb {
    /// Open or create the database at `path`, creating parent directories and
    /// both tables.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(db_err)?;
        let wt = db.begin_write().map_err(db_err)?;
        wt.open_table(CHECKPOINT).map_err(db_err)?;
        wt.open_table(ACTIONS).map_err(db_err)?;
        wt.commit().map_err(db_err)?;
        Ok(Self { db })
    }

    /// All action records, newest first.
    pub fn list_records(&self) -> Result<Vec<ActionRecord>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(ACTIONS).map_err(db_err)?;

        let mut result = Vec::new();
        for entry in table.iter().map_err(db_err)? {
            let (_, v) = entry.map_err(db_err)?;
            let record: ActionRecord = serde_json::from_slice(v.value())?;
            result.push(record);
        }
        result.sort_by(|a, b| b.acted_at.cmp(&a.acted_at));
        Ok(result)
    }

    pub fn record_count(&self) -> Result<u64> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(ACTIONS).map_err(db_err)?;
        table.len().map_err(db_err)
    }
}

impl CheckpointStore for StateDb {
    fn load_checkpoint(&self) -> Result<Option<u64>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(CHECKPOINT).map_err(db_err)?;
        let value = table.get(LAST_BLOCK_KEY).map_err(db_err)?;
        Ok(value.map(|v| v.value()))
    }

    fn save_checkpoint(&self, height: u64) -> Result<()> {
        let wt = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = wt.open_table(CHECKPOINT).map_err(db_err)?;
            table.insert(LAST_BLOCK_KEY, height).map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(())
    }
}

impl DedupLedger for StateDb {
    fn contains(&self, target: &ContentRef) -> Result<bool> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(ACTIONS).map_err(db_err)?;
        let key = target.key();
        let found = table.get(key.as_str()).map_err(db_err)?.is_some();
        Ok(found)
    }

    fn record(&self, record: &ActionRecord) -> Result<()> {
        let key = record.target().key();
        let value = serde_json::to_vec(record)?;
        let wt = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = wt.open_table(ACTIONS).map_err(db_err)?;
            if table.get(key.as_str()).map_err(db_err)?.is_some() {
                return Err(CuratorError::AlreadyRecorded {
                    author: record.author.clone(),
                    content_id: record.content_id.clone(),
                });
            }
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
