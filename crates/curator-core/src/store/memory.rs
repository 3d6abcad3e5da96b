use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{CuratorError, Result};
use crate::types::{ActionRecord, ContentRef};

use super::{CheckpointStore, DedupLedger};

/// In-process store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    checkpoint: Mutex<Option<u64>>,
    records: Mutex<HashMap<ContentRef, ActionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checkpoint(height: u64) -> Self {
        Self {
            checkpoint: Mutex::new(Some(height)),
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<ActionRecord> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.values().cloned().collect()
    }
}

impl CheckpointStore for MemoryStore {
    fn load_checkpoint(&self) -> Result<Option<u64>> {
        Ok(*self.checkpoint.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn save_checkpoint(&self, height: u64) -> Result<()> {
        *self.checkpoint.lock().unwrap_or_else(|e| e.into_inner()) = Some(height);
        Ok(())
    }
}

impl DedupLedger for MemoryStore {
    fn contains(&self, target: &ContentRef) -> Result<bool> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records.contains_key(target))
    }

    fn record(&self, record: &ActionRecord) -> Result<()> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let target = record.target();
        if records.contains_key(&target) {
            return Err(CuratorError::AlreadyRecorded {
                author: record.author.clone(),
                content_id: record.content_id.clone(),
            });
        }
        records.insert(target, record.clone());
        Ok(())
    }
}
