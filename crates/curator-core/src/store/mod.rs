//! Durable state: scan progress and the record of votes already cast.
//!
//! The scanner and scheduler only see the [`CheckpointStore`] and
//! [`DedupLedger`] traits. [`StateDb`] is the redb-backed implementation used
//! by the binary; [`MemoryStore`] backs tests and dry runs.

pub mod db;
pub mod memory;

pub use db::StateDb;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::types::{ActionRecord, ContentRef};

/// Last fully-processed block height. Written only by the scanner.
pub trait CheckpointStore: Send + Sync {
    fn load_checkpoint(&self) -> Result<Option<u64>>;
    fn save_checkpoint(&self, height: u64) -> Result<()>;
}

/// Append-only set of `(author, content_id)` pairs already acted upon.
pub trait DedupLedger: Send + Sync {
    fn contains(&self, target: &ContentRef) -> Result<bool>;

    /// Append a record. Fails with `AlreadyRecorded` if the pair exists.
    fn record(&self, record: &ActionRecord) -> Result<()>;
}
