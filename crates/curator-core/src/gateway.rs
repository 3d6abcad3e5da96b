//! The ledger as seen by the scanner and scheduler.
//!
//! Implementations live outside this crate (the binary adapts `steem-rpc`);
//! tests substitute in-memory fakes.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::types::{Block, Content, ContentRef, Weight};

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Network failure, timeout, or a node answering with garbage.
    #[error("ledger request failed: {0}")]
    Transport(String),

    /// The ledger refused the request.
    #[error("ledger rejected request: {0}")]
    Rejected(String),

    /// The exclusive action already exists on the ledger (e.g. a second vote
    /// on the same content).
    #[error("action already applied: {0}")]
    AlreadyApplied(String),
}

#[async_trait]
pub trait LedgerGateway: Send + Sync {
    async fn head_height(&self) -> Result<u64, GatewayError>;

    /// Current block interval. Not assumed constant across a run.
    async fn block_interval(&self) -> Result<Duration, GatewayError>;

    /// `Ok(None)` means the block is temporarily unavailable.
    async fn fetch_block(&self, height: u64) -> Result<Option<Block>, GatewayError>;

    /// `Ok(None)` means the content no longer exists.
    async fn fetch_content(&self, target: &ContentRef) -> Result<Option<Content>, GatewayError>;

    async fn submit_action(&self, target: &ContentRef, weight: Weight) -> Result<(), GatewayError>;
}
