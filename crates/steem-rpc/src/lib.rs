//! `steem-rpc`: async client for Steem-compatible nodes.
//!
//! Reads go through [`SteemClient`], a `condenser_api` JSON-RPC client that
//! fails over between nodes. Votes go through [`BroadcastClient`], which
//! hands the operation to a SteemConnect-compatible signing service.

pub mod broadcast;
pub mod client;
pub mod error;
pub mod types;

pub use broadcast::{BroadcastClient, VoteOperation, DEFAULT_BROADCAST_URL};
pub use client::{SteemClient, DEFAULT_NODE};
pub use error::{Result, RpcError};
pub use types::{CommentOperation, Discussion, OperationEnvelope, SignedBlock};
