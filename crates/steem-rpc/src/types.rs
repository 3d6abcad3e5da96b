//! Wire types for the `condenser_api` calls this crate makes.
//!
//! Only the fields the client reads are declared; everything else the node
//! sends is ignored.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Node timestamps are UTC without an offset: `2018-03-09T16:36:00`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

// ---------------------------------------------------------------------------
// JSON-RPC envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(crate) struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub params: &'a Value,
    pub id: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcErrorBody {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

// ---------------------------------------------------------------------------
// Chain state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct DynamicGlobalProperties {
    pub head_block_number: u64,
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SignedBlock {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl SignedBlock {
    /// Every operation in the block, in ledger order.
    pub fn operations(&self) -> impl Iterator<Item = &OperationEnvelope> {
        self.transactions.iter().flat_map(|tx| tx.operations.iter())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub operations: Vec<OperationEnvelope>,
}

/// `["comment", {...}]` in the condenser encoding.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationEnvelope(pub String, pub Value);

impl OperationEnvelope {
    pub fn kind(&self) -> &str {
        &self.0
    }

    /// The body as a comment operation, if this is one.
    pub fn as_comment(&self) -> Option<CommentOperation> {
        if self.0 != "comment" {
            return None;
        }
        serde_json::from_value(self.1.clone()).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommentOperation {
    #[serde(default)]
    pub parent_author: String,
    pub author: String,
    pub permlink: String,
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// A post or reply as returned by `get_content`.
#[derive(Debug, Clone, Deserialize)]
pub struct Discussion {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub permlink: String,
    #[serde(default)]
    pub parent_author: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub json_metadata: String,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    #[serde(default)]
    tags: Vec<Value>,
}

impl Discussion {
    /// Nodes answer lookups of deleted content with an all-empty object.
    pub fn exists(&self) -> bool {
        !self.author.is_empty()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.created)
    }

    /// Category plus `json_metadata.tags`, lowercased. The category is kept
    /// even when the metadata does not parse.
    pub fn tags(&self) -> BTreeSet<String> {
        let meta_tags = serde_json::from_str::<Metadata>(&self.json_metadata)
            .map(|meta| meta.tags)
            .unwrap_or_default();
        std::iter::once(self.category.as_str())
            .chain(meta_tags.iter().filter_map(Value::as_str))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect()
    }
}
