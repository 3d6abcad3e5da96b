use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::CuratorError;

// ---------------------------------------------------------------------------
// ContentRef
// ---------------------------------------------------------------------------

/// Identifies a piece of content on the ledger: `@author/content_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentRef {
    pub author: String,
    pub content_id: String,
}

impl ContentRef {
    pub fn new(author: impl Into<String>, content_id: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            content_id: content_id.into(),
        }
    }

    /// Key used by the dedup table. `/` never appears in an account name.
    pub fn key(&self) -> String {
        format!("{}/{}", self.author, self.content_id)
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}/{}", self.author, self.content_id)
    }
}

// ---------------------------------------------------------------------------
// Weight
// ---------------------------------------------------------------------------

/// Signed vote weight, stored as basis points (`-10000..=10000`).
///
/// Configured and serialized as a percentage (`-100.0..=100.0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Weight(i16);

impl Weight {
    pub const FULL: Weight = Weight(10_000);

    pub fn from_percent(percent: f64) -> Result<Self, CuratorError> {
        if !percent.is_finite() || !(-100.0..=100.0).contains(&percent) {
            return Err(CuratorError::WeightOutOfRange(percent));
        }
        Ok(Weight((percent * 100.0).round() as i16))
    }

    pub fn basis_points(self) -> i16 {
        self.0
    }

    pub fn percent(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl TryFrom<f64> for Weight {
    type Error = CuratorError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Weight::from_percent(value)
    }
}

impl From<Weight> for f64 {
    fn from(w: Weight) -> f64 {
        w.percent()
    }
}

// ---------------------------------------------------------------------------
// Ledger data
// ---------------------------------------------------------------------------

/// A block as seen by the scanner. Operations keep ledger order.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub height: u64,
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Content creation or edit. Replies carry a non-empty `parent_author`.
    Comment(CommentOp),
    /// Any operation kind the scanner does not care about.
    Other { kind: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentOp {
    pub author: String,
    pub permlink: String,
    pub parent_author: String,
}

impl CommentOp {
    pub fn is_reply(&self) -> bool {
        !self.parent_author.is_empty()
    }

    pub fn content_ref(&self) -> ContentRef {
        ContentRef::new(&self.author, &self.permlink)
    }
}

/// The current state of a piece of content, fetched from the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    pub author: String,
    pub permlink: String,
    pub parent_author: String,
    pub created: DateTime<Utc>,
    pub tags: BTreeSet<String>,
}

impl Content {
    pub fn is_reply(&self) -> bool {
        !self.parent_author.is_empty()
    }
}

// ---------------------------------------------------------------------------
// CandidateEvent
// ---------------------------------------------------------------------------

/// A top-level post by a ruled author, ready for scheduling.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateEvent {
    pub target: ContentRef,
    pub created_at: DateTime<Utc>,
    pub tags: BTreeSet<String>,
}

impl CandidateEvent {
    pub fn from_content(content: Content) -> Self {
        Self {
            target: ContentRef::new(content.author, content.permlink),
            created_at: content.created,
            tags: content.tags,
        }
    }

    pub fn author(&self) -> &str {
        &self.target.author
    }
}

// ---------------------------------------------------------------------------
// ActionRecord
// ---------------------------------------------------------------------------

/// Durable marker that a vote was cast on `author/content_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub author: String,
    pub content_id: String,
    pub acted_at: DateTime<Utc>,
}

impl ActionRecord {
    pub fn new(target: &ContentRef, acted_at: DateTime<Utc>) -> Self {
        Self {
            author: target.author.clone(),
            content_id: target.content_id.clone(),
            acted_at,
        }
    }

    pub fn target(&self) -> ContentRef {
        ContentRef::new(&self.author, &self.content_id)
    }
}
