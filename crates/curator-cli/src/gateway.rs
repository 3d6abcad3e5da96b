//! [`LedgerGateway`] over the Steem JSON-RPC and broadcast clients.

use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

use curator_core::config::Config;
use curator_core::gateway::{GatewayError, LedgerGateway};
use curator_core::types::{Block, CommentOp, Content, ContentRef, Operation, Weight};
use steem_rpc::{
    BroadcastClient, Discussion, OperationEnvelope, RpcError, SignedBlock, SteemClient,
    VoteOperation,
};

pub struct SteemGateway {
    account: String,
    reader: SteemClient,
    broadcaster: BroadcastClient,
}

impl SteemGateway {
    pub fn from_config(config: &Config) -> Result<Self, RpcError> {
        Ok(Self {
            account: config.account.clone(),
            reader: SteemClient::new(config.effective_nodes())?,
            broadcaster: BroadcastClient::new(
                config.credentials.broadcast_url.as_deref(),
                config.credentials.access_token.clone(),
            )?,
        })
    }

    pub fn nodes(&self) -> &[String] {
        self.reader.nodes()
    }
}

#[async_trait]
impl LedgerGateway for SteemGateway {
    async fn head_height(&self) -> Result<u64, GatewayError> {
        self.reader.head_block_number().await.map_err(gateway_err)
    }

    async fn block_interval(&self) -> Result<Duration, GatewayError> {
        self.reader.block_interval().await.map_err(gateway_err)
    }

    async fn fetch_block(&self, height: u64) -> Result<Option<Block>, GatewayError> {
        let block = self.reader.get_block(height).await.map_err(gateway_err)?;
        Ok(block.map(|b| to_block(height, &b)))
    }

    async fn fetch_content(&self, target: &ContentRef) -> Result<Option<Content>, GatewayError> {
        let found = self
            .reader
            .get_content(&target.author, &target.content_id)
            .await
            .map_err(gateway_err)?;
        Ok(found.and_then(to_content))
    }

    async fn submit_action(&self, target: &ContentRef, weight: Weight) -> Result<(), GatewayError> {
        let vote = VoteOperation {
            voter: self.account.clone(),
            author: target.author.clone(),
            permlink: target.content_id.clone(),
            weight: weight.basis_points(),
        };
        self.broadcaster.vote(&vote).await.map_err(gateway_err)
    }
}

fn gateway_err(e: RpcError) -> GatewayError {
    match e {
        RpcError::AlreadyVoted(message) => GatewayError::AlreadyApplied(message),
        RpcError::Rejected(message) => GatewayError::Rejected(message),
        e @ RpcError::Node { .. } => GatewayError::Rejected(e.to_string()),
        e => GatewayError::Transport(e.to_string()),
    }
}

fn to_block(height: u64, block: &SignedBlock) -> Block {
    Block {
        height,
        operations: block.operations().map(to_operation).collect(),
    }
}

fn to_operation(op: &OperationEnvelope) -> Operation {
    match op.as_comment() {
        Some(c) => Operation::Comment(CommentOp {
            author: c.author,
            permlink: c.permlink,
            parent_author: c.parent_author,
        }),
        None => Operation::Other {
            kind: op.kind().to_string(),
        },
    }
}

/// Content with an unreadable creation time is malformed and treated as absent.
fn to_content(d: Discussion) -> Option<Content> {
    let Some(created) = d.created_at() else {
        warn!(author = %d.author, content_id = %d.permlink, created = %d.created, "unparseable creation time; ignoring content");
        return None;
    };
    let tags = d.tags();
    Some(Content {
        author: d.author,
        permlink: d.permlink,
        parent_author: d.parent_author,
        created,
        tags,
    })
}
