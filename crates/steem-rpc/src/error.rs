use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    /// Connection failure, timeout, non-2xx status or an undecodable body.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The node answered with a JSON-RPC error object.
    #[error("{method} failed on {node}: {message} (code {code})")]
    Node {
        node: String,
        method: String,
        code: i64,
        message: String,
    },

    #[error("unexpected response for {method}: {message}")]
    Decode { method: String, message: String },

    #[error("no nodes configured")]
    NoNodes,

    #[error("all {tried} nodes failed; last error: {last}")]
    AllNodesFailed { tried: usize, last: String },

    #[error("broadcast rejected: {0}")]
    Rejected(String),

    #[error("already voted: {0}")]
    AlreadyVoted(String),
}

impl RpcError {
    /// Whether another node might answer the same request differently.
    pub fn is_transport(&self) -> bool {
        matches!(self, RpcError::Http(_) | RpcError::AllNodesFailed { .. })
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;
