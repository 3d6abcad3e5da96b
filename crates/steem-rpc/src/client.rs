//! JSON-RPC read client with node failover.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Result, RpcError};
use crate::types::{DynamicGlobalProperties, Discussion, RpcRequest, RpcResponse, SignedBlock};

pub const DEFAULT_NODE: &str = "https://api.steemit.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Config keys carrying the block interval in seconds, newest first.
const BLOCK_INTERVAL_KEYS: &[&str] = &["STEEM_BLOCK_INTERVAL", "STEEMIT_BLOCK_INTERVAL"];

/// Read-only client over a list of nodes.
///
/// Requests go to the node that last answered. A transport failure moves on
/// to the next node in the list; a JSON-RPC error from a node is returned
/// as-is, since another node would give the same answer.
pub struct SteemClient {
    nodes: Vec<String>,
    http: Client,
    preferred: AtomicUsize,
    next_id: AtomicU64,
}

impl SteemClient {
    pub fn new(nodes: Vec<String>) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Self::with_http(nodes, http)
    }

    pub fn with_http(nodes: Vec<String>, http: Client) -> Result<Self> {
        if nodes.is_empty() {
            return Err(RpcError::NoNodes);
        }
        let nodes = nodes
            .into_iter()
            .map(|n| n.trim_end_matches('/').to_string())
            .collect();
        Ok(Self {
            nodes,
            http,
            preferred: AtomicUsize::new(0),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    // -----------------------------------------------------------------------
    // condenser_api
    // -----------------------------------------------------------------------

    pub async fn dynamic_global_properties(&self) -> Result<DynamicGlobalProperties> {
        self.call("condenser_api.get_dynamic_global_properties", json!([]))
            .await
    }

    pub async fn head_block_number(&self) -> Result<u64> {
        Ok(self.dynamic_global_properties().await?.head_block_number)
    }

    pub async fn block_interval(&self) -> Result<Duration> {
        let method = "condenser_api.get_config";
        let config: Value = self.call(method, json!([])).await?;
        BLOCK_INTERVAL_KEYS
            .iter()
            .find_map(|key| config.get(*key).and_then(Value::as_u64))
            .map(Duration::from_secs)
            .ok_or_else(|| RpcError::Decode {
                method: method.to_string(),
                message: "no block interval in chain config".to_string(),
            })
    }

    /// `None` when the node does not have the block yet.
    pub async fn get_block(&self, height: u64) -> Result<Option<SignedBlock>> {
        self.call("condenser_api.get_block", json!([height])).await
    }

    /// `None` when the content does not exist (or was deleted).
    pub async fn get_content(&self, author: &str, permlink: &str) -> Result<Option<Discussion>> {
        let found: Option<Discussion> = self
            .call("condenser_api.get_content", json!([author, permlink]))
            .await?;
        Ok(found.filter(Discussion::exists))
    }

    // -----------------------------------------------------------------------
    // Transport
    // -----------------------------------------------------------------------

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let start = self.preferred.load(Ordering::Relaxed) % self.nodes.len();
        let mut last = None;

        for offset in 0..self.nodes.len() {
            let index = (start + offset) % self.nodes.len();
            let node = &self.nodes[index];
            match self.call_node(node, method, &params).await {
                Ok(value) => {
                    if index != start {
                        debug!(node = %node, "switched to node");
                        self.preferred.store(index, Ordering::Relaxed);
                    }
                    return serde_json::from_value(value).map_err(|e| RpcError::Decode {
                        method: method.to_string(),
                        message: e.to_string(),
                    });
                }
                Err(e) if e.is_transport() => {
                    warn!(node = %node, method, error = %e, "node unreachable; trying next");
                    last = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(RpcError::AllNodesFailed {
            tried: self.nodes.len(),
            last: last.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    async fn call_node(&self, node: &str, method: &str, params: &Value) -> Result<Value> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };
        let response: RpcResponse = self
            .http
            .post(node)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(RpcError::Node {
                node: node.to_string(),
                method: method.to_string(),
                code: err.code,
                message: err.message,
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn rpc_result(result: Value) -> String {
        json!({"jsonrpc": "2.0", "id": 1, "result": result}).to_string()
    }

    fn method(name: &str) -> Matcher {
        Matcher::PartialJson(json!({ "method": name }))
    }

    #[tokio::test]
    async fn head_block_number_reads_global_properties() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(method("condenser_api.get_dynamic_global_properties"))
            .with_status(200)
            .with_body(rpc_result(json!({"head_block_number": 21000000, "time": "2018-03-09T16:36:00"})))
            .create_async()
            .await;

        let client = SteemClient::new(vec![server.url()]).unwrap();
        assert_eq!(client.head_block_number().await.unwrap(), 21_000_000);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn block_interval_accepts_legacy_key() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/")
            .match_body(method("condenser_api.get_config"))
            .with_body(rpc_result(json!({"STEEMIT_BLOCK_INTERVAL": 3, "STEEM_CHAIN_ID": "00"})))
            .create_async()
            .await;

        let client = SteemClient::new(vec![server.url()]).unwrap();
        assert_eq!(client.block_interval().await.unwrap(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn null_block_is_absent() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({"method": "condenser_api.get_block", "params": [99]})))
            .with_body(rpc_result(Value::Null))
            .create_async()
            .await;

        let client = SteemClient::new(vec![server.url()]).unwrap();
        assert!(client.get_block(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleted_content_is_absent() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/")
            .match_body(method("condenser_api.get_content"))
            .with_body(rpc_result(json!({"author": "", "permlink": "", "category": ""})))
            .create_async()
            .await;

        let client = SteemClient::new(vec![server.url()]).unwrap();
        assert!(client.get_content("alice", "gone").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transport_failure_fails_over_to_next_node() {
        let mut down = Server::new_async().await;
        let mut up = Server::new_async().await;
        let down_mock = down
            .mock("POST", "/")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;
        let up_mock = up
            .mock("POST", "/")
            .with_body(rpc_result(json!({"head_block_number": 7})))
            .expect(2)
            .create_async()
            .await;

        let client = SteemClient::new(vec![down.url(), up.url()]).unwrap();
        assert_eq!(client.head_block_number().await.unwrap(), 7);
        // The working node is now preferred.
        assert_eq!(client.head_block_number().await.unwrap(), 7);

        down_mock.assert_async().await;
        up_mock.assert_async().await;
    }

    #[tokio::test]
    async fn node_error_is_not_retried_elsewhere() {
        let mut first = Server::new_async().await;
        let mut second = Server::new_async().await;
        first
            .mock("POST", "/")
            .with_body(
                json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32000, "message": "bad cast"}})
                    .to_string(),
            )
            .create_async()
            .await;
        let untouched = second
            .mock("POST", "/")
            .expect(0)
            .create_async()
            .await;

        let client = SteemClient::new(vec![first.url(), second.url()]).unwrap();
        let err = client.get_block(1).await.unwrap_err();
        assert!(matches!(err, RpcError::Node { code: -32000, .. }));
        untouched.assert_async().await;
    }

    #[tokio::test]
    async fn all_nodes_down_is_reported() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(502)
            .create_async()
            .await;

        let client = SteemClient::new(vec![server.url()]).unwrap();
        let err = client.head_block_number().await.unwrap_err();
        assert!(matches!(err, RpcError::AllNodesFailed { tried: 1, .. }));
    }

    #[test]
    fn empty_node_list_is_rejected() {
        assert!(matches!(SteemClient::new(vec![]), Err(RpcError::NoNodes)));
    }
}
