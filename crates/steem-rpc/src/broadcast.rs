//! Vote submission through a SteemConnect-compatible broadcast service.
//!
//! The service signs on the account's behalf; this client only holds an
//! access token.

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::error::{Result, RpcError};

pub const DEFAULT_BROADCAST_URL: &str = "https://steemconnect.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Serialize)]
pub struct VoteOperation {
    pub voter: String,
    pub author: String,
    pub permlink: String,
    /// Basis points, `-10000..=10000`.
    pub weight: i16,
}

pub struct BroadcastClient {
    endpoint: String,
    access_token: String,
    http: Client,
}

impl fmt::Debug for BroadcastClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl BroadcastClient {
    /// `base_url` defaults to [`DEFAULT_BROADCAST_URL`].
    pub fn new(base_url: Option<&str>, access_token: impl Into<String>) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let base = base_url.unwrap_or(DEFAULT_BROADCAST_URL).trim_end_matches('/');
        Ok(Self {
            endpoint: format!("{base}/api/broadcast"),
            access_token: access_token.into(),
            http,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Broadcast one vote.
    ///
    /// A second vote on the same content fails with [`RpcError::AlreadyVoted`];
    /// other refusals are [`RpcError::Rejected`].
    pub async fn vote(&self, vote: &VoteOperation) -> Result<()> {
        let body = json!({ "operations": [["vote", vote]] });
        let response = self
            .http
            .post(&self.endpoint)
            .header(reqwest::header::AUTHORIZATION, &self.access_token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(status = status.as_u16(), author = %vote.author, permlink = %vote.permlink, "broadcast response");

        if let Some(message) = refusal(status, &text) {
            if message.to_lowercase().contains("already voted") {
                return Err(RpcError::AlreadyVoted(message));
            }
            return Err(RpcError::Rejected(message));
        }
        Ok(())
    }
}

/// The service's error message, if the response is a refusal. Errors can
/// arrive with a 2xx status, so the body is checked either way.
fn refusal(status: StatusCode, text: &str) -> Option<String> {
    let body: Value = serde_json::from_str(text).unwrap_or(Value::Null);
    let described = ["error_description", "error"]
        .iter()
        .find_map(|key| match body.get(*key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Object(obj)) => obj
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        });

    match described {
        Some(message) => Some(message),
        None if !status.is_success() => Some(format!("HTTP {}: {}", status.as_u16(), text.trim())),
        None => None,
    }
}
