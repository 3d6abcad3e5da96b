//! In-memory ledger and lock fakes shared by the unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::gateway::{GatewayError, LedgerGateway};
use crate::scheduler::{ExclusionLock, GlobalLock, LockGuard};
use crate::types::{Block, CommentOp, Content, ContentRef, Operation, Weight};

pub(crate) fn content(author: &str, permlink: &str, created: DateTime<Utc>, tags: &[&str]) -> Content {
    Content {
        author: author.into(),
        permlink: permlink.into(),
        parent_author: String::new(),
        created,
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

pub(crate) fn post_op(author: &str, permlink: &str) -> Operation {
    Operation::Comment(CommentOp {
        author: author.into(),
        permlink: permlink.into(),
        parent_author: String::new(),
    })
}

pub(crate) fn reply_op(author: &str, permlink: &str, parent: &str) -> Operation {
    Operation::Comment(CommentOp {
        author: author.into(),
        permlink: permlink.into(),
        parent_author: parent.into(),
    })
}

#[derive(Default)]
pub(crate) struct FakeGateway {
    head: AtomicU64,
    interval: Mutex<Duration>,
    blocks: Mutex<HashMap<u64, Block>>,
    /// Height → number of fetches that return `None` before the block appears.
    absent: Mutex<HashMap<u64, u32>>,
    /// Height → number of fetches that fail with a transport error.
    fetch_failures: Mutex<HashMap<u64, u32>>,
    content_failures: Mutex<HashMap<ContentRef, u32>>,
    contents: Mutex<HashMap<ContentRef, Content>>,
    submit_failures: Mutex<HashMap<ContentRef, u32>>,
    already_applied: Mutex<HashSet<ContentRef>>,
    submit_latency: Mutex<Duration>,
    in_flight: AtomicBool,
    reentered: AtomicBool,
    submit_attempts: AtomicUsize,
    content_fetches: AtomicUsize,
    submits: Mutex<Vec<ContentRef>>,
    fetched_heights: Mutex<Vec<u64>>,
}

impl FakeGateway {
    pub(crate) fn new() -> Self {
        let gw = Self::default();
        *gw.interval.lock().unwrap() = Duration::from_secs(3);
        gw
    }

    pub(crate) fn set_head(&self, height: u64) {
        self.head.store(height, Ordering::SeqCst);
    }

    pub(crate) fn put_block(&self, height: u64, operations: Vec<Operation>) {
        self.blocks
            .lock()
            .unwrap()
            .insert(height, Block { height, operations });
    }

    pub(crate) fn absent_for(&self, height: u64, times: u32) {
        self.absent.lock().unwrap().insert(height, times);
    }

    pub(crate) fn fail_fetches(&self, height: u64, times: u32) {
        self.fetch_failures.lock().unwrap().insert(height, times);
    }

    pub(crate) fn fail_content_lookups(&self, target: &ContentRef, times: u32) {
        self.content_failures
            .lock()
            .unwrap()
            .insert(target.clone(), times);
    }

    pub(crate) fn put_content(&self, c: Content) {
        let key = ContentRef::new(&c.author, &c.permlink);
        self.contents.lock().unwrap().insert(key, c);
    }

    pub(crate) fn fail_submits(&self, target: &ContentRef, times: u32) {
        self.submit_failures
            .lock()
            .unwrap()
            .insert(target.clone(), times);
    }

    pub(crate) fn mark_already_applied(&self, target: &ContentRef) {
        self.already_applied.lock().unwrap().insert(target.clone());
    }

    pub(crate) fn set_submit_latency(&self, latency: Duration) {
        *self.submit_latency.lock().unwrap() = latency;
    }

    pub(crate) fn submits(&self) -> Vec<ContentRef> {
        self.submits.lock().unwrap().clone()
    }

    pub(crate) fn submit_attempts(&self) -> usize {
        self.submit_attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn content_fetches(&self) -> usize {
        self.content_fetches.load(Ordering::SeqCst)
    }

    pub(crate) fn fetched_heights(&self) -> Vec<u64> {
        self.fetched_heights.lock().unwrap().clone()
    }

    pub(crate) fn reentered(&self) -> bool {
        self.reentered.load(Ordering::SeqCst)
    }
}

/// Consume one scheduled failure for `key`, if any remain.
fn take_one<K: std::hash::Hash + Eq>(failures: &Mutex<HashMap<K, u32>>, key: &K) -> bool {
    match failures.lock().unwrap().get_mut(key) {
        Some(remaining) if *remaining > 0 => {
            *remaining -= 1;
            true
        }
        _ => false,
    }
}

#[async_trait]
impl LedgerGateway for FakeGateway {
    async fn head_height(&self) -> Result<u64, GatewayError> {
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn block_interval(&self) -> Result<Duration, GatewayError> {
        Ok(*self.interval.lock().unwrap())
    }

    async fn fetch_block(&self, height: u64) -> Result<Option<Block>, GatewayError> {
        self.fetched_heights.lock().unwrap().push(height);
        if take_one(&self.fetch_failures, &height) {
            return Err(GatewayError::Transport("connection refused".into()));
        }
        {
            let mut absent = self.absent.lock().unwrap();
            if let Some(remaining) = absent.get_mut(&height) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Ok(None);
                }
            }
        }
        let block = self
            .blocks
            .lock()
            .unwrap()
            .get(&height)
            .cloned()
            .unwrap_or(Block {
                height,
                operations: Vec::new(),
            });
        Ok(Some(block))
    }

    async fn fetch_content(&self, target: &ContentRef) -> Result<Option<Content>, GatewayError> {
        self.content_fetches.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.content_failures, target) {
            return Err(GatewayError::Transport("timeout".into()));
        }
        Ok(self.contents.lock().unwrap().get(target).cloned())
    }

    async fn submit_action(&self, target: &ContentRef, _weight: Weight) -> Result<(), GatewayError> {
        self.submit_attempts.fetch_add(1, Ordering::SeqCst);
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.reentered.store(true, Ordering::SeqCst);
        }
        let latency = *self.submit_latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.store(false, Ordering::SeqCst);

        {
            let mut failures = self.submit_failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(target) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(GatewayError::Transport("node timed out".into()));
                }
            }
        }
        if self.already_applied.lock().unwrap().contains(target) {
            return Err(GatewayError::AlreadyApplied("You have already voted".into()));
        }
        self.submits.lock().unwrap().push(target.clone());
        Ok(())
    }
}

/// A real lock that counts acquisitions.
#[derive(Default)]
pub(crate) struct RecordingLock {
    inner: GlobalLock,
    acquisitions: Arc<AtomicUsize>,
}

impl RecordingLock {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    pub(crate) fn is_held(&self) -> bool {
        self.inner.is_held()
    }
}

#[async_trait]
impl ExclusionLock for RecordingLock {
    async fn acquire(&self) -> LockGuard {
        let guard = self.inner.acquire().await;
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        guard
    }
}
