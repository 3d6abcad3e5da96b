//! Block ingestion loop.
//!
//! The scanner walks the ledger one height at a time, strictly in order,
//! persisting the checkpoint after every block. Candidate events go to an
//! [`EventSink`] (the [`ActionScheduler`] in production) without waiting on
//! their delays.
//!
//! A block the ledger reports as absent is retried a bounded number of times
//! and then skipped with an error log. A ledger that cannot be reached at all
//! is different: the pass ends without touching the checkpoint and the block
//! is tried again after one interval.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::ScannerSettings;
use crate::error::{CuratorError, Result};
use crate::gateway::{GatewayError, LedgerGateway};
use crate::rules::RuleTable;
use crate::scheduler::ActionScheduler;
use crate::shutdown;
use crate::store::CheckpointStore;
use crate::types::{Block, CandidateEvent, Operation};

// ---------------------------------------------------------------------------
// EventSink
// ---------------------------------------------------------------------------

/// Receives candidate events. Must not block.
pub trait EventSink: Send + Sync {
    fn dispatch(&self, event: CandidateEvent);
}

impl EventSink for ActionScheduler {
    fn dispatch(&self, event: CandidateEvent) {
        self.schedule(event);
    }
}

// ---------------------------------------------------------------------------
// BlockScanner
// ---------------------------------------------------------------------------

pub struct BlockScanner {
    gateway: Arc<dyn LedgerGateway>,
    rules: Arc<RuleTable>,
    checkpoints: Arc<dyn CheckpointStore>,
    sink: Arc<dyn EventSink>,
    settings: ScannerSettings,
    /// Last block interval reported by the ledger.
    interval: Duration,
}

impl BlockScanner {
    pub fn new(
        gateway: Arc<dyn LedgerGateway>,
        rules: Arc<RuleTable>,
        checkpoints: Arc<dyn CheckpointStore>,
        sink: Arc<dyn EventSink>,
        settings: ScannerSettings,
    ) -> Self {
        let interval = settings.default_block_interval();
        Self {
            gateway,
            rules,
            checkpoints,
            sink,
            settings,
            interval,
        }
    }

    /// Scan until shutdown is signalled.
    ///
    /// `start` is the first height to process. Without it, scanning resumes
    /// after the stored checkpoint, or at the current head on a first run.
    /// Returns an error only if the checkpoint cannot be read or written.
    pub async fn run(&mut self, start: Option<u64>, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut last = self.resume_point(start).await?;
        info!(last_processed = last, "scanner started");

        while !shutdown::requested(&shutdown) {
            let processed = self.catch_up(last, &shutdown).await?;
            if processed > last {
                last = processed;
                continue;
            }
            let interval = self.refresh_interval().await;
            debug!(interval_ms = interval.as_millis() as u64, "caught up; sleeping one block");
            if !shutdown::sleep_or_shutdown(interval, &mut shutdown).await {
                break;
            }
        }

        info!(last_processed = last, "scanner stopped");
        Ok(())
    }

    /// Height of the last block considered processed before scanning begins.
    pub async fn resume_point(&self, start: Option<u64>) -> Result<u64> {
        if let Some(start) = start {
            info!(start, "starting from explicit height");
            return Ok(start.saturating_sub(1));
        }
        if let Some(checkpoint) = self.checkpoints.load_checkpoint()? {
            info!(checkpoint, "resuming from checkpoint");
            return Ok(checkpoint);
        }
        let head = self
            .gateway
            .head_height()
            .await
            .map_err(|e| CuratorError::LedgerUnavailable(e.to_string()))?;
        self.checkpoints.save_checkpoint(head)?;
        info!(head, "no checkpoint; starting at current head");
        Ok(head)
    }

    /// Process every block after `last` up to the current head.
    ///
    /// Returns the new last-processed height. Stops early, after finishing
    /// the current block, if shutdown is signalled.
    pub async fn catch_up(&mut self, last: u64, shutdown: &watch::Receiver<bool>) -> Result<u64> {
        let head = match self.gateway.head_height().await {
            Ok(head) => head,
            Err(e) => {
                warn!(error = %e, "could not read head height");
                return Ok(last);
            }
        };

        let mut last = last;
        while head > last {
            if shutdown::requested(shutdown) {
                break;
            }
            let height = last + 1;
            if let Err(e) = self.process_block(height).await {
                warn!(height, error = %e, "ledger lookup failed; block left for the next pass");
                break;
            }
            if let Err(e) = self.checkpoints.save_checkpoint(height) {
                error!(height, error = %e, "checkpoint write failed");
                return Err(e);
            }
            last = height;
        }
        Ok(last)
    }

    /// Fetch, extract and dispatch one block. Returns the number of events
    /// dispatched.
    ///
    /// A transport error from the block or any content lookup aborts the
    /// block before anything is dispatched, so it can be processed again.
    pub async fn process_block(&self, height: u64) -> std::result::Result<usize, GatewayError> {
        let Some(block) = self.fetch_with_retry(height).await? else {
            return Ok(0);
        };
        if block.operations.is_empty() {
            debug!(height, "empty block");
            return Ok(0);
        }

        let events = self.extract(&block).await?;
        let count = events.len();
        for event in events {
            info!(height, content = %event.target, "candidate found");
            self.sink.dispatch(event);
        }
        debug!(height, operations = block.operations.len(), candidates = count, "processed block");
        Ok(count)
    }

    /// `Ok(None)` once the block has been reported absent on every attempt.
    async fn fetch_with_retry(&self, height: u64) -> std::result::Result<Option<Block>, GatewayError> {
        let attempts = self.settings.max_fetch_retries + 1;
        for attempt in 1..=attempts {
            if let Some(block) = self.gateway.fetch_block(height).await? {
                return Ok(Some(block));
            }
            warn!(height, attempt, "block unavailable");
            let pause = self.settings.fetch_retry_pause();
            if attempt < attempts && !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
        }
        error!(height, attempts, "block skipped after retries; its events are lost");
        Ok(None)
    }

    /// Top-level posts by ruled authors whose content still exists.
    async fn extract(&self, block: &Block) -> std::result::Result<Vec<CandidateEvent>, GatewayError> {
        let mut seen = HashSet::new();
        let mut events = Vec::new();

        for op in &block.operations {
            let Operation::Comment(comment) = op else {
                continue;
            };
            if comment.is_reply() || !self.rules.contains(&comment.author) {
                continue;
            }
            let target = comment.content_ref();
            if !seen.insert(target.clone()) {
                continue;
            }

            match self.gateway.fetch_content(&target).await? {
                Some(content) if content.is_reply() => {}
                Some(content) => events.push(CandidateEvent::from_content(content)),
                None => debug!(height = block.height, content = %target, "content no longer exists"),
            }
        }
        Ok(events)
    }

    async fn refresh_interval(&mut self) -> Duration {
        match self.gateway.block_interval().await {
            Ok(interval) if !interval.is_zero() => self.interval = interval,
            Ok(_) => {}
            Err(e) => warn!(error = %e, "could not read block interval; reusing last"),
        }
        self.interval
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
