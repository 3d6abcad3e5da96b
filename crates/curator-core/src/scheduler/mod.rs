//! Delayed, mutually-exclusive vote scheduling.
//!
//! Every [`CandidateEvent`] becomes its own task walking a small state machine:
//!
//! ```text
//! PendingCheck ──► Skipped
//!      │
//!      ├──► Waiting(d) ──(refresh content)──► PendingCheck
//!      │
//!      └──► Acting{attempt} ──► Done
//!                 │
//!                 └── failure, attempt < max ──► Acting{attempt + 1}
//!                 └── failure, attempt = max ──► Failed
//! ```
//!
//! Submissions run beneath one [`ExclusionLock`], so no two writes from this
//! process ever overlap. The lock covers the dedup re-check, the submit call
//! and the record write, and is released before any retry pause.
//!
//! Tasks are owned by a `JoinSet`. [`ActionScheduler::shutdown`] abandons
//! tasks that are waiting and lets a task that is mid-submit finish its
//! current attempt.

pub mod lock;

pub use lock::{ExclusionLock, GlobalLock, LockGuard};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::SchedulerSettings;
use crate::error::CuratorError;
use crate::gateway::{GatewayError, LedgerGateway};
use crate::rules::RuleTable;
use crate::shutdown;
use crate::store::DedupLedger;
use crate::types::{ActionRecord, CandidateEvent, ContentRef, Weight};

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoRule,
    AlreadyActed,
    Disqualified { tag: String },
    ContentGone,
    Reply,
}

/// Terminal state of one event's task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Skipped(SkipReason),
    Failed,
    /// Shutdown arrived before any side effect.
    Abandoned,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub done: u64,
    pub skipped: u64,
    pub failed: u64,
    pub abandoned: u64,
    /// Votes that landed on the ledger but whose record write failed. Also
    /// counted in `done`.
    pub unrecorded: u64,
}

#[derive(Debug, Default)]
struct Counters {
    done: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    abandoned: AtomicU64,
    unrecorded: AtomicU64,
}

impl Counters {
    fn count(&self, outcome: &Outcome) {
        let counter = match outcome {
            Outcome::Done => &self.done,
            Outcome::Skipped(_) => &self.skipped,
            Outcome::Failed => &self.failed,
            Outcome::Abandoned => &self.abandoned,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            done: self.done.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            unrecorded: self.unrecorded.load(Ordering::Relaxed),
        }
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

enum State {
    PendingCheck,
    Waiting(Duration),
    Acting { attempt: u32, weight: Weight },
}

enum AttemptResult {
    Voted,
    /// Submitted, but the dedup record could not be written.
    VotedUnrecorded(String),
    AlreadyActed,
    /// Dedup ledger unreadable; nothing was submitted.
    StoreUnavailable(String),
    Rejected(String),
}

// ---------------------------------------------------------------------------
// ActionScheduler
// ---------------------------------------------------------------------------

struct Inner {
    gateway: Arc<dyn LedgerGateway>,
    rules: Arc<RuleTable>,
    ledger: Arc<dyn DedupLedger>,
    lock: Arc<dyn ExclusionLock>,
    clock: Arc<dyn Clock>,
    settings: SchedulerSettings,
    shutdown: watch::Sender<bool>,
    counters: Counters,
}

pub struct ActionScheduler {
    inner: Arc<Inner>,
    tasks: Mutex<JoinSet<(ContentRef, Outcome)>>,
}

impl ActionScheduler {
    /// Scheduler with the default [`GlobalLock`] and the system clock.
    pub fn new(
        gateway: Arc<dyn LedgerGateway>,
        rules: Arc<RuleTable>,
        ledger: Arc<dyn DedupLedger>,
        settings: SchedulerSettings,
    ) -> Self {
        Self::with_parts(
            gateway,
            rules,
            ledger,
            Arc::new(GlobalLock::new()),
            Arc::new(SystemClock),
            settings,
        )
    }

    /// Scheduler with an injected exclusion lock and clock.
    pub fn with_parts(
        gateway: Arc<dyn LedgerGateway>,
        rules: Arc<RuleTable>,
        ledger: Arc<dyn DedupLedger>,
        lock: Arc<dyn ExclusionLock>,
        clock: Arc<dyn Clock>,
        settings: SchedulerSettings,
    ) -> Self {
        let (shutdown, _) = shutdown::channel();
        Self {
            inner: Arc::new(Inner {
                gateway,
                rules,
                ledger,
                lock,
                clock,
                settings,
                shutdown,
                counters: Counters::default(),
            }),
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Hand an event to its own task. Never blocks on the event's delay,
    /// the lock, or retries.
    pub fn schedule(&self, event: CandidateEvent) {
        if *self.inner.shutdown.borrow() {
            warn!(content = %event.target, "scheduler shutting down; event dropped");
            return;
        }
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        while let Some(res) = tasks.try_join_next() {
            log_join_error(res);
        }
        let inner = Arc::clone(&self.inner);
        let shutdown = self.inner.shutdown.subscribe();
        debug!(content = %event.target, "event scheduled");
        tasks.spawn(async move {
            let target = event.target.clone();
            let outcome = inner.drive(event, shutdown).await;
            inner.counters.count(&outcome);
            (target, outcome)
        });
    }

    pub fn stats(&self) -> SchedulerStats {
        self.inner.counters.snapshot()
    }

    /// Number of tasks not yet reaped.
    pub fn pending(&self) -> usize {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Wait for every outstanding task to finish on its own.
    ///
    /// Returns the outcomes of tasks not already reaped by `schedule`.
    pub async fn drain(&self) -> Vec<(ContentRef, Outcome)> {
        let mut set = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(|e| e.into_inner()));
        let mut finished = Vec::new();
        while let Some(res) = set.join_next().await {
            match res {
                Ok(pair) => finished.push(pair),
                Err(e) => log_join_error(Err(e)),
            }
        }
        finished
    }

    /// Signal shutdown and wait for all tasks.
    ///
    /// Waiting tasks exit at once. A task holding the lock completes its
    /// current attempt (submit plus record write) and then stops.
    pub async fn shutdown(&self) -> Vec<(ContentRef, Outcome)> {
        self.inner.shutdown.send_replace(true);
        let finished = self.drain().await;
        let stats = self.stats();
        info!(
            done = stats.done,
            skipped = stats.skipped,
            failed = stats.failed,
            abandoned = stats.abandoned,
            unrecorded = stats.unrecorded,
            "scheduler stopped"
        );
        finished
    }
}

fn log_join_error(res: Result<(ContentRef, Outcome), tokio::task::JoinError>) {
    if let Err(e) = res {
        error!(error = %e, "action task panicked");
    }
}

impl Inner {
    async fn drive(&self, mut event: CandidateEvent, mut shutdown: watch::Receiver<bool>) -> Outcome {
        let target = event.target.clone();
        let max_attempts = self.settings.max_attempts.max(1);
        let mut state = State::PendingCheck;

        loop {
            state = match state {
                State::PendingCheck => {
                    let Some(rule) = self.rules.get(event.author()) else {
                        return skipped(&target, SkipReason::NoRule);
                    };
                    match self.ledger.contains(&target) {
                        Ok(true) => return skipped(&target, SkipReason::AlreadyActed),
                        Ok(false) => {}
                        Err(e) => {
                            error!(content = %target, error = %e, "dedup lookup failed; event dropped");
                            return Outcome::Failed;
                        }
                    }
                    if let Some(tag) = rule.disqualifying_tag(&event.tags) {
                        return skipped(
                            &target,
                            SkipReason::Disqualified {
                                tag: tag.to_string(),
                            },
                        );
                    }

                    let elapsed = self.clock.now() - event.created_at;
                    let delay = rule.delay();
                    if elapsed >= delay {
                        State::Acting {
                            attempt: 1,
                            weight: rule.weight,
                        }
                    } else {
                        let remaining = (delay - elapsed).to_std().unwrap_or_default();
                        State::Waiting(remaining)
                    }
                }

                State::Waiting(remaining) => {
                    info!(
                        content = %target,
                        wait_secs = remaining.as_secs(),
                        "waiting before vote"
                    );
                    if !shutdown::sleep_or_shutdown(remaining, &mut shutdown).await {
                        debug!(content = %target, "shutdown while waiting");
                        return Outcome::Abandoned;
                    }
                    match self.gateway.fetch_content(&target).await {
                        Ok(Some(content)) if content.is_reply() => {
                            return skipped(&target, SkipReason::Reply);
                        }
                        Ok(Some(content)) => event.tags = content.tags,
                        Ok(None) => return skipped(&target, SkipReason::ContentGone),
                        Err(e) => {
                            warn!(content = %target, error = %e, "content refresh failed; rechecking with known tags");
                        }
                    }
                    State::PendingCheck
                }

                State::Acting { attempt, weight } => {
                    let Some(guard) = self.acquire_or_shutdown(&mut shutdown).await else {
                        debug!(content = %target, "shutdown while waiting for lock");
                        return Outcome::Abandoned;
                    };
                    let result = self.attempt(&target, weight).await;
                    drop(guard);

                    match result {
                        AttemptResult::Voted => {
                            info!(content = %target, attempt, weight = weight.percent(), "voted");
                            return Outcome::Done;
                        }
                        AttemptResult::VotedUnrecorded(reason) => {
                            error!(content = %target, attempt, reason = %reason, "vote cast but record write failed");
                            self.counters.unrecorded.fetch_add(1, Ordering::Relaxed);
                            return Outcome::Done;
                        }
                        AttemptResult::AlreadyActed => {
                            return skipped(&target, SkipReason::AlreadyActed);
                        }
                        AttemptResult::StoreUnavailable(reason) => {
                            error!(content = %target, reason = %reason, "dedup lookup failed; event dropped");
                            return Outcome::Failed;
                        }
                        AttemptResult::Rejected(reason) if attempt >= max_attempts => {
                            warn!(content = %target, attempt, reason = %reason, "vote failed; giving up");
                            return Outcome::Failed;
                        }
                        AttemptResult::Rejected(reason) => {
                            warn!(content = %target, attempt, reason = %reason, "vote failed; retrying");
                            if !shutdown::sleep_or_shutdown(self.settings.retry_pause(), &mut shutdown).await {
                                return Outcome::Abandoned;
                            }
                            State::Acting {
                                attempt: attempt + 1,
                                weight,
                            }
                        }
                    }
                }
            };
        }
    }

    /// One submission under the lock. The caller holds the guard.
    async fn attempt(&self, target: &ContentRef, weight: Weight) -> AttemptResult {
        match self.ledger.contains(target) {
            Ok(true) => return AttemptResult::AlreadyActed,
            Ok(false) => {}
            Err(e) => return AttemptResult::StoreUnavailable(e.to_string()),
        }

        match self.gateway.submit_action(target, weight).await {
            Ok(()) => {}
            Err(GatewayError::AlreadyApplied(msg)) => {
                info!(content = %target, detail = %msg, "already voted on ledger");
            }
            Err(e) => return AttemptResult::Rejected(e.to_string()),
        }

        match self
            .ledger
            .record(&ActionRecord::new(target, self.clock.now()))
        {
            Ok(()) | Err(CuratorError::AlreadyRecorded { .. }) => AttemptResult::Voted,
            Err(e) => AttemptResult::VotedUnrecorded(e.to_string()),
        }
    }

    async fn acquire_or_shutdown(&self, shutdown: &mut watch::Receiver<bool>) -> Option<LockGuard> {
        if shutdown::requested(shutdown) {
            return None;
        }
        tokio::select! {
            guard = self.lock.acquire() => Some(guard),
            _ = shutdown::wait(shutdown) => None,
        }
    }
}

fn skipped(target: &ContentRef, reason: SkipReason) -> Outcome {
    info!(content = %target, reason = ?reason, "skipped");
    Outcome::Skipped(reason)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
