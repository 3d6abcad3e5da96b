use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Held for the duration of one outbound write. Dropping it releases the lock.
pub struct LockGuard {
    _inner: Box<dyn Send>,
}

impl LockGuard {
    pub fn new(inner: impl Send + 'static) -> Self {
        Self {
            _inner: Box::new(inner),
        }
    }
}

/// The single process-wide exclusion serializing all vote submissions.
#[async_trait]
pub trait ExclusionLock: Send + Sync {
    async fn acquire(&self) -> LockGuard;
}

/// Default lock: one tokio mutex shared by every action task.
#[derive(Debug, Clone, Default)]
pub struct GlobalLock {
    inner: Arc<Mutex<()>>,
}

impl GlobalLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}

#[async_trait]
impl ExclusionLock for GlobalLock {
    async fn acquire(&self) -> LockGuard {
        LockGuard::new(Arc::clone(&self.inner).lock_owned().await)
    }
}
