use std::time::Duration;
use tokio::sync::watch;

/// Shutdown flag shared by the scanner and every action task.
pub fn channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

pub fn requested(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}

/// Sleep for `duration`. Returns `false` if shutdown was signalled first.
pub async fn sleep_or_shutdown(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    if requested(shutdown) {
        return false;
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = wait(shutdown) => false,
    }
}

/// Resolves once the flag is `true` or every sender is gone.
pub async fn wait(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
