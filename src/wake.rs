//! Exclusive wake resource.
//!
//! Models the platform wake lock: held from trigger acceptance until the
//! presentation resolves, keeping the process alive long enough to render
//! the alarm. The guard is an owned permit, so every exit path — user
//! action, timeout, error, panic unwind — releases it on drop.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Source of the single wake permit.
#[derive(Debug)]
pub struct WakeSource {
    permits: Arc<Semaphore>,
}

impl WakeSource {
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
        }
    }

    /// Acquire the wake resource, waiting until the current holder releases.
    pub async fn acquire(&self) -> WakeGuard {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .expect("wake semaphore is never closed");
        WakeGuard { _permit: permit }
    }

    /// Whether the resource is currently held.
    pub fn held(&self) -> bool {
        self.permits.available_permits() == 0
    }
}

impl Default for WakeSource {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard over the wake resource.
#[derive(Debug)]
pub struct WakeGuard {
    _permit: OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn guard_is_exclusive_and_released_on_drop() {
        let source = Arc::new(WakeSource::new());
        assert!(!source.held());

        let guard = source.acquire().await;
        assert!(source.held());

        // A second acquire must wait for the first guard to drop.
        let contender = {
            let source = Arc::clone(&source);
            tokio::spawn(async move {
                let _guard = source.acquire().await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("contender should acquire after release")
            .unwrap();
        assert!(!source.held());
    }
}
