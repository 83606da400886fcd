//! Single-flight build gate.
//!
//! One permit guards the shared browser page. What happens to a trigger
//! that finds the permit taken is decided by the [`ConcurrencyPolicy`].

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Semaphore, SemaphorePermit};

/// How contending triggers are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConcurrencyPolicy {
    /// Discard the trigger. No retry, no queue.
    #[default]
    DropIfBusy,
}

/// Held for the duration of one build; dropping it reopens the gate.
#[derive(Debug)]
pub struct BuildPermit<'a> {
    _permit: SemaphorePermit<'a>,
}

#[derive(Debug)]
pub struct BuildGate {
    permit: Semaphore,
    policy: ConcurrencyPolicy,
    dropped: AtomicU64,
}

impl BuildGate {
    pub fn new(policy: ConcurrencyPolicy) -> Self {
        Self {
            permit: Semaphore::new(1),
            policy,
            dropped: AtomicU64::new(0),
        }
    }

    /// Enter according to the policy; `None` means the trigger was dropped.
    pub fn try_enter(&self) -> Option<BuildPermit<'_>> {
        match self.policy {
            ConcurrencyPolicy::DropIfBusy => match self.permit.try_acquire() {
                Ok(permit) => Some(BuildPermit { _permit: permit }),
                Err(_) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    None
                }
            },
        }
    }

    /// Wait for the gate regardless of policy.
    ///
    /// Used by reloads, which must not overlap a build but are never dropped.
    /// `None` only if the gate was closed.
    pub async fn enter(&self) -> Option<BuildPermit<'_>> {
        let permit = self.permit.acquire().await.ok()?;
        Some(BuildPermit { _permit: permit })
    }

    pub fn is_busy(&self) -> bool {
        self.permit.available_permits() == 0
    }

    /// Triggers dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn policy(&self) -> ConcurrencyPolicy {
        self.policy
    }
}

impl Default for BuildGate {
    fn default() -> Self {
        Self::new(ConcurrencyPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_second_entry_dropped() {
        let gate = BuildGate::default();
        let permit = gate.try_enter();
        assert!(permit.is_some());
        assert!(gate.is_busy());
        assert!(gate.try_enter().is_none());
        assert_eq!(gate.dropped(), 1);

        drop(permit);
        assert!(!gate.is_busy());
        assert!(gate.try_enter().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_enter_waits_for_build() {
        let gate = Arc::new(BuildGate::default());
        let permit = gate.try_enter().unwrap();

        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move {
                let _permit = gate.enter().await;
                tokio::time::Instant::now()
            })
        };

        let start = tokio::time::Instant::now();
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(permit);

        let entered = waiter.await.unwrap();
        assert!(entered - start >= Duration::from_millis(100));
        assert_eq!(gate.dropped(), 0);
    }
}
