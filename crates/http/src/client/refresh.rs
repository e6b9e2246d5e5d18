//! Coordination of credential refreshes across overlapping requests
//!
//! When several requests see an expired credential at about the same time,
//! only the first one refreshes. The others wait a fixed backoff and then
//! retry with whatever credential is current. This is best effort: followers
//! are not queued behind the leader.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

/// Default wait for requests that find a refresh already in flight
pub const DEFAULT_REFRESH_BACKOFF: Duration = Duration::from_millis(100);

/// Shared in-flight flag plus the follower backoff
#[derive(Debug, Clone)]
pub struct RefreshCoordinator {
    in_flight: Arc<AtomicBool>,
    backoff: Duration,
}

/// Role handed out by [`RefreshCoordinator::begin`]
#[derive(Debug)]
pub enum RetryTicket {
    /// This caller owns the refresh; the flag clears when the guard drops
    Leader(RefreshGuard),
    /// A refresh is already in flight
    Follower,
}

/// Clears the in-flight flag on drop
#[derive(Debug)]
pub struct RefreshGuard {
    in_flight: Arc<AtomicBool>,
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
        debug!("Refresh finished");
    }
}

impl RefreshCoordinator {
    pub fn new(backoff: Duration) -> Self {
        Self {
            in_flight: Arc::new(AtomicBool::new(false)),
            backoff,
        }
    }

    pub const fn backoff(&self) -> Duration {
        self.backoff
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Atomically claim the refresh if nobody holds it
    pub fn begin(&self) -> RetryTicket {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            debug!("Refresh claimed");
            RetryTicket::Leader(RefreshGuard {
                in_flight: Arc::clone(&self.in_flight),
            })
        } else {
            RetryTicket::Follower
        }
    }

    /// Wait used by followers before their retry
    pub async fn wait(&self) {
        debug!(backoff_ms = self.backoff.as_millis(), "Refresh in flight, backing off");
        tokio::time::sleep(self.backoff).await;
    }
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_BACKOFF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[test]
    fn only_first_caller_leads() {
        let coordinator = RefreshCoordinator::default();

        let first = coordinator.begin();
        assert!(matches!(first, RetryTicket::Leader(_)));
        assert!(coordinator.is_in_flight());

        let second = coordinator.begin();
        assert!(matches!(second, RetryTicket::Follower));
        assert!(coordinator.is_in_flight());

        drop(first);
        assert!(!coordinator.is_in_flight());
        assert!(matches!(coordinator.begin(), RetryTicket::Leader(_)));
    }

    #[test]
    fn clones_share_the_flag() {
        let coordinator = RefreshCoordinator::default();
        let clone = coordinator.clone();

        let _leader = coordinator.begin();
        assert!(matches!(clone.begin(), RetryTicket::Follower));
    }

    #[tokio::test(start_paused = true)]
    async fn follower_waits_the_backoff() {
        let coordinator = RefreshCoordinator::default();
        let _leader = coordinator.begin();

        let RetryTicket::Follower = coordinator.begin() else {
            panic!("second caller must follow");
        };

        let started = Instant::now();
        coordinator.wait().await;
        assert_eq!(started.elapsed(), DEFAULT_REFRESH_BACKOFF);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_callers() {
        let coordinator = RefreshCoordinator::new(Duration::from_millis(250));

        let leader = coordinator.begin();
        assert!(matches!(leader, RetryTicket::Leader(_)));

        let follower = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                let started = Instant::now();
                match coordinator.begin() {
                    RetryTicket::Leader(_) => None,
                    RetryTicket::Follower => {
                        coordinator.wait().await;
                        Some(started.elapsed())
                    }
                }
            })
        };

        // Simulated refresh round trip, shorter than the backoff
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(leader);

        assert_eq!(follower.await.unwrap(), Some(Duration::from_millis(250)));
        assert!(!coordinator.is_in_flight());
    }
}
