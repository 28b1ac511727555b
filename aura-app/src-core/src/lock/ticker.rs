//! Lockout countdown timer.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// Periodic tick source owned by a locked-out guard.
///
/// A spawned task sends one tick per period. Dropping the ticker aborts the
/// task, so a countdown never outlives the guard state that started it.
#[derive(Debug)]
pub struct LockoutTicker {
    ticks: mpsc::Receiver<()>,
    handle: JoinHandle<()>,
}

impl LockoutTicker {
    /// Start ticking. The first tick arrives one `period` from now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(period: Duration) -> Self {
        let (tx, ticks) = mpsc::channel(1);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                if tx.send(()).await.is_err() {
                    debug!("Lockout ticker receiver dropped");
                    break;
                }
            }
        });

        Self { ticks, handle }
    }

    /// Wait for the next tick. `None` once the task has stopped.
    pub async fn next(&mut self) -> Option<()> {
        self.ticks.recv().await
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for LockoutTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_once_per_period() {
        let start = Instant::now();
        let mut ticker = LockoutTicker::start(Duration::from_secs(1));

        ticker.next().await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(1));
        assert!(start.elapsed() < Duration::from_millis(1500));
        ticker.next().await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(start.elapsed() < Duration::from_millis(2500));
        assert!(ticker.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_task() {
        let ticker = LockoutTicker::start(Duration::from_secs(1));
        let abort = ticker.handle.abort_handle();
        assert!(!abort.is_finished());

        drop(ticker);
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(abort.is_finished());
    }
}
