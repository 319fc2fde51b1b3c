//! Round Timer
//!
//! A repeating task that fires once per period until its callback breaks
//! or the timer is cancelled. Dropping the timer cancels it.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Countdown period.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Handle to a running periodic task.
#[derive(Debug)]
pub struct RoundTimer {
    handle: JoinHandle<()>,
}

impl RoundTimer {
    /// Spawn a task calling `on_tick` every `period`, first after one period.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F, Fut>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            // A stalled device catches up one second at a time, not in a burst.
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                if on_tick().await.is_break() {
                    break;
                }
            }
        });
        Self { handle }
    }

    /// Whether the task has stopped.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the task.
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for RoundTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn counting(count: &Arc<AtomicU32>, stop_at: u32) -> RoundTimer {
        let count = Arc::clone(count);
        RoundTimer::spawn(TICK_PERIOD, move || {
            let count = Arc::clone(&count);
            async move {
                if count.fetch_add(1, Ordering::SeqCst) + 1 >= stop_at {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_per_period() {
        let count = Arc::new(AtomicU32::new(0));
        let _timer = counting(&count, u32::MAX);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2_600)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_break_stops_timer() {
        let count = Arc::new(AtomicU32::new(0));
        let timer = counting(&count, 2);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(timer.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_drop() {
        let count = Arc::new(AtomicU32::new(0));
        let timer = counting(&count, u32::MAX);
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        timer.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        let dropped = Arc::new(AtomicU32::new(0));
        drop(counting(&dropped, u32::MAX));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(dropped.load(Ordering::SeqCst), 0);
    }
}
