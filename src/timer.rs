//! Timers that feed the dispatch loop.
//!
//! Each timer is a spawned tokio task that sends a [`ClientEvent`] into the
//! event channel when it fires. One-shot timers sleep once; repeating timers
//! tick on a fixed period, starting one period after registration.
//!
//! Dropping or [`cancel`](Timer::cancel)ling the returned [`Timer`] aborts
//! the task, so no further events are sent.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::events::{ClientEvent, EventSender};

/// Handle to a running timer task.
#[derive(Debug)]
pub struct Timer {
    label: &'static str,
    task: JoinHandle<()>,
}

impl Timer {
    /// Fire `make_event()` every `period`, first after one period.
    ///
    /// The task ends on its own once the event receiver is dropped.
    pub fn every<F>(label: &'static str, period: Duration, tx: EventSender, make_event: F) -> Self
    where
        F: Fn() -> ClientEvent + Send + 'static,
    {
        log::debug!("[Timer] {label}: every {period:?}");
        let task = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                if tx.send(make_event()).is_err() {
                    break;
                }
            }
        });
        Self { label, task }
    }

    /// Fire `event` once after `delay`.
    pub fn after(label: &'static str, delay: Duration, tx: EventSender, event: ClientEvent) -> Self {
        log::debug!("[Timer] {label}: after {delay:?}");
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(event);
        });
        Self { label, task }
    }

    /// Stop the timer. Events already queued are not recalled.
    pub fn cancel(self) {
        log::debug!("[Timer] {}: cancelled", self.label);
        // Drop aborts the task
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events;

    #[tokio::test(start_paused = true)]
    async fn test_after_fires_once_after_delay() {
        let (tx, mut rx) = events::channel();
        let start = Instant::now();
        let _timer = Timer::after("quit", Duration::from_secs(3), tx, ClientEvent::Quit);

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, ClientEvent::Quit));
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_first_tick_after_one_period() {
        let (tx, mut rx) = events::channel();
        let start = Instant::now();
        let _timer = Timer::every("loop", Duration::from_millis(100), tx, || ClientEvent::CallLoop);

        for n in 1..=3u32 {
            let event = rx.recv().await.unwrap();
            assert!(matches!(event, ClientEvent::CallLoop));
            assert!(start.elapsed() >= Duration::from_millis(100) * n);
            assert!(start.elapsed() < Duration::from_millis(100) * (n + 1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let (tx, mut rx) = events::channel();
        let timer = Timer::every("loop", Duration::from_millis(100), tx, || ClientEvent::CallLoop);

        assert!(matches!(rx.recv().await, Some(ClientEvent::CallLoop)));
        timer.cancel();

        // The aborted task dropped its sender, so the channel closes
        assert!(rx.recv().await.is_none());
    }
}
