// SPDX-License-Identifier: GPL-3.0-only

//! Periodic still-capture trigger
//!
//! A cancellable repeating timer that enqueues one capture request per
//! fire. The first fire is immediate. Cancelling is idempotent and safe
//! from teardown; dropping the trigger cancels it unconditionally.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::PipelineEvent;

/// Owned handle to the repeating capture timer
pub struct PeriodicTrigger {
    cancelled: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl PeriodicTrigger {
    /// Start firing at the given cadence; the first fire is immediate
    pub fn start(interval: Duration, events: mpsc::Sender<PipelineEvent>) -> Self {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if flag.load(Ordering::SeqCst) {
                    break;
                }
                if events.send(PipelineEvent::TriggerFired).await.is_err() {
                    debug!("Event channel closed; trigger exiting");
                    break;
                }
            }
        });

        Self { cancelled, handle }
    }

    /// Cancel the timer; no further fires occur
    ///
    /// Idempotent and safe to call from teardown paths.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.handle.abort();
            debug!("Periodic trigger cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Drop for PeriodicTrigger {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_first_fire_is_immediate() {
        let (tx, mut rx) = mpsc::channel(4);
        let trigger = PeriodicTrigger::start(Duration::from_secs(60), tx);

        let fired = timeout(Duration::from_millis(200), rx.recv()).await;
        assert!(matches!(fired, Ok(Some(PipelineEvent::TriggerFired))));

        trigger.cancel();
    }

    #[tokio::test]
    async fn test_fires_at_cadence() {
        let (tx, mut rx) = mpsc::channel(16);
        let trigger = PeriodicTrigger::start(Duration::from_millis(20), tx);

        for _ in 0..3 {
            let fired = timeout(Duration::from_millis(500), rx.recv()).await;
            assert!(matches!(fired, Ok(Some(PipelineEvent::TriggerFired))));
        }

        trigger.cancel();
    }

    #[tokio::test]
    async fn test_cancel_halts_fires() {
        let (tx, mut rx) = mpsc::channel(16);
        let trigger = PeriodicTrigger::start(Duration::from_millis(10), tx);

        // Consume the immediate fire, then cancel
        let _ = timeout(Duration::from_millis(200), rx.recv()).await;
        trigger.cancel();
        assert!(trigger.is_cancelled());

        // Drain whatever was in flight at cancellation time
        while rx.try_recv().is_ok() {}
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(rx.try_recv().is_err());

        // Cancelling again is a no-op
        trigger.cancel();
    }

    #[tokio::test]
    async fn test_drop_cancels() {
        let (tx, mut rx) = mpsc::channel(16);
        let trigger = PeriodicTrigger::start(Duration::from_millis(10), tx);
        let _ = timeout(Duration::from_millis(200), rx.recv()).await;
        drop(trigger);

        while rx.try_recv().is_ok() {}
        tokio::time::sleep(Duration::from_millis(60)).await;
        // Sender dropped with the trigger, so the channel reports closed
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
