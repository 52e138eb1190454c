use crate::logger::*;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Seconds-remaining ticker backing the "try again in m:ss" display.
///
/// The value only moves down, one step per tick, and stops at zero. Dropping
/// the countdown cancels its task.
pub struct Countdown {
    remaining: watch::Receiver<u32>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Countdown {
    pub fn start(seconds: u32, tick: Duration) -> Self {
        Self::start_with_expiry(seconds, tick, || {})
    }

    /// Like [`Countdown::start`], calling `on_expired` once zero is reached.
    /// A cancelled countdown never calls it.
    pub fn start_with_expiry<F>(seconds: u32, tick: Duration, on_expired: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let (tx, rx) = watch::channel(seconds);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut remaining = seconds;
            let mut interval = tokio::time::interval_at(Instant::now() + tick, tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            while remaining > 0 {
                tokio::select! {
                    _ = token.cancelled() => {
                        trace!(remaining, "countdown cancelled");
                        return;
                    }
                    _ = interval.tick() => {
                        remaining -= 1;
                        tx.send_replace(remaining);
                    }
                }
            }

            if !token.is_cancelled() {
                trace!("countdown expired");
                on_expired();
            }
        });

        Self {
            remaining: rx,
            cancel,
            handle,
        }
    }

    pub fn remaining(&self) -> u32 {
        *self.remaining.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.remaining.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
