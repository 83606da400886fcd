//! Network idle detection.
//!
//! A counter of in-flight requests plus one idle deadline. The deadline is
//! armed at subscription, cleared while more than `max_inflight` requests
//! are open, and re-armed when the count falls back to exactly
//! `max_inflight`. The wait ends the first time an armed deadline passes.

use std::time::Duration;

use tokio::time::{Instant, sleep_until};

use crate::browser::{BrowserPage, NetworkEvents, NetworkSignal};
use crate::debug;

/// Idle state machine, driven by signals and the clock.
#[derive(Debug, Clone)]
pub struct IdleTracker {
    inflight: usize,
    max_inflight: usize,
    timeout: Duration,
    deadline: Option<Instant>,
}

impl IdleTracker {
    /// A tracker whose first idle window starts at `now`.
    pub fn new(timeout: Duration, max_inflight: usize, now: Instant) -> Self {
        Self {
            inflight: 0,
            max_inflight,
            timeout,
            deadline: Some(now + timeout),
        }
    }

    pub fn on_signal(&mut self, signal: NetworkSignal, now: Instant) {
        match signal {
            NetworkSignal::RequestStarted => {
                self.inflight += 1;
                if self.inflight > self.max_inflight {
                    self.deadline = None;
                }
            }
            NetworkSignal::RequestFinished | NetworkSignal::RequestFailed => {
                // Finish events for requests started before subscribing.
                if self.inflight == 0 {
                    return;
                }
                self.inflight -= 1;
                if self.inflight == self.max_inflight {
                    self.deadline = Some(now + self.timeout);
                }
            }
        }
    }

    #[inline]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[inline]
    pub fn inflight(&self) -> usize {
        self.inflight
    }
}

/// Wait until the page has been network-idle for `timeout`.
///
/// Never fails: if the page cannot be subscribed to, returns at once.
pub async fn wait_for_network_idle(page: &dyn BrowserPage, timeout: Duration, max_inflight: usize) {
    match page.network_events().await {
        Ok(events) => wait_for_idle(events, timeout, max_inflight).await,
        Err(e) => debug!("render"; "network events unavailable, skipping idle wait: {}", e),
    }
}

/// Drive an [`IdleTracker`] from a signal subscription.
///
/// The subscription is dropped, and so unsubscribed, before returning.
pub async fn wait_for_idle(mut events: NetworkEvents, timeout: Duration, max_inflight: usize) {
    let mut tracker = IdleTracker::new(timeout, max_inflight, Instant::now());

    loop {
        let deadline = tracker.deadline();
        let fallback = Instant::now() + timeout;

        tokio::select! {
            biased;

            signal = events.recv() => match signal {
                Some(signal) => tracker.on_signal(signal, Instant::now()),
                None => {
                    // Nothing more will arrive: finish the current window,
                    // or stop if no window can ever open again.
                    if let Some(deadline) = deadline {
                        sleep_until(deadline).await;
                    }
                    break;
                }
            },
            () = sleep_until(deadline.unwrap_or(fallback)), if deadline.is_some() => break,
        }
    }

    drop(events);
}
