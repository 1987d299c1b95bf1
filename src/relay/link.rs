use std::time::{Duration, Instant};

use log::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// Connection lifecycle for the relay: connect, and when it drops, try again
/// after a fixed delay, forever. No backoff, no give-up.
///
/// An attempt still Connecting after `attempt_timeout` counts as dropped, so a
/// transport that never reports back can't stall the retries.
///
/// Pure bookkeeping; the socket itself lives in `transport`.
#[derive(Debug)]
pub struct RelayLink {
    status: LinkStatus,
    retry_delay: Duration,
    attempt_timeout: Duration,
    attempt_started: Option<Instant>,
    next_attempt: Option<Instant>,
    dropped: bool, // lost at least once; the status line says offline until we're back
}

impl RelayLink {
    pub fn new(retry_delay: Duration, attempt_timeout: Duration) -> Self {
        Self {
            status: LinkStatus::Disconnected,
            retry_delay,
            attempt_timeout,
            attempt_started: None,
            next_attempt: None,
            dropped: false,
        }
    }

    /// Connect as soon as the next poll comes around.
    pub fn start(&mut self, now: Instant) {
        if self.status == LinkStatus::Disconnected && self.next_attempt.is_none() {
            self.next_attempt = Some(now);
        }
    }

    /// True when it's time to open a connection; the link is Connecting after.
    pub fn poll(&mut self, now: Instant) -> bool {
        if let Some(started) = self.attempt_started {
            if self.status == LinkStatus::Connecting && now >= started + self.attempt_timeout {
                warn!(
                    "relay attempt got no answer in {}ms, abandoning it",
                    self.attempt_timeout.as_millis()
                );
                self.on_closed(now);
                return false;
            }
        }
        match self.next_attempt {
            Some(at) if self.status == LinkStatus::Disconnected && now >= at => {
                self.next_attempt = None;
                self.attempt_started = Some(now);
                self.status = LinkStatus::Connecting;
                true
            }
            _ => false,
        }
    }

    pub fn on_open(&mut self) {
        info!("relay connected");
        self.status = LinkStatus::Connected;
        self.attempt_started = None;
        self.next_attempt = None;
        self.dropped = false;
    }

    /// The socket closed or never opened. Schedule the next attempt.
    pub fn on_closed(&mut self, now: Instant) {
        warn!(
            "lost connection to relay, retrying in {}ms",
            self.retry_delay.as_millis()
        );
        self.status = LinkStatus::Disconnected;
        self.attempt_started = None;
        self.dropped = true;
        self.next_attempt = Some(now + self.retry_delay);
    }

    #[cfg(test)]
    pub fn status(&self) -> LinkStatus {
        self.status
    }

    pub fn is_connected(&self) -> bool {
        self.status == LinkStatus::Connected
    }

    #[cfg(test)]
    pub fn next_attempt(&self) -> Option<Instant> {
        self.next_attempt
    }

    pub fn status_text(&self) -> &'static str {
        match self.status {
            LinkStatus::Connected => "NETWORK AUDIO LIVE",
            _ if self.dropped => "OFFLINE - RECONNECTING...",
            _ => "CONNECTING TO ROOM...",
        }
    }
}
