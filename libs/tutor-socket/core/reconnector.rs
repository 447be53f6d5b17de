//! Reconnect policy state machine
//!
//! The transport task consults a [`Reconnector`] at every close and every
//! timer expiry. Keeping the decisions here, away from the socket, makes the
//! "exactly one pending reconnect" and "nothing fires after teardown" rules
//! checkable without a network.
//!
//! ```text
//!            on_close(unexpected)            fire() while Disconnected
//!   Idle ───────────────────────────> Pending ──────────────────────────> attempt
//!    ^                                  │
//!    └────────── cancel() / teardown ───┘
//! ```

use crate::connection_state::ConnectionState;
use crate::traits::ReconnectionStrategy;
use std::time::Duration;
use tracing::{debug, warn};

/// Why the connection went away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCause {
    /// `close()` was called on the transport
    Requested,
    /// Peer closed, network dropped, or the connection attempt failed
    Unexpected,
}

pub struct Reconnector {
    strategy: Box<dyn ReconnectionStrategy>,
    /// Attempts made since the last successful connection
    attempt: usize,
    /// Delay of the scheduled reconnect, if one is pending
    pending: Option<Duration>,
}

impl Reconnector {
    pub fn new(strategy: Box<dyn ReconnectionStrategy>) -> Self {
        Self {
            strategy,
            attempt: 0,
            pending: None,
        }
    }

    /// Record a close and decide whether to schedule a reconnect.
    ///
    /// Returns the delay to wait when a reconnect was scheduled by this call.
    /// A requested close never schedules, and a second unexpected close while
    /// one attempt is already pending does not schedule another.
    pub fn on_close(&mut self, cause: CloseCause) -> Option<Duration> {
        if cause == CloseCause::Requested {
            self.cancel();
            return None;
        }

        if self.pending.is_some() {
            debug!("Reconnect already pending, not scheduling another");
            return None;
        }

        match self.strategy.next_delay(self.attempt) {
            Some(delay) => {
                self.pending = Some(delay);
                Some(delay)
            }
            None => {
                warn!("Reconnection strategy exhausted after {} attempts", self.attempt);
                None
            }
        }
    }

    /// The pending timer expired.
    ///
    /// Returns `true` when a connection attempt should be made. The attempt is
    /// a no-op (returns `false`) when nothing was pending, or when the
    /// connection is already open or opening.
    pub fn fire(&mut self, state: ConnectionState) -> bool {
        if self.pending.take().is_none() {
            return false;
        }

        if state.is_active() {
            debug!("Reconnect timer fired while {:?}, skipping attempt", state);
            return false;
        }

        self.attempt += 1;
        true
    }

    /// Cancel the pending reconnect. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// A connection was established
    pub fn on_connected(&mut self) {
        self.attempt = 0;
        self.pending = None;
        self.strategy.reset();
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn attempt(&self) -> usize {
        self.attempt
    }
}

impl std::fmt::Debug for Reconnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconnector")
            .field("attempt", &self.attempt)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}
