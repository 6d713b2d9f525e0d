//! Quiet-period debouncing of prompt edits.
//!
//! [`Debouncer`] is timer-agnostic: [`Debouncer::push`] hands out a
//! [`Ticket`] for the new quiet window and [`Debouncer::elapse`] accepts
//! only the newest ticket, so a timer that fires late for an older edit
//! can never overwrite state. The session owns the actual tokio timers.

use std::time::Duration;

use dreamer_core::prompt::is_blank;

/// Default quiet period between the last keystroke and a settled prompt.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(300);

/// Identifies one quiet window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

/// What the caller must do after pushing a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Debounced {
    /// Blank input: propagate now, without waiting out the quiet period.
    Immediate(String),
    /// Wait `after`, then call [`Debouncer::elapse`] with `ticket`.
    Scheduled { ticket: Ticket, after: Duration },
    /// Nothing pending and the value equals the settled one.
    Unchanged,
}

/// Latest-value-wins debouncer.
#[derive(Debug)]
pub struct Debouncer {
    quiet_period: Duration,
    settled: String,
    pending: Option<(Ticket, String)>,
    next_ticket: u64,
}

impl Debouncer {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            settled: String::new(),
            pending: None,
            next_ticket: 0,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// The last value that survived a full quiet period (or was blank).
    pub fn settled(&self) -> &str {
        &self.settled
    }

    /// `true` while a quiet window is open.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Record a new input value.
    ///
    /// Any earlier pending window is invalidated. Blank values settle
    /// immediately so downstream state can reset without delay.
    pub fn push(&mut self, value: &str) -> Debounced {
        if is_blank(value) {
            self.pending = None;
            self.settled = value.to_string();
            return Debounced::Immediate(value.to_string());
        }
        if self.pending.is_none() && value == self.settled {
            return Debounced::Unchanged;
        }

        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.pending = Some((ticket, value.to_string()));
        Debounced::Scheduled {
            ticket,
            after: self.quiet_period,
        }
    }

    /// A quiet window ended. Returns the settled value if `ticket` is still
    /// the newest one, `None` for superseded windows.
    pub fn elapse(&mut self, ticket: Ticket) -> Option<String> {
        match self.pending.take() {
            Some((current, value)) if current == ticket => {
                self.settled = value.clone();
                Some(value)
            }
            other => {
                self.pending = other;
                None
            }
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD)
    }
}
