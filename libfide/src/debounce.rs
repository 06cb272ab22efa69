//! Delaying an action until input has been quiet for a while.
//!
//! The gate itself holds no timer. Whoever triggers it schedules a wake-up after
//! [`DebounceGate::delay_ms`] and calls [`DebounceGate::fire`] with the ticket it was
//! given. Only the newest ticket can fire, and only if the snapshot captured at trigger
//! time still matches the current state.

/// Result of a timer firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceOutcome {
    /// Latest trigger and the input is unchanged; the action should run.
    Run,
    /// A newer trigger (or a cancel) replaced this one.
    Superseded,
    /// The state changed after the trigger without re-triggering.
    Stale,
}

#[derive(Debug)]
pub struct DebounceGate<T> {
    delay_ms: u64,
    last_ticket: u64,
    pending: Option<(u64, T)>,
}

impl<T: PartialEq> DebounceGate<T> {
    #[must_use]
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            last_ticket: 0,
            pending: None,
        }
    }

    #[must_use]
    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    /// Replaces any pending trigger and returns the ticket the timer must fire with.
    pub fn trigger(&mut self, snapshot: T) -> u64 {
        self.last_ticket += 1;
        self.pending = Some((self.last_ticket, snapshot));
        self.last_ticket
    }

    pub fn fire(&mut self, ticket: u64, current: &T) -> DebounceOutcome {
        match &self.pending {
            Some((pending_ticket, _)) if *pending_ticket == ticket => {}
            _ => return DebounceOutcome::Superseded,
        }
        match self.pending.take() {
            Some((_, snapshot)) if snapshot == *current => DebounceOutcome::Run,
            _ => DebounceOutcome::Stale,
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
