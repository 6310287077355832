use std::time::Duration;
use tokio::time::Instant;

/// The session's single position-refresh timer, kept as one optional
/// deadline. Starting replaces whatever deadline was pending.
#[derive(Debug, Clone)]
pub struct RefreshCycle {
    period: Duration,
    next_at: Option<Instant>,
}

impl RefreshCycle {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            next_at: None,
        }
    }

    pub fn start(&mut self, now: Instant) {
        self.next_at = Some(now + self.period);
    }

    pub fn halt(&mut self) {
        self.next_at = None;
    }

    pub fn next_at(&self) -> Option<Instant> {
        self.next_at
    }

    /// Moves the deadline to the first tick after `now`, skipping any periods
    /// that were missed.
    pub fn advance(&mut self, now: Instant) {
        if let Some(at) = self.next_at {
            let mut next = at;
            while next <= now {
                next += self.period;
            }
            self.next_at = Some(next);
        }
    }
}
