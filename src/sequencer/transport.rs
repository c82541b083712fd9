// Transport - Playback state and the fixed-period interval clock
// The clock only schedules deadlines; the sequencer decides what happens on each one

use std::time::{Duration, Instant};

/// Transport state (play/stop)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
}

impl TransportState {
    pub fn is_playing(&self) -> bool {
        matches!(self, TransportState::Playing)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, TransportState::Stopped)
    }
}

/// Fixed-period timer driven by caller-supplied instants.
///
/// Deadlines advance by exactly one period each time they are consumed, so a
/// late caller catches up on every missed interval instead of drifting.
#[derive(Debug, Clone)]
pub struct IntervalClock {
    period: Duration,
    next: Option<Instant>,
}

impl IntervalClock {
    pub fn new(period: Duration) -> Self {
        Self { period, next: None }
    }

    pub fn from_millis(interval_ms: u64) -> Self {
        Self::new(Duration::from_millis(interval_ms.max(1)))
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Start the clock; the first interval elapses one period after `now`
    pub fn start(&mut self, now: Instant) {
        self.next = Some(now + self.period);
    }

    pub fn stop(&mut self) {
        self.next = None;
    }

    pub fn is_running(&self) -> bool {
        self.next.is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.next
    }

    /// Consume one due interval, if any
    pub fn due(&mut self, now: Instant) -> bool {
        match self.next {
            Some(deadline) if deadline <= now => {
                self.next = Some(deadline + self.period);
                true
            }
            _ => false,
        }
    }
}
