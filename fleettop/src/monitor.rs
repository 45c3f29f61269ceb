//! Manual-refresh vs. continuous-polling state machine.
//!
//! Polls are chained, not fixed-rate: the next tick is armed `interval` after
//! the previous poll completed, so a slow poll delays the cadence instead of
//! overlapping it. Stopping cancels the armed tick; a poll already in flight
//! still lands but arms nothing.

use std::time::{Duration, Instant};

pub const DEFAULT_INTERVAL_SECS: u64 = 60;
pub const MIN_INTERVAL_SECS: u64 = 10;

/// Reads an interval field the way a lenient numeric input does: leading
/// whitespace and trailing junk are ignored, zero or no digits fall back to
/// the default, and the result is clamped to the minimum.
pub fn resolve_interval(input: &str) -> u64 {
    let secs = match leading_int(input) {
        Some(v) if v != 0 => v,
        _ => DEFAULT_INTERVAL_SECS as i64,
    };
    secs.max(MIN_INTERVAL_SECS as i64) as u64
}

fn leading_int(input: &str) -> Option<i64> {
    let s = input.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits: &str = &digits[..digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len())];
    if digits.is_empty() {
        return None;
    }
    let magnitude = digits
        .bytes()
        .fold(0i64, |acc, b| acc.saturating_mul(10).saturating_add(i64::from(b - b'0')));
    Some(if negative { -magnitude } else { magnitude })
}

/// A single pending tick that can be cancelled before it fires.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickTimer {
    deadline: Option<Instant>,
}

impl TickTimer {
    pub fn arm(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }

    /// Returns true if a tick was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Disarms and returns true once the deadline has passed.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(d) if d <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitorState {
    #[default]
    Idle,
    Polling { interval: Duration },
}

#[derive(Debug, Default)]
pub struct Monitor {
    state: MonitorState,
    timer: TickTimer,
}

impl Monitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn is_polling(&self) -> bool {
        matches!(self.state, MonitorState::Polling { .. })
    }

    /// Polling owns the refresh cadence exclusively.
    pub fn allows_manual_refresh(&self) -> bool {
        !self.is_polling()
    }

    pub fn interval(&self) -> Option<Duration> {
        match self.state {
            MonitorState::Polling { interval } => Some(interval),
            MonitorState::Idle => None,
        }
    }

    pub fn next_tick(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Idle -> Polling. Returns the effective interval in seconds, or `None`
    /// when already polling. The first tick is due immediately.
    pub fn start(&mut self, interval_input: &str, now: Instant) -> Option<u64> {
        if self.is_polling() {
            return None;
        }
        let secs = resolve_interval(interval_input);
        self.state = MonitorState::Polling {
            interval: Duration::from_secs(secs),
        };
        self.timer.arm(now);
        tracing::info!(interval_secs = secs, "monitoring started");
        Some(secs)
    }

    /// Polling -> Idle; a no-op when idle. Returns whether it was polling.
    pub fn stop(&mut self) -> bool {
        let cancelled = self.timer.cancel();
        let was_polling = self.is_polling();
        self.state = MonitorState::Idle;
        if was_polling {
            tracing::info!(cancelled_tick = cancelled, "monitoring stopped");
        }
        was_polling
    }

    /// Arms the next tick relative to a poll's completion, if still polling.
    pub fn on_poll_complete(&mut self, now: Instant) {
        if let MonitorState::Polling { interval } = self.state {
            self.timer.arm(now + interval);
        }
    }

    /// Consumes a due tick. Always false when idle.
    pub fn take_due(&mut self, now: Instant) -> bool {
        self.is_polling() && self.timer.fire_if_due(now)
    }
}
