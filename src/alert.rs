//! Debounced up/down alerting for a single target.
//!
//! An integer credit in `[0, alert_delay]` stands in for named states: a
//! target must fail `alert_delay` consecutive ticks before a Down fires,
//! and one success restores full credit. The credit is clamped at zero,
//! so an outage alerts exactly once.

/// Transition emitted by the debouncer, at most one per sustained change.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertEvent {
    Up,
    Down(String),
}

#[derive(Debug, Clone)]
pub struct AlertDebouncer {
    credit: u32,
    alert_delay: u32,
}

impl AlertDebouncer {
    /// Seed the credit from the first synchronous probe so the first
    /// tick after startup never spuriously emits. A delay below one
    /// tick is floored: restored credit must leave the down state.
    pub fn new(alert_delay: u32, initially_alive: bool) -> Self {
        let alert_delay = alert_delay.max(1);
        Self {
            credit: if initially_alive { alert_delay } else { 0 },
            alert_delay,
        }
    }

    /// Feed one raw liveness observation.
    pub fn tick(&mut self, alive: bool, diagnostic: &str) -> Option<AlertEvent> {
        if alive {
            let was_down = self.credit == 0;
            self.credit = self.alert_delay;
            return was_down.then_some(AlertEvent::Up);
        }

        if self.credit > 0 {
            self.credit -= 1;
            if self.credit == 0 {
                return Some(AlertEvent::Down(diagnostic.to_string()));
            }
        }
        None
    }

    /// Whether the target is currently considered down.
    pub fn is_alerting(&self) -> bool {
        self.credit == 0
    }
}
