//! Idle state machine.
//!
//! Turns raw idle readings into transitions:
//! - Active -> Idle once the reading reaches the threshold
//! - Idle -> Active as soon as a reading shows new input

use std::time::Duration;
use tracing::debug;

/// Current idle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdleState {
    /// User input within the threshold.
    #[default]
    Active,
    /// No input for at least the threshold.
    Idle {
        /// Longest idle reading seen during this idle period.
        longest: Duration,
    },
}

impl IdleState {
    pub fn is_idle(self) -> bool {
        matches!(self, Self::Idle { .. })
    }
}

/// A change of idle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleTransition {
    /// The user crossed the idle threshold.
    WentIdle { idle_for: Duration },
    /// The user came back after being idle for `idle_for`.
    Resumed { idle_for: Duration },
}

/// Idle threshold tracker.
#[derive(Debug)]
pub struct IdleTracker {
    /// Idle duration that counts as "away". Zero disables tracking.
    threshold: Duration,

    state: IdleState,

    /// Previous reading, used to spot input between polls.
    last_reading: Option<Duration>,
}

impl IdleTracker {
    /// Create a tracker with the given idle threshold.
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            state: IdleState::Active,
            last_reading: None,
        }
    }

    pub fn state(&self) -> IdleState {
        self.state
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Feed one idle reading and return the transitions it causes, in order.
    ///
    /// Input followed by another full threshold of inactivity between two
    /// readings yields `Resumed` then `WentIdle`, and the tracker stays idle.
    pub fn observe(&mut self, idle: Duration) -> Vec<IdleTransition> {
        let previous = self.last_reading.replace(idle);
        let mut transitions = Vec::new();

        if self.threshold.is_zero() {
            return transitions;
        }

        if let IdleState::Idle { longest } = self.state {
            let input_seen = idle < self.threshold || previous.is_some_and(|prev| idle < prev);
            if !input_seen {
                self.state = IdleState::Idle {
                    longest: longest.max(idle),
                };
                return transitions;
            }

            debug!("Input detected after {:?} idle", longest);
            self.state = IdleState::Active;
            transitions.push(IdleTransition::Resumed { idle_for: longest });
        }

        if idle >= self.threshold {
            debug!("Idle for {:?} >= threshold {:?}", idle, self.threshold);
            self.state = IdleState::Idle { longest: idle };
            transitions.push(IdleTransition::WentIdle { idle_for: idle });
        }

        transitions
    }
}
