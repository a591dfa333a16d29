//! Presence classification and the hysteresis state machine.
//!
//! | State     | presence                           | absence                               |
//! |-----------|------------------------------------|---------------------------------------|
//! | Idle      | -> Detecting (start timer)         | stay                                  |
//! | Detecting | -> Active once `activation_ms` met | -> Idle (timer discarded)             |
//! | Active    | stay                               | -> TimingOut                          |
//! | TimingOut | -> Active (no second activation)   | -> Idle once `timeout_ms` since last presence |
//!
//! The detector never touches hardware; `update()` returns an `Edge` and the
//! caller acts on it.

use mirror_traits::Reading;
use tracing::{debug, info};

use crate::config::{DistanceBand, PresenceCfg};
use crate::status::{Edge, PresenceState};

/// True iff `reading` is valid and inside `band`. Failed readings are absence.
#[inline]
pub fn classify(reading: Reading, band: &DistanceBand) -> bool {
    reading.cm().is_some_and(|cm| band.contains(cm))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Detecting { since_ms: u64 },
    Active,
    TimingOut,
}

#[derive(Debug, Clone)]
pub struct PresenceDetector {
    cfg: PresenceCfg,
    phase: Phase,
    // Refreshed on every presence sample; read only in Active/TimingOut.
    last_presence_ms: u64,
}

impl PresenceDetector {
    pub fn new(cfg: PresenceCfg) -> Self {
        Self {
            cfg,
            phase: Phase::Idle,
            last_presence_ms: 0,
        }
    }

    pub fn cfg(&self) -> PresenceCfg {
        self.cfg
    }

    pub fn state(&self) -> PresenceState {
        match self.phase {
            Phase::Idle => PresenceState::Idle,
            Phase::Detecting { .. } => PresenceState::Detecting,
            Phase::Active => PresenceState::Active,
            Phase::TimingOut => PresenceState::TimingOut,
        }
    }

    /// True only while presence is confirmed and currently seen.
    pub fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }

    /// When the current detection window opened, while `Detecting`.
    pub fn detection_start_ms(&self) -> Option<u64> {
        match self.phase {
            Phase::Detecting { since_ms } => Some(since_ms),
            _ => None,
        }
    }

    /// Time of the last presence sample, while `Active` or `TimingOut`.
    pub fn last_presence_ms(&self) -> Option<u64> {
        match self.phase {
            Phase::Active | Phase::TimingOut => Some(self.last_presence_ms),
            _ => None,
        }
    }

    /// Back to `Idle` without emitting an edge.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
    }

    /// Feed one sample. `now_ms` must be monotonic; a step backwards is
    /// treated as zero elapsed time.
    pub fn update(&mut self, presence: bool, now_ms: u64) -> Edge {
        let before = self.state();
        let edge = if presence {
            self.on_presence(now_ms)
        } else {
            self.on_absence(now_ms)
        };
        let after = self.state();
        if before != after {
            debug!(from = %before, to = %after, now_ms, "presence state");
        }
        match edge {
            Edge::ActivatedNow => info!(now_ms, "presence confirmed"),
            Edge::DeactivatedNow => info!(now_ms, "presence timed out"),
            Edge::NoChange => {}
        }
        edge
    }

    fn on_presence(&mut self, now_ms: u64) -> Edge {
        self.last_presence_ms = now_ms;
        match self.phase {
            Phase::Idle => {
                self.phase = Phase::Detecting { since_ms: now_ms };
                Edge::NoChange
            }
            Phase::Detecting { since_ms } => {
                if now_ms.saturating_sub(since_ms) >= self.cfg.activation_ms {
                    self.phase = Phase::Active;
                    Edge::ActivatedNow
                } else {
                    Edge::NoChange
                }
            }
            Phase::Active => Edge::NoChange,
            // The light never went off, so this is not a new activation.
            Phase::TimingOut => {
                self.phase = Phase::Active;
                Edge::NoChange
            }
        }
    }

    fn on_absence(&mut self, now_ms: u64) -> Edge {
        match self.phase {
            Phase::Idle => Edge::NoChange,
            Phase::Detecting { .. } => {
                self.phase = Phase::Idle;
                Edge::NoChange
            }
            Phase::Active => {
                self.phase = Phase::TimingOut;
                Edge::NoChange
            }
            Phase::TimingOut => {
                if now_ms.saturating_sub(self.last_presence_ms) >= self.cfg.timeout_ms {
                    self.phase = Phase::Idle;
                    Edge::DeactivatedNow
                } else {
                    Edge::NoChange
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_traits::ReadFailure;

    fn det(activation_ms: u64, timeout_ms: u64) -> PresenceDetector {
        PresenceDetector::new(PresenceCfg {
            activation_ms,
            timeout_ms,
        })
    }

    #[test]
    fn first_sample_only_opens_the_window() {
        let mut d = det(0, 0);
        assert_eq!(d.update(true, 10), Edge::NoChange);
        assert_eq!(d.state(), PresenceState::Detecting);
        assert_eq!(d.detection_start_ms(), Some(10));
        assert_eq!(d.update(true, 10), Edge::ActivatedNow);
    }

    #[test]
    fn clock_step_backwards_counts_as_no_time() {
        let mut d = det(100, 100);
        d.update(true, 500);
        assert_eq!(d.update(true, 400), Edge::NoChange);
        assert_eq!(d.state(), PresenceState::Detecting);
    }

    #[test]
    fn timestamps_are_only_exposed_in_their_states() {
        let mut d = det(0, 1000);
        assert_eq!(d.last_presence_ms(), None);
        d.update(true, 1);
        assert_eq!(d.last_presence_ms(), None);
        d.update(true, 2);
        assert_eq!(d.detection_start_ms(), None);
        assert_eq!(d.last_presence_ms(), Some(2));
    }

    #[test]
    fn classify_failure_is_absence() {
        let band = DistanceBand::default();
        assert!(!classify(Reading::Failed(ReadFailure::Bus), &band));
        assert!(classify(Reading::Cm(3.0), &band));
        assert!(!classify(Reading::Cm(40.0), &band));
        assert!(!classify(Reading::Cm(2.99), &band));
    }
}
