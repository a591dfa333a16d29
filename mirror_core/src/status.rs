//! Presence states, edges, and the per-poll report.

use mirror_traits::Reading;

/// Externally visible detector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresenceState {
    Idle,
    Detecting,
    Active,
    /// Presence lost; waiting out the timeout before deactivating.
    TimingOut,
}

impl PresenceState {
    /// Stable lowercase name used in logs and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            PresenceState::Idle => "idle",
            PresenceState::Detecting => "detecting",
            PresenceState::Active => "active",
            PresenceState::TimingOut => "timeout",
        }
    }
}

impl std::fmt::Display for PresenceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a single detector update decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    NoChange,
    /// Sustained presence reached the activation threshold: turn the light on.
    ActivatedNow,
    /// Sustained absence reached the timeout: turn the light off.
    DeactivatedNow,
}

impl Edge {
    pub fn as_str(self) -> &'static str {
        match self {
            Edge::NoChange => "none",
            Edge::ActivatedNow => "activated",
            Edge::DeactivatedNow => "deactivated",
        }
    }
}

/// Outcome of one control-loop poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub reading: Reading,
    /// Classifier verdict for `reading`.
    pub present: bool,
    /// Detector state after the update.
    pub state: PresenceState,
    pub edge: Edge,
    /// Loop time of the sample, ms since the loop was built.
    pub now_ms: u64,
}
