#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core mirror-light logic (hardware-agnostic).
//!
//! All hardware interactions go through the `mirror_traits` seams
//! (`DistanceSensor`, `LightOutput`, `PowerManager`, `Clock`).
//!
//! ## Architecture
//!
//! - **Classification**: a reading is presence iff it is valid and inside
//!   the `[min, max)` distance band (`presence::classify`)
//! - **Hysteresis**: `PresenceDetector` turns samples into on/off edges
//! - **Light**: `LightController` switches or fades the output
//! - **Loop**: `ControlLoop` polls, classifies, updates, drives the light, sleeps
//!
//! Everything runs on one thread. Every wait (sensor timeout, fade step,
//! inter-poll sleep) is bounded and goes through the injected `Clock` or
//! `PowerManager`, so tests run on simulated time.

pub mod builder;
pub mod config;
pub mod conversions;
pub mod error;
pub mod hw_error;
pub mod light;
pub mod mocks;
pub mod presence;
pub mod runner;
pub mod status;

pub use builder::{ControlLoopBuilder, Missing, Set};
pub use config::{DistanceBand, LightMode, LoopCfg, PresenceCfg};
pub use error::{BuildError, CoreError, Result};
pub use light::{LightController, MAX_DUTY};
pub use presence::{PresenceDetector, classify};
pub use runner::{ControlLoop, LoopStats};
pub use status::{Edge, PresenceState, StepReport};
