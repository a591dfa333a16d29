//! Maps `Box<dyn Error>` from trait boundaries to typed `CoreError`.
//!
//! `mirror_traits::LightOutput` returns `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `mirror_hardware::HwError` downcasting.

use crate::error::CoreError;

/// Map a trait-boundary error to a typed `CoreError`.
///
/// Known hardware error types are downcast first; anything else is a light
/// output failure carrying the original message.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> CoreError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<mirror_hardware::error::HwError>() {
            return match hw {
                mirror_hardware::error::HwError::LevelTimeout => CoreError::Timeout,
                other => CoreError::HardwareFault(other.to_string()),
            };
        }
    }

    CoreError::Light(e.to_string())
}
