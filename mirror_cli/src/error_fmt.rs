//! Human-readable error descriptions and structured JSON error formatting.

use mirror_core::error::{BuildError, CoreError};
use mirror_hardware::RegistryError;

/// Exit code for an unknown `sensor.kind`.
pub const EXIT_UNKNOWN_SENSOR: i32 = 3;
/// Exit code for a config file that cannot be read, parsed, or validated.
pub const EXIT_CONFIG: i32 = 4;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSensor => {
                "What happened: No distance sensor was provided to the control loop.\nLikely causes: The sensor failed to initialize or was not wired into the builder.\nHow to fix: Check the [sensor] section and make sure the sensor is created before the loop is built.".to_string()
            }
            BuildError::MissingLight => {
                "What happened: No light output was provided to the control loop.\nLikely causes: The light pin could not be opened.\nHow to fix: Check pins.light in the config and GPIO permissions.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/mirror_config.toml for a sample."
            ),
        };
    }

    if let Some(re) = err.downcast_ref::<RegistryError>() {
        return match re {
            RegistryError::UnknownSensorKind { kind, available } => format!(
                "What happened: Unknown sensor kind '{kind}'.\nLikely causes: Typo in sensor.kind, or a kind this build does not ship.\nHow to fix: Set sensor.kind to one of: {available}."
            ),
            RegistryError::ParamsMismatch { kind, expected } => format!(
                "What happened: The {kind} sensor was given the wrong parameters (needs {expected}).\nLikely causes: Internal wiring between config and registry.\nHow to fix: Re-run with --log-level=debug and report the output."
            ),
            RegistryError::Init { kind, source } => format!(
                "What happened: The {kind} sensor failed to initialize ({source}).\nLikely causes: Wrong pins or I2C address, loose wiring, missing power, or no permission for /dev/gpiomem or /dev/i2c-*.\nHow to fix: Check [pins] and [sensor] in the config, verify wiring and 3.3V/5V/GND, and run `i2cdetect -y 1` for the VL53L0X."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<CoreError>() {
        return match ce {
            CoreError::Config(msg) => format!(
                "What happened: Configuration problem: {msg}.\nLikely causes: Missing file, TOML syntax error, or out-of-range values.\nHow to fix: Pass --config with a valid file. See etc/mirror_config.toml for a sample."
            ),
            CoreError::Timeout => {
                "What happened: Hardware did not respond in time.\nLikely causes: Sensor not wired correctly or not powered.\nHow to fix: Verify the sensor pins and power, then rerun.".to_string()
            }
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from hardware init
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("gpio") || lower.contains("pwm") {
        return "What happened: Failed to access a GPIO pin.\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process may access /dev/gpiomem.".to_string();
    }

    if lower.contains("pins.trigger") || lower.contains("pins.echo") {
        return "What happened: Configuration is incomplete.\nLikely causes: The ultrasonic sensor needs pins.trigger and pins.echo.\nHow to fix: Add both pins to the [pins] section.".to_string();
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 for an unknown sensor kind, 4 for config errors, 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(RegistryError::UnknownSensorKind { .. }) = err.downcast_ref::<RegistryError>() {
        return EXIT_UNKNOWN_SENSOR;
    }
    if let Some(CoreError::Config(_)) = err.downcast_ref::<CoreError>() {
        return EXIT_CONFIG;
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return EXIT_CONFIG;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(RegistryError::UnknownSensorKind { .. }) = err.downcast_ref::<RegistryError>() {
        return "UnknownSensorKind";
    }
    if let Some(RegistryError::Init { .. }) = err.downcast_ref::<RegistryError>() {
        return "SensorInit";
    }
    if let Some(CoreError::Config(_)) = err.downcast_ref::<CoreError>() {
        return "InvalidConfig";
    }
    if let Some(BuildError::InvalidConfig(_)) = err.downcast_ref::<BuildError>() {
        return "InvalidConfig";
    }
    "Error"
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unknown_kind() -> eyre::Report {
        eyre::Report::new(RegistryError::UnknownSensorKind {
            kind: "lidar".into(),
            available: "ultrasonic, vl53l0x".into(),
        })
    }

    #[test]
    fn unknown_kind_lists_available_and_exits_3() {
        let err = unknown_kind();
        let text = humanize(&err);
        assert!(text.contains("'lidar'"));
        assert!(text.contains("ultrasonic, vl53l0x"));
        assert_eq!(exit_code_for_error(&err), 3);
    }

    #[test]
    fn config_errors_exit_4() {
        let err = eyre::Report::new(CoreError::Config("bad".into()));
        assert_eq!(exit_code_for_error(&err), 4);
        assert!(humanize(&err).starts_with("What happened: Configuration problem: bad."));
        let err = eyre::Report::new(BuildError::InvalidConfig("poll_interval_ms must be >= 1"));
        assert_eq!(exit_code_for_error(&err), 4);
    }

    #[test]
    fn other_errors_exit_1_with_generic_text() {
        let err = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&err), 1);
        assert!(humanize(&err).contains("Original: boom"));
    }

    #[test]
    fn json_error_carries_reason() {
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&unknown_kind())).unwrap();
        assert_eq!(v["reason"], "UnknownSensorKind");
        assert!(v["message"].as_str().unwrap().contains("vl53l0x"));

        let v: serde_json::Value =
            serde_json::from_str(&format_error_json(&eyre::eyre!("x"))).unwrap();
        assert_eq!(v["reason"], "Error");
    }
}
