use std::io::Write;

use mirror_config::{PowerMode, load_file, load_toml};
use rstest::rstest;
use tempfile::NamedTempFile;

const BASE: &str = r#"
[sensor]
kind = "ultrasonic"
min_distance_cm = 3.0
max_distance_cm = 40.0
timeout_us = 30000
sound_speed_divisor = 29.1

[pins]
trigger = 13
echo = 12
light = 4

[timing]
activation_ms = 1000
timeout_ms = 3000
poll_interval_ms = 100

[light]
use_fade = true
fade_duration_ms = 600
fade_steps = 50
pwm_freq_hz = 1000

[power]
mode = "busy"
"#;

fn with(replace: &str, by: &str) -> String {
    assert!(BASE.contains(replace), "fixture lacks {replace:?}");
    BASE.replace(replace, by)
}

#[test]
fn full_config_is_accepted() {
    let cfg = load_toml(BASE).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.pins.trigger, Some(13));
    assert_eq!(cfg.power.mode, PowerMode::Busy);
}

#[rstest]
#[case("min_distance_cm = 3.0", "min_distance_cm = -1.0", "min_distance_cm must be >= 0")]
#[case("max_distance_cm = 40.0", "max_distance_cm = 3.0", "max_distance_cm must be >")]
#[case("max_distance_cm = 40.0", "max_distance_cm = nan", "must be finite")]
#[case("timeout_us = 30000", "timeout_us = 0", "timeout_us must be > 0")]
#[case("sound_speed_divisor = 29.1", "sound_speed_divisor = 0.0", "sound_speed_divisor must be > 0")]
#[case("poll_interval_ms = 100", "poll_interval_ms = 0", "poll_interval_ms must be >= 1")]
#[case("poll_interval_ms = 100", "poll_interval_ms = 120000", "poll_interval_ms is unreasonably large")]
#[case("activation_ms = 1000", "activation_ms = 7200000", "activation_ms is unreasonably large")]
#[case("timeout_ms = 3000", "timeout_ms = 7200000", "timeout_ms is unreasonably large")]
#[case("fade_steps = 50", "fade_steps = 0", "fade_steps must be >= 1")]
#[case("pwm_freq_hz = 1000", "pwm_freq_hz = 0", "pwm_freq_hz must be > 0")]
#[case("trigger = 13\n", "", "pins.trigger and pins.echo are required")]
fn rejects_invalid_values(#[case] from: &str, #[case] to: &str, #[case] expect: &str) {
    let cfg = load_toml(&with(from, to)).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        format!("{err}").contains(expect),
        "error {err} does not mention {expect:?}"
    );
}

#[test]
fn zero_fade_steps_is_fine_without_fade() {
    let toml = with("use_fade = true", "use_fade = false").replace("fade_steps = 50", "fade_steps = 0");
    load_toml(&toml).unwrap().validate().expect("discrete light ignores fade_steps");
}

#[test]
fn time_of_flight_needs_no_echo_pins() {
    let toml = r#"
[sensor]
kind = "vl53l0x"

[pins]
light = 4
"#;
    load_toml(toml).unwrap().validate().unwrap();
}

#[test]
fn unknown_kind_passes_validation() {
    let cfg = load_toml(&with("kind = \"ultrasonic\"", "kind = \"lidar\"")).unwrap();
    cfg.validate().expect("kind is checked by the sensor registry");
}

#[test]
fn unknown_power_mode_fails_to_parse() {
    assert!(load_toml(&with("mode = \"busy\"", "mode = \"deep\"")).is_err());
}

#[rstest]
#[case("never", true)]
#[case("daily", true)]
#[case("hourly", true)]
#[case("weekly", false)]
fn logging_rotation_values(#[case] rotation: &str, #[case] ok: bool) {
    let toml = format!("{BASE}\n[logging]\nrotation = \"{rotation}\"\n");
    let res = load_toml(&toml).unwrap().validate();
    assert_eq!(res.is_ok(), ok);
}

#[test]
fn load_file_reads_from_disk() {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(BASE.as_bytes()).unwrap();
    let cfg = load_file(f.path()).expect("load");
    assert_eq!(cfg.sensor.kind, "ultrasonic");
}

#[test]
fn load_file_reports_the_path() {
    let err = load_file(std::path::Path::new("/nonexistent/mirror.toml")).unwrap_err();
    assert!(format!("{err}").contains("/nonexistent/mirror.toml"));
}
