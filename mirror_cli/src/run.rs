//! Command implementations: hardware assembly from config, the control loop,
//! one-shot measurements, and the self-check.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use mirror_config::{Config, PowerMode};
use mirror_core::{ControlLoop, DistanceBand, LightController, LightMode, LoopStats, classify};
use mirror_hardware::echo::EchoParams;
use mirror_hardware::power::{SleepMode, for_mode};
use mirror_hardware::registry::{BoxedSensor, SensorKind, SensorParams, SensorRegistry};
use mirror_traits::clock::{Clock, MonotonicClock};
use mirror_traits::{LightOutput, ReadFailure, Reading};
use serde_json::json;
use tracing::{info, warn};

type SharedClock = Arc<dyn Clock + Send + Sync>;

// ── Assembly ─────────────────────────────────────────────────────────────────

/// Simulated scene for host builds: `MIRROR_TEST_SIM_TIMEOUT` empties it,
/// otherwise an object sits at `MIRROR_TEST_SIM_DISTANCE_CM` (default 20 cm).
#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn sim_distance_cm() -> Option<f32> {
    if std::env::var_os("MIRROR_TEST_SIM_TIMEOUT").is_some() {
        return None;
    }
    Some(
        std::env::var("MIRROR_TEST_SIM_DISTANCE_CM")
            .ok()
            .and_then(|v| v.parse::<f32>().ok())
            .unwrap_or(20.0),
    )
}

fn registry(clock: SharedClock) -> SensorRegistry {
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        SensorRegistry::hardware(clock)
    }
    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    {
        SensorRegistry::simulated(sim_distance_cm(), clock)
    }
}

fn sensor_params(cfg: &Config) -> eyre::Result<SensorParams> {
    let s = &cfg.sensor;
    if s.kind == SensorKind::Ultrasonic.name() {
        let (Some(trigger_pin), Some(echo_pin)) = (cfg.pins.trigger, cfg.pins.echo) else {
            eyre::bail!("pins.trigger and pins.echo are required for the ultrasonic sensor");
        };
        return Ok(SensorParams::Echo {
            trigger_pin,
            echo_pin,
            echo: EchoParams {
                timeout_us: s.timeout_us,
                sound_divisor: s.sound_speed_divisor,
            },
        });
    }
    Ok(SensorParams::TimeOfFlight {
        i2c_bus: s.i2c_bus,
        address: s.i2c_address,
    })
}

fn open_sensor(cfg: &Config, clock: SharedClock) -> eyre::Result<BoxedSensor> {
    let params = sensor_params(cfg)?;
    Ok(registry(clock).create(&cfg.sensor.kind, &params)?)
}

fn open_light(cfg: &Config) -> eyre::Result<Box<dyn LightOutput + Send>> {
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        let light = mirror_hardware::rpi::RpiLight::open(cfg.pins.light, cfg.light.pwm_freq_hz)?;
        Ok(Box::new(light))
    }
    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    {
        tracing::debug!(pin = cfg.pins.light, "using simulated light");
        Ok(Box::new(mirror_hardware::SimulatedLight::new()))
    }
}

fn sleep_mode(mode: PowerMode) -> SleepMode {
    match mode {
        PowerMode::Idle => SleepMode::Idle,
        PowerMode::Busy => SleepMode::Busy,
    }
}

fn log_banner(cfg: &Config) {
    info!(
        sensor = %cfg.sensor.kind,
        min_cm = cfg.sensor.min_distance_cm,
        max_cm = cfg.sensor.max_distance_cm,
        activation_ms = cfg.timing.activation_ms,
        timeout_ms = cfg.timing.timeout_ms,
        poll_interval_ms = cfg.timing.poll_interval_ms,
        power = ?cfg.power.mode,
        fade = cfg.light.use_fade,
        "mirror light starting"
    );
}

// ── Commands ─────────────────────────────────────────────────────────────────

pub fn run(cfg: &Config, iterations: Option<u64>, json: bool) -> eyre::Result<()> {
    log_banner(cfg);
    let clock: SharedClock = Arc::new(MonotonicClock::new());
    let sensor = open_sensor(cfg, clock.clone())?;
    let light = open_light(cfg)?;
    let power = for_mode(sleep_mode(cfg.power.mode), clock.clone());

    let mut lp = ControlLoop::builder()
        .with_sensor(sensor)
        .with_light(light)
        .with_power(power)
        .with_clock(clock)
        .apply_config(cfg)
        .build()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
            warn!(error = %e, "could not install Ctrl-C handler");
        }
    }

    let stats = lp.run(iterations, &shutdown);
    let light_on_at_stop = lp.light().is_on();
    let state = lp.state();
    if let Err(e) = lp.shutdown() {
        warn!(error = %e, "could not turn the light off on exit");
    }
    print_stats(&stats, state.as_str(), light_on_at_stop, json);
    Ok(())
}

fn print_stats(stats: &LoopStats, state: &str, light_on: bool, json: bool) {
    if json {
        println!(
            "{}",
            json!({
                "polls": stats.polls,
                "activations": stats.activations,
                "deactivations": stats.deactivations,
                "failed_readings": stats.failed_readings,
                "light_errors": stats.light_errors,
                "state": state,
                "light_on": light_on,
            })
        );
    } else {
        println!(
            "polls={} activations={} deactivations={} failed_readings={} light_errors={} state={} light_on={}",
            stats.polls,
            stats.activations,
            stats.deactivations,
            stats.failed_readings,
            stats.light_errors,
            state,
            light_on
        );
    }
}

fn failure_name(r: Reading) -> Option<&'static str> {
    match r {
        Reading::Cm(_) => None,
        Reading::Failed(ReadFailure::Timeout) => Some("timeout"),
        Reading::Failed(ReadFailure::OutOfRange) => Some("out_of_range"),
        Reading::Failed(ReadFailure::Bus) => Some("bus"),
    }
}

pub fn measure(cfg: &Config, count: u32, json: bool) -> eyre::Result<()> {
    let clock: SharedClock = Arc::new(MonotonicClock::new());
    let mut sensor = open_sensor(cfg, clock.clone())?;
    let band = DistanceBand::from(&cfg.sensor);
    let interval = Duration::from_millis(cfg.timing.poll_interval_ms);

    for i in 0..count {
        if i > 0 {
            clock.sleep(interval);
        }
        let r = sensor.measure();
        let present = classify(r, &band);
        if json {
            println!(
                "{}",
                json!({
                    "index": i,
                    "sensor": sensor.sensor_kind(),
                    "distance_cm": r.sentinel_cm(),
                    "valid": r.is_valid(),
                    "failure": failure_name(r),
                    "present": present,
                })
            );
        } else {
            println!("{i}: {:.1} cm present={present}", r.sentinel_cm());
        }
    }
    Ok(())
}

pub fn list_sensors(json: bool) -> eyre::Result<()> {
    let kinds = registry(Arc::new(MonotonicClock::new())).available_kinds();
    if json {
        println!("{}", json!({ "sensors": kinds }));
    } else {
        for k in kinds {
            println!("{k}");
        }
    }
    Ok(())
}

pub fn self_check(cfg: &Config, json: bool) -> eyre::Result<()> {
    let clock: SharedClock = Arc::new(MonotonicClock::new());
    let mut sensor = open_sensor(cfg, clock.clone())?;
    let reading = sensor.measure();

    let mut light = LightController::new(open_light(cfg)?, LightMode::from(&cfg.light), clock)?;
    light.on()?;
    light.off()?;

    if json {
        println!(
            "{}",
            json!({
                "ok": true,
                "sensor": sensor.sensor_kind(),
                "distance_cm": reading.sentinel_cm(),
                "failure": failure_name(reading),
            })
        );
    } else {
        match reading.cm() {
            Some(cm) => println!("OK: sensor={} reading={cm:.1} cm light=ok", sensor.sensor_kind()),
            None => println!(
                "OK: sensor={} reading=-1.0 ({}) light=ok",
                sensor.sensor_kind(),
                failure_name(reading).unwrap_or("failed")
            ),
        }
    }
    Ok(())
}
