use std::sync::Arc;
use std::time::Duration;

use mirror_hardware::sim::SimRegisterBus;
use mirror_hardware::tof::{reg, TimeOfFlightSensor, INIT_SEQUENCE};
use mirror_traits::clock::test_clock::TestClock;
use mirror_traits::{DistanceSensor, ReadFailure, Reading};
use rstest::rstest;

fn sensor_on(bus: SimRegisterBus) -> (TimeOfFlightSensor<SimRegisterBus>, TestClock) {
    let clock = TestClock::new();
    let sensor = TimeOfFlightSensor::new(bus, Arc::new(clock.clone())).expect("init");
    (sensor, clock)
}

#[test]
fn init_writes_the_seven_step_sequence_in_order() {
    let bus = SimRegisterBus::default();
    let probe = bus.clone();
    let _ = sensor_on(bus);
    assert_eq!(probe.writes(), INIT_SEQUENCE.to_vec());
}

#[test]
fn model_id_mismatch_is_not_fatal() {
    let bus = SimRegisterBus::with_range_mm(250);
    bus.set_model_id(0xAA);
    let (mut sensor, _) = sensor_on(bus);
    assert_eq!(sensor.model_id(), 0xAA);
    assert_eq!(sensor.measure(), Reading::Cm(25.0));
}

#[test]
fn hundred_mm_reads_ten_cm() {
    let mut block = [0u8; 12];
    block[10] = 0x00;
    block[11] = 0x64;
    let bus = SimRegisterBus::default();
    bus.set_range_block(block);
    let (mut sensor, _) = sensor_on(bus);
    assert_eq!(sensor.measure(), Reading::Cm(10.0));
}

#[rstest]
#[case(8190)]
#[case(8191)]
#[case(u16::MAX)]
fn out_of_range_codes_fail(#[case] mm: u16) {
    let (mut sensor, _) = sensor_on(SimRegisterBus::with_range_mm(mm));
    assert_eq!(sensor.measure(), Reading::Failed(ReadFailure::OutOfRange));
}

#[test]
fn just_below_out_of_range_is_valid() {
    let (mut sensor, _) = sensor_on(SimRegisterBus::with_range_mm(8189));
    assert_eq!(sensor.measure(), Reading::Cm(818.9));
}

#[test]
fn measure_starts_range_then_clears_interrupt() {
    let bus = SimRegisterBus::with_range_mm(100);
    let probe = bus.clone();
    let (mut sensor, _) = sensor_on(bus);
    let _ = sensor.measure();
    let writes = probe.writes();
    let tail = &writes[INIT_SEQUENCE.len()..];
    assert_eq!(
        tail,
        &[(reg::SYSRANGE_START, 0x01), (reg::SYSTEM_INTERRUPT_CLEAR, 0x01)]
    );
}

#[test]
fn data_ready_never_set_gives_up_after_100_polls_of_5ms() {
    let bus = SimRegisterBus::with_range_mm(100);
    bus.set_ready_after(None);
    let probe = bus.clone();
    let (mut sensor, clock) = sensor_on(bus);

    assert_eq!(sensor.measure(), Reading::Failed(ReadFailure::Timeout));
    assert_eq!(probe.status_reads(), 100);
    let sleeps = clock.sleeps();
    assert_eq!(sleeps.len(), 100);
    assert!(sleeps.iter().all(|d| *d == Duration::from_millis(5)));
    // No interrupt clear after a timeout.
    assert!(!probe
        .writes()
        .contains(&(reg::SYSTEM_INTERRUPT_CLEAR, 0x01)));
}

#[test]
fn data_ready_on_a_later_poll_still_measures() {
    let bus = SimRegisterBus::with_range_mm(420);
    bus.set_ready_after(Some(37));
    let (mut sensor, clock) = sensor_on(bus);
    assert_eq!(sensor.measure(), Reading::Cm(42.0));
    assert_eq!(clock.sleeps().len(), 37);
}

#[test]
fn bus_fault_during_measure_is_a_failure_reading() {
    let bus = SimRegisterBus::with_range_mm(100);
    let probe = bus.clone();
    let (mut sensor, _) = sensor_on(bus);
    probe.set_fail(true);
    assert_eq!(sensor.measure(), Reading::Failed(ReadFailure::Bus));
}

#[test]
fn bus_fault_during_init_is_an_error() {
    let bus = SimRegisterBus::default();
    bus.set_fail(true);
    let res = TimeOfFlightSensor::new(bus, Arc::new(TestClock::new()));
    assert!(res.is_err());
}
