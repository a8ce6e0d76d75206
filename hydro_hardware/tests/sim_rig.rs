//! Simulated rig dynamics: tank level follows the pumps, probes follow the
//! dosing pumps, and the RTC round-trips writes.

use hydro_hardware::SimRig;
use hydro_hardware::{SimRtc, SimNetworkTime};
use hydro_traits::{ActuatorBus, ActuatorCommand, NetworkTime, Rtc, RtcDateTime, SensorBus};
use rstest::rstest;

#[test]
fn fresh_rig_reports_water_ok() {
    let rig = SimRig::new();
    let raw = rig.sensors().read_sensors().unwrap();
    assert!(raw.float_raw >= 0.5);
}

#[test]
fn refill_pump_raises_the_tank() {
    let rig = SimRig::new();
    rig.drain_tank();
    let mut sensors = rig.sensors();
    let mut actuators = rig.actuators();

    assert!(sensors.read_sensors().unwrap().float_raw < 0.5);

    actuators.dispatch(ActuatorCommand::RefillOn).unwrap();
    // 0.2 per read; three reads cross the 0.5 float threshold.
    for _ in 0..3 {
        sensors.read_sensors().unwrap();
    }
    assert!(sensors.read_sensors().unwrap().float_raw >= 0.5);
}

#[test]
fn irrigation_slowly_drains_the_tank() {
    let rig = SimRig::new();
    let mut sensors = rig.sensors();
    let mut actuators = rig.actuators();

    actuators.dispatch(ActuatorCommand::StartIrrigation).unwrap();
    for _ in 0..20 {
        sensors.read_sensors().unwrap();
    }
    assert!(sensors.read_sensors().unwrap().float_raw < 0.5);
}

#[rstest]
#[case(ActuatorCommand::PhDownOn)]
#[case(ActuatorCommand::NutrientsOn)]
fn dosing_pumps_move_the_probes(#[case] cmd: ActuatorCommand) {
    let rig = SimRig::new();
    let mut sensors = rig.sensors();
    let mut actuators = rig.actuators();

    let before = sensors.read_sensors().unwrap();
    actuators.dispatch(cmd).unwrap();
    sensors.read_sensors().unwrap();
    let after = sensors.read_sensors().unwrap();

    match cmd {
        ActuatorCommand::PhDownOn => assert!(after.ph_millivolts < before.ph_millivolts),
        ActuatorCommand::NutrientsOn => assert!(after.ec_volts > before.ec_volts),
        _ => unreachable!(),
    }
}

#[test]
fn rtc_round_trips_writes_and_fails_when_unhealthy() {
    let rtc = SimRtc::default();
    let mut handle = rtc.clone();

    let stamp = RtcDateTime {
        year: 2026,
        month: 8,
        day: 30,
        hour: 12,
        minute: 34,
        second: 56,
    };
    handle.write_datetime(stamp).unwrap();
    assert_eq!(handle.read_datetime().unwrap(), stamp);

    rtc.set_healthy(false);
    assert!(handle.read_datetime().is_err());
}

#[test]
fn sim_network_time_tracks_the_host_clock() {
    let mut net = SimNetworkTime;
    let got = net
        .fetch("Europe/Rome", std::time::Duration::from_secs(1))
        .unwrap();
    let sys = chrono::Local::now().naive_local();
    assert!((sys - got).num_seconds().abs() < 60);
}
