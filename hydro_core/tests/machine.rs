//! State machine behavior: refill cycle, schedule dedup, dosing cooldown,
//! the Error terminal state, and guard priority in Idle.

use chrono::{NaiveDate, NaiveDateTime};
use hydro_core::frame::SensorFrame;
use hydro_core::machine::{
    ControlCfg, ControlStateMachine, ExternalCommand, OperatingState,
};
use hydro_core::dosing::DosingCfg;
use hydro_traits::ActuatorCommand;
use rstest::rstest;

fn at(hour: u32, min: u32, sec: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 14)
        .unwrap()
        .and_hms_opt(hour, min, sec)
        .unwrap()
}

fn next_day(hour: u32, min: u32, sec: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 15)
        .unwrap()
        .and_hms_opt(hour, min, sec)
        .unwrap()
}

fn frame_ok() -> SensorFrame {
    SensorFrame {
        temperature_c: 22.0,
        ec_volts: 2.0,
        ph_millivolts: 1500.0,
        float_raw: 1.0,
        ph_value: 6.0,
        ec_ms: 1.5,
        float_ok: true,
    }
}

fn frame_low_water() -> SensorFrame {
    SensorFrame {
        float_raw: 0.0,
        float_ok: false,
        ..frame_ok()
    }
}

fn machine_at(start: NaiveDateTime) -> ControlStateMachine {
    ControlStateMachine::new(ControlCfg::default(), DosingCfg::default(), start)
}

#[test]
fn refill_completes_when_float_recovers() {
    // 14:xx is outside the watering schedule so only the float guard fires.
    let mut m = machine_at(at(14, 5, 0));

    let out = m.tick(at(14, 5, 0), &frame_low_water());
    assert_eq!(m.state(), OperatingState::Refilling);
    assert_eq!(out.commands, vec![ActuatorCommand::RefillOn]);

    // Still low: stays put before the timeout.
    let out = m.tick(at(14, 6, 0), &frame_low_water());
    assert_eq!(m.state(), OperatingState::Refilling);
    assert!(out.transition.is_none());

    let out = m.tick(at(14, 6, 30), &frame_ok());
    assert_eq!(m.state(), OperatingState::Idle);
    assert_eq!(out.commands, vec![ActuatorCommand::RefillOff]);
}

#[test]
fn refill_timeout_enters_error_with_pump_off() {
    let mut m = machine_at(at(14, 0, 0));
    m.tick(at(14, 0, 0), &frame_low_water());
    assert_eq!(m.state(), OperatingState::Refilling);

    // Exactly at the timeout: not yet (strictly greater-than).
    m.tick(at(14, 2, 0), &frame_low_water());
    assert_eq!(m.state(), OperatingState::Refilling);

    let out = m.tick(at(14, 2, 1), &frame_low_water());
    assert_eq!(m.state(), OperatingState::Error);
    assert_eq!(out.commands, vec![ActuatorCommand::RefillOff]);
}

#[test]
fn error_is_terminal_under_ticks() {
    let mut m = machine_at(at(14, 0, 0));
    m.tick(at(14, 0, 0), &frame_low_water());
    m.tick(at(14, 3, 0), &frame_low_water());
    assert_eq!(m.state(), OperatingState::Error);

    // Everything back to nominal, schedule due, recirc window open: nothing
    // may leave Error on its own.
    let out = m.tick(next_day(7, 0, 5), &frame_ok());
    assert_eq!(m.state(), OperatingState::Error);
    assert!(out.transition.is_none());
    assert!(out.commands.is_empty());
}

#[test]
fn stop_all_resets_error_and_deenergizes() {
    let mut m = machine_at(at(14, 0, 0));
    m.tick(at(14, 0, 0), &frame_low_water());
    m.tick(at(14, 3, 0), &frame_low_water());
    assert_eq!(m.state(), OperatingState::Error);

    let out = m.apply(ExternalCommand::StopAll, at(14, 10, 0));
    assert_eq!(m.state(), OperatingState::Idle);
    assert!(out.commands.contains(&ActuatorCommand::RefillOff));
    assert!(out.commands.contains(&ActuatorCommand::StopIrrigation));
    assert!(out.commands.contains(&ActuatorCommand::StopRecirculation));
    assert!(out.commands.contains(&ActuatorCommand::PhDownOff));
    assert!(out.commands.contains(&ActuatorCommand::NutrientsOff));
}

#[test]
fn scheduled_irrigation_fires_once_per_hour_per_day() {
    let mut m = machine_at(at(7, 0, 40));

    let out = m.tick(at(7, 0, 40), &frame_ok());
    assert_eq!(m.state(), OperatingState::Irrigating);
    assert_eq!(out.commands, vec![ActuatorCommand::StartIrrigation]);

    // Walk the full irrigation -> draining -> recirculating -> idle chain.
    m.tick(at(7, 3, 41), &frame_ok());
    assert_eq!(m.state(), OperatingState::Draining);
    m.tick(at(7, 8, 42), &frame_ok());
    assert_eq!(m.state(), OperatingState::Recirculating);
    m.tick(at(7, 10, 43), &frame_ok());
    assert_eq!(m.state(), OperatingState::Idle);

    // Same hour, same day: deduplicated.
    let out = m.tick(at(7, 30, 0), &frame_ok());
    assert!(out.transition.is_none());

    // Same hour next day: fires again.
    let out = m.tick(next_day(7, 0, 40), &frame_ok());
    assert_eq!(out.commands, vec![ActuatorCommand::StartIrrigation]);
}

#[rstest]
#[case(6)]
#[case(14)]
#[case(20)]
#[case(23)]
fn off_schedule_hours_do_not_irrigate(#[case] hour: u32) {
    let mut m = machine_at(at(hour, 15, 0));
    let out = m.tick(at(hour, 15, 0), &frame_ok());
    assert!(out.transition.is_none(), "hour {hour} should be quiet");
}

#[test]
fn low_water_outranks_schedule() {
    let mut m = machine_at(at(7, 0, 10));
    let out = m.tick(at(7, 0, 10), &frame_low_water());
    assert_eq!(m.state(), OperatingState::Refilling);
    assert_eq!(out.commands, vec![ActuatorCommand::RefillOn]);
    // The 07:00 slot stays unfired for later.
    assert!(!m.schedule().has_fired_today(7, "2026-03-14"));
}

#[test]
fn already_fired_hour_falls_through_to_dosing() {
    let mut m = machine_at(at(7, 0, 40));
    m.tick(at(7, 0, 40), &frame_ok());
    m.tick(at(7, 3, 41), &frame_ok());
    m.tick(at(7, 8, 42), &frame_ok());
    m.tick(at(7, 10, 43), &frame_ok());
    assert_eq!(m.state(), OperatingState::Idle);

    // pH now out of band within the same watering hour: dosing must run
    // even though the hour is in the schedule.
    let high_ph = SensorFrame {
        ph_value: 7.2,
        ..frame_ok()
    };
    let out = m.tick(at(7, 20, 0), &high_ph);
    assert_eq!(m.state(), OperatingState::Dosing);
    assert_eq!(out.commands, vec![ActuatorCommand::PhDownOn]);
}

#[test]
fn dosing_runs_then_mixes_then_cools_down() {
    let mut m = machine_at(at(14, 0, 0));
    let low_ec = SensorFrame {
        ec_ms: 0.5,
        ..frame_ok()
    };

    let out = m.tick(at(14, 0, 0), &low_ec);
    assert_eq!(m.state(), OperatingState::Dosing);
    assert_eq!(out.commands, vec![ActuatorCommand::NutrientsOn]);

    // Pulse ends after dosing_s (10s, strict), pumps off, mixing starts.
    let out = m.tick(at(14, 0, 11), &low_ec);
    assert_eq!(m.state(), OperatingState::Mixing);
    assert_eq!(
        out.commands,
        vec![
            ActuatorCommand::PhDownOff,
            ActuatorCommand::NutrientsOff,
            ActuatorCommand::StartRecirculation,
        ]
    );

    let out = m.tick(at(14, 5, 12), &low_ec);
    assert_eq!(m.state(), OperatingState::Idle);
    assert_eq!(out.commands, vec![ActuatorCommand::StopRecirculation]);

    // Still out of band but inside the cooldown: no new dosing.
    let out = m.tick(at(14, 10, 0), &low_ec);
    assert!(out.transition.is_none());

    // Cooldown is measured from the end of the pulse (14:00:11).
    let out = m.tick(at(14, 15, 12), &low_ec);
    assert_eq!(m.state(), OperatingState::Dosing);
    assert_eq!(out.commands, vec![ActuatorCommand::NutrientsOn]);
}

#[test]
fn hourly_recirculation_window() {
    let mut m = machine_at(at(14, 0, 10));

    // Inside the first 30 s of the hour.
    let out = m.tick(at(14, 0, 10), &frame_ok());
    assert_eq!(m.state(), OperatingState::Recirculating);
    assert_eq!(out.commands, vec![ActuatorCommand::StartRecirculation]);

    let out = m.tick(at(14, 2, 11), &frame_ok());
    assert_eq!(m.state(), OperatingState::Idle);
    assert_eq!(out.commands, vec![ActuatorCommand::StopRecirculation]);

    // Outside the window: nothing.
    let out = m.tick(at(14, 30, 45), &frame_ok());
    assert!(out.transition.is_none());
}

#[test]
fn out_of_band_with_no_pump_still_enters_dosing() {
    // pH low / EC high has no corrective actuator; the machine still walks
    // the Dosing -> Mixing path so the cooldown applies.
    let mut m = machine_at(at(14, 0, 0));
    let low_ph = SensorFrame {
        ph_value: 5.0,
        ..frame_ok()
    };
    let out = m.tick(at(14, 0, 0), &low_ph);
    assert_eq!(m.state(), OperatingState::Dosing);
    assert!(out.commands.is_empty());
}

#[test]
fn external_start_irrigation_from_idle() {
    let mut m = machine_at(at(14, 0, 0));
    let out = m.apply(ExternalCommand::StartIrrigation, at(14, 0, 0));
    assert_eq!(m.state(), OperatingState::Irrigating);
    assert_eq!(out.commands, vec![ActuatorCommand::StartIrrigation]);
}

#[rstest]
#[case("start_irrigation", ExternalCommand::StartIrrigation)]
#[case("stop_all", ExternalCommand::StopAll)]
#[case("start_recirculation", ExternalCommand::StartRecirculation)]
#[case("refill_on", ExternalCommand::RefillOn)]
fn external_command_parsing(#[case] wire: &str, #[case] expected: ExternalCommand) {
    assert_eq!(ExternalCommand::parse(wire), Some(expected));
    assert_eq!(expected.as_str(), wire);
}

#[test]
fn unknown_command_rejected() {
    assert_eq!(ExternalCommand::parse("open_pod_bay_doors"), None);
}

#[test]
fn status_codes_match_display_contract() {
    use OperatingState::*;
    for (state, code) in [
        (Idle, 0),
        (Irrigating, 1),
        (Dosing, 2),
        (Mixing, 3),
        (Recirculating, 4),
        (Refilling, 5),
        (Error, 6),
        (Draining, 7),
    ] {
        assert_eq!(state.status_code(), code, "{state}");
    }
}
