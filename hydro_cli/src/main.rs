//! `hydroctl`: runs the rig control loop against the simulated bridge,
//! injects external commands, and performs a startup self-check.

mod cli;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use eyre::{Result, WrapErr};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use hydro_config::{Config, phdata};
use hydro_core::machine::{ControlCfg, ControlStateMachine, ExternalCommand};
use hydro_core::mocks::{NullChannel, NullLcd, NullSink};
use hydro_core::runner::ControlLoop;
use hydro_core::timesource::ClockResolver;
use hydro_core::{EcCal, PhCal, TimeCfg};
use hydro_hardware::{SimLcd, SimRig, SimRtc, TracingChannel, TracingSink};
use hydro_traits::MonotonicClock;

#[cfg(feature = "http")]
type NetSource = hydro_hardware::net::TimeApiClient;
#[cfg(not(feature = "http"))]
type NetSource = hydro_hardware::SimNetworkTime;

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();
    let _ = JSON_MODE.set(args.json);

    let cfg = load_config(&args.config)?;
    init_logging(&args, &cfg.logging);

    let phdata_path = cfg.phdata_path.clone().unwrap_or_else(|| "phdata.txt".to_owned());
    let (calib, regenerated) = phdata::load_or_init(Path::new(&phdata_path))
        .wrap_err_with(|| format!("loading pH calibration from {phdata_path}"))?;
    if regenerated {
        tracing::warn!(path = %phdata_path, "pH calibration file regenerated from defaults");
    }

    match args.cmd {
        Commands::Run { cycles } => run(&cfg, &calib, cycles),
        Commands::Command { cmd } => command(&cfg, &calib, &cmd),
        Commands::SelfCheck => self_check(&cfg, &calib),
    }
}

/// A missing config file is not an error: the rig runs on built-in defaults,
/// same as a factory-fresh install.
fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("reading config {}", path.display()))?;
    let cfg = hydro_config::load_toml(&text)
        .wrap_err_with(|| format!("parsing config {}", path.display()))?;
    cfg.validate()
        .wrap_err_with(|| format!("validating config {}", path.display()))?;
    Ok(cfg)
}

fn init_logging(args: &Cli, logging: &hydro_config::Logging) {
    // An explicit --log-level beats the config file; the file beats the
    // built-in default.
    let level = args
        .log_level
        .clone()
        .or_else(|| logging.level.clone())
        .unwrap_or_else(|| "info".to_owned());
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer = logging.file.as_deref().map(|file| {
        let path = Path::new(file);
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let name = path.file_name().unwrap_or_else(|| "hydro.log".as_ref());
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        fmt::layer().json().with_ansi(false).with_writer(writer)
    });

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    if args.json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

fn build_loop(
    cfg: &Config,
    calib: &hydro_config::PhCalibration,
    rig: &SimRig,
) -> ControlLoop<
    hydro_hardware::SimSensors,
    hydro_hardware::SimActuators,
    SimLcd,
    SimRtc,
    NetSource,
    TracingSink,
    TracingChannel,
> {
    let clock = Arc::new(MonotonicClock::new());
    let resolver = ClockResolver::new(
        SimRtc::default(),
        NetSource::default(),
        TimeCfg::from(&cfg.time),
        clock.clone(),
    );
    let machine = ControlStateMachine::new(
        ControlCfg::from(&cfg.control),
        (&cfg.dosing).into(),
        chrono::Local::now().naive_local(),
    );
    ControlLoop::new(
        rig.sensors(),
        rig.actuators(),
        SimLcd,
        resolver,
        TracingSink,
        TracingChannel,
        machine,
        PhCal::from(calib),
        EcCal::from(&cfg.ec),
        clock,
        Duration::from_secs(cfg.cycle.interval_s),
    )
}

fn run(cfg: &Config, calib: &hydro_config::PhCalibration, cycles: Option<u64>) -> Result<()> {
    let rig = SimRig::new();
    let mut control = build_loop(cfg, calib, &rig);

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        })
        .wrap_err("installing Ctrl-C handler")?;
    }

    match cycles {
        None => control.run(&shutdown),
        Some(n) => {
            for i in 0..n {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                control.cycle();
                if i + 1 < n {
                    std::thread::sleep(Duration::from_secs(cfg.cycle.interval_s));
                }
            }
        }
    }
    Ok(())
}

fn command(cfg: &Config, calib: &hydro_config::PhCalibration, wire: &str) -> Result<()> {
    let Some(cmd) = ExternalCommand::parse(wire) else {
        let err = hydro_core::CtrlError::UnknownCommand(wire.to_owned());
        println!(
            "{}",
            serde_json::json!({ "status": "error", "error": err.to_string(), "cmd": wire })
        );
        return Err(err.into());
    };

    let rig = SimRig::new();
    let mut control = build_loop(cfg, calib, &rig);
    let ack = control.apply_command(cmd);
    println!(
        "{}",
        serde_json::json!({ "status": ack.status, "cmd": ack.cmd })
    );
    Ok(())
}

/// One cycle on null collaborators: proves config, calibration, time
/// resolution, and the decision path are all sound.
fn self_check(cfg: &Config, calib: &hydro_config::PhCalibration) -> Result<()> {
    let rig = SimRig::new();
    let clock = Arc::new(MonotonicClock::new());
    let resolver = ClockResolver::new(
        SimRtc::default(),
        NetSource::default(),
        TimeCfg::from(&cfg.time),
        clock.clone(),
    );
    let machine = ControlStateMachine::new(
        ControlCfg::from(&cfg.control),
        (&cfg.dosing).into(),
        chrono::Local::now().naive_local(),
    );
    let mut control = ControlLoop::new(
        rig.sensors(),
        rig.actuators(),
        NullLcd,
        resolver,
        NullSink,
        NullChannel,
        machine,
        PhCal::from(calib),
        EcCal::from(&cfg.ec),
        clock,
        Duration::from_secs(cfg.cycle.interval_s),
    );

    let outcome = control
        .cycle()
        .ok_or_else(|| eyre::eyre!("self-check: no sensor frame"))?;
    println!(
        "{}",
        serde_json::json!({
            "status": "ok",
            "state": control.machine().state().as_str(),
            "ph": outcome.frame.ph_value,
            "ec_ms": outcome.frame.ec_ms,
            "float_ok": outcome.frame.float_ok,
        })
    );
    Ok(())
}
