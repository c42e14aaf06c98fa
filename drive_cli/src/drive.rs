//! Backend assembly and the run/halt/self-check commands.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Receiver;
use eyre::WrapErr;
use serde_json::json;

use drive_config::Config;
use drive_core::error::{DriveError, Result};
use drive_core::{
    ChannelReporter, DriveController, DriveControllerBuilder, Missing, NullReporter, PidGains,
    RunParams, RunSummary, Set, StepStatus, TracingReporter,
};
use drive_traits::{Channel, ControlSample, Reporter};

use crate::cli::RtLock;
use crate::error_fmt::EXIT_INTERRUPTED;
use crate::rt::setup_rt_once;

/// Test hook: when set (to anything but "0"), the simulated encoders fail every read.
#[cfg(not(all(feature = "hardware", target_os = "linux")))]
const SIM_ENCODER_FAULT_ENV: &str = "DRIVE_TEST_SIM_ENCODER_FAULT";

/// Report lines buffered between the control loop and the stdout printer.
const REPORT_QUEUE: usize = 256;

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn sim_encoder_fault_requested() -> bool {
    std::env::var(SIM_ENCODER_FAULT_ENV).is_ok_and(|v| v != "0")
}

/// Attach the simulated drivetrain (default backend).
#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn attach_backend(
    cfg: &Config,
    builder: DriveControllerBuilder<Missing, Missing>,
    virtual_time: bool,
) -> Result<DriveControllerBuilder<Set, Set>> {
    use drive_hardware::{SimParams, SimulatedDrive};
    use drive_traits::{Clock, ManualClock, MonotonicClock};

    let params = SimParams {
        max_speed_tps: cfg.sim.max_speed_tps,
        time_constant_ms: cfg.sim.time_constant_ms,
        max_duty: cfg.pid.max_output,
    };
    let (sim, builder) = if virtual_time {
        let clock = ManualClock::new();
        let sim = SimulatedDrive::new(Arc::new(clock.clone()), params);
        (sim, builder.with_clock(Box::new(clock)))
    } else {
        let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());
        (SimulatedDrive::new(clock, params), builder)
    };
    if sim_encoder_fault_requested() {
        tracing::warn!("simulated encoder fault injected");
        sim.set_encoder_fault(true);
    }
    tracing::info!(backend = "sim", virtual_time, "backend ready");
    Ok(builder
        .with_actuator(sim.actuator())
        .with_position_source(sim.encoders()))
}

/// Attach the Raspberry Pi H-bridges and encoders.
#[cfg(all(feature = "hardware", target_os = "linux"))]
fn attach_backend(
    cfg: &Config,
    builder: DriveControllerBuilder<Missing, Missing>,
    virtual_time: bool,
) -> Result<DriveControllerBuilder<Set, Set>> {
    use drive_core::hw_error::map_hw_error;
    use drive_hardware::{BridgePins, EncoderPins, GpioEncoders, HBridgeActuator};

    if virtual_time {
        tracing::warn!("--virtual-time has no effect on the hardware backend");
    }
    let p = &cfg.pins;
    drive_hardware::check_distinct_pins(&p.named().map(|(_, pin)| pin))
        .map_err(|e| eyre::Report::new(map_hw_error(&e)))?;

    let actuator = HBridgeActuator::new(
        BridgePins {
            dir_a: p.left_dir_a,
            dir_b: p.left_dir_b,
            pwm: p.left_pwm,
        },
        BridgePins {
            dir_a: p.right_dir_a,
            dir_b: p.right_dir_b,
            pwm: p.right_pwm,
        },
        [cfg.hardware.invert_left, cfg.hardware.invert_right],
        cfg.pid.max_output,
        cfg.hardware.pwm_frequency_hz,
    )
    .map_err(|e| eyre::Report::new(map_hw_error(&e)))
    .wrap_err("opening h-bridges")?;
    let encoders = GpioEncoders::new(
        EncoderPins {
            a: p.left_enc_a,
            b: p.left_enc_b,
        },
        EncoderPins {
            a: p.right_enc_a,
            b: p.right_enc_b,
        },
    )
    .map_err(|e| eyre::Report::new(map_hw_error(&e)))
    .wrap_err("opening encoders")?;
    tracing::info!(backend = "gpio", "backend ready");
    Ok(builder
        .with_actuator(actuator)
        .with_position_source(encoders))
}

/// Build a controller over the configured backend.
pub fn build_controller(
    cfg: &Config,
    reporter: Box<dyn Reporter>,
    virtual_time: bool,
) -> Result<DriveController> {
    let gains: PidGains = cfg.into();
    let builder = DriveController::builder()
        .with_gains(gains)
        .with_reporter(reporter);
    attach_backend(cfg, builder, virtual_time)?.build()
}

/// One report sample as a JSON line.
pub fn sample_json(s: &ControlSample) -> serde_json::Value {
    json!({
        "kind": "sample",
        "time_ms": s.time_ms,
        "speed_left": s.speed_left,
        "speed_right": s.speed_right,
        "output_left": s.output_left,
        "output_right": s.output_right,
    })
}

/// Forward samples to stdout until the sending side is dropped.
fn spawn_printer(rx: Receiver<ControlSample>, json: bool) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let stdout = std::io::stdout();
        for sample in rx {
            let mut out = stdout.lock();
            let written = if json {
                writeln!(out, "{}", sample_json(&sample))
            } else {
                writeln!(out, "{sample}")
            };
            if written.and_then(|()| out.flush()).is_err() {
                // Dropping `rx` makes the reporter fail, which surfaces in the run.
                break;
            }
        }
    })
}

/// Options of the `run` command.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub left: i64,
    pub right: i64,
    pub duration_ms: Option<u64>,
    pub no_report: bool,
    pub log_reports: bool,
    pub virtual_time: bool,
    pub stats: bool,
    pub rt: bool,
    pub rt_prio: Option<i32>,
    pub rt_lock: RtLock,
}

fn print_summary(summary: &RunSummary, dropped: u64, opts: &RunOptions, json: bool) {
    if json {
        println!(
            "{}",
            json!({
                "kind": "summary",
                "interrupted": summary.interrupted,
                "target_left": opts.left,
                "target_right": opts.right,
                "steps": summary.steps,
                "reports": summary.reports,
                "faults": summary.faults,
                "elapsed_ms": summary.elapsed_ms,
                "polls": summary.polls,
                "late_steps": summary.late_steps,
                "max_dt_ms": summary.max_dt_ms,
                "dropped_reports": dropped,
            })
        );
        return;
    }
    let verb = if summary.interrupted {
        "interrupted"
    } else {
        "complete"
    };
    println!(
        "run {verb}: steps={} reports={} faults={} elapsed_ms={}",
        summary.steps, summary.reports, summary.faults, summary.elapsed_ms
    );
    if opts.stats {
        println!(
            "stats: polls={} late_steps={} max_dt_ms={} dropped_reports={}",
            summary.polls, summary.late_steps, summary.max_dt_ms, dropped
        );
    }
}

/// Hold both wheels at the requested speeds; returns the process exit code.
pub fn run_drive(cfg: &Config, opts: &RunOptions, json: bool) -> Result<i32> {
    setup_rt_once(opts.rt, opts.rt_prio, opts.rt_lock);

    let stop = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&stop);
        ctrlc::set_handler(move || {
            flag.store(true, std::sync::atomic::Ordering::Relaxed);
        })
        .wrap_err("installing Ctrl-C handler")?;
    }

    let mut printer = None;
    let mut dropped = None;
    let reporter: Box<dyn Reporter> = if opts.no_report {
        Box::new(NullReporter)
    } else if opts.log_reports {
        Box::new(TracingReporter)
    } else {
        let (rep, rx) = ChannelReporter::bounded(REPORT_QUEUE);
        dropped = Some(rep.dropped_counter());
        printer = Some(spawn_printer(rx, json));
        Box::new(rep)
    };

    let mut ctl = build_controller(cfg, reporter, opts.virtual_time)?;
    let mut params: RunParams = (&cfg.timing).into();
    params.target_left = opts.left;
    params.target_right = opts.right;
    params.report = !opts.no_report;
    params.duration = opts.duration_ms.map(Duration::from_millis);

    let outcome = ctl.run(&params, &stop);
    // Closes the report channel so the printer drains and exits.
    drop(ctl);
    if let Some(handle) = printer {
        if handle.join().is_err() {
            tracing::warn!("report printer panicked");
        }
    }
    let summary = outcome?;

    let dropped = dropped.map_or(0, |d| d.load(std::sync::atomic::Ordering::Relaxed));
    if dropped > 0 {
        tracing::warn!(dropped, "report lines dropped (stdout too slow)");
    }
    print_summary(&summary, dropped, opts, json);
    Ok(if summary.interrupted {
        EXIT_INTERRUPTED
    } else {
        0
    })
}

/// Brake both wheels once.
pub fn halt(cfg: &Config, json: bool) -> Result<()> {
    let mut ctl = build_controller(cfg, Box::new(NullReporter), false)?;
    ctl.halt_all().wrap_err("braking both wheels")?;
    if json {
        println!("{}", json!({"kind": "halt", "ok": true}));
    } else {
        println!("both wheels braked");
    }
    Ok(())
}

/// Open the backend, brake, wait one control interval and measure both wheels.
pub fn self_check(cfg: &Config, json: bool) -> Result<()> {
    drive_hardware::check_distinct_pins(&cfg.pins.named().map(|(_, pin)| pin))
        .map_err(|e| eyre::Report::new(DriveError::Config(e.to_string())))?;

    let mut ctl = build_controller(cfg, Box::new(NullReporter), false)?;
    ctl.halt_all().wrap_err("braking both wheels")?;

    let interval = Duration::from_millis(cfg.timing.control_interval_ms);
    ctl.clock().sleep(interval);
    let at = ctl
        .now_ms()
        .max(drive_core::util::ms_i64(cfg.timing.control_interval_ms));
    let report = match ctl.poll_at(false, at)? {
        StepStatus::Stepped(r) => r,
        StepStatus::Skipped(reason) => {
            return Err(eyre::Report::new(DriveError::State(format!(
                "self-check measurement skipped ({reason:?})"
            ))));
        }
    };
    let [left, right] = Channel::ALL.map(|ch| ctl.channel_state(ch).last_position);

    if json {
        println!(
            "{}",
            json!({
                "kind": "self_check",
                "ok": true,
                "position_left": left,
                "position_right": right,
                "speed_left": report.speed(Channel::Left),
                "speed_right": report.speed(Channel::Right),
            })
        );
    } else {
        println!(
            "self-check ok: left pos={left} speed={} tps, right pos={right} speed={} tps",
            report.speed(Channel::Left),
            report.speed(Channel::Right)
        );
    }
    Ok(())
}
