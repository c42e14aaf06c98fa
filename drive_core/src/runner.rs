//! Fast outer loop driving a `ControlLoop`.
//!
//! Calls `update` every `poll_interval` (much shorter than the control
//! interval) until the run duration elapses or the stop flag is raised, then
//! brakes both wheels. Sleeping goes through the controller's clock, so a
//! `ManualClock` turns a multi-second run into a deterministic simulation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use drive_traits::{Actuator, PositionSource, Reporter};
use eyre::WrapErr;

use crate::control::ControlLoop;
use crate::error::{DriveError, Result};
use crate::status::{StepOutcome, StepReport, StepStatus};
use crate::util::duration_ms;

/// Parameters of one run.
#[derive(Debug, Clone)]
pub struct RunParams {
    pub target_left: i64,
    pub target_right: i64,
    pub report: bool,
    pub poll_interval: Duration,
    /// `None` runs until `stop` is raised.
    pub duration: Option<Duration>,
    /// Consecutive failed steps tolerated before the run is aborted. Report
    /// attempts are counted on their own: that many failed reports in a row
    /// also abort the run.
    pub max_consecutive_faults: u32,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            target_left: 0,
            target_right: 0,
            report: true,
            poll_interval: Duration::from_micros(500),
            duration: None,
            max_consecutive_faults: 3,
        }
    }
}

/// What happened during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// `update` calls made.
    pub polls: u64,
    /// Completed control steps, including those whose output could not be
    /// delivered.
    pub steps: u64,
    /// Steps that handed a sample to the reporter, failed attempts included.
    pub reports: u64,
    /// Steps whose `dt` exceeded 1.5 control intervals.
    pub late_steps: u64,
    pub max_dt_ms: i64,
    /// Steps that did not run or could not deliver their output.
    pub faults: u64,
    pub elapsed_ms: i64,
    /// The stop flag ended the run.
    pub interrupted: bool,
}

impl RunSummary {
    fn record(&mut self, r: &StepReport, late_ms: i64) {
        self.steps += 1;
        self.reports += u64::from(r.reported);
        self.max_dt_ms = self.max_dt_ms.max(r.dt_ms);
        // The first step is measured from the epoch, not a previous step.
        if self.steps > 1 && r.dt_ms > late_ms {
            self.late_steps += 1;
            tracing::debug!(dt_ms = r.dt_ms, "late control step");
        }
    }
}

/// Run `ctl` until the duration elapses or `stop` is set.
///
/// Both wheels are braked on every exit path that reaches the end of the
/// loop. Collaborator errors are logged and tolerated up to
/// `max_consecutive_faults` in a row; the next one aborts the run. Encoder
/// and actuator failures share one streak, reset by a clean step. Failed
/// reports keep their own streak, reset only by a delivered report.
pub fn run<A, P, R>(
    ctl: &mut ControlLoop<A, P, R>,
    params: &RunParams,
    stop: &AtomicBool,
) -> Result<RunSummary>
where
    A: Actuator,
    P: PositionSource,
    R: Reporter,
{
    let start = ctl.now_ms();
    let deadline = params.duration.map(|d| start.saturating_add(duration_ms(d)));
    let late_ms = ctl.control_interval_ms.saturating_mul(3) / 2;
    let mut summary = RunSummary::default();
    let mut consecutive = 0u32;
    let mut failed_reports = 0u32;

    tracing::info!(
        target_left = params.target_left,
        target_right = params.target_right,
        duration_ms = params.duration.map(duration_ms),
        "run started"
    );

    let outcome: Result<()> = loop {
        if stop.load(Ordering::Relaxed) {
            summary.interrupted = true;
            tracing::info!("stop requested");
            break Ok(());
        }
        let now = ctl.now_ms();
        if deadline.is_some_and(|d| now >= d) {
            break Ok(());
        }

        summary.polls += 1;
        let targets = [params.target_left, params.target_right];
        let fault = match ctl.step(Some(targets), params.report, now) {
            Ok(StepOutcome::Done(StepStatus::Stepped(r))) => {
                consecutive = 0;
                if r.reported {
                    failed_reports = 0;
                }
                summary.record(&r, late_ms);
                None
            }
            Ok(StepOutcome::Done(StepStatus::Skipped(_))) => None,
            Ok(StepOutcome::Degraded(r, f)) => {
                summary.record(&r, late_ms);
                consecutive = if f.actuator_failed { consecutive + 1 } else { 0 };
                if f.reporter_failed {
                    failed_reports += 1;
                } else if r.reported {
                    failed_reports = 0;
                }
                Some(f.error)
            }
            Err(e) => {
                consecutive += 1;
                Some(e)
            }
        };

        if let Some(e) = fault {
            summary.faults += 1;
            tracing::warn!(error = %e, consecutive, failed_reports, "control step failed");
            if consecutive > params.max_consecutive_faults {
                break Err(e.wrap_err(DriveError::State(format!(
                    "{consecutive} consecutive failed control steps"
                ))));
            }
            if failed_reports > params.max_consecutive_faults {
                break Err(e.wrap_err(DriveError::State(format!(
                    "{failed_reports} consecutive failed reports"
                ))));
            }
        }
        ctl.clock.sleep(params.poll_interval);
    };

    let halted = ctl.halt_all().wrap_err("braking after run");
    summary.elapsed_ms = ctl.now_ms().saturating_sub(start);
    tracing::info!(
        steps = summary.steps,
        reports = summary.reports,
        late_steps = summary.late_steps,
        faults = summary.faults,
        elapsed_ms = summary.elapsed_ms,
        interrupted = summary.interrupted,
        "run finished"
    );
    outcome?;
    halted?;
    Ok(summary)
}
