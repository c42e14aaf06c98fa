//! The dual-wheel control loop (`ControlLoop`).
//!
//! A call to `update`/`poll` is a no-op until one control interval has passed
//! since the last completed step. A due step reads both encoders, runs the PID
//! law for every tracking wheel, writes the actuator and, when enabled and
//! due, hands a `ControlSample` to the reporter.

use std::sync::Arc;
use std::time::Instant;

use drive_traits::{Actuator, Channel, Clock, ControlSample, PositionSource, Reporter};
use eyre::WrapErr;

use crate::config::PidGains;
use crate::error::{DriveError, Result};
use crate::hw_error::map_hw_error;
use crate::pid::PidLaw;
use crate::state::{ChannelMode, LoopTiming, PidChannelState};
use crate::status::{DeliveryFault, SkipReason, StepOutcome, StepReport, StepStatus};
use crate::util::ms_i64;

/// Statically dispatched controller over concrete collaborators.
pub struct ControlLoop<A: Actuator, P: PositionSource, R: Reporter> {
    pub(crate) actuator: A,
    pub(crate) position: P,
    pub(crate) reporter: R,
    pub(crate) gains: PidGains,
    pub(crate) law: PidLaw,
    pub(crate) control_interval_ms: i64,
    pub(crate) report_interval_ms: i64,
    pub(crate) channels: [PidChannelState; 2],
    pub(crate) timing: LoopTiming,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) epoch: Instant,
}

impl<A: Actuator, P: PositionSource, R: Reporter> core::fmt::Debug for ControlLoop<A, P, R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ControlLoop")
            .field("law", &self.law)
            .field("control_interval_ms", &self.control_interval_ms)
            .field("report_interval_ms", &self.report_interval_ms)
            .field("channels", &self.channels)
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}

impl<A: Actuator, P: PositionSource, R: Reporter> ControlLoop<A, P, R> {
    /// Milliseconds since the controller was built, on its clock.
    pub fn now_ms(&self) -> i64 {
        ms_i64(self.clock.ms_since(self.epoch))
    }

    /// Command both wheels and run a control step if one is due.
    pub fn update(
        &mut self,
        target_left: i64,
        target_right: i64,
        report_enabled: bool,
    ) -> Result<StepStatus> {
        let now = self.now_ms();
        self.update_at(target_left, target_right, report_enabled, now)
    }

    /// `update` with an explicit timestamp in ms since the controller epoch.
    ///
    /// Targets are only latched when the step runs; a gated call changes nothing.
    pub fn update_at(
        &mut self,
        target_left: i64,
        target_right: i64,
        report_enabled: bool,
        now_ms: i64,
    ) -> Result<StepStatus> {
        self.step(Some([target_left, target_right]), report_enabled, now_ms)?.into_result()
    }

    /// Run a due step with the last commanded targets. Halted wheels stay idle.
    pub fn poll(&mut self, report_enabled: bool) -> Result<StepStatus> {
        let now = self.now_ms();
        self.poll_at(report_enabled, now)
    }

    pub fn poll_at(&mut self, report_enabled: bool, now_ms: i64) -> Result<StepStatus> {
        self.step(None, report_enabled, now_ms)?.into_result()
    }

    /// Brake one wheel, bypassing the PID law.
    ///
    /// The wheel is idle from here until the next `update`; its integral and
    /// last measured speed are kept.
    pub fn halt(&mut self, channel: Channel) -> Result<()> {
        let st = &mut self.channels[channel.index()];
        st.mode = ChannelMode::Idle;
        st.last_output = 0;
        tracing::debug!(%channel, "halt");
        self.actuator
            .halt(channel)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err_with(|| format!("halting {channel} motor"))
    }

    /// Brake both wheels. Both are attempted; the first failure is returned.
    pub fn halt_all(&mut self) -> Result<()> {
        let left = self.halt(Channel::Left);
        let right = self.halt(Channel::Right);
        left.and(right)
    }

    pub fn channel_state(&self, channel: Channel) -> &PidChannelState {
        &self.channels[channel.index()]
    }

    pub fn mode(&self, channel: Channel) -> ChannelMode {
        self.channels[channel.index()].mode
    }

    pub fn timing(&self) -> LoopTiming {
        self.timing
    }

    pub fn gains(&self) -> &PidGains {
        &self.gains
    }

    pub fn law(&self) -> &PidLaw {
        &self.law
    }

    /// Anti-windup bound in effect (explicit or derived).
    pub fn max_error_integral(&self) -> i64 {
        self.law.max_error_integral
    }

    pub fn clock(&self) -> &Arc<dyn Clock + Send + Sync> {
        &self.clock
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    fn report_due(&self, now_ms: i64) -> bool {
        match self.timing.last_report_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) > self.report_interval_ms,
        }
    }

    /// The gated step.
    ///
    /// `Err` means no step ran (an encoder read failed and nothing changed).
    /// A step whose actuator or reporter write failed still comes back as
    /// `StepOutcome::Degraded` with its report.
    pub(crate) fn step(
        &mut self,
        targets: Option<[i64; 2]>,
        report_enabled: bool,
        now_ms: i64,
    ) -> Result<StepOutcome> {
        let dt = now_ms.saturating_sub(self.timing.last_update_ms);
        if dt < 0 {
            tracing::warn!(
                now_ms,
                last_update_ms = self.timing.last_update_ms,
                "clock went backwards; skipping control step"
            );
            return Ok(StepOutcome::Done(StepStatus::Skipped(SkipReason::ClockAnomaly)));
        }
        if dt < self.control_interval_ms {
            return Ok(StepOutcome::Done(StepStatus::Skipped(SkipReason::IntervalNotElapsed)));
        }

        // Read both encoders before touching any state, so a failed read
        // leaves the step retryable.
        let mut ticks = [0i64; 2];
        for ch in Channel::ALL {
            ticks[ch.index()] = self
                .position
                .read(ch)
                .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
                .wrap_err_with(|| format!("reading {ch} encoder"))?;
        }

        if let Some(t) = targets {
            for ch in Channel::ALL {
                let st = &mut self.channels[ch.index()];
                st.target_speed = t[ch.index()];
                st.mode = ChannelMode::Tracking;
            }
        }

        let mut speeds = [0i64; 2];
        let mut outputs = [0i32; 2];
        let mut first_err: Option<eyre::Report> = None;
        let mut actuator_failed = false;
        let mut reporter_failed = false;
        for ch in Channel::ALL {
            let i = ch.index();
            let st = &mut self.channels[i];
            match st.mode {
                ChannelMode::Tracking => {
                    let terms = st.advance(ticks[i], dt, &self.law);
                    tracing::trace!(
                        channel = %ch,
                        dt,
                        target = st.target_speed,
                        measured = terms.measured,
                        error = terms.error,
                        integral = st.error_integral,
                        p = terms.p,
                        i = terms.i,
                        d = terms.d,
                        output = terms.output,
                        "pid step"
                    );
                    speeds[i] = terms.measured;
                    outputs[i] = terms.output;
                    if let Err(e) = self.actuator.drive(ch, terms.output) {
                        tracing::warn!(channel = %ch, error = %e, "actuator drive failed");
                        actuator_failed = true;
                        if first_err.is_none() {
                            first_err = Some(
                                eyre::Report::new(map_hw_error(&*e))
                                    .wrap_err(format!("driving {ch} motor")),
                            );
                        }
                    }
                }
                ChannelMode::Idle => {
                    speeds[i] = st.observe(ticks[i], dt);
                }
            }
        }
        self.timing.last_update_ms = now_ms;

        let reported = report_enabled && self.report_due(now_ms);
        if reported {
            let sample = ControlSample {
                time_ms: now_ms,
                speed_left: speeds[Channel::Left.index()],
                speed_right: speeds[Channel::Right.index()],
                output_left: outputs[Channel::Left.index()],
                output_right: outputs[Channel::Right.index()],
            };
            self.timing.last_report_ms = Some(now_ms);
            tracing::debug!(%sample, "report");
            if let Err(e) = self.reporter.report(&sample) {
                tracing::warn!(error = %e, "reporter failed");
                reporter_failed = true;
                if first_err.is_none() {
                    first_err = Some(
                        eyre::Report::new(DriveError::Report(e.to_string()))
                            .wrap_err("emitting report"),
                    );
                }
            }
        }

        let report = StepReport {
            time_ms: now_ms,
            dt_ms: dt,
            speeds,
            outputs,
            reported,
        };
        Ok(match first_err {
            Some(error) => StepOutcome::Degraded(
                report,
                DeliveryFault {
                    actuator_failed,
                    reporter_failed,
                    error,
                },
            ),
            None => StepOutcome::Done(StepStatus::Stepped(report)),
        })
    }
}
