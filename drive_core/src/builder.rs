//! Type-state builder for `DriveController` and generic `build_control_loop` constructor.
//!
//! The builder enforces at compile time that an actuator and a position source
//! are provided before `build()` is available. `try_build()` is always
//! available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use drive_traits::clock::{Clock, MonotonicClock};
use drive_traits::{Actuator, Channel, PositionSource, Reporter};

use crate::config::PidGains;
use crate::control::ControlLoop;
use crate::error::{BuildError, Result};
use crate::fixed_point::derive_integral_bound;
use crate::pid::PidLaw;
use crate::reporter::NullReporter;
use crate::runner::{RunParams, RunSummary};
use crate::state::{ChannelMode, LoopTiming, PidChannelState};
use crate::status::StepStatus;
use crate::util::ms_i64;

// ── Public dynamic-dispatch wrapper ──────────────────────────────────────────

/// Boxed controller: the control loop over trait objects.
pub struct DriveController {
    pub(crate) inner: ControlLoop<Box<dyn Actuator>, Box<dyn PositionSource>, Box<dyn Reporter>>,
}

impl core::fmt::Debug for DriveController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DriveController")
            .field("left", self.inner.channel_state(Channel::Left))
            .field("right", self.inner.channel_state(Channel::Right))
            .field("timing", &self.inner.timing())
            .finish()
    }
}

impl DriveController {
    /// Start building a DriveController.
    pub fn builder() -> DriveControllerBuilder<Missing, Missing> {
        DriveControllerBuilder::default()
    }

    /// Command both wheels and run a control step if one is due.
    pub fn update(
        &mut self,
        target_left: i64,
        target_right: i64,
        report_enabled: bool,
    ) -> Result<StepStatus> {
        self.inner.update(target_left, target_right, report_enabled)
    }

    pub fn update_at(
        &mut self,
        target_left: i64,
        target_right: i64,
        report_enabled: bool,
        now_ms: i64,
    ) -> Result<StepStatus> {
        self.inner.update_at(target_left, target_right, report_enabled, now_ms)
    }

    pub fn poll(&mut self, report_enabled: bool) -> Result<StepStatus> {
        self.inner.poll(report_enabled)
    }

    pub fn poll_at(&mut self, report_enabled: bool, now_ms: i64) -> Result<StepStatus> {
        self.inner.poll_at(report_enabled, now_ms)
    }

    /// Brake one wheel (PID bypassed).
    pub fn halt(&mut self, channel: Channel) -> Result<()> {
        self.inner.halt(channel)
    }

    pub fn halt_all(&mut self) -> Result<()> {
        self.inner.halt_all()
    }

    /// Drive the fast loop until `params.duration` elapses or `stop` is raised.
    pub fn run(&mut self, params: &RunParams, stop: &AtomicBool) -> Result<RunSummary> {
        crate::runner::run(&mut self.inner, params, stop)
    }

    pub fn now_ms(&self) -> i64 {
        self.inner.now_ms()
    }

    pub fn channel_state(&self, channel: Channel) -> &PidChannelState {
        self.inner.channel_state(channel)
    }

    pub fn mode(&self, channel: Channel) -> ChannelMode {
        self.inner.mode(channel)
    }

    pub fn timing(&self) -> LoopTiming {
        self.inner.timing()
    }

    pub fn gains(&self) -> &PidGains {
        self.inner.gains()
    }

    pub fn max_error_integral(&self) -> i64 {
        self.inner.max_error_integral()
    }

    pub fn clock(&self) -> &Arc<dyn Clock + Send + Sync> {
        self.inner.clock()
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `DriveController`. Gains are validated on `build()`.
pub struct DriveControllerBuilder<A, P> {
    actuator: Option<Box<dyn Actuator>>,
    position: Option<Box<dyn PositionSource>>,
    reporter: Option<Box<dyn Reporter>>,
    gains: Option<PidGains>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    _a: PhantomData<A>,
    _p: PhantomData<P>,
}

impl Default for DriveControllerBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            actuator: None,
            position: None,
            reporter: None,
            gains: None,
            clock: None,
            _a: PhantomData,
            _p: PhantomData,
        }
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

/// Validate gains and construct a `ControlLoop` with the derived PID law.
///
/// Shared by `DriveControllerBuilder::try_build()` and `build_control_loop()`.
fn validate_and_build<A: Actuator, P: PositionSource, R: Reporter>(
    actuator: A,
    position: P,
    reporter: R,
    gains: PidGains,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<ControlLoop<A, P, R>> {
    if !(gains.kp.is_finite() && gains.ki.is_finite() && gains.kd.is_finite()) {
        return Err(invalid("gains must be finite"));
    }
    if gains.max_output <= 0 {
        return Err(invalid("max_output must be > 0"));
    }
    if gains.control_interval_ms == 0 {
        return Err(invalid("control_interval_ms must be >= 1"));
    }
    let max_error_integral = match gains.max_error_integral {
        Some(b) if b < 0 => return Err(invalid("max_error_integral must be >= 0")),
        Some(b) => b,
        None => derive_integral_bound(gains.max_output, gains.ki).ok_or_else(|| {
            invalid("ki must be nonzero unless max_error_integral is set explicitly")
        })?,
    };

    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };
    let epoch = clock.now();

    let law = PidLaw {
        kp: f64::from(gains.kp),
        ki: f64::from(gains.ki),
        kd: f64::from(gains.kd),
        max_output: gains.max_output,
        max_error_integral,
    };
    tracing::debug!(?law, "control law ready");

    Ok(ControlLoop {
        actuator,
        position,
        reporter,
        control_interval_ms: ms_i64(gains.control_interval_ms),
        report_interval_ms: ms_i64(gains.report_interval_ms),
        gains,
        law,
        channels: [PidChannelState::default(); 2],
        timing: LoopTiming::default(),
        clock,
        epoch,
    })
}

impl<A, P> DriveControllerBuilder<A, P> {
    /// Build in any type-state; a missing collaborator is a `BuildError`.
    pub fn try_build(self) -> Result<DriveController> {
        let actuator = self
            .actuator
            .ok_or_else(|| eyre::Report::new(BuildError::MissingActuator))?;
        let position = self
            .position
            .ok_or_else(|| eyre::Report::new(BuildError::MissingPositionSource))?;
        let reporter = self.reporter.unwrap_or_else(|| Box::new(NullReporter));

        let inner = validate_and_build(
            actuator,
            position,
            reporter,
            self.gains.unwrap_or_default(),
            self.clock,
        )?;
        Ok(DriveController { inner })
    }
}

// Setters that keep the type-state
impl<A, P> DriveControllerBuilder<A, P> {
    pub fn with_gains(mut self, gains: PidGains) -> Self {
        self.gains = Some(gains);
        self
    }
    /// Diagnostic sink; defaults to `NullReporter`.
    pub fn with_reporter(mut self, reporter: impl Reporter + 'static) -> Self {
        self.reporter = Some(Box::new(reporter));
        self
    }
    /// Time source; `MonotonicClock` unless set. Pass a `ManualClock` for virtual time.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<P> DriveControllerBuilder<Missing, P> {
    pub fn with_actuator(
        self,
        actuator: impl Actuator + 'static,
    ) -> DriveControllerBuilder<Set, P> {
        DriveControllerBuilder {
            actuator: Some(Box::new(actuator)),
            position: self.position,
            reporter: self.reporter,
            gains: self.gains,
            clock: self.clock,
            _a: PhantomData,
            _p: PhantomData,
        }
    }
}

impl<A> DriveControllerBuilder<A, Missing> {
    pub fn with_position_source(
        self,
        position: impl PositionSource + 'static,
    ) -> DriveControllerBuilder<A, Set> {
        DriveControllerBuilder {
            actuator: self.actuator,
            position: Some(Box::new(position)),
            reporter: self.reporter,
            gains: self.gains,
            clock: self.clock,
            _a: PhantomData,
            _p: PhantomData,
        }
    }
}

impl DriveControllerBuilder<Set, Set> {
    /// Validate and build. Only available once actuator and position source are set.
    pub fn build(self) -> Result<DriveController> {
        self.try_build()
    }
}

/// Build a statically dispatched `ControlLoop` from concrete collaborators.
///
/// Delegates to the shared `validate_and_build`.
pub fn build_control_loop<A, P, R>(
    actuator: A,
    position: P,
    reporter: R,
    gains: PidGains,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<ControlLoop<A, P, R>>
where
    A: Actuator,
    P: PositionSource,
    R: Reporter,
{
    validate_and_build(actuator, position, reporter, gains, clock)
}
