//! Outcome of a single `update` call.

use drive_traits::Channel;

/// Why a call did not run a control step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Less than one control interval since the last step.
    IntervalNotElapsed,
    /// The clock went backwards (`dt < 0`).
    ClockAnomaly,
}

/// Result of one completed control step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    pub time_ms: i64,
    pub dt_ms: i64,
    /// Measured speeds, indexed by `Channel::index()`.
    pub speeds: [i64; 2],
    /// Outputs written (0 for idle channels).
    pub outputs: [i32; 2],
    /// A `ControlSample` was handed to the reporter.
    pub reported: bool,
}

impl StepReport {
    pub fn speed(&self, channel: Channel) -> i64 {
        self.speeds[channel.index()]
    }

    pub fn output(&self, channel: Channel) -> i32 {
        self.outputs[channel.index()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Skipped(SkipReason),
    Stepped(StepReport),
}

impl StepStatus {
    pub fn stepped(&self) -> Option<&StepReport> {
        match self {
            StepStatus::Stepped(r) => Some(r),
            StepStatus::Skipped(_) => None,
        }
    }
}

/// Which collaborator writes failed during a step that otherwise completed.
#[derive(Debug)]
pub(crate) struct DeliveryFault {
    pub actuator_failed: bool,
    pub reporter_failed: bool,
    /// The first failure, with context.
    pub error: eyre::Report,
}

/// Step outcome as seen inside the crate: a completed step keeps its report
/// even when the actuator or the reporter rejected its output.
#[derive(Debug)]
pub(crate) enum StepOutcome {
    Done(StepStatus),
    Degraded(StepReport, DeliveryFault),
}

impl StepOutcome {
    /// Collapse to the public shape, where any failed write is an error.
    pub(crate) fn into_result(self) -> eyre::Result<StepStatus> {
        match self {
            StepOutcome::Done(status) => Ok(status),
            StepOutcome::Degraded(_, fault) => Err(fault.error),
        }
    }
}
