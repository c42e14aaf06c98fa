//! Per-wheel controller state and shared loop timing.

/// Whether a wheel is under PID control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelMode {
    /// No target commanded, or halted. Measured but never driven.
    #[default]
    Idle,
    /// PID active.
    Tracking,
}

/// Mutable control state of one wheel. Starts zeroed and idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PidChannelState {
    /// Encoder count seen at the last control step.
    pub last_position: i64,
    /// Accumulated `error * dt`, always within the anti-windup bound.
    pub error_integral: i64,
    /// Speed measured at the last control step, ticks/s.
    pub last_measured_speed: i64,
    /// Last commanded target speed, ticks/s.
    pub target_speed: i64,
    /// Last duty written to the actuator (0 while idle).
    pub last_output: i32,
    pub mode: ChannelMode,
}

/// Timestamps shared by both channels, in ms since the controller epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopTiming {
    pub last_update_ms: i64,
    /// `None` until the first report, so the first due step reports at once
    /// (20/280/540/800 ms over one second). Starting from `Some(0)` instead
    /// would defer the first report to 260 ms and give three in that second.
    pub last_report_ms: Option<i64>,
}
