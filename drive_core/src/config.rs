//! Runtime configuration for the control loop.
//!
//! Separate from the TOML-deserialized schema in `drive_config`; see
//! `conversions` for the mapping.

/// PID gains, output limits and loop timing. Immutable once a controller is built.
#[derive(Debug, Clone, PartialEq)]
pub struct PidGains {
    /// Proportional gain.
    pub kp: f32,
    /// Integral gain.
    pub ki: f32,
    /// Derivative gain (damping), applied to the measured speed.
    pub kd: f32,
    /// Output magnitude limit (PWM full scale).
    pub max_output: i32,
    /// Anti-windup bound on the error integral (ticks/s * ms).
    /// `None` derives `round(max_output / ki)` at build time.
    pub max_error_integral: Option<i64>,
    /// Minimum spacing between control steps, ms.
    pub control_interval_ms: u64,
    /// Minimum spacing between reports, ms (gated with a strict `>`).
    pub report_interval_ms: u64,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 0.1,
            ki: 0.001,
            kd: 0.1,
            max_output: 255,
            max_error_integral: None,
            control_interval_ms: 20,
            report_interval_ms: 250,
        }
    }
}
