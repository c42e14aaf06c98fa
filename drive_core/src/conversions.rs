//! `From` implementations bridging `drive_config` types to `drive_core` types.

use std::time::Duration;

use crate::config::PidGains;
use crate::runner::RunParams;

// ── PidGains ─────────────────────────────────────────────────────────────────

impl From<&drive_config::Config> for PidGains {
    fn from(c: &drive_config::Config) -> Self {
        Self {
            kp: c.pid.kp,
            ki: c.pid.ki,
            kd: c.pid.kd,
            max_output: c.pid.max_output,
            max_error_integral: c.pid.max_error_integral,
            control_interval_ms: c.timing.control_interval_ms,
            report_interval_ms: c.timing.report_interval_ms,
        }
    }
}

// ── RunParams ────────────────────────────────────────────────────────────────

/// Poll cadence from `[timing]`; targets and duration are left to the caller.
impl From<&drive_config::Timing> for RunParams {
    fn from(t: &drive_config::Timing) -> Self {
        Self {
            poll_interval: Duration::from_micros(t.poll_interval_us),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML: &str = r#"
[pins]
left_dir_a = 10
left_dir_b = 11
left_pwm = 9
right_dir_a = 6
right_dir_b = 7
right_pwm = 5
left_enc_a = 18
left_enc_b = 19
right_enc_a = 20
right_enc_b = 21

[pid]
kp = 0.2
ki = 0.002
kd = 0.05
max_error_integral = 5000

[timing]
control_interval_ms = 10
report_interval_ms = 100
poll_interval_us = 250
"#;

    #[test]
    fn gains_follow_config() {
        let cfg = drive_config::load_toml(TOML).unwrap();
        let g = PidGains::from(&cfg);
        assert!((g.kp - 0.2).abs() < f32::EPSILON);
        assert!((g.kd - 0.05).abs() < f32::EPSILON);
        assert_eq!(g.max_output, 255);
        assert_eq!(g.max_error_integral, Some(5000));
        assert_eq!(g.control_interval_ms, 10);
        assert_eq!(g.report_interval_ms, 100);
    }

    #[test]
    fn run_params_take_poll_interval() {
        let cfg = drive_config::load_toml(TOML).unwrap();
        let p = RunParams::from(&cfg.timing);
        assert_eq!(p.poll_interval, Duration::from_micros(250));
        assert_eq!(p.duration, None);
    }
}
