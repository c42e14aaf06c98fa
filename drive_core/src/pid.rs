//! Per-wheel PID law.
//!
//! Derivative acts on the measured speed rather than on the error, so a step
//! change of the target does not produce a derivative kick.

use crate::fixed_point::{clamp_symmetric, round_to_i32, speed_delta_per_ms, speed_tps};
use crate::state::PidChannelState;

/// Validated gains and limits, precomputed at build time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidLaw {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub max_output: i32,
    pub max_error_integral: i64,
}

/// Intermediate values of one PID evaluation, for tracing and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidTerms {
    pub measured: i64,
    pub error: i64,
    pub p: f64,
    pub i: f64,
    pub d: f64,
    pub output: i32,
}

impl PidChannelState {
    /// Run one PID step for a tracking wheel and commit the new state.
    ///
    /// `dt_ms` must be positive; the caller gates that.
    pub fn advance(&mut self, ticks: i64, dt_ms: i64, law: &PidLaw) -> PidTerms {
        let measured = speed_tps(ticks.saturating_sub(self.last_position), dt_ms);
        let error = self.target_speed.saturating_sub(measured);
        self.error_integral = clamp_symmetric(
            self.error_integral
                .saturating_add(error.saturating_mul(dt_ms)),
            law.max_error_integral,
        );
        let p = law.kp * error as f64;
        let i = law.ki * self.error_integral as f64;
        let d = law.kd * speed_delta_per_ms(measured, self.last_measured_speed, dt_ms) as f64;
        let output = round_to_i32(p + i + d).clamp(-law.max_output, law.max_output);

        self.last_position = ticks;
        self.last_measured_speed = measured;
        self.last_output = output;
        PidTerms {
            measured,
            error,
            p,
            i,
            d,
            output,
        }
    }

    /// Measure an idle wheel without touching its integral.
    ///
    /// Keeps position and speed current so resuming does not see a stale delta.
    pub fn observe(&mut self, ticks: i64, dt_ms: i64) -> i64 {
        let measured = speed_tps(ticks.saturating_sub(self.last_position), dt_ms);
        self.last_position = ticks;
        self.last_measured_speed = measured;
        self.last_output = 0;
        measured
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn law() -> PidLaw {
        PidLaw {
            kp: f64::from(0.1f32),
            ki: f64::from(0.001f32),
            kd: f64::from(0.1f32),
            max_output: 255,
            max_error_integral: 255_000,
        }
    }

    #[test]
    fn first_step_of_reference_case() {
        let mut s = PidChannelState {
            target_speed: 100,
            ..Default::default()
        };
        let t = s.advance(40, 20, &law());
        assert_eq!(t.measured, 2000);
        assert_eq!(t.error, -1900);
        assert_eq!(s.error_integral, -38_000);
        assert!((t.p + 190.0).abs() < 1e-3);
        assert!((t.i + 38.0).abs() < 1e-3);
        assert!((t.d - 10.0).abs() < 1e-3);
        assert_eq!(t.output, -218);
        assert_eq!(s.last_position, 40);
        assert_eq!(s.last_measured_speed, 2000);
    }

    #[test]
    fn integral_is_clamped() {
        let mut s = PidChannelState {
            target_speed: 1_000_000,
            ..Default::default()
        };
        let t = s.advance(0, 1000, &law());
        assert_eq!(s.error_integral, 255_000);
        assert_eq!(t.output, 255);
    }

    #[test]
    fn observe_keeps_integral() {
        let mut s = PidChannelState {
            error_integral: 1234,
            last_output: 50,
            ..Default::default()
        };
        assert_eq!(s.observe(10, 20), 500);
        assert_eq!(s.error_integral, 1234);
        assert_eq!(s.last_output, 0);
        assert_eq!(s.last_position, 10);
    }
}
