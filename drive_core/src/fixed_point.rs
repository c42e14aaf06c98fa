//! Integer tick arithmetic used by the control law.
//!
//! Speeds and integrals stay in `i64` ticks; only the final weighted sum of
//! the PID terms goes through floating point. Divisions truncate toward zero,
//! which acts as a coarse low-pass on the speed and derivative estimates.

use crate::util::MILLIS_PER_SEC;

/// Ticks per second from a tick delta over `dt_ms` (> 0), truncating toward zero.
#[inline]
pub fn speed_tps(delta_ticks: i64, dt_ms: i64) -> i64 {
    debug_assert!(dt_ms > 0, "speed_tps: dt must be positive, got {dt_ms}");
    delta_ticks.saturating_mul(MILLIS_PER_SEC) / dt_ms.max(1)
}

/// Rate of change of speed per ms, truncating toward zero.
#[inline]
pub fn speed_delta_per_ms(speed: i64, last_speed: i64, dt_ms: i64) -> i64 {
    debug_assert!(dt_ms > 0, "speed_delta_per_ms: dt must be positive, got {dt_ms}");
    speed.saturating_sub(last_speed) / dt_ms.max(1)
}

/// `value` limited to `[-bound, bound]`. A negative bound is treated as 0.
#[inline]
pub fn clamp_symmetric(value: i64, bound: i64) -> i64 {
    let b = bound.max(0);
    value.clamp(-b, b)
}

/// Round half away from zero into `i32`, saturating. Non-finite maps to 0.
#[inline]
pub fn round_to_i32(x: f64) -> i32 {
    if !x.is_finite() {
        return 0;
    }
    let r = x.round();
    if r >= f64::from(i32::MAX) {
        i32::MAX
    } else if r <= f64::from(i32::MIN) {
        i32::MIN
    } else {
        r as i32
    }
}

/// Anti-windup bound `round(|max_output / ki|)`. `None` when `ki` is zero or
/// not finite, since the bound is then undefined.
#[inline]
pub fn derive_integral_bound(max_output: i32, ki: f32) -> Option<i64> {
    if !ki.is_finite() || ki == 0.0 {
        return None;
    }
    let b = (f64::from(max_output) / f64::from(ki)).abs().round();
    if !b.is_finite() {
        return None;
    }
    Some(if b >= i64::MAX as f64 { i64::MAX } else { b as i64 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(40, 20, 2000)]
    #[case(1, 3, 333)]
    #[case(-1, 3, -333)]
    #[case(0, 20, 0)]
    #[case(7, 1000, 7)]
    fn speed_truncates_toward_zero(#[case] delta: i64, #[case] dt: i64, #[case] want: i64) {
        assert_eq!(speed_tps(delta, dt), want);
    }

    #[test]
    fn speed_saturates_on_huge_delta() {
        assert_eq!(speed_tps(i64::MAX, 1), i64::MAX);
        assert_eq!(speed_tps(i64::MIN, 1), i64::MIN);
    }

    #[test]
    fn speed_delta_truncates() {
        assert_eq!(speed_delta_per_ms(2000, 0, 20), 100);
        assert_eq!(speed_delta_per_ms(0, 2019, 20), -100);
        assert_eq!(speed_delta_per_ms(19, 0, 20), 0);
    }

    #[rstest]
    #[case(0.5, 1)]
    #[case(-0.5, -1)]
    #[case(217.49, 217)]
    #[case(-217.5, -218)]
    #[case(f64::NAN, 0)]
    #[case(1e12, i32::MAX)]
    #[case(-1e12, i32::MIN)]
    fn rounding_half_away_from_zero(#[case] x: f64, #[case] want: i32) {
        assert_eq!(round_to_i32(x), want);
    }

    #[test]
    fn clamp_symmetric_limits_both_sides() {
        assert_eq!(clamp_symmetric(300, 255), 255);
        assert_eq!(clamp_symmetric(-300, 255), -255);
        assert_eq!(clamp_symmetric(12, 255), 12);
        assert_eq!(clamp_symmetric(12, -5), 0);
    }

    #[test]
    fn bound_from_default_gains() {
        assert_eq!(derive_integral_bound(255, 0.001), Some(255_000));
        assert_eq!(derive_integral_bound(255, 0.5), Some(510));
    }

    #[test]
    fn bound_undefined_for_zero_ki() {
        assert_eq!(derive_integral_bound(255, 0.0), None);
        assert_eq!(derive_integral_bound(255, f32::NAN), None);
    }
}
