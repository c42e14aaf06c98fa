use drive_config::{load_file, load_toml};
use rstest::rstest;
use std::io::Write;

const PINS: &str = r#"
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
"#;

fn with_pins(rest: &str) -> String {
    format!("{PINS}\n{rest}")
}

const PID: &str = r#"
[pid]
kp = 0.1
ki = 0.001
kd = 0.1
"#;

#[test]
fn minimal_config_fills_defaults() {
    let cfg = load_toml(&with_pins(PID)).expect("parse TOML");
    cfg.validate().expect("minimal config should pass");
    assert_eq!(cfg.pid.max_output, 255);
    assert_eq!(cfg.pid.max_error_integral, None);
    assert_eq!(cfg.timing.control_interval_ms, 20);
    assert_eq!(cfg.timing.report_interval_ms, 250);
    assert_eq!(cfg.timing.poll_interval_us, 500);
    assert!((cfg.hardware.pwm_frequency_hz - 1000.0).abs() < f64::EPSILON);
    assert!(!cfg.hardware.invert_left);
    assert!((cfg.sim.max_speed_tps - 3000.0).abs() < f64::EPSILON);
}

#[test]
fn missing_pid_section_is_a_parse_error() {
    assert!(load_toml(PINS).is_err());
}

#[test]
fn rejects_duplicate_pins() {
    let toml = with_pins(PID).replace("left_pwm = 9", "left_pwm = 7");
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("pin 7 used twice");
    assert_eq!(
        err.to_string(),
        "pins.left_pwm and pins.right_dir_b both use GPIO 7"
    );
}

#[test]
fn rejects_zero_ki_without_explicit_bound() {
    let toml = with_pins(&PID.replace("ki = 0.001", "ki = 0.0"));
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("ki = 0 must be rejected");
    assert!(format!("{err}").contains("pid.ki must be nonzero"));
}

#[test]
fn zero_ki_with_explicit_bound_is_fine() {
    let toml = with_pins(&format!(
        "{}max_error_integral = 1000\n",
        PID.replace("ki = 0.001", "ki = 0.0")
    ));
    let cfg = load_toml(&toml).expect("parse TOML");
    cfg.validate().expect("explicit bound makes ki = 0 valid");
    assert_eq!(cfg.pid.max_error_integral, Some(1000));
}

#[rstest]
#[case("[pid]\nkp = -0.1\nki = 0.001\nkd = 0.1\n", "pid.kp must be finite and >= 0")]
#[case("[pid]\nkp = 0.1\nki = 0.001\nkd = nan\n", "pid.kd must be finite and >= 0")]
#[case("[pid]\nkp = 0.1\nki = 0.001\nkd = 0.1\nmax_output = 0\n", "pid.max_output must be > 0")]
#[case(
    "[pid]\nkp = 0.1\nki = 0.001\nkd = 0.1\nmax_error_integral = -1\n",
    "pid.max_error_integral must be >= 0"
)]
#[case(
    "[pid]\nkp = 0.1\nki = 0.001\nkd = 0.1\n[timing]\ncontrol_interval_ms = 0\n",
    "timing.control_interval_ms must be >= 1"
)]
#[case(
    "[pid]\nkp = 0.1\nki = 0.001\nkd = 0.1\n[timing]\npoll_interval_us = 20000\n",
    "timing.poll_interval_us must be shorter"
)]
#[case(
    "[pid]\nkp = 0.1\nki = 0.001\nkd = 0.1\n[hardware]\npwm_frequency_hz = 0.0\n",
    "hardware.pwm_frequency_hz must be > 0"
)]
#[case(
    "[pid]\nkp = 0.1\nki = 0.001\nkd = 0.1\n[sim]\ntime_constant_ms = -5.0\n",
    "sim.time_constant_ms must be > 0"
)]
#[case(
    "[pid]\nkp = 0.1\nki = 0.001\nkd = 0.1\n[logging]\nrotation = \"weekly\"\n",
    "logging.rotation must be one of"
)]
fn rejects_invalid_values(#[case] rest: &str, #[case] expected: &str) {
    let cfg = load_toml(&with_pins(rest)).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        format!("{err}").contains(expected),
        "expected {expected:?}, got {err}"
    );
}

#[test]
fn rejects_out_of_range_gpio() {
    let toml = with_pins(PID).replace("right_enc_b = 21", "right_enc_b = 40");
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("GPIO 40 does not exist");
    assert!(format!("{err}").contains("pins.right_enc_b must be a BCM GPIO"));
}

#[test]
fn load_file_reads_and_validates() {
    let mut f = tempfile::NamedTempFile::new().expect("tempfile");
    write!(f, "{}", with_pins(PID)).expect("write");
    let cfg = load_file(f.path()).expect("valid file");
    assert!((cfg.pid.kp - 0.1).abs() < f32::EPSILON);
}

#[test]
fn load_file_names_the_path_on_error() {
    let mut f = tempfile::NamedTempFile::new().expect("tempfile");
    write!(f, "not = [valid").expect("write");
    let err = load_file(f.path()).expect_err("broken TOML");
    assert!(format!("{err}").contains("parsing config"));
}

#[test]
fn effective_config_round_trips_through_toml() {
    let cfg = load_toml(&with_pins(PID)).expect("parse TOML");
    let text = cfg.to_toml().expect("serialize");
    assert!(text.contains("control_interval_ms = 20"));
    let back = load_toml(&text).expect("re-parse");
    assert_eq!(back, cfg);
}
