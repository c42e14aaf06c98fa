#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the wheel speed controller.
//!
//! `Config` and its sections are deserialized from TOML and checked with
//! `Config::validate`. Only `[pins]` and `[pid]` are required; every other
//! section falls back to the defaults below.
use std::path::Path;

use eyre::WrapErr;
use serde::{Deserialize, Serialize};

/// GPIO numbers (BCM) of both H-bridges and both encoders.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct Pins {
    pub left_dir_a: u8,
    pub left_dir_b: u8,
    pub left_pwm: u8,
    pub right_dir_a: u8,
    pub right_dir_b: u8,
    pub right_pwm: u8,
    pub left_enc_a: u8,
    pub left_enc_b: u8,
    pub right_enc_a: u8,
    pub right_enc_b: u8,
}

impl Pins {
    /// Every pin with its key, in declaration order.
    pub fn named(&self) -> [(&'static str, u8); 10] {
        [
            ("left_dir_a", self.left_dir_a),
            ("left_dir_b", self.left_dir_b),
            ("left_pwm", self.left_pwm),
            ("right_dir_a", self.right_dir_a),
            ("right_dir_b", self.right_dir_b),
            ("right_pwm", self.right_pwm),
            ("left_enc_a", self.left_enc_a),
            ("left_enc_b", self.left_enc_b),
            ("right_enc_a", self.right_enc_a),
            ("right_enc_b", self.right_enc_b),
        ]
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct Pid {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    /// PWM full scale; outputs are clamped to `[-max_output, max_output]`.
    #[serde(default = "default_max_output")]
    pub max_output: i32,
    /// Anti-windup bound. Derived as `max_output / ki` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_error_integral: Option<i64>,
}

fn default_max_output() -> i32 {
    255
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct Timing {
    pub control_interval_ms: u64,
    pub report_interval_ms: u64,
    /// Spacing of the outer loop that calls the controller.
    pub poll_interval_us: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            control_interval_ms: 20,
            report_interval_ms: 250,
            poll_interval_us: 500,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Hardware {
    pub pwm_frequency_hz: f64,
    /// Swap forward/backward for a motor wired the other way round.
    pub invert_left: bool,
    pub invert_right: bool,
}

impl Default for Hardware {
    fn default() -> Self {
        Self {
            pwm_frequency_hz: 1000.0,
            invert_left: false,
            invert_right: false,
        }
    }
}

/// Simulated drivetrain used when no hardware backend is selected.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Sim {
    /// Wheel speed at full duty, ticks per second.
    pub max_speed_tps: f64,
    pub time_constant_ms: f64,
}

impl Default for Sim {
    fn default() -> Self {
        Self {
            max_speed_tps: 3000.0,
            time_constant_ms: 80.0,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Logging {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>, // path to .log (JSON lines)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    pub pins: Pins,
    pub pid: Pid,
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub hardware: Hardware,
    #[serde(default)]
    pub sim: Sim,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("reading config {}", path.display()))?;
    let cfg = load_toml(&text).wrap_err_with(|| format!("parsing config {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    /// Render back to TOML (effective values, defaults filled in).
    pub fn to_toml(&self) -> eyre::Result<String> {
        toml::to_string_pretty(self).wrap_err("serializing config")
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        let named = self.pins.named();
        for (i, (name, pin)) in named.iter().enumerate() {
            if *pin > 27 {
                eyre::bail!("pins.{name} must be a BCM GPIO in 0..=27, got {pin}");
            }
            if let Some((other, _)) = named[..i].iter().find(|(_, p)| p == pin) {
                eyre::bail!("pins.{other} and pins.{name} both use GPIO {pin}");
            }
        }

        // PID
        for (name, g) in [("kp", self.pid.kp), ("ki", self.pid.ki), ("kd", self.pid.kd)] {
            if !g.is_finite() || g < 0.0 {
                eyre::bail!("pid.{name} must be finite and >= 0");
            }
        }
        if self.pid.max_output <= 0 {
            eyre::bail!("pid.max_output must be > 0");
        }
        match self.pid.max_error_integral {
            Some(b) if b < 0 => eyre::bail!("pid.max_error_integral must be >= 0"),
            None if self.pid.ki == 0.0 => {
                eyre::bail!("pid.ki must be nonzero unless pid.max_error_integral is set")
            }
            _ => {}
        }

        // Timing
        if self.timing.control_interval_ms == 0 {
            eyre::bail!("timing.control_interval_ms must be >= 1");
        }
        if self.timing.control_interval_ms > 10_000 {
            eyre::bail!("timing.control_interval_ms is unreasonably large (>10s)");
        }
        if self.timing.poll_interval_us == 0 {
            eyre::bail!("timing.poll_interval_us must be >= 1");
        }
        if self.timing.poll_interval_us >= self.timing.control_interval_ms.saturating_mul(1000) {
            eyre::bail!("timing.poll_interval_us must be shorter than timing.control_interval_ms");
        }

        // Hardware
        if !(self.hardware.pwm_frequency_hz.is_finite() && self.hardware.pwm_frequency_hz > 0.0) {
            eyre::bail!("hardware.pwm_frequency_hz must be > 0");
        }

        // Sim
        if !(self.sim.max_speed_tps.is_finite() && self.sim.max_speed_tps > 0.0) {
            eyre::bail!("sim.max_speed_tps must be > 0");
        }
        if !(self.sim.time_constant_ms.is_finite() && self.sim.time_constant_ms > 0.0) {
            eyre::bail!("sim.time_constant_ms must be > 0");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        Ok(())
    }
}
