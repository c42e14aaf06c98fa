//! Capability traits shared across the drive stack.
//!
//! The control core never touches pins or encoder hardware directly; it talks
//! to these traits. Errors cross the boundary as `Box<dyn Error + Send + Sync>`
//! so implementations are free to use their own error types.

pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

use std::fmt;

/// Boxed error used at every trait boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Wheel selector of a differential drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Left,
    Right,
}

impl Channel {
    /// Both channels in the order the control loop processes them.
    pub const ALL: [Channel; 2] = [Channel::Left, Channel::Right];

    /// Stable array index (`Left = 0`, `Right = 1`).
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Channel::Left => 0,
            Channel::Right => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::Left => "left",
            Channel::Right => "right",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One diagnostic snapshot of both wheels, produced when a report is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlSample {
    /// Milliseconds since the controller epoch.
    pub time_ms: i64,
    /// Measured speed, ticks per second.
    pub speed_left: i64,
    pub speed_right: i64,
    /// Signed duty written to each wheel.
    pub output_left: i32,
    pub output_right: i32,
}

impl ControlSample {
    pub fn speed(&self, channel: Channel) -> i64 {
        match channel {
            Channel::Left => self.speed_left,
            Channel::Right => self.speed_right,
        }
    }

    pub fn output(&self, channel: Channel) -> i32 {
        match channel {
            Channel::Left => self.output_left,
            Channel::Right => self.output_right,
        }
    }
}

/// Serial-monitor style line: `time:20, v_meas_l:2000, v_meas_r:2000, voltage_l:-218, voltage_r:-218`.
impl fmt::Display for ControlSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "time:{}, v_meas_l:{}, v_meas_r:{}, voltage_l:{}, voltage_r:{}",
            self.time_ms, self.speed_left, self.speed_right, self.output_left, self.output_right
        )
    }
}

/// Motor driver: signed duty in, direction + magnitude out.
pub trait Actuator {
    /// Drive `channel` with a signed duty. Strictly positive is forward,
    /// zero commands zero duty (coast), never a brake.
    fn drive(&mut self, channel: Channel, duty: i32) -> Result<(), BoxError>;
    /// Active braking: both direction lines at the same level, PWM line held on.
    fn halt(&mut self, channel: Channel) -> Result<(), BoxError>;
}

/// Cumulative encoder tick count per wheel.
pub trait PositionSource {
    fn read(&mut self, channel: Channel) -> Result<i64, BoxError>;
}

/// Diagnostic sink. Must return quickly; the control loop calls it inline.
pub trait Reporter {
    fn report(&mut self, sample: &ControlSample) -> Result<(), BoxError>;
}

impl<T: Actuator + ?Sized> Actuator for Box<T> {
    fn drive(&mut self, channel: Channel, duty: i32) -> Result<(), BoxError> {
        (**self).drive(channel, duty)
    }
    fn halt(&mut self, channel: Channel) -> Result<(), BoxError> {
        (**self).halt(channel)
    }
}

impl<T: PositionSource + ?Sized> PositionSource for Box<T> {
    fn read(&mut self, channel: Channel) -> Result<i64, BoxError> {
        (**self).read(channel)
    }
}

impl<T: Reporter + ?Sized> Reporter for Box<T> {
    fn report(&mut self, sample: &ControlSample) -> Result<(), BoxError> {
        (**self).report(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_line_matches_serial_format() {
        let s = ControlSample {
            time_ms: 20,
            speed_left: 2000,
            speed_right: -15,
            output_left: -218,
            output_right: 7,
        };
        assert_eq!(
            s.to_string(),
            "time:20, v_meas_l:2000, v_meas_r:-15, voltage_l:-218, voltage_r:7"
        );
    }

    #[test]
    fn channel_indices_are_stable() {
        assert_eq!(Channel::Left.index(), 0);
        assert_eq!(Channel::Right.index(), 1);
        assert_eq!(Channel::ALL.map(Channel::name), ["left", "right"]);
    }
}
