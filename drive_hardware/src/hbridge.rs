//! Dual H-bridge driver on Raspberry Pi GPIO (software PWM via rppal).
//!
//! Per motor: two direction lines and one PWM/enable line.
//! - drive: `dir_a = duty > 0`, `dir_b = !(duty > 0)`, PWM duty `|duty| / max_duty`
//! - halt: `dir_a = dir_b = LOW`, PWM line held HIGH (electronic brake)

use rppal::gpio::{Gpio, OutputPin};
use tracing::{debug, trace};

use drive_traits::{Actuator, BoxError, Channel};

use crate::error::{HwError, Result};

/// GPIO numbers of one motor's bridge inputs.
#[derive(Debug, Clone, Copy)]
pub struct BridgePins {
    pub dir_a: u8,
    pub dir_b: u8,
    pub pwm: u8,
}

struct Bridge {
    dir_a: OutputPin,
    dir_b: OutputPin,
    pwm: OutputPin,
    invert: bool,
}

impl Bridge {
    fn open(gpio: &Gpio, pins: BridgePins, invert: bool) -> Result<Self> {
        let mut bridge = Self {
            dir_a: gpio.get(pins.dir_a)?.into_output(),
            dir_b: gpio.get(pins.dir_b)?.into_output(),
            pwm: gpio.get(pins.pwm)?.into_output(),
            invert,
        };
        // Start coasting: zero duty, both direction lines low.
        bridge.dir_a.set_low();
        bridge.dir_b.set_low();
        bridge.pwm.set_low();
        Ok(bridge)
    }
}

/// Two-channel H-bridge actuator.
pub struct HBridgeActuator {
    bridges: [Bridge; 2],
    max_duty: i32,
    pwm_frequency_hz: f64,
}

impl HBridgeActuator {
    /// Claim the six bridge pins and configure them as outputs.
    pub fn new(
        left: BridgePins,
        right: BridgePins,
        invert: [bool; 2],
        max_duty: i32,
        pwm_frequency_hz: f64,
    ) -> Result<Self> {
        let gpio = Gpio::new()?;
        let bridges = [
            Bridge::open(&gpio, left, invert[0])?,
            Bridge::open(&gpio, right, invert[1])?,
        ];
        debug!(?left, ?right, pwm_frequency_hz, "h-bridge ready");
        Ok(Self {
            bridges,
            max_duty: max_duty.max(1),
            pwm_frequency_hz,
        })
    }

    fn apply(&mut self, channel: Channel, duty: i32) -> Result<()> {
        let max = self.max_duty;
        let freq = self.pwm_frequency_hz;
        let b = &mut self.bridges[channel.index()];
        let duty = if b.invert { duty.saturating_neg() } else { duty };
        let forward = duty > 0;
        if forward {
            b.dir_a.set_high();
            b.dir_b.set_low();
        } else {
            b.dir_a.set_low();
            b.dir_b.set_high();
        }
        let frac = f64::from(duty.unsigned_abs().min(max.unsigned_abs())) / f64::from(max);
        if frac == 0.0 {
            b.pwm.clear_pwm().map_err(|e| HwError::Pwm(e.to_string()))?;
            b.pwm.set_low();
        } else {
            b.pwm
                .set_pwm_frequency(freq, frac)
                .map_err(|e| HwError::Pwm(e.to_string()))?;
        }
        trace!(%channel, duty, frac, "h-bridge drive");
        Ok(())
    }

    fn brake(&mut self, channel: Channel) -> Result<()> {
        let b = &mut self.bridges[channel.index()];
        b.dir_a.set_low();
        b.dir_b.set_low();
        b.pwm.clear_pwm().map_err(|e| HwError::Pwm(e.to_string()))?;
        b.pwm.set_high();
        debug!(%channel, "h-bridge brake");
        Ok(())
    }
}

impl Actuator for HBridgeActuator {
    fn drive(&mut self, channel: Channel, duty: i32) -> std::result::Result<(), BoxError> {
        self.apply(channel, duty).map_err(Into::into)
    }

    fn halt(&mut self, channel: Channel) -> std::result::Result<(), BoxError> {
        self.brake(channel).map_err(Into::into)
    }
}
