//! Interrupt-driven quadrature encoders on Raspberry Pi GPIO.

use std::sync::Arc;

use rppal::gpio::{Gpio, InputPin, Level, Trigger};
use tracing::debug;

use drive_traits::{BoxError, Channel, PositionSource};

use crate::error::Result;
use crate::quadrature::{Line, QuadratureCounter};

/// GPIO numbers of one encoder's A/B outputs.
#[derive(Debug, Clone, Copy)]
pub struct EncoderPins {
    pub a: u8,
    pub b: u8,
}

/// Both wheel encoders. The input pins are held here so their interrupt
/// handlers stay registered for the lifetime of the value.
pub struct GpioEncoders {
    counters: [Arc<QuadratureCounter>; 2],
    _pins: Vec<InputPin>,
}

fn watch(pin: &mut InputPin, counter: &Arc<QuadratureCounter>, line: Line) -> Result<()> {
    let c = Arc::clone(counter);
    pin.set_async_interrupt(Trigger::Both, move |level: Level| {
        c.on_edge(line, level == Level::High);
    })?;
    Ok(())
}

impl GpioEncoders {
    pub fn new(left: EncoderPins, right: EncoderPins) -> Result<Self> {
        let gpio = Gpio::new()?;
        let mut pins = Vec::with_capacity(4);
        let mut counters = Vec::with_capacity(2);
        for p in [left, right] {
            let mut a = gpio.get(p.a)?.into_input_pullup();
            let mut b = gpio.get(p.b)?.into_input_pullup();
            let counter = Arc::new(QuadratureCounter::new(a.is_high(), b.is_high()));
            watch(&mut a, &counter, Line::A)?;
            watch(&mut b, &counter, Line::B)?;
            pins.push(a);
            pins.push(b);
            counters.push(counter);
        }
        debug!(?left, ?right, "encoders armed");
        let right_counter = counters.pop();
        let left_counter = counters.pop();
        match (left_counter, right_counter) {
            (Some(l), Some(r)) => Ok(Self {
                counters: [l, r],
                _pins: pins,
            }),
            _ => Err(crate::error::HwError::Gpio("encoder setup incomplete".into())),
        }
    }
}

impl PositionSource for GpioEncoders {
    fn read(&mut self, channel: Channel) -> std::result::Result<i64, BoxError> {
        Ok(self.counters[channel.index()].count())
    }
}
