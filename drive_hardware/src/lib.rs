//! Drivetrain backends implementing `drive_traits`.
//!
//! - `sim`: deterministic simulated plant (always available)
//! - `hbridge` / `encoder`: Raspberry Pi GPIO backends (`hardware` feature)

pub mod error;
pub mod quadrature;
pub mod sim;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod encoder;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod hbridge;

pub use error::HwError;
pub use sim::{SimParams, SimulatedActuator, SimulatedDrive, SimulatedEncoders};

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use encoder::{EncoderPins, GpioEncoders};
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use hbridge::{BridgePins, HBridgeActuator};

/// Reject pin maps that assign the same GPIO twice.
pub fn check_distinct_pins(pins: &[u8]) -> error::Result<()> {
    let mut seen = [false; 256];
    for &p in pins {
        if std::mem::replace(&mut seen[usize::from(p)], true) {
            return Err(HwError::PinConflict(p));
        }
    }
    Ok(())
}
