//! Turns collaborator errors into `DriveError`.
//!
//! Actuators, encoders and reporters hand back `BoxError`. With the
//! `hardware-errors` feature the `drive_hardware::HwError` variants are matched
//! exactly; anything else is classified by its message.

use crate::error::DriveError;

pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> DriveError {
    #[cfg(feature = "hardware-errors")]
    {
        use drive_hardware::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout => DriveError::Timeout,
                // A pin map problem is fixed in the config, not on the bench.
                HwError::PinConflict(_) => DriveError::Config(hw.to_string()),
                HwError::Io(_) => DriveError::Hardware(hw.to_string()),
                HwError::Gpio(_) | HwError::Pwm(_) => DriveError::HardwareFault(hw.to_string()),
            };
        }
    }

    let msg = e.to_string();
    let lower = msg.to_ascii_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        DriveError::Timeout
    } else {
        DriveError::Hardware(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("encoder Timeout on bus")]
    #[case("read timed out after 5 ms")]
    fn timeout_messages_map_to_timeout(#[case] msg: &str) {
        let e = std::io::Error::other(msg.to_string());
        assert_eq!(map_hw_error(&e), DriveError::Timeout);
    }

    #[test]
    fn other_errors_keep_their_message() {
        let e = std::io::Error::other("bridge overheated");
        assert_eq!(
            map_hw_error(&e),
            DriveError::Hardware("bridge overheated".into())
        );
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn typed_hw_errors_are_downcast() {
        use drive_hardware::HwError;
        assert_eq!(map_hw_error(&HwError::Timeout), DriveError::Timeout);
        assert_eq!(
            map_hw_error(&HwError::Pwm("no channel".into())),
            DriveError::HardwareFault("pwm error: no channel".into())
        );
        assert_eq!(
            map_hw_error(&HwError::PinConflict(7)),
            DriveError::Config("pin 7 assigned twice".into())
        );
    }
}
