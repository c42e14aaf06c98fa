use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("pwm error: {0}")]
    Pwm(String),
    #[error("encoder read timeout")]
    Timeout,
    #[error("pin {0} assigned twice")]
    PinConflict(u8),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
impl From<rppal::gpio::Error> for HwError {
    fn from(e: rppal::gpio::Error) -> Self {
        HwError::Gpio(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HwError>;
