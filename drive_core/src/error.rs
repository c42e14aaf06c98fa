use thiserror::Error;

/// Failures surfaced by the control loop and its collaborators.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriveError {
    /// Collaborator error without a more specific class.
    #[error("hardware error: {0}")]
    Hardware(String),
    /// GPIO/PWM level failure reported by the hardware backend.
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("timeout waiting for encoder")]
    Timeout,
    #[error("invalid state: {0}")]
    State(String),
    /// The diagnostic sink refused a sample.
    #[error("report sink error: {0}")]
    Report(String),
}

/// Construction-time errors of `DriveController` / `build_control_loop`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing actuator")]
    MissingActuator,
    #[error("missing position source")]
    MissingPositionSource,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
