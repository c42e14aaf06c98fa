#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Dual-wheel PID speed control (hardware-agnostic).
//!
//! All hardware interactions go through the `drive_traits::Actuator`,
//! `drive_traits::PositionSource` and `drive_traits::Reporter` traits.
//!
//! ## Architecture
//!
//! - **Configuration**: gains, limits and intervals (`config` module)
//! - **State**: per-wheel PID state and shared loop timing (`state` module)
//! - **Control**: the gated fixed-timestep loop (`ControlLoop`)
//! - **Construction**: type-state builder and generic constructor (`builder` module)
//! - **Driver**: fast outer loop with graceful stop (`runner` module)
//!
//! ## Arithmetic
//!
//! Positions, speeds (ticks/s) and the error integral (ticks/s * ms) are
//! `i64`. Speed and derivative divisions truncate toward zero. Only the
//! weighted sum of the PID terms is computed in `f64`, then rounded half away
//! from zero and clamped to `[-max_output, max_output]`.

pub mod builder;
pub mod config;
pub mod control;
pub mod conversions;
pub mod error;
pub mod fixed_point;
pub mod hw_error;
pub mod mocks;
pub mod pid;
pub mod reporter;
pub mod runner;
pub mod state;
pub mod status;
pub mod util;

pub use builder::{DriveController, DriveControllerBuilder, Missing, Set, build_control_loop};
pub use config::PidGains;
pub use control::ControlLoop;
pub use error::{BuildError, DriveError, Report, Result};
pub use pid::{PidLaw, PidTerms};
pub use reporter::{ChannelReporter, NullReporter, TracingReporter};
pub use runner::{RunParams, RunSummary, run};
pub use state::{ChannelMode, LoopTiming, PidChannelState};
pub use status::{SkipReason, StepReport, StepStatus};

pub use drive_traits::{Channel, ControlSample};
