//! Human-readable error descriptions and structured JSON error formatting.

use drive_core::error::{BuildError, DriveError};

pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONFIG: i32 = 2;
pub const EXIT_HARDWARE: i32 = 3;
pub const EXIT_INTERRUPTED: i32 = 130;

/// The innermost typed error, where the real cause lives.
fn drive_error(err: &eyre::Report) -> Option<&DriveError> {
    err.chain()
        .filter_map(|e| e.downcast_ref::<DriveError>())
        .last()
        .or_else(|| err.downcast_ref::<DriveError>())
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingActuator => {
                "What happened: No actuator was provided to the controller.\nLikely causes: The H-bridge driver failed to initialize or was not wired into the builder.\nHow to fix: Ensure the actuator is created successfully and passed via with_actuator(...).".to_string()
            }
            BuildError::MissingPositionSource => {
                "What happened: No encoder source was provided to the controller.\nLikely causes: The encoder driver failed to initialize or was not wired into the builder.\nHow to fix: Ensure the encoders are created successfully and passed via with_position_source(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid controller configuration ({msg}).\nLikely causes: Out-of-range values under [pid] or [timing].\nHow to fix: Edit the config file, then rerun. See etc/drive_config.toml for a sample."
            ),
        };
    }

    if let Some(de) = drive_error(err) {
        return match de {
            DriveError::Config(msg) => format!(
                "What happened: The configuration could not be loaded ({msg}).\nLikely causes: Wrong --config path, TOML syntax error, or a value rejected by validation.\nHow to fix: Fix the file (run `drive print-config` on a known-good one for reference) and try again."
            ),
            DriveError::Timeout => "What happened: Encoder read timed out.\nLikely causes: Encoder not powered, A/B lines not wired to the configured pins, or a stalled bus.\nHow to fix: Check [pins] left_enc_*/right_enc_* and encoder power, then rerun `drive self-check`.".to_string(),
            DriveError::Hardware(msg) | DriveError::HardwareFault(msg) => format!(
                "What happened: Hardware error ({msg}).\nLikely causes: Incorrect pin numbers, missing GPIO permissions, or H-bridge wiring/power issues.\nHow to fix: Fix the [pins] values in the config; ensure the process can access /dev/gpiomem."
            ),
            DriveError::Report(msg) => format!(
                "What happened: Report output failed ({msg}).\nLikely causes: stdout was closed (e.g., a pipe reader exited).\nHow to fix: Keep the consumer running or pass --no-report."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // Generic fallback
    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: configuration 2, hardware 3, anything else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(BuildError::InvalidConfig(_)) = err.downcast_ref::<BuildError>() {
        return EXIT_CONFIG;
    }
    match drive_error(err) {
        Some(DriveError::Config(_)) => EXIT_CONFIG,
        Some(DriveError::Hardware(_) | DriveError::HardwareFault(_) | DriveError::Timeout) => {
            EXIT_HARDWARE
        }
        _ => EXIT_FAILURE,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    match drive_error(err) {
        Some(DriveError::Config(_)) => "Config",
        Some(DriveError::Timeout) => "Timeout",
        Some(DriveError::Hardware(_) | DriveError::HardwareFault(_)) => "Hardware",
        Some(DriveError::Report(_)) => "Report",
        Some(DriveError::State(_)) => "State",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "error": format!("{err:#}"),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;

    #[test]
    fn config_errors_exit_2() {
        let e = eyre::Report::new(DriveError::Config("bad".into()));
        assert_eq!(exit_code_for_error(&e), EXIT_CONFIG);
        assert!(humanize(&e).starts_with("What happened: The configuration"));
    }

    #[test]
    fn wrapped_timeout_exits_3() {
        let e: eyre::Result<()> = Err(eyre::Report::new(DriveError::Timeout));
        let e = e
            .wrap_err("reading left encoder")
            .wrap_err(DriveError::State("4 consecutive failed control steps".into()))
            .unwrap_err();
        assert_eq!(exit_code_for_error(&e), EXIT_HARDWARE);
        assert_eq!(reason_name(&e), "Timeout");
    }

    #[test]
    fn invalid_gains_exit_2() {
        let e = eyre::Report::new(BuildError::InvalidConfig("max_output must be > 0"));
        assert_eq!(exit_code_for_error(&e), EXIT_CONFIG);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&e)).unwrap();
        assert_eq!(v["reason"], "Build");
        assert_eq!(v["exit_code"], 2);
    }

    #[test]
    fn untyped_errors_fall_back() {
        let e = eyre::eyre!("something odd");
        assert_eq!(exit_code_for_error(&e), EXIT_FAILURE);
        assert!(humanize(&e).contains("Original: something odd"));
    }
}
