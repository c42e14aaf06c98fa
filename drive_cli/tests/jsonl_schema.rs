use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_valid_config(dir: &tempfile::TempDir, ki: &str) -> PathBuf {
    let toml = format!(
        r#"
[pins]
left_dir_a = 10
left_dir_b = 11
left_pwm = 9
right_dir_a = 6
right_dir_b = 7
right_pwm = 5
left_enc_a = 18
left_enc_b = 19
right_enc_a = 20
right_enc_b = 21

[pid]
kp = 0.1
ki = {ki}
kd = 0.1
"#
    );
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn parse_lines(bytes: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(bytes)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap_or_else(|e| panic!("not JSON ({e}): {l}")))
        .collect()
}

/// Every stdout line of a JSON run is a sample or the final summary.
#[rstest]
fn jsonl_run_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir, "0.001");

    let mut cmd = Command::cargo_bin("drive_cli").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--left", "1000", "--right", "-1000"])
        .args(["--virtual-time", "--duration-ms", "600"]);

    let out = cmd.assert().success().get_output().stdout.clone();
    let lines = parse_lines(&out);
    let (samples, rest) = lines.split_at(lines.len() - 1);

    let times: Vec<i64> = samples
        .iter()
        .map(|v| {
            assert_eq!(v["kind"], "sample");
            for key in ["speed_left", "speed_right", "output_left", "output_right"] {
                assert!(v[key].is_i64(), "{key} missing in {v}");
            }
            let out_l = v["output_left"].as_i64().unwrap();
            assert!(out_l.abs() <= 255);
            v["time_ms"].as_i64().unwrap()
        })
        .collect();
    assert_eq!(times, [20, 280, 540]);

    let summary = &rest[0];
    assert_eq!(summary["kind"], "summary");
    assert_eq!(summary["interrupted"], false);
    assert_eq!(summary["target_left"], 1000);
    assert_eq!(summary["target_right"], -1000);
    assert_eq!(summary["steps"], 29);
    assert_eq!(summary["reports"], 3);
    assert_eq!(summary["faults"], 0);
    assert_eq!(summary["elapsed_ms"], 600);
    assert_eq!(summary["dropped_reports"], 0);
    for key in ["polls", "late_steps", "max_dt_ms"] {
        assert!(summary[key].is_u64() || summary[key].is_i64(), "{key}");
    }
}

/// Errors in JSON mode are a single object on stderr with a stable reason.
#[rstest]
#[case("0.0", &["halt"], "Config", 2, &[])]
#[case("0.001", &["self-check"], "Timeout", 3, &[("DRIVE_TEST_SIM_ENCODER_FAULT", "1")])]
fn jsonl_error_schema(
    #[case] ki: &str,
    #[case] args: &[&str],
    #[case] reason: &str,
    #[case] code: i32,
    #[case] env: &[(&str, &str)],
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir, ki);

    let mut cmd = Command::cargo_bin("drive_cli").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("off")
        .arg("--config")
        .arg(&cfg)
        .args(args)
        .envs(env.iter().copied());

    let out = cmd.assert().code(code).get_output().stderr.clone();
    let lines = parse_lines(&out);
    let v = lines
        .iter()
        .find(|v| v.get("reason").is_some())
        .expect("JSON error object on stderr");
    assert_eq!(v["reason"], reason);
    assert_eq!(v["exit_code"], code);
    assert!(v["error"].as_str().is_some_and(|s| !s.is_empty()));
    assert!(
        v["message"]
            .as_str()
            .is_some_and(|s| s.starts_with("What happened:"))
    );
}
