#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
//! `drive`: command-line front end of the wheel speed controller.

mod cli;
mod drive;
mod error_fmt;
mod rt;

use std::path::Path;

use clap::Parser;
use eyre::WrapErr;

use cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use drive_core::error::DriveError;

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    // Colorized reports are only for the debug dump below.
    let _ = color_eyre::install();

    match real_main(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::debug!("{e:?}");
            if JSON_MODE.get().copied().unwrap_or(false) {
                eprintln!("{}", error_fmt::format_error_json(&e));
            } else {
                eprintln!("error: {e:#}");
                eprintln!("{}", error_fmt::humanize(&e));
            }
            std::process::exit(error_fmt::exit_code_for_error(&e));
        }
    }
}

fn real_main(cli: Cli) -> eyre::Result<i32> {
    let cfg = drive_config::load_file(&cli.config)
        .map_err(|e| eyre::Report::new(DriveError::Config(format!("{e:#}"))))?;
    init_tracing(cli.json, &cli.log_level, &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Run {
            left,
            right,
            duration_ms,
            no_report,
            log_reports,
            virtual_time,
            stats,
            rt,
            rt_prio,
            rt_lock,
        } => {
            let opts = drive::RunOptions {
                left,
                right,
                duration_ms,
                no_report,
                log_reports,
                virtual_time,
                stats,
                rt,
                rt_prio,
                rt_lock,
            };
            drive::run_drive(&cfg, &opts, cli.json)
        }
        Commands::Halt => drive::halt(&cfg, cli.json).map(|()| 0),
        Commands::SelfCheck => drive::self_check(&cfg, cli.json).map(|()| 0),
        Commands::PrintConfig => {
            print!("{}", cfg.to_toml()?);
            Ok(0)
        }
    }
}

/// Console layer on stderr (text or JSON) plus an optional JSON file layer.
///
/// `RUST_LOG` overrides `--log-level` for the console; `[logging].level`
/// filters the file.
fn init_tracing(json: bool, level: &str, logging: &drive_config::Logging) -> eyre::Result<()> {
    use tracing_subscriber::{
        EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
    };

    let console_filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(level).wrap_err_with(|| format!("invalid --log-level {level:?}"))?,
    };

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    };
    layers.push(console);

    if let Some(path) = logging.file.as_deref() {
        let p = Path::new(path);
        let dir = p
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = p
            .file_name()
            .ok_or_else(|| eyre::eyre!("logging.file has no file name: {path}"))?;
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let file_level = logging.level.as_deref().unwrap_or("info");
        let file_filter = EnvFilter::try_new(file_level)
            .wrap_err_with(|| format!("invalid logging.level {file_level:?}"))?;
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(file_filter)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .wrap_err("installing tracing subscriber")
}
