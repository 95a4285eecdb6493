#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `vent_cli`: run the breath-cycle controller, inspect cycle timing, or check a
//! configuration.

mod cli;
mod error_fmt;
mod run;

use std::path::Path;

use clap::Parser;
use eyre::{Result, WrapErr};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};
use vent_core::VentError;

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error hooks: {e}");
    }

    if let Err(err) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> Result<()> {
    let cfg = load_config(&cli.config);
    init_tracing(
        cli.json,
        cli.log_level.as_deref(),
        cfg.as_ref().ok().map(|c| &c.logging),
    );
    let cfg = cfg?;
    tracing::debug!(config = %cli.config.display(), "configuration loaded");

    match cli.cmd {
        Commands::Run {
            duration_ms,
            spontaneous,
            stats,
            sim_set_rate,
            rt,
            rt_prio,
            rt_lock,
            rt_cpu,
        } => run::run(
            &cfg,
            &run::RunArgs {
                duration_ms,
                spontaneous,
                stats,
                sim_set_rate,
                rt,
                rt_prio,
                rt_lock,
                rt_cpu,
                json: cli.json,
            },
        ),
        Commands::Timing { rate, ie } => run::timing(&cfg, rate, ie, cli.json),
        Commands::SelfCheck => run::self_check(&cfg),
    }
}

/// Read, parse and validate the TOML config. Every failure is a `VentError::Config`.
fn load_config(path: &Path) -> Result<vent_config::Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| VentError::Config(format!("read {}: {e}", path.display())))?;
    let cfg = vent_config::load_toml(&text)
        .map_err(|e| VentError::Config(format!("parse {}: {e}", path.display())))?;
    cfg.validate()
        .map_err(|e| VentError::Config(e.to_string()))
        .wrap_err_with(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Console logs go to stderr so stdout stays machine-readable. With
/// `[logging] file` set, JSON lines are also written to a rolling file.
///
/// Level precedence: `--log-level`, then `RUST_LOG`, then `[logging] level`,
/// then `info`.
fn init_tracing(json: bool, level: Option<&str>, logging: Option<&vent_config::Logging>) {
    let filter = match level {
        Some(l) => EnvFilter::new(l),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                logging
                    .and_then(|l| l.level.as_deref())
                    .unwrap_or("info"),
            )
        }),
    };

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    if json {
        layers.push(fmt::layer().json().with_writer(std::io::stderr).boxed());
    } else {
        layers.push(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .boxed(),
        );
    }

    if let Some(file) = logging.and_then(|l| l.file.as_deref()) {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map_or_else(|| "vent.log".into(), std::ffi::OsStr::to_os_string);
        let appender = match logging.and_then(|l| l.rotation.as_deref()) {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
        );
    }

    let _ = tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init();
}
