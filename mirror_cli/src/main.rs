mod cli;
mod error_fmt;
mod rt;
mod run;

use clap::Parser;
use std::path::Path;

use crate::cli::{Cli, Commands, FILE_GUARD};
use mirror_core::CoreError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = real_main(cli) {
        if json {
            println!("{}", error_fmt::format_error_json(&err));
        } else {
            eprintln!("{}", error_fmt::humanize(&err));
        }
        std::process::exit(error_fmt::exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = mirror_config::load_file(&cli.config)
        .map_err(|e| eyre::Report::new(CoreError::Config(e.to_string())))?;
    cfg.validate()
        .map_err(|e| eyre::Report::new(CoreError::Config(e.to_string())))?;

    init_tracing(&cli, &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Run {
            iterations,
            rt,
            rt_prio,
            rt_lock,
            rt_cpu,
        } => {
            if rt {
                rt::setup_rt_once(rt_prio, rt_lock, rt_cpu);
            }
            run::run(&cfg, iterations, cli.json)
        }
        Commands::Measure { count } => run::measure(&cfg, count, cli.json),
        Commands::Sensors => run::list_sensors(cli.json),
        Commands::SelfCheck => run::self_check(&cfg, cli.json),
    }
}

/// Console layer on stderr (plain or JSON), plus an optional JSON-lines file
/// sink from `[logging] file`. `RUST_LOG` wins over `--log-level`, which wins
/// over `[logging] level`.
fn init_tracing(cli: &Cli, logging: &mirror_config::Logging) -> eyre::Result<()> {
    let level = cli
        .log_level
        .clone()
        .or_else(|| logging.level.clone())
        .unwrap_or_else(|| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let (plain, json) = if cli.json {
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr);
        (None, Some(layer))
    } else {
        let layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr);
        (Some(layer), None)
    };

    let file = match logging.file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name: {}", path.display()))?;
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(plain)
        .with(json)
        .with(file)
        .try_init()
        .map_err(|e| eyre::eyre!("tracing init failed: {e}"))
}
