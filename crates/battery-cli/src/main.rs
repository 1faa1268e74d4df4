//! Battery CLI - pooled redis access from the command line.

use anyhow::Result;
use battery_redis::OptionRegistry;
use clap::{CommandFactory, FromArgMatches};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::Cli;

/// Comma separated redis instances to declare options for.
const INSTANCES_ENV: &str = "BATTERY_REDIS_INSTANCES";
const DEFAULT_INSTANCES: &str = "master,slave";

/// Initialize tracing on stderr, optionally also writing to a log file.
///
/// Command output goes to stdout, so logs never share it.
fn init_tracing(log_file: Option<&std::path::Path>) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "battery=info,battery_redis=info".into());

    let stderr = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if let Some(path) = log_file {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr)
            .init();
    }
    Ok(())
}

/// Declare options for every configured instance.
fn redis_options() -> Result<OptionRegistry> {
    let instances =
        std::env::var(INSTANCES_ENV).unwrap_or_else(|_| DEFAULT_INSTANCES.to_string());
    let mut options = OptionRegistry::new();
    for instance in instances.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        options.register(instance, battery_redis::DEFAULT_URI)?;
    }
    Ok(options)
}

#[tokio::main]
async fn main() -> Result<()> {
    let options = redis_options()?;
    let matches = options.augment(Cli::command()).get_matches();
    let cli = Cli::from_arg_matches(&matches)?;

    init_tracing(cli.log_file.as_deref())?;

    let settings = options.settings_from(&matches)?;
    cli.execute(settings).await
}
