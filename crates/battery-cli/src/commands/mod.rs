//! CLI command definitions and handlers.

use anyhow::Result;
use battery_redis::{
    connect_redis, with_redis_conn, HandlerArgs, RedisConnection, RedisRegistry, Settings,
    TaskContext, DEFAULT_INSTANCE,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

pub mod keys;
pub mod options;

/// Battery - pooled redis access
#[derive(Parser)]
#[command(name = "battery")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Redis instance to run the command against
    #[arg(short, long, global = true, default_value = DEFAULT_INSTANCE)]
    pub instance: String,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(flatten)]
    Key(keys::KeyCommands),

    /// Show the resolved redis options
    Options,
}

impl Cli {
    pub async fn execute(self, settings: Settings) -> Result<()> {
        match self.command {
            Commands::Options => options::execute(&settings),
            Commands::Key(cmd) => run_key_command(&self.instance, settings, cmd).await,
        }
    }
}

/// Connect `instance` and run `cmd` with a connection leased from it.
async fn run_key_command(
    instance: &str,
    settings: Settings,
    cmd: keys::KeyCommands,
) -> Result<()> {
    tracing::debug!(instance, "running redis command");
    let registry = Arc::new(RedisRegistry::new(settings));
    connect_redis(registry.clone(), instance)().await?;

    let mut ctx = TaskContext::new(registry);
    let scope = ctx.enter(instance)?;
    with_redis_conn(&scope, HandlerArgs::new(), |args| keys::execute(cmd, args)).await
}

/// The connection injected into a handler's arguments.
pub(crate) fn redis_argument(args: &mut HandlerArgs) -> Result<RedisConnection> {
    args.take_redis()
        .ok_or_else(|| anyhow::anyhow!("no redis connection was injected"))
}
