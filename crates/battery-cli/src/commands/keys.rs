//! Key commands.

use super::redis_argument;
use anyhow::Result;
use battery_redis::HandlerArgs;
use clap::{Args, Subcommand};
use colored::Colorize;
use redis::AsyncCommands;

/// Commands run against one redis instance.
#[derive(Subcommand)]
pub enum KeyCommands {
    /// Check that the instance answers
    Ping,

    /// Read a key
    Get(GetArgs),

    /// Write a key
    Set(SetArgs),

    /// Delete keys
    Del(DelArgs),
}

pub async fn execute(cmd: KeyCommands, args: HandlerArgs) -> Result<()> {
    match cmd {
        KeyCommands::Ping => ping(args).await,
        KeyCommands::Get(cmd) => get(args, cmd).await,
        KeyCommands::Set(cmd) => set(args, cmd).await,
        KeyCommands::Del(cmd) => del(args, cmd).await,
    }
}

#[derive(Args)]
pub struct GetArgs {
    /// Key to read
    pub key: String,
}

#[derive(Args)]
pub struct SetArgs {
    /// Key to write
    pub key: String,

    /// Value to store
    pub value: String,

    /// Expire the key after this many seconds
    #[arg(long)]
    pub ex: Option<u64>,
}

#[derive(Args)]
pub struct DelArgs {
    /// Keys to delete
    #[arg(required = true)]
    pub keys: Vec<String>,
}

pub async fn ping(mut args: HandlerArgs) -> Result<()> {
    let mut redis = redis_argument(&mut args)?;
    let reply: String = redis::cmd("PING").query_async(&mut *redis).await?;
    println!("{}", reply.green());
    Ok(())
}

pub async fn get(mut args: HandlerArgs, cmd: GetArgs) -> Result<()> {
    let mut redis = redis_argument(&mut args)?;
    let value: Option<String> = redis.get(&cmd.key).await?;
    match value {
        Some(value) => println!("{}", value),
        None => println!("{}", "(nil)".dimmed()),
    }
    Ok(())
}

pub async fn set(mut args: HandlerArgs, cmd: SetArgs) -> Result<()> {
    let mut redis = redis_argument(&mut args)?;
    match cmd.ex {
        Some(seconds) => redis.set_ex::<_, _, ()>(&cmd.key, &cmd.value, seconds).await?,
        None => redis.set::<_, _, ()>(&cmd.key, &cmd.value).await?,
    }
    println!("{}", "OK".green());
    Ok(())
}

pub async fn del(mut args: HandlerArgs, cmd: DelArgs) -> Result<()> {
    let mut redis = redis_argument(&mut args)?;
    let removed: u64 = redis.del(&cmd.keys).await?;
    println!("{} {}", removed.to_string().cyan(), "removed");
    Ok(())
}
