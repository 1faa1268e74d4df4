//! Resolved option listing.

use anyhow::Result;
use battery_redis::options::group_name;
use battery_redis::{option_name, Settings};
use colored::Colorize;

pub fn execute(settings: &Settings) -> Result<()> {
    for instance in settings.instances() {
        let Some(group) = settings.group(instance) else {
            continue;
        };
        println!("{}", group_name(instance).cyan().bold());
        println!("  {}  {}", option_name(instance, "uri"), group.uri);
        let size = match group.pool_size() {
            Some(size) => format!("{}..{}", size.min, size.max),
            None => "invalid".red().to_string(),
        };
        println!(
            "  {}  {:?} ({})",
            option_name(instance, "num-connections"),
            group.num_connections,
            size
        );
    }
    Ok(())
}
