//! Redis option declarations.
//!
//! Every redis instance ("master", "slave", ...) gets two options in its own
//! group: a connection uri and the min/max size of its connection pool.
//! Options are contributed to a `clap::Command`, so they can be given on the
//! command line or through the environment:
//!
//! ```text
//! --redis-master-uri redis://127.0.0.1:6379/0     REDIS_MASTER_URI
//! --redis-master-num-connections 1,4              REDIS_MASTER_NUM_CONNECTIONS
//! ```

use crate::error::OptionsError;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::collections::BTreeMap;

/// Instance name used when the caller does not pick one.
pub const DEFAULT_INSTANCE: &str = "master";

/// Default connection uri of a registered instance.
pub const DEFAULT_URI: &str = "redis://";

/// Default `[min, max]` pool size of a registered instance.
pub const DEFAULT_NUM_CONNECTIONS: [u32; 2] = [1, 2];

/// Full option name for `option` of `instance`, e.g. `redis-master-uri`.
pub fn option_name(instance: &str, option: &str) -> String {
    format!("redis-{}-{}", instance, option)
}

/// Name of the option group holding the options of `instance`.
pub fn group_name(instance: &str) -> String {
    format!("{} redis", instance)
}

/// Environment variable backing `option` of `instance`, e.g. `REDIS_MASTER_URI`.
pub fn env_name(instance: &str, option: &str) -> String {
    option_name(instance, option)
        .to_uppercase()
        .replace('-', "_")
}

/// Declared redis options, keyed by instance name.
#[derive(Debug, Clone, Default)]
pub struct OptionRegistry {
    declared: BTreeMap<String, String>,
}

impl OptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the `uri` and `num-connections` options for `instance`.
    ///
    /// Declaring the same instance twice is rejected.
    pub fn register(&mut self, instance: &str, default_uri: &str) -> Result<(), OptionsError> {
        if self.declared.contains_key(instance) {
            return Err(OptionsError::AlreadyRegistered(instance.to_string()));
        }
        self.declared
            .insert(instance.to_string(), default_uri.to_string());
        Ok(())
    }

    /// Registered instance names, sorted.
    pub fn instances(&self) -> impl Iterator<Item = &str> {
        self.declared.keys().map(String::as_str)
    }

    pub fn is_registered(&self, instance: &str) -> bool {
        self.declared.contains_key(instance)
    }

    /// Add one flag per declared option to `cmd`.
    pub fn augment(&self, mut cmd: Command) -> Command {
        for (instance, default_uri) in &self.declared {
            let uri = option_name(instance, "uri");
            let num = option_name(instance, "num-connections");
            cmd = cmd
                .arg(
                    Arg::new(uri.clone())
                        .long(uri)
                        .env(env_name(instance, "uri"))
                        .value_name("URI")
                        .default_value(default_uri.clone())
                        .help(format!("redis connection uri for {}", instance))
                        .help_heading(group_name(instance)),
                )
                .arg(
                    Arg::new(num.clone())
                        .long(num)
                        .env(env_name(instance, "num-connections"))
                        .value_name("N")
                        .num_args(1..)
                        .value_delimiter(',')
                        .action(ArgAction::Set)
                        .value_parser(value_parser!(u32))
                        .default_values(DEFAULT_NUM_CONNECTIONS.map(|n| n.to_string()))
                        .help(format!("# of redis connections for {}", instance))
                        .help_heading(group_name(instance)),
                );
        }
        cmd
    }

    /// Settings holding the declared defaults, without parsing anything.
    pub fn defaults(&self) -> Settings {
        let groups = self
            .declared
            .iter()
            .map(|(instance, default_uri)| {
                (
                    instance.clone(),
                    InstanceSettings {
                        uri: default_uri.clone(),
                        num_connections: DEFAULT_NUM_CONNECTIONS.to_vec(),
                    },
                )
            })
            .collect();
        Settings { groups }
    }

    /// Read the declared options out of matches produced by an augmented command.
    pub fn settings_from(&self, matches: &ArgMatches) -> Result<Settings, OptionsError> {
        let mut settings = self.defaults();
        for (instance, group) in settings.groups.iter_mut() {
            let uri = option_name(instance, "uri");
            if let Some(value) = matches
                .try_get_one::<String>(&uri)
                .map_err(|e| invalid(&uri, e))?
            {
                group.uri = value.clone();
            }

            let num = option_name(instance, "num-connections");
            if let Some(values) = matches
                .try_get_many::<u32>(&num)
                .map_err(|e| invalid(&num, e))?
            {
                group.num_connections = values.copied().collect();
            }
        }
        Ok(settings)
    }
}

fn invalid(option: &str, err: impl std::fmt::Display) -> OptionsError {
    OptionsError::InvalidValue {
        option: option.to_string(),
        reason: err.to_string(),
    }
}

/// Lower and upper bound of open connections in a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSize {
    pub min: u32,
    pub max: u32,
}

/// Parsed options of one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceSettings {
    pub uri: String,
    pub num_connections: Vec<u32>,
}

impl InstanceSettings {
    /// Smallest and largest configured value, or `None` if no pool can be
    /// built from them.
    pub fn pool_size(&self) -> Option<PoolSize> {
        let min = *self.num_connections.iter().min()?;
        let max = *self.num_connections.iter().max()?;
        if max == 0 {
            return None;
        }
        Some(PoolSize { min, max })
    }
}

/// Parsed redis options for all registered instances.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    groups: BTreeMap<String, InstanceSettings>,
}

impl Settings {
    /// Options of the group belonging to `instance`.
    pub fn group(&self, instance: &str) -> Option<&InstanceSettings> {
        self.groups.get(instance)
    }

    pub fn instances(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn set_uri(&mut self, instance: &str, uri: &str) -> Result<(), OptionsError> {
        self.group_mut(instance)?.uri = uri.to_string();
        Ok(())
    }

    pub fn set_num_connections(
        &mut self,
        instance: &str,
        values: &[u32],
    ) -> Result<(), OptionsError> {
        self.group_mut(instance)?.num_connections = values.to_vec();
        Ok(())
    }

    fn group_mut(&mut self, instance: &str) -> Result<&mut InstanceSettings, OptionsError> {
        self.groups
            .get_mut(instance)
            .ok_or_else(|| OptionsError::NotRegistered(instance.to_string()))
    }
}
