//! Battery Redis Access Layer
//!
//! Declares per-instance redis options, owns one lazily created connection
//! pool per instance name, and lends connections to async handlers for the
//! duration of a call.
//!
//! Startup sequence:
//!
//! 1. `OptionRegistry::register` each instance, then `augment` the command line.
//! 2. Parse, turn the matches into [`Settings`] and build a [`RedisRegistry`].
//! 3. `connect` every instance before handlers run.
//! 4. Handlers borrow connections through [`TaskContext`] scopes or the
//!    [`with_redis`] family of helpers.

pub mod connector;
pub mod error;
pub mod handler;
pub mod options;
pub mod registry;
pub mod scope;

pub use connector::{RedisConnection, RedisConnector, RedisPool};
pub use error::{OptionsError, RedisConnectorError, RedisResult};
pub use handler::{
    connect_redis, use_redis, with_redis, with_redis_conn, HandlerArgs, REDIS_ARGUMENT,
};
pub use options::{
    option_name, InstanceSettings, OptionRegistry, PoolSize, Settings, DEFAULT_INSTANCE,
    DEFAULT_URI,
};
pub use registry::RedisRegistry;
pub use scope::{ActiveConnection, ScopeGuard, TaskContext};
