//! Error types for redis connector access.

use thiserror::Error;

/// Errors raised while declaring or parsing redis options.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptionsError {
    #[error("redis options for {0} are already registered")]
    AlreadyRegistered(String),

    #[error("no redis options registered for {0}")]
    NotRegistered(String),

    #[error("invalid value for {option}: {reason}")]
    InvalidValue { option: String, reason: String },
}

/// Redis connector error types.
#[derive(Error, Debug)]
pub enum RedisConnectorError {
    /// `connection()` was called before `connect()` succeeded.
    #[error("no connection of {0} found")]
    NoConnection(String),

    #[error("{0} is not a redis connection scheme")]
    InvalidScheme(String),

    #[error("invalid pool size for redis {instance}: {values:?}")]
    InvalidPoolSize { instance: String, values: Vec<u32> },

    #[error("redis {0} is already connected")]
    AlreadyConnected(String),

    #[error("no redis options registered for {0}")]
    UnknownInstance(String),

    /// `current()` was called outside of any connection scope.
    #[error("no redis manager is in use")]
    NoActiveScope,

    #[error("duplicated database argument for redis {0}")]
    DuplicateArgument(String),

    #[error("duplicated database argument for redis")]
    DuplicateArgumentUnscoped,

    #[error(transparent)]
    Redis(#[from] redis::RedisError),

    #[error(transparent)]
    Pool(#[from] bb8::RunError<redis::RedisError>),

    #[error(transparent)]
    Options(#[from] OptionsError),
}

/// Result type for connector operations.
pub type RedisResult<T> = Result<T, RedisConnectorError>;
