//! Scoped connection helpers for async handlers.
//!
//! ```ignore
//! use battery_redis::{with_redis, HandlerArgs, RedisResult};
//! use redis::AsyncCommands;
//!
//! let value: Option<String> = with_redis(&registry, "master", HandlerArgs::new(), |mut args| async move {
//!     let mut redis = args.take_redis().expect("injected");
//!     Ok::<_, battery_redis::RedisConnectorError>(redis.get("key").await?)
//! })
//! .await?;
//! ```

use crate::connector::RedisConnection;
use crate::error::{RedisConnectorError, RedisResult};
use crate::registry::RedisRegistry;
use crate::scope::TaskContext;
use futures::future::BoxFuture;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Argument name under which a leased connection is handed to a handler.
pub const REDIS_ARGUMENT: &str = "redis";

/// Named arguments passed to a handler.
#[derive(Default)]
pub struct HandlerArgs {
    values: HashMap<String, Box<dyn Any + Send>>,
}

impl HandlerArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`HandlerArgs::insert`].
    pub fn with<T: Any + Send>(mut self, name: impl Into<String>, value: T) -> Self {
        self.insert(name, value);
        self
    }

    /// Set `name`, returning `true` if it replaced an earlier value.
    pub fn insert<T: Any + Send>(&mut self, name: impl Into<String>, value: T) -> bool {
        self.values.insert(name.into(), Box::new(value)).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.values.get(name)?.downcast_ref()
    }

    /// Remove `name` if it holds a `T`. A value of another type stays in place.
    pub fn take<T: Any>(&mut self, name: &str) -> Option<T> {
        let value = self.values.remove(name)?;
        match value.downcast::<T>() {
            Ok(value) => Some(*value),
            Err(value) => {
                self.values.insert(name.to_string(), value);
                None
            }
        }
    }

    /// The connection injected by [`with_redis`] or [`with_redis_conn`].
    pub fn take_redis(&mut self) -> Option<RedisConnection> {
        self.take(REDIS_ARGUMENT)
    }
}

impl fmt::Debug for HandlerArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.values.keys().collect();
        names.sort();
        f.debug_struct("HandlerArgs").field("names", &names).finish()
    }
}

/// Run `f` with `name` as the current connection of `ctx`.
pub async fn use_redis<T, E, F>(ctx: &mut TaskContext, name: &str, f: F) -> Result<T, E>
where
    F: for<'c> FnOnce(&'c mut TaskContext) -> BoxFuture<'c, Result<T, E>>,
    E: From<RedisConnectorError>,
{
    let mut scope = ctx.enter(name)?;
    f(&mut *scope).await
}

/// Run `f` with a connection leased from `name` injected as `redis`.
///
/// Fails before leasing if `args` already carries a `redis` argument.
pub async fn with_redis<T, E, F, Fut>(
    registry: &RedisRegistry,
    name: &str,
    mut args: HandlerArgs,
    f: F,
) -> Result<T, E>
where
    F: FnOnce(HandlerArgs) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<RedisConnectorError>,
{
    if args.contains(REDIS_ARGUMENT) {
        return Err(RedisConnectorError::DuplicateArgument(name.to_string()).into());
    }
    let conn = registry.lease(name).await?;
    args.insert(REDIS_ARGUMENT, conn);
    f(args).await
}

/// Like [`with_redis`], leasing from the current connection of `ctx`.
pub async fn with_redis_conn<T, E, F, Fut>(
    ctx: &TaskContext,
    mut args: HandlerArgs,
    f: F,
) -> Result<T, E>
where
    F: FnOnce(HandlerArgs) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<RedisConnectorError>,
{
    if args.contains(REDIS_ARGUMENT) {
        return Err(RedisConnectorError::DuplicateArgumentUnscoped.into());
    }
    let conn = ctx.current()?.lease().await?;
    args.insert(REDIS_ARGUMENT, conn);
    f(args).await
}

/// Startup hook connecting `name`.
pub fn connect_redis(
    registry: Arc<RedisRegistry>,
    name: &str,
) -> impl FnOnce() -> BoxFuture<'static, RedisResult<()>> {
    let name = name.to_string();
    move || Box::pin(async move { registry.connect(&name).await })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OptionRegistry;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn registry() -> Arc<RedisRegistry> {
        let mut options = OptionRegistry::new();
        options.register("master", "redis://127.0.0.1:1/0").unwrap();
        options.register("slave", "redis://127.0.0.1:1/1").unwrap();
        let mut settings = options.defaults();
        settings.set_num_connections("master", &[0, 1]).unwrap();
        settings.set_num_connections("slave", &[0, 1]).unwrap();
        Arc::new(RedisRegistry::new(settings))
    }

    #[test]
    fn test_handler_args() {
        let mut args = HandlerArgs::new().with("user", 42u64);
        assert!(args.contains("user"));
        assert_eq!(args.get::<u64>("user"), Some(&42));
        assert_eq!(args.get::<String>("user"), None);

        assert_eq!(args.take::<String>("user"), None);
        assert!(args.contains("user"));
        assert_eq!(args.take::<u64>("user"), Some(42));
        assert!(!args.contains("user"));

        assert!(!args.insert("name", "a"));
        assert!(args.insert("name", "b"));
        assert!(args.take_redis().is_none());
        assert_eq!(format!("{:?}", args), r#"HandlerArgs { names: ["name"] }"#);
    }

    #[tokio::test]
    async fn test_with_redis_duplicate_argument() {
        let registry = registry();
        registry.connect("master").await.unwrap();
        let called = AtomicBool::new(false);

        let args = HandlerArgs::new().with(REDIS_ARGUMENT, "caller supplied");
        let result: RedisResult<()> = with_redis(&registry, "master", args, |_| async {
            called.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "duplicated database argument for redis master");
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_with_redis_without_connection() {
        let registry = registry();
        let called = AtomicBool::new(false);
        let result: RedisResult<()> =
            with_redis(&registry, "noconn", HandlerArgs::new(), |_| async {
                called.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert_eq!(result.unwrap_err().to_string(), "no connection of noconn found");
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_with_redis_conn_duplicate_argument() {
        let registry = registry();
        registry.connect("master").await.unwrap();
        let mut ctx = TaskContext::new(registry);
        let scope = ctx.enter("master").unwrap();

        let called = AtomicBool::new(false);
        let args = HandlerArgs::new().with(REDIS_ARGUMENT, 1u8);
        let result: RedisResult<()> = with_redis_conn(&scope, args, |_| async {
            called.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "duplicated database argument for redis"
        );
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_with_redis_conn_outside_scope() {
        let ctx = TaskContext::new(registry());
        let called = AtomicBool::new(false);
        let result: RedisResult<()> = with_redis_conn(&ctx, HandlerArgs::new(), |_| async {
            called.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(RedisConnectorError::NoActiveScope)));
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_use_redis_scopes_the_call() {
        let registry = registry();
        registry.connect_all().await.unwrap();
        let mut ctx = TaskContext::new(registry);

        let seen: RedisResult<Vec<String>> = use_redis(&mut ctx, "master", |ctx| {
            async move {
                let mut seen = vec![ctx.current()?.instance().to_string()];
                let inner: RedisResult<String> = use_redis(ctx, "slave", |ctx| {
                    async move {
                        Ok::<_, RedisConnectorError>(ctx.current()?.instance().to_string())
                    }
                    .boxed()
                })
                .await;
                seen.push(inner?);
                seen.push(ctx.current()?.instance().to_string());
                Ok::<_, RedisConnectorError>(seen)
            }
            .boxed()
        })
        .await;

        assert_eq!(seen.unwrap(), vec!["master", "slave", "master"]);
        assert_eq!(ctx.depth(), 0);
    }

    #[tokio::test]
    async fn test_use_redis_pops_on_error() {
        let registry = registry();
        registry.connect("master").await.unwrap();
        let mut ctx = TaskContext::new(registry);

        let result: RedisResult<()> = use_redis(&mut ctx, "master", |ctx| {
            async move {
                ctx.enter("noconn")?;
                Ok::<_, RedisConnectorError>(())
            }
            .boxed()
        })
        .await;

        assert!(matches!(result, Err(RedisConnectorError::NoConnection(_))));
        assert_eq!(ctx.depth(), 0);
    }

    #[tokio::test]
    async fn test_connect_redis_hook() {
        let registry = registry();
        let hook = connect_redis(registry.clone(), "slave");
        assert!(registry.connection("slave").is_err());
        hook().await.unwrap();
        assert!(registry.connection("slave").is_ok());
    }
}
