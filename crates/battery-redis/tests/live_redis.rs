//! Round trips against a running redis server.
//!
//! Run with `REDIS_URL=redis://127.0.0.1:6379/0 cargo test -- --ignored`.

use battery_redis::{
    with_redis, with_redis_conn, HandlerArgs, OptionRegistry, RedisConnectorError,
    RedisRegistry, RedisResult, TaskContext,
};
use redis::AsyncCommands;
use std::sync::Arc;

async fn connected() -> Arc<RedisRegistry> {
    let url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/0".to_string());
    let mut options = OptionRegistry::new();
    options.register("test", &url).unwrap();
    let registry = Arc::new(RedisRegistry::new(options.defaults()));
    registry.connect("test").await.unwrap();
    registry
}

#[tokio::test]
#[ignore = "requires a running redis server"]
async fn test_set_then_get() {
    let registry = connected().await;

    let mut conn = registry.lease("test").await.unwrap();
    let _: () = conn.set("hlredis_decorator_value", "1986").await.unwrap();
    let value: String = conn.get("hlredis_decorator_value").await.unwrap();
    assert_eq!(value, "1986");
}

#[tokio::test]
#[ignore = "requires a running redis server"]
async fn test_with_redis_injects_connection() {
    let registry = connected().await;

    let value: RedisResult<Option<String>> =
        with_redis(&registry, "test", HandlerArgs::new(), |mut args| async move {
            let mut redis = args
                .take_redis()
                .ok_or(RedisConnectorError::NoConnection("test".into()))?;
            let _: () = redis.set("battery_with_redis", "1986").await?;
            let value: Option<String> = redis.get("battery_with_redis").await?;
            Ok::<_, RedisConnectorError>(value)
        })
        .await;
    assert_eq!(value.unwrap().as_deref(), Some("1986"));
}

#[tokio::test]
#[ignore = "requires a running redis server"]
async fn test_with_redis_conn_uses_current_scope() {
    let registry = connected().await;
    let mut ctx = TaskContext::new(registry);
    let scope = ctx.enter("test").unwrap();

    let pong: RedisResult<String> =
        with_redis_conn(&scope, HandlerArgs::new(), |mut args| async move {
            let mut redis = args
                .take_redis()
                .ok_or(RedisConnectorError::NoActiveScope)?;
            let pong: String = redis::cmd("PING").query_async(&mut *redis).await?;
            Ok::<_, RedisConnectorError>(pong)
        })
        .await;
    assert_eq!(pong.unwrap(), "PONG");
}
