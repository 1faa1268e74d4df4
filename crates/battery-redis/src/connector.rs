//! Redis connection pool management.

use crate::error::{RedisConnectorError, RedisResult};
use crate::options::InstanceSettings;
use bb8::{ErrorSink, RunError};
use bb8_redis::RedisConnectionManager;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Redis connection pool. Cheap to clone; clones share the same connections.
pub type RedisPool = bb8::Pool<RedisConnectionManager>;

/// A connection leased from a [`RedisPool`], returned to the pool on drop.
pub type RedisConnection = bb8::PooledConnection<'static, RedisConnectionManager>;

const REDIS_SCHEME: &str = "redis";

/// Host used when the uri names none, e.g. `redis://` or `redis:///1`.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// How long a lease waits for the pool before giving up.
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Keeps the most recent error the pool hit while opening a connection.
///
/// Connections are opened in the background, so their errors never reach the
/// caller of `get` directly; a lease that times out reports this one instead.
#[derive(Debug, Clone, Default)]
struct LastError(Arc<Mutex<Option<redis::RedisError>>>);

impl LastError {
    fn take(&self) -> Option<redis::RedisError> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

impl ErrorSink<redis::RedisError> for LastError {
    fn sink(&self, error: redis::RedisError) {
        warn!(%error, "redis connection failed");
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(error);
    }

    fn boxed_clone(&self) -> Box<dyn ErrorSink<redis::RedisError>> {
        Box::new(self.clone())
    }
}

/// Owns the connection pool of one named redis instance.
///
/// The pool is created by [`RedisConnector::connect`] and kept for the rest
/// of the connector's life.
#[derive(Debug)]
pub struct RedisConnector {
    name: String,
    connection_timeout: Duration,
    pool: OnceLock<RedisPool>,
    last_error: LastError,
}

impl RedisConnector {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            pool: OnceLock::new(),
            last_error: LastError::default(),
        }
    }

    /// Bound on how long [`RedisConnector::lease`] waits for a connection.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_connected(&self) -> bool {
        self.pool.get().is_some()
    }

    /// The pool handle of this instance.
    pub fn connection(&self) -> RedisResult<RedisPool> {
        self.pool
            .get()
            .cloned()
            .ok_or_else(|| RedisConnectorError::NoConnection(self.name.clone()))
    }

    /// Lease a single connection from the pool.
    ///
    /// A failure to open the connection is reported as the redis error that
    /// caused it, not as a pool timeout.
    pub async fn lease(&self) -> RedisResult<RedisConnection> {
        let pool = self.connection()?;
        match pool.get_owned().await {
            Ok(conn) => {
                debug!(instance = %self.name, "leased redis connection");
                Ok(conn)
            }
            Err(RunError::User(e)) => Err(RedisConnectorError::Redis(e)),
            Err(timed_out) => match self.last_error.take() {
                Some(e) => Err(RedisConnectorError::Redis(e)),
                None => Err(RedisConnectorError::Pool(timed_out)),
            },
        }
    }

    /// Pool statistics, if connected.
    pub fn state(&self) -> Option<bb8::State> {
        self.pool.get().map(|pool| pool.state())
    }

    /// Create the pool described by `settings`.
    ///
    /// Fails without touching the network if the uri is not a `redis://` uri
    /// or the pool size is unusable. A connector that is already connected
    /// rejects the call and keeps its pool. Connection errors are returned
    /// as they are; nothing is retried.
    pub async fn connect(&self, settings: &InstanceSettings) -> RedisResult<()> {
        let uri = settings.uri.as_str();
        let target = resolve_uri(uri)
            .ok_or_else(|| RedisConnectorError::InvalidScheme(uri.to_string()))?;
        let size = settings
            .pool_size()
            .ok_or_else(|| RedisConnectorError::InvalidPoolSize {
                instance: self.name.clone(),
                values: settings.num_connections.clone(),
            })?;
        if self.is_connected() {
            warn!(instance = %self.name, "redis already connected, keeping existing pool");
            return Err(RedisConnectorError::AlreadyConnected(self.name.clone()));
        }

        info!("connecting redis [{}] {}", self.name, uri);
        let manager = RedisConnectionManager::new(target.as_str())?;
        let pool = bb8::Pool::builder()
            .min_idle(Some(size.min))
            .max_size(size.max)
            .retry_connection(false)
            .connection_timeout(self.connection_timeout)
            .error_sink(Box::new(self.last_error.clone()))
            .build(manager)
            .await?;

        // A concurrent connect may have won while the pool was being built.
        self.pool
            .set(pool)
            .map_err(|_| RedisConnectorError::AlreadyConnected(self.name.clone()))
    }
}

/// Parse a `redis://` uri, filling in [`DEFAULT_HOST`] when it names no host.
///
/// Returns `None` for any other scheme or for text that is not a uri.
fn resolve_uri(uri: &str) -> Option<Url> {
    let mut url = Url::parse(uri).ok()?;
    if url.scheme() != REDIS_SCHEME {
        return None;
    }
    if url.host_str().map_or(true, str::is_empty) {
        url.set_host(Some(DEFAULT_HOST)).ok()?;
    }
    Some(url)
}
