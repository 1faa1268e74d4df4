//! Task-scoped connection stack.
//!
//! Each task (request, job, ...) owns a [`TaskContext`] and passes it down the
//! call chain. Entering a scope pushes the pool of a named instance; the
//! returned [`ScopeGuard`] pops it again when dropped, so nested scopes
//! unwind in LIFO order whether the body returns, fails, panics or is
//! cancelled.

use crate::connector::{RedisConnection, RedisConnector, RedisPool};
use crate::error::{RedisConnectorError, RedisResult};
use crate::registry::RedisRegistry;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::debug;

/// The pool pushed by one active scope.
#[derive(Debug, Clone)]
pub struct ActiveConnection {
    connector: Arc<RedisConnector>,
    pool: RedisPool,
}

impl ActiveConnection {
    pub fn instance(&self) -> &str {
        self.connector.name()
    }

    pub fn pool(&self) -> &RedisPool {
        &self.pool
    }

    /// Lease a connection from the active pool.
    pub async fn lease(&self) -> RedisResult<RedisConnection> {
        self.connector.lease().await
    }
}

/// Per-task connection stack.
#[derive(Debug)]
pub struct TaskContext {
    registry: Arc<RedisRegistry>,
    stack: Vec<ActiveConnection>,
}

impl TaskContext {
    pub fn new(registry: Arc<RedisRegistry>) -> Self {
        Self {
            registry,
            stack: Vec::new(),
        }
    }

    pub fn registry(&self) -> &Arc<RedisRegistry> {
        &self.registry
    }

    /// Number of active scopes.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Make `name` the current connection until the guard is dropped.
    ///
    /// Fails with [`RedisConnectorError::NoConnection`] if `name` is not
    /// connected; nothing is pushed in that case.
    pub fn enter(&mut self, name: &str) -> RedisResult<ScopeGuard<'_>> {
        let connector = self.registry.instance(name);
        let pool = connector.connection()?;
        self.stack.push(ActiveConnection { connector, pool });
        debug!(instance = name, depth = self.stack.len(), "entered redis scope");
        Ok(ScopeGuard { ctx: self })
    }

    /// The innermost active connection.
    pub fn current(&self) -> RedisResult<&ActiveConnection> {
        self.stack.last().ok_or(RedisConnectorError::NoActiveScope)
    }
}

/// Keeps one scope of a [`TaskContext`] active.
///
/// Derefs to the context, so nested scopes and [`TaskContext::current`] are
/// reached through the guard.
#[derive(Debug)]
pub struct ScopeGuard<'a> {
    ctx: &'a mut TaskContext,
}

impl Deref for ScopeGuard<'_> {
    type Target = TaskContext;

    fn deref(&self) -> &TaskContext {
        &*self.ctx
    }
}

impl DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut TaskContext {
        &mut *self.ctx
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        if let Some(active) = self.ctx.stack.pop() {
            debug!(
                instance = active.instance(),
                depth = self.ctx.stack.len(),
                "left redis scope"
            );
        }
    }
}
