//! Named connector registry.

use crate::connector::{RedisConnection, RedisConnector, RedisPool};
use crate::error::{RedisConnectorError, RedisResult};
use crate::options::Settings;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// One [`RedisConnector`] per instance name, created on first request.
///
/// Built once at startup from the parsed [`Settings`] and shared as
/// `Arc<RedisRegistry>` with everything that needs redis access.
#[derive(Debug, Default)]
pub struct RedisRegistry {
    settings: Settings,
    connectors: RwLock<HashMap<String, Arc<RedisConnector>>>,
}

impl RedisRegistry {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            connectors: RwLock::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The connector for `name`, created if this is the first request for it.
    pub fn instance(&self, name: &str) -> Arc<RedisConnector> {
        let existing = self
            .connectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();
        if let Some(connector) = existing {
            return connector;
        }

        let mut connectors = self
            .connectors
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        connectors
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(RedisConnector::new(name)))
            .clone()
    }

    /// Add a connector built by the caller, e.g. with a custom lease timeout.
    ///
    /// Returns `false` and keeps the existing one if `name` already has a
    /// connector.
    pub fn insert(&self, connector: RedisConnector) -> bool {
        let mut connectors = self
            .connectors
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if connectors.contains_key(connector.name()) {
            return false;
        }
        connectors.insert(connector.name().to_string(), Arc::new(connector));
        true
    }

    /// Names of the connectors created so far, sorted.
    pub fn instances(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .connectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Connect `name` using the options registered for it.
    pub async fn connect(&self, name: &str) -> RedisResult<()> {
        let group = self
            .settings
            .group(name)
            .ok_or_else(|| RedisConnectorError::UnknownInstance(name.to_string()))?;
        self.instance(name).connect(group).await
    }

    /// Connect every registered instance, in name order.
    pub async fn connect_all(&self) -> RedisResult<()> {
        for name in self.settings.instances() {
            self.connect(name).await?;
        }
        Ok(())
    }

    pub fn connection(&self, name: &str) -> RedisResult<RedisPool> {
        self.instance(name).connection()
    }

    pub async fn lease(&self, name: &str) -> RedisResult<RedisConnection> {
        self.instance(name).lease().await
    }
}
