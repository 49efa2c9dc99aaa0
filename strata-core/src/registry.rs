use crate::{Connection, Context, Error, Result};
use std::{
    borrow::Cow,
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};
use tokio::sync::Mutex;

/// Named connections shared by models and collections.
///
/// Cloning is cheap, clones share the same set. Each connection is behind
/// an async mutex so concurrent users take turns on it.
pub struct Registry<C: Connection> {
    connections: Arc<RwLock<HashMap<String, Arc<Mutex<C>>>>>,
}

impl<C: Connection> Clone for Registry<C> {
    fn clone(&self) -> Self {
        Self {
            connections: self.connections.clone(),
        }
    }
}

impl<C: Connection> Default for Registry<C> {
    fn default() -> Self {
        Self {
            connections: Default::default(),
        }
    }
}

impl<C: Connection> Registry<C> {
    pub fn new() -> Self {
        Default::default()
    }

    /// Registers `connection` under `name`, replacing any previous one.
    pub fn add(&self, name: impl Into<String>, connection: C) -> &Self {
        self.connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), Arc::new(Mutex::new(connection)));
        self
    }

    pub fn get(&self, name: &str) -> Result<Arc<Mutex<C>>> {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| Error::msg(format!("No connection named `{name}` is registered")))
    }

    pub fn remove(&self, name: &str) -> Option<Arc<Mutex<C>>> {
        self.connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Opens a connection to `url` and registers it under `name`.
    pub async fn connect(&self, name: impl Into<String>, url: impl Into<Cow<'static, str>>) -> Result<()> {
        let name = name.into();
        let url = url.into();
        let connection = C::connect(url.clone())
            .await
            .with_context(|| format!("While connecting `{name}` to {url}"))?;
        self.add(name, connection);
        Ok(())
    }
}
