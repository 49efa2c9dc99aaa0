use crate::{
    AsValue, Connection, Entity, Error, Executor, Registry, ResourceModel, Result, Snapshot, Value,
};
use futures::FutureExt;
use std::{panic::AssertUnwindSafe, sync::Arc};
use tokio::sync::Mutex;

/// One entity bound to a named connection and a locale pair.
///
/// Every operation is a unit of work run in its own transaction (a savepoint
/// when the executor already is a transaction). Failures, panics included,
/// roll the unit back, restore the in-memory state and are kept in
/// [`TableModel::last_error`] instead of being returned.
///
/// ```ignore
/// let mut product = TableModel::new(registry.clone(), Product::default())
///     .with_locale("fr", "en");
/// product.set_data("name", "Chaise").set_data("price", 25);
/// if let Some(e) = product.save().await.last_error() {
///     log::error!("{e:#}");
/// }
/// ```
pub struct TableModel<E: Entity, C: Connection> {
    resource: ResourceModel<E>,
    registry: Registry<C>,
    connection: String,
    last_error: Option<Error>,
}

impl<E: Entity, C: Connection> TableModel<E, C> {
    pub fn new(registry: Registry<C>, entity: E) -> Self {
        Self::from_resource(registry, ResourceModel::new(entity))
    }

    pub fn from_resource(registry: Registry<C>, resource: ResourceModel<E>) -> Self {
        Self {
            resource,
            registry,
            connection: "default".into(),
            last_error: None,
        }
    }

    pub fn with_connection(mut self, name: impl Into<String>) -> Self {
        self.connection = name.into();
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>, default_locale: impl Into<String>) -> Self {
        self.resource.set_locale(locale, default_locale);
        self
    }

    pub fn connection_name(&self) -> &str {
        &self.connection
    }

    pub fn locale(&self) -> &str {
        self.resource.locale()
    }

    pub fn default_locale(&self) -> &str {
        self.resource.default_locale()
    }

    pub fn entity(&self) -> &E {
        self.resource.entity()
    }

    pub fn resource(&self) -> &ResourceModel<E> {
        &self.resource
    }

    pub fn resource_mut(&mut self) -> &mut ResourceModel<E> {
        &mut self.resource
    }

    pub fn set_data(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.resource.set_data(field, value);
        self
    }

    pub fn get_data(&self, field: &str) -> &Value {
        self.resource.get_data(field)
    }

    /// Typed value of `field`, `None` when it is NULL or not convertible.
    pub fn get<T: AsValue>(&self, field: &str) -> Option<T> {
        T::try_from_value(self.get_data(field).clone()).ok()
    }

    pub fn has_data_change(&self) -> bool {
        self.resource.has_data_change()
    }

    /// Error captured by the last operation, `None` if it succeeded.
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<Error> {
        self.last_error.take()
    }

    fn acquire(&mut self) -> Option<Arc<Mutex<C>>> {
        match self.registry.get(&self.connection) {
            Ok(connection) => Some(connection),
            Err(e) => {
                log::error!("{:#}", e);
                self.last_error = Some(e);
                None
            }
        }
    }

    fn finish(&mut self, result: Result<()>, snapshot: Snapshot, action: &str) -> &mut Self {
        match result {
            Ok(()) => self.last_error = None,
            Err(e) => {
                self.resource.restore(snapshot);
                let e = e.context(format!("While trying to {action} `{}`", E::table_name()));
                log::error!("{:#}", e);
                self.last_error = Some(e);
            }
        }
        self
    }

    pub async fn save(&mut self) -> &mut Self {
        if let Some(connection) = self.acquire() {
            let mut connection = connection.lock().await;
            self.save_with(&mut *connection).await;
        }
        self
    }

    pub async fn delete(&mut self) -> &mut Self {
        if let Some(connection) = self.acquire() {
            let mut connection = connection.lock().await;
            self.delete_with(&mut *connection).await;
        }
        self
    }

    pub async fn load_by_field(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        if let Some(connection) = self.acquire() {
            let mut connection = connection.lock().await;
            self.load_by_field_with(&mut *connection, field, value).await;
        }
        self
    }

    pub async fn load_by_id(&mut self, id: impl Into<Value>) -> &mut Self {
        let id = id.into();
        match E::primary_key() {
            Some(pk) => self.load_by_field(pk, id).await,
            None => {
                let result = Err(Error::msg("The entity has no primary key"));
                let snapshot = self.resource.snapshot();
                self.finish(result, snapshot, "load by id")
            }
        }
    }

    /// Saves on `executor`: before save hook, save, after save hook.
    pub async fn save_with<X: Executor>(&mut self, executor: &mut X) -> &mut Self {
        let snapshot = self.resource.snapshot();
        let resource = &mut self.resource;
        let result = async {
            let mut tx = executor.begin().await?;
            let outcome = AssertUnwindSafe(async {
                E::before_save(resource, &mut tx).await?;
                resource.save(&mut tx).await?;
                E::after_save(resource, &mut tx).await
            })
            .catch_unwind()
            .await;
            tx.settle(outcome).await
        }
        .await;
        self.finish(result, snapshot, "save")
    }

    /// Deletes on `executor`: before delete hook, delete, after delete hook.
    pub async fn delete_with<X: Executor>(&mut self, executor: &mut X) -> &mut Self {
        let snapshot = self.resource.snapshot();
        let resource = &mut self.resource;
        let result = async {
            let mut tx = executor.begin().await?;
            let outcome = AssertUnwindSafe(async {
                E::before_delete(resource, &mut tx).await?;
                resource.delete(&mut tx).await?;
                E::after_delete(resource, &mut tx).await
            })
            .catch_unwind()
            .await;
            tx.settle(outcome).await
        }
        .await;
        self.finish(result, snapshot, "delete")
    }

    /// Loads on `executor`, the after load hook runs when a row is found.
    pub async fn load_by_field_with<X: Executor>(
        &mut self,
        executor: &mut X,
        field: &str,
        value: impl Into<Value>,
    ) -> &mut Self {
        let value = value.into();
        let snapshot = self.resource.snapshot();
        let resource = &mut self.resource;
        let result = async {
            let mut tx = executor.begin().await?;
            let outcome = AssertUnwindSafe(async {
                if resource.load_by_field(&mut tx, field, value).await? {
                    E::after_load(resource, &mut tx).await?;
                }
                Ok::<_, Error>(())
            })
            .catch_unwind()
            .await;
            tx.settle(outcome).await
        }
        .await;
        self.finish(result, snapshot, "load")
    }
}
