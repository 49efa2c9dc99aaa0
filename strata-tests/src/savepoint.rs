use crate::{
    fetch_i64,
    hooks::{Guarded, create_tables},
};
use std::sync::LazyLock;
use strata::{Connection, Executor, Registry, TableModel};
use tokio::sync::Mutex;

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn savepoint<C: Connection>(registry: &Registry<C>) {
    let _lock = MUTEX.lock().await;
    create_tables(registry).await;

    let mut outer = TableModel::new(registry.clone(), Guarded);
    outer.set_data("name", "outer");
    let mut inner = TableModel::new(registry.clone(), Guarded);
    inner.set_data("note", "no name");
    {
        let connection = registry
            .get("default")
            .expect("The default connection is not registered");
        let mut connection = connection.lock().await;
        let mut transaction = connection
            .begin()
            .await
            .expect("Could not begin a transaction");
        assert_eq!(transaction.depth(), 1);
        outer.save_with(&mut transaction).await;
        assert!(outer.last_error().is_none(), "{:?}", outer.last_error());
        crate::silent_logs! {
            inner.save_with(&mut transaction).await;
        }
        assert!(inner.last_error().is_some());
        transaction
            .commit()
            .await
            .expect("Could not commit the transaction");
    }
    assert_eq!(
        fetch_i64(
            registry,
            "SELECT COUNT(*) FROM strata_guarded WHERE name = 'outer'"
        )
        .await,
        1
    );
    assert_eq!(fetch_i64(registry, "SELECT COUNT(*) FROM strata_guarded").await, 1);
    assert_eq!(fetch_i64(registry, "SELECT COUNT(*) FROM strata_audit").await, 1);

    // Rolling back the outer transaction discards the inner units
    let mut discarded = TableModel::new(registry.clone(), Guarded);
    discarded.set_data("name", "discarded");
    {
        let connection = registry
            .get("default")
            .expect("The default connection is not registered");
        let mut connection = connection.lock().await;
        let mut transaction = connection
            .begin()
            .await
            .expect("Could not begin a transaction");
        discarded.save_with(&mut transaction).await;
        assert!(discarded.last_error().is_none());
        transaction
            .rollback()
            .await
            .expect("Could not rollback the transaction");
    }
    assert_eq!(fetch_i64(registry, "SELECT COUNT(*) FROM strata_guarded").await, 1);
    assert_eq!(fetch_i64(registry, "SELECT COUNT(*) FROM strata_audit").await, 1);
}
