use crate::{execute, fetch_i64, serial_primary_key};
use std::{future::Future, sync::LazyLock};
use strata::{
    Connection, Entity, Error, Executor, FieldDef, FieldMap, Registry, ResourceModel, Result,
    TableModel, Value,
};
use tokio::sync::Mutex;

/// Requires a name and writes an audit row after every save, a name equal
/// to `panic` makes the after save hook panic.
#[derive(Default, Debug, Clone)]
pub struct Guarded;

static FIELDS: &[FieldDef] = &[
    FieldDef::new("id", Value::Int64(None)),
    FieldDef::new("name", Value::Varchar(None)),
    FieldDef::new("note", Value::Varchar(None)),
];

impl Entity for Guarded {
    fn table_name() -> &'static str {
        "strata_guarded"
    }

    fn fields() -> &'static [FieldDef] {
        FIELDS
    }

    fn primary_key() -> Option<&'static str> {
        Some("id")
    }

    fn before_save<X: Executor>(
        model: &mut ResourceModel<Self>,
        _executor: &mut X,
    ) -> impl Future<Output = Result<()>> + Send {
        let result = if model.get_data("name").is_null() {
            Err(Error::msg("A name is required"))
        } else {
            Ok(())
        };
        async move { result }
    }

    fn after_save<X: Executor>(
        model: &mut ResourceModel<Self>,
        executor: &mut X,
    ) -> impl Future<Output = Result<()>> + Send {
        let name = model.get_data("name").clone();
        async move {
            if name.as_str() == Some("panic") {
                panic!("The after save hook panicked");
            }
            let row = FieldMap::from([("message".to_string(), name)]);
            executor.insert("strata_audit", &row).await?;
            Ok(())
        }
    }

    fn before_delete<X: Executor>(
        model: &mut ResourceModel<Self>,
        _executor: &mut X,
    ) -> impl Future<Output = Result<()>> + Send {
        let result = if model.get_data("note").as_str() == Some("locked") {
            Err(Error::msg("The row is locked"))
        } else {
            Ok(())
        };
        async move { result }
    }
}

pub(crate) async fn create_tables<C: Connection>(registry: &Registry<C>) {
    let pk = serial_primary_key::<C>();
    execute(
        registry,
        "DROP TABLE IF EXISTS strata_guarded;
        DROP TABLE IF EXISTS strata_audit;",
    )
    .await;
    execute(
        registry,
        format!(
            "CREATE TABLE strata_guarded (id {pk}, name VARCHAR(64), note VARCHAR(64));
            CREATE TABLE strata_audit (id {pk}, message VARCHAR(64));"
        ),
    )
    .await;
}

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn hooks<C: Connection>(registry: &Registry<C>) {
    let _lock = MUTEX.lock().await;
    create_tables(registry).await;

    let count = |table: &str| fetch_i64(registry, format!("SELECT COUNT(*) FROM {table}"));

    // Rejected by the before save hook
    let mut rejected = TableModel::new(registry.clone(), Guarded);
    rejected.set_data("note", "no name");
    crate::silent_logs! {
        rejected.save().await;
    }
    let error = format!("{:#}", rejected.last_error().expect("Expected an error"));
    assert!(error.contains("A name is required"), "{error}");
    assert!(error.contains("strata_guarded"), "{error}");
    assert!(rejected.has_data_change());
    assert_eq!(rejected.get::<String>("note").as_deref(), Some("no name"));
    assert!(rejected.get_data("id").is_null());
    assert_eq!(count("strata_guarded").await, 0);

    // Panic in the after save hook rolls back the insert
    let mut panicking = TableModel::new(registry.clone(), Guarded);
    panicking.set_data("name", "panic");
    crate::silent_logs! {
        panicking.save().await;
    }
    let error = format!("{:#}", panicking.last_error().expect("Expected an error"));
    assert!(error.contains("The after save hook panicked"), "{error}");
    assert!(panicking.get_data("id").is_null());
    assert!(panicking.has_data_change());
    assert_eq!(count("strata_guarded").await, 0);
    assert_eq!(count("strata_audit").await, 0);

    // The hooks share the transaction of the save
    let mut saved = TableModel::new(registry.clone(), Guarded);
    saved.set_data("name", "first").set_data("note", "locked");
    saved.save().await;
    assert!(saved.last_error().is_none(), "{:?}", saved.last_error());
    assert_eq!(count("strata_guarded").await, 1);
    assert_eq!(count("strata_audit").await, 1);

    // A successful operation clears the previous error
    rejected.set_data("name", "second");
    rejected.save().await;
    assert!(rejected.last_error().is_none(), "{:?}", rejected.last_error());
    assert_eq!(count("strata_guarded").await, 2);

    // Rejected delete
    crate::silent_logs! {
        saved.delete().await;
    }
    assert!(saved.last_error().is_some());
    assert_eq!(count("strata_guarded").await, 2);
    saved.set_data("note", "unlocked");
    saved.delete().await;
    assert!(saved.last_error().is_none(), "{:?}", saved.last_error());
    assert_eq!(count("strata_guarded").await, 1);
}
