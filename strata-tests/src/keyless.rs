use crate::{execute, fetch_i64};
use std::sync::LazyLock;
use strata::{Connection, Entity, FieldDef, Registry, TableModel, Value};
use tokio::sync::Mutex;

/// Identified by its delete fields only.
#[derive(Default, Debug, Clone)]
pub struct Rating;

static FIELDS: &[FieldDef] = &[
    FieldDef::new("user_id", Value::Int64(None)),
    FieldDef::new("product_id", Value::Int64(None)),
    FieldDef::new("score", Value::Int32(None)),
];

impl Entity for Rating {
    fn table_name() -> &'static str {
        "strata_rating"
    }

    fn fields() -> &'static [FieldDef] {
        FIELDS
    }

    fn primary_key() -> Option<&'static str> {
        None
    }

    fn delete_fields() -> &'static [&'static str] {
        &["user_id", "product_id"]
    }
}

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn keyless<C: Connection>(registry: &Registry<C>) {
    let _lock = MUTEX.lock().await;
    execute(registry, "DROP TABLE IF EXISTS strata_rating;").await;
    execute(
        registry,
        "CREATE TABLE strata_rating (
            user_id BIGINT NOT NULL,
            product_id BIGINT NOT NULL,
            score INTEGER,
            UNIQUE (user_id, product_id)
        );",
    )
    .await;

    let score = |user: i64, product: i64| {
        fetch_i64(
            registry,
            format!(
                "SELECT score FROM strata_rating WHERE user_id = {user} AND product_id = {product}"
            ),
        )
    };

    let mut rating = TableModel::new(registry.clone(), Rating);
    rating
        .set_data("user_id", 1)
        .set_data("product_id", 10)
        .set_data("score", 3);
    rating.save().await;
    assert!(rating.last_error().is_none(), "{:?}", rating.last_error());
    assert_eq!(score(1, 10).await, 3);

    // Same natural key updates the row
    let mut again = TableModel::new(registry.clone(), Rating);
    again
        .set_data("user_id", 1)
        .set_data("product_id", 10)
        .set_data("score", 5);
    again.save().await;
    assert!(again.last_error().is_none(), "{:?}", again.last_error());
    assert_eq!(
        fetch_i64(registry, "SELECT COUNT(*) FROM strata_rating").await,
        1
    );
    assert_eq!(score(1, 10).await, 5);

    let mut other = TableModel::new(registry.clone(), Rating);
    other
        .set_data("user_id", 2)
        .set_data("product_id", 10)
        .set_data("score", 1);
    other.save().await;
    assert_eq!(
        fetch_i64(registry, "SELECT COUNT(*) FROM strata_rating").await,
        2
    );

    // Delete matches the delete fields only
    rating.delete().await;
    assert!(rating.last_error().is_none(), "{:?}", rating.last_error());
    assert_eq!(
        fetch_i64(registry, "SELECT COUNT(*) FROM strata_rating").await,
        1
    );
    assert_eq!(score(2, 10).await, 1);

    // Loading by id needs a primary key
    let mut unknown = TableModel::new(registry.clone(), Rating);
    crate::silent_logs! {
        unknown.load_by_id(1).await;
    }
    assert!(unknown.last_error().is_some());
}
