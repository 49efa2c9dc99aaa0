use crate::{execute, fetch_i64};
use std::sync::LazyLock;
use strata::{Connection, Entity, FieldDef, Registry, TableModel, Value};
use tokio::sync::Mutex;

/// Keyed by a code chosen by the caller.
#[derive(Default, Debug, Clone)]
pub struct Coupon {
    pub code: Option<String>,
    pub label: Option<String>,
}

static FIELDS: &[FieldDef] = &[
    FieldDef::new("code", Value::Varchar(None)),
    FieldDef::new("label", Value::Varchar(None)),
    FieldDef::new("discount", Value::Int32(None)),
];

impl Entity for Coupon {
    fn table_name() -> &'static str {
        "strata_coupon"
    }

    fn fields() -> &'static [FieldDef] {
        FIELDS
    }

    fn primary_key() -> Option<&'static str> {
        Some("code")
    }

    fn bind_field(&mut self, field: &str, value: &Value) {
        match field {
            "code" => self.code = value.as_str().map(Into::into),
            "label" => self.label = value.as_str().map(Into::into),
            _ => {}
        }
    }
}

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn coupon<C: Connection>(registry: &Registry<C>) {
    let _lock = MUTEX.lock().await;
    execute(registry, "DROP TABLE IF EXISTS strata_coupon;").await;
    execute(
        registry,
        "CREATE TABLE strata_coupon (
            code VARCHAR(32) PRIMARY KEY,
            label VARCHAR(128),
            discount INTEGER
        );",
    )
    .await;

    let count = |code: &'static str| {
        fetch_i64(
            registry,
            format!("SELECT COUNT(*) FROM strata_coupon WHERE code = '{code}'"),
        )
    };

    // The key set by the caller is inserted as it is
    let mut welcome = TableModel::new(registry.clone(), Coupon::default());
    welcome
        .set_data("code", "WELCOME10")
        .set_data("label", "Welcome")
        .set_data("discount", 10);
    welcome.save().await;
    assert!(welcome.last_error().is_none(), "{:?}", welcome.last_error());
    assert_eq!(welcome.get::<String>("code").as_deref(), Some("WELCOME10"));
    assert_eq!(welcome.entity().code.as_deref(), Some("WELCOME10"));
    assert!(!welcome.has_data_change());
    assert_eq!(count("WELCOME10").await, 1);
    assert_eq!(
        fetch_i64(registry, "SELECT COUNT(*) FROM strata_coupon").await,
        1
    );

    // Saved again it is an update of the same row
    welcome.set_data("discount", 15);
    welcome.save().await;
    assert!(welcome.last_error().is_none(), "{:?}", welcome.last_error());
    assert_eq!(count("WELCOME10").await, 1);
    assert_eq!(
        fetch_i64(
            registry,
            "SELECT discount FROM strata_coupon WHERE code = 'WELCOME10'"
        )
        .await,
        15
    );

    // Loaded by its code
    let mut loaded = TableModel::new(registry.clone(), Coupon::default());
    loaded.load_by_id("WELCOME10").await;
    assert!(loaded.last_error().is_none(), "{:?}", loaded.last_error());
    assert_eq!(loaded.entity().label.as_deref(), Some("Welcome"));
    assert_eq!(loaded.get::<i32>("discount"), Some(15));
    loaded.set_data("label", "Welcome back");
    loaded.save().await;
    assert!(loaded.last_error().is_none(), "{:?}", loaded.last_error());
    assert_eq!(loaded.get::<String>("code").as_deref(), Some("WELCOME10"));

    // A second caller keyed coupon
    let mut summer = TableModel::new(registry.clone(), Coupon::default());
    summer
        .set_data("code", "SUMMER")
        .set_data("label", "Summer sale")
        .set_data("discount", 20);
    summer.save().await;
    assert!(summer.last_error().is_none(), "{:?}", summer.last_error());
    assert_eq!(count("SUMMER").await, 1);
    assert_eq!(
        fetch_i64(registry, "SELECT COUNT(*) FROM strata_coupon").await,
        2
    );

    // Delete by code
    summer.delete().await;
    assert!(summer.last_error().is_none(), "{:?}", summer.last_error());
    assert_eq!(count("SUMMER").await, 0);
    assert_eq!(count("WELCOME10").await, 1);
}
