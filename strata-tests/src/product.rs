use crate::{execute, fetch_i64, serial_primary_key};
use std::sync::LazyLock;
use strata::{Connection, Entity, FieldDef, Registry, TableModel, Value};
use time::PrimitiveDateTime;
use tokio::sync::Mutex;

#[derive(Default, Debug, Clone)]
pub struct Product {
    pub id: Option<i64>,
    pub sku: String,
    pub price: f64,
    pub name: Option<String>,
}

static FIELDS: &[FieldDef] = &[
    FieldDef::new("id", Value::Int64(None)),
    FieldDef::new("sku", Value::Varchar(None)),
    FieldDef::new("price", Value::Float64(None)),
    FieldDef::new("name", Value::Varchar(None)).eav("varchar"),
    FieldDef::new("description", Value::Varchar(None)).eav("text"),
    FieldDef::new("created_at", Value::Timestamp(None)).auto_create(),
    FieldDef::new("updated_at", Value::Timestamp(None)).auto_update(),
];

impl Entity for Product {
    fn table_name() -> &'static str {
        "strata_product"
    }

    fn fields() -> &'static [FieldDef] {
        FIELDS
    }

    fn primary_key() -> Option<&'static str> {
        Some("id")
    }

    fn bind_field(&mut self, field: &str, value: &Value) {
        match field {
            "id" => self.id = value.as_i64(),
            "sku" => self.sku = value.as_str().unwrap_or_default().into(),
            "price" => self.price = value.as_f64().unwrap_or_default(),
            "name" => self.name = value.as_str().map(Into::into),
            _ => {}
        }
    }
}

pub(crate) async fn create_tables<C: Connection>(registry: &Registry<C>) {
    let pk = serial_primary_key::<C>();
    execute(
        registry,
        "DROP TABLE IF EXISTS strata_product_varchar;
        DROP TABLE IF EXISTS strata_product_text;
        DROP TABLE IF EXISTS strata_product;",
    )
    .await;
    execute(
        registry,
        format!(
            "CREATE TABLE strata_product (
                id {pk},
                sku VARCHAR(64),
                price DOUBLE PRECISION,
                created_at TIMESTAMP,
                updated_at TIMESTAMP
            );"
        ),
    )
    .await;
    for eav in ["varchar", "text"] {
        execute(
            registry,
            format!(
                "CREATE TABLE strata_product_{eav} (
                    entity_id BIGINT NOT NULL,
                    locale VARCHAR(16) NOT NULL,
                    attribute_name VARCHAR(64) NOT NULL,
                    value TEXT,
                    UNIQUE (entity_id, locale, attribute_name)
                );"
            ),
        )
        .await;
    }
}

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn product<C: Connection>(registry: &Registry<C>) {
    let _lock = MUTEX.lock().await;
    create_tables(registry).await;

    // Insert
    let mut chair = TableModel::new(registry.clone(), Product::default()).with_locale("en", "en");
    assert!(!chair.has_data_change());
    chair
        .set_data("SKU", "chair-1")
        .set_data("price", 25)
        .set_data("name", "Chair")
        .set_data("description", "A wooden chair");
    assert!(chair.has_data_change());
    assert_eq!(chair.entity().sku, "chair-1");
    assert_eq!(chair.entity().price, 25.0);
    chair.save().await;
    assert!(chair.last_error().is_none(), "{:?}", chair.last_error());
    assert!(!chair.has_data_change());
    let id = chair.get::<i64>("id").expect("The id was not assigned");
    assert!(id > 0);
    assert_eq!(chair.entity().id, Some(id));
    assert!(chair.get::<PrimitiveDateTime>("created_at").is_some());
    assert_eq!(
        fetch_i64(
            registry,
            format!("SELECT COUNT(*) FROM strata_product_varchar WHERE entity_id = {id}")
        )
        .await,
        1
    );

    // Load falls back to the default locale
    let mut chaise = TableModel::new(registry.clone(), Product::default()).with_locale("fr", "en");
    chaise.load_by_id(id).await;
    assert!(chaise.last_error().is_none(), "{:?}", chaise.last_error());
    assert!(!chaise.has_data_change());
    assert_eq!(chaise.get::<String>("name").as_deref(), Some("Chair"));
    assert_eq!(chaise.entity().name.as_deref(), Some("Chair"));
    assert_eq!(chaise.get::<f64>("price"), Some(25.0));
    assert_eq!(
        chaise.get::<PrimitiveDateTime>("created_at"),
        chair.get::<PrimitiveDateTime>("created_at")
    );

    // Loading twice gives the same clean state
    let data = chaise.resource().data().clone();
    chaise.load_by_id(id).await;
    assert_eq!(chaise.resource().data(), &data);
    assert!(!chaise.has_data_change());

    // Saving a clean model writes nothing
    execute(
        registry,
        format!("UPDATE strata_product SET sku = 'changed-elsewhere' WHERE id = {id}"),
    )
    .await;
    chaise.save().await;
    assert!(chaise.last_error().is_none());
    let mut reloaded = TableModel::new(registry.clone(), Product::default());
    reloaded.load_by_id(id).await;
    assert_eq!(
        reloaded.get::<String>("sku").as_deref(),
        Some("changed-elsewhere")
    );

    // A translation only touches its own locale
    chaise.load_by_id(id).await;
    chaise.set_data("name", "Chaise").set_data("price", 30.5);
    chaise.save().await;
    assert!(chaise.last_error().is_none(), "{:?}", chaise.last_error());
    assert_eq!(chaise.get::<i64>("id"), Some(id));
    chaise.load_by_id(id).await;
    assert_eq!(chaise.get::<String>("name").as_deref(), Some("Chaise"));
    assert_eq!(
        chaise.get::<String>("description").as_deref(),
        Some("A wooden chair")
    );
    assert_eq!(chaise.get::<f64>("price"), Some(30.5));
    let mut chair = TableModel::new(registry.clone(), Product::default()).with_locale("en", "en");
    chair.load_by_id(id).await;
    assert_eq!(chair.get::<String>("name").as_deref(), Some("Chair"));
    assert_eq!(chair.get::<f64>("price"), Some(30.5));
    assert_eq!(
        fetch_i64(
            registry,
            format!("SELECT COUNT(*) FROM strata_product_varchar WHERE entity_id = {id}")
        )
        .await,
        2
    );
    assert_eq!(
        fetch_i64(
            registry,
            format!("SELECT COUNT(*) FROM strata_product_text WHERE entity_id = {id}")
        )
        .await,
        2
    );

    // A base field change also writes the fallback values into the model locale
    let mut lamp = TableModel::new(registry.clone(), Product::default()).with_locale("en", "en");
    lamp.set_data("sku", "lamp-1")
        .set_data("price", 40)
        .set_data("name", "Lamp");
    lamp.save().await;
    assert!(lamp.last_error().is_none(), "{:?}", lamp.last_error());
    let lamp_id = lamp.get::<i64>("id").expect("The id was not assigned");
    let mut lampe = TableModel::new(registry.clone(), Product::default()).with_locale("fr", "en");
    lampe.load_by_id(lamp_id).await;
    assert_eq!(lampe.get::<String>("name").as_deref(), Some("Lamp"));
    lampe.set_data("price", 45);
    lampe.save().await;
    assert!(lampe.last_error().is_none(), "{:?}", lampe.last_error());
    assert_eq!(
        fetch_i64(
            registry,
            format!(
                "SELECT COUNT(*) FROM strata_product_varchar WHERE entity_id = {lamp_id} AND locale = 'fr'"
            )
        )
        .await,
        1
    );
    assert_eq!(
        fetch_i64(
            registry,
            format!("SELECT COUNT(*) FROM strata_product_text WHERE entity_id = {lamp_id}")
        )
        .await,
        0
    );

    // Missing row
    let mut missing = TableModel::new(registry.clone(), Product::default()).with_locale("en", "en");
    missing.load_by_id(id + 1000).await;
    assert!(missing.last_error().is_none());
    assert!(missing.get_data("id").is_null());
    assert!(!missing.has_data_change());

    // A deleted row is inserted again with a new key
    let mut table = TableModel::new(registry.clone(), Product::default()).with_locale("en", "en");
    table
        .set_data("sku", "table-1")
        .set_data("price", 120)
        .set_data("name", "Table");
    table.save().await;
    let table_id = table.get::<i64>("id").expect("The id was not assigned");
    execute(
        registry,
        format!("DELETE FROM strata_product WHERE id = {table_id}"),
    )
    .await;
    table.set_data("price", 99);
    table.save().await;
    assert!(table.last_error().is_none(), "{:?}", table.last_error());
    let resurrected = table.get::<i64>("id").expect("The id was not assigned");
    assert_ne!(resurrected, table_id);
    assert_eq!(
        fetch_i64(
            registry,
            format!("SELECT COUNT(*) FROM strata_product WHERE id = {resurrected}")
        )
        .await,
        1
    );
    let mut loaded = TableModel::new(registry.clone(), Product::default()).with_locale("en", "en");
    loaded.load_by_id(resurrected).await;
    assert_eq!(loaded.get::<f64>("price"), Some(99.0));
    assert_eq!(loaded.get::<String>("name").as_deref(), Some("Table"));

    // Delete
    loaded.delete().await;
    assert!(loaded.last_error().is_none(), "{:?}", loaded.last_error());
    assert_eq!(
        fetch_i64(
            registry,
            format!("SELECT COUNT(*) FROM strata_product WHERE id = {resurrected}")
        )
        .await,
        0
    );

    // Unknown connection
    let mut lost = TableModel::new(registry.clone(), Product::default()).with_connection("lost");
    lost.set_data("sku", "lost-1");
    crate::silent_logs! {
        lost.save().await;
    }
    let error = format!("{:#}", lost.last_error().expect("Expected an error"));
    assert!(error.contains("No connection named `lost`"), "{error}");
}
