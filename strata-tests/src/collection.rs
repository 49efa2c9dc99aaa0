use crate::{execute, serial_primary_key};
use std::sync::LazyLock;
use strata::{Collection, Connection, Entity, FieldDef, Registry, Select, Value};
use tokio::sync::Mutex;

#[derive(Default, Debug, Clone)]
pub struct Item {
    pub id: Option<i64>,
    pub name: String,
    pub age: i64,
}

static FIELDS: &[FieldDef] = &[
    FieldDef::new("id", Value::Int64(None)),
    FieldDef::new("name", Value::Varchar(None)),
    FieldDef::new("age", Value::Int64(None)),
    FieldDef::new("category_id", Value::Int64(None)),
];

impl Entity for Item {
    fn table_name() -> &'static str {
        "strata_item"
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
            "name" => self.name = value.as_str().unwrap_or_default().into(),
            "age" => self.age = value.as_i64().unwrap_or_default(),
            _ => {}
        }
    }

    fn join_field(select: &mut Select, field: &str) -> Option<String> {
        match field {
            "category" => {
                select.left_join(
                    "c",
                    "strata_category",
                    "c.id = e.category_id",
                    &[("category", "title")],
                );
                Some("c.title".into())
            }
            _ => None,
        }
    }
}

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn collection<C: Connection>(registry: &Registry<C>) {
    let _lock = MUTEX.lock().await;
    let pk = serial_primary_key::<C>();
    execute(
        registry,
        "DROP TABLE IF EXISTS strata_item;
        DROP TABLE IF EXISTS strata_category;",
    )
    .await;
    execute(
        registry,
        format!(
            "CREATE TABLE strata_category (id {pk}, title VARCHAR(64));
            CREATE TABLE strata_item (id {pk}, name VARCHAR(64), age BIGINT, category_id BIGINT);"
        ),
    )
    .await;
    execute(
        registry,
        "INSERT INTO strata_category (title) VALUES ('Tools'), ('Toys');
        INSERT INTO strata_item (name, age, category_id) VALUES
            ('A', 10, 1), ('B', 20, 2), ('C', 30, 1), ('D', 40, 2),
            ('E', 50, 1), ('F', 60, NULL), ('G', 70, 2);",
    )
    .await;

    let names = |collection: &Collection<Item, C>| {
        collection
            .elems()
            .iter()
            .map(|v| v.entity().name.clone())
            .collect::<Vec<_>>()
    };

    // Pagination
    let mut items = Collection::new(registry.clone(), Item::default);
    items.add_order("id", "ASC").set_page_size(3);
    assert!(!items.is_loaded());
    assert!(items.elems().is_empty());
    assert_eq!(items.size().await, 7);
    assert_eq!(items.page_length().await, 3);
    assert_eq!(items.page_size().await, 3);
    assert!(items.is_loaded());
    assert_eq!(names(&items), ["A", "B", "C"]);
    items.set_page(3).load().await;
    assert!(items.last_error().is_none(), "{:?}", items.last_error());
    assert_eq!(items.page(), 3);
    assert_eq!(names(&items), ["G"]);
    items.set_page(2).load().await;
    assert_eq!(names(&items), ["D", "E", "F"]);
    assert_eq!(items.elems()[0].get::<i64>("age"), Some(40));
    assert!(!items.elems()[0].has_data_change());

    // Loading again does not run the query
    execute(registry, "DELETE FROM strata_item WHERE name = 'E'").await;
    items.load().await;
    assert_eq!(names(&items), ["D", "E", "F"]);
    execute(
        registry,
        "INSERT INTO strata_item (name, age, category_id) VALUES ('E', 50, 1)",
    )
    .await;

    // No page size means one page holding everything
    let mut items = Collection::new(registry.clone(), Item::default);
    assert_eq!(items.page_length().await, 1);
    assert_eq!(items.page_size().await, 7);
    assert_eq!(items.elems().len(), 7);

    // Nothing matches
    let mut items = Collection::new(registry.clone(), Item::default);
    items.add_field_to_filter([("age", [(">", Value::from(100))])]);
    assert_eq!(items.size().await, 0);
    assert_eq!(items.page_length().await, 0);
    assert!(items.elems().is_empty());

    // Conditions on one field are AND-ed
    let mut items = Collection::new(registry.clone(), Item::default);
    items
        .add_field_to_filter([("age", [(">", Value::from(15)), ("<", Value::from(45))])])
        .add_order("age", "ASC");
    items.load().await;
    assert_eq!(names(&items), ["B", "C", "D"]);

    // Fields of one call are OR-ed
    let mut items = Collection::new(registry.clone(), Item::default);
    items
        .add_field_to_filter([
            ("name", vec![("=", Value::from("A"))]),
            ("age", vec![(">", Value::from(60))]),
        ])
        .add_order("name", "ASC");
    items.load().await;
    assert_eq!(names(&items), ["A", "G"]);

    // Successive calls are OR-ed as well
    let mut items = Collection::new(registry.clone(), Item::default);
    items
        .add_field_to_filter([("name", [("=", Value::from("A"))])])
        .add_field_to_filter([("name", [("=", Value::from("B"))])])
        .add_order("name", "ASC");
    items.load().await;
    assert_eq!(names(&items), ["A", "B"]);

    // List operators
    let mut items = Collection::new(registry.clone(), Item::default);
    items
        .add_field_to_filter([(
            "name",
            [("in", Value::from(vec!["C".to_string(), "F".to_string()]))],
        )])
        .add_order("name", "DESC");
    items.load().await;
    assert_eq!(names(&items), ["F", "C"]);

    // A joined field registers its join once
    let mut items = Collection::new(registry.clone(), Item::default);
    items
        .add_field_to_filter([("category", [("=", Value::from("Tools"))])])
        .add_field_to_filter([("category", [("=", Value::from("Tools"))])])
        .add_field_to_select("name")
        .add_field_to_select("category")
        .add_order("category", "ASC")
        .add_order("name", "ASC");
    let query = items
        .query()
        .expect("Could not build the query")
        .assemble()
        .expect("Could not assemble the query");
    assert_eq!(query.matches("LEFT JOIN").count(), 1, "{query}");
    items.load().await;
    assert!(items.last_error().is_none(), "{:?}", items.last_error());
    assert_eq!(names(&items), ["A", "C", "E"]);
    assert_eq!(
        items.elems()[0].get::<String>("category").as_deref(),
        Some("Tools")
    );
    assert!(items.elems()[0].get_data("age").is_null());

    // Reset
    items.reset();
    assert!(!items.is_loaded());
    assert_eq!(items.size().await, 7);

    // Unknown field
    let mut items = Collection::new(registry.clone(), Item::default);
    items.add_field_to_filter([("weight", [("=", Value::from(1))])]);
    crate::silent_logs! {
        items.load().await;
    }
    assert!(items.last_error().is_some());
    assert!(items.elems().is_empty());
    assert!(!items.is_loaded());

    // Elements created by the collection can be saved
    let items = Collection::new(registry.clone(), Item::default);
    let mut item = items.create();
    item.set_data("name", "H").set_data("age", 80);
    item.save().await;
    assert!(item.last_error().is_none(), "{:?}", item.last_error());
    assert!(item.get::<i64>("id").is_some());
}
