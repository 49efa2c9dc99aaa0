use crate::{
    Connection, Context, Driver, Entity, Error, Executor, Registry, ResourceModel, Result, Select,
    SqlWriter, TableModel, Value, separated_by,
};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;

/// Lazily loaded page of entities matching one query.
///
/// Filters, selected fields and orders must be configured before the first
/// [`Collection::load`], which runs the query once. [`Collection::reset`]
/// clears everything to start over.
pub struct Collection<E: Entity, C: Connection> {
    factory: Box<dyn Fn() -> E + Send + Sync>,
    registry: Registry<C>,
    connection: String,
    locale: String,
    default_locale: String,
    select: Select,
    filters: Vec<String>,
    columns: Vec<&'static str>,
    elems: Vec<TableModel<E, C>>,
    page: u64,
    page_size: u64,
    page_length: u64,
    size: u64,
    loaded: bool,
    size_loaded: bool,
    last_error: Option<Error>,
}

impl<E: Entity, C: Connection> Collection<E, C> {
    /// `factory` creates the entity behind every loaded element.
    pub fn new(registry: Registry<C>, factory: impl Fn() -> E + Send + Sync + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            registry,
            connection: "default".into(),
            locale: Default::default(),
            default_locale: Default::default(),
            select: Default::default(),
            filters: Default::default(),
            columns: Default::default(),
            elems: Default::default(),
            page: 1,
            page_size: 0,
            page_length: 0,
            size: 0,
            loaded: false,
            size_loaded: false,
            last_error: None,
        }
    }

    pub fn with_connection(mut self, name: impl Into<String>) -> Self {
        self.connection = name.into();
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>, default_locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self.default_locale = default_locale.into();
        self
    }

    /// A new element sharing the connection and locales of the collection.
    pub fn create(&self) -> TableModel<E, C> {
        TableModel::from_resource(
            self.registry.clone(),
            ResourceModel::new((self.factory)()).with_locale(&self.locale, &self.default_locale),
        )
        .with_connection(&self.connection)
    }

    pub fn select(&self) -> &Select {
        &self.select
    }

    /// Direct access to the query, conditions added here are AND-ed with
    /// the filters.
    pub fn select_mut(&mut self) -> &mut Select {
        &mut self.select
    }

    fn writer() -> <C::Driver as Driver>::SqlWriter {
        C::Driver::default().sql_writer()
    }

    fn resolve_field(&mut self, field: &str) -> String {
        E::join_field(&mut self.select, field).unwrap_or_else(|| format!("e.{field}"))
    }

    /// Adds a group of conditions: the conditions on one field are AND-ed,
    /// the fields are OR-ed. Groups added by successive calls are OR-ed
    /// together as well.
    ///
    /// `in` and `not in` expect a list value.
    pub fn add_field_to_filter<'a, I, J>(&mut self, filters: I) -> &mut Self
    where
        I: IntoIterator<Item = (&'a str, J)>,
        J: IntoIterator<Item = (&'a str, Value)>,
    {
        let writer = Self::writer();
        let fields = filters
            .into_iter()
            .map(|(field, conditions)| {
                let field = self.resolve_field(field);
                (field, conditions.into_iter().collect::<Vec<_>>())
            })
            .filter(|(_, conditions)| !conditions.is_empty())
            .collect::<Vec<_>>();
        if fields.is_empty() {
            return self;
        }
        let mut group = String::with_capacity(64);
        group.push('(');
        separated_by(
            &mut group,
            &fields,
            |out, (field, conditions)| {
                out.push('(');
                separated_by(
                    out,
                    conditions,
                    |out, (op, value)| {
                        let op = op.trim();
                        out.push('(');
                        out.push_str(field);
                        out.push(' ');
                        out.push_str(op);
                        out.push(' ');
                        if op.eq_ignore_ascii_case("in") || op.eq_ignore_ascii_case("not in") {
                            out.push('(');
                            writer.write_value(out, value);
                            out.push(')');
                        } else {
                            writer.write_value(out, value);
                        }
                        out.push(')');
                    },
                    " AND ",
                );
                out.push(')');
            },
            " OR ",
        );
        group.push(')');
        self.filters.push(group);
        self
    }

    /// Restricts the projection to the declared fields added here, a field
    /// the entity resolves through a join registers that join. Translatable
    /// fields are not projected columns of the main table and are skipped.
    pub fn add_field_to_select(&mut self, field: &str) -> &mut Self {
        let field = field.to_lowercase();
        if let Some(def) = E::field(&field) {
            if !def.is_eav() && !self.columns.contains(&def.name) {
                self.columns.push(def.name);
            }
        }
        E::join_field(&mut self.select, &field);
        self
    }

    pub fn add_order(&mut self, field: &str, direction: &str) -> &mut Self {
        let field = self.resolve_field(field);
        self.select.order(format!("{field} {direction}"));
        self
    }

    /// The query of the current page.
    pub fn query(&self) -> Result<Select> {
        let writer = Self::writer();
        let table = if E::has_eav() {
            ResourceModel::<E>::eav_view(&writer, &self.locale, &self.default_locale)?
        } else {
            E::table_name().to_string()
        };
        let columns = self.columns.iter().map(|v| (*v, *v)).collect::<Vec<_>>();
        let mut select = self.select.clone();
        select.from(table, "e", &columns);
        if !self.filters.is_empty() {
            let mut condition = String::new();
            separated_by(&mut condition, &self.filters, |out, v| out.push_str(v), " OR ");
            select.where_(condition);
        }
        select
            .offset(self.page.saturating_sub(1).saturating_mul(self.page_size))
            .limit(self.page_size);
        Ok(select)
    }

    fn capture(&mut self, error: Error) {
        log::error!("{:#}", error);
        self.last_error = Some(error);
    }

    /// Runs the query once, later calls do nothing until the configuration
    /// changes.
    pub async fn load(&mut self) -> &mut Self {
        if self.loaded {
            return self;
        }
        self.last_error = None;
        match self.fetch_elems().await {
            Ok(elems) => {
                self.elems = elems;
                self.loaded = true;
            }
            Err(e) => {
                self.elems.clear();
                self.capture(e.context(format!(
                    "While loading the collection of `{}`",
                    E::table_name()
                )));
            }
        }
        self
    }

    async fn fetch_elems(&self) -> Result<Vec<TableModel<E, C>>> {
        let query = self.query()?.assemble_with(&Self::writer())?;
        let connection = self.registry.get(&self.connection)?;
        let mut connection = connection.lock().await;
        let mut tx = connection.begin().await?;
        let outcome = AssertUnwindSafe(async {
            let rows = tx.fetch_all(query).await?;
            let mut elems = Vec::with_capacity(rows.len());
            for row in rows {
                let mut elem = self.create();
                let resource = elem.resource_mut();
                resource.load_db_data(row.into_field_map());
                E::after_load(resource, &mut tx).await?;
                elems.push(elem);
            }
            Ok::<_, Error>(elems)
        })
        .catch_unwind()
        .await;
        tx.settle(outcome).await
    }

    /// Total number of matching rows, regardless of the page.
    pub async fn size(&mut self) -> u64 {
        if self.size_loaded {
            return self.size;
        }
        self.load().await;
        match self.count().await {
            Ok(total) => {
                self.size = total;
                if self.page_size == 0 {
                    if total > 0 {
                        self.page_size = total;
                        self.page_length = 1;
                    } else {
                        self.page_length = 0;
                    }
                } else {
                    self.page_length = total.div_ceil(self.page_size);
                }
                self.size_loaded = true;
            }
            Err(e) => self.capture(e.context(format!(
                "While counting the collection of `{}`",
                E::table_name()
            ))),
        }
        self.size
    }

    async fn count(&self) -> Result<u64> {
        let writer = Self::writer();
        let query = self.query()?.count_query(&writer)?;
        let connection = self.registry.get(&self.connection)?;
        let mut connection = connection.lock().await;
        let total = connection
            .fetch_one(query)
            .await?
            .and_then(|v| v.as_i64())
            .context("The count query returned no value")?;
        Ok(total.max(0) as u64)
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub async fn page_size(&mut self) -> u64 {
        self.size().await;
        self.page_size
    }

    pub async fn page_length(&mut self) -> u64 {
        self.size().await;
        self.page_length
    }

    /// Pages start at 1, the elements are loaded again on the next load.
    pub fn set_page(&mut self, page: u64) -> &mut Self {
        self.page = page.max(1);
        self.loaded = false;
        self.elems.clear();
        self
    }

    /// Zero means every row in one page.
    pub fn set_page_size(&mut self, page_size: u64) -> &mut Self {
        self.page_size = page_size;
        self.loaded = false;
        self.size_loaded = false;
        self.elems.clear();
        self
    }

    /// Elements of the last load, empty before it.
    pub fn elems(&self) -> &[TableModel<E, C>] {
        &self.elems
    }

    pub fn elems_mut(&mut self) -> &mut [TableModel<E, C>] {
        &mut self.elems
    }

    pub fn into_elems(self) -> Vec<TableModel<E, C>> {
        self.elems
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// Back to an unconfigured collection, connection and locales are kept.
    pub fn reset(&mut self) -> &mut Self {
        self.select.reset();
        self.filters.clear();
        self.columns.clear();
        self.elems.clear();
        self.page = 1;
        self.page_size = 0;
        self.page_length = 0;
        self.size = 0;
        self.loaded = false;
        self.size_loaded = false;
        self.last_error = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldDef, GenericSqlWriter, QueryResult, stream};
    use indoc::indoc;
    use std::{borrow::Cow, future::Future};

    #[derive(Default, Debug)]
    struct NoopDriver;

    impl Driver for NoopDriver {
        type Connection = NoopConnection;
        type SqlWriter = GenericSqlWriter;
        const NAME: &'static str = "noop";
        fn sql_writer(&self) -> GenericSqlWriter {
            GenericSqlWriter
        }
    }

    struct NoopConnection;

    impl Executor for NoopConnection {
        type Driver = NoopDriver;
        fn driver(&self) -> &NoopDriver {
            &NoopDriver
        }
        fn run(&mut self, _query: String) -> impl stream::Stream<Item = Result<QueryResult>> + Send {
            stream::empty()
        }
    }

    impl Connection for NoopConnection {
        fn connect(_url: Cow<'static, str>) -> impl Future<Output = Result<Self>> + Send {
            async { Ok(NoopConnection) }
        }
    }

    struct Item;

    static FIELDS: &[FieldDef] = &[
        FieldDef::new("id", Value::Int64(None)),
        FieldDef::new("name", Value::Varchar(None)),
        FieldDef::new("age", Value::Int32(None)),
    ];

    impl Entity for Item {
        fn table_name() -> &'static str {
            "item"
        }
        fn fields() -> &'static [FieldDef] {
            FIELDS
        }
        fn primary_key() -> Option<&'static str> {
            Some("id")
        }
        fn join_field(select: &mut Select, field: &str) -> Option<String> {
            (field == "category").then(|| {
                select.left_join("c", "category", "c.id = e.category_id", &[("category", "title")]);
                "c.title".to_string()
            })
        }
    }

    fn collection() -> Collection<Item, NoopConnection> {
        Collection::new(Registry::new(), || Item)
    }

    struct Page;

    static PAGE_FIELDS: &[FieldDef] = &[
        FieldDef::new("id", Value::Int64(None)),
        FieldDef::new("slug", Value::Varchar(None)),
        FieldDef::new("title", Value::Varchar(None)).eav("varchar"),
    ];

    impl Entity for Page {
        fn table_name() -> &'static str {
            "page"
        }
        fn fields() -> &'static [FieldDef] {
            PAGE_FIELDS
        }
        fn primary_key() -> Option<&'static str> {
            Some("id")
        }
    }

    #[test]
    fn filters_and_pages() {
        let mut items = collection();
        items
            .add_field_to_filter([
                ("name", [("=", Value::from("A")), ("<>", Value::from("B"))]),
                ("age", [(">", Value::from(3)), ("<", Value::from(9))]),
            ])
            .add_field_to_filter([(
                "category",
                [("in", Value::from(vec!["x".to_string(), "y".to_string()]))],
            )])
            .add_order("category", "DESC")
            .set_page_size(10)
            .set_page(3);
        assert_eq!(
            items.query().unwrap().assemble().unwrap(),
            indoc! {"
                SELECT e.*, c.title AS category
                FROM item AS e
                LEFT JOIN category AS c ON c.id = e.category_id
                WHERE ((((e.name = 'A') AND (e.name <> 'B')) OR ((e.age > 3) AND (e.age < 9))) OR (((c.title in ('x', 'y')))))
                ORDER BY c.title DESC
                LIMIT 10
                OFFSET 20
            "}
            .trim()
        );
    }

    #[test]
    fn selected_fields() {
        let mut items = collection();
        items
            .add_field_to_select("name")
            .add_field_to_select("NAME")
            .add_field_to_select("unknown")
            .add_field_to_filter([("age", Vec::<(&str, Value)>::new())]);
        assert_eq!(
            items.query().unwrap().assemble().unwrap(),
            "SELECT e.name\nFROM item AS e"
        );
        items.set_page(0);
        assert_eq!(items.page(), 1);
        items.reset();
        assert_eq!(
            items.query().unwrap().assemble().unwrap(),
            "SELECT e.*\nFROM item AS e"
        );
    }

    #[test]
    fn translatable_fields_not_selected() {
        let mut pages =
            Collection::<Page, NoopConnection>::new(Registry::new(), || Page).with_locale("fr", "en");
        pages
            .add_field_to_select("slug")
            .add_field_to_select("title");
        let sql = pages.query().unwrap().assemble().unwrap();
        assert!(sql.starts_with("SELECT e.slug\nFROM (SELECT m.*"), "{sql}");
        assert!(!sql.contains("e.title"), "{sql}");
        pages.reset();
        pages.add_field_to_select("TITLE");
        let sql = pages.query().unwrap().assemble().unwrap();
        assert!(sql.starts_with("SELECT e.*\nFROM (SELECT m.*"), "{sql}");
    }

    #[test]
    fn huge_page_offset_saturates() {
        let mut items = collection();
        items.set_page_size(10).set_page(u64::MAX);
        assert_eq!(
            items.query().unwrap().assemble().unwrap(),
            indoc! {"
                SELECT e.*
                FROM item AS e
                LIMIT 10
                OFFSET 18446744073709551615
            "}
            .trim()
        );
        items.set_page_size(u64::MAX).set_page(3);
        assert!(
            items
                .query()
                .unwrap()
                .assemble()
                .unwrap()
                .ends_with("OFFSET 18446744073709551615")
        );
    }
}
