use crate::{
    Context, Driver, Entity, Error, Executor, FieldMap, Result, Select, SqlWriter, Value,
};
use std::collections::BTreeMap;

static NULL: Value = Value::Null;

/// Primary key, locale and attribute name: the natural key of an EAV row.
pub const EAV_KEYS: &[&str] = &["entity_id", "locale", "attribute_name"];

/// Current and last persisted state of one entity.
///
/// Values are kept already converted to the declared type of their field,
/// keyed by lower case field name. The model is dirty when the two maps
/// differ over the declared fields, a clean model is never written.
#[derive(Debug, Clone)]
pub struct ResourceModel<E: Entity> {
    entity: E,
    data: BTreeMap<String, Value>,
    origin: BTreeMap<String, Value>,
    locale: String,
    default_locale: String,
}

/// In-memory state captured by [`ResourceModel::snapshot`].
#[derive(Debug, Clone)]
pub struct Snapshot {
    data: BTreeMap<String, Value>,
    origin: BTreeMap<String, Value>,
}

impl<E: Entity> ResourceModel<E> {
    pub fn new(entity: E) -> Self {
        Self {
            entity,
            data: Default::default(),
            origin: Default::default(),
            locale: Default::default(),
            default_locale: Default::default(),
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>, default_locale: impl Into<String>) -> Self {
        self.set_locale(locale, default_locale);
        self
    }

    pub fn set_locale(&mut self, locale: impl Into<String>, default_locale: impl Into<String>) -> &mut Self {
        self.locale = locale.into();
        self.default_locale = default_locale.into();
        self
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn entity(&self) -> &E {
        &self.entity
    }

    pub fn entity_mut(&mut self) -> &mut E {
        &mut self.entity
    }

    pub fn into_entity(self) -> E {
        self.entity
    }

    /// Value converted to the declared type of `field`, undeclared fields
    /// are kept as they are.
    fn convert(field: &str, value: Value) -> Value {
        match E::field(field) {
            Some(def) => value.convert_to(&def.value),
            None => value.normalized(),
        }
    }

    pub fn set_data(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        let field = field.to_lowercase();
        let value = Self::convert(&field, value.into());
        self.entity.bind_field(&field, &value);
        self.data.insert(field, value);
        self
    }

    /// `Value::Null` when the field was never set.
    pub fn get_data(&self, field: &str) -> &Value {
        self.data.get(&field.to_lowercase()).unwrap_or(&NULL)
    }

    pub fn set_origin_data(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        let field = field.to_lowercase();
        let value = Self::convert(&field, value.into());
        self.origin.insert(field, value);
        self
    }

    pub fn get_origin_data(&self, field: &str) -> &Value {
        self.origin.get(&field.to_lowercase()).unwrap_or(&NULL)
    }

    pub fn data(&self) -> &BTreeMap<String, Value> {
        &self.data
    }

    pub fn origin(&self) -> &BTreeMap<String, Value> {
        &self.origin
    }

    /// Replaces both current and origin data with `row`, every declared
    /// field missing from it becomes NULL.
    pub fn load_db_data<K: AsRef<str>>(&mut self, row: impl IntoIterator<Item = (K, Value)>) -> &mut Self {
        self.reset();
        for field in E::fields() {
            self.set_origin_data(field.name, Value::Null)
                .set_data(field.name, Value::Null);
        }
        for (field, value) in row {
            self.set_origin_data(field.as_ref(), value.clone())
                .set_data(field.as_ref(), value);
        }
        self
    }

    pub fn reset(&mut self) -> &mut Self {
        self.data.clear();
        self.origin.clear();
        self
    }

    /// Declared fields with their current value, NULL when unset.
    pub fn db_data(&self, exclude_eav: bool) -> FieldMap {
        E::fields()
            .iter()
            .filter(|v| !(exclude_eav && v.is_eav()))
            .map(|v| (v.name.to_string(), self.get_data(v.name).clone()))
            .collect()
    }

    pub fn has_data_change(&self) -> bool {
        E::fields()
            .iter()
            .any(|v| self.get_data(v.name) != self.get_origin_data(v.name))
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            data: self.data.clone(),
            origin: self.origin.clone(),
        }
    }

    /// Puts back a snapshot, the entity sees every field again.
    pub fn restore(&mut self, snapshot: Snapshot) -> &mut Self {
        self.data = snapshot.data;
        self.origin = snapshot.origin;
        for field in E::fields() {
            let value = self.get_data(field.name).clone();
            self.entity.bind_field(field.name, &value);
        }
        self
    }

    fn stamp_auto_fields(&mut self) {
        for field in E::fields() {
            if field.auto_update || (field.auto_create && self.get_data(field.name).is_null()) {
                self.set_data(field.name, Value::now());
            }
        }
    }

    /// Writes the pending changes: nothing when the model is clean, an
    /// insert or an update of the main table otherwise, followed by every
    /// translatable attribute of the current locale.
    ///
    /// A key assigned by the caller to a new model is inserted as it is. A
    /// key loaded from the table that no longer exists there is dropped and
    /// the row is inserted again with a new key.
    pub async fn save<X: Executor>(&mut self, executor: &mut X) -> Result<()> {
        if !self.has_data_change() {
            return Ok(());
        }
        let table = E::table_name();
        self.stamp_auto_fields();
        let mut data = self.db_data(true);
        let Some(pk) = E::primary_key() else {
            executor
                .insert_multi_on_update(table, &[data], E::delete_fields())
                .await
                .with_context(|| format!("While saving a row of `{table}`"))?;
            if E::has_eav() {
                log::warn!("Translatable fields of `{table}` are not saved, the entity has no primary key");
            }
            self.origin = self.data.clone();
            return Ok(());
        };
        let current = self.get_data(pk).clone();
        let loaded = !self.get_origin_data(pk).is_null();
        let exists = !current.is_null() && {
            let query = executor.expr(&format!("SELECT {pk} FROM {table} WHERE {pk} = ?"), &[current.clone()])?;
            let found = executor
                .fetch_one(query)
                .await
                .with_context(|| format!("While checking the row {pk} = {current:?} of `{table}`"))?
                .is_some_and(|v| !v.is_null());
            if !found && loaded {
                log::warn!("Row {pk} = {current:?} of `{table}` does not exist anymore, inserting it again");
            }
            found
        };
        if exists {
            data.remove(pk);
            let condition = executor.expr(&format!("{pk} = ?"), &[current])?;
            executor
                .update(table, &data, &condition)
                .await
                .with_context(|| format!("While updating a row of `{table}`"))?;
        } else if !current.is_null() && !loaded {
            executor
                .insert(table, &data)
                .await
                .with_context(|| format!("While inserting a row into `{table}`"))?;
        } else {
            data.remove(pk);
            let id = executor
                .insert(table, &data)
                .await
                .with_context(|| format!("While inserting a row into `{table}`"))?;
            self.set_data(pk, id).set_origin_data(pk, id);
        }
        let eav_fields = E::eav_fields().map(|v| v.name).collect::<Vec<_>>();
        self.save_eav(executor, pk, &eav_fields).await?;
        self.origin = self.data.clone();
        Ok(())
    }

    /// Upserts the non NULL `fields` into the rows of the current locale.
    async fn save_eav<X: Executor>(&mut self, executor: &mut X, pk: &str, fields: &[&'static str]) -> Result<()> {
        let mut tables = BTreeMap::<String, Vec<FieldMap>>::new();
        for field in fields.iter().filter_map(|v| E::field(v)) {
            let (Some(eav), value) = (field.eav, self.get_data(field.name)) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            tables
                .entry(format!("{}_{}", E::table_name(), eav))
                .or_default()
                .push(FieldMap::from([
                    ("entity_id".into(), self.get_data(pk).clone()),
                    ("locale".into(), Value::Varchar(Some(self.locale.clone()))),
                    ("attribute_name".into(), Value::Varchar(Some(field.name.into()))),
                    ("value".into(), value.clone()),
                ]));
        }
        if tables.is_empty() {
            return Ok(());
        }
        if self.locale.is_empty() {
            log::warn!(
                "Translatable fields of `{}` are not saved, no locale is set",
                E::table_name()
            );
            return Ok(());
        }
        for (table, rows) in tables {
            executor
                .insert_multi_on_update(&table, &rows, EAV_KEYS)
                .await
                .with_context(|| format!("While saving the translations into `{table}`"))?;
        }
        Ok(())
    }

    /// Loads the first row where `field` equals `value`, reading the
    /// translatable fields through the locale fallback.
    ///
    /// Returns whether a row was found, the model is left empty otherwise.
    pub async fn load_by_field<X: Executor>(
        &mut self,
        executor: &mut X,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<bool> {
        let field = field.to_lowercase();
        let value = Self::convert(&field, value.into());
        let query = if E::has_eav() {
            let view = self.eav_as_table(&executor.driver().sql_writer())?;
            executor.expr(&format!("SELECT * FROM {view} AS t WHERE t.{field} = ?"), &[value])?
        } else {
            executor.expr(
                &format!("SELECT * FROM {} WHERE {field} = ?", E::table_name()),
                &[value],
            )?
        };
        let row = executor
            .fetch_row(query)
            .await
            .with_context(|| format!("While loading `{}` by {field}", E::table_name()))?;
        let found = row.is_some();
        match row {
            Some(row) => self.load_db_data(row.into_field_map()),
            None => self.load_db_data(FieldMap::new()),
        };
        Ok(found)
    }

    pub async fn load_by_id<X: Executor>(&mut self, executor: &mut X, id: impl Into<Value>) -> Result<bool> {
        let Some(pk) = E::primary_key() else {
            return Err(Error::msg(format!(
                "Cannot load `{}` by id, it has no primary key",
                E::table_name()
            )));
        };
        self.load_by_field(executor, pk, id).await
    }

    /// Deletes the row by primary key, or by the delete fields of a keyless
    /// entity. Returns the number of rows deleted.
    pub async fn delete<X: Executor>(&mut self, executor: &mut X) -> Result<u64> {
        let table = E::table_name();
        let condition = if let Some(pk) = E::primary_key() {
            let current = self.get_data(pk).clone();
            if current.is_null() {
                return Ok(0);
            }
            let query = executor.expr(&format!("SELECT {pk} FROM {table} WHERE {pk} = ?"), &[current.clone()])?;
            let exists = executor
                .fetch_one(query)
                .await?
                .is_some_and(|v| !v.is_null());
            if !exists {
                return Ok(0);
            }
            executor.expr(&format!("{pk} = ?"), &[current])?
        } else {
            let fields = E::delete_fields();
            if fields.is_empty() {
                return Ok(0);
            }
            let mut condition = String::new();
            for field in fields {
                if !condition.is_empty() {
                    condition.push_str(" AND ");
                }
                let value = self.get_data(field);
                if value.is_null() {
                    condition.push_str(&format!("{field} IS NULL"));
                } else {
                    condition.push_str(&executor.expr(&format!("{field} = ?"), &[value.clone()])?);
                }
            }
            condition
        };
        let result = executor
            .delete(table, &condition)
            .await
            .with_context(|| format!("While deleting from `{table}`"))?;
        Ok(result.rows_affected)
    }

    /// SQL source exposing the main table with every translatable field
    /// resolved to the current locale, falling back to the default one.
    pub fn eav_as_table(&self, writer: &dyn SqlWriter) -> Result<String> {
        Self::eav_view(writer, &self.locale, &self.default_locale)
    }

    /// Same as [`ResourceModel::eav_as_table`] for an explicit locale pair.
    pub fn eav_view(writer: &dyn SqlWriter, locale: &str, default_locale: &str) -> Result<String> {
        if let Some(table) = E::eav_table(writer, locale, default_locale) {
            return Ok(table);
        }
        let table = E::table_name();
        let Some(pk) = E::primary_key() else {
            return Err(Error::msg(format!(
                "`{table}` has translatable fields but no primary key"
            )));
        };
        let columns = std::iter::once(("".to_string(), "m.*".to_string()))
            .chain(E::eav_fields().map(|v| {
                (
                    v.name.to_string(),
                    format!("COALESCE(e_{0}.value, e_{0}_default.value)", v.name),
                )
            }))
            .collect::<Vec<_>>();
        let columns = columns
            .iter()
            .map(|(a, e)| (a.as_str(), e.as_str()))
            .collect::<Vec<_>>();
        let mut select = Select::new();
        select.from(table, "m", &columns);
        for field in E::eav_fields() {
            let Some(eav) = field.eav else {
                continue;
            };
            let side = format!("{table}_{eav}");
            for (alias, locale) in [
                (format!("e_{}_default", field.name), default_locale),
                (format!("e_{}", field.name), locale),
            ] {
                let mut condition = String::new();
                writer.write_expr(
                    &mut condition,
                    &format!(
                        "{alias}.entity_id = m.{pk} AND {alias}.locale = ? AND {alias}.attribute_name = ?"
                    ),
                    &[locale.into(), field.name.into()],
                )?;
                select.left_join(alias, side.clone(), condition, &[]);
            }
        }
        Ok(format!("({})", select.assemble_with(writer)?))
    }
}
