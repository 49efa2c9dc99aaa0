use crate::Value;

/// Static description of one entity column.
///
/// ```rust
/// use strata_core::{FieldDef, Value};
/// static FIELDS: &[FieldDef] = &[
///     FieldDef::new("id", Value::Int64(None)),
///     FieldDef::new("name", Value::Varchar(None)).eav("varchar"),
///     FieldDef::new("created_at", Value::Timestamp(None)).auto_create(),
/// ];
/// assert!(FIELDS[1].is_eav());
/// ```
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Lower case column name.
    pub name: &'static str,
    /// Storage type, a `Value` variant without payload.
    pub value: Value,
    /// Suffix of the side table `<table>_<eav>` holding the translations.
    pub eav: Option<&'static str>,
    /// Set to the current timestamp when the row is inserted.
    pub auto_create: bool,
    /// Set to the current timestamp on every write.
    pub auto_update: bool,
}

impl FieldDef {
    pub const fn new(name: &'static str, value: Value) -> Self {
        Self {
            name,
            value,
            eav: None,
            auto_create: false,
            auto_update: false,
        }
    }
    pub const fn eav(mut self, eav: &'static str) -> Self {
        self.eav = Some(eav);
        self
    }
    pub const fn auto_create(mut self) -> Self {
        self.auto_create = true;
        self
    }
    pub const fn auto_update(mut self) -> Self {
        self.auto_update = true;
        self
    }
    pub const fn is_eav(&self) -> bool {
        self.eav.is_some()
    }
}
