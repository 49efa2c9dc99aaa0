use crate::{Executor, FieldDef, ResourceModel, Result, Select, SqlWriter, Value};
use std::future::Future;

/// A business entity stored in one table, optionally with translatable
/// attributes kept in `<table>_<eav>` side tables.
///
/// Only `table_name`, `fields` and `primary_key` are required, every other
/// capability is opt-in by overriding its default.
pub trait Entity: Send + Sync + Sized + 'static {
    fn table_name() -> &'static str;
    fn fields() -> &'static [FieldDef];
    /// `None` for keyless entities.
    fn primary_key() -> Option<&'static str>;

    fn field(name: &str) -> Option<&'static FieldDef> {
        Self::fields().iter().find(|v| v.name == name)
    }

    fn eav_fields() -> impl Iterator<Item = &'static FieldDef> {
        Self::fields().iter().filter(|v| v.is_eav())
    }

    fn has_eav() -> bool {
        Self::fields().iter().any(FieldDef::is_eav)
    }

    /// Mirrors a field assignment into the typed struct.
    fn bind_field(&mut self, _field: &str, _value: &Value) {}

    /// Custom SQL source replacing the generated locale fallback view.
    fn eav_table(
        _writer: &dyn SqlWriter,
        _locale: &str,
        _default_locale: &str,
    ) -> Option<String> {
        None
    }

    /// Natural key of a keyless entity, used by delete and as upsert target.
    fn delete_fields() -> &'static [&'static str] {
        &[]
    }

    /// Resolves `field` to a column expression, registering on `select`
    /// whatever join it needs. `None` means the main table column.
    fn join_field(_select: &mut Select, _field: &str) -> Option<String> {
        None
    }

    fn before_save<X: Executor>(
        _model: &mut ResourceModel<Self>,
        _executor: &mut X,
    ) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }

    fn after_save<X: Executor>(
        _model: &mut ResourceModel<Self>,
        _executor: &mut X,
    ) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }

    fn before_delete<X: Executor>(
        _model: &mut ResourceModel<Self>,
        _executor: &mut X,
    ) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }

    fn after_delete<X: Executor>(
        _model: &mut ResourceModel<Self>,
        _executor: &mut X,
    ) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }

    fn after_load<X: Executor>(
        _model: &mut ResourceModel<Self>,
        _executor: &mut X,
    ) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }
}
