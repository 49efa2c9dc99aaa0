use crate::{Connection, Result, SqlWriter};
use std::{borrow::Cow, fmt::Debug, future::Future};

/// Entry point of a database backend: its dialect and its connection type.
pub trait Driver: Default + Debug + Send + Sync {
    type Connection: Connection<Driver = Self>;
    type SqlWriter: SqlWriter;

    const NAME: &'static str;

    fn sql_writer(&self) -> Self::SqlWriter;

    fn connect(
        &self,
        url: Cow<'static, str>,
    ) -> impl Future<Output = Result<Self::Connection>> + Send {
        Self::Connection::connect(url)
    }
}
