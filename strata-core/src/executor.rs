use crate::{
    Driver, FieldMap, QueryResult, Result, RowLabeled, RowsAffected, SqlWriter, Transaction,
    Value,
    stream::{Stream, StreamExt, TryStreamExt},
};
use futures::TryFutureExt;
use std::{future::Future, pin::pin, slice};

/// Something able to run SQL: a connection or a transaction over one.
///
/// Only `driver` and `run` are required, every other method renders its
/// statement through the driver's [`SqlWriter`] and funnels it into `run`.
pub trait Executor: Send + Sized {
    type Driver: Driver;

    fn driver(&self) -> &Self::Driver;

    /// Number of transactions (savepoints included) currently open.
    fn transaction_depth(&self) -> usize {
        0
    }

    /// General method to send any query and return any result type (either row or count)
    fn run(&mut self, query: String) -> impl Stream<Item = Result<QueryResult>> + Send;

    /// Execute the query and returns the rows.
    fn fetch(&mut self, query: String) -> impl Stream<Item = Result<RowLabeled>> + Send {
        self.run(query).filter_map(|v| async move {
            match v {
                Ok(QueryResult::Row(v)) => Some(Ok(v)),
                Err(e) => Some(Err(e)),
                _ => None,
            }
        })
    }

    /// Execute the query and return the total number of rows affected.
    fn execute(&mut self, query: String) -> impl Future<Output = Result<RowsAffected>> + Send {
        self.run(query)
            .filter_map(|v| async move {
                match v {
                    Ok(QueryResult::Affected(v)) => Some(Ok(v)),
                    Err(e) => Some(Err(e)),
                    _ => None,
                }
            })
            .try_collect()
    }

    fn fetch_all(&mut self, query: String) -> impl Future<Output = Result<Vec<RowLabeled>>> + Send {
        self.fetch(query).try_collect()
    }

    /// First row of the result, the remaining ones are discarded.
    fn fetch_row(
        &mut self,
        query: String,
    ) -> impl Future<Output = Result<Option<RowLabeled>>> + Send {
        let stream = self.fetch(query);
        async move { pin!(stream).try_next().await }
    }

    /// First column of the first row.
    fn fetch_one(&mut self, query: String) -> impl Future<Output = Result<Option<Value>>> + Send {
        self.fetch_row(query)
            .map_ok(|v| v.and_then(|v| v.values.into_vec().into_iter().next()))
    }

    /// Inserts one row and returns the generated key, 0 when there is none.
    fn insert(&mut self, table: &str, values: &FieldMap) -> impl Future<Output = Result<i64>> + Send {
        let mut query = String::with_capacity(256);
        self.driver()
            .sql_writer()
            .write_insert(&mut query, table, slice::from_ref(values));
        self.execute(query)
            .map_ok(|v| v.last_affected_id.unwrap_or_default())
    }

    fn insert_multi(
        &mut self,
        table: &str,
        rows: &[FieldMap],
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        let mut query = String::with_capacity(256 * rows.len());
        if !rows.is_empty() {
            self.driver()
                .sql_writer()
                .write_insert(&mut query, table, rows);
        }
        async move {
            if query.is_empty() {
                return Ok(Default::default());
            }
            self.execute(query).await
        }
    }

    /// Inserts the rows, updating every column except `keys` of the rows
    /// that collide on `keys`.
    fn insert_multi_on_update(
        &mut self,
        table: &str,
        rows: &[FieldMap],
        keys: &[&str],
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        let mut query = String::with_capacity(256 * rows.len());
        if !rows.is_empty() {
            self.driver()
                .sql_writer()
                .write_upsert(&mut query, table, rows, keys);
        }
        async move {
            if query.is_empty() {
                return Ok(Default::default());
            }
            self.execute(query).await
        }
    }

    fn update(
        &mut self,
        table: &str,
        values: &FieldMap,
        condition: &str,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        let mut query = String::with_capacity(256);
        if !values.is_empty() {
            self.driver()
                .sql_writer()
                .write_update(&mut query, table, values, condition);
        }
        async move {
            if query.is_empty() {
                return Ok(Default::default());
            }
            self.execute(query).await
        }
    }

    fn delete(
        &mut self,
        table: &str,
        condition: &str,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        let mut query = String::with_capacity(128);
        self.driver()
            .sql_writer()
            .write_delete(&mut query, table, condition);
        self.execute(query)
    }

    /// Renders `?` placeholders of `template` into literals.
    fn expr(&self, template: &str, values: &[Value]) -> Result<String> {
        let mut out = String::with_capacity(template.len() + 16 * values.len());
        self.driver()
            .sql_writer()
            .write_expr(&mut out, template, values)?;
        Ok(out)
    }

    /// Opens a transaction, or a savepoint when `self` already is one.
    fn begin(&mut self) -> impl Future<Output = Result<Transaction<'_, Self>>> + Send {
        Transaction::new(self)
    }
}
