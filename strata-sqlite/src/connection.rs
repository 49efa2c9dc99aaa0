use crate::{
    CBox, SqliteDriver, error_message_from_ptr,
    extract::{extract_name, extract_value},
};
use async_stream::try_stream;
use libsqlite3_sys::{
    SQLITE_BUSY, SQLITE_DONE, SQLITE_OK, SQLITE_OPEN_CREATE, SQLITE_OPEN_READWRITE,
    SQLITE_OPEN_URI, SQLITE_ROW, sqlite3, sqlite3_close, sqlite3_column_count, sqlite3_errmsg,
    sqlite3_finalize, sqlite3_last_insert_rowid, sqlite3_open_v2, sqlite3_prepare_v2,
    sqlite3_step, sqlite3_stmt, sqlite3_total_changes,
};
use std::{
    borrow::Cow,
    ffi::{CString, c_int},
    ptr,
    sync::Arc,
};
use strata_core::{
    Connection, Context, Driver, Error, Executor, QueryResult, Result, RowLabeled, RowNames,
    RowsAffected, stream::Stream, truncate_long,
};
use tokio::task::spawn_blocking;

pub struct SqliteConnection {
    pub(crate) connection: CBox<*mut sqlite3>,
}

enum Step {
    Row(RowLabeled),
    Done,
}

fn last_error(connection: *mut sqlite3) -> Error {
    Error::msg(unsafe { error_message_from_ptr(&sqlite3_errmsg(connection)).to_string() })
}

/// Prepares the first statement of `sql` starting at byte `offset`.
///
/// Returns the statement (null when only whitespace or comments are left)
/// and the offset of the statement that follows it.
fn prepare(
    connection: &CBox<*mut sqlite3>,
    sql: &CString,
    offset: usize,
) -> Result<(CBox<*mut sqlite3_stmt>, usize)> {
    let bytes = sql.as_bytes();
    let mut statement = CBox::new(ptr::null_mut(), |p| unsafe {
        sqlite3_finalize(p);
    });
    unsafe {
        let start = sql.as_ptr().add(offset);
        let mut tail = ptr::null();
        let rc = sqlite3_prepare_v2(
            **connection,
            start,
            (bytes.len() - offset) as c_int,
            &mut *statement,
            &mut tail,
        );
        if rc != SQLITE_OK {
            return Err(last_error(**connection));
        }
        let next = if tail.is_null() {
            bytes.len()
        } else {
            tail.offset_from(sql.as_ptr()) as usize
        };
        Ok((statement, next))
    }
}

fn labels(statement: &CBox<*mut sqlite3_stmt>) -> Result<RowNames> {
    let count = unsafe { sqlite3_column_count(**statement) };
    (0..count).map(|i| extract_name(**statement, i)).collect()
}

fn step(
    connection: &CBox<*mut sqlite3>,
    statement: &CBox<*mut sqlite3_stmt>,
    labels: &RowNames,
) -> Result<Step> {
    unsafe {
        loop {
            match sqlite3_step(**statement) {
                SQLITE_BUSY => continue,
                SQLITE_DONE => return Ok(Step::Done),
                SQLITE_ROW => {
                    let values = (0..labels.len() as c_int)
                        .map(|i| extract_value(**statement, i))
                        .collect::<Result<_>>()?;
                    return Ok(Step::Row(RowLabeled::new(labels.clone(), values)));
                }
                _ => return Err(last_error(**connection)),
            }
        }
    }
}

fn total_changes(connection: &CBox<*mut sqlite3>) -> i64 {
    unsafe { sqlite3_total_changes(**connection) as i64 }
}

fn affected(connection: &CBox<*mut sqlite3>, changes_before: i64) -> RowsAffected {
    let rows_affected = (total_changes(connection) - changes_before).max(0) as u64;
    RowsAffected {
        rows_affected,
        last_affected_id: (rows_affected > 0)
            .then(|| unsafe { sqlite3_last_insert_rowid(**connection) }),
    }
}

impl Executor for SqliteConnection {
    type Driver = SqliteDriver;

    fn driver(&self) -> &Self::Driver {
        &SqliteDriver {}
    }

    /// Runs every statement of `query` in order, rows are yielded as they
    /// are stepped and each statement without columns yields its count.
    fn run(&mut self, query: String) -> impl Stream<Item = Result<QueryResult>> + Send {
        let connection = CBox::new(*self.connection, |_| {});
        try_stream! {
            log::debug!("{}", truncate_long!(query));
            let context = Arc::new(format!("While running the query:\n{}", truncate_long!(query)));
            let sql = Arc::new(CString::new(query).context("The query contains a null byte")?);
            let len = sql.as_bytes().len();
            let mut offset = 0;
            while offset < len {
                let (statement, next) = {
                    let connection = CBox::new(*connection, |_| {});
                    let sql = sql.clone();
                    spawn_blocking(move || prepare(&connection, &sql, offset))
                        .await?
                        .with_context(|| context.clone())?
                };
                if next <= offset {
                    break;
                }
                offset = next;
                if statement.is_null() {
                    continue;
                }
                let labels = labels(&statement)?;
                let changes_before = total_changes(&connection);
                loop {
                    match step(&connection, &statement, &labels).with_context(|| context.clone())? {
                        Step::Row(row) => yield QueryResult::Row(row),
                        Step::Done => break,
                    }
                }
                if labels.is_empty() {
                    yield QueryResult::Affected(affected(&connection, changes_before));
                }
            }
        }
    }
}

impl Connection for SqliteConnection {
    /// Opens `sqlite://<path>`, `sqlite://:memory:` included. A path with
    /// query parameters (`?mode=rwc`) is opened as an SQLite URI.
    #[allow(refining_impl_trait)]
    async fn connect(url: Cow<'static, str>) -> Result<SqliteConnection> {
        let prefix = format!("{}://", <Self::Driver as Driver>::NAME);
        let Some(path) = url.strip_prefix(&prefix) else {
            return Err(Error::msg(format!(
                "Expected sqlite connection url to start with `{}`",
                &prefix
            )));
        };
        let path = if path.contains('?') && !path.starts_with("file:") {
            format!("file:{path}")
        } else {
            path.to_string()
        };
        let context = || format!("Error while decoding connection URL: `{}`", url);
        let path = CString::new(path).with_context(context)?;
        let mut connection = CBox::new(ptr::null_mut(), |p| unsafe {
            sqlite3_close(p);
        });
        let rc = unsafe {
            sqlite3_open_v2(
                path.as_ptr(),
                &mut *connection,
                SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE | SQLITE_OPEN_URI,
                ptr::null(),
            )
        };
        if rc != SQLITE_OK {
            let error = if connection.is_null() {
                Error::msg("Could not allocate the connection")
            } else {
                last_error(*connection)
            };
            let error = error.context(format!("While opening `{url}`"));
            log::error!("{:#}", error);
            return Err(error);
        }
        log::debug!("Connected to {url}");
        Ok(Self { connection })
    }
}
