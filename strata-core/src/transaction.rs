use crate::{
    Context, Driver, Error, Executor, QueryResult, Result, SqlWriter, panic_message,
    stream::Stream,
};
use std::{any::Any, future::Future};

/// Transaction opened on an executor.
///
/// The outermost one issues `BEGIN`, nested ones (a transaction opened on a
/// transaction) are savepoints named after their depth. It must be closed
/// with [`Transaction::commit`] or [`Transaction::rollback`].
pub struct Transaction<'c, X: Executor> {
    executor: &'c mut X,
    depth: usize,
}

fn savepoint_name(depth: usize) -> String {
    format!("sp_{depth}")
}

impl<'c, X: Executor> Transaction<'c, X> {
    pub fn new(executor: &'c mut X) -> impl Future<Output = Result<Self>> + Send {
        async move {
            let depth = executor.transaction_depth() + 1;
            let query = {
                let writer = executor.driver().sql_writer();
                let mut query = String::with_capacity(16);
                if depth == 1 {
                    writer.write_transaction_begin(&mut query);
                } else {
                    writer.write_savepoint(&mut query, &savepoint_name(depth));
                }
                query
            };
            log::debug!("{query}");
            executor
                .execute(query)
                .await
                .with_context(|| format!("While opening a transaction at depth {depth}"))?;
            Ok(Self { executor, depth })
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn commit(self) -> impl Future<Output = Result<()>> + Send {
        async move {
            let query = {
                let writer = self.executor.driver().sql_writer();
                let mut query = String::with_capacity(32);
                if self.depth == 1 {
                    writer.write_transaction_commit(&mut query);
                } else {
                    writer.write_savepoint_release(&mut query, &savepoint_name(self.depth));
                }
                query
            };
            log::debug!("{query}");
            self.executor
                .execute(query)
                .await
                .context("While committing the transaction")?;
            Ok(())
        }
    }

    pub fn rollback(self) -> impl Future<Output = Result<()>> + Send {
        async move {
            let query = {
                let writer = self.executor.driver().sql_writer();
                let mut query = String::with_capacity(64);
                if self.depth == 1 {
                    writer.write_transaction_rollback(&mut query);
                } else {
                    let name = savepoint_name(self.depth);
                    writer.write_savepoint_rollback(&mut query, &name);
                    query.push_str(";\n");
                    writer.write_savepoint_release(&mut query, &name);
                }
                query
            };
            log::debug!("{query}");
            self.executor
                .execute(query)
                .await
                .context("While rolling back the transaction")?;
            Ok(())
        }
    }

    /// Closes the transaction according to the outcome of the unit of work
    /// run inside it: commit on success, rollback on error or panic.
    ///
    /// A panic payload becomes an error carrying its message.
    pub fn settle<T: Send>(
        self,
        outcome: std::result::Result<Result<T>, Box<dyn Any + Send>>,
    ) -> impl Future<Output = Result<T>> + Send {
        let outcome = outcome.unwrap_or_else(|payload| {
            Err(Error::msg(format!(
                "Panic during the transaction: {}",
                panic_message(payload.as_ref())
            )))
        });
        async move {
            match outcome {
                Ok(value) => {
                    self.commit().await?;
                    Ok(value)
                }
                Err(error) => {
                    if let Err(e) = self.rollback().await {
                        log::error!("{:#}", e);
                    }
                    Err(error)
                }
            }
        }
    }
}

impl<'c, X: Executor> Executor for Transaction<'c, X> {
    type Driver = X::Driver;

    fn driver(&self) -> &Self::Driver {
        self.executor.driver()
    }

    fn transaction_depth(&self) -> usize {
        self.depth
    }

    fn run(&mut self, query: String) -> impl Stream<Item = Result<QueryResult>> + Send {
        self.executor.run(query)
    }
}
