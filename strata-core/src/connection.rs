use crate::{Executor, Result};
use std::{borrow::Cow, future::Future};

/// A physical connection to a database.
pub trait Connection: Executor {
    /// Opens a connection to the database at `url`.
    fn connect(url: Cow<'static, str>) -> impl Future<Output = Result<Self>> + Send;
}
