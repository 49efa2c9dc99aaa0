mod as_value;
mod collection;
mod connection;
mod driver;
mod entity;
mod executor;
mod field;
mod query;
mod registry;
mod resource;
mod select;
mod sql_writer;
mod table_model;
mod timezone;
mod transaction;
mod util;
mod value;

pub use ::anyhow::Context;
pub use as_value::*;
pub use collection::*;
pub use connection::*;
pub use driver::*;
pub use entity::*;
pub use executor::*;
pub use field::*;
pub use query::*;
pub use registry::*;
pub use resource::*;
pub use select::*;
pub use sql_writer::*;
pub use table_model::*;
pub use timezone::*;
pub use transaction::*;
pub use util::*;
pub use value::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
