mod collection;
mod coupon;
mod hooks;
mod keyless;
mod product;
mod savepoint;

use crate::{
    collection::collection, coupon::coupon, hooks::hooks, keyless::keyless, product::product,
    savepoint::savepoint,
};
use log::LevelFilter;
use std::env;
use strata::{Connection, Driver, Executor, Registry};

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Runs every suite on the connection registered as `default`.
pub async fn execute_tests<C: Connection>(registry: Registry<C>) {
    product(&registry).await;
    collection(&registry).await;
    keyless(&registry).await;
    coupon(&registry).await;
    hooks(&registry).await;
    savepoint(&registry).await;
}

/// Column definition of an auto generated integer primary key.
pub fn serial_primary_key<C: Connection>() -> &'static str {
    match <C::Driver as Driver>::NAME {
        "sqlite" => "INTEGER PRIMARY KEY AUTOINCREMENT",
        _ => "BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY",
    }
}

pub async fn execute<C: Connection>(registry: &Registry<C>, sql: impl Into<String>) {
    let sql = sql.into();
    let connection = registry
        .get("default")
        .expect("The default connection is not registered");
    let mut connection = connection.lock().await;
    connection
        .execute(sql.clone())
        .await
        .unwrap_or_else(|e| panic!("Failed to execute:\n{sql}\n{e:#}"));
}

/// First column of the first row of `sql` as an integer, 0 when missing.
pub async fn fetch_i64<C: Connection>(registry: &Registry<C>, sql: impl Into<String>) -> i64 {
    let sql = sql.into();
    let connection = registry
        .get("default")
        .expect("The default connection is not registered");
    let mut connection = connection.lock().await;
    connection
        .fetch_one(sql.clone())
        .await
        .unwrap_or_else(|e| panic!("Failed to fetch:\n{sql}\n{e:#}"))
        .and_then(|v| v.as_i64())
        .unwrap_or_default()
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
