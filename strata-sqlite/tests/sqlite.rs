#[cfg(test)]
mod tests {
    use std::{path::Path, sync::Mutex};
    use strata_core::{Connection, Driver, Executor, FieldMap, Registry, Value};
    use strata_sqlite::{SqliteConnection, SqliteDriver};
    use strata_tests::{execute_tests, init_logs, silent_logs};
    use tokio::fs;

    static MUTEX: Mutex<()> = Mutex::new(());

    #[tokio::test]
    async fn sqlite() {
        init_logs();
        const DB_PATH: &'static str = "../target/debug/tests.sqlite";
        let _guard = MUTEX.lock().unwrap();
        if Path::new(DB_PATH).exists() {
            fs::remove_file(DB_PATH).await.expect(
                format!("Failed to remove existing test database file {}", DB_PATH).as_str(),
            );
        }
        assert!(
            !Path::new(DB_PATH).exists(),
            "Database file should not exist before test"
        );
        let driver = SqliteDriver::default();
        let connection = driver
            .connect(format!("sqlite://{}?mode=rwc", DB_PATH).into())
            .await
            .expect("Could not open the database");
        assert!(
            Path::new(DB_PATH).exists(),
            "Database file should be created after connection"
        );
        let registry = Registry::new();
        registry.add("default", connection);
        execute_tests(registry).await;
    }

    #[tokio::test]
    async fn memory() {
        init_logs();
        let registry = Registry::<SqliteConnection>::new();
        registry
            .connect("default", "sqlite://:memory:")
            .await
            .expect("Could not open the in memory database");
        assert!(registry.contains("default"));
        execute_tests(registry).await;
    }

    #[tokio::test]
    async fn create_database() {
        init_logs();
        const DB_PATH: &'static str = "../target/debug/creation.sqlite";
        let _guard = MUTEX.lock().unwrap();
        if Path::new(DB_PATH).exists() {
            fs::remove_file(DB_PATH)
                .await
                .expect(format!("Failed to remove test database file {}", DB_PATH).as_str());
        }
        SqliteConnection::connect(format!("sqlite://{}?mode=rwc", DB_PATH).into())
            .await
            .expect("Could not open the database");
        assert!(
            Path::new(DB_PATH).exists(),
            "Database file should be created after connection"
        );
        SqliteConnection::connect(format!("sqlite://{}?mode=ro", DB_PATH).into())
            .await
            .expect("Could not open the database");
        fs::remove_file(DB_PATH)
            .await
            .expect(format!("Failed to remove existing test database file {}", DB_PATH).as_str());
        silent_logs! {
            assert!(
                SqliteConnection::connect(format!("sqlite://{}?mode=ro", DB_PATH).into())
                    .await
                    .is_err(),
                "Should not be able to open in read only unexisting database"
            );
        }
    }

    #[tokio::test]
    async fn wrong_url() {
        silent_logs! {
            assert!(
                SqliteConnection::connect("mysql://some_value".into())
                    .await
                    .is_err()
            );
        };
    }

    #[tokio::test]
    async fn statements() {
        init_logs();
        let mut connection = SqliteConnection::connect("sqlite://:memory:".into())
            .await
            .expect("Could not open the in memory database");
        let result = connection
            .execute(
                "CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT);
                INSERT INTO t (v) VALUES ('a'), ('b');
                -- trailing comment"
                    .into(),
            )
            .await
            .expect("Could not run the statements");
        assert_eq!(result.rows_affected, 2);
        let rows = connection
            .fetch_all("SELECT id, v FROM t ORDER BY id".into())
            .await
            .expect("Could not fetch the rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].names(), ["id", "v"]);
        assert_eq!(
            rows[1].get_column("v").and_then(|v| v.as_str()),
            Some("b")
        );
        let id = connection
            .insert("t", &FieldMap::from([("v".to_string(), Value::from("c"))]))
            .await
            .expect("Could not insert");
        assert_eq!(id, 3);
        let updated = connection
            .execute("UPDATE t SET v = 'z' WHERE id > 100".into())
            .await
            .expect("Could not update");
        assert_eq!(updated.rows_affected, 0);
        assert_eq!(updated.last_affected_id, None);
        silent_logs! {
            let error = connection
                .execute("SELECT * FROM missing".into())
                .await
                .expect_err("Expected a missing table error");
            let error = format!("{error:#}");
            assert!(error.contains("no such table: missing"), "{error}");
        }
    }
}
