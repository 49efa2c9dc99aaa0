#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use strata::{FieldMap, GenericSqlWriter, SqlWriter, Value};
    use time::macros::datetime;
    use uuid::Uuid;

    const WRITER: GenericSqlWriter = GenericSqlWriter;

    fn row<const N: usize>(values: [(&str, Value); N]) -> FieldMap {
        values.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    fn value(value: impl Into<Value>) -> String {
        let mut out = String::new();
        WRITER.write_value(&mut out, &value.into());
        out
    }

    #[test]
    fn values() {
        assert_eq!(value(Value::Null), "NULL");
        assert_eq!(value(Value::Int32(None)), "NULL");
        assert_eq!(value(true), "true");
        assert_eq!(value(-12i16), "-12");
        assert_eq!(value(2.5f64), "2.5");
        assert_eq!(value(10.0f64), "10.0");
        assert_eq!(value(f64::NAN), "NULL");
        assert_eq!(value(f64::INFINITY), "CAST('Infinity' AS DOUBLE)");
        assert_eq!(value(f64::NEG_INFINITY), "CAST('-Infinity' AS DOUBLE)");
        assert_eq!(value(Decimal::from_str("19.990").unwrap()), "19.990");
        assert_eq!(value("it's"), "'it''s'");
        assert_eq!(value(datetime!(2024-01-02 03:04:05)), "'2024-01-02 03:04:05'");
        assert_eq!(
            value(Uuid::from_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap()),
            "'67e55044-10b1-426f-9247-bb680e5fe0c8'"
        );
        assert_eq!(value(vec![1i32, 2, 3]), "1, 2, 3");
    }

    #[test]
    fn identifiers() {
        let mut out = String::new();
        WRITER.write_identifier_quoted(&mut out, r#"odd"name"#);
        assert_eq!(out, r#""odd""name""#);
    }

    #[test]
    fn expr() {
        let mut out = String::new();
        WRITER
            .write_expr(
                &mut out,
                "name = ? AND note <> '?' AND id IN (?)",
                &["Chair".into(), vec![1i64, 2].into()],
            )
            .unwrap();
        assert_eq!(out, "name = 'Chair' AND note <> '?' AND id IN (1, 2)");

        let mut out = String::new();
        assert!(WRITER.write_expr(&mut out, "a = ? AND b = ?", &[1.into()]).is_err());
        let mut out = String::new();
        assert!(WRITER.write_expr(&mut out, "a = ?", &[1.into(), 2.into()]).is_err());
    }

    #[test]
    fn insert() {
        let mut out = String::new();
        WRITER.write_insert(
            &mut out,
            "product",
            &[
                row([("sku", "a".into()), ("price", 1.5.into())]),
                row([("sku", "b".into())]),
            ],
        );
        assert_eq!(
            out,
            indoc! {r#"
                INSERT INTO "product" ("price", "sku") VALUES
                (1.5, 'a'),
                (DEFAULT, 'b')
            "#}
            .trim()
        );

        let mut out = String::new();
        WRITER.write_insert(&mut out, "product", &[FieldMap::new()]);
        assert_eq!(out, r#"INSERT INTO "product" DEFAULT VALUES"#);
    }

    #[test]
    fn upsert() {
        let mut out = String::new();
        WRITER.write_upsert(
            &mut out,
            "product_varchar",
            &[row([
                ("entity_id", 7.into()),
                ("locale", "fr".into()),
                ("attribute_name", "name".into()),
                ("value", "Chaise".into()),
            ])],
            &["entity_id", "locale", "attribute_name"],
        );
        assert_eq!(
            out,
            indoc! {r#"
                INSERT INTO "product_varchar" ("attribute_name", "entity_id", "locale", "value") VALUES
                ('name', 7, 'fr', 'Chaise')
                ON CONFLICT ("entity_id", "locale", "attribute_name") DO UPDATE SET
                "value" = excluded."value"
            "#}
            .trim()
        );
    }

    #[test]
    fn update_and_delete() {
        let mut out = String::new();
        WRITER.write_update(
            &mut out,
            "product",
            &row([("price", 9.5.into()), ("sku", "x".into())]),
            "id = 3",
        );
        assert_eq!(
            out,
            indoc! {r#"
                UPDATE "product" SET "price" = 9.5, "sku" = 'x'
                WHERE id = 3
            "#}
            .trim()
        );

        let mut out = String::new();
        WRITER.write_delete(&mut out, "product", "id = 3");
        assert_eq!(out, "DELETE FROM \"product\"\nWHERE id = 3");
    }

    #[test]
    fn transactions() {
        let mut out = String::new();
        WRITER.write_transaction_begin(&mut out);
        out.push(';');
        WRITER.write_savepoint(&mut out, "sp_2");
        out.push(';');
        WRITER.write_savepoint_rollback(&mut out, "sp_2");
        out.push(';');
        WRITER.write_savepoint_release(&mut out, "sp_2");
        out.push(';');
        WRITER.write_transaction_commit(&mut out);
        assert_eq!(
            out,
            "BEGIN;SAVEPOINT sp_2;ROLLBACK TO SAVEPOINT sp_2;RELEASE SAVEPOINT sp_2;COMMIT"
        );
    }
}
