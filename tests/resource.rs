#[cfg(test)]
mod tests {
    use strata::{Entity, FieldDef, FieldMap, ResourceModel, Value};

    #[derive(Default, Debug, Clone)]
    struct Customer {
        id: Option<i64>,
        email: String,
        score: f64,
    }

    static FIELDS: &[FieldDef] = &[
        FieldDef::new("id", Value::Int64(None)),
        FieldDef::new("email", Value::Varchar(None)),
        FieldDef::new("score", Value::Float64(None)),
        FieldDef::new("bio", Value::Varchar(None)).eav("text"),
    ];

    impl Entity for Customer {
        fn table_name() -> &'static str {
            "customer"
        }
        fn fields() -> &'static [FieldDef] {
            FIELDS
        }
        fn primary_key() -> Option<&'static str> {
            Some("id")
        }
        fn bind_field(&mut self, field: &str, value: &Value) {
            match field {
                "id" => self.id = value.as_i64(),
                "email" => self.email = value.as_str().unwrap_or_default().into(),
                "score" => self.score = value.as_f64().unwrap_or_default(),
                _ => {}
            }
        }
    }

    fn loaded() -> ResourceModel<Customer> {
        let mut model = ResourceModel::new(Customer::default()).with_locale("en", "en");
        model.load_db_data(FieldMap::from([
            ("id".to_string(), Value::Int64(Some(4))),
            ("email".to_string(), Value::Varchar(Some("a@b.c".into()))),
            ("score".to_string(), Value::Varchar(Some("7.5".into()))),
        ]));
        model
    }

    #[test]
    fn set_data_converts() {
        let mut model = ResourceModel::new(Customer::default());
        model.set_data("SCORE", "12.25").set_data("Email", "x@y.z");
        assert_eq!(model.get_data("score"), &Value::Float64(Some(12.25)));
        assert_eq!(model.get_data("EMAIL"), &Value::Varchar(Some("x@y.z".into())));
        assert_eq!(model.entity().score, 12.25);
        assert_eq!(model.entity().email, "x@y.z");
        assert!(model.get_data("missing").is_null());
        model.set_data("extra", 3);
        assert_eq!(model.get_data("extra"), &Value::Int32(Some(3)));
    }

    #[test]
    fn dirty_tracking() {
        let mut model = ResourceModel::new(Customer::default());
        assert!(!model.has_data_change());
        model.set_data("email", "x@y.z");
        assert!(model.has_data_change());

        let mut model = loaded();
        assert!(!model.has_data_change());
        assert_eq!(model.get_data("score"), &Value::Float64(Some(7.5)));
        assert!(model.get_data("bio").is_null());
        assert_eq!(model.entity().id, Some(4));
        model.set_data("score", 7.5);
        assert!(!model.has_data_change());
        model.set_data("extra", "not declared");
        assert!(!model.has_data_change());
        model.set_data("bio", "Hello");
        assert!(model.has_data_change());
        model.set_data("bio", Value::Null);
        assert!(!model.has_data_change());
        model.set_data("id", "4");
        assert!(!model.has_data_change());
    }

    #[test]
    fn snapshot_restore() {
        let mut model = loaded();
        let snapshot = model.snapshot();
        model.set_data("email", "changed@b.c").set_data("id", 9);
        assert_eq!(model.entity().email, "changed@b.c");
        model.restore(snapshot);
        assert!(!model.has_data_change());
        assert_eq!(model.entity().email, "a@b.c");
        assert_eq!(model.entity().id, Some(4));
    }

    #[test]
    fn db_data() {
        let mut model = loaded();
        model.set_data("bio", "Hello").set_data("extra", 1);
        let data = model.db_data(false);
        assert_eq!(
            data.keys().map(String::as_str).collect::<Vec<_>>(),
            ["bio", "email", "id", "score"]
        );
        let data = model.db_data(true);
        assert!(!data.contains_key("bio"));
        assert!(!data.contains_key("extra"));
        model.reset();
        assert!(model.data().is_empty());
        assert!(model.origin().is_empty());
    }

    #[test]
    fn origin_data() {
        let mut model = ResourceModel::new(Customer::default());
        model.set_origin_data("email", "old@b.c");
        assert_eq!(
            model.get_origin_data("email"),
            &Value::Varchar(Some("old@b.c".into()))
        );
        assert!(model.has_data_change());
        model.set_data("email", "old@b.c");
        assert!(!model.has_data_change());
    }
}
