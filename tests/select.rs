#[cfg(test)]
mod tests {
    use indoc::indoc;
    use strata::{Entity, FieldDef, GenericSqlWriter, ResourceModel, Select, Value};

    const WRITER: GenericSqlWriter = GenericSqlWriter;

    struct Product;

    static FIELDS: &[FieldDef] = &[
        FieldDef::new("id", Value::Int64(None)),
        FieldDef::new("sku", Value::Varchar(None)),
        FieldDef::new("name", Value::Varchar(None)).eav("varchar"),
        FieldDef::new("description", Value::Varchar(None)).eav("text"),
    ];

    impl Entity for Product {
        fn table_name() -> &'static str {
            "product"
        }
        fn fields() -> &'static [FieldDef] {
            FIELDS
        }
        fn primary_key() -> Option<&'static str> {
            Some("id")
        }
    }

    #[test]
    fn select_simple() {
        let mut select = Select::new();
        select.from("product", "", &[]);
        assert_eq!(select.assemble().unwrap(), "SELECT product.*\nFROM product");

        select
            .from("product", "p", &[("", "sku"), ("total", "price * quantity")])
            .where_("p.price > 10")
            .where_("p.sku LIKE 'A%'")
            .order("p.sku ASC")
            .order("p.id DESC")
            .limit(10)
            .offset(20);
        assert_eq!(
            select.assemble().unwrap(),
            indoc! {"
                SELECT p.sku, price * quantity AS total
                FROM product AS p
                WHERE (p.price > 10) AND (p.sku LIKE 'A%')
                ORDER BY p.sku ASC, p.id DESC
                LIMIT 10
                OFFSET 20
            "}
            .trim()
        );
    }

    #[test]
    fn select_joins() {
        let mut select = Select::new();
        select
            .from("orders", "o", &[])
            .inner_join("c", "customer", "c.id = o.customer_id", &[("customer", "name")])
            .left_join("a", "address", "a.id = c.address_id", &[])
            .left_join("c", "company", "c.id = o.company_id", &[("company", "name")]);
        assert!(select.has_join("a"));
        assert!(!select.has_join("x"));
        assert_eq!(
            select.assemble().unwrap(),
            indoc! {"
                SELECT o.*, c.name AS customer
                FROM orders AS o
                INNER JOIN customer AS c ON c.id = o.customer_id
                LEFT JOIN address AS a ON a.id = c.address_id
            "}
            .trim()
        );
    }

    #[test]
    fn select_count() {
        let mut select = Select::new();
        select.from("product", "e", &[]).where_("e.price > 1").limit(3).offset(3);
        assert_eq!(
            select.count_query(&WRITER).unwrap(),
            "SELECT COUNT(*) FROM (SELECT e.*\nFROM product AS e\nWHERE (e.price > 1)) AS t"
        );
        assert!(select.assemble().unwrap().ends_with("LIMIT 3\nOFFSET 3"));
    }

    #[test]
    fn select_reset() {
        let mut select = Select::new();
        assert!(select.assemble().is_err());
        select.from("", "e", &[]);
        assert!(select.assemble().is_err());
        select.from("product", "e", &[]).where_("e.id = 1").left_join(
            "x",
            "other",
            "x.id = e.id",
            &[],
        );
        select.reset();
        assert!(!select.has_join("x"));
        assert!(select.assemble().is_err());
        select.init().from("product", "e", &[]);
        assert_eq!(select.assemble().unwrap(), "SELECT e.*\nFROM product AS e");
    }

    #[test]
    fn eav_view() {
        let view = ResourceModel::<Product>::eav_view(&WRITER, "fr", "en").unwrap();
        assert_eq!(
            view,
            indoc! {"
                (SELECT m.*, COALESCE(e_name.value, e_name_default.value) AS name, COALESCE(e_description.value, e_description_default.value) AS description
                FROM product AS m
                LEFT JOIN product_varchar AS e_name_default ON e_name_default.entity_id = m.id AND e_name_default.locale = 'en' AND e_name_default.attribute_name = 'name'
                LEFT JOIN product_varchar AS e_name ON e_name.entity_id = m.id AND e_name.locale = 'fr' AND e_name.attribute_name = 'name'
                LEFT JOIN product_text AS e_description_default ON e_description_default.entity_id = m.id AND e_description_default.locale = 'en' AND e_description_default.attribute_name = 'description'
                LEFT JOIN product_text AS e_description ON e_description.entity_id = m.id AND e_description.locale = 'fr' AND e_description.attribute_name = 'description')
            "}
            .trim()
        );
        let model = ResourceModel::new(Product).with_locale("de", "en");
        assert!(
            model
                .eav_as_table(&WRITER)
                .unwrap()
                .contains("e_name.locale = 'de'")
        );
    }

    #[test]
    fn eav_view_custom() {
        struct Custom;
        static FIELDS: &[FieldDef] = &[FieldDef::new("title", Value::Varchar(None)).eav("varchar")];
        impl Entity for Custom {
            fn table_name() -> &'static str {
                "custom"
            }
            fn fields() -> &'static [FieldDef] {
                FIELDS
            }
            fn primary_key() -> Option<&'static str> {
                None
            }
            fn eav_table(
                _writer: &dyn strata::SqlWriter,
                locale: &str,
                _default_locale: &str,
            ) -> Option<String> {
                Some(format!("custom_{locale}"))
            }
        }
        assert_eq!(
            ResourceModel::<Custom>::eav_view(&WRITER, "it", "en").unwrap(),
            "custom_it"
        );
    }

    #[test]
    fn eav_view_without_primary_key() {
        struct Keyless;
        static FIELDS: &[FieldDef] = &[FieldDef::new("title", Value::Varchar(None)).eav("varchar")];
        impl Entity for Keyless {
            fn table_name() -> &'static str {
                "keyless"
            }
            fn fields() -> &'static [FieldDef] {
                FIELDS
            }
            fn primary_key() -> Option<&'static str> {
                None
            }
        }
        assert!(ResourceModel::<Keyless>::eav_view(&WRITER, "it", "en").is_err());
    }
}
