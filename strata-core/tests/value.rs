#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use strata_core::{AsValue, Value, Zone};
    use time::macros::{date, datetime, time};
    use uuid::Uuid;

    #[test]
    fn value_none() {
        assert_eq!(Value::Null, Value::Null);
        assert_eq!(Value::Null, Value::Varchar(None));
        assert_ne!(Value::Float32(Some(1.0)), Value::Null);
        assert!(Value::List(None, Box::new(Value::Int32(None))).is_null());
    }

    #[test]
    fn value_bool() {
        let val: Value = true.into();
        assert_eq!(val, Value::Boolean(Some(true)));
        assert_ne!(val, Value::Boolean(Some(false)));
        assert_ne!(val, Value::Varchar(Some("true".into())));
        assert_eq!(bool::try_from_value(1i8.into()).unwrap(), true);
        assert_eq!(bool::try_from_value(0i32.into()).unwrap(), false);
        assert_eq!(bool::try_from_value("true".into()).unwrap(), true);
        assert_eq!(bool::try_from_value("0".into()).unwrap(), false);
        assert!(bool::try_from_value(Value::Null).is_err());
    }

    #[test]
    fn value_integers() {
        assert_eq!(i64::try_from_value(42i8.into()).unwrap(), 42);
        assert_eq!(i32::try_from_value(" 17 ".into()).unwrap(), 17);
        assert_eq!(i64::try_from_value("25.9".into()).unwrap(), 25);
        assert_eq!(i64::try_from_value("not a number".into()).unwrap(), 0);
        assert_eq!(u8::try_from_value(true.into()).unwrap(), 1);
        assert_eq!(u64::try_from_value("18446744073709551615".into()).unwrap(), u64::MAX);
        assert_eq!(
            Option::<i64>::try_from_value(Value::Int64(None)).unwrap(),
            None
        );
        assert_eq!(Option::<i64>::try_from_value(5i64.into()).unwrap(), Some(5));
    }

    #[test]
    fn value_floats() {
        assert_eq!(f64::try_from_value("2.5".into()).unwrap(), 2.5);
        assert_eq!(f64::try_from_value(3i32.into()).unwrap(), 3.0);
        assert_eq!(
            f64::try_from_value(Decimal::from_str("1.25").unwrap().into()).unwrap(),
            1.25
        );
        assert_eq!(
            Decimal::try_from_value("19.99".into()).unwrap(),
            Decimal::from_str("19.99").unwrap()
        );
    }

    #[test]
    fn value_text() {
        assert_eq!(String::try_from_value(12i64.into()).unwrap(), "12");
        assert_eq!(String::try_from_value(false.into()).unwrap(), "0");
        assert_eq!(
            String::try_from_value(date!(2024 - 02 - 29).into()).unwrap(),
            "2024-02-29"
        );
        assert_eq!(
            String::try_from_value(time!(08:15:00.25).into()).unwrap(),
            "08:15:00.25"
        );
        let id = Uuid::from_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(
            String::try_from_value(id.into()).unwrap(),
            "67e55044-10b1-426f-9247-bb680e5fe0c8"
        );
        assert_eq!(
            Uuid::try_from_value("67e55044-10b1-426f-9247-bb680e5fe0c8".into()).unwrap(),
            id
        );
        assert!(Uuid::try_from_value("not an uuid".into()).is_err());
    }

    #[test]
    fn value_temporal() {
        assert_eq!(
            time::Date::try_from_value("2024-03-05".into()).unwrap(),
            date!(2024 - 03 - 05)
        );
        assert_eq!(
            time::PrimitiveDateTime::try_from_value("2024-03-05".into()).unwrap(),
            datetime!(2024-03-05 00:00:00)
        );
        assert_eq!(
            time::PrimitiveDateTime::try_from_value("2024-03-05T10:20:30.5Z".into()).unwrap(),
            datetime!(2024-03-05 10:20:30.5)
        );
        assert_eq!(
            time::Date::try_from_value(datetime!(2024-03-05 10:20:30).into()).unwrap(),
            date!(2024 - 03 - 05)
        );
        assert!(time::Date::try_from_value("yesterday".into()).is_err());
    }

    #[test]
    fn value_list() {
        let val: Value = vec![1i32, 2, 3].into();
        assert!(matches!(&val, Value::List(Some(v), ..) if v.len() == 3));
        assert_ne!(
            val,
            Value::List(Some(vec![1i64.into()]), Box::new(Value::Int64(None)))
        );
        let back: Vec<i64> = AsValue::try_from_value(
            val.convert_to(&Value::List(None, Box::new(Value::Int64(None)))),
        )
        .unwrap();
        assert_eq!(back, [1, 2, 3]);
        let single = Value::from("a").convert_to(&Vec::<String>::as_empty_value());
        assert_eq!(Vec::<String>::try_from_value(single).unwrap(), ["a"]);
    }

    #[test]
    fn value_now() {
        let now = time::PrimitiveDateTime::try_from_value(Value::now()).unwrap();
        assert_eq!(now.nanosecond(), 0);
    }

    #[test]
    fn value_locale_to_utc() {
        let utc = Value::from("2024-07-01 12:00:00")
            .locale_to_utc("Europe/Rome")
            .unwrap();
        assert_eq!(utc, Value::Timestamp(Some(datetime!(2024-07-01 10:00:00))));
        let utc = Value::Timestamp(Some(datetime!(2024-01-15 08:30:00)))
            .locale_to_utc("Europe/Rome")
            .unwrap();
        assert_eq!(utc.to_text().as_deref(), Some("2024-01-15 07:30:00"));
        let utc = Value::from("2024-03-10 00:15:00")
            .locale_to_utc("+05:30")
            .unwrap();
        assert_eq!(utc.to_text().as_deref(), Some("2024-03-09 18:45:00"));
        let same = Value::from("2024-03-10 00:15:00").locale_to_utc("UTC").unwrap();
        assert_eq!(same.to_text().as_deref(), Some("2024-03-10 00:15:00"));
        let same = Value::from("2024-03-10 00:15:00").locale_to_utc("").unwrap();
        assert_eq!(same.to_text().as_deref(), Some("2024-03-10 00:15:00"));
    }

    #[test]
    fn value_utc_to_locale() {
        let local = Value::from("2024-07-01 10:00:00")
            .utc_to_locale("America/New_York")
            .unwrap();
        assert_eq!(local.to_text().as_deref(), Some("2024-07-01 06:00:00"));
        let local = Value::Date(Some(date!(2024-07-01)))
            .utc_to_locale("Asia/Tokyo")
            .unwrap();
        assert_eq!(local, Value::Timestamp(Some(datetime!(2024-07-01 09:00:00))));
        let local = Value::from("2024-12-31 23:00:00")
            .utc_to_locale("-03:00")
            .unwrap();
        assert_eq!(local.to_text().as_deref(), Some("2024-12-31 20:00:00"));
        let back = local.locale_to_utc("-03:00").unwrap();
        assert_eq!(back.to_text().as_deref(), Some("2024-12-31 23:00:00"));
    }

    #[test]
    fn value_timezone_edge_cases() {
        assert!(Value::Null.locale_to_utc("Europe/Rome").unwrap().is_null());
        assert!(Value::from("").utc_to_locale("Europe/Rome").unwrap().is_null());
        assert!(Value::from("  ").locale_to_utc("Nowhere/Invalid").unwrap().is_null());
        let error = Value::from("2024-07-01 10:00:00")
            .utc_to_locale("Nowhere/Invalid")
            .unwrap_err();
        assert!(format!("{error}").contains("Unknown time zone"), "{error}");
        let error = Value::from("2024-07-01 10:00:00")
            .locale_to_utc("+ab:00")
            .unwrap_err();
        assert!(format!("{error}").contains("Invalid UTC offset"), "{error}");
        assert!(Value::from("yesterday").locale_to_utc("UTC").is_err());
    }

    #[test]
    fn zone_parse() {
        assert!(matches!(Zone::parse("utc").unwrap(), Zone::Utc));
        assert!(matches!(Zone::parse(" Z ").unwrap(), Zone::Utc));
        assert!(matches!(Zone::parse("+02:00").unwrap(), Zone::Fixed(..)));
        assert!(matches!(Zone::parse("Europe/Rome").unwrap(), Zone::Named(..)));
        let zone = Zone::parse("Europe/Rome").unwrap();
        assert_eq!(
            zone.to_local(zone.to_utc(datetime!(2024-07-01 12:00:00)).unwrap()),
            datetime!(2024-07-01 12:00:00)
        );
    }
}
