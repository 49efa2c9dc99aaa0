use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};
use std::{fmt::Write, mem};
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, Time, format_description::BorrowedFormatItem,
    macros::format_description,
};
use uuid::Uuid;

/// Dynamically typed SQL value.
///
/// A variant carrying `None` doubles as a type tag: `Value::Int64(None)` is
/// how a [`FieldDef`](crate::FieldDef) declares an integer column.
#[derive(Default, Debug, Clone)]
pub enum Value {
    #[default]
    Null,
    Boolean(Option<bool>),
    Int8(Option<i8>),
    Int16(Option<i16>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    UInt8(Option<u8>),
    UInt16(Option<u16>),
    UInt32(Option<u32>),
    UInt64(Option<u64>),
    Float32(Option<f32>),
    Float64(Option<f64>),
    Decimal(Option<Decimal>),
    Varchar(Option<String>),
    Blob(Option<Box<[u8]>>),
    Date(Option<Date>),
    Time(Option<Time>),
    Timestamp(Option<PrimitiveDateTime>),
    Uuid(Option<Uuid>),
    List(Option<Vec<Value>>, /* type: */ Box<Value>),
}

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"
);
const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute]:[second][optional [.[subsecond]]]");

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        if self.is_null() || other.is_null() {
            return self.is_null() && other.is_null();
        }
        match (self, other) {
            (Self::Boolean(l), Self::Boolean(r)) => l == r,
            (Self::Int8(l), Self::Int8(r)) => l == r,
            (Self::Int16(l), Self::Int16(r)) => l == r,
            (Self::Int32(l), Self::Int32(r)) => l == r,
            (Self::Int64(l), Self::Int64(r)) => l == r,
            (Self::UInt8(l), Self::UInt8(r)) => l == r,
            (Self::UInt16(l), Self::UInt16(r)) => l == r,
            (Self::UInt32(l), Self::UInt32(r)) => l == r,
            (Self::UInt64(l), Self::UInt64(r)) => l == r,
            (Self::Float32(l), Self::Float32(r)) => l == r,
            (Self::Float64(l), Self::Float64(r)) => l == r,
            (Self::Decimal(l), Self::Decimal(r)) => l == r,
            (Self::Varchar(l), Self::Varchar(r)) => l == r,
            (Self::Blob(l), Self::Blob(r)) => l == r,
            (Self::Date(l), Self::Date(r)) => l == r,
            (Self::Time(l), Self::Time(r)) => l == r,
            (Self::Timestamp(l), Self::Timestamp(r)) => l == r,
            (Self::Uuid(l), Self::Uuid(r)) => l == r,
            (Self::List(l, ..), Self::List(r, ..)) => l == r && self.same_type(other),
            _ => false,
        }
    }
}

impl Value {
    /// True for `Value::Null` and for every variant carrying `None`.
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Boolean(v) => v.is_none(),
            Value::Int8(v) => v.is_none(),
            Value::Int16(v) => v.is_none(),
            Value::Int32(v) => v.is_none(),
            Value::Int64(v) => v.is_none(),
            Value::UInt8(v) => v.is_none(),
            Value::UInt16(v) => v.is_none(),
            Value::UInt32(v) => v.is_none(),
            Value::UInt64(v) => v.is_none(),
            Value::Float32(v) => v.is_none(),
            Value::Float64(v) => v.is_none(),
            Value::Decimal(v) => v.is_none(),
            Value::Varchar(v) => v.is_none(),
            Value::Blob(v) => v.is_none(),
            Value::Date(v) => v.is_none(),
            Value::Time(v) => v.is_none(),
            Value::Timestamp(v) => v.is_none(),
            Value::Uuid(v) => v.is_none(),
            Value::List(v, ..) => v.is_none(),
        }
    }

    pub fn same_type(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::List(.., l), Self::List(.., r)) => l.same_type(r),
            _ => mem::discriminant(self) == mem::discriminant(other),
        }
    }

    pub fn is_timestamp(&self) -> bool {
        matches!(self, Value::Timestamp(..))
    }

    /// Current UTC time truncated to whole seconds, the resolution every
    /// backend stores timestamps with.
    pub fn now() -> Value {
        let now = OffsetDateTime::now_utc();
        let time = now.time();
        let time = time.replace_nanosecond(0).unwrap_or(time);
        Value::Timestamp(Some(PrimitiveDateTime::new(now.date(), time)))
    }

    /// Converts `self` into the storage type tagged by `ty`.
    ///
    /// The conversion is lenient the same way database drivers are: numbers
    /// that fail to parse become zero, temporal values that fail to parse
    /// become NULL. NULL-like inputs always produce `Value::Null`, and a
    /// `Value::Null` tag leaves the value untouched.
    pub fn convert_to(self, ty: &Value) -> Value {
        if self.is_null() {
            return Value::Null;
        }
        match ty {
            Value::Null => self,
            Value::Boolean(..) => Value::Boolean(Some(self.lenient_bool())),
            Value::Int8(..) => Value::Int8(Some(self.lenient_i64() as i8)),
            Value::Int16(..) => Value::Int16(Some(self.lenient_i64() as i16)),
            Value::Int32(..) => Value::Int32(Some(self.lenient_i64() as i32)),
            Value::Int64(..) => Value::Int64(Some(self.lenient_i64())),
            Value::UInt8(..) => Value::UInt8(Some(self.lenient_u64() as u8)),
            Value::UInt16(..) => Value::UInt16(Some(self.lenient_u64() as u16)),
            Value::UInt32(..) => Value::UInt32(Some(self.lenient_u64() as u32)),
            Value::UInt64(..) => Value::UInt64(Some(self.lenient_u64())),
            Value::Float32(..) => Value::Float32(Some(self.lenient_f64() as f32)),
            Value::Float64(..) => Value::Float64(Some(self.lenient_f64())),
            Value::Decimal(..) => Value::Decimal(Some(self.lenient_decimal())),
            Value::Varchar(..) => match self {
                Value::Varchar(..) => self,
                _ => Value::Varchar(self.to_text()),
            },
            Value::Blob(..) => match self {
                Value::Blob(..) => self,
                _ => Value::Blob(self.to_text().map(|v| v.into_bytes().into())),
            },
            Value::Date(..) => match self {
                Value::Date(..) => self,
                Value::Timestamp(Some(v)) => Value::Date(Some(v.date())),
                _ => Value::Date(self.parse_text(|v| Date::parse(v, DATE_FORMAT).ok())),
            },
            Value::Time(..) => match self {
                Value::Time(..) => self,
                Value::Timestamp(Some(v)) => Value::Time(Some(v.time())),
                _ => Value::Time(self.parse_text(|v| Time::parse(v, TIME_FORMAT).ok())),
            },
            Value::Timestamp(..) => match self {
                Value::Timestamp(..) => self,
                Value::Date(Some(v)) => Value::Timestamp(Some(v.midnight())),
                _ => Value::Timestamp(self.parse_text(parse_timestamp)),
            },
            Value::Uuid(..) => match self {
                Value::Uuid(..) => self,
                _ => Value::Uuid(self.parse_text(|v| Uuid::parse_str(v).ok())),
            },
            Value::List(.., inner) => match self {
                Value::List(Some(values), ..) => Value::List(
                    Some(values.into_iter().map(|v| v.convert_to(inner)).collect()),
                    inner.clone(),
                ),
                v => Value::List(Some(vec![v.convert_to(inner)]), inner.clone()),
            },
        }
        .normalized()
    }

    /// Collapses every NULL-like variant into `Value::Null`.
    pub fn normalized(self) -> Value {
        if self.is_null() { Value::Null } else { self }
    }

    pub fn as_i64(&self) -> Option<i64> {
        if self.is_null() {
            None
        } else {
            Some(self.lenient_i64())
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        if self.is_null() {
            None
        } else {
            Some(self.lenient_f64())
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Varchar(Some(v)) => Some(v),
            _ => None,
        }
    }

    /// Textual rendering used when a value is converted to a string column.
    pub fn to_text(&self) -> Option<String> {
        Some(match self {
            Value::Null => return None,
            Value::Boolean(v) => String::from(if (*v)? { "1" } else { "0" }),
            Value::Int8(v) => v.as_ref()?.to_string(),
            Value::Int16(v) => v.as_ref()?.to_string(),
            Value::Int32(v) => v.as_ref()?.to_string(),
            Value::Int64(v) => v.as_ref()?.to_string(),
            Value::UInt8(v) => v.as_ref()?.to_string(),
            Value::UInt16(v) => v.as_ref()?.to_string(),
            Value::UInt32(v) => v.as_ref()?.to_string(),
            Value::UInt64(v) => v.as_ref()?.to_string(),
            Value::Float32(v) => v.as_ref()?.to_string(),
            Value::Float64(v) => v.as_ref()?.to_string(),
            Value::Decimal(v) => v.as_ref()?.to_string(),
            Value::Varchar(v) => v.clone()?,
            Value::Blob(v) => String::from_utf8_lossy(v.as_ref()?).into_owned(),
            Value::Date(v) => {
                let mut out = String::new();
                write_date(&mut out, v.as_ref()?);
                out
            }
            Value::Time(v) => {
                let mut out = String::new();
                write_time(&mut out, v.as_ref()?);
                out
            }
            Value::Timestamp(v) => {
                let v = v.as_ref()?;
                let mut out = String::new();
                write_date(&mut out, &v.date());
                out.push(' ');
                write_time(&mut out, &v.time());
                out
            }
            Value::Uuid(v) => v.as_ref()?.to_string(),
            Value::List(..) => return None,
        })
    }

    fn parse_text<T>(&self, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
        let text = self.to_text()?;
        let text = text.trim();
        if text.is_empty() { None } else { parse(text) }
    }

    fn lenient_bool(&self) -> bool {
        match self {
            Value::Boolean(Some(v)) => *v,
            Value::Varchar(Some(v)) => {
                let v = v.trim();
                v.eq_ignore_ascii_case("true") || v.parse::<f64>().is_ok_and(|v| v != 0.0)
            }
            _ => self.lenient_f64() != 0.0,
        }
    }

    fn lenient_i64(&self) -> i64 {
        match self {
            Value::Boolean(Some(v)) => *v as i64,
            Value::Int8(Some(v)) => *v as i64,
            Value::Int16(Some(v)) => *v as i64,
            Value::Int32(Some(v)) => *v as i64,
            Value::Int64(Some(v)) => *v,
            Value::UInt8(Some(v)) => *v as i64,
            Value::UInt16(Some(v)) => *v as i64,
            Value::UInt32(Some(v)) => *v as i64,
            Value::UInt64(Some(v)) => *v as i64,
            Value::Float32(Some(v)) => *v as i64,
            Value::Float64(Some(v)) => *v as i64,
            Value::Decimal(Some(v)) => v.to_i64().unwrap_or_default(),
            _ => self
                .parse_text(|v| {
                    v.parse::<i64>()
                        .ok()
                        .or_else(|| v.parse::<f64>().ok().map(|v| v as i64))
                })
                .unwrap_or_default(),
        }
    }

    fn lenient_u64(&self) -> u64 {
        match self {
            Value::UInt64(Some(v)) => *v,
            Value::Varchar(..) | Value::Blob(..) => self
                .parse_text(|v| v.parse::<u64>().ok())
                .unwrap_or_default(),
            _ => self.lenient_i64() as u64,
        }
    }

    fn lenient_f64(&self) -> f64 {
        match self {
            Value::Float32(Some(v)) => *v as f64,
            Value::Float64(Some(v)) => *v,
            Value::Decimal(Some(v)) => v.to_f64().unwrap_or_default(),
            Value::Varchar(..) | Value::Blob(..) => self
                .parse_text(|v| v.parse::<f64>().ok())
                .unwrap_or_default(),
            _ => self.lenient_i64() as f64,
        }
    }

    fn lenient_decimal(&self) -> Decimal {
        match self {
            Value::Decimal(Some(v)) => *v,
            Value::Float32(Some(v)) => Decimal::from_f32(*v).unwrap_or_default(),
            Value::Float64(Some(v)) => Decimal::from_f64(*v).unwrap_or_default(),
            Value::Varchar(..) | Value::Blob(..) => self
                .parse_text(|v| v.parse::<Decimal>().ok())
                .unwrap_or_default(),
            _ => Decimal::from(self.lenient_i64()),
        }
    }
}

/// Writes `YYYY-MM-DD`.
pub(crate) fn write_date(out: &mut String, value: &Date) {
    let _ = write!(
        out,
        "{:04}-{:02}-{:02}",
        value.year(),
        value.month() as u8,
        value.day()
    );
}

/// Writes `HH:MM:SS`, followed by the fraction only when there is one.
pub(crate) fn write_time(out: &mut String, value: &Time) {
    let _ = write!(
        out,
        "{:02}:{:02}:{:02}",
        value.hour(),
        value.minute(),
        value.second()
    );
    let mut subsecond = value.nanosecond();
    if subsecond != 0 {
        let mut width = 9;
        while subsecond % 10 == 0 {
            subsecond /= 10;
            width -= 1;
        }
        let _ = write!(out, ".{:0width$}", subsecond);
    }
}

fn parse_timestamp(value: &str) -> Option<PrimitiveDateTime> {
    let value = value.replacen('T', " ", 1);
    let value = value.trim_end_matches('Z');
    PrimitiveDateTime::parse(value, TIMESTAMP_FORMAT)
        .ok()
        .or_else(|| {
            Date::parse(value, DATE_FORMAT)
                .ok()
                .map(|v| v.midnight())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn null_variants_are_equal() {
        assert_eq!(Value::Null, Value::Int64(None));
        assert_eq!(Value::Varchar(None), Value::Timestamp(None));
        assert_ne!(Value::Null, Value::Int64(Some(0)));
    }

    #[test]
    fn convert_text_to_numbers() {
        assert_eq!(
            Value::Varchar(Some("42".into())).convert_to(&Value::Int32(None)),
            Value::Int32(Some(42))
        );
        assert_eq!(
            Value::Varchar(Some("not a number".into())).convert_to(&Value::Int64(None)),
            Value::Int64(Some(0))
        );
        assert_eq!(
            Value::Int64(Some(7)).convert_to(&Value::Float64(None)),
            Value::Float64(Some(7.0))
        );
    }

    #[test]
    fn convert_timestamps() {
        let expected = Value::Timestamp(Some(datetime!(2024-03-05 10:20:30)));
        assert_eq!(
            Value::Varchar(Some("2024-03-05 10:20:30".into())).convert_to(&Value::Timestamp(None)),
            expected
        );
        assert_eq!(
            Value::Varchar(Some("2024-03-05T10:20:30".into())).convert_to(&Value::Timestamp(None)),
            expected
        );
        assert_eq!(
            Value::Varchar(Some("".into())).convert_to(&Value::Timestamp(None)),
            Value::Null
        );
        assert_eq!(
            expected.clone().convert_to(&Value::Varchar(None)),
            Value::Varchar(Some("2024-03-05 10:20:30".into()))
        );
    }

    #[test]
    fn now_has_no_subseconds() {
        let Value::Timestamp(Some(now)) = Value::now() else {
            panic!("Value::now() must produce a timestamp");
        };
        assert_eq!(now.nanosecond(), 0);
    }
}
