use crate::{Error, Result, Value};
use time::{
    PrimitiveDateTime, UtcOffset, format_description::BorrowedFormatItem,
    macros::format_description,
};
use time_tz::{OffsetDateTimeExt, PrimitiveDateTimeExt, TimeZone, Tz, timezones};

const OFFSET_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[offset_hour sign:mandatory]:[offset_minute]");

/// Time zone a wall clock timestamp is read or written in.
///
/// Parsed from an IANA name (`Europe/Rome`), a fixed offset (`+05:30`), or
/// `UTC` and the empty string for UTC itself.
#[derive(Debug, Clone, Copy)]
pub enum Zone {
    Utc,
    Fixed(UtcOffset),
    Named(&'static Tz),
}

impl Zone {
    pub fn parse(name: &str) -> Result<Zone> {
        let name = name.trim();
        if name.is_empty() || name.eq_ignore_ascii_case("utc") || name == "Z" {
            return Ok(Zone::Utc);
        }
        if name.starts_with(['+', '-']) {
            return UtcOffset::parse(name, OFFSET_FORMAT)
                .map(Zone::Fixed)
                .map_err(|e| Error::msg(format!("Invalid UTC offset `{name}`: {e}")));
        }
        timezones::get_by_name(name)
            .map(Zone::Named)
            .ok_or_else(|| Error::msg(format!("Unknown time zone `{name}`")))
    }

    /// The UTC instant of the wall clock `value` read in this zone.
    ///
    /// A time repeated by a daylight saving change resolves to its first
    /// occurrence, a time skipped by it is an error.
    pub fn to_utc(&self, value: PrimitiveDateTime) -> Result<PrimitiveDateTime> {
        let instant = match self {
            Zone::Utc => return Ok(value),
            Zone::Fixed(offset) => value.assume_offset(*offset),
            Zone::Named(tz) => value.assume_timezone(*tz).take_first().ok_or_else(|| {
                Error::msg(format!("The time {value} does not exist in `{}`", tz.name()))
            })?,
        }
        .to_offset(UtcOffset::UTC);
        Ok(PrimitiveDateTime::new(instant.date(), instant.time()))
    }

    /// The wall clock of this zone at the UTC instant `value`.
    pub fn to_local(&self, value: PrimitiveDateTime) -> PrimitiveDateTime {
        let local = match self {
            Zone::Utc => return value,
            Zone::Fixed(offset) => value.assume_utc().to_offset(*offset),
            Zone::Named(tz) => value.assume_utc().to_timezone(*tz),
        };
        PrimitiveDateTime::new(local.date(), local.time())
    }
}

/// `value` read as a timestamp, `None` when it is NULL or empty text.
fn timestamp_of(value: &Value) -> Result<Option<PrimitiveDateTime>> {
    if value.is_null() || value.as_str().is_some_and(|v| v.trim().is_empty()) {
        return Ok(None);
    }
    match value.clone().convert_to(&Value::Timestamp(None)) {
        Value::Timestamp(Some(v)) => Ok(Some(v)),
        _ => Err(Error::msg(format!("{value:?} is not a timestamp"))),
    }
}

impl Value {
    /// Reads `self` as a wall clock time of `zone` and returns it in UTC.
    ///
    /// Accepts timestamps, dates and their text form. NULL and empty text
    /// give `Value::Null`.
    ///
    /// # Examples
    /// ```rust
    /// use strata_core::Value;
    /// let utc = Value::from("2024-07-01 12:00:00").locale_to_utc("Europe/Rome").unwrap();
    /// assert_eq!(utc.to_text().as_deref(), Some("2024-07-01 10:00:00"));
    /// ```
    pub fn locale_to_utc(&self, zone: &str) -> Result<Value> {
        let Some(value) = timestamp_of(self)? else {
            return Ok(Value::Null);
        };
        Ok(Value::Timestamp(Some(Zone::parse(zone)?.to_utc(value)?)))
    }

    /// Reads `self` as a UTC time and returns the wall clock of `zone`.
    pub fn utc_to_locale(&self, zone: &str) -> Result<Value> {
        let Some(value) = timestamp_of(self)? else {
            return Ok(Value::Null);
        };
        Ok(Value::Timestamp(Some(Zone::parse(zone)?.to_local(value))))
    }
}
