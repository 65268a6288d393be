use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};

use crate::codec::{Context, ParquetType};
use crate::descriptor::{Primitive, TypeDescriptor};
use crate::error::{Error, Result};
use crate::policy::TimestampFormat;
use crate::schema::TimeUnit;
use crate::value::Value;

/// Julian day number of 1970-01-01.
pub const JULIAN_UNIX_EPOCH: i64 = 2_440_588;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

fn epoch_date() -> NaiveDate {
    DateTime::<Utc>::UNIX_EPOCH.date_naive()
}

pub(crate) fn days_since_epoch(date: &NaiveDate) -> i64 {
    date.signed_duration_since(epoch_date()).num_days()
}

fn date_from_days(days: i64) -> Option<NaiveDate> {
    if days >= 0 {
        epoch_date().checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        epoch_date().checked_sub_days(Days::new(days.unsigned_abs()))
    }
}

/// Offset from the Unix epoch in `unit`. `None` when nanoseconds leave the
/// i64 range.
pub fn epoch_offset(instant: &DateTime<Utc>, unit: TimeUnit) -> Option<i64> {
    match unit {
        TimeUnit::Millis => Some(instant.timestamp_millis()),
        TimeUnit::Micros => Some(instant.timestamp_micros()),
        TimeUnit::Nanos => instant.timestamp_nanos_opt(),
    }
}

fn from_epoch_offset(offset: i64, unit: TimeUnit) -> Option<DateTime<Utc>> {
    match unit {
        TimeUnit::Millis => DateTime::from_timestamp_millis(offset),
        TimeUnit::Micros => DateTime::from_timestamp_micros(offset),
        TimeUnit::Nanos => Some(DateTime::from_timestamp_nanos(offset)),
    }
}

/// INT96 layout: nanoseconds of day (i64 LE) then Julian day (i32 LE).
pub(crate) fn to_int96(instant: &DateTime<Utc>) -> Result<[u8; 12]> {
    let julian = days_since_epoch(&instant.date_naive()) + JULIAN_UNIX_EPOCH;
    let julian = i32::try_from(julian)
        .map_err(|_| Error::overflow(format!("{instant} outside int96 day range")))?;
    let time = instant.time();
    let nanos = i64::from(time.num_seconds_from_midnight()) * NANOS_PER_SECOND
        + i64::from(time.nanosecond());
    let mut out = [0u8; 12];
    out[..8].copy_from_slice(&nanos.to_le_bytes());
    out[8..].copy_from_slice(&julian.to_le_bytes());
    Ok(out)
}

fn from_int96(bytes: &[u8]) -> Option<DateTime<Utc>> {
    let nanos = i64::from_le_bytes(bytes.get(..8)?.try_into().ok()?);
    let julian = i32::from_le_bytes(bytes.get(8..12)?.try_into().ok()?);
    let date = date_from_days(i64::from(julian) - JULIAN_UNIX_EPOCH)?;
    let secs = u32::try_from(nanos.div_euclid(NANOS_PER_SECOND)).ok()?;
    let subsec = u32::try_from(nanos.rem_euclid(NANOS_PER_SECOND)).ok()?;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, subsec)?;
    Some(date.and_time(time).and_utc())
}

pub(crate) fn encode_instant(instant: &DateTime<Utc>, format: TimestampFormat) -> Result<Value> {
    match format.time_unit() {
        None => Ok(Value::binary(to_int96(instant)?.to_vec())),
        Some(unit) => epoch_offset(instant, unit)
            .map(Value::Int64)
            .ok_or_else(|| Error::overflow(format!("{instant} exceeds int64 nanoseconds"))),
    }
}

fn decode_instant(value: Value, format: TimestampFormat) -> Result<DateTime<Utc>> {
    let decoded = match (&value, format.time_unit()) {
        (Value::Binary(bytes), _) if bytes.len() == 12 => from_int96(bytes),
        (Value::Int64(offset), Some(unit)) => from_epoch_offset(*offset, unit),
        _ => return Err(Error::decode_mismatch(timestamp_label(format), &value)),
    };
    decoded.ok_or_else(|| Error::decode_mismatch("timestamp in range", &value))
}

fn timestamp_label(format: TimestampFormat) -> &'static str {
    match format {
        TimestampFormat::Int96 => "int96 timestamp",
        TimestampFormat::Int64Millis => "int64 millisecond timestamp",
        TimestampFormat::Int64Micros => "int64 microsecond timestamp",
        TimestampFormat::Int64Nanos => "int64 nanosecond timestamp",
    }
}

impl ParquetType for NaiveDate {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::primitive::<Self>(Primitive::Date)
    }

    fn encode_value(&self, _ctx: &Context<'_>) -> Result<Value> {
        i32::try_from(days_since_epoch(self))
            .map(Value::Int32)
            .map_err(|_| Error::overflow(format!("{self} outside int32 day range")))
    }

    fn decode_value(value: Value, _ctx: &Context<'_>) -> Result<Self> {
        match value {
            Value::Int32(days) => date_from_days(i64::from(days))
                .ok_or_else(|| Error::decode_mismatch("date in range", &value)),
            other => Err(Error::decode_mismatch("int32 date", &other)),
        }
    }
}

impl ParquetType for DateTime<Utc> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::primitive::<Self>(Primitive::Timestamp)
    }

    fn encode_value(&self, ctx: &Context<'_>) -> Result<Value> {
        encode_instant(self, ctx.config().timestamp)
    }

    fn decode_value(value: Value, ctx: &Context<'_>) -> Result<Self> {
        decode_instant(value, ctx.config().timestamp)
    }
}

/// Wall-clock date-times are stored as if they were UTC.
impl ParquetType for NaiveDateTime {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::primitive::<Self>(Primitive::Timestamp)
    }

    fn encode_value(&self, ctx: &Context<'_>) -> Result<Value> {
        encode_instant(&self.and_utc(), ctx.config().timestamp)
    }

    fn decode_value(value: Value, ctx: &Context<'_>) -> Result<Self> {
        decode_instant(value, ctx.config().timestamp).map(|instant| instant.naive_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode, encode};
    use crate::config::Configuration;

    fn instant(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn int96_layout() {
        let ts = instant("1970-01-02T00:00:01.5Z");
        let bytes = to_int96(&ts).unwrap();
        assert_eq!(&bytes[..8], &1_500_000_000i64.to_le_bytes());
        assert_eq!(&bytes[8..], &2_440_589i32.to_le_bytes());
        assert_eq!(from_int96(&bytes), Some(ts));
    }

    #[test]
    fn int64_units() {
        let ts = instant("2024-03-01T12:00:00.123456789Z");
        let millis = Configuration::default().with_timestamp(TimestampFormat::Int64Millis);
        let micros = Configuration::default().with_timestamp(TimestampFormat::Int64Micros);
        let nanos = Configuration::default().with_timestamp(TimestampFormat::Int64Nanos);

        assert_eq!(encode(&ts, &millis).unwrap(), Value::Int64(ts.timestamp_millis()));
        assert_eq!(encode(&ts, &micros).unwrap(), Value::Int64(ts.timestamp_micros()));
        let encoded = encode(&ts, &nanos).unwrap();
        assert_eq!(decode::<DateTime<Utc>>(encoded, &nanos).unwrap(), ts);
    }

    #[test]
    fn nanos_out_of_range_overflow() {
        let far = instant("2500-01-01T00:00:00Z");
        let nanos = Configuration::default().with_timestamp(TimestampFormat::Int64Nanos);
        assert!(matches!(encode(&far, &nanos), Err(Error::EncodeOverflow { .. })));
    }

    #[test]
    fn int96_config_rejects_bare_int64() {
        let err = decode::<DateTime<Utc>>(Value::Int64(0), &Configuration::default()).unwrap_err();
        assert!(matches!(err, Error::DecodeMismatch { .. }));
    }

    #[test]
    fn dates_are_days_since_epoch() {
        let cfg = Configuration::default();
        let date: NaiveDate = "1969-12-31".parse().unwrap();
        assert_eq!(encode(&date, &cfg).unwrap(), Value::Int32(-1));
        assert_eq!(decode::<NaiveDate>(Value::Int32(-1), &cfg).unwrap(), date);
    }

    #[test]
    fn naive_date_times_are_utc_wall_time() {
        let cfg = Configuration::default().with_timestamp(TimestampFormat::Int64Millis);
        let naive: NaiveDateTime = "2001-02-03T04:05:06".parse().unwrap();
        let encoded = encode(&naive, &cfg).unwrap();
        assert_eq!(encoded, Value::Int64(naive.and_utc().timestamp_millis()));
        assert_eq!(decode::<NaiveDateTime>(encoded, &cfg).unwrap(), naive);
    }
}
