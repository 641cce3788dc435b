//! Temporal payloads: date as days since epoch, timestamp as seconds plus
//! subsecond nanos, duration as signed seconds plus signed nanos.

use crate::buffer::Buffer;
use crate::error::{bail, ensure, Result};
use crate::types;
use crate::value::Value;
use chrono::{DateTime, NaiveDate, TimeDelta};


fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()
}

pub fn write_temporal(buffer: &mut Buffer, value: &Value) -> Result<()> {
    match value {
        Value::Date(date) => {
            let days = date.signed_duration_since(epoch()).num_days();
            ensure!(
                i32::try_from(days).is_ok(),
                EncodingError,
                "date {} out of the 32-bit day range",
                date,
            );
            buffer.write_var_int32(days as i32);
        }
        Value::Timestamp(ts) => {
            let utc = ts.and_utc();
            buffer.write_var_int64(utc.timestamp());
            buffer.write_var_uint32(utc.timestamp_subsec_nanos());
        }
        Value::Duration(delta) => {
            let seconds = delta.num_seconds();
            let nanos = delta.subsec_nanos();
            buffer.write_var_int64(seconds);
            buffer.write_var_int32(nanos);
        }
        other => unreachable!("not temporal: {:?}", other),
    }
    Ok(())
}

pub fn read_temporal(buffer: &mut Buffer, type_id: u32) -> Result<Value> {
    match type_id {
        types::DATE => {
            let days = buffer.read_var_int32()?;
            let date = epoch()
                .checked_add_signed(TimeDelta::days(days as i64))
                .ok_or_else(|| {
                    crate::error::error!(InvalidData, "date {} days from epoch overflows", days)
                })?;
            Ok(Value::Date(date))
        }
        types::TIMESTAMP => {
            let seconds = buffer.read_var_int64()?;
            let nanos = buffer.read_var_uint32()?;
            let ts = DateTime::from_timestamp(seconds, nanos).ok_or_else(|| {
                crate::error::error!(
                    InvalidData,
                    "timestamp {}s + {}ns out of range",
                    seconds,
                    nanos,
                )
            })?;
            Ok(Value::Timestamp(ts.naive_utc()))
        }
        types::DURATION => {
            let seconds = buffer.read_var_int64()?;
            let nanos = buffer.read_var_int32()?;
            ensure!(
                nanos.unsigned_abs() <= 999_999_999,
                InvalidData,
                "duration nanos {} out of range",
                nanos,
            );
            let delta = TimeDelta::try_seconds(seconds)
                .and_then(|d| d.checked_add(&TimeDelta::nanoseconds(nanos as i64)))
                .ok_or_else(|| {
                    crate::error::error!(InvalidData, "duration {}s out of range", seconds)
                })?;
            Ok(Value::Duration(delta))
        }
        id => bail!(InvalidData, "tag {} is not temporal", id),
    }
}
