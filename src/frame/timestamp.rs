//! Frame timestamp field validation and construction.

use chrono::{DateTime, TimeZone, Utc};

use crate::error::DecodeError;

/// Decode the trailing 6-byte `YY MM DD hh mm ss` timestamp of a frame.
///
/// `YY` is years since 2000. Every field is range-checked per §4.A/§3 before
/// constructing the timestamp; an out-of-range field is reported as a
/// [`DecodeError::BadTimestamp`] naming the offending field.
pub fn decode_timestamp(yy: u8, mm: u8, dd: u8, hh: u8, mm_: u8, ss: u8) -> Result<DateTime<Utc>, DecodeError> {
    if yy as u32 > 100 {
        return Err(DecodeError::BadTimestamp { field: "YY", value: yy as i64 });
    }
    if !(1..=12).contains(&mm) {
        return Err(DecodeError::BadTimestamp { field: "MM", value: mm as i64 });
    }
    if !(1..=31).contains(&dd) {
        return Err(DecodeError::BadTimestamp { field: "DD", value: dd as i64 });
    }
    if hh >= 24 {
        return Err(DecodeError::BadTimestamp { field: "hh", value: hh as i64 });
    }
    if mm_ >= 60 {
        return Err(DecodeError::BadTimestamp { field: "mm", value: mm_ as i64 });
    }
    if ss >= 60 {
        return Err(DecodeError::BadTimestamp { field: "ss", value: ss as i64 });
    }

    let year = 2000 + yy as i32;
    Utc.with_ymd_and_hms(year, mm as u32, dd as u32, hh as u32, mm_ as u32, ss as u32)
        .single()
        .ok_or(DecodeError::BadTimestamp { field: "DD", value: dd as i64 })
}
