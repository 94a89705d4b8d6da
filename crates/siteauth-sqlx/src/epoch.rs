// Unix-epoch conversion for timestamp columns.
//
// Timestamps are written as `datetime(?, 'unixepoch')` and read back as
// `CAST(strftime('%s', col) AS INTEGER)`, so values cross the driver boundary
// as whole seconds. Sub-second precision is dropped on write. SQLite's date
// functions only cover years 0000 through 9999; anything outside is refused
// before it reaches a statement, since `datetime()` would turn it into NULL.

use chrono::{DateTime, Utc};

use siteauth_core::error::{AdapterResult, AuthStoreError};

/// SQL expression converting a bound epoch-seconds parameter to a DATETIME.
pub const TO_DATETIME: &str = "datetime(?, 'unixepoch')";

/// `0000-01-01T00:00:00Z`
pub const MIN_EPOCH: i64 = -62_167_219_200;
/// `9999-12-31T23:59:59Z`
pub const MAX_EPOCH: i64 = 253_402_300_799;

pub fn to_epoch(at: DateTime<Utc>) -> AdapterResult<i64> {
    let seconds = at.timestamp();
    if !(MIN_EPOCH..=MAX_EPOCH).contains(&seconds) {
        return Err(AuthStoreError::Database(format!(
            "timestamp {at} is outside the range SQLite can store (years 0000-9999)"
        )));
    }
    Ok(seconds)
}

pub fn to_epoch_opt(at: Option<DateTime<Utc>>) -> AdapterResult<Option<i64>> {
    at.map(to_epoch).transpose()
}

pub fn from_epoch(seconds: i64) -> AdapterResult<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| AuthStoreError::Database(format!("timestamp out of range: {seconds}")))
}

pub fn from_epoch_opt(seconds: Option<i64>) -> AdapterResult<Option<DateTime<Utc>>> {
    seconds.map(from_epoch).transpose()
}
