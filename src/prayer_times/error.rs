use chrono::NaiveDate;
use std::time::Duration;
use thiserror::Error;

use crate::db::StoreError;

/// Why an upstream payload was rejected. Returned by the validator
/// instead of panicking so callers can fall back to a stale cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("upstream code {0:?}, expected 200")]
    BadCode(Option<i64>),

    #[error("response has no data field")]
    MissingData,

    #[error("response data contains no days")]
    EmptyData,

    #[error("day {index}: {reason}")]
    MalformedDay { index: usize, reason: String },

    #[error("day {index}: missing timing for {prayer}")]
    MissingTiming { index: usize, prayer: &'static str },

    #[error("day {index}: timing for {prayer} is not HH:MM: '{value}'")]
    MalformedTiming {
        index: usize,
        prayer: &'static str,
        value: String,
    },

    #[error("day {index}: no readable gregorian date")]
    MissingDate { index: usize },

    #[error("requested {requested}, upstream returned {returned}")]
    DateMismatch {
        requested: NaiveDate,
        returned: NaiveDate,
    },
}

#[derive(Debug, Error)]
pub enum PrayerTimesError {
    #[error("device is offline and sample data mode is disabled")]
    NoConnectivity,

    #[error("request timed out after {0:?}")]
    RequestTimeout(Duration),

    #[error("upstream error (status {status:?}): {message}")]
    Upstream { status: Option<u16>, message: String },

    #[error("invalid upstream response: {0}")]
    InvalidResponse(#[from] ValidationError),

    #[error("failed to write prayer times cache: {0}")]
    CacheWrite(#[source] StoreError),

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}

impl PrayerTimesError {
    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        PrayerTimesError::Upstream {
            status,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PrayerTimesError>;
