use chrono::{NaiveDate, NaiveTime};

use crate::models::PrayerName;
use crate::prayer_times::error::ValidationError;
use crate::prayer_times::schema::{
    UpstreamCalendarDate, UpstreamDay, UpstreamMeta, UpstreamResponse,
};
use crate::prayer_times::transform::strip_timezone_note;

/// A day that passed validation. Timings are raw upstream strings in
/// canonical prayer order.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDay {
    pub date: NaiveDate,
    pub timings: [String; 5],
    pub hijri: Option<UpstreamCalendarDate>,
    pub meta: Option<UpstreamMeta>,
}

impl ValidatedDay {
    pub fn timing(&self, name: PrayerName) -> &str {
        &self.timings[name as usize]
    }
}

/// Check a whole response. One bad day rejects the batch.
pub fn validate_response(
    response: &UpstreamResponse,
) -> Result<Vec<ValidatedDay>, ValidationError> {
    if response.code != Some(200) {
        return Err(ValidationError::BadCode(response.code));
    }
    let data = response.data.as_ref().ok_or(ValidationError::MissingData)?;

    let raw_days: Vec<&serde_json::Value> = match data {
        serde_json::Value::Array(items) => items.iter().collect(),
        serde_json::Value::Object(_) => vec![data],
        serde_json::Value::Null => return Err(ValidationError::MissingData),
        other => {
            return Err(ValidationError::MalformedDay {
                index: 0,
                reason: format!("expected object or list, got {}", json_kind(other)),
            });
        }
    };
    if raw_days.is_empty() {
        return Err(ValidationError::EmptyData);
    }

    raw_days
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let day: UpstreamDay = serde_json::from_value(value.clone()).map_err(|e| {
                ValidationError::MalformedDay {
                    index,
                    reason: e.to_string(),
                }
            })?;
            validate_day(index, day)
        })
        .collect()
}

/// Check a single decoded day.
pub fn validate_day(index: usize, day: UpstreamDay) -> Result<ValidatedDay, ValidationError> {
    let timings = day.timings.ok_or_else(|| ValidationError::MalformedDay {
        index,
        reason: "missing timings".to_string(),
    })?;

    let mut out: [String; 5] = Default::default();
    for (slot, prayer) in out.iter_mut().zip(PrayerName::ALL) {
        let key = prayer.display_name();
        let value = timings
            .get(key)
            .or_else(|| timings.get(prayer.as_str()))
            .filter(|v| !v.trim().is_empty())
            .ok_or(ValidationError::MissingTiming { index, prayer: key })?;
        if NaiveTime::parse_from_str(strip_timezone_note(value), "%H:%M").is_err() {
            return Err(ValidationError::MalformedTiming {
                index,
                prayer: key,
                value: value.clone(),
            });
        }
        *slot = value.clone();
    }

    let date_block = day.date.ok_or(ValidationError::MissingDate { index })?;
    let gregorian = date_block
        .gregorian
        .as_ref()
        .and_then(|g| g.date.as_deref())
        .and_then(|s| NaiveDate::parse_from_str(s, "%d-%m-%Y").ok());
    let readable = date_block
        .readable
        .as_deref()
        .and_then(|s| NaiveDate::parse_from_str(s, "%d %b %Y").ok());
    let date = gregorian
        .or(readable)
        .ok_or(ValidationError::MissingDate { index })?;

    Ok(ValidatedDay {
        date,
        timings: out,
        hijri: date_block.hijri,
        meta: day.meta,
    })
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
