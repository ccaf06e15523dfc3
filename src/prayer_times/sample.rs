//! Canned upstream payloads for offline and demo use.
//!
//! The built-in set covers 2025-01-01..=2025-01-07 for London. Any other
//! date borrows the timings of the nearest canned day with its own
//! gregorian fields written in, so sample mode always has an answer.

use chrono::{Datelike, NaiveDate};

use crate::prayer_times::schema::{UpstreamDay, UpstreamMonth, UpstreamName, UpstreamResponse};

const SAMPLE_DAYS: &str = include_str!("sample_days.json");

pub struct SampleDataProvider {
    days: Vec<(NaiveDate, UpstreamDay)>,
}

impl SampleDataProvider {
    pub fn builtin() -> Self {
        let days: Vec<UpstreamDay> = serde_json::from_str(SAMPLE_DAYS).unwrap_or_else(|e| {
            log::error!("Built-in sample prayer times failed to decode: {}", e);
            Vec::new()
        });
        Self::new(days)
    }

    /// Days without a parseable `gregorian.date` are skipped.
    pub fn new(days: Vec<UpstreamDay>) -> Self {
        let mut days: Vec<(NaiveDate, UpstreamDay)> = days
            .into_iter()
            .filter_map(|d| Some((canned_date(&d)?, d)))
            .collect();
        days.sort_by_key(|(date, _)| *date);
        Self { days }
    }

    /// First and last canned dates.
    pub fn range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.days.first()?.0, self.days.last()?.0))
    }

    /// Upstream-shaped day for `date`. `None` only if the canned set is empty.
    pub fn day(&self, date: NaiveDate) -> Option<UpstreamDay> {
        let (canned_on, canned) = self
            .days
            .iter()
            .min_by_key(|(d, _)| (*d - date).num_days().abs())?;
        if *canned_on == date {
            return Some(canned.clone());
        }
        Some(substitute_date(canned.clone(), date))
    }

    pub fn response_for_day(&self, date: NaiveDate) -> UpstreamResponse {
        let data = self.day(date).and_then(|d| serde_json::to_value(d).ok());
        wrap(data)
    }

    pub fn response_for_month(&self, year: i32, month: u32) -> UpstreamResponse {
        let days: Vec<UpstreamDay> = days_in_month(year, month)
            .into_iter()
            .filter_map(|date| self.day(date))
            .collect();
        wrap(serde_json::to_value(days).ok())
    }
}

impl Default for SampleDataProvider {
    fn default() -> Self {
        Self::builtin()
    }
}

fn wrap(data: Option<serde_json::Value>) -> UpstreamResponse {
    UpstreamResponse {
        code: Some(200),
        status: Some("OK".to_string()),
        data,
    }
}

fn canned_date(day: &UpstreamDay) -> Option<NaiveDate> {
    let raw = day.date.as_ref()?.gregorian.as_ref()?.date.as_deref()?;
    NaiveDate::parse_from_str(raw, "%d-%m-%Y").ok()
}

/// Rewrite the gregorian fields of `day` to describe `date`. The hijri
/// block is dropped since it no longer matches.
fn substitute_date(mut day: UpstreamDay, date: NaiveDate) -> UpstreamDay {
    let block = day.date.get_or_insert_with(Default::default);
    block.readable = Some(date.format("%d %b %Y").to_string());
    block.timestamp = date
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp().to_string());
    block.hijri = None;

    let gregorian = block.gregorian.get_or_insert_with(Default::default);
    gregorian.date = Some(date.format("%d-%m-%Y").to_string());
    gregorian.day = Some(date.format("%d").to_string());
    gregorian.weekday = Some(UpstreamName {
        en: Some(date.format("%A").to_string()),
    });
    gregorian.month = Some(UpstreamMonth {
        number: Some(date.month()),
        en: Some(date.format("%B").to_string()),
    });
    gregorian.year = Some(date.year().to_string());
    day
}

pub fn days_in_month(year: i32, month: u32) -> Vec<NaiveDate> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    first
        .iter_days()
        .take_while(|d| d.month() == month)
        .collect()
}
