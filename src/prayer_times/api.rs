//! Client for the upstream prayer-times calculation API.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use std::time::Duration;

use crate::models::Place;
use crate::prayer_times::error::{PrayerTimesError, Result};
use crate::prayer_times::schema::UpstreamResponse;

pub const DEFAULT_BASE_URL: &str = "https://api.aladhan.com";
pub const DAY_TIMEOUT: Duration = Duration::from_secs(10);
pub const CALENDAR_TIMEOUT: Duration = Duration::from_secs(15);

/// Longest slice of an error body kept in [`PrayerTimesError::Upstream`].
const MAX_ERROR_BODY: usize = 512;

/// Where raw upstream responses come from.
#[async_trait]
pub trait TimingsSource: Send + Sync {
    async fn timings(
        &self,
        date: NaiveDate,
        place: &Place,
        method_id: u32,
    ) -> Result<UpstreamResponse>;

    async fn calendar(
        &self,
        year: i32,
        month: u32,
        place: &Place,
        method_id: u32,
    ) -> Result<UpstreamResponse>;

    /// Zone the returned times are expressed in, when the caller pins one.
    fn timezone(&self) -> Option<&str> {
        None
    }
}

pub struct AladhanClient {
    client: Client,
    base_url: String,
    day_timeout: Duration,
    calendar_timeout: Duration,
    timezone: Option<String>,
}

impl AladhanClient {
    pub fn new(base_url: impl Into<String>) -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("waqt/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            day_timeout: DAY_TIMEOUT,
            calendar_timeout: CALENDAR_TIMEOUT,
            timezone: None,
        })
    }

    pub fn with_timeouts(mut self, day: Duration, calendar: Duration) -> Self {
        self.day_timeout = day;
        self.calendar_timeout = calendar;
        self
    }

    /// IANA zone sent as `timezonestring`.
    pub fn with_timezone(mut self, timezone: Option<String>) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn query(&self, place: &Place, method_id: u32) -> Vec<(&'static str, String)> {
        let mut query = match place {
            Place::Coordinates(loc) => vec![
                ("latitude", loc.latitude.to_string()),
                ("longitude", loc.longitude.to_string()),
            ],
            Place::City { city, country } => {
                vec![("city", city.clone()), ("country", country.clone())]
            }
        };
        query.push(("method", method_id.to_string()));
        if let Some(tz) = &self.timezone {
            query.push(("timezonestring", tz.clone()));
        }
        query
    }

    async fn get(
        &self,
        url: &str,
        query: &[(&'static str, String)],
        timeout: Duration,
    ) -> Result<UpstreamResponse> {
        log::debug!("GET {} {:?}", url, query);
        let response = self
            .client
            .get(url)
            .query(query)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        if !status.is_success() {
            return Err(PrayerTimesError::upstream(
                Some(status.as_u16()),
                truncate(&body),
            ));
        }

        serde_json::from_str(&body).map_err(|e| {
            PrayerTimesError::upstream(
                Some(status.as_u16()),
                format!("malformed body: {}", e),
            )
        })
    }
}

#[async_trait]
impl TimingsSource for AladhanClient {
    async fn timings(
        &self,
        date: NaiveDate,
        place: &Place,
        method_id: u32,
    ) -> Result<UpstreamResponse> {
        let endpoint = match place {
            Place::Coordinates(_) => "timings",
            Place::City { .. } => "timingsByCity",
        };
        let url = format!(
            "{}/v1/{}/{}",
            self.base_url,
            endpoint,
            date.format("%d-%m-%Y")
        );
        self.get(&url, &self.query(place, method_id), self.day_timeout)
            .await
    }

    async fn calendar(
        &self,
        year: i32,
        month: u32,
        place: &Place,
        method_id: u32,
    ) -> Result<UpstreamResponse> {
        let endpoint = match place {
            Place::Coordinates(_) => "calendar",
            Place::City { .. } => "calendarByCity",
        };
        let url = format!("{}/v1/{}/{}/{}", self.base_url, endpoint, year, month);
        self.get(&url, &self.query(place, method_id), self.calendar_timeout)
            .await
    }

    fn timezone(&self) -> Option<&str> {
        self.timezone.as_deref()
    }
}

fn transport_error(e: reqwest::Error, timeout: Duration) -> PrayerTimesError {
    if e.is_timeout() {
        PrayerTimesError::RequestTimeout(timeout)
    } else {
        PrayerTimesError::upstream(e.status().map(|s| s.as_u16()), e.to_string())
    }
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
