//! Fetch orchestration: cache check, sample-or-live fetch, validation,
//! transformation, cache write, and stale fallback.

use chrono::NaiveDate;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::db::{KeyValueStore, StoreError};
use crate::models::{DayPrayerTimes, Location, Place, PrayerAdjustments};
use crate::prayer_times::api::TimingsSource;
use crate::prayer_times::cache::{CacheKey, CachedValue, PrayerCache, DEFAULT_TTL_HOURS};
use crate::prayer_times::connectivity::ConnectivityProbe;
use crate::prayer_times::error::{PrayerTimesError, Result, ValidationError};
use crate::prayer_times::sample::SampleDataProvider;
use crate::prayer_times::schema::UpstreamResponse;
use crate::prayer_times::transform::{
    apply_adjustments, apply_place_labels, transform_day, transform_days, TransformContext,
};
use crate::prayer_times::validate::validate_response;
use crate::utils::clock::{Clock, SystemClock};

/// Store key holding the persisted sample-mode flag. Outside the cache
/// prefix so clearing the cache keeps it.
pub const SAMPLE_MODE_KEY: &str = "settings:sample_mode";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub cache_ttl: chrono::Duration,
    /// Concurrent requests per batch group.
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub sample_mode: bool,
    /// Simulated network latency in sample mode.
    pub sample_latency: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cache_ttl: chrono::Duration::hours(DEFAULT_TTL_HOURS),
            batch_size: 5,
            batch_delay: Duration::from_millis(100),
            sample_mode: false,
            sample_latency: Duration::from_millis(500),
        }
    }
}

/// Everything besides the date that identifies a request.
#[derive(Debug, Clone, PartialEq)]
pub struct PrayerQuery {
    pub place: Place,
    pub method_id: u32,
    pub adjustments: PrayerAdjustments,
}

impl PrayerQuery {
    pub fn new(location: Location, method_id: u32) -> Self {
        Self {
            place: Place::Coordinates(location),
            method_id,
            adjustments: PrayerAdjustments::default(),
        }
    }

    pub fn by_city(city: impl Into<String>, country: impl Into<String>, method_id: u32) -> Self {
        Self {
            place: Place::City {
                city: city.into(),
                country: country.into(),
            },
            method_id,
            adjustments: PrayerAdjustments::default(),
        }
    }

    pub fn with_adjustments(mut self, adjustments: PrayerAdjustments) -> Self {
        self.adjustments = adjustments;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Live,
    Sample,
    /// Fresh cache hit, no network call made.
    Cache,
    /// Fetch failed and an expired entry was served instead.
    StaleCache,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Live => "live",
            DataSource::Sample => "sample",
            DataSource::Cache => "cache",
            DataSource::StaleCache => "stale cache",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Fetched<T> {
    pub data: T,
    pub source: DataSource,
}

pub struct PrayerTimesClient {
    config: ClientConfig,
    source: Arc<dyn TimingsSource>,
    probe: Arc<dyn ConnectivityProbe>,
    store: Arc<dyn KeyValueStore>,
    cache: PrayerCache,
    samples: SampleDataProvider,
    sample_mode: AtomicBool,
}

impl PrayerTimesClient {
    pub fn new(
        config: ClientConfig,
        source: Arc<dyn TimingsSource>,
        probe: Arc<dyn ConnectivityProbe>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let cache = PrayerCache::new(store.clone(), Arc::new(SystemClock), config.cache_ttl);
        let sample_mode = AtomicBool::new(config.sample_mode);
        Self {
            config,
            source,
            probe,
            store,
            cache,
            samples: SampleDataProvider::builtin(),
            sample_mode,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.cache = PrayerCache::new(self.store.clone(), clock, self.config.cache_ttl);
        self
    }

    pub fn with_sample_data(mut self, samples: SampleDataProvider) -> Self {
        self.samples = samples;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ─── Single day ──────────────────────────────────────────────────────────

    pub async fn fetch_prayer_times_for_date(
        &self,
        date: &str,
        query: &PrayerQuery,
    ) -> Result<DayPrayerTimes> {
        self.fetch_prayer_times_for_date_detailed(date, query)
            .await
            .map(|f| f.data)
    }

    /// Same as [`Self::fetch_prayer_times_for_date`] but reports where the
    /// data came from.
    pub async fn fetch_prayer_times_for_date_detailed(
        &self,
        date: &str,
        query: &PrayerQuery,
    ) -> Result<Fetched<DayPrayerTimes>> {
        let date = parse_date(date)?;
        let key = CacheKey::for_day(&query.place, query.method_id, date)
            .with_timezone(self.source.timezone());

        if let Some(mut day) = self.cached_day(&key, date, true).await {
            log::debug!("Cache hit key={}", key);
            restamp(std::slice::from_mut(&mut day), query);
            return Ok(Fetched {
                data: day,
                source: DataSource::Cache,
            });
        }

        match self.load_day(date, query).await {
            Ok((day, source)) => {
                self.write_cache(&key, std::slice::from_ref(&day)).await;
                Ok(Fetched { data: day, source })
            }
            Err(e) => {
                log::warn!(
                    "Prayer times fetch failed date={} {} method={}: {}",
                    date,
                    query.place,
                    query.method_id,
                    e
                );
                match self.cached_day(&key, date, false).await {
                    Some(mut day) => {
                        log::info!("Serving stale cache key={}", key);
                        restamp(std::slice::from_mut(&mut day), query);
                        Ok(Fetched {
                            data: day,
                            source: DataSource::StaleCache,
                        })
                    }
                    None => Err(e),
                }
            }
        }
    }

    async fn load_day(
        &self,
        date: NaiveDate,
        query: &PrayerQuery,
    ) -> Result<(DayPrayerTimes, DataSource)> {
        let (response, source) = if self.is_sample_data_mode() {
            tokio::time::sleep(self.config.sample_latency).await;
            (self.samples.response_for_day(date), DataSource::Sample)
        } else {
            self.require_online().await?;
            let response = self
                .source
                .timings(date, &query.place, query.method_id)
                .await?;
            (response, DataSource::Live)
        };

        let days = validate_response(&response)?;
        let Some(first) = days.first() else {
            return Err(ValidationError::EmptyData.into());
        };
        let Some(day) = days.iter().find(|d| d.date == date) else {
            return Err(ValidationError::DateMismatch {
                requested: date,
                returned: first.date,
            }
            .into());
        };
        Ok((transform_day(day, &transform_context(query)), source))
    }

    /// Day entry first, then a monthly entry containing the date.
    async fn cached_day(
        &self,
        key: &CacheKey,
        date: NaiveDate,
        fresh_only: bool,
    ) -> Option<DayPrayerTimes> {
        let wanted = date.format("%Y-%m-%d").to_string();
        for candidate in [key.clone(), key.month_key()] {
            let Some(value) = self.read_cache(&candidate).await else {
                continue;
            };
            if fresh_only && !self.cache.is_fresh(&value) {
                continue;
            }
            if let Some(day) = value.entry.data.into_iter().find(|d| d.date == wanted) {
                return Some(day);
            }
        }
        None
    }

    // ─── Monthly calendar ────────────────────────────────────────────────────

    pub async fn fetch_monthly_calendar(
        &self,
        year: i32,
        month: u32,
        query: &PrayerQuery,
    ) -> Result<Vec<DayPrayerTimes>> {
        self.fetch_monthly_calendar_detailed(year, month, query)
            .await
            .map(|f| f.data)
    }

    pub async fn fetch_monthly_calendar_by_city(
        &self,
        year: i32,
        month: u32,
        city: &str,
        country: &str,
        method_id: u32,
        adjustments: &PrayerAdjustments,
    ) -> Result<Vec<DayPrayerTimes>> {
        let query = PrayerQuery::by_city(city, country, method_id).with_adjustments(*adjustments);
        self.fetch_monthly_calendar(year, month, &query).await
    }

    pub async fn fetch_monthly_calendar_detailed(
        &self,
        year: i32,
        month: u32,
        query: &PrayerQuery,
    ) -> Result<Fetched<Vec<DayPrayerTimes>>> {
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(PrayerTimesError::InvalidDate(format!("{}-{:02}", year, month)));
        }
        let key = CacheKey::for_month(&query.place, query.method_id, year, month)
            .with_timezone(self.source.timezone());

        if let Some(value) = self.read_cache(&key).await {
            if self.cache.is_fresh(&value) {
                log::debug!("Cache hit key={}", key);
                let mut data = value.entry.data;
                restamp(&mut data, query);
                return Ok(Fetched {
                    data,
                    source: DataSource::Cache,
                });
            }
        }

        match self.load_month(year, month, query).await {
            Ok((data, source)) => {
                self.write_cache(&key, &data).await;
                Ok(Fetched { data, source })
            }
            Err(e) => {
                log::warn!(
                    "Prayer calendar fetch failed month={}-{:02} {} method={}: {}",
                    year,
                    month,
                    query.place,
                    query.method_id,
                    e
                );
                match self.read_cache(&key).await {
                    Some(value) => {
                        log::info!("Serving stale cache key={}", key);
                        let mut data = value.entry.data;
                        restamp(&mut data, query);
                        Ok(Fetched {
                            data,
                            source: DataSource::StaleCache,
                        })
                    }
                    None => Err(e),
                }
            }
        }
    }

    async fn load_month(
        &self,
        year: i32,
        month: u32,
        query: &PrayerQuery,
    ) -> Result<(Vec<DayPrayerTimes>, DataSource)> {
        let (response, source) = if self.is_sample_data_mode() {
            tokio::time::sleep(self.config.sample_latency).await;
            (self.samples.response_for_month(year, month), DataSource::Sample)
        } else {
            self.require_online().await?;
            let response = self
                .source
                .calendar(year, month, &query.place, query.method_id)
                .await?;
            (response, DataSource::Live)
        };
        Ok((self.normalize(&response, query)?, source))
    }

    // ─── Batch ───────────────────────────────────────────────────────────────

    /// Fetch many dates in groups of `batch_size`, pausing `batch_delay`
    /// between groups. Dates that fail are left out of the result.
    pub async fn batch_fetch_prayer_times(
        &self,
        dates: &[String],
        query: &PrayerQuery,
    ) -> BTreeMap<String, DayPrayerTimes> {
        let mut results = BTreeMap::new();
        for (i, group) in dates.chunks(self.config.batch_size.max(1)).enumerate() {
            if i > 0 {
                tokio::time::sleep(self.config.batch_delay).await;
            }
            let fetched = join_all(group.iter().map(|date| async move {
                (date, self.fetch_prayer_times_for_date(date, query).await)
            }))
            .await;

            for (date, result) in fetched {
                match result {
                    Ok(day) => {
                        results.insert(date.clone(), day);
                    }
                    Err(e) => log::warn!("Dropping date={} from batch: {}", date, e),
                }
            }
        }
        results
    }

    // ─── Cache & sample mode ─────────────────────────────────────────────────

    pub async fn clear_cache(&self) -> std::result::Result<usize, StoreError> {
        self.cache.clear().await
    }

    pub fn is_sample_data_mode(&self) -> bool {
        self.sample_mode.load(Ordering::SeqCst)
    }

    pub async fn set_sample_data_mode(&self, enabled: bool) {
        self.sample_mode.store(enabled, Ordering::SeqCst);
        self.persist_sample_mode(enabled).await;
    }

    /// Flip sample mode and return the new state.
    pub async fn toggle_sample_data_mode(&self) -> bool {
        let enabled = !self.sample_mode.fetch_xor(true, Ordering::SeqCst);
        self.persist_sample_mode(enabled).await;
        enabled
    }

    /// Load the persisted flag, if any, over the configured default.
    pub async fn restore_sample_data_mode(&self) -> bool {
        match self.store.get(SAMPLE_MODE_KEY).await {
            Ok(Some(raw)) => self.sample_mode.store(raw == "true", Ordering::SeqCst),
            Ok(None) => {}
            Err(e) => log::warn!("Could not read {}: {}", SAMPLE_MODE_KEY, e),
        }
        self.is_sample_data_mode()
    }

    async fn persist_sample_mode(&self, enabled: bool) {
        log::info!("Sample data mode {}", if enabled { "enabled" } else { "disabled" });
        if let Err(e) = self
            .store
            .set(SAMPLE_MODE_KEY, if enabled { "true" } else { "false" })
            .await
        {
            log::warn!("Could not persist {}: {}", SAMPLE_MODE_KEY, e);
        }
    }

    // ─── Shared steps ────────────────────────────────────────────────────────

    async fn require_online(&self) -> Result<()> {
        if self.probe.is_online().await {
            Ok(())
        } else {
            Err(PrayerTimesError::NoConnectivity)
        }
    }

    fn normalize(
        &self,
        response: &UpstreamResponse,
        query: &PrayerQuery,
    ) -> Result<Vec<DayPrayerTimes>> {
        let days = validate_response(response)?;
        Ok(transform_days(&days, &transform_context(query)))
    }

    async fn read_cache(&self, key: &CacheKey) -> Option<CachedValue> {
        match self.cache.get(key).await {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Cache read failed key={}: {}", key, e);
                None
            }
        }
    }

    async fn write_cache(&self, key: &CacheKey, data: &[DayPrayerTimes]) {
        if let Err(e) = self.cache.set(key, data).await {
            let err = PrayerTimesError::CacheWrite(e);
            log::warn!("key={}: {}", key, err);
        }
    }
}

/// Bring cached records in line with the caller's current query.
fn restamp(days: &mut [DayPrayerTimes], query: &PrayerQuery) {
    apply_adjustments(days, &query.adjustments);
    apply_place_labels(days, &query.place);
}

fn transform_context(query: &PrayerQuery) -> TransformContext<'_> {
    TransformContext {
        place: &query.place,
        method_id: query.method_id,
        adjustments: &query.adjustments,
    }
}

fn parse_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| PrayerTimesError::InvalidDate(date.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::PrayerName;
    use crate::prayer_times::connectivity::{ConnectivityMonitor, StaticProbe};
    use crate::prayer_times::sample::days_in_month;
    use crate::utils::clock::ManualClock;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    const T0: i64 = 1_735_689_600_000;

    fn day_json(date: NaiveDate) -> serde_json::Value {
        json!({
            "timings": {
                "Fajr": "06:06 (UTC)",
                "Sunrise": "08:06 (UTC)",
                "Dhuhr": "12:09 (UTC)",
                "Asr": "13:46 (UTC)",
                "Maghrib": "16:02 (UTC)",
                "Isha": "17:56 (UTC)"
            },
            "date": {
                "readable": date.format("%d %b %Y").to_string(),
                "gregorian": { "date": date.format("%d-%m-%Y").to_string() },
                "hijri": { "date": "01-07-1446", "month": { "number": 7, "en": "Rajab" } }
            }
        })
    }

    fn ok(data: serde_json::Value) -> UpstreamResponse {
        UpstreamResponse {
            code: Some(200),
            status: Some("OK".to_string()),
            data: Some(data),
        }
    }

    #[derive(Default)]
    struct FakeSource {
        failing: Mutex<HashSet<NaiveDate>>,
        fail_all: AtomicBool,
        bad_payload: AtomicBool,
        /// Answer day requests with the following day.
        off_by_one: AtomicBool,
        timezone: Option<String>,
        delay: Duration,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeSource {
        fn fail_on(&self, date: NaiveDate) {
            self.failing.lock().unwrap().insert(date);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        async fn respond(
            &self,
            failing: bool,
            data: serde_json::Value,
        ) -> Result<UpstreamResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if failing || self.fail_all.load(Ordering::SeqCst) {
                return Err(PrayerTimesError::upstream(Some(500), "boom"));
            }
            if self.bad_payload.load(Ordering::SeqCst) {
                return Ok(ok(json!({ "timings": {} })));
            }
            Ok(ok(data))
        }
    }

    #[async_trait]
    impl TimingsSource for FakeSource {
        async fn timings(
            &self,
            date: NaiveDate,
            _place: &Place,
            _method_id: u32,
        ) -> Result<UpstreamResponse> {
            let failing = self.failing.lock().unwrap().contains(&date);
            let served = if self.off_by_one.load(Ordering::SeqCst) {
                date.succ_opt().unwrap()
            } else {
                date
            };
            self.respond(failing, day_json(served)).await
        }

        async fn calendar(
            &self,
            year: i32,
            month: u32,
            _place: &Place,
            _method_id: u32,
        ) -> Result<UpstreamResponse> {
            let days: Vec<_> = days_in_month(year, month).into_iter().map(day_json).collect();
            self.respond(false, json!(days)).await
        }

        fn timezone(&self) -> Option<&str> {
            self.timezone.as_deref()
        }
    }

    struct ReadOnlyStore(MemoryStore);

    #[async_trait]
    impl KeyValueStore for ReadOnlyStore {
        async fn get(&self, key: &str) -> std::result::Result<Option<String>, StoreError> {
            self.0.get(key).await
        }
        async fn set(&self, _key: &str, _value: &str) -> std::result::Result<(), StoreError> {
            Err(StoreError::Other("disk full".to_string()))
        }
        async fn delete(&self, key: &str) -> std::result::Result<(), StoreError> {
            self.0.delete(key).await
        }
        async fn list_keys(&self) -> std::result::Result<Vec<String>, StoreError> {
            self.0.list_keys().await
        }
    }

    struct Harness {
        client: PrayerTimesClient,
        source: Arc<FakeSource>,
        probe: Arc<StaticProbe>,
        clock: Arc<ManualClock>,
        store: Arc<dyn KeyValueStore>,
    }

    fn test_config() -> ClientConfig {
        ClientConfig {
            batch_delay: Duration::from_millis(1),
            sample_latency: Duration::ZERO,
            ..ClientConfig::default()
        }
    }

    fn harness_with(source: FakeSource, store: Arc<dyn KeyValueStore>) -> Harness {
        let source = Arc::new(source);
        let probe = Arc::new(StaticProbe::new(true));
        let clock = Arc::new(ManualClock::new(T0));
        let client =
            PrayerTimesClient::new(test_config(), source.clone(), probe.clone(), store.clone())
                .with_clock(clock.clone());
        Harness {
            client,
            source,
            probe,
            clock,
            store,
        }
    }

    fn harness() -> Harness {
        harness_with(FakeSource::default(), Arc::new(MemoryStore::new()))
    }

    fn london() -> PrayerQuery {
        PrayerQuery::new(Location::new(51.52, -0.14), 3)
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn live_fetch_applies_adjustment() {
        let h = harness();
        let query =
            london().with_adjustments(PrayerAdjustments::default().with(PrayerName::Fajr, 5));
        let fetched = h
            .client
            .fetch_prayer_times_for_date_detailed("2025-01-01", &query)
            .await
            .unwrap();

        assert_eq!(fetched.source, DataSource::Live);
        let fajr = fetched.data.prayer(PrayerName::Fajr).unwrap();
        assert_eq!(fajr.original_time, "06:06");
        assert_eq!(fajr.time, "06:11");
        assert_eq!(fajr.adjustment, 5);
        assert_eq!(fetched.data.hijri_date, "1 Rajab 1446 AH");
    }

    #[tokio::test]
    async fn fresh_cache_skips_network() {
        let h = harness();
        h.client.fetch_prayer_times_for_date("2025-01-01", &london()).await.unwrap();
        h.clock.advance(chrono::Duration::hours(23));
        let again = h
            .client
            .fetch_prayer_times_for_date_detailed("2025-01-01", &london())
            .await
            .unwrap();
        assert_eq!(again.source, DataSource::Cache);
        assert_eq!(h.source.calls(), 1);
    }

    #[tokio::test]
    async fn cache_hit_uses_current_adjustments() {
        let h = harness();
        h.client.fetch_prayer_times_for_date("2025-01-01", &london()).await.unwrap();
        let query =
            london().with_adjustments(PrayerAdjustments::default().with(PrayerName::Isha, -6));
        let day = h.client.fetch_prayer_times_for_date("2025-01-01", &query).await.unwrap();
        let isha = day.prayer(PrayerName::Isha).unwrap();
        assert_eq!(isha.time, "17:50");
        assert_eq!(isha.adjustment, -6);
        assert_eq!(h.source.calls(), 1);
    }

    #[tokio::test]
    async fn stale_entry_served_on_failure() {
        let h = harness();
        let first = h.client.fetch_prayer_times_for_date("2025-01-01", &london()).await.unwrap();

        h.clock.advance(chrono::Duration::hours(25));
        h.source.fail_all.store(true, Ordering::SeqCst);
        let fetched = h
            .client
            .fetch_prayer_times_for_date_detailed("2025-01-01", &london())
            .await
            .unwrap();
        assert_eq!(fetched.source, DataSource::StaleCache);
        assert_eq!(fetched.data, first);
        assert_eq!(h.source.calls(), 2);
    }

    #[tokio::test]
    async fn failure_without_cache_propagates() {
        let h = harness();
        h.source.fail_all.store(true, Ordering::SeqCst);
        let err = h
            .client
            .fetch_prayer_times_for_date("2025-01-01", &london())
            .await
            .unwrap_err();
        assert!(matches!(err, PrayerTimesError::Upstream { status: Some(500), .. }));
    }

    #[tokio::test]
    async fn offline_without_cache_is_no_connectivity() {
        let h = harness();
        h.probe.set_online(false);
        let err = h
            .client
            .fetch_prayer_times_for_date("2025-01-01", &london())
            .await
            .unwrap_err();
        assert!(matches!(err, PrayerTimesError::NoConnectivity));
        assert_eq!(h.source.calls(), 0);
    }

    #[tokio::test]
    async fn offline_with_old_cache_falls_back() {
        let h = harness();
        h.client.fetch_prayer_times_for_date("2025-01-01", &london()).await.unwrap();
        h.clock.advance(chrono::Duration::days(30));
        h.probe.set_online(false);
        assert!(h.client.fetch_prayer_times_for_date("2025-01-01", &london()).await.is_ok());
    }

    #[tokio::test]
    async fn monitor_backed_client_reports_offline() {
        let polled = Arc::new(StaticProbe::new(false));
        let monitor = ConnectivityMonitor::spawn(polled, Duration::from_secs(60)).await;
        let source = Arc::new(FakeSource::default());
        let client = PrayerTimesClient::new(
            test_config(),
            source.clone(),
            Arc::new(monitor),
            Arc::new(MemoryStore::new()),
        );

        let err = client
            .fetch_prayer_times_for_date("2025-01-01", &london())
            .await
            .unwrap_err();
        assert!(matches!(err, PrayerTimesError::NoConnectivity));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn invalid_payload_is_invalid_response() {
        let h = harness();
        h.source.bad_payload.store(true, Ordering::SeqCst);
        let err = h
            .client
            .fetch_prayer_times_for_date("2025-01-01", &london())
            .await
            .unwrap_err();
        assert!(matches!(err, PrayerTimesError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn wrong_day_from_upstream_is_rejected_and_not_cached() {
        let h = harness();
        h.source.off_by_one.store(true, Ordering::SeqCst);
        let err = h
            .client
            .fetch_prayer_times_for_date("2025-01-01", &london())
            .await
            .unwrap_err();
        match err {
            PrayerTimesError::InvalidResponse(ValidationError::DateMismatch {
                requested,
                returned,
            }) => {
                assert_eq!(requested, ymd(2025, 1, 1));
                assert_eq!(returned, ymd(2025, 1, 2));
            }
            other => panic!("expected DateMismatch, got {:?}", other),
        }
        assert!(h.store.list_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn wrong_day_from_upstream_falls_back_to_stale_entry() {
        let h = harness();
        let first = h.client.fetch_prayer_times_for_date("2025-01-01", &london()).await.unwrap();

        h.clock.advance(chrono::Duration::hours(25));
        h.source.off_by_one.store(true, Ordering::SeqCst);
        let fetched = h
            .client
            .fetch_prayer_times_for_date_detailed("2025-01-01", &london())
            .await
            .unwrap();
        assert_eq!(fetched.source, DataSource::StaleCache);
        assert_eq!(fetched.data.date, "2025-01-01");
        assert_eq!(fetched.data, first);
        assert_eq!(h.source.calls(), 2);
    }

    #[tokio::test]
    async fn timezone_change_misses_old_entries() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let zoned = |tz: &str| FakeSource {
            timezone: Some(tz.to_string()),
            ..FakeSource::default()
        };

        let london_tz = harness_with(zoned("Europe/London"), store.clone());
        london_tz.client.fetch_prayer_times_for_date("2025-01-01", &london()).await.unwrap();

        let dubai_tz = harness_with(zoned("Asia/Dubai"), store.clone());
        let fetched = dubai_tz
            .client
            .fetch_prayer_times_for_date_detailed("2025-01-01", &london())
            .await
            .unwrap();
        assert_eq!(fetched.source, DataSource::Live);
        assert_eq!(dubai_tz.source.calls(), 1);
        assert_eq!(store.list_keys().await.unwrap().len(), 2);

        let again = london_tz
            .client
            .fetch_prayer_times_for_date_detailed("2025-01-01", &london())
            .await
            .unwrap();
        assert_eq!(again.source, DataSource::Cache);
        assert_eq!(london_tz.source.calls(), 1);
    }

    #[tokio::test]
    async fn cache_hit_uses_current_place_labels() {
        let h = harness();
        h.client.fetch_prayer_times_for_date("2025-01-01", &london()).await.unwrap();

        let named = PrayerQuery::new(Location::new(51.52, -0.14).with_place("London", "UK"), 3);
        let fetched = h
            .client
            .fetch_prayer_times_for_date_detailed("2025-01-01", &named)
            .await
            .unwrap();
        assert_eq!(fetched.source, DataSource::Cache);
        assert_eq!(fetched.data.location.city, "London");
        assert_eq!(fetched.data.location.country, "UK");
    }

    #[tokio::test]
    async fn rejects_bad_date_input() {
        let h = harness();
        let err = h
            .client
            .fetch_prayer_times_for_date("01/01/2025", &london())
            .await
            .unwrap_err();
        assert!(matches!(err, PrayerTimesError::InvalidDate(_)));
        let err = h.client.fetch_monthly_calendar(2025, 13, &london()).await.unwrap_err();
        assert!(matches!(err, PrayerTimesError::InvalidDate(_)));
    }

    #[tokio::test]
    async fn cache_write_failure_is_swallowed() {
        let h = harness_with(FakeSource::default(), Arc::new(ReadOnlyStore(MemoryStore::new())));
        let day = h.client.fetch_prayer_times_for_date("2025-01-01", &london()).await;
        assert!(day.is_ok());
        assert!(h.store.list_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn monthly_entry_answers_day_requests() {
        let h = harness();
        let month = h.client.fetch_monthly_calendar(2025, 1, &london()).await.unwrap();
        assert_eq!(month.len(), 31);
        assert_eq!(h.source.calls(), 1);

        let day = h
            .client
            .fetch_prayer_times_for_date_detailed("2025-01-15", &london())
            .await
            .unwrap();
        assert_eq!(day.source, DataSource::Cache);
        assert_eq!(day.data.date, "2025-01-15");
        assert_eq!(h.source.calls(), 1);
    }

    #[tokio::test]
    async fn monthly_stale_fallback() {
        let h = harness();
        h.client.fetch_monthly_calendar(2025, 1, &london()).await.unwrap();
        h.clock.advance(chrono::Duration::hours(24) + chrono::Duration::minutes(1));
        h.source.fail_all.store(true, Ordering::SeqCst);
        let fetched = h
            .client
            .fetch_monthly_calendar_detailed(2025, 1, &london())
            .await
            .unwrap();
        assert_eq!(fetched.source, DataSource::StaleCache);
        assert_eq!(fetched.data.len(), 31);
    }

    #[tokio::test]
    async fn calendar_by_city_keeps_city_name() {
        let h = harness();
        let days = h
            .client
            .fetch_monthly_calendar_by_city(
                2025,
                2,
                "Cairo",
                "Egypt",
                5,
                &PrayerAdjustments::default(),
            )
            .await
            .unwrap();
        assert_eq!(days.len(), 28);
        assert_eq!(days[0].location.city, "Cairo");
        assert_eq!(days[0].method.id, 5);
    }

    #[tokio::test]
    async fn batch_drops_failed_dates() {
        let h = harness();
        h.source.fail_on(ymd(2025, 1, 2));
        let dates = vec!["2025-01-01".to_string(), "2025-01-02".to_string()];
        let results = h.client.batch_fetch_prayer_times(&dates, &london()).await;
        assert_eq!(results.len(), 1);
        assert!(results.contains_key("2025-01-01"));
    }

    #[tokio::test]
    async fn batch_caps_concurrency() {
        let source = FakeSource {
            delay: Duration::from_millis(20),
            ..FakeSource::default()
        };
        let h = harness_with(source, Arc::new(MemoryStore::new()));
        let dates: Vec<String> = (1..=12)
            .map(|d| ymd(2025, 3, d).format("%Y-%m-%d").to_string())
            .collect();
        let results = h.client.batch_fetch_prayer_times(&dates, &london()).await;
        assert_eq!(results.len(), 12);
        assert_eq!(h.source.calls(), 12);
        assert_eq!(h.source.max_in_flight.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn sample_mode_never_runs_dry() {
        let h = harness();
        h.probe.set_online(false);
        assert!(h.client.toggle_sample_data_mode().await);

        let fetched = h
            .client
            .fetch_prayer_times_for_date_detailed("2030-06-15", &london())
            .await
            .unwrap();
        assert_eq!(fetched.source, DataSource::Sample);
        assert_eq!(fetched.data.date, "2030-06-15");
        assert_eq!(h.source.calls(), 0);

        let month = h.client.fetch_monthly_calendar(2025, 1, &london()).await.unwrap();
        assert_eq!(month.len(), 31);
    }

    #[tokio::test]
    async fn sample_mode_is_persisted_outside_cache() {
        let h = harness();
        h.client.set_sample_data_mode(true).await;
        h.client.fetch_prayer_times_for_date("2025-01-02", &london()).await.unwrap();
        h.client.clear_cache().await.unwrap();

        let keys = h.store.list_keys().await.unwrap();
        assert_eq!(keys, vec![SAMPLE_MODE_KEY.to_string()]);

        let restored = PrayerTimesClient::new(
            test_config(),
            h.source.clone(),
            h.probe.clone(),
            h.store.clone(),
        );
        assert!(!restored.is_sample_data_mode());
        assert!(restored.restore_sample_data_mode().await);

        assert!(!h.client.toggle_sample_data_mode().await);
        assert_eq!(h.store.get(SAMPLE_MODE_KEY).await.unwrap().as_deref(), Some("false"));
    }
}
