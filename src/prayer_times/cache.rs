use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::{KeyValueStore, StoreError};
use crate::models::{DayPrayerTimes, Place};
use crate::utils::clock::Clock;

/// Every cache key starts with this, so [`PrayerCache::clear`] can leave
/// the rest of the store alone.
pub const CACHE_PREFIX: &str = "prayer_times_cache:";

pub const DEFAULT_TTL_HOURS: i64 = 24;

/// `(place[@timezone], method, year, month[, day])`. Monthly calendars and
/// single days live under separate keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    place: String,
    timezone: Option<String>,
    method_id: u32,
    year: i32,
    month: u32,
    day: Option<u32>,
}

impl CacheKey {
    pub fn for_day(place: &Place, method_id: u32, date: NaiveDate) -> Self {
        Self {
            place: place_component(place),
            timezone: None,
            method_id,
            year: date.year(),
            month: date.month(),
            day: Some(date.day()),
        }
    }

    pub fn for_month(place: &Place, method_id: u32, year: i32, month: u32) -> Self {
        Self {
            place: place_component(place),
            timezone: None,
            method_id,
            year,
            month,
            day: None,
        }
    }

    /// Times computed for different zones must not share an entry.
    pub fn with_timezone(mut self, timezone: Option<&str>) -> Self {
        self.timezone = timezone.map(str::to_string);
        self
    }

    /// The monthly key covering a day key.
    pub fn month_key(&self) -> Self {
        Self {
            day: None,
            ..self.clone()
        }
    }

    pub fn storage_key(&self) -> String {
        let mut key = format!("{}{}", CACHE_PREFIX, self.place);
        if let Some(tz) = &self.timezone {
            key.push_str(&format!("@{}", tz));
        }
        key.push_str(&format!(":{}:{:04}-{:02}", self.method_id, self.year, self.month));
        if let Some(day) = self.day {
            key.push_str(&format!("-{:02}", day));
        }
        key
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.storage_key())
    }
}

fn place_component(place: &Place) -> String {
    match place {
        Place::Coordinates(loc) => format!("{:.4},{:.4}", loc.latitude, loc.longitude),
        Place::City { city, country } => {
            format!("city={},{}", city.to_lowercase(), country.to_lowercase())
        }
    }
}

/// Persisted cache value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: Vec<DayPrayerTimes>,
    /// Epoch millis at write time.
    pub timestamp: i64,
}

/// A cache hit plus how old it was when read.
#[derive(Debug, Clone)]
pub struct CachedValue {
    pub entry: CacheEntry,
    pub age: Duration,
}

pub struct PrayerCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl PrayerCache {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the entry regardless of age. Entries that no longer decode
    /// are reported as misses.
    pub async fn get(&self, key: &CacheKey) -> Result<Option<CachedValue>, StoreError> {
        let storage_key = key.storage_key();
        let Some(raw) = self.store.get(&storage_key).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) => {
                let age = Duration::milliseconds(self.clock.now_millis() - entry.timestamp);
                Ok(Some(CachedValue { entry, age }))
            }
            Err(e) => {
                log::warn!("Ignoring undecodable cache entry key={}: {}", storage_key, e);
                Ok(None)
            }
        }
    }

    /// Overwrite `key` with `data`, stamped with the current time.
    pub async fn set(&self, key: &CacheKey, data: &[DayPrayerTimes]) -> Result<(), StoreError> {
        let entry = CacheEntry {
            data: data.to_vec(),
            timestamp: self.clock.now_millis(),
        };
        let raw = serde_json::to_string(&entry).map_err(|e| StoreError::Other(e.to_string()))?;
        self.store.set(&key.storage_key(), &raw).await
    }

    pub fn is_fresh(&self, value: &CachedValue) -> bool {
        value.age < self.ttl
    }

    /// Remove every prefixed key. Returns how many were removed.
    pub async fn clear(&self) -> Result<usize, StoreError> {
        let keys = self.store.list_keys().await?;
        let mut removed = 0;
        for key in keys.iter().filter(|k| k.starts_with(CACHE_PREFIX)) {
            self.store.delete(key).await?;
            removed += 1;
        }
        log::info!("Cleared {} prayer times cache entries", removed);
        Ok(removed)
    }
}
