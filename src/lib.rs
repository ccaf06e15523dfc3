//! Prayer-times retrieval: upstream calculation API, 24h local cache with
//! stale fallback, sample data for offline use, and per-prayer minute
//! adjustments.

pub mod cli;
pub mod config;
pub mod db;
pub mod models;
pub mod prayer_times;
pub mod utils;

pub use models::{DayPrayerTimes, Location, PrayerAdjustments, PrayerName, PrayerTime};
pub use prayer_times::{PrayerQuery, PrayerTimesClient, PrayerTimesError};
