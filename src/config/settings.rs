use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::models::{Location, PrayerAdjustments, DEFAULT_METHOD_ID};
use crate::prayer_times::api::DEFAULT_BASE_URL;
use crate::prayer_times::cache::DEFAULT_TTL_HOURS;
use crate::prayer_times::client::ClientConfig;

fn default_latitude() -> f64 {
    51.5194682
}
fn default_longitude() -> f64 {
    -0.1360365
}
fn default_city() -> String {
    "London".to_string()
}
fn default_country() -> String {
    "United Kingdom".to_string()
}
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_day_timeout_secs() -> u64 {
    10
}
fn default_calendar_timeout_secs() -> u64 {
    15
}
fn default_probe_timeout_ms() -> u64 {
    3000
}
fn default_ttl_hours() -> i64 {
    DEFAULT_TTL_HOURS
}
fn default_group_size() -> usize {
    5
}
fn default_group_delay_ms() -> u64 {
    100
}
fn default_sample_latency_ms() -> u64 {
    500
}
fn default_method_id() -> u32 {
    DEFAULT_METHOD_ID
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default = "default_city")]
    pub city: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_latitude")]
    pub latitude: f64,
    #[serde(default = "default_longitude")]
    pub longitude: f64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            city: default_city(),
            country: default_country(),
            latitude: default_latitude(),
            longitude: default_longitude(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_day_timeout_secs")]
    pub day_timeout_secs: u64,
    #[serde(default = "default_calendar_timeout_secs")]
    pub calendar_timeout_secs: u64,
    /// Connectivity probe connect timeout.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// IANA timezone hint, e.g. "Europe/London".
    #[serde(default)]
    pub timezone: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            day_timeout_secs: default_day_timeout_secs(),
            calendar_timeout_secs: default_calendar_timeout_secs(),
            probe_timeout_ms: default_probe_timeout_ms(),
            timezone: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_ttl_hours(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_group_size")]
    pub group_size: usize,
    #[serde(default = "default_group_delay_ms")]
    pub group_delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            group_size: default_group_size(),
            group_delay_ms: default_group_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_sample_latency_ms")]
    pub latency_ms: u64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            latency_ms: default_sample_latency_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrayerConfig {
    #[serde(default = "default_method_id")]
    pub method_id: u32,
    #[serde(default)]
    pub adjustments: PrayerAdjustments,
}

impl Default for PrayerConfig {
    fn default() -> Self {
        Self {
            method_id: default_method_id(),
            adjustments: PrayerAdjustments::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub sample: SampleConfig,
    #[serde(default)]
    pub prayer: PrayerConfig,
}

impl AppConfig {
    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("", "", "waqt").context("Could not determine project directories")
    }

    pub fn config_path() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn data_dir() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.data_dir().to_path_buf())
    }

    pub fn db_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("waqt.db"))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Reading {:?}", path))?;
        let config: AppConfig = toml::from_str(&content).context("Parsing config.toml")?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).context("Serializing config")?;
        std::fs::write(path, content).with_context(|| format!("Writing {:?}", path))?;
        Ok(())
    }

    pub fn ensure_data_dir() -> Result<PathBuf> {
        let dir = Self::data_dir()?;
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    pub fn location(&self) -> Location {
        Location::new(self.location.latitude, self.location.longitude)
            .with_place(&self.location.city, &self.location.country)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            cache_ttl: chrono::Duration::hours(self.cache.ttl_hours),
            batch_size: self.batch.group_size.max(1),
            batch_delay: Duration::from_millis(self.batch.group_delay_ms),
            sample_mode: self.sample.enabled,
            sample_latency: Duration::from_millis(self.sample.latency_ms),
        }
    }

    pub fn day_timeout(&self) -> Duration {
        Duration::from_secs(self.api.day_timeout_secs)
    }

    pub fn calendar_timeout(&self) -> Duration {
        Duration::from_secs(self.api.calendar_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.api.probe_timeout_ms)
    }
}
