pub mod adjust;
pub mod api;
pub mod cache;
pub mod client;
pub mod connectivity;
pub mod error;
pub mod sample;
pub mod schema;
pub mod transform;
pub mod validate;

pub use adjust::adjust_time;
pub use api::{AladhanClient, TimingsSource};
pub use cache::{CacheKey, PrayerCache};
pub use client::{ClientConfig, DataSource, Fetched, PrayerQuery, PrayerTimesClient};
pub use connectivity::{AlwaysOnline, ConnectivityMonitor, ConnectivityProbe, StaticProbe, TcpProbe};
pub use error::{PrayerTimesError, ValidationError};
pub use sample::SampleDataProvider;
