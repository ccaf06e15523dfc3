use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::CalculationMethod;
use crate::prayer_times::adjust::adjust_time;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrayerName {
    Fajr,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl PrayerName {
    /// Canonical order, fajr through isha.
    pub const ALL: [PrayerName; 5] = [
        PrayerName::Fajr,
        PrayerName::Dhuhr,
        PrayerName::Asr,
        PrayerName::Maghrib,
        PrayerName::Isha,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrayerName::Fajr => "fajr",
            PrayerName::Dhuhr => "dhuhr",
            PrayerName::Asr => "asr",
            PrayerName::Maghrib => "maghrib",
            PrayerName::Isha => "isha",
        }
    }

    /// Key used by the upstream `timings` object.
    pub fn display_name(&self) -> &'static str {
        match self {
            PrayerName::Fajr => "Fajr",
            PrayerName::Dhuhr => "Dhuhr",
            PrayerName::Asr => "Asr",
            PrayerName::Maghrib => "Maghrib",
            PrayerName::Isha => "Isha",
        }
    }
}

impl std::fmt::Display for PrayerName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for PrayerName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fajr" => Ok(PrayerName::Fajr),
            "dhuhr" | "zuhr" | "dhuhur" => Ok(PrayerName::Dhuhr),
            "asr" => Ok(PrayerName::Asr),
            "maghrib" => Ok(PrayerName::Maghrib),
            "isha" => Ok(PrayerName::Isha),
            _ => Err(anyhow::anyhow!("Unknown prayer name: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrayerTime {
    pub name: PrayerName,
    /// Adjusted "HH:MM".
    pub time: String,
    /// Upstream "HH:MM" before adjustment.
    pub original_time: String,
    pub adjustment: i32,
    pub notification_enabled: bool,
    /// Reset once per day.
    pub is_notified: bool,
}

impl PrayerTime {
    pub fn new(name: PrayerName, original_time: &str, adjustment: i32) -> Self {
        Self {
            name,
            time: adjust_time(original_time, adjustment),
            original_time: original_time.to_string(),
            adjustment,
            notification_enabled: true,
            is_notified: false,
        }
    }

    /// Recompute `time` for a new adjustment, keeping notification state.
    pub fn readjust(&mut self, adjustment: i32) {
        self.adjustment = adjustment;
        self.time = adjust_time(&self.original_time, adjustment);
    }

    pub fn parsed_time(&self) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(&self.time, "%H:%M").ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationInfo {
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayPrayerTimes {
    /// `YYYY-MM-DD`
    pub date: String,
    pub hijri_date: String,
    /// Exactly one entry per [`PrayerName`], in canonical order.
    pub prayers: Vec<PrayerTime>,
    pub location: LocationInfo,
    pub method: CalculationMethod,
}

impl DayPrayerTimes {
    pub fn prayer(&self, name: PrayerName) -> Option<&PrayerTime> {
        self.prayers.iter().find(|p| p.name == name)
    }

    pub fn set_notification_enabled(&mut self, name: PrayerName, enabled: bool) {
        if let Some(p) = self.prayers.iter_mut().find(|p| p.name == name) {
            p.notification_enabled = enabled;
        }
    }

    pub fn reset_notifications(&mut self) {
        for p in &mut self.prayers {
            p.is_notified = false;
        }
    }

    /// Returns the next prayer after `now` and the seconds until it, or
    /// `None` once isha has passed.
    pub fn next_prayer(&self, now: NaiveTime) -> Option<(PrayerName, i64)> {
        self.prayers.iter().find_map(|p| {
            let time = p.parsed_time()?;
            (time > now).then(|| (p.name, (time - now).num_seconds()))
        })
    }
}

/// Caller-supplied location. City and country are display-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            city: None,
            country: None,
        }
    }

    pub fn with_place(mut self, city: impl Into<String>, country: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self.country = Some(country.into());
        self
    }
}

/// What a request is keyed on: explicit coordinates, or a city the
/// upstream resolves itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Place {
    Coordinates(Location),
    City { city: String, country: String },
}

impl std::fmt::Display for Place {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Place::Coordinates(loc) => write!(f, "lat={} lng={}", loc.latitude, loc.longitude),
            Place::City { city, country } => write!(f, "city={} country={}", city, country),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> DayPrayerTimes {
        DayPrayerTimes {
            date: "2025-01-01".to_string(),
            hijri_date: "1 Rajab 1446 AH".to_string(),
            prayers: vec![
                PrayerTime::new(PrayerName::Fajr, "06:06", 0),
                PrayerTime::new(PrayerName::Dhuhr, "12:09", 0),
                PrayerTime::new(PrayerName::Asr, "13:46", 0),
                PrayerTime::new(PrayerName::Maghrib, "16:02", 0),
                PrayerTime::new(PrayerName::Isha, "17:56", 0),
            ],
            location: LocationInfo {
                city: "London".to_string(),
                country: "UK".to_string(),
                latitude: 51.52,
                longitude: -0.14,
            },
            method: CalculationMethod::from_id(3),
        }
    }

    #[test]
    fn parses_aliases() {
        assert_eq!("Zuhr".parse::<PrayerName>().unwrap(), PrayerName::Dhuhr);
        assert_eq!("ISHA".parse::<PrayerName>().unwrap(), PrayerName::Isha);
        assert!("sunrise".parse::<PrayerName>().is_err());
    }

    #[test]
    fn next_prayer_picks_first_upcoming() {
        let d = day();
        let now = NaiveTime::from_hms_opt(13, 0, 0).unwrap();
        let (name, secs) = d.next_prayer(now).unwrap();
        assert_eq!(name, PrayerName::Asr);
        assert_eq!(secs, 46 * 60);

        let late = NaiveTime::from_hms_opt(23, 0, 0).unwrap();
        assert!(d.next_prayer(late).is_none());
    }

    #[test]
    fn readjust_keeps_invariant() {
        let mut p = PrayerTime::new(PrayerName::Fajr, "06:06", 0);
        p.is_notified = true;
        p.readjust(5);
        assert_eq!(p.time, "06:11");
        assert_eq!(p.adjustment, 5);
        assert!(p.is_notified);
    }

    #[test]
    fn reset_notifications_clears_all() {
        let mut d = day();
        for p in &mut d.prayers {
            p.is_notified = true;
        }
        d.set_notification_enabled(PrayerName::Asr, false);
        d.reset_notifications();
        assert!(d.prayers.iter().all(|p| !p.is_notified));
        assert!(!d.prayer(PrayerName::Asr).unwrap().notification_enabled);
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(day()).unwrap();
        assert!(json.get("hijriDate").is_some());
        assert_eq!(json["prayers"][0]["originalTime"], "06:06");
        assert_eq!(json["prayers"][0]["name"], "fajr");
    }
}
