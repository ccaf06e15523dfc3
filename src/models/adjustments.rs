use serde::{Deserialize, Serialize};

use crate::models::PrayerName;

/// Largest offset, in minutes, the UI lets a user apply to a prayer.
pub const MAX_ADJUSTMENT_MINUTES: i32 = 30;

/// Per-prayer minute offsets. Missing entries mean no adjustment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrayerAdjustments {
    #[serde(default)]
    pub fajr: i32,
    #[serde(default)]
    pub dhuhr: i32,
    #[serde(default)]
    pub asr: i32,
    #[serde(default)]
    pub maghrib: i32,
    #[serde(default)]
    pub isha: i32,
}

impl PrayerAdjustments {
    pub fn get(&self, name: PrayerName) -> i32 {
        match name {
            PrayerName::Fajr => self.fajr,
            PrayerName::Dhuhr => self.dhuhr,
            PrayerName::Asr => self.asr,
            PrayerName::Maghrib => self.maghrib,
            PrayerName::Isha => self.isha,
        }
    }

    pub fn set(&mut self, name: PrayerName, minutes: i32) {
        let slot = match name {
            PrayerName::Fajr => &mut self.fajr,
            PrayerName::Dhuhr => &mut self.dhuhr,
            PrayerName::Asr => &mut self.asr,
            PrayerName::Maghrib => &mut self.maghrib,
            PrayerName::Isha => &mut self.isha,
        };
        *slot = minutes;
    }

    pub fn with(mut self, name: PrayerName, minutes: i32) -> Self {
        self.set(name, minutes);
        self
    }

    /// Copy with every offset limited to +/- [`MAX_ADJUSTMENT_MINUTES`].
    pub fn clamped(&self) -> Self {
        let mut out = *self;
        for name in PrayerName::ALL {
            out.set(name, clamp_adjustment(self.get(name)));
        }
        out
    }
}

pub fn clamp_adjustment(minutes: i32) -> i32 {
    minutes.clamp(-MAX_ADJUSTMENT_MINUTES, MAX_ADJUSTMENT_MINUTES)
}
