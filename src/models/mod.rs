pub mod adjustments;
pub mod method;
pub mod prayer;

pub use adjustments::{clamp_adjustment, PrayerAdjustments, MAX_ADJUSTMENT_MINUTES};
pub use method::{CalculationMethod, CALC_METHODS, DEFAULT_METHOD_ID};
pub use prayer::{DayPrayerTimes, Location, LocationInfo, Place, PrayerName, PrayerTime};
