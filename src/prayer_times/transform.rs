use crate::models::{
    CalculationMethod, DayPrayerTimes, Location, LocationInfo, Place, PrayerAdjustments,
    PrayerName, PrayerTime,
};
use crate::prayer_times::schema::UpstreamCalendarDate;
use crate::prayer_times::validate::ValidatedDay;

pub const UNKNOWN_CITY: &str = "Unknown City";
pub const UNKNOWN_COUNTRY: &str = "Unknown Country";

/// Inputs that are the same for every day of one request.
#[derive(Debug, Clone, Copy)]
pub struct TransformContext<'a> {
    pub place: &'a Place,
    pub method_id: u32,
    pub adjustments: &'a PrayerAdjustments,
}

/// Drop a trailing parenthetical note such as `" (UTC)"` or `" (+03)"`.
pub fn strip_timezone_note(raw: &str) -> &str {
    match raw.find('(') {
        Some(idx) => raw[..idx].trim(),
        None => raw.trim(),
    }
}

/// `"01-07-1446"` + `"Rajab"` -> `"1 Rajab 1446 AH"`. Empty when the
/// upstream did not send enough to build it.
pub fn format_hijri(hijri: &UpstreamCalendarDate) -> String {
    let Some(date) = hijri.date.as_deref() else {
        return String::new();
    };
    let mut parts = date.split('-');
    let (Some(day), Some(_month), Some(year)) = (parts.next(), parts.next(), parts.next()) else {
        return String::new();
    };
    let Some(month_name) = hijri.month.as_ref().and_then(|m| m.en.as_deref()) else {
        return String::new();
    };
    let day = day
        .trim()
        .parse::<u32>()
        .map(|d| d.to_string())
        .unwrap_or_else(|_| day.trim().to_string());
    format!("{} {} {} AH", day, month_name, year.trim())
}

pub fn transform_day(day: &ValidatedDay, ctx: &TransformContext<'_>) -> DayPrayerTimes {
    let prayers = PrayerName::ALL
        .iter()
        .map(|&name| {
            let original = strip_timezone_note(day.timing(name));
            PrayerTime::new(name, original, ctx.adjustments.get(name))
        })
        .collect();

    DayPrayerTimes {
        date: day.date.format("%Y-%m-%d").to_string(),
        hijri_date: day.hijri.as_ref().map(format_hijri).unwrap_or_default(),
        prayers,
        location: location_info(day, ctx.place),
        method: resolve_method(day, ctx.method_id),
    }
}

pub fn transform_days(days: &[ValidatedDay], ctx: &TransformContext<'_>) -> Vec<DayPrayerTimes> {
    days.iter().map(|d| transform_day(d, ctx)).collect()
}

/// Re-derive `time` on cached records from the caller's current offsets.
pub fn apply_adjustments(days: &mut [DayPrayerTimes], adjustments: &PrayerAdjustments) {
    for day in days {
        for prayer in &mut day.prayers {
            prayer.readjust(adjustments.get(prayer.name));
        }
    }
}

/// Coordinate keys ignore display names, so cached records take the
/// caller's current labels.
pub fn apply_place_labels(days: &mut [DayPrayerTimes], place: &Place) {
    if let Place::Coordinates(loc) = place {
        for day in days {
            day.location = coordinate_info(loc);
        }
    }
}

fn coordinate_info(loc: &Location) -> LocationInfo {
    LocationInfo {
        city: loc.city.clone().unwrap_or_else(|| UNKNOWN_CITY.to_string()),
        country: loc
            .country
            .clone()
            .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string()),
        latitude: loc.latitude,
        longitude: loc.longitude,
    }
}

fn location_info(day: &ValidatedDay, place: &Place) -> LocationInfo {
    match place {
        Place::Coordinates(loc) => coordinate_info(loc),
        Place::City { city, country } => {
            let meta = day.meta.as_ref();
            LocationInfo {
                city: city.clone(),
                country: country.clone(),
                latitude: meta.and_then(|m| m.latitude).unwrap_or_default(),
                longitude: meta.and_then(|m| m.longitude).unwrap_or_default(),
            }
        }
    }
}

fn resolve_method(day: &ValidatedDay, method_id: u32) -> CalculationMethod {
    let mut method = CalculationMethod::from_id(method_id);
    if !CalculationMethod::is_known(method_id) {
        if let Some(name) = day
            .meta
            .as_ref()
            .and_then(|m| m.method.as_ref())
            .and_then(|m| m.name.clone())
        {
            method.description = name;
        }
    }
    method
}
