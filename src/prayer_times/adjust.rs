use chrono::{Duration, NaiveTime};

/// Shift an `"HH:MM"` time by `minutes`, wrapping across midnight.
///
/// A zero offset returns the input as-is. Input that does not parse as
/// `HH:MM` is returned unchanged.
pub fn adjust_time(time: &str, minutes: i32) -> String {
    if minutes == 0 {
        return time.to_string();
    }
    match NaiveTime::parse_from_str(time, "%H:%M") {
        Ok(t) => {
            let (shifted, _) = t.overflowing_add_signed(Duration::minutes(minutes as i64));
            shifted.format("%H:%M").to_string()
        }
        Err(e) => {
            log::warn!("Not adjusting unparseable time '{}': {}", time, e);
            time.to_string()
        }
    }
}
