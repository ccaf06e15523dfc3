/// Format a duration in seconds to "Xh Ym" or "Ym" string
pub fn format_duration_secs(secs: i64) -> String {
    if secs <= 0 {
        return "now".to_string();
    }
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// Signed minute offset, blank when zero: "+5m", "-10m", "".
pub fn format_adjustment(minutes: i32) -> String {
    match minutes {
        0 => String::new(),
        m if m > 0 => format!("+{}m", m),
        m => format!("{}m", m),
    }
}
