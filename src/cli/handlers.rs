use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, Local};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::cli::args::{CacheCommands, SampleAction};
use crate::config::AppConfig;
use crate::models::{clamp_adjustment, DayPrayerTimes, PrayerName, CALC_METHODS};
use crate::prayer_times::{DataSource, PrayerQuery, PrayerTimesClient};
use crate::utils::format::{format_adjustment, format_duration_secs};

// ─── ANSI helpers ────────────────────────────────────────────────────────────

macro_rules! println_colored {
    ($color:expr, $($arg:tt)*) => {{
        print!("{}", $color);
        print!($($arg)*);
        println!("\x1b[0m");
    }};
}

const GREEN: &str = "\x1b[32m";
const AMBER: &str = "\x1b[33m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const GOLD: &str = "\x1b[38;2;196;160;68m";

fn query_from(config: &AppConfig) -> PrayerQuery {
    PrayerQuery::new(config.location(), config.prayer.method_id)
        .with_adjustments(config.prayer.adjustments.clamped())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Serializing output")?
    );
    Ok(())
}

fn print_source_note(source: DataSource) {
    match source {
        DataSource::StaleCache => {
            println_colored!(AMBER, "  Offline or upstream unavailable, showing cached data");
        }
        DataSource::Sample => println_colored!(DIM, "  Sample data mode"),
        DataSource::Live | DataSource::Cache => {}
    }
}

// ─── Times ───────────────────────────────────────────────────────────────────

pub async fn handle_times(
    client: &PrayerTimesClient,
    config: &AppConfig,
    date: Option<&str>,
    json: bool,
) -> Result<()> {
    let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
    let date = date.unwrap_or(&today);
    let fetched = client
        .fetch_prayer_times_for_date_detailed(date, &query_from(config))
        .await
        .with_context(|| format!("Fetching prayer times for {}", date))?;

    if json {
        return print_json(&fetched.data);
    }

    let day = &fetched.data;
    println!();
    println_colored!(
        GOLD,
        "  Prayer Times — {} ({}, {})",
        config.location.city,
        day.date,
        day.hijri_date
    );
    println_colored!(DIM, "  {}", day.method.description);
    println!();

    let now = Local::now().time();
    let is_today = day.date == today;
    for prayer in &day.prayers {
        let line = format!(
            "  {:<10}  {}  {}",
            prayer.name.display_name(),
            prayer.time,
            format_adjustment(prayer.adjustment)
        );
        let past = is_today && prayer.parsed_time().is_some_and(|t| t < now);
        if past {
            println_colored!(DIM, "{}", line);
        } else {
            println_colored!(BOLD, "{}", line);
        }
    }

    if is_today {
        if let Some((next, secs)) = day.next_prayer(now) {
            println!();
            println_colored!(
                AMBER,
                "  Next: {} in {}",
                next.display_name(),
                format_duration_secs(secs)
            );
        }
    }
    println!();
    print_source_note(fetched.source);
    Ok(())
}

// ─── Month ───────────────────────────────────────────────────────────────────

pub async fn handle_month(
    client: &PrayerTimesClient,
    config: &AppConfig,
    year: Option<i32>,
    month: Option<u32>,
    city: Option<(&str, &str)>,
    json: bool,
) -> Result<()> {
    let today = Local::now().date_naive();
    let year = year.unwrap_or(today.year());
    let month = month.unwrap_or(today.month());

    let mut query = query_from(config);
    if let Some((city, country)) = city {
        query = PrayerQuery::by_city(city, country, config.prayer.method_id)
            .with_adjustments(query.adjustments);
    }

    let fetched = client
        .fetch_monthly_calendar_detailed(year, month, &query)
        .await
        .with_context(|| format!("Fetching calendar for {}-{:02}", year, month))?;

    if json {
        return print_json(&fetched.data);
    }

    let place = city.map(|(c, _)| c).unwrap_or(&config.location.city);
    println!();
    println_colored!(GOLD, "  {} — {}-{:02}", place, year, month);
    println!();
    print_table(fetched.data.iter());
    println!();
    print_source_note(fetched.source);
    Ok(())
}

// ─── Batch ───────────────────────────────────────────────────────────────────

pub async fn handle_batch(
    client: &PrayerTimesClient,
    config: &AppConfig,
    dates: &[String],
    json: bool,
) -> Result<()> {
    let results: BTreeMap<String, DayPrayerTimes> = client
        .batch_fetch_prayer_times(dates, &query_from(config))
        .await;

    if json {
        return print_json(&results);
    }

    println!();
    print_table(results.values());
    let missing: Vec<&String> = dates.iter().filter(|d| !results.contains_key(*d)).collect();
    if !missing.is_empty() {
        println!();
        for date in missing {
            println_colored!(AMBER, "  {} — unavailable", date);
        }
    }
    println!();
    Ok(())
}

fn print_table<'a>(days: impl Iterator<Item = &'a DayPrayerTimes>) {
    let header: Vec<String> = PrayerName::ALL
        .iter()
        .map(|p| format!("{:<8}", p.display_name()))
        .collect();
    println_colored!(BOLD, "  {:<12}{}", "Date", header.join(""));
    for day in days {
        let times: Vec<String> = day
            .prayers
            .iter()
            .map(|p| format!("{:<8}", p.time))
            .collect();
        println!("  {:<12}{}", day.date, times.join(""));
    }
}

// ─── Methods ─────────────────────────────────────────────────────────────────

pub fn handle_methods(config: &AppConfig) -> Result<()> {
    println!();
    for (id, name, description) in CALC_METHODS {
        let line = format!("  {:>3}  {:<22} {}", id, name, description);
        if *id == config.prayer.method_id {
            println_colored!(GREEN, "{}", line);
        } else {
            println!("{}", line);
        }
    }
    println!();
    Ok(())
}

// ─── Adjust ──────────────────────────────────────────────────────────────────

pub fn handle_adjust(config: &mut AppConfig, prayer: &str, minutes: i32) -> Result<()> {
    let name = PrayerName::from_str(prayer).map_err(|_| {
        anyhow!(
            "Unknown prayer '{}'. Use: fajr, dhuhr, asr, maghrib, isha",
            prayer
        )
    })?;
    let clamped = clamp_adjustment(minutes);
    if clamped != minutes {
        println_colored!(AMBER, "  Adjustment limited to {} minutes", clamped);
    }
    config.prayer.adjustments.set(name, clamped);
    config.save()?;
    println_colored!(
        GREEN,
        "  ✓ {} adjusted by {} minutes",
        name.display_name(),
        clamped
    );
    Ok(())
}

// ─── Sample mode ─────────────────────────────────────────────────────────────

pub async fn handle_sample(client: &PrayerTimesClient, action: SampleAction) -> Result<()> {
    let enabled = match action {
        SampleAction::On => {
            client.set_sample_data_mode(true).await;
            true
        }
        SampleAction::Off => {
            client.set_sample_data_mode(false).await;
            false
        }
        SampleAction::Toggle => client.toggle_sample_data_mode().await,
        SampleAction::Status => client.is_sample_data_mode(),
    };
    if enabled {
        println_colored!(AMBER, "  Sample data mode: on");
    } else {
        println_colored!(GREEN, "  Sample data mode: off");
    }
    Ok(())
}

// ─── Cache ───────────────────────────────────────────────────────────────────

pub async fn handle_cache(client: &PrayerTimesClient, action: &CacheCommands) -> Result<()> {
    match action {
        CacheCommands::Clear => {
            let removed = client.clear_cache().await.context("Clearing cache")?;
            println_colored!(GREEN, "  ✓ Removed {} cached entries", removed);
        }
    }
    Ok(())
}
