use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "waqt", version, author, about = "Prayer times with offline cache and demo data")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show prayer times for a day and the countdown to the next prayer
    Times {
        /// Date as YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show a monthly calendar
    Month {
        /// Year (default: current)
        #[arg(long)]
        year: Option<i32>,
        /// Month 1-12 (default: current)
        #[arg(long)]
        month: Option<u32>,
        /// Look up by city instead of configured coordinates
        #[arg(long, requires = "country")]
        city: Option<String>,
        /// Country for --city
        #[arg(long, requires = "city")]
        country: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Fetch several dates at once
    Batch {
        /// Dates as YYYY-MM-DD
        #[arg(required = true)]
        dates: Vec<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List calculation methods
    Methods,
    /// Set a per-prayer adjustment in minutes (clamped to -30..=30)
    Adjust {
        /// Prayer name (fajr, dhuhr, asr, maghrib, isha)
        prayer: String,
        /// Offset in minutes
        #[arg(allow_hyphen_values = true)]
        minutes: i32,
    },
    /// Sample data mode for offline demos
    Sample {
        #[arg(value_enum, default_value_t = SampleAction::Status)]
        action: SampleAction,
    },
    /// Prayer times cache management
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleAction {
    On,
    Off,
    Toggle,
    Status,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Remove all cached prayer times
    Clear,
}
