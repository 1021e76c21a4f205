use chrono::Utc;
use clap::Parser;

use crate::age::CalendarDate;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Resident profile card service.
#[derive(Debug, Clone, Parser)]
#[command(name = "resident-card", version, about)]
pub struct Config {
    /// Address the HTTP server binds to.
    #[arg(long, env = "RESIDENT_CARD_LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: String,

    /// Base URL of the resident pages; the uuid is appended as a path segment.
    #[arg(
        long,
        env = "RESIDENT_CARD_BASE_URL",
        default_value = "https://world.secondlife.com/resident"
    )]
    pub base_url: String,

    /// Directory served for every non-API path.
    #[arg(long, env = "RESIDENT_CARD_STATIC_DIR", default_value = "public")]
    pub static_dir: String,

    /// Fixed reference date (YYYY-MM-DD) for age computation. Today (UTC) if unset.
    #[arg(long, env = "RESIDENT_CARD_REFERENCE_DATE")]
    pub reference_date: Option<CalendarDate>,

    /// Label reported as `fetchedBy` in response metadata.
    #[arg(long, env = "RESIDENT_CARD_FETCHED_BY", default_value = "resident-card")]
    pub fetched_by: String,

    /// Timeout for the outbound page fetch.
    #[arg(long, env = "RESIDENT_CARD_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,

    #[arg(long, env = "RESIDENT_CARD_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,
}

impl Config {
    /// The date ages are computed against.
    pub fn reference_date(&self) -> CalendarDate {
        self.reference_date
            .unwrap_or_else(|| Utc::now().date_naive().into())
    }
}
