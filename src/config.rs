//! Run configuration: market selection, time windows, bar intervals and the
//! validation that happens before any network request is issued.

use std::path::{Path, PathBuf};

use chrono::Duration;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown market '{0}', expected 'us' or 'india'")]
    InvalidMarket(String),

    #[error("unsupported interval '{0}'")]
    InvalidInterval(String),

    #[error("unknown window unit '{0}', expected 'days', 'weeks' or 'months'")]
    InvalidWindowUnit(String),

    #[error("{what} must be greater than zero")]
    NonPositive { what: &'static str },

    #[error(
        "chart window of {requested_days} days exceeds the {limit_days}-day lookback limit for interval '{interval}'"
    )]
    LookbackExceeded {
        interval: Interval,
        limit_days: i64,
        requested_days: i64,
    },
}

/// Which symbol universe to analyze. Carries the provider suffix and the
/// default symbol list shipped with the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Market {
    Us,
    India,
}

impl Market {
    pub fn parse(token: &str) -> Result<Self, ConfigError> {
        match token.trim().to_lowercase().as_str() {
            "us" => Ok(Market::Us),
            "india" => Ok(Market::India),
            _ => Err(ConfigError::InvalidMarket(token.to_string())),
        }
    }

    /// Provider suffix appended to every symbol of this market.
    pub fn suffix(&self) -> &'static str {
        match self {
            Market::Us => "",
            Market::India => ".NS",
        }
    }

    pub fn with_suffix(&self, symbol: &str) -> String {
        format!("{}{}", symbol, self.suffix())
    }

    pub fn default_csv(&self) -> PathBuf {
        match self {
            Market::Us => Path::new("csv").join("us.csv"),
            Market::India => Path::new("csv").join("india.csv"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowUnit {
    Days,
    Weeks,
    Months,
}

impl WindowUnit {
    pub fn parse(token: &str) -> Result<Self, ConfigError> {
        match token.trim().to_lowercase().as_str() {
            "days" | "day" => Ok(WindowUnit::Days),
            "weeks" | "week" => Ok(WindowUnit::Weeks),
            "months" | "month" => Ok(WindowUnit::Months),
            _ => Err(ConfigError::InvalidWindowUnit(token.to_string())),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            WindowUnit::Days => "days",
            WindowUnit::Weeks => "weeks",
            WindowUnit::Months => "months",
        }
    }
}

/// A backwards-looking time window, e.g. "30 days" or "6 months".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub amount: u32,
    pub unit: WindowUnit,
}

impl Window {
    pub fn new(amount: u32, unit: WindowUnit) -> Self {
        Self { amount, unit }
    }

    // Months use a 30-day approximation, which is what the provider's
    // date-range queries expect anyway.
    pub fn to_duration(&self) -> Duration {
        let amount = i64::from(self.amount);
        match self.unit {
            WindowUnit::Days => Duration::days(amount),
            WindowUnit::Weeks => Duration::weeks(amount),
            WindowUnit::Months => Duration::days(amount * 30),
        }
    }

    pub fn label(&self) -> String {
        format!("{}{}", self.amount, self.unit.label())
    }
}

/// The enumerated bar intervals the provider understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Min1,
    Min5,
    Min15,
    Min30,
    Hour1,
    Hour2,
    Hour3,
    Hour4,
    Day1,
    Day2,
    Day5,
    Week1,
    Week2,
    Month1,
    Month3,
}

impl Interval {
    pub const ALL: [Interval; 15] = [
        Interval::Min1,
        Interval::Min5,
        Interval::Min15,
        Interval::Min30,
        Interval::Hour1,
        Interval::Hour2,
        Interval::Hour3,
        Interval::Hour4,
        Interval::Day1,
        Interval::Day2,
        Interval::Day5,
        Interval::Week1,
        Interval::Week2,
        Interval::Month1,
        Interval::Month3,
    ];

    pub fn parse(token: &str) -> Result<Self, ConfigError> {
        let re = Regex::new(r"^(\d{1,2})(m|h|d|wk|mo)$").unwrap();
        let invalid = || ConfigError::InvalidInterval(token.to_string());

        let caps = re.captures(token.trim()).ok_or_else(invalid)?;
        let amount: u32 = caps[1].parse().map_err(|_| invalid())?;

        match (amount, &caps[2]) {
            (1, "m") => Ok(Interval::Min1),
            (5, "m") => Ok(Interval::Min5),
            (15, "m") => Ok(Interval::Min15),
            (30, "m") => Ok(Interval::Min30),
            (1, "h") => Ok(Interval::Hour1),
            (2, "h") => Ok(Interval::Hour2),
            (3, "h") => Ok(Interval::Hour3),
            (4, "h") => Ok(Interval::Hour4),
            (1, "d") => Ok(Interval::Day1),
            (2, "d") => Ok(Interval::Day2),
            (5, "d") => Ok(Interval::Day5),
            (1, "wk") => Ok(Interval::Week1),
            (2, "wk") => Ok(Interval::Week2),
            (1, "mo") => Ok(Interval::Month1),
            (3, "mo") => Ok(Interval::Month3),
            _ => Err(invalid()),
        }
    }

    /// The provider's query token for this interval.
    pub fn code(&self) -> &'static str {
        match self {
            Interval::Min1 => "1m",
            Interval::Min5 => "5m",
            Interval::Min15 => "15m",
            Interval::Min30 => "30m",
            Interval::Hour1 => "1h",
            Interval::Hour2 => "2h",
            Interval::Hour3 => "3h",
            Interval::Hour4 => "4h",
            Interval::Day1 => "1d",
            Interval::Day2 => "2d",
            Interval::Day5 => "5d",
            Interval::Week1 => "1wk",
            Interval::Week2 => "2wk",
            Interval::Month1 => "1mo",
            Interval::Month3 => "3mo",
        }
    }

    /// Maximum historical range the provider serves at this granularity.
    /// `None` means the full history is available.
    pub fn max_lookback_days(&self) -> Option<i64> {
        match self {
            Interval::Min1 => Some(7),
            Interval::Min5 | Interval::Min15 | Interval::Min30 => Some(60),
            Interval::Hour1 | Interval::Hour2 | Interval::Hour3 | Interval::Hour4 => Some(730),
            _ => None,
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Immutable configuration for one pipeline run. Constructed once in `main`
/// and passed by reference into every component, so repeated runs never
/// share mutable state.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub market: Market,
    pub csv_path: PathBuf,
    pub symbol_cap: usize,
    pub analysis_window: Window,
    pub chart_window: Window,
    pub interval: Interval,
    pub output_root: PathBuf,
}

impl RunConfig {
    /// Rejects invalid parameter combinations before any network call, so a
    /// bad run produces no partial output. In particular the chart window is
    /// checked against the interval's lookback limit up front instead of
    /// discovering an empty result after a wasted round trip.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol_cap == 0 {
            return Err(ConfigError::NonPositive {
                what: "symbol count",
            });
        }
        if self.analysis_window.amount == 0 {
            return Err(ConfigError::NonPositive {
                what: "analysis window",
            });
        }
        if self.chart_window.amount == 0 {
            return Err(ConfigError::NonPositive {
                what: "chart window",
            });
        }

        let requested_days = self.chart_window.to_duration().num_days();
        if let Some(limit_days) = self.interval.max_lookback_days()
            && requested_days > limit_days
        {
            return Err(ConfigError::LookbackExceeded {
                interval: self.interval,
                limit_days,
                requested_days,
            });
        }

        Ok(())
    }

    /// Output directory derived from the run parameters, so a rerun with the
    /// same parameters overwrites instead of accumulating stale images.
    pub fn output_dir(&self) -> PathBuf {
        self.output_root.join(format!(
            "Analysis_{}_{}",
            self.analysis_window.label(),
            self.interval.code()
        ))
    }
}
