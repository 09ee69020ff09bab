use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

pub const DEFAULT_ENDPOINT: &str = "https://affiliates.tryfleur.com/api/analytics";
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "1h")]
    LastHour,
    #[default]
    #[serde(rename = "24h")]
    LastDay,
    #[serde(rename = "7d")]
    LastWeek,
    #[serde(rename = "30d")]
    LastMonth,
    #[serde(rename = "90d")]
    LastQuarter,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::LastHour => "1h",
            TimeRange::LastDay => "24h",
            TimeRange::LastWeek => "7d",
            TimeRange::LastMonth => "30d",
            TimeRange::LastQuarter => "90d",
        }
    }
}

impl FromStr for TimeRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "1h" => Ok(TimeRange::LastHour),
            "24h" => Ok(TimeRange::LastDay),
            "7d" => Ok(TimeRange::LastWeek),
            "30d" => Ok(TimeRange::LastMonth),
            "90d" => Ok(TimeRange::LastQuarter),
            other => Err(Error::InvalidTimeRange(other.to_string())),
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicitly supplied settings. They win over page attributes and defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardOptions {
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub shop_id: Option<String>,

    #[serde(default)]
    pub refresh_interval_secs: Option<u64>,

    #[serde(default)]
    pub time_range: Option<TimeRange>,
}

/// `data-*` settings found on the bound element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionAttributes {
    pub api_url: Option<String>,
    pub shop: Option<String>,
    pub refresh_interval: Option<String>,
}

impl RegionAttributes {
    /// Leading integer of `data-refresh-interval`; zero or garbage is ignored.
    pub fn refresh_interval_secs(&self) -> Option<u64> {
        let raw = self.refresh_interval.as_deref()?.trim();
        let digits: String = raw.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok().filter(|secs| *secs > 0)
    }
}

/// Settings of one dashboard instance after precedence has been applied.
#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct DashboardConfig {
    #[validate(url)]
    pub endpoint: String,

    pub shop_id: String,

    #[validate(range(min = 1))]
    pub refresh_interval_secs: u64,

    pub time_range: TimeRange,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            shop_id: String::new(),
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            time_range: TimeRange::default(),
        }
    }
}

impl DashboardConfig {
    /// Options first, then element attributes, then defaults.
    pub fn resolve(options: &DashboardOptions, attributes: &RegionAttributes) -> Result<Self> {
        let defaults = Self::default();
        let non_empty = |s: &Option<String>| s.clone().filter(|v| !v.trim().is_empty());

        let config = Self {
            endpoint: non_empty(&options.endpoint)
                .or_else(|| non_empty(&attributes.api_url))
                .unwrap_or(defaults.endpoint),
            shop_id: non_empty(&options.shop_id)
                .or_else(|| non_empty(&attributes.shop))
                .unwrap_or(defaults.shop_id),
            refresh_interval_secs: options
                .refresh_interval_secs
                .filter(|secs| *secs > 0)
                .or_else(|| attributes.refresh_interval_secs())
                .unwrap_or(defaults.refresh_interval_secs),
            time_range: options.time_range.unwrap_or(defaults.time_range),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BootstrapConfig {
    /// HTML page holding the dashboard markup.
    #[serde(default)]
    #[validate(length(min = 1))]
    pub page: String,

    #[serde(default)]
    pub dashboard: DashboardOptions,

    #[serde(default)]
    pub widget: DashboardOptions,

    #[serde(default)]
    pub output: Option<OutputConfig>,

    #[serde(default)]
    pub progress: bool,

    /// Optional path to a parent configuration file to inherit from
    #[serde(default)]
    pub extends: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputConfig {
    Console,
    JsonLines { path: String },
}
