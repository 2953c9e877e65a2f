//! Configuration types for wallpaper-dl
//!
//! A [`Config`] is an immutable value handed to the coordinator; no component
//! reads global state. Every field has a serde default so partial JSON
//! documents deserialize cleanly.

use crate::error::{Error, Result};
use crate::resolution::Resolution;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// HTTP fetch and retry settings
///
/// Attempt `n` (1-based) that fails waits `base_delay * backoff_multiplier^(n-1)`
/// before attempt `n + 1`, capped at `max_delay`. No wait follows the final attempt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout (default: 10 seconds)
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Total number of attempts including the first one (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (default: 1 second)
    #[serde(default = "default_base_delay", with = "duration_serde")]
    pub base_delay: Duration,

    /// Upper bound for any single backoff delay (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Additional headers sent with every request
    #[serde(default = "default_headers")]
    pub headers: BTreeMap<String, String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            max_attempts: default_max_attempts(),
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
            user_agent: default_user_agent(),
            headers: default_headers(),
        }
    }
}

impl FetchConfig {
    /// Check the retry policy for values that would make every fetch fail
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::config(
                "fetch.max_attempts",
                "max_attempts must be at least 1",
            ));
        }
        if self.timeout.is_zero() {
            return Err(Error::config("fetch.timeout", "timeout must be positive"));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(Error::config(
                "fetch.backoff_multiplier",
                format!(
                    "backoff_multiplier must be a finite value >= 1.0, got {}",
                    self.backoff_multiplier
                ),
            ));
        }
        Ok(())
    }
}

/// Top-level acquisition configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Desired resolution as `"WIDTHxHEIGHT"` (default: "5120x1440")
    #[serde(default = "default_resolution")]
    pub resolution: String,

    /// Flat directory receiving accepted images (default: "./wallpapers")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Source identifiers to query, in priority order
    #[serde(default = "default_sites")]
    pub sites: Vec<String>,

    /// Number of concurrent download workers (default: 4)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Cap on candidates per theme (None = unlimited, default: 10)
    #[serde(default = "default_max_items_per_theme")]
    pub max_items_per_theme: Option<usize>,

    /// Plan only: discover and filter, but fetch nothing
    #[serde(default)]
    pub dry_run: bool,

    /// HTTP fetch and retry settings
    #[serde(default)]
    pub fetch: FetchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            output_dir: default_output_dir(),
            sites: default_sites(),
            workers: default_workers(),
            max_items_per_theme: default_max_items_per_theme(),
            dry_run: false,
            fetch: FetchConfig::default(),
        }
    }
}

/// Settings that passed validation and are safe to run with
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSettings {
    /// Parsed target resolution
    pub target: Resolution,
    /// Output directory (non-empty path)
    pub output_dir: PathBuf,
    /// Worker pool size (at least 1)
    pub workers: usize,
}

impl Config {
    /// Validate the configuration before any work starts
    ///
    /// Every failure here is an [`Error::Config`] and aborts the run.
    pub fn validate(&self) -> Result<RunSettings> {
        let target: Resolution = self.resolution.parse()?;
        if target.is_small() {
            tracing::warn!(
                resolution = %target,
                "Resolution is quite small, results may be limited"
            );
        }

        if self.output_dir.as_os_str().is_empty() {
            return Err(Error::config(
                "output_dir",
                "output directory path must not be empty",
            ));
        }

        if self.workers == 0 {
            return Err(Error::config("workers", "worker count must be at least 1"));
        }

        if self.max_items_per_theme == Some(0) {
            return Err(Error::config(
                "max_items_per_theme",
                "max_items_per_theme must be at least 1 when set",
            ));
        }

        self.fetch.validate()?;

        Ok(RunSettings {
            target,
            output_dir: self.output_dir.clone(),
            workers: self.workers,
        })
    }
}

fn default_resolution() -> String {
    "5120x1440".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("wallpapers")
}

fn default_sites() -> Vec<String> {
    vec![
        "wallpaperswide.com".to_string(),
        "wallhaven.cc".to_string(),
        "wallpaperbat.com".to_string(),
    ]
}

fn default_workers() -> usize {
    4
}

fn default_max_items_per_theme() -> Option<usize> {
    Some(10)
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36"
        .to_string()
}

fn default_headers() -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "Accept".to_string(),
            "image/avif,image/webp,image/png,image/jpeg,*/*;q=0.8".to_string(),
        ),
        ("Accept-Language".to_string(), "en-US,en;q=0.5".to_string()),
    ])
}

// Durations are written as (fractional) seconds
mod duration_serde {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|_| D::Error::custom(format!("invalid duration in seconds: {}", secs)))
    }
}
