//! Test configuration helpers

use std::path::Path;
use std::time::Duration;
use wallpaper_dl::{Config, FetchConfig};

/// Fetch settings with short delays so retry tests finish quickly
pub fn fast_fetch_config(max_attempts: u32) -> FetchConfig {
    FetchConfig {
        timeout: Duration::from_secs(2),
        max_attempts,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        ..Default::default()
    }
}

/// Config targeting `resolution`, writing to `output_dir`, querying `sites`
pub fn test_config(resolution: &str, output_dir: &Path, sites: &[&str]) -> Config {
    Config {
        resolution: resolution.to_string(),
        output_dir: output_dir.to_path_buf(),
        sites: sites.iter().map(|s| s.to_string()).collect(),
        workers: 2,
        max_items_per_theme: None,
        dry_run: false,
        fetch: fast_fetch_config(3),
    }
}

/// Owned theme list
pub fn themes(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
