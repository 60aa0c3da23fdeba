use super::files::{atomic_write, read_file};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// User preferences stored in settings.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Refresh interval of `tether watch`
    pub tick_ms: u64,
    pub use_12_hour_clock: bool,
    /// Log filter used when RUST_LOG is unset
    pub log_filter: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            tick_ms: crate::ticker::DEFAULT_TICK_MS,
            use_12_hour_clock: true,
            log_filter: None,
        }
    }
}

/// Load settings, falling back to defaults when the file is missing or malformed
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<AppSettings> {
    let path = path.as_ref();
    let Some(content) = read_file(path)? else {
        return Ok(AppSettings::default());
    };

    match serde_json::from_str(&content) {
        Ok(settings) => Ok(settings),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring malformed settings");
            Ok(AppSettings::default())
        }
    }
}

pub fn save_settings<P: AsRef<Path>>(path: P, settings: &AppSettings) -> Result<()> {
    let json = serde_json::to_string_pretty(settings)?;
    atomic_write(path, &json)
}
