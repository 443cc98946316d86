//! Engine-wide tunables, loaded from a TOML file with environment-variable
//! overrides (spec.md §6), the way `smartscope-core::config::AppConfig`
//! loads from TOML in the teacher.

use crate::error::{FleetError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    pub max_queue_size: usize,
    pub fps: f64,
    pub connect_timeout_secs: u64,
    pub reconnect_attempts: u32,
    pub reconnect_delay_secs: u64,
    pub tracker_staleness_secs: u64,
    pub min_contour_area: f64,
    pub max_tracker_distance: f64,
    pub frame_timeout_secs: u64,
    /// Debounce between successive screenshot saves for one camera
    /// (spec.md §4.4).
    pub screenshot_debounce_secs: u64,
    /// Seconds; clip duration for event-triggered clips
    /// (`BOT_SEND_VIDEO`, spec.md §6).
    pub event_clip_duration_secs: u64,
    /// "W,H" used by the caller of `GetFrame` to resize before JPEG encode
    /// (`SIZE_VIDEO`, spec.md §6). Not consumed by the fleet itself.
    pub size_video: Option<String>,
    /// Advisory only: Tokio's blocking pool is not a hand-controlled
    /// fixed-N pool, unlike the Python original's `ThreadPoolExecutor`
    /// (DESIGN.md Open Question 3).
    pub worker_threads: usize,
    pub screenshots_dir: String,
    pub recordings_dir: String,
    pub snapshots_dir: String,
    pub database_url: String,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 10,
            fps: 30.0,
            connect_timeout_secs: 5,
            reconnect_attempts: 3,
            reconnect_delay_secs: 2,
            tracker_staleness_secs: 2,
            min_contour_area: 1500.0,
            max_tracker_distance: 70.0,
            frame_timeout_secs: 2,
            screenshot_debounce_secs: 2,
            event_clip_duration_secs: 5,
            size_video: None,
            worker_threads: 4,
            screenshots_dir: "media/screenshots".to_string(),
            recordings_dir: "media/recordings".to_string(),
            snapshots_dir: "screenshots/current".to_string(),
            database_url: "sqlite::memory:".to_string(),
        }
    }
}

impl FleetConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: FleetConfig =
            toml::from_str(&content).map_err(|e| FleetError::ConfigInvalid(e.to_string()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| FleetError::ConfigInvalid(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Environment overrides named in spec.md §6
    /// (`SIZE_VIDEO`, `BOT_SEND_VIDEO`, `DATABASE`).
    fn apply_env_overrides(&mut self) {
        if let Ok(size) = std::env::var("SIZE_VIDEO") {
            self.size_video = Some(size);
        }
        if let Ok(secs) = std::env::var("BOT_SEND_VIDEO") {
            if let Ok(secs) = secs.parse() {
                self.event_clip_duration_secs = secs;
            }
        }
        if let Ok(url) = std::env::var("DATABASE") {
            self.database_url = url;
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn tracker_staleness(&self) -> Duration {
        Duration::from_secs(self.tracker_staleness_secs)
    }

    pub fn frame_timeout(&self) -> Duration {
        Duration::from_secs(self.frame_timeout_secs)
    }

    pub fn event_clip_duration(&self) -> Duration {
        Duration::from_secs(self.event_clip_duration_secs)
    }

    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps)
    }

    pub fn screenshot_debounce(&self) -> Duration {
        Duration::from_secs(self.screenshot_debounce_secs)
    }
}
