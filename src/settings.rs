use std::path::PathBuf;
use std::time::Duration;

use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::CONFY_APP_NAME;
use crate::error::CameraResult;
use crate::eye_level::Easing;

/// User preferences shared with the palette.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub eye_level_locked: bool,
    pub eye_level_target: f64,
    pub aspect_ratio: String,
    pub grid_halves: bool,
    pub grid_thirds: bool,
    pub grid_quarters: bool,
    pub dark_mode: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            eye_level_locked: false,
            eye_level_target: 0.0,
            aspect_ratio: "default".to_string(),
            grid_halves: false,
            grid_thirds: false,
            grid_quarters: false,
            dark_mode: true,
        }
    }
}

/// Timing and scale knobs. Not exposed in the palette.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningSettings {
    pub telemetry_hz: f64,
    pub poll_hz: f64,
    pub quiescence_ms: u64,
    pub drift_tolerance: f64,
    pub animate_eye_level: bool,
    pub animation_duration_ms: u64,
    pub animation_fps: u32,
    pub easing: Easing,
    pub sanitize_settle_ms: u64,
    pub distance_multiplier: f64,
    pub sensor_width_mm: f64,
}

impl Default for TuningSettings {
    fn default() -> Self {
        Self {
            telemetry_hz: 30.0,
            poll_hz: 3.0,
            quiescence_ms: 100,
            drift_tolerance: 0.1,
            animate_eye_level: true,
            animation_duration_ms: 100,
            animation_fps: 30,
            easing: Easing::Cubic,
            sanitize_settle_ms: 10,
            distance_multiplier: 4.0,
            sensor_width_mm: 36.0,
        }
    }
}

const MIN_TICK_HZ: f64 = 0.1;
const MAX_TICK_HZ: f64 = 240.0;
const MAX_ANIMATION_FPS: u32 = 240;
const MAX_ANIMATION_DURATION_MS: u64 = 10_000;

fn clamp_hz(hz: f64, fallback: f64) -> f64 {
    if hz.is_nan() { fallback } else { hz.clamp(MIN_TICK_HZ, MAX_TICK_HZ) }
}

impl TuningSettings {
    fn period(hz: f64) -> Duration {
        Duration::from_secs_f64(1.0 / clamp_hz(hz, MIN_TICK_HZ))
    }

    /// Pull rates and animation timing read from a file into usable ranges.
    pub fn clamped(mut self) -> Self {
        let defaults = Self::default();
        self.telemetry_hz = clamp_hz(self.telemetry_hz, defaults.telemetry_hz);
        self.poll_hz = clamp_hz(self.poll_hz, defaults.poll_hz);
        self.animation_fps = self.animation_fps.clamp(1, MAX_ANIMATION_FPS);
        self.animation_duration_ms = self.animation_duration_ms.min(MAX_ANIMATION_DURATION_MS);
        self
    }

    pub fn telemetry_period(&self) -> Duration {
        Self::period(self.telemetry_hz)
    }

    pub fn poll_period(&self) -> Duration {
        Self::period(self.poll_hz)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.sanitize_settle_ms)
    }
}

/// Where preferences live: the platform config dir, or an explicit directory.
#[derive(Debug, Clone)]
pub enum PrefsStore {
    AppConfig,
    Directory(PathBuf),
}

impl PrefsStore {
    const PREFS: &'static str = "prefs";
    const TUNING: &'static str = "tuning";

    fn load<T: Serialize + DeserializeOwned + Default>(&self, name: &str) -> T {
        let loaded = match self {
            PrefsStore::AppConfig => confy::load(CONFY_APP_NAME, name),
            PrefsStore::Directory(dir) => confy::load_path(dir.join(format!("{}.toml", name))),
        };
        loaded.unwrap_or_else(|e| {
            warn!("Could not read {} settings, using defaults: {}", name, e);
            T::default()
        })
    }

    fn store<T: Serialize>(&self, name: &str, value: &T) -> CameraResult<()> {
        match self {
            PrefsStore::AppConfig => confy::store(CONFY_APP_NAME, name, value)?,
            PrefsStore::Directory(dir) => confy::store_path(dir.join(format!("{}.toml", name)), value)?,
        }
        Ok(())
    }

    pub fn load_preferences(&self) -> Preferences {
        self.load(Self::PREFS)
    }

    pub fn store_preferences(&self, prefs: &Preferences) -> CameraResult<()> {
        self.store(Self::PREFS, prefs)
    }

    pub fn load_tuning(&self) -> TuningSettings {
        self.load::<TuningSettings>(Self::TUNING).clamped()
    }

    pub fn store_tuning(&self, tuning: &TuningSettings) -> CameraResult<()> {
        self.store(Self::TUNING, tuning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferences_round_trip_through_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = PrefsStore::Directory(dir.path().to_path_buf());

        let prefs = Preferences {
            eye_level_locked: true,
            eye_level_target: 162.5,
            aspect_ratio: "16:9".to_string(),
            grid_thirds: true,
            ..Preferences::default()
        };
        store.store_preferences(&prefs).unwrap();
        assert_eq!(store.load_preferences(), prefs);
    }

    #[test]
    fn missing_files_yield_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = PrefsStore::Directory(dir.path().to_path_buf());
        assert_eq!(store.load_preferences(), Preferences::default());
        assert_eq!(store.load_tuning(), TuningSettings::default());
    }

    #[test]
    fn unreadable_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("prefs.toml"), "this is = = not toml").unwrap();
        let store = PrefsStore::Directory(dir.path().to_path_buf());
        assert_eq!(store.load_preferences(), Preferences::default());
    }

    #[test]
    fn palette_keys_are_camel_case() {
        let value = serde_json::to_value(Preferences::default()).unwrap();
        assert_eq!(value["eyeLevelLocked"], false);
        assert_eq!(value["aspectRatio"], "default");
        assert_eq!(value["darkMode"], true);
    }

    #[test]
    fn out_of_range_tuning_is_clamped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = PrefsStore::Directory(dir.path().to_path_buf());
        let wild = TuningSettings {
            telemetry_hz: 1e12,
            poll_hz: 0.0,
            animation_fps: u32::MAX,
            animation_duration_ms: u64::MAX / 2,
            ..TuningSettings::default()
        };
        store.store_tuning(&wild).unwrap();

        let loaded = store.load_tuning();
        assert_eq!(loaded.telemetry_hz, MAX_TICK_HZ);
        assert_eq!(loaded.poll_hz, MIN_TICK_HZ);
        assert_eq!(loaded.animation_fps, MAX_ANIMATION_FPS);
        assert_eq!(loaded.animation_duration_ms, MAX_ANIMATION_DURATION_MS);
        assert!(loaded.telemetry_period() > Duration::ZERO);
    }

    #[test]
    fn extreme_rates_never_give_a_zero_period() {
        let tuning = TuningSettings {
            telemetry_hz: f64::INFINITY,
            poll_hz: f64::NAN,
            ..TuningSettings::default()
        };
        assert!(tuning.telemetry_period() > Duration::ZERO);
        assert_eq!(tuning.poll_period(), Duration::from_secs_f64(1.0 / MIN_TICK_HZ));
    }

    #[test]
    fn tick_periods() {
        let tuning = TuningSettings::default();
        assert_eq!(tuning.poll_period(), Duration::from_secs_f64(1.0 / 3.0));
        assert!(tuning.telemetry_period() < Duration::from_millis(34));
    }
}
