use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::app::error::AppError;

pub const PREF_SAVE_MIRROR_SETTINGS: &str = "setting.save_scrcpy_settings";
pub const PREF_MIRROR_FLAGS: &str = "data.scrcpy_settings";
pub const PREF_MIRROR_BITRATE: &str = "data.scrcpy_bitrate";
pub const PREF_ADB_VERSION: &str = "adbVersion";
pub const PREF_SCRCPY_VERSION: &str = "scrcpyVersion";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BridgeSettings {
    /// Overrides the directory containing `resources/platform-tools` and `resources/scrcpy`.
    pub resources_dir: String,
    /// Local folder for pulled files. Empty means the user's Desktop.
    pub download_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrowserSettings {
    pub home: String,
    pub root: String,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            home: "/sdcard/".to_string(),
            root: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceSettings {
    pub refresh_interval_secs: u64,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    pub log_level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_level: "INFO".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub bridge: BridgeSettings,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub device: DeviceSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl AppConfig {
    pub fn download_dir(&self) -> PathBuf {
        let configured = self.bridge.download_dir.trim();
        if !configured.is_empty() {
            return PathBuf::from(configured);
        }
        dirs::desktop_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scrcpy-plus")
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("SCRCPY_PLUS_CONFIG_PATH") {
        return PathBuf::from(path);
    }
    config_dir().join("config.json")
}

pub fn preferences_path() -> PathBuf {
    match config_path().parent() {
        Some(parent) => parent.join("preferences.json"),
        None => config_dir().join("preferences.json"),
    }
}

pub fn load_config(trace_id: &str) -> Result<AppConfig, AppError> {
    load_config_from_path(&config_path(), trace_id)
}

pub fn load_config_from_path(path: &Path, trace_id: &str) -> Result<AppConfig, AppError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let raw = fs::read_to_string(path)
        .map_err(|err| AppError::system(format!("Failed to read config: {err}"), trace_id))?;
    let config: AppConfig = serde_json::from_str(&raw)
        .map_err(|err| AppError::system(format!("Failed to parse config: {err}"), trace_id))?;
    Ok(validate_config(config))
}

pub fn save_config_to_path(config: &AppConfig, path: &Path, trace_id: &str) -> Result<(), AppError> {
    write_json(path, config, trace_id)
}

fn write_json<T: Serialize>(path: &Path, value: &T, trace_id: &str) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let payload = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::system(format!("Failed to serialize config: {err}"), trace_id))?;
    fs::write(path, payload)
        .map_err(|err| AppError::system(format!("Failed to write config: {err}"), trace_id))?;
    Ok(())
}

fn ensure_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

fn validate_config(mut config: AppConfig) -> AppConfig {
    if !config.browser.home.trim().starts_with('/') {
        config.browser.home = BrowserSettings::default().home;
    }
    if !config.browser.root.trim().starts_with('/') {
        config.browser.root = BrowserSettings::default().root;
    }
    config.browser.home = ensure_trailing_slash(config.browser.home.trim());
    config.browser.root = ensure_trailing_slash(config.browser.root.trim());
    if config.device.refresh_interval_secs == 0 {
        config.device.refresh_interval_secs = DeviceSettings::default().refresh_interval_secs;
    }
    if config.logging.log_level.trim().is_empty() {
        config.logging.log_level = LoggingSettings::default().log_level;
    }
    config
}

/// Flat key -> string store. Missing keys read as empty / false.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    values: BTreeMap<String, String>,
    path: Option<PathBuf>,
    dirty: bool,
}

impl Preferences {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// An empty store bound to `path`. The first save replaces whatever the
    /// file held.
    pub fn empty_at(path: &Path) -> Self {
        Self {
            path: Some(path.to_path_buf()),
            ..Self::default()
        }
    }

    pub fn load(path: &Path, trace_id: &str) -> Result<Self, AppError> {
        let mut prefs = Self::empty_at(path);
        if !path.exists() {
            return Ok(prefs);
        }
        let raw = fs::read_to_string(path).map_err(|err| {
            AppError::system(format!("Failed to read preferences: {err}"), trace_id)
        })?;
        // Non-string values from older files are dropped rather than failing the load.
        let value: serde_json::Value = serde_json::from_str(&raw).map_err(|err| {
            AppError::system(format!("Failed to parse preferences: {err}"), trace_id)
        })?;
        if let Some(map) = value.as_object() {
            for (key, item) in map {
                if let Some(text) = item.as_str() {
                    prefs.values.insert(key.clone(), text.to_string());
                }
            }
        }
        Ok(prefs)
    }

    pub fn get(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key) == "true"
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if self.values.get(key) != Some(&value) {
            self.values.insert(key.to_string(), value);
            self.dirty = true;
        }
    }

    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.set(key, value.to_string());
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// A store without a path has nowhere to go; it stays dirty.
    pub fn save(&mut self, trace_id: &str) -> Result<(), AppError> {
        let Some(path) = self.path.clone() else {
            if self.dirty {
                warn!(trace_id = %trace_id, "preferences have no backing file, changes kept in memory");
            }
            return Ok(());
        };
        write_json(&path, &self.values, trace_id)?;
        self.dirty = false;
        Ok(())
    }
}
