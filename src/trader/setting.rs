//! Global setting of the chart engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{LazyLock, RwLock};

use super::utility::get_file_path;
use crate::error::{ChartError, Result};

/// Setting filename
const SETTING_FILENAME: &str = "livechart_setting.json";

/// Default settings
fn default_settings() -> HashMap<String, SettingValue> {
    let mut settings = HashMap::new();

    // Log settings
    settings.insert("log.level".to_string(), SettingValue::Int(20)); // INFO level
    settings.insert("log.console".to_string(), SettingValue::Bool(true));
    settings.insert("log.file".to_string(), SettingValue::Bool(false));

    // Chart settings
    settings.insert("chart.base_timeframe".to_string(), SettingValue::String("1m".to_string()));
    settings.insert("chart.bar_spacing".to_string(), SettingValue::Float(8.0));
    settings.insert("chart.min_bar_spacing".to_string(), SettingValue::Float(2.0));
    settings.insert("chart.max_bar_spacing".to_string(), SettingValue::Float(60.0));
    settings.insert("chart.easing".to_string(), SettingValue::Float(0.25));
    settings.insert("chart.live_smoothing_rate".to_string(), SettingValue::Float(10.0));
    settings.insert("chart.font_size".to_string(), SettingValue::Float(11.0));

    // Simulator settings
    settings.insert("simulator.seed".to_string(), SettingValue::Int(42));
    settings.insert("simulator.start_price".to_string(), SettingValue::Float(100.0));
    settings.insert("simulator.volatility".to_string(), SettingValue::Float(0.12));
    settings.insert("simulator.speed".to_string(), SettingValue::Float(1.0));
    settings.insert("simulator.history".to_string(), SettingValue::Int(600));

    settings
}

/// Setting value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl SettingValue {
    /// Get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as i64
    pub fn as_int(&self) -> Option<i64> {
        match self {
            SettingValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64
    pub fn as_float(&self) -> Option<f64> {
        match self {
            SettingValue::Float(f) => Some(*f),
            SettingValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Settings container
pub struct Settings {
    settings: RwLock<HashMap<String, SettingValue>>,
}

impl Settings {
    /// Create new Settings with defaults, overlaid by the settings file if present
    pub fn new() -> Self {
        let settings = Self::with_defaults();
        match Self::read_file(&get_file_path(SETTING_FILENAME)) {
            Ok(Some(file_settings)) => settings.update(file_settings),
            Ok(None) => {}
            Err(e) => tracing::warn!("failed to read {}: {}", SETTING_FILENAME, e),
        }
        settings
    }

    /// Create Settings holding only the built-in defaults
    pub fn with_defaults() -> Self {
        Self {
            settings: RwLock::new(default_settings()),
        }
    }

    /// Create Settings from defaults overlaid by a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let settings = Self::with_defaults();
        if let Some(file_settings) = Self::read_file(path)? {
            settings.update(file_settings);
        }
        Ok(settings)
    }

    fn read_file(path: &Path) -> Result<Option<HashMap<String, SettingValue>>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Get a setting value
    pub fn get(&self, key: &str) -> Option<SettingValue> {
        self.settings.read().ok()?.get(key).cloned()
    }

    /// Get a string setting
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(|s| s.to_string()))
    }

    /// Get an integer setting
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_int())
    }

    /// Get a float setting
    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.as_float())
    }

    /// Get a bool setting
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    /// Set a setting value
    pub fn set(&self, key: impl Into<String>, value: SettingValue) {
        if let Ok(mut settings) = self.settings.write() {
            settings.insert(key.into(), value);
        }
    }

    /// Update settings from a map
    pub fn update(&self, new_settings: HashMap<String, SettingValue>) {
        if let Ok(mut settings) = self.settings.write() {
            settings.extend(new_settings);
        }
    }

    /// Get all settings as HashMap
    pub fn get_all(&self) -> HashMap<String, SettingValue> {
        self.settings
            .read()
            .map(|settings| settings.clone())
            .unwrap_or_default()
    }

    /// Save settings to the default settings file
    pub fn save(&self) -> Result<()> {
        self.save_to(&get_file_path(SETTING_FILENAME))
    }

    /// Save settings to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let settings = self
            .settings
            .read()
            .map_err(|_| ChartError::Poisoned("settings"))?;
        let json = serde_json::to_string_pretty(&*settings)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

/// Global settings instance
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::new);
