use crate::error::AppError;
use crate::gantt::GanttConfig;
use crate::model::normalize_token;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "TASKFLOW_CONFIG_PATH";
const API_KEY_ENV_VARS: [&str; 2] = ["TASKFLOW_AI_API_KEY", "GEMINI_API_KEY"];

pub const DEFAULT_AI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_AI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const MAX_PADDING_DAYS: i64 = 365;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub current_user: Option<String>,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub gantt: GanttSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_AI_MODEL.to_string(),
            base_url: DEFAULT_AI_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GanttSettings {
    pub day_width: f64,
    pub row_height: f64,
    pub padding_days: i64,
}

impl Default for GanttSettings {
    fn default() -> Self {
        let defaults = GanttConfig::default();
        Self {
            day_width: defaults.day_width,
            row_height: defaults.row_height,
            padding_days: defaults.padding_days,
        }
    }
}

impl Config {
    pub fn gantt_config(&self) -> GanttConfig {
        GanttConfig {
            day_width: self.gantt.day_width,
            row_height: self.gantt.row_height,
            padding_days: self.gantt.padding_days,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

/// Typed values from `--config-override KEY=VALUE` flags.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConfigOverrides {
    pub current_user: Option<String>,
    pub ai_model: Option<String>,
    pub ai_base_url: Option<String>,
    pub ai_api_key: Option<String>,
    pub ai_timeout_secs: Option<u64>,
    pub gantt_day_width: Option<f64>,
    pub gantt_row_height: Option<f64>,
    pub gantt_padding_days: Option<i64>,
}

impl ConfigOverrides {
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(AppError::invalid_input(format!(
                "config override '{key}' needs a value"
            )));
        }
        match normalize_token(key).as_str() {
            "current_user" | "user" => self.current_user = Some(value.to_string()),
            "ai_model" => self.ai_model = Some(value.to_string()),
            "ai_base_url" => self.ai_base_url = Some(value.trim_end_matches('/').to_string()),
            "ai_api_key" => self.ai_api_key = Some(value.to_string()),
            "ai_timeout_secs" | "ai_timeout" => {
                self.ai_timeout_secs = Some(parse_number(key, value)?)
            }
            "gantt_day_width" => self.gantt_day_width = Some(parse_positive(key, value)?),
            "gantt_row_height" => self.gantt_row_height = Some(parse_positive(key, value)?),
            "gantt_padding_days" => self.gantt_padding_days = Some(parse_padding(key, value)?),
            _ => {
                return Err(AppError::invalid_input(format!(
                    "unknown config override: {key}"
                )));
            }
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, AppError> {
    value
        .parse()
        .map_err(|_| AppError::invalid_input(format!("config override '{key}' must be a number")))
}

fn parse_positive(key: &str, value: &str) -> Result<f64, AppError> {
    let parsed: f64 = parse_number(key, value)?;
    if !parsed.is_finite() || parsed <= 0.0 {
        return Err(AppError::invalid_input(format!(
            "config override '{key}' must be positive"
        )));
    }
    Ok(parsed)
}

fn parse_padding(key: &str, value: &str) -> Result<i64, AppError> {
    let parsed: i64 = parse_number(key, value)?;
    if !(0..=MAX_PADDING_DAYS).contains(&parsed) {
        return Err(AppError::invalid_input(format!(
            "config override '{key}' must be between 0 and {MAX_PADDING_DAYS}"
        )));
    }
    Ok(parsed)
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata)
            .join("taskflow")
            .join(CONFIG_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("taskflow")
            .join(CONFIG_FILE_NAME))
    }
}

pub fn load_config_with_fallback() -> ConfigLoad {
    let mut load = match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    };
    if let Some(key) = api_key_from_env() {
        load.config.ai.api_key = Some(key);
    }
    load
}

fn api_key_from_env() -> Option<String> {
    API_KEY_ENV_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let config: Config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    Ok(normalize_config(config))
}

fn normalize_config(mut config: Config) -> Config {
    config.current_user = config
        .current_user
        .map(|user| user.trim().to_string())
        .filter(|user| !user.is_empty());
    config.ai.api_key = config
        .ai
        .api_key
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty());
    config.ai.base_url = config.ai.base_url.trim_end_matches('/').to_string();
    config.gantt = normalize_gantt(config.gantt);
    config
}

fn normalize_gantt(mut gantt: GanttSettings) -> GanttSettings {
    let defaults = GanttSettings::default();
    if !gantt.day_width.is_finite() || gantt.day_width <= 0.0 {
        warn!(value = gantt.day_width, "gantt.day_width must be positive; using default");
        gantt.day_width = defaults.day_width;
    }
    if !gantt.row_height.is_finite() || gantt.row_height <= 0.0 {
        warn!(value = gantt.row_height, "gantt.row_height must be positive; using default");
        gantt.row_height = defaults.row_height;
    }
    if !(0..=MAX_PADDING_DAYS).contains(&gantt.padding_days) {
        warn!(value = gantt.padding_days, "gantt.padding_days out of range; using default");
        gantt.padding_days = defaults.padding_days;
    }
    gantt
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(user) = overrides.current_user.as_ref() {
        merged.current_user = Some(user.clone());
    }
    if let Some(model) = overrides.ai_model.as_ref() {
        merged.ai.model = model.clone();
    }
    if let Some(url) = overrides.ai_base_url.as_ref() {
        merged.ai.base_url = url.clone();
    }
    if let Some(key) = overrides.ai_api_key.as_ref() {
        merged.ai.api_key = Some(key.clone());
    }
    if let Some(timeout) = overrides.ai_timeout_secs {
        merged.ai.timeout_secs = timeout;
    }
    if let Some(width) = overrides.gantt_day_width {
        merged.gantt.day_width = width;
    }
    if let Some(height) = overrides.gantt_row_height {
        merged.gantt.row_height = height;
    }
    if let Some(padding) = overrides.gantt_padding_days {
        merged.gantt.padding_days = padding;
    }
    merged
}
