use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::channel::default_socket_path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    /// "auto" или путь к evdev-устройству указателя
    pub pointer_device_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DetectionConfig {
    pub strategy: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelConfig {
    /// "auto" или явный путь к сокету
    pub socket_path: String,
}

/// Какие стратегии обнаружения выделения запускать
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyMode {
    /// Доступность, с откатом на пробу буфера обмена
    Auto,
    Accessibility,
    Clipboard,
    Both,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            pointer_device_path: "auto".to_string(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            strategy: "auto".to_string(),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            socket_path: "auto".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            input: InputConfig::default(),
            detection: DetectionConfig::default(),
            channel: ChannelConfig::default(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("SELECTION_").split("__"));

        let config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Валидация настроек логирования
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        self.strategy_mode()?;

        if self.input.pointer_device_path.trim().is_empty() {
            anyhow::bail!("pointer_device_path не может быть пустым (используйте \"auto\")");
        }

        if self.channel.socket_path.trim().is_empty() {
            anyhow::bail!("socket_path не может быть пустым (используйте \"auto\")");
        }

        Ok(())
    }

    pub fn strategy_mode(&self) -> Result<StrategyMode> {
        match self.detection.strategy.as_str() {
            "auto" => Ok(StrategyMode::Auto),
            "accessibility" => Ok(StrategyMode::Accessibility),
            "clipboard" => Ok(StrategyMode::Clipboard),
            "both" => Ok(StrategyMode::Both),
            other => anyhow::bail!("Неверная стратегия обнаружения: {}", other),
        }
    }

    /// Путь сокета канала с учётом значения "auto"
    pub fn socket_path(&self) -> PathBuf {
        if self.channel.socket_path == "auto" {
            default_socket_path()
        } else {
            PathBuf::from(&self.channel.socket_path)
        }
    }
}
