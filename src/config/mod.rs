use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::widget::{CreditCounter, HttpBackendConfig, SendPolicy, WidgetOptions, WidgetText};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// General settings
    pub general: GeneralConfig,

    /// Chat server endpoints
    pub server: ServerConfig,

    /// Widget behaviour
    pub widget: WidgetConfig,

    /// TUI settings
    pub tui: TuiConfig,

    /// User-facing strings
    pub text: WidgetText,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable debug mode
    pub debug: bool,

    /// Log level
    pub log_level: String,

    /// Where the TUI writes its log file
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub chat_path: String,
    pub upload_path: String,

    /// Requests wait indefinitely when unset
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    pub send_policy: SendPolicy,

    /// How long the credit counter stays highlighted after a change
    pub highlight_ms: u64,

    /// Denominator used when the counter text has none
    pub fallback_total: u32,

    /// Initial counter; no counter is shown when unset
    pub credits: Option<CreditCounter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TuiConfig {
    /// Use the TUI rather than the plain console
    pub enabled: bool,

    /// Follow new messages
    pub auto_scroll: bool,

    /// Allow picking a file to upload
    pub uploads: bool,
}

fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".analyst-chat")
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "info".to_string(),
            data_dir: app_dir(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        let backend = HttpBackendConfig::default();
        Self {
            base_url: backend.base_url,
            chat_path: backend.chat_path,
            upload_path: backend.upload_path,
            timeout_seconds: None,
        }
    }
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            send_policy: SendPolicy::Overlap,
            highlight_ms: 500,
            fallback_total: 5,
            credits: None,
        }
    }
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_scroll: true,
            uploads: true,
        }
    }
}

impl ChatConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.load_env_vars();

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Get the default configuration path
    pub fn default_path() -> Result<PathBuf> {
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
        Ok(home.join(".analyst-chat").join("config.toml"))
    }

    fn load_env_vars(&mut self) {
        if let Ok(url) = std::env::var("ANALYST_CHAT_URL") {
            if !url.trim().is_empty() {
                self.server.base_url = url;
            }
        }
    }

    /// Merge with command-line overrides
    pub fn merge_overrides(&mut self, overrides: Vec<(String, String)>) -> Result<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "debug" => self.general.debug = value.parse()?,
                "log_level" => self.general.log_level = value,
                "url" => self.server.base_url = value,
                "timeout" => self.server.timeout_seconds = Some(value.parse()?),
                "send_policy" => self.widget.send_policy = value.parse()?,
                "highlight_ms" => self.widget.highlight_ms = value.parse()?,
                "credits" => self.widget.credits = Some(parse_credits(&value)?),
                "tui" => self.tui.enabled = value.parse()?,
                "uploads" => self.tui.uploads = value.parse()?,
                _ => bail!("Unknown config key: {}", key),
            }
        }
        Ok(())
    }

    pub fn backend_config(&self) -> HttpBackendConfig {
        HttpBackendConfig {
            base_url: self.server.base_url.clone(),
            chat_path: self.server.chat_path.clone(),
            upload_path: self.server.upload_path.clone(),
            timeout: self.server.timeout_seconds.map(Duration::from_secs),
        }
    }

    pub fn widget_options(&self) -> WidgetOptions {
        WidgetOptions {
            text: self.text.clone(),
            send_policy: self.widget.send_policy,
            highlight: Duration::from_millis(self.widget.highlight_ms),
            fallback_total: self.widget.fallback_total,
        }
    }

    pub fn log_level(&self) -> tracing::Level {
        if self.general.debug {
            return tracing::Level::DEBUG;
        }
        self.general.log_level.parse().unwrap_or(tracing::Level::INFO)
    }

    pub fn log_file(&self) -> PathBuf {
        self.general.data_dir.join("analyst-chat.log")
    }
}

/// Parses "current / total", e.g. "2/5".
pub fn parse_credits(value: &str) -> Result<CreditCounter> {
    let Some((current, total)) = value.split_once('/') else {
        bail!("Credits must look like 'current/total', got: {}", value);
    };
    let current = current
        .trim()
        .parse()
        .with_context(|| format!("Invalid current credit count: {}", current.trim()))?;
    let total = total
        .trim()
        .parse()
        .with_context(|| format!("Invalid total credit count: {}", total.trim()))?;
    Ok(CreditCounter::new(current, total))
}

/// Load or create configuration
pub fn load_or_create_config(path: Option<&Path>) -> Result<ChatConfig> {
    let config_path = if let Some(p) = path {
        p.to_path_buf()
    } else {
        ChatConfig::default_path()?
    };

    if config_path.exists() {
        ChatConfig::load(&config_path)
    } else {
        let mut config = ChatConfig::default();
        config.save(&config_path)?;
        config.load_env_vars();
        Ok(config)
    }
}
