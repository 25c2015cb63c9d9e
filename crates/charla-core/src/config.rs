use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BOT_REPLY: &str = "🤖 Hola, soy tu asistente virtual. ¿En qué puedo ayudarte?";

/// How replies from overlapping sends are dispatched
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReplyOrder {
    /// One timer per send. Replies usually arrive in send order but nothing enforces it.
    #[default]
    Independent,
    /// A single dispatcher fires replies strictly in send order.
    Queued,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub reply_delay_ms: u64,
    pub scroll_delay_ms: u64,
    pub bot_reply: String,
    pub reply_order: ReplyOrder,
    pub tick_rate_ms: u64,
    pub bubble_fade_ms: u64,
    pub tooltip_fade_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reply_delay_ms: 1000,
            scroll_delay_ms: 100,
            bot_reply: DEFAULT_BOT_REPLY.to_string(),
            reply_order: ReplyOrder::Independent,
            tick_rate_ms: 50,
            bubble_fade_ms: 400,
            tooltip_fade_ms: 200,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the user config directory, falling back to defaults when no file exists
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Reject values that would produce an empty bot message
    pub fn validate(&self) -> Result<()> {
        if self.bot_reply.trim().is_empty() {
            return Err(anyhow!("bot_reply must not be blank"));
        }
        Ok(())
    }

    /// Bot reply text, never blank even for configs built in code
    pub fn reply_text(&self) -> &str {
        if self.bot_reply.trim().is_empty() {
            DEFAULT_BOT_REPLY
        } else {
            &self.bot_reply
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)
            .with_context(|| format!("failed to write config {}", path.display()))?;
        Ok(())
    }

    pub fn reply_delay(&self) -> Duration {
        Duration::from_millis(self.reply_delay_ms)
    }

    pub fn scroll_delay(&self) -> Duration {
        Duration::from_millis(self.scroll_delay_ms)
    }

    pub fn tick_rate(&self) -> Duration {
        // A zero interval would make tokio::time::interval panic
        Duration::from_millis(self.tick_rate_ms.max(1))
    }

    pub fn bubble_fade(&self) -> Duration {
        Duration::from_millis(self.bubble_fade_ms)
    }

    pub fn tooltip_fade(&self) -> Duration {
        Duration::from_millis(self.tooltip_fade_ms)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("charla").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.reply_delay(), Duration::from_millis(1000));
        assert_eq!(config.scroll_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            reply_delay_ms: 250,
            reply_order: ReplyOrder::Queued,
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "reply_order": "queued", "tick_rate_ms": 0 }"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.reply_order, ReplyOrder::Queued);
        assert_eq!(config.bot_reply, DEFAULT_BOT_REPLY);
        assert_eq!(config.tick_rate(), Duration::from_millis(1));
    }

    #[test]
    fn test_blank_bot_reply_is_rejected_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        for reply in ["", "   "] {
            let json = serde_json::json!({ "bot_reply": reply }).to_string();
            fs::write(&path, json).unwrap();

            let err = Config::load_from(&path).unwrap_err();
            assert!(format!("{err:#}").contains("bot_reply must not be blank"));
        }
    }

    #[test]
    fn test_blank_bot_reply_falls_back_to_default() {
        let config = Config {
            bot_reply: " \t".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.reply_text(), DEFAULT_BOT_REPLY);

        let custom = Config {
            bot_reply: "ok".to_string(),
            ..Config::default()
        };
        assert_eq!(custom.reply_text(), "ok");
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("invalid config"));
    }
}
