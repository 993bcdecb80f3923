/*!
common/src/lib.rs

Shared configuration types and data-layout helpers for Newsbrief.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader with default-file + override-file merging
- Accessors that fold the built-in defaults into missing fields
- Helpers for the on-disk data layout (cache, logs, subscribers)
*/

use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// News search API configuration section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsConfig {
    /// Search endpoint, e.g. "https://newsapi.org/v2/everything"
    pub endpoint: Option<String>,
    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,
    /// Topic used when the caller does not supply one
    pub topic: Option<String>,
    pub page_size: Option<u32>,
    pub language: Option<String>,
    /// Optional lower bound of the search window, in days before now.
    /// When unset the provider's own windowing applies.
    pub from_days: Option<i64>,
    pub timeout_seconds: Option<u64>,
}

impl NewsConfig {
    pub fn endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or("https://newsapi.org/v2/everything")
    }

    pub fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or("NEWS_API_KEY")
    }

    pub fn topic(&self) -> &str {
        self.topic.as_deref().unwrap_or("Artificial Intelligence")
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or(5)
    }

    pub fn language(&self) -> &str {
        self.language.as_deref().unwrap_or("en")
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(15)
    }
}

/// Remote LLM configuration (OpenAI-compatible chat completions API)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_url: Option<String>,
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    /// Token budget for one per-article summary
    pub summary_max_tokens: Option<usize>,
    /// Token budget for the full newsletter completion
    pub newsletter_max_tokens: Option<usize>,
    pub timeout_seconds: Option<u64>,
}

impl LlmConfig {
    pub fn api_url(&self) -> &str {
        self.api_url
            .as_deref()
            .unwrap_or("https://openrouter.ai/api/v1/chat/completions")
    }

    pub fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or("OPENROUTER_API_KEY")
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or("meta-llama/llama-3-8b-instruct")
    }

    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(0.7)
    }

    pub fn summary_max_tokens(&self) -> usize {
        self.summary_max_tokens.unwrap_or(256)
    }

    pub fn newsletter_max_tokens(&self) -> usize {
        self.newsletter_max_tokens.unwrap_or(2500)
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(30)
    }
}

/// SMTP delivery configuration section. Credentials are resolved from the
/// environment via the *_env names, never stored in the file itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    /// Name of the environment variable holding the SMTP username,
    /// which doubles as the From address
    pub username_env: Option<String>,
    pub password_env: Option<String>,
    pub subject: Option<String>,
    pub timeout_seconds: Option<u64>,
}

impl MailConfig {
    pub fn smtp_host(&self) -> &str {
        self.smtp_host.as_deref().unwrap_or("smtp.gmail.com")
    }

    pub fn smtp_port(&self) -> u16 {
        self.smtp_port.unwrap_or(587)
    }

    pub fn username_env(&self) -> &str {
        self.username_env.as_deref().unwrap_or("EMAIL_USER")
    }

    pub fn password_env(&self) -> &str {
        self.password_env.as_deref().unwrap_or("EMAIL_PASS")
    }

    pub fn subject(&self) -> &str {
        self.subject.as_deref().unwrap_or("Your Daily AI Newsletter")
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(30)
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Wall-clock time in "HH:MM" 24h format for the daily run
    pub time: Option<String>,
    /// Run the pipeline immediately on startup, before the first scheduled slot
    pub run_on_start: Option<bool>,
}

impl SchedulerConfig {
    pub fn run_on_start(&self) -> bool {
        self.run_on_start.unwrap_or(true)
    }

    /// Parse the configured daily time ("HH:MM", 24h).
    pub fn daily_time(&self) -> Result<NaiveTime> {
        let raw = self.time.as_deref().unwrap_or("09:00");
        NaiveTime::parse_from_str(raw, "%H:%M")
            .with_context(|| format!("Invalid scheduler time {:?}: expected HH:MM (24h)", raw))
    }
}

/// On-disk layout configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for caches, logs and the subscriber list
    pub data_dir: Option<String>,
}

impl StorageConfig {
    pub fn base_dir(&self) -> PathBuf {
        PathBuf::from(self.data_dir.as_deref().unwrap_or("data"))
    }

    /// Cache directory holding raw fetches, summaries and newsletters
    pub fn cache_dir(&self) -> PathBuf {
        self.base_dir().join("cache")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir().join("logs")
    }

    /// The subscriber list: a JSON array of { name, email } objects
    pub fn subscribers_path(&self) -> PathBuf {
        self.base_dir().join("subscribers.json")
    }
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        if let Some(path) = default_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| format!("Failed to read default config: {}", path.display()))?;
                let val: toml::Value = toml::from_str(&data)
                    .context("Failed to parse default configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        if let Some(path) = override_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| format!("Failed to read override config: {}", path.display()))?;
                let val: toml::Value = toml::from_str(&data)
                    .context("Failed to parse override configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let toml = r#"
            [news]
            topic = "Rust"
            page_size = 3

            [scheduler]
            time = "07:30"
        "#;

        let cfg: Config = toml::from_str(toml).expect("parse config");
        assert_eq!(cfg.news.topic(), "Rust");
        assert_eq!(cfg.news.page_size(), 3);
        assert_eq!(cfg.scheduler.time.as_deref(), Some("07:30"));
        // sections absent from the file fall back to built-in defaults
        assert_eq!(cfg.llm.model(), "meta-llama/llama-3-8b-instruct");
        assert_eq!(cfg.mail.smtp_port(), 587);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let cfg: Config = toml::from_str("").expect("parse empty config");
        assert_eq!(cfg.news.endpoint(), "https://newsapi.org/v2/everything");
        assert_eq!(cfg.news.page_size(), 5);
        assert!(cfg.news.from_days.is_none());
        assert_eq!(cfg.llm.summary_max_tokens(), 256);
        assert_eq!(cfg.llm.newsletter_max_tokens(), 2500);
        assert_eq!(cfg.mail.subject(), "Your Daily AI Newsletter");
        assert!(cfg.scheduler.run_on_start());
        assert_eq!(cfg.storage.base_dir(), PathBuf::from("data"));
    }

    #[test]
    fn daily_time_parses_and_rejects() {
        let mut cfg = SchedulerConfig::default();
        assert_eq!(
            cfg.daily_time().expect("default time"),
            NaiveTime::from_hms_opt(9, 0, 0).expect("time")
        );

        cfg.time = Some("23:45".to_string());
        assert_eq!(
            cfg.daily_time().expect("parse time"),
            NaiveTime::from_hms_opt(23, 45, 0).expect("time")
        );

        cfg.time = Some("9am".to_string());
        assert!(cfg.daily_time().is_err());

        cfg.time = Some("25:00".to_string());
        assert!(cfg.daily_time().is_err());
    }

    #[test]
    fn storage_paths_derive_from_base() {
        let cfg = StorageConfig {
            data_dir: Some("/tmp/nb".to_string()),
        };
        assert_eq!(cfg.cache_dir(), PathBuf::from("/tmp/nb/cache"));
        assert_eq!(cfg.logs_dir(), PathBuf::from("/tmp/nb/logs"));
        assert_eq!(cfg.subscribers_path(), PathBuf::from("/tmp/nb/subscribers.json"));
    }

    #[tokio::test]
    async fn override_file_wins_over_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let default_path = dir.path().join("config.default.toml");
        let override_path = dir.path().join("config.toml");

        tokio::fs::write(
            &default_path,
            "[news]\ntopic = \"AI\"\npage_size = 5\n\n[scheduler]\ntime = \"09:00\"\n",
        )
        .await
        .expect("write default");
        tokio::fs::write(&override_path, "[news]\npage_size = 10\n")
            .await
            .expect("write override");

        let cfg = Config::load_with_defaults(Some(&default_path), Some(&override_path))
            .await
            .expect("load merged");
        // overridden by the second file
        assert_eq!(cfg.news.page_size(), 10);
        // kept from the defaults
        assert_eq!(cfg.news.topic(), "AI");
        assert_eq!(cfg.scheduler.time.as_deref(), Some("09:00"));
    }

    #[tokio::test]
    async fn missing_files_yield_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Config::load_with_defaults(Some(&dir.path().join("nope.toml")), None)
            .await
            .expect("load");
        assert_eq!(cfg.news.page_size(), 5);
    }
}
