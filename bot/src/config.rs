use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use tracing::info;

use crate::engine::metadata::DEFAULT_MANIFEST_URL;
use crate::platform::rest::DEFAULT_API_BASE;

/// Top-level bot configuration, loaded from wabbabot.toml.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct BotConfig {
    pub bot: BotSection,
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub platform: PlatformSection,
    pub metadata: MetadataSection,
    pub storage: StorageSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BotSection {
    /// Bot token for the platform REST API.
    pub token: String,
    /// The bot's own user id.
    pub client_id: String,
    pub prefix: String,
    /// User ids of bot administrators.
    pub admins: Vec<String>,
}

impl Default for BotSection {
    fn default() -> Self {
        Self {
            token: String::new(),
            client_id: String::new(),
            prefix: "!".into(),
            admins: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub web_address: String,
    /// Bearer secret the gateway adapter presents on /api/events.
    /// Empty disables the endpoint.
    pub ingest_secret: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            web_address: "127.0.0.1:8080".into(),
            ingest_secret: String::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: "sqlite:wabbabot.db?mode=rwc".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PlatformSection {
    pub api_base: String,
    pub request_timeout_secs: u64,
}

impl Default for PlatformSection {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.into(),
            request_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MetadataSection {
    pub manifest_url: String,
    pub timeout_secs: u64,
}

impl Default for MetadataSection {
    fn default() -> Self {
        Self {
            manifest_url: DEFAULT_MANIFEST_URL.into(),
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Directory for the production logfile.
    pub data_dir: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("db"),
        }
    }
}

fn comma_list(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl BotConfig {
    /// Load config from a TOML file. Falls back to defaults if the file doesn't exist.
    /// Environment variables override TOML values.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let mut config = if Path::new(path).exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {path}"))?;
            Self::parse(&contents).with_context(|| format!("failed to parse config file {path}"))?
        } else {
            info!("No config file found at {}, using defaults", path);
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Apply overrides from `lookup` (the process environment in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("WABBABOT_TOKEN") {
            self.bot.token = v;
        }
        if let Some(v) = lookup("WABBABOT_CLIENT_ID") {
            self.bot.client_id = v;
        }
        if let Some(v) = lookup("WABBABOT_PREFIX") {
            self.bot.prefix = v;
        }
        if let Some(v) = lookup("WABBABOT_ADMINS") {
            self.bot.admins = comma_list(&v);
        }
        if let Some(v) = lookup("WEB_ADDRESS") {
            self.server.web_address = v;
        }
        if let Some(v) = lookup("INGEST_SECRET") {
            self.server.ingest_secret = v;
        }
        if let Some(v) = lookup("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(v) = lookup("PLATFORM_API_BASE") {
            self.platform.api_base = v;
        }
        if let Some(v) = lookup("MODLIST_MANIFEST_URL") {
            self.metadata.manifest_url = v;
        }
    }

    pub fn platform_timeout(&self) -> Duration {
        Duration::from_secs(self.platform.request_timeout_secs)
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata.timeout_secs)
    }

    /// Where production mode writes its log.
    pub fn logfile_path(&self) -> PathBuf {
        self.storage.data_dir.join("logfile")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = BotConfig::default();
        assert_eq!(config.bot.prefix, "!");
        assert_eq!(config.metadata.manifest_url, DEFAULT_MANIFEST_URL);
        assert_eq!(config.logfile_path(), PathBuf::from("db/logfile"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = BotConfig::parse(
            r#"
            [bot]
            token = "abc"
            admins = ["185807760590372874"]

            [database]
            url = "sqlite::memory:"
            "#,
        )
        .unwrap();
        assert_eq!(config.bot.token, "abc");
        assert_eq!(config.bot.prefix, "!");
        assert_eq!(config.bot.admins, vec!["185807760590372874"]);
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.server.web_address, "127.0.0.1:8080");
        assert_eq!(config.metadata_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        assert!(BotConfig::parse("[bot]\nprefix = 5").is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("WABBABOT_PREFIX", "wb!"),
            ("WABBABOT_ADMINS", "1, 2,,3"),
            ("INGEST_SECRET", "s3cret"),
            ("MODLIST_MANIFEST_URL", "http://localhost/modlists.json"),
        ]
        .into_iter()
        .collect();

        let mut config = BotConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.bot.prefix, "wb!");
        assert_eq!(config.bot.admins, vec!["1", "2", "3"]);
        assert_eq!(config.server.ingest_secret, "s3cret");
        assert_eq!(config.metadata.manifest_url, "http://localhost/modlists.json");
        // Untouched keys keep their values
        assert_eq!(config.database.url, "sqlite:wabbabot.db?mode=rwc");
    }
}
