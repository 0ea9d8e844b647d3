use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs::try_exists;

use crate::surface::MountConfig;

pub const DEFAULT_API_SCRIPT_URL: &str = "/web-apps/apps/api/documents/api.js";

const DEFAULT_READONLY_SWITCH_MIN_DELAY_MS: u64 = 100;
const DEFAULT_SAVE_DOCUMENT_MS: u64 = 10_000;
const DEFAULT_DOCUMENT_READY_MS: u64 = 30_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    pub api_script_url: String,
    pub mount: MountConfig,
    pub timeouts: TimeoutConfig,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Minimum debounce before a read-only switch proceeds; prevents visible
    /// flicker on rapid toggling.
    pub readonly_switch_min_delay_ms: u64,
    /// Upper bound for the save event to arrive after a live export request.
    pub save_document_ms: u64,
    /// Upper bound for a recreated widget to announce `documentReady`.
    pub document_ready_ms: u64,
}

impl TimeoutConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.readonly_switch_min_delay_ms)
    }

    pub fn save_wait(&self) -> Duration {
        Duration::from_millis(self.save_document_ms)
    }

    pub fn ready_wait(&self) -> Duration {
        Duration::from_millis(self.document_ready_ms)
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            api_script_url: String::from(DEFAULT_API_SCRIPT_URL),
            mount: MountConfig::default(),
            timeouts: TimeoutConfig {
                readonly_switch_min_delay_ms: DEFAULT_READONLY_SWITCH_MIN_DELAY_MS,
                save_document_ms: DEFAULT_SAVE_DOCUMENT_MS,
                document_ready_ms: DEFAULT_DOCUMENT_READY_MS,
            },
            language: String::from("en"),
        }
    }
}

impl HostConfig {
    pub async fn load() -> Result<Self> {
        if let Some(config_path) = Self::config_path() {
            if try_exists(&config_path).await? {
                match tokio::fs::read_to_string(&config_path).await {
                    Ok(content) => {
                        if content.trim().is_empty() {
                            log::warn!("Config file is empty, creating new one");
                            let default_config = Self::default();
                            let _ = default_config.save().await;
                            return Ok(default_config);
                        }

                        match serde_json::from_str::<Self>(&content) {
                            Ok(mut config) => {
                                config.validate()?;
                                log::info!(
                                    "Successfully loaded config from: {}",
                                    config_path.display()
                                );
                                return Ok(config);
                            }
                            Err(json_err) => {
                                log::error!("Failed to parse config file: {}", json_err);

                                // Backup broken config
                                let backup_path = config_path.with_extension("bak");
                                if let Err(e) = tokio::fs::copy(&config_path, &backup_path).await {
                                    log::warn!("Failed to backup broken config: {}", e);
                                } else {
                                    log::info!(
                                        "Backed up broken config to: {}",
                                        backup_path.display()
                                    );
                                }

                                let default_config = Self::default();
                                let _ = default_config.save().await;
                                return Ok(default_config);
                            }
                        }
                    }
                    Err(io_err) => {
                        log::error!("Failed to read config file: {}", io_err);
                    }
                }
            } else {
                log::info!("Config file does not exist, creating default");
            }
        }

        let default_config = Self::default();
        let _ = default_config.save().await;
        Ok(default_config)
    }

    pub async fn save(&self) -> Result<()> {
        if let Some(config_path) = Self::config_path() {
            let mut config_to_save = self.clone();
            config_to_save.validate()?;

            if let Some(parent) = config_path.parent() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    return Err(anyhow::anyhow!(
                        "failed to create config directory: {} - {}",
                        parent.display(),
                        e
                    ));
                }
            }

            let content = serde_json::to_string_pretty(&config_to_save)?;
            match tokio::fs::write(&config_path, content).await {
                Ok(_) => {
                    log::info!("Successfully saved config to: {}", config_path.display());
                }
                Err(e) => {
                    return Err(anyhow::anyhow!(
                        "failed to write config file: {} - {}",
                        config_path.display(),
                        e
                    ));
                }
            }
        }
        Ok(())
    }

    /// Validate configuration values and fix invalid ones
    pub fn validate(&mut self) -> Result<()> {
        let mut has_issues = false;

        if self.api_script_url.is_empty() {
            log::warn!("Empty API script URL, using default");
            self.api_script_url = String::from(DEFAULT_API_SCRIPT_URL);
            has_issues = true;
        }

        if self.mount.id.is_empty() || self.mount.parent_id.is_empty() {
            log::warn!("Incomplete mount configuration, using defaults");
            self.mount = MountConfig::default();
            has_issues = true;
        }

        if self.timeouts.save_document_ms == 0 {
            log::warn!("Invalid save timeout, using default");
            self.timeouts.save_document_ms = DEFAULT_SAVE_DOCUMENT_MS;
            has_issues = true;
        }

        if self.timeouts.document_ready_ms == 0 {
            log::warn!("Invalid document-ready timeout, using default");
            self.timeouts.document_ready_ms = DEFAULT_DOCUMENT_READY_MS;
            has_issues = true;
        }

        // The debounce may be zero (tests), but longer than the save wait it
        // would starve the switch protocol.
        if self.timeouts.readonly_switch_min_delay_ms > self.timeouts.save_document_ms {
            log::warn!(
                "Switch debounce {}ms exceeds save timeout, using default",
                self.timeouts.readonly_switch_min_delay_ms
            );
            self.timeouts.readonly_switch_min_delay_ms = DEFAULT_READONLY_SWITCH_MIN_DELAY_MS;
            has_issues = true;
        }

        if self.language.is_empty() {
            log::warn!("Empty language, using default");
            self.language = String::from("en");
            has_issues = true;
        }

        if has_issues {
            log::info!("Configuration validation completed with corrections");
        }

        Ok(())
    }

    fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("DOCHOST_CONFIG_PATH") {
            return Some(PathBuf::from(path));
        }

        if let Ok(dir) = std::env::var("DOCHOST_CONFIG_DIR") {
            return Some(PathBuf::from(dir).join("config.json"));
        }

        ProjectDirs::from("com", "dochost", "dochost")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};
    use tempfile::TempDir;

    fn config_test_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn set_config_dir(path: &std::path::Path) -> (Option<String>, Option<String>) {
        let previous_dir = std::env::var("DOCHOST_CONFIG_DIR").ok();
        let previous_path = std::env::var("DOCHOST_CONFIG_PATH").ok();
        std::env::set_var("DOCHOST_CONFIG_DIR", path);
        std::env::remove_var("DOCHOST_CONFIG_PATH");
        (previous_dir, previous_path)
    }

    fn restore_config_env(previous: (Option<String>, Option<String>)) {
        match previous.0 {
            Some(value) => std::env::set_var("DOCHOST_CONFIG_DIR", value),
            None => std::env::remove_var("DOCHOST_CONFIG_DIR"),
        }

        match previous.1 {
            Some(value) => std::env::set_var("DOCHOST_CONFIG_PATH", value),
            None => std::env::remove_var("DOCHOST_CONFIG_PATH"),
        }
    }

    #[test]
    fn test_default_config() {
        let config = HostConfig::default();

        assert_eq!(config.api_script_url, DEFAULT_API_SCRIPT_URL);
        assert_eq!(config.mount.id, "office-editor-mount");
        assert_eq!(config.mount.parent_id, "office-editor-shell");
        assert_eq!(config.timeouts.readonly_switch_min_delay_ms, 100);
        assert_eq!(config.timeouts.save_document_ms, 10_000);
        assert_eq!(config.timeouts.document_ready_ms, 30_000);
        assert_eq!(config.language, "en");
        assert_eq!(config.timeouts.debounce(), Duration::from_millis(100));
    }

    #[test]
    fn test_validate_fixes_invalid_values() {
        let mut config = HostConfig::default();
        config.api_script_url = String::new();
        config.timeouts.save_document_ms = 0;
        config.timeouts.readonly_switch_min_delay_ms = 60_000;
        config.language = String::new();

        config.validate().unwrap();

        assert_eq!(config.api_script_url, DEFAULT_API_SCRIPT_URL);
        assert_eq!(config.timeouts.save_document_ms, DEFAULT_SAVE_DOCUMENT_MS);
        assert_eq!(
            config.timeouts.readonly_switch_min_delay_ms,
            DEFAULT_READONLY_SWITCH_MIN_DELAY_MS
        );
        assert_eq!(config.language, "en");
    }

    #[tokio::test]
    async fn test_config_serialization() {
        let config = HostConfig::default();

        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"api_script_url\""));
        assert!(json.contains("\"mount\""));
        assert!(json.contains("\"timeouts\""));

        let config_from_json: HostConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.api_script_url, config_from_json.api_script_url);
        assert_eq!(config.mount, config_from_json.mount);
        assert_eq!(
            config.timeouts.save_document_ms,
            config_from_json.timeouts.save_document_ms
        );
    }

    #[tokio::test]
    async fn test_config_load_default() {
        let previous_env = {
            let _guard = config_test_lock().lock().unwrap();
            let temp_dir = TempDir::new().unwrap();
            set_config_dir(temp_dir.path())
        }; // release lock before await

        let config = HostConfig::load().await;
        assert!(config.is_ok());

        let config = config.unwrap();
        assert_eq!(config.api_script_url, DEFAULT_API_SCRIPT_URL);
        assert_eq!(config.mount.id, "office-editor-mount");

        restore_config_env(previous_env);
    }
}
