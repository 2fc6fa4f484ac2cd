/// Configuration system for the scheduling service
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default)]
    pub proposer: ProposerSettings,
    #[serde(default)]
    pub scheduling: SchedulingSettings,
}

/// Settings for the external schedule proposer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposerSettings {
    /// Base URL of the generative model API
    pub base_url: String,
    /// Model identifier appended to the generateContent path
    pub model: String,
    /// API key; the SCHEDGEN_PROPOSER_API_KEY environment variable overrides this
    #[serde(default)]
    pub api_key: Option<String>,
    /// Hard bound on a single proposer round trip, in seconds
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

/// Settings for group partitioning and prompt construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingSettings {
    /// Maximum students per parallel group
    pub group_capacity: u32,
    /// Department whose courses are freely schedulable; everything else is
    /// treated as externally fixed
    pub home_department: String,
    /// What a level with zero enrolled students yields
    pub empty_level_policy: EmptyLevelPolicy,
}

/// Whether a zero-student level produces no groups or one empty group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyLevelPolicy {
    NoGroups,
    OneGroup,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_db_path() -> String {
    "schedgen.db".to_string()
}

impl Default for ProposerSettings {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key: None,
            request_timeout_secs: 60,
            connect_timeout_secs: 10,
        }
    }
}

impl Default for SchedulingSettings {
    fn default() -> Self {
        Self {
            group_capacity: 25,
            home_department: "Software Engineering".to_string(),
            empty_level_policy: EmptyLevelPolicy::NoGroups,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            db_path: default_db_path(),
            proposer: ProposerSettings::default(),
            scheduling: SchedulingSettings::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would misbehave at runtime rather than at load.
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.scheduling.group_capacity == 0 {
            return Err("scheduling.group_capacity must be at least 1".into());
        }
        if self.proposer.request_timeout_secs == 0 {
            return Err("proposer.request_timeout_secs must be at least 1".into());
        }
        Ok(())
    }
}

impl ProposerSettings {
    /// Resolves the API key, preferring the environment over the config file.
    pub fn resolved_api_key(&self) -> Option<String> {
        std::env::var("SCHEDGEN_PROPOSER_API_KEY")
            .ok()
            .or_else(|| self.api_key.clone())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_product_policy() {
        let config = AppConfig::default();
        assert_eq!(config.scheduling.group_capacity, 25);
        assert_eq!(config.scheduling.home_department, "Software Engineering");
        assert_eq!(
            config.scheduling.empty_level_policy,
            EmptyLevelPolicy::NoGroups
        );
    }

    #[test]
    fn zero_group_capacity_is_rejected() {
        let mut config = AppConfig::default();
        config.scheduling.group_capacity = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("group_capacity"));
    }

    #[test]
    fn load_rejects_zero_capacity_config() {
        let path = std::env::temp_dir().join(format!(
            "schedgen-config-test-{}.json",
            std::process::id()
        ));
        fs::write(&path, r#"{ "scheduling": { "group_capacity": 0,
            "home_department": "Software Engineering",
            "empty_level_policy": "no_groups" } }"#)
        .unwrap();

        let result = AppConfig::load_from_file(&path);
        fs::remove_file(&path).ok();
        assert!(result.is_err());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "bind_addr": "127.0.0.1:9000" }"#).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.db_path, "schedgen.db");
        assert_eq!(config.proposer.request_timeout_secs, 60);
    }
}
