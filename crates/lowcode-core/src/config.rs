use crate::error::{LowcodeError, Result};
use crate::registry::is_valid_action_id;
use crate::{io, paths};
use action_client::{default_user_agent, ClientConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub app_id: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Sent as the appended `User-Agent` header of REST API actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Transport timeout in seconds; 0 disables it.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_version() -> u32 {
    1
}

fn default_base_url() -> String {
    "http://localhost:8000/api/v1".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Config {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            version: default_version(),
            app_id: app_id.into(),
            base_url: default_base_url(),
            user_agent: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        io::read_yaml(&paths::config_path(root))
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        io::write_yaml(&paths::config_path(root), self)
    }

    pub fn user_agent(&self) -> String {
        self.user_agent.clone().unwrap_or_else(default_user_agent)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_seconds > 0).then(|| Duration::from_secs(self.timeout_seconds))
    }

    /// Client settings, refusing configs with error-level warnings.
    pub fn client_config(&self) -> Result<ClientConfig> {
        if let Some(w) = self
            .validate()
            .into_iter()
            .find(|w| w.level == WarnLevel::Error)
        {
            return Err(LowcodeError::InvalidConfig(w.message));
        }
        Ok(ClientConfig {
            base_url: self.base_url.clone(),
            timeout: self.timeout(),
            user_agent: self.user_agent(),
        })
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.app_id.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "app_id is empty".to_string(),
            });
        } else if !is_valid_action_id(&self.app_id) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "app_id '{}' may only contain letters, digits, '_' or '-'",
                    self.app_id
                ),
            });
        }

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "base_url '{}' must start with http:// or https://",
                    self.base_url
                ),
            });
        }

        if self.timeout_seconds == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "timeout_seconds=0 disables the transport timeout; hung requests never settle"
                    .to_string(),
            });
        } else if self.timeout_seconds > 300 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "timeout_seconds={} (>300 is unusual)",
                    self.timeout_seconds
                ),
            });
        }

        if self
            .user_agent
            .as_deref()
            .is_some_and(|ua| ua.trim().is_empty())
        {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "user_agent is set but empty".to_string(),
            });
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn config_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::new("app-1");
        cfg.base_url = "https://builder.example.com/api/v1".into();
        cfg.save(dir.path()).unwrap();

        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.app_id, "app-1");
        assert_eq!(loaded.base_url, "https://builder.example.com/api/v1");
        assert_eq!(loaded.timeout_seconds, 30);
    }

    #[test]
    fn missing_config_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(LowcodeError::NotInitialized)
        ));
    }

    #[test]
    fn minimal_yaml_gets_defaults() {
        let cfg: Config = serde_yaml::from_str("app_id: demo\n").unwrap();
        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.base_url, "http://localhost:8000/api/v1");
        assert!(cfg.user_agent.is_none());
        assert!(cfg.user_agent().starts_with("lowcode/"));
    }

    #[test]
    fn validate_valid_config_no_warnings() {
        assert!(Config::new("app-1").validate().is_empty());
    }

    #[test]
    fn validate_bad_base_url_is_error() {
        let mut cfg = Config::new("app-1");
        cfg.base_url = "localhost:8000".into();
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("base_url")));
        assert!(matches!(
            cfg.client_config(),
            Err(LowcodeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn validate_zero_timeout_warns_and_disables() {
        let mut cfg = Config::new("app-1");
        cfg.timeout_seconds = 0;
        assert!(cfg
            .validate()
            .iter()
            .any(|w| w.level == WarnLevel::Warning && w.message.contains("timeout_seconds=0")));
        assert!(cfg.timeout().is_none());
        assert!(cfg.client_config().is_ok());
    }

    #[test]
    fn validate_empty_app_id() {
        let cfg = Config::new("  ");
        assert!(cfg.validate().iter().any(|w| w.message == "app_id is empty"));
    }

    #[test]
    fn validate_app_id_with_path_separators_is_error() {
        let cfg = Config::new("apps/../admin");
        assert!(cfg
            .validate()
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("app_id")));
        assert!(matches!(
            cfg.client_config(),
            Err(LowcodeError::InvalidConfig(_))
        ));
    }
}
