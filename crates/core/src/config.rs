//! TOML-based configuration for git-anticipate.
//!
//! Every field has a default, so the config file is optional. The CLI looks
//! for it under the platform config directory unless `--config` is given.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;
use crate::models::short_sha;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnticipateConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Commit settings for the replayed resolution.
    #[serde(default)]
    pub commit: CommitConfig,

    /// Git invocation settings.
    #[serde(default)]
    pub git: GitConfig,
}

fn default_log_level() -> String {
    "warn".into()
}

impl Default for AnticipateConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            commit: CommitConfig::default(),
            git: GitConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// Settings for the commit produced by `continue`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitConfig {
    /// Message template. Placeholders: `{target}`, `{target_short}`,
    /// `{target_sha}`, `{current}`.
    #[serde(default = "default_message_template")]
    pub message_template: String,

    /// Always pass `--no-verify` to `git commit`.
    #[serde(default)]
    pub skip_hooks: bool,
}

fn default_message_template() -> String {
    "Preemptive conflict resolution vs {target}@{target_short}".into()
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            message_template: default_message_template(),
            skip_hooks: false,
        }
    }
}

impl CommitConfig {
    /// Render the commit message for a resolution against `target`.
    pub fn render_message(&self, target: &str, target_sha: &str, current: &str) -> String {
        self.message_template
            .replace("{target_short}", &short_sha(target_sha))
            .replace("{target_sha}", target_sha)
            .replace("{target}", target)
            .replace("{current}", current)
    }
}

// ---------------------------------------------------------------------------
// Git
// ---------------------------------------------------------------------------

/// How the `git` binary is invoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    /// Name or path of the git executable.
    #[serde(default = "default_git_binary")]
    pub binary: String,
}

fn default_git_binary() -> String {
    "git".into()
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            binary: default_git_binary(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading and validation
// ---------------------------------------------------------------------------

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl AnticipateConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)?;
        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Load from `path` if the file exists, otherwise fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load_from_file(path)
        } else {
            debug!(path = %path.display(), "no configuration file, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validate that all fields hold usable values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "log_level".into(),
                detail: format!(
                    "'{}' is not one of {}",
                    self.log_level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }
        if self.commit.message_template.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "commit.message_template".into(),
                detail: "commit message template must not be empty".into(),
            });
        }
        if self.git.binary.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "git.binary".into(),
                detail: "git binary must not be empty".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AnticipateConfig::from_toml("").unwrap();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.git.binary, "git");
        assert!(!config.commit.skip_hooks);
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
log_level = "debug"

[commit]
message_template = "Resolve {current} against {target} ({target_sha})"
skip_hooks = true

[git]
binary = "/usr/local/bin/git"
"#;
        let config = AnticipateConfig::from_toml(toml).unwrap();
        assert_eq!(config.log_level, "debug");
        assert!(config.commit.skip_hooks);
        assert_eq!(config.git.binary, "/usr/local/bin/git");
        assert_eq!(
            config.commit.render_message("main", "0123456789abcdef", "feature"),
            "Resolve feature against main (0123456789abcdef)"
        );
    }

    #[test]
    fn test_default_message_uses_short_sha() {
        let commit = CommitConfig::default();
        assert_eq!(
            commit.render_message("main", "0123456789abcdef", "feature"),
            "Preemptive conflict resolution vs main@01234567"
        );
        assert_eq!(
            commit.render_message("main", "", "feature"),
            "Preemptive conflict resolution vs main@unknown"
        );
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AnticipateConfig::default();
        config.log_level = "loud".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "log_level"
        ));

        let mut config = AnticipateConfig::default();
        config.commit.message_template = "  ".into();
        assert!(config.validate().is_err());

        let mut config = AnticipateConfig::default();
        config.git.binary = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_error() {
        let result = AnticipateConfig::from_toml("log_level = [");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert!(matches!(
            AnticipateConfig::load_from_file(&path),
            Err(ConfigError::FileNotFound(_))
        ));
        let config = AnticipateConfig::load_or_default(&path).unwrap();
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[commit]\nskip_hooks = true\n").unwrap();
        let config = AnticipateConfig::load_or_default(&path).unwrap();
        assert!(config.commit.skip_hooks);
    }
}
