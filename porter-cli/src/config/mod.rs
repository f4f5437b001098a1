//! User configuration: `config.toml` plus environment overrides

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::porter::SourcePrefix;

pub const ENV_SOURCE: &str = "PORTER_SOURCE";
pub const ENV_OUTPUT: &str = "PORTER_OUTPUT";
pub const ENV_CHARSET: &str = "PORTER_CHARSET";

/// Settings read from `<config_dir>/forum-porter/config.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PorterConfig {
    /// Source database used when `--source` is not given
    pub source: Option<String>,
    /// Directory export files are written to
    pub output_dir: Option<PathBuf>,
    /// Character set written instead of probing the source
    pub character_set: Option<String>,
    pub fail_fast: bool,
    /// Drop conversation staging tables after the run
    pub drop_staged: bool,
    /// Table prefix per platform id, replacing the platform default
    pub prefixes: BTreeMap<String, String>,
}

impl Default for PorterConfig {
    fn default() -> Self {
        PorterConfig {
            source: None,
            output_dir: None,
            character_set: None,
            fail_fast: false,
            drop_staged: true,
            prefixes: BTreeMap::new(),
        }
    }
}

impl PorterConfig {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("forum-porter").join("config.toml"))
    }

    /// Load from an explicit path, or from the default location if it exists
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file does not exist: {}", path.display());
                }
                path.to_path_buf()
            }
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => {
                    log::debug!("No config file found, using defaults");
                    return Ok(PorterConfig::default());
                }
            },
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: PorterConfig = toml::from_str(content)?;
        for (platform, prefix) in &config.prefixes {
            SourcePrefix::new(prefix.as_str())
                .with_context(|| format!("Invalid prefix for platform '{}'", platform))?;
        }
        Ok(config)
    }

    /// Apply `PORTER_*` variables from the environment and `.env`
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| dotenvy::var(key).ok());
    }

    /// Apply overrides from any variable lookup; empty values are ignored
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(source) = var(ENV_SOURCE) {
            self.source = Some(source);
        }
        if let Some(output) = var(ENV_OUTPUT) {
            self.output_dir = Some(PathBuf::from(output));
        }
        if let Some(charset) = var(ENV_CHARSET) {
            self.character_set = Some(charset);
        }
    }

    /// Configured prefix for a platform, if any
    pub fn prefix_for(&self, platform: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .find(|(id, _)| id.eq_ignore_ascii_case(platform))
            .map(|(_, prefix)| prefix.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let config = PorterConfig::from_toml(
            r#"
            source = "/data/forum.db"
            output_dir = "/tmp/exports"
            character_set = "latin1"
            fail_fast = true

            [prefixes]
            webwiz = "wwf_"
            "#,
        )
        .unwrap();

        assert_eq!(config.source.as_deref(), Some("/data/forum.db"));
        assert_eq!(config.output_dir, Some(PathBuf::from("/tmp/exports")));
        assert!(config.fail_fast);
        assert!(config.drop_staged);
        assert_eq!(config.prefix_for("WebWiz"), Some("wwf_"));
        assert_eq!(config.prefix_for("lithium"), None);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        assert_eq!(PorterConfig::from_toml("").unwrap(), PorterConfig::default());
    }

    #[test]
    fn test_rejects_invalid_prefix() {
        let err = PorterConfig::from_toml("[prefixes]\nwebwiz = \"tbl;\"\n").unwrap_err();
        assert!(err.to_string().contains("webwiz"));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = PorterConfig::from_toml("source = \"file.db\"\ncharacter_set = \"utf8\"").unwrap();
        let env: HashMap<&str, &str> = [(ENV_SOURCE, "env.db"), (ENV_CHARSET, "  ")].into();

        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.source.as_deref(), Some("env.db"));
        assert_eq!(config.character_set.as_deref(), Some("utf8"));
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "drop_staged = false").unwrap();

        let config = PorterConfig::load(Some(file.path())).unwrap();
        assert!(!config.drop_staged);
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PorterConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
