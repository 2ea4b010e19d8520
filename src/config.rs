//! User configuration (`config.toml` in the tend config directory)

use anyhow::{Context, Result};
use converge::PlatformFacts;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::paths;

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Stop the run at the first failed resource
    pub fail_fast: bool,

    /// Facts laid over the gathered ones
    pub facts: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fail_fast: true,
            facts: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load from the config directory; a missing file yields defaults
    pub fn load() -> Result<Self> {
        let path = paths::config_dir()?.join(CONFIG_FILE);
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn fact_overrides(&self) -> PlatformFacts {
        PlatformFacts::from_pairs(self.facts.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert!(config.fail_fast);
        assert!(config.facts.is_empty());
    }

    #[test]
    fn test_parse_full() {
        let config = Config::parse(
            r#"
fail_fast = false

[facts]
platform_family = "rhel"
platform_version = "9.3"
"#,
        )
        .unwrap();
        assert!(!config.fail_fast);
        let facts = config.fact_overrides();
        assert_eq!(facts.platform_family(), Some("rhel"));
        assert_eq!(facts.platform_version(), Some("9.3"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Config::parse("fail_fastt = true").is_err());
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, Config::default());
    }
}
