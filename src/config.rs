//! Configuration for the linter engine
//!
//! Engine settings are read from the `engine` section of a YAML/JSON file.
//! Rule sets are configuration too; see [`crate::loader`].

use crate::selector::SelectorError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration error
///
/// Raised before any document is evaluated: a rule set that cannot be
/// resolved or compiled never produces a partial result.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Rule '{rule}' uses unknown function '{function}'")]
    UnknownPredicate { rule: String, function: String },

    #[error("Unknown rule set: {0}")]
    UnknownRuleSet(String),

    #[error("Cyclic extends: {}", .0.join(" -> "))]
    CyclicExtends(Vec<String>),

    #[error("Rule '{rule}' has an invalid path expression: {source}")]
    InvalidPath {
        rule: String,
        #[source]
        source: SelectorError,
    },

    #[error("Rule '{0}' patches a rule that no base rule set defines")]
    PatchWithoutBase(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Evaluate rules in parallel
    pub parallel: bool,

    /// Number of worker threads (0 = auto-detect)
    pub jobs: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            jobs: 0,
        }
    }
}

impl EngineConfig {
    /// Sequential evaluation on the calling thread
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            jobs: 0,
        }
    }

    /// Worker threads to use for parallel evaluation
    pub fn worker_threads(&self) -> usize {
        if self.jobs > 0 {
            self.jobs
        } else {
            num_cpus::get()
        }
    }

    /// Load engine settings from a file with an `engine:` section
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        #[derive(Deserialize, Default)]
        #[serde(default)]
        struct File {
            engine: EngineConfig,
        }

        let content = std::fs::read_to_string(path)?;
        let file: File = match config_format(path)? {
            ConfigFormat::Yaml => serde_yaml::from_str(&content)?,
            ConfigFormat::Json => serde_json::from_str(&content)?,
        };
        Ok(file.engine)
    }

    /// Merge CLI-style overrides into the settings
    pub fn merge_overrides(&mut self, parallel: Option<bool>, jobs: Option<usize>) {
        if let Some(p) = parallel {
            self.parallel = p;
        }
        if let Some(j) = jobs {
            self.jobs = j;
        }
    }
}

/// Structured formats accepted for configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

/// Pick the format of a configuration file from its extension
pub fn config_format(path: &Path) -> Result<ConfigFormat, ConfigError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        "yaml" | "yml" => Ok(ConfigFormat::Yaml),
        "json" => Ok(ConfigFormat::Json),
        _ => Err(ConfigError::Invalid(format!(
            "Unknown config file format: {}",
            PathBuf::from(path).display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.parallel);
        assert_eq!(config.jobs, 0);
        assert!(config.worker_threads() >= 1);
    }

    #[test]
    fn test_explicit_jobs() {
        let config = EngineConfig {
            parallel: true,
            jobs: 3,
        };
        assert_eq!(config.worker_threads(), 3);
    }

    #[test]
    fn test_merge_overrides() {
        let mut config = EngineConfig::default();
        config.merge_overrides(Some(false), Some(4));
        assert!(!config.parallel);
        assert_eq!(config.jobs, 4);

        config.merge_overrides(None, None);
        assert!(!config.parallel);
        assert_eq!(config.jobs, 4);
    }

    #[test]
    fn test_yaml_deserialize() {
        let yaml = r#"
parallel: false
jobs: 2
"#;
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(!config.parallel);
        assert_eq!(config.jobs, 2);

        let partial: EngineConfig = serde_yaml::from_str("jobs: 8").unwrap();
        assert!(partial.parallel);
        assert_eq!(partial.jobs, 8);
    }

    #[test]
    fn test_load_engine_section() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lint.json");
        fs::write(&path, r#"{"engine": {"parallel": false}}"#).unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert!(!config.parallel);
        assert_eq!(config.jobs, 0);
    }

    #[test]
    fn test_unknown_format() {
        let err = config_format(Path::new("rules.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert_eq!(config_format(Path::new("a.yml")).unwrap(), ConfigFormat::Yaml);
    }

    #[test]
    fn test_cyclic_error_display() {
        let err = ConfigError::CyclicExtends(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(err.to_string(), "Cyclic extends: a -> b -> a");
    }
}
