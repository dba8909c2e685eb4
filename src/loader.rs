//! Rule-set files
//!
//! Loads a rule-set file and everything it `extends`. An `extends` entry is
//! either a name already in the catalog (such as the `api-guidelines`
//! preset) or a path relative to the file that names it.

use crate::config::{config_format, ConfigError};
use crate::presets;
use crate::ruleset::{ResolvedRuleSet, RuleSet, RuleSetCatalog};
use log::debug;
use std::path::{Path, PathBuf};

/// File names [`RulesetLoader::discover`] looks for, in order
pub const RULESET_FILE_NAMES: [&str; 3] = [".spectral.yaml", ".spectral.yml", ".spectral.json"];

/// Maximum length of an `extends` chain of files
const MAX_DEPTH: usize = 10;

/// Reads rule-set files into a catalog and resolves them
#[derive(Debug, Clone)]
pub struct RulesetLoader {
    catalog: RuleSetCatalog,
}

impl RulesetLoader {
    /// A loader whose catalog holds the bundled presets
    pub fn new() -> Result<Self, ConfigError> {
        let mut catalog = RuleSetCatalog::new();
        presets::register_all(&mut catalog)?;
        Ok(Self { catalog })
    }

    /// A loader over an existing catalog
    pub fn with_catalog(catalog: RuleSetCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &RuleSetCatalog {
        &self.catalog
    }

    /// Register a named set that files may extend
    pub fn register(&mut self, name: &str, set: RuleSet) {
        self.catalog.insert(name, set);
    }

    /// Load a rule-set file and resolve it with everything it extends
    pub fn load(&mut self, path: &Path) -> Result<ResolvedRuleSet, ConfigError> {
        let key = self.load_file(path, 0)?;
        self.catalog.resolve(&key)
    }

    /// Find a rule-set file in `dir`
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        RULESET_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Load the rule-set file found in `dir`, if any
    pub fn load_discovered(&mut self, dir: &Path) -> Result<Option<ResolvedRuleSet>, ConfigError> {
        match Self::discover(dir) {
            Some(path) => {
                debug!("Using rule set {}", path.display());
                self.load(&path).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Read one file into the catalog and return its catalog key
    fn load_file(&mut self, path: &Path, depth: usize) -> Result<String, ConfigError> {
        if depth >= MAX_DEPTH {
            return Err(ConfigError::Invalid(
                "Maximum rule set inheritance depth exceeded".to_string(),
            ));
        }

        let canonical = path.canonicalize()?;
        let key = canonical.display().to_string();
        if self.catalog.contains(&key) {
            return Ok(key);
        }

        debug!("Loading rule set {}", canonical.display());
        let content = std::fs::read_to_string(&canonical)?;
        let set = RuleSet::from_str_with_format(&content, config_format(&canonical)?)?;

        // Registered before its bases so a cycle through files ends here and
        // is reported by resolution
        let extends = set.extends.clone();
        self.catalog.insert(&key, set);

        let base_dir = canonical.parent().unwrap_or(Path::new("."));
        let resolved_extends = match self.load_extends(base_dir, extends, depth) {
            Ok(resolved) => resolved,
            Err(e) => {
                // A half-loaded set would be served from the catalog on the next load
                self.catalog.remove(&key);
                return Err(e);
            }
        };

        if let Some(set) = self.catalog.get_mut(&key) {
            set.extends = resolved_extends;
        }
        Ok(key)
    }

    /// Map each `extends` entry to a catalog key, loading files as needed
    fn load_extends(
        &mut self,
        base_dir: &Path,
        extends: Vec<String>,
        depth: usize,
    ) -> Result<Vec<String>, ConfigError> {
        let mut resolved = Vec::with_capacity(extends.len());
        for extend in extends {
            if self.catalog.contains(&extend) {
                resolved.push(extend);
                continue;
            }

            let extend_path = if Path::new(&extend).is_absolute() {
                PathBuf::from(&extend)
            } else {
                base_dir.join(&extend)
            };
            if !extend_path.is_file() {
                return Err(ConfigError::UnknownRuleSet(extend));
            }
            resolved.push(self.load_file(&extend_path, depth + 1)?);
        }
        Ok(resolved)
    }
}
