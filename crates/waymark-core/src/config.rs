//! Configuration management for Waymark.
//!
//! This module provides configuration loading, discovery and validation.
//! Configuration is read from YAML or TOML, chosen by file extension.

use crate::error::{GuidanceError, Result};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "WAYMARK_CONFIG";

/// Directory, relative to a project root, holding the configuration file
pub const CONFIG_DIR_NAME: &str = ".agent/service";

/// Configuration file names tried inside [`CONFIG_DIR_NAME`], in order
pub const CONFIG_FILE_NAMES: [&str; 2] = ["config.yaml", "config.toml"];

/// How many parent directories above the working directory are searched
const PARENT_SEARCH_DEPTH: usize = 3;

/// Main configuration structure for Waymark.
///
/// ## Example Configuration File (config.yaml)
///
/// ```yaml
/// general:
///   log_level: info
/// performance:
///   parse_workers: 0
/// entityTypes:
///   - name: behavior
///     requiredFields: [id, description]
///     fileExtensionHint: bhv
///   - name: recipe
///     requiredFields: [id]
/// backends:
///   - name: local
///     type: localfs
///     rootDir: .
///     entityLocations:
///       behavior: "behaviors/**/*.bhv"
///       recipe: "recipes/*.rcp"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Performance tuning
    pub performance: PerformanceConfig,

    /// Document types known to every backend
    #[serde(rename = "entityTypes")]
    pub entity_types: Vec<EntityTypeConfig>,

    /// Backends, in priority order
    pub backends: Vec<BackendSpec>,

    /// File this configuration was loaded from
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// General configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            log_level: "info".to_string(),
        }
    }
}

/// Performance configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Worker threads used to parse documents (0 = available parallelism)
    pub parse_workers: usize,
}

impl PerformanceConfig {
    /// Configured worker count, if one was set
    pub fn workers(&self) -> Option<usize> {
        (self.parse_workers > 0).then_some(self.parse_workers)
    }
}

/// Definition of one document type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityTypeConfig {
    /// Type name, e.g. `behavior`
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Frontmatter keys every document of this type must declare
    #[serde(default)]
    pub required_fields: Vec<String>,

    /// Only files with this extension (without the dot) are considered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_extension_hint: Option<String>,
}

/// A named backend and its type-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSpec {
    #[serde(default)]
    pub name: String,

    #[serde(flatten)]
    pub kind: BackendKind,
}

/// Backend settings, selected by the `type` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendKind {
    /// Documents read from a local directory tree
    Localfs(LocalFsSettings),
}

impl BackendKind {
    /// The `type` string for this kind
    pub fn type_name(&self) -> &'static str {
        match self {
            BackendKind::Localfs(_) => "localfs",
        }
    }
}

/// Settings of a `localfs` backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalFsSettings {
    /// Root directory; empty means the configuration file's directory
    #[serde(default)]
    pub root_dir: PathBuf,

    /// Reject documents without a non-empty `id` field
    #[serde(default = "default_require_explicit_id")]
    pub require_explicit_id: bool,

    /// Entity type name to glob pattern, relative to the root
    #[serde(default)]
    pub entity_locations: BTreeMap<String, String>,
}

fn default_require_explicit_id() -> bool {
    true
}

impl LocalFsSettings {
    /// Resolve the root directory.
    ///
    /// `~` and `~/...` expand to the home directory, absolute paths are kept,
    /// and relative paths are joined to `config_dir`. The result must be an
    /// existing directory.
    pub fn resolve_root_dir(&self, config_dir: &Path) -> Result<PathBuf> {
        let raw = self.root_dir.to_string_lossy();

        let resolved = if raw.is_empty() {
            config_dir.to_path_buf()
        } else if let Some(rest) = raw.strip_prefix('~') {
            let home = BaseDirs::new()
                .map(|dirs| dirs.home_dir().to_path_buf())
                .ok_or_else(|| {
                    GuidanceError::config(format!(
                        "cannot expand rootDir '{}': home directory is unknown",
                        raw
                    ))
                })?;
            match rest.trim_start_matches(['/', '\\']) {
                "" => home,
                rest => home.join(rest),
            }
        } else if self.root_dir.is_absolute() {
            self.root_dir.clone()
        } else {
            config_dir.join(&self.root_dir)
        };

        if !resolved.is_dir() {
            return Err(GuidanceError::config(format!(
                "rootDir '{}' resolves to {}, which is not an existing directory",
                raw,
                resolved.display()
            )));
        }

        debug!(root = %resolved.display(), "Resolved backend root directory");
        Ok(resolved)
    }
}

impl Config {
    /// Find and load the configuration file.
    ///
    /// Search order: `explicit`, then the `WAYMARK_CONFIG` environment
    /// variable, then `.agent/service/config.{yaml,toml}` in the working
    /// directory and up to three parents, then the per-user config directory.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|v| !v.is_empty()) {
            debug!(var = CONFIG_ENV_VAR, "Using configuration from environment");
            return Self::load_from(Path::new(&path));
        }

        let mut candidates = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            for dir in cwd.ancestors().take(PARENT_SEARCH_DEPTH + 1) {
                for file in CONFIG_FILE_NAMES {
                    candidates.push(dir.join(CONFIG_DIR_NAME).join(file));
                }
            }
        }
        if let Some(dir) = Self::user_config_dir() {
            for file in CONFIG_FILE_NAMES {
                candidates.push(dir.join(file));
            }
        }

        for path in &candidates {
            debug!(path = %path.display(), "Checking for config file");
            if path.is_file() {
                return Self::load_from(path);
            }
        }

        Err(GuidanceError::config(format!(
            "no configuration file found ({}/{} in the working directory or its parents, or ${})",
            CONFIG_DIR_NAME, CONFIG_FILE_NAMES[0], CONFIG_ENV_VAR
        )))
    }

    /// Load and validate configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "Loading configuration");
        let contents = fs::read_to_string(path).map_err(|e| {
            GuidanceError::config(format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut config = Self::parse(&contents, path)?;
        config.source = Some(path.to_path_buf());
        config.validate()?;
        Ok(config)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self> {
        let is_toml = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            toml::from_str(contents).map_err(|e| {
                GuidanceError::config(format!("failed to parse {}: {}", path.display(), e))
            })
        } else {
            serde_yaml::from_str(contents).map_err(|e| {
                GuidanceError::config(format!("failed to parse {}: {}", path.display(), e))
            })
        }
    }

    /// Check structural rules that deserialization cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.entity_types.is_empty() {
            return Err(GuidanceError::config(
                "'entityTypes' is required and cannot be empty",
            ));
        }
        if self.backends.is_empty() {
            return Err(GuidanceError::config(
                "'backends' is required and cannot be empty",
            ));
        }

        let mut names = HashSet::new();
        for (i, et) in self.entity_types.iter().enumerate() {
            if et.name.is_empty() {
                return Err(GuidanceError::config(format!(
                    "entityTypes[{}]: 'name' is required",
                    i
                )));
            }
            if !names.insert(et.name.as_str()) {
                return Err(GuidanceError::config(format!(
                    "entityTypes[{}]: duplicate entity type name '{}'",
                    i, et.name
                )));
            }
            if !et.required_fields.is_empty() && !et.required_fields.iter().any(|f| f == "id") {
                return Err(GuidanceError::config(format!(
                    "entityTypes[{}] (name='{}'): 'requiredFields' must include 'id'",
                    i, et.name
                )));
            }
        }

        for (i, backend) in self.backends.iter().enumerate() {
            match &backend.kind {
                BackendKind::Localfs(settings) => {
                    if settings.entity_locations.is_empty() {
                        return Err(GuidanceError::config(format!(
                            "backends[{}] (name='{}'): 'entityLocations' must contain at least one entry",
                            i, backend.name
                        )));
                    }
                    for name in settings.entity_locations.keys() {
                        if !names.contains(name.as_str()) {
                            return Err(GuidanceError::config(format!(
                                "backends[{}]: entityLocations refers to undefined entity type '{}'",
                                i, name
                            )));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Directory against which relative paths are resolved.
    ///
    /// This is the directory of the loaded file, or the working directory
    /// for configurations built in memory.
    pub fn config_dir(&self) -> PathBuf {
        self.source
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Look up an entity type by name
    pub fn entity_type(&self, name: &str) -> Option<&EntityTypeConfig> {
        self.entity_types.iter().find(|et| et.name == name)
    }

    /// Per-user configuration directory
    pub fn user_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "waymark").map(|dirs| dirs.config_dir().to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE_YAML: &str = r#"
entityTypes:
  - name: behavior
    description: Rules for agents
    requiredFields: [id, description]
    fileExtensionHint: bhv
  - name: recipe
    requiredFields: [id]
backends:
  - name: team
    type: localfs
    rootDir: guidance
    entityLocations:
      behavior: "behaviors/**/*.bhv"
      recipe: "recipes/*.rcp"
"#;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn localfs(config: &Config, index: usize) -> &LocalFsSettings {
        match &config.backends[index].kind {
            BackendKind::Localfs(settings) => settings,
        }
    }

    #[test]
    fn test_load_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(temp_dir.path(), "config.yaml", SAMPLE_YAML);

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.performance.workers(), None);
        assert_eq!(config.entity_types.len(), 2);
        assert_eq!(
            config.entity_types[0].file_extension_hint.as_deref(),
            Some("bhv")
        );
        assert_eq!(config.entity_types[1].required_fields, vec!["id"]);

        assert_eq!(config.backends[0].name, "team");
        assert_eq!(config.backends[0].kind.type_name(), "localfs");
        let settings = localfs(&config, 0);
        assert_eq!(settings.root_dir, PathBuf::from("guidance"));
        assert!(settings.require_explicit_id);
        assert_eq!(settings.entity_locations["recipe"], "recipes/*.rcp");

        assert_eq!(config.config_dir(), temp_dir.path());
        assert!(config.entity_type("recipe").is_some());
        assert!(config.entity_type("checklist").is_none());
    }

    #[test]
    fn test_load_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(
            temp_dir.path(),
            "config.toml",
            r#"
[performance]
parse_workers = 2

[[entityTypes]]
name = "recipe"
requiredFields = ["id"]

[[backends]]
name = "local"
type = "localfs"
requireExplicitId = false

[backends.entityLocations]
recipe = "*.rcp"
"#,
        );

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.performance.workers(), Some(2));
        let settings = localfs(&config, 0);
        assert!(!settings.require_explicit_id);
        assert!(settings.root_dir.as_os_str().is_empty());
    }

    #[test]
    fn test_unknown_backend_type_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(
            temp_dir.path(),
            "config.yaml",
            "entityTypes: [{name: recipe}]\nbackends: [{name: db, type: database}]\n",
        );

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, GuidanceError::Config { .. }));
    }

    #[test]
    fn test_validation_errors() {
        let base: Config = serde_yaml::from_str(SAMPLE_YAML).unwrap();
        assert!(base.validate().is_ok());

        let mut config = base.clone();
        config.entity_types.clear();
        assert!(config.validate().unwrap_err().to_string().contains("entityTypes"));

        let mut config = base.clone();
        config.backends.clear();
        assert!(config.validate().unwrap_err().to_string().contains("backends"));

        let mut config = base.clone();
        config.entity_types[1].name = String::new();
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("entityTypes[1]: 'name' is required"));

        let mut config = base.clone();
        config.entity_types[1].name = "behavior".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("duplicate"));

        let mut config = base.clone();
        config.entity_types[0].required_fields = vec!["description".to_string()];
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("must include 'id'"));

        let mut config = base.clone();
        config.entity_types.truncate(1);
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("undefined entity type 'recipe'"));

        let mut config = base.clone();
        if let BackendKind::Localfs(settings) = &mut config.backends[0].kind {
            settings.entity_locations.clear();
        }
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("backends[0] (name='team'): 'entityLocations' must contain at least one entry"));
    }

    #[test]
    fn test_load_rejects_backend_without_locations() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(
            temp_dir.path(),
            "config.yaml",
            "entityTypes:\n  - name: behavior\nbackends:\n  - name: b\n    type: localfs\n",
        );
        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, GuidanceError::Config { .. }));
        assert!(err.to_string().contains("'entityLocations'"));
    }

    #[test]
    fn test_empty_required_fields_are_allowed() {
        let mut config: Config = serde_yaml::from_str(SAMPLE_YAML).unwrap();
        config.entity_types[1].required_fields.clear();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolve_relative_root() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("guidance")).unwrap();

        let config: Config = serde_yaml::from_str(SAMPLE_YAML).unwrap();
        let root = localfs(&config, 0).resolve_root_dir(temp_dir.path()).unwrap();
        assert_eq!(root, temp_dir.path().join("guidance"));
    }

    #[test]
    fn test_resolve_absolute_and_empty_root() {
        let temp_dir = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();

        let mut settings = LocalFsSettings {
            root_dir: other.path().to_path_buf(),
            require_explicit_id: true,
            entity_locations: BTreeMap::new(),
        };
        assert_eq!(settings.resolve_root_dir(temp_dir.path()).unwrap(), other.path());

        settings.root_dir = PathBuf::new();
        assert_eq!(settings.resolve_root_dir(temp_dir.path()).unwrap(), temp_dir.path());
    }

    #[test]
    fn test_resolve_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let settings = LocalFsSettings {
            root_dir: PathBuf::from("does-not-exist"),
            require_explicit_id: true,
            entity_locations: BTreeMap::new(),
        };

        let err = settings.resolve_root_dir(temp_dir.path()).unwrap_err();
        assert!(err.to_string().contains("does-not-exist"));
    }

    #[test]
    fn test_resolve_home_root() {
        let Some(home) = BaseDirs::new().map(|d| d.home_dir().to_path_buf()) else {
            return;
        };
        if !home.is_dir() {
            return;
        }

        let settings = LocalFsSettings {
            root_dir: PathBuf::from("~"),
            require_explicit_id: true,
            entity_locations: BTreeMap::new(),
        };
        assert_eq!(settings.resolve_root_dir(Path::new("/")).unwrap(), home);
    }

    #[test]
    fn test_discover_explicit_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(temp_dir.path(), "custom.yaml", SAMPLE_YAML);

        let config = Config::discover(Some(&path)).unwrap();
        assert_eq!(config.source.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = Config::load_from(&temp_dir.path().join("nope.yaml")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
