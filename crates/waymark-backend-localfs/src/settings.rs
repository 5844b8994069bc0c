//! Settings for a local directory index.

use std::collections::HashSet;
use std::path::PathBuf;
use tracing::debug;
use waymark_core::config::{BackendKind, BackendSpec, Config};
use waymark_core::{GuidanceError, Result};

/// One document type and where to find it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTypeDef {
    /// Type name, e.g. `behavior`
    pub name: String,

    /// Glob pattern relative to the root directory
    pub path_glob: String,

    /// Frontmatter keys every document of this type must declare
    pub required_fields: Vec<String>,

    /// Only files with this extension (without the dot) are considered
    pub file_extension_hint: Option<String>,
}

impl EntityTypeDef {
    /// Create a definition with no required fields or extension hint
    pub fn new(name: impl Into<String>, path_glob: impl Into<String>) -> Self {
        EntityTypeDef {
            name: name.into(),
            path_glob: path_glob.into(),
            required_fields: Vec::new(),
            file_extension_hint: None,
        }
    }

    /// Set the required fields
    pub fn with_required_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Set the extension hint; a leading dot is ignored
    pub fn with_extension_hint(mut self, ext: impl Into<String>) -> Self {
        let ext = ext.into();
        self.file_extension_hint = Some(ext.trim_start_matches('.').to_string());
        self
    }
}

/// Everything a [`LocalIndex`](crate::LocalIndex) needs to load.
#[derive(Debug, Clone)]
pub struct LocalIndexSettings {
    /// Identifier reported by the backend
    pub name: String,

    /// Root directory; must exist
    pub root_dir: PathBuf,

    /// Entity types in discovery priority order
    pub entity_types: Vec<EntityTypeDef>,

    /// Reject documents without a non-empty string `id`
    pub require_explicit_id: bool,

    /// Parser threads; `None` means available parallelism
    pub parse_workers: Option<usize>,
}

impl LocalIndexSettings {
    /// Create settings for `root_dir` with no entity types
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        LocalIndexSettings {
            name: "localfs".to_string(),
            root_dir: root_dir.into(),
            entity_types: Vec::new(),
            require_explicit_id: true,
            parse_workers: None,
        }
    }

    /// Set the backend name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Append an entity type
    pub fn with_entity_type(mut self, def: EntityTypeDef) -> Self {
        self.entity_types.push(def);
        self
    }

    /// Set whether an explicit `id` is required
    pub fn with_require_explicit_id(mut self, required: bool) -> Self {
        self.require_explicit_id = required;
        self
    }

    /// Set the number of parser threads
    pub fn with_parse_workers(mut self, workers: usize) -> Self {
        self.parse_workers = Some(workers);
        self
    }

    /// Build settings for one `localfs` backend of a loaded configuration.
    ///
    /// Entity types follow the configuration's `entityTypes` order; types
    /// without an `entityLocations` entry are not scanned by this backend.
    pub fn from_config(config: &Config, spec: &BackendSpec) -> Result<Self> {
        let BackendKind::Localfs(fs) = &spec.kind;

        for name in fs.entity_locations.keys() {
            if config.entity_type(name).is_none() {
                return Err(GuidanceError::config(format!(
                    "backend '{}': entityLocations refers to undefined entity type '{}'",
                    spec.name, name
                )));
            }
        }

        let root_dir = fs.resolve_root_dir(&config.config_dir())?;

        let entity_types = config
            .entity_types
            .iter()
            .filter_map(|et| {
                let pattern = fs.entity_locations.get(&et.name)?;
                Some(EntityTypeDef {
                    name: et.name.clone(),
                    path_glob: pattern.clone(),
                    required_fields: et.required_fields.clone(),
                    file_extension_hint: et
                        .file_extension_hint
                        .as_deref()
                        .map(|ext| ext.trim_start_matches('.').to_string()),
                })
            })
            .collect();

        let name = if spec.name.is_empty() {
            spec.kind.type_name().to_string()
        } else {
            spec.name.clone()
        };

        debug!(backend = %name, root = %root_dir.display(), "Built local index settings");

        Ok(LocalIndexSettings {
            name,
            root_dir,
            entity_types,
            require_explicit_id: fs.require_explicit_id,
            parse_workers: config.performance.workers(),
        })
    }

    /// Check the settings before a load.
    pub fn validate(&self) -> Result<()> {
        if !self.root_dir.is_dir() {
            return Err(GuidanceError::settings(format!(
                "root directory {} does not exist or is not a directory",
                self.root_dir.display()
            )));
        }

        if self.entity_types.is_empty() {
            return Err(GuidanceError::settings("no entity types configured"));
        }

        let mut seen = HashSet::new();
        for def in &self.entity_types {
            if def.name.is_empty() {
                return Err(GuidanceError::settings("entity type with an empty name"));
            }
            if !seen.insert(def.name.as_str()) {
                return Err(GuidanceError::settings(format!(
                    "entity type '{}' is defined more than once",
                    def.name
                )));
            }
            glob::Pattern::new(&def.path_glob).map_err(|e| {
                GuidanceError::settings(format!(
                    "invalid glob '{}' for entity type '{}': {}",
                    def.path_glob, def.name, e
                ))
            })?;
        }

        if self.parse_workers == Some(0) {
            return Err(GuidanceError::settings("parse_workers must be at least 1"));
        }

        Ok(())
    }

    /// Number of parser threads to use
    pub fn worker_count(&self) -> usize {
        self.parse_workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn settings(root: &std::path::Path) -> LocalIndexSettings {
        LocalIndexSettings::new(root)
            .with_entity_type(EntityTypeDef::new("behavior", "**/*.bhv"))
            .with_entity_type(EntityTypeDef::new("recipe", "recipes/*.rcp"))
    }

    #[test]
    fn test_validate_ok() {
        let temp_dir = TempDir::new().unwrap();
        assert!(settings(temp_dir.path()).validate().is_ok());
    }

    #[test]
    fn test_validate_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let err = settings(&temp_dir.path().join("missing"))
            .validate()
            .unwrap_err();
        assert!(matches!(err, GuidanceError::InvalidSettings { .. }));
    }

    #[test]
    fn test_validate_entity_types() {
        let temp_dir = TempDir::new().unwrap();

        let empty = LocalIndexSettings::new(temp_dir.path());
        assert!(empty.validate().is_err());

        let duplicate = settings(temp_dir.path())
            .with_entity_type(EntityTypeDef::new("recipe", "*.rcp"));
        assert!(duplicate
            .validate()
            .unwrap_err()
            .to_string()
            .contains("more than once"));

        let bad_glob = LocalIndexSettings::new(temp_dir.path())
            .with_entity_type(EntityTypeDef::new("recipe", "[unclosed"));
        assert!(bad_glob.validate().unwrap_err().to_string().contains("invalid glob"));

        let zero_workers = settings(temp_dir.path()).with_parse_workers(0);
        assert!(zero_workers.validate().is_err());
    }

    #[test]
    fn test_extension_hint_strips_dot() {
        let def = EntityTypeDef::new("recipe", "*.rcp").with_extension_hint(".rcp");
        assert_eq!(def.file_extension_hint.as_deref(), Some("rcp"));
    }

    #[test]
    fn test_from_config() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("guidance")).unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(
            &path,
            r#"
performance:
  parse_workers: 3
entityTypes:
  - name: behavior
    requiredFields: [id]
    fileExtensionHint: .bhv
  - name: recipe
  - name: checklist
backends:
  - name: team
    type: localfs
    rootDir: guidance
    requireExplicitId: false
    entityLocations:
      recipe: "recipes/*.rcp"
      behavior: "behaviors/**/*.bhv"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        let settings = LocalIndexSettings::from_config(&config, &config.backends[0]).unwrap();

        assert_eq!(settings.name, "team");
        assert_eq!(settings.root_dir, temp_dir.path().join("guidance"));
        assert!(!settings.require_explicit_id);
        assert_eq!(settings.parse_workers, Some(3));
        assert_eq!(settings.worker_count(), 3);

        let names: Vec<_> = settings.entity_types.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["behavior", "recipe"]);
        assert_eq!(settings.entity_types[0].required_fields, vec!["id"]);
        assert_eq!(
            settings.entity_types[0].file_extension_hint.as_deref(),
            Some("bhv")
        );
        assert_eq!(settings.entity_types[1].path_glob, "recipes/*.rcp");
    }
}
