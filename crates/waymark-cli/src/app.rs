//! Application context.

use anyhow::Context;
use std::sync::Arc;
use tracing::info;
use waymark_backend_localfs::{LocalIndex, LocalIndexSettings};
use waymark_core::config::{BackendKind, BackendSpec};
use waymark_core::{Aggregator, Config, GuidanceBackend};

/// The backends built from the configuration, passed to every query command.
pub struct App {
    /// All configured backends, aggregated in configured order
    pub backend: Arc<dyn GuidanceBackend>,
}

impl App {
    /// Build and load every configured backend.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut backends: Vec<Arc<dyn GuidanceBackend>> = Vec::with_capacity(config.backends.len());

        for spec in &config.backends {
            let index = open_backend(config, spec)?;
            index
                .initialize()
                .with_context(|| format!("failed to load backend '{}'", index.settings().name))?;
            backends.push(index);
        }

        let aggregator = Aggregator::new(backends)?;
        info!(backends = ?aggregator.backend_ids(), "Application initialized");

        Ok(App {
            backend: Arc::new(aggregator),
        })
    }
}

/// Create, but do not load, the backend described by `spec`.
pub fn open_backend(config: &Config, spec: &BackendSpec) -> anyhow::Result<Arc<LocalIndex>> {
    match &spec.kind {
        BackendKind::Localfs(_) => {
            let settings = LocalIndexSettings::from_config(config, spec)
                .with_context(|| format!("invalid settings for backend '{}'", spec.name))?;
            Ok(Arc::new(LocalIndex::new(settings)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
entityTypes:
  - name: behavior
    requiredFields: [id, description]
  - name: recipe
    requiredFields: [id]
backends:
  - name: team
    type: localfs
    rootDir: team
    entityLocations:
      behavior: "behaviors/**/*.bhv"
      recipe: "recipes/*.rcp"
  - name: personal
    type: localfs
    rootDir: personal
    entityLocations:
      behavior: "behaviors/**/*.bhv"
"#;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(
            root,
            "team/behaviors/must/run-tests.bhv",
            "---\nid: run-tests\ndescription: Team rule\n---\nRun the suite.\n",
        );
        write(root, "team/recipes/release.rcp", "---\nid: release\n---\nTag it.\n");
        write(
            root,
            "personal/behaviors/should/run-tests.bhv",
            "---\nid: run-tests\ndescription: Personal rule\n---\nSkip it.\n",
        );
        write(
            root,
            "personal/behaviors/should/notes.bhv",
            "---\nid: notes\ndescription: Keep notes\n---\n",
        );
        write(root, "config.yaml", CONFIG);
        dir
    }

    #[test]
    fn test_app_aggregates_in_config_order() {
        let dir = fixture();
        let config = Config::load_from(&dir.path().join("config.yaml")).unwrap();
        let app = App::new(&config).unwrap();

        let summaries = app.backend.get_summary().unwrap();
        let ids: Vec<&str> = summaries.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&"notes"));

        let run_tests = summaries.iter().find(|s| s.id == "run-tests").unwrap();
        assert_eq!(run_tests.description, "Team rule");

        let details = app
            .backend
            .get_details(&["run-tests".to_string(), "notes".to_string()])
            .unwrap();
        let backend_of = |id: &str| {
            details
                .iter()
                .find(|e| e.id == id)
                .and_then(|e| e.originating_backend.clone())
        };
        assert_eq!(backend_of("run-tests").as_deref(), Some("team"));
        assert_eq!(backend_of("notes").as_deref(), Some("personal"));
    }

    #[test]
    fn test_app_fails_when_a_backend_fails() {
        let dir = fixture();
        write(
            dir.path(),
            "team/behaviors/should/copy.bhv",
            "---\nid: run-tests\ndescription: Clash\n---\n",
        );
        let config = Config::load_from(&dir.path().join("config.yaml")).unwrap();
        let err = App::new(&config).err().unwrap();
        assert!(format!("{:#}", err).contains("team"));
    }
}
