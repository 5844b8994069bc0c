//! Document discovery.
//!
//! Expands each entity type's glob under the root directory and assigns
//! every matched file to exactly one entity type.

use crate::settings::LocalIndexSettings;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use waymark_core::{GuidanceError, Result};

/// A file selected for parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Absolute path of the file
    pub path: PathBuf,

    /// Index into `LocalIndexSettings::entity_types`
    pub type_index: usize,
}

/// Find every document under the root, in deterministic order.
///
/// Entity types are expanded in configured order and the matches of each
/// pattern are sorted. A file matched by several types belongs to the first.
pub fn discover(settings: &LocalIndexSettings) -> Result<Vec<Candidate>> {
    let root = absolute_root(&settings.root_dir)?;
    let escaped_root = glob::Pattern::escape(&root.to_string_lossy());

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut candidates = Vec::new();

    for (type_index, def) in settings.entity_types.iter().enumerate() {
        let pattern = format!(
            "{}/{}",
            escaped_root.trim_end_matches('/'),
            def.path_glob.trim_start_matches('/')
        );

        let entries = glob::glob(&pattern).map_err(|e| {
            GuidanceError::settings(format!(
                "invalid glob '{}' for entity type '{}': {}",
                def.path_glob, def.name, e
            ))
        })?;

        let mut matches = Vec::new();
        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    warn!(path = %e.path().display(), error = %e.error(), "Unreadable path during discovery");
                    continue;
                }
            };

            if !path.is_file() {
                continue;
            }

            if let Some(ref hint) = def.file_extension_hint {
                let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
                if ext != hint {
                    debug!(path = %path.display(), hint = %hint, "Skipping file with other extension");
                    continue;
                }
            }

            matches.push(path);
        }

        matches.sort();
        debug!(entity_type = %def.name, pattern = %pattern, files = matches.len(), "Expanded entity glob");

        for path in matches {
            if seen.contains(&path) {
                warn!(
                    path = %path.display(),
                    entity_type = %def.name,
                    "File matched by more than one entity type, keeping the first"
                );
                continue;
            }
            seen.insert(path.clone());
            candidates.push(Candidate { path, type_index });
        }
    }

    Ok(candidates)
}

fn absolute_root(root: &Path) -> Result<PathBuf> {
    if root.is_absolute() {
        Ok(root.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(root))
    }
}
