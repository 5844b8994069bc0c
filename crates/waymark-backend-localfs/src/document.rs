//! Parsing and validation of a single frontmatter document.
//!
//! A document is a YAML mapping between two `---` delimiters followed by a
//! free-form body:
//!
//! ```text
//! ---
//! id: run-tests
//! description: Run the test suite before committing
//! tags: [scope:core]
//! ---
//! Body text.
//! ```

use crate::error::DocumentError;
use crate::settings::EntityTypeDef;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;
use waymark_core::types::{Entity, EntityKind, Metadata, Tier};

const DELIMITER: &str = "---";

/// Read and parse the document at `path`.
///
/// `last_updated` is the file's modification time, or the current time if
/// the platform cannot report one.
pub fn load_document(
    path: &Path,
    def: &EntityTypeDef,
    require_explicit_id: bool,
) -> Result<Entity, DocumentError> {
    let contents = fs::read_to_string(path)?;
    let last_updated = fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());

    parse_document(path, &contents, def, require_explicit_id, last_updated)
}

/// Parse document text already read from `path`.
pub fn parse_document(
    path: &Path,
    contents: &str,
    def: &EntityTypeDef,
    require_explicit_id: bool,
    last_updated: DateTime<Utc>,
) -> Result<Entity, DocumentError> {
    let (yaml, body) = split_frontmatter(contents).ok_or(DocumentError::MissingFrontmatter)?;
    let metadata = parse_frontmatter(yaml)?;

    for field in &def.required_fields {
        if !metadata.contains_key(field) {
            return Err(DocumentError::MissingField {
                field: field.clone(),
            });
        }
    }

    let kind = EntityKind::from(def.name.as_str());
    let id = resolve_id(&metadata, &kind, path, require_explicit_id)?;
    let tier = if kind.is_behavior() {
        Some(resolve_tier(&metadata, path)?)
    } else {
        None
    };

    Ok(Entity {
        id,
        kind,
        tier,
        body: body.to_string(),
        resource_locator: path.to_string_lossy().into_owned(),
        metadata,
        last_updated,
        originating_backend: None,
    })
}

/// Split text into its frontmatter block and trimmed body.
///
/// Only the first two delimiters count, and nothing but whitespace may
/// precede the first.
pub fn split_frontmatter(contents: &str) -> Option<(&str, &str)> {
    let mut parts = contents.splitn(3, DELIMITER);
    let before = parts.next()?;
    let yaml = parts.next()?;
    let body = parts.next()?;

    if !before.trim().is_empty() {
        return None;
    }

    Some((yaml, body.trim()))
}

/// Decode a frontmatter block; a blank or null block is an empty mapping.
pub fn parse_frontmatter(yaml: &str) -> Result<Metadata, DocumentError> {
    if yaml.trim().is_empty() {
        return Ok(Metadata::new());
    }

    let value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
    if value.is_mapping() {
        return Ok(serde_yaml::from_value(value)?);
    }

    let found = match value {
        serde_yaml::Value::Null => return Ok(Metadata::new()),
        serde_yaml::Value::Mapping(_) => "a mapping",
        serde_yaml::Value::Bool(_) => "a boolean",
        serde_yaml::Value::Number(_) => "a number",
        serde_yaml::Value::String(_) => "a string",
        serde_yaml::Value::Sequence(_) => "a sequence",
        serde_yaml::Value::Tagged(_) => "a tagged value",
    };

    Err(DocumentError::NotAMapping { found })
}

/// Pick the document id: `id`, then `title` for behaviors, then the file
/// stem. Only `id` is accepted when an explicit id is required.
fn resolve_id(
    metadata: &Metadata,
    kind: &EntityKind,
    path: &Path,
    require_explicit_id: bool,
) -> Result<String, DocumentError> {
    if let Some(id) = non_empty_str(metadata, "id") {
        return Ok(id.to_string());
    }

    if require_explicit_id {
        return Err(DocumentError::missing_id(
            "'id' must be a non-empty string",
        ));
    }

    if kind.is_behavior() {
        if let Some(title) = non_empty_str(metadata, "title") {
            return Ok(title.to_string());
        }
    }

    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
        .ok_or_else(|| DocumentError::missing_id("cannot derive an id from the file name"))
}

/// Determine a behavior's tier.
///
/// An explicit `tier` field wins over the parent directory name.
fn resolve_tier(metadata: &Metadata, path: &Path) -> Result<Tier, DocumentError> {
    match metadata.get("tier") {
        Some(serde_json::Value::String(value)) => value.parse::<Tier>().map_err(|_| {
            DocumentError::invalid_tier(format!("'{}' is not 'must' or 'should'", value))
        }),
        Some(serde_json::Value::Null) | None => path
            .parent()
            .and_then(Path::file_name)
            .and_then(|dir| dir.to_str())
            .and_then(|dir| dir.parse::<Tier>().ok())
            .ok_or_else(|| {
                DocumentError::invalid_tier(
                    "no 'tier' field and the parent directory is neither 'must' nor 'should'",
                )
            }),
        Some(other) => Err(DocumentError::invalid_tier(format!(
            "expected a string, found {}",
            other
        ))),
    }
}

fn non_empty_str<'a>(metadata: &'a Metadata, key: &str) -> Option<&'a str> {
    metadata
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
}
