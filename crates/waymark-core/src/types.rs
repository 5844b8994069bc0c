//! Core data types for Waymark.
//!
//! This module defines the two projections of a guidance document that flow
//! through every backend:
//!
//! - **Summary**: the list-friendly projection used for filtering
//! - **Entity**: the full projection, including body and raw metadata
//!
//! Both are plain values. Backends hand out clones, so callers never observe
//! an index being mutated underneath them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Arbitrary frontmatter values keyed by field name.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// The kind of a guidance document.
///
/// `behavior` and `recipe` are built in; any other configured entity type
/// name is carried through as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityKind {
    /// A behavior; the only kind that carries a tier
    Behavior,

    /// A recipe
    Recipe,

    /// Any other configured entity type
    Other(String),
}

impl EntityKind {
    /// Get the kind name as a string slice
    pub fn as_str(&self) -> &str {
        match self {
            EntityKind::Behavior => "behavior",
            EntityKind::Recipe => "recipe",
            EntityKind::Other(name) => name,
        }
    }

    /// Returns true for behaviors
    pub fn is_behavior(&self) -> bool {
        matches!(self, EntityKind::Behavior)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for EntityKind {
    fn from(s: &str) -> Self {
        match s {
            "behavior" => EntityKind::Behavior,
            "recipe" => EntityKind::Recipe,
            other => EntityKind::Other(other.to_string()),
        }
    }
}

impl From<String> for EntityKind {
    fn from(s: String) -> Self {
        EntityKind::from(s.as_str())
    }
}

impl From<EntityKind> for String {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

/// Priority tier of a behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Must,
    Should,
}

impl Tier {
    /// Get the tier name as a string slice
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Must => "must",
            Tier::Should => "should",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    /// Parses exactly `must` or `should`; directory names and frontmatter
    /// values are matched case-sensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "must" => Ok(Tier::Must),
            "should" => Ok(Tier::Should),
            other => Err(format!("unknown tier '{}'", other)),
        }
    }
}

/// Concise overview of a guidance document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Unique identifier within one backend
    pub id: String,

    /// Document kind
    #[serde(rename = "type")]
    pub kind: EntityKind,

    /// Tier, for behaviors only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,

    /// Tags in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Free-text description (may be empty)
    #[serde(default)]
    pub description: String,
}

impl Summary {
    /// Create a summary with no tier, tags or description
    pub fn new(id: impl Into<String>, kind: impl Into<EntityKind>) -> Self {
        Summary {
            id: id.into(),
            kind: kind.into(),
            tier: None,
            tags: Vec::new(),
            description: String::new(),
        }
    }

    /// Set the tier
    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = Some(tier);
        self
    }

    /// Set the tags
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Full details of a guidance document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Unique identifier within one backend
    pub id: String,

    /// Document kind
    #[serde(rename = "type")]
    pub kind: EntityKind,

    /// Tier, for behaviors only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,

    /// Document body after the frontmatter, trimmed
    pub body: String,

    /// Where the document came from (an absolute path for local files)
    pub resource_locator: String,

    /// The full parsed frontmatter
    #[serde(default)]
    pub metadata: Metadata,

    /// Last modification time of the source
    pub last_updated: DateTime<Utc>,

    /// Identifier of the backend that served this entity; set by the
    /// aggregator only
    #[serde(skip)]
    pub originating_backend: Option<String>,
}

impl Entity {
    /// Returns the `description` frontmatter field, if it is a string
    pub fn description(&self) -> Option<&str> {
        self.metadata.get("description").and_then(|v| v.as_str())
    }

    /// Tags declared in the `tags` frontmatter field
    pub fn tags(&self) -> Vec<String> {
        tags_from_metadata(&self.metadata)
    }

    /// Derive the list projection of this entity
    pub fn to_summary(&self) -> Summary {
        Summary {
            id: self.id.clone(),
            kind: self.kind.clone(),
            tier: self.tier,
            tags: self.tags(),
            description: self.description().unwrap_or_default().to_string(),
        }
    }
}

/// Extract tags from frontmatter.
///
/// A sequence keeps its string entries in order and drops anything else. A
/// plain string is split on commas, with blank pieces removed.
pub fn tags_from_metadata(metadata: &Metadata) -> Vec<String> {
    match metadata.get("tags") {
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .collect(),
        Some(serde_json::Value::String(list)) => list
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_kind_round_trips_through_strings() {
        assert_eq!(EntityKind::from("behavior"), EntityKind::Behavior);
        assert_eq!(EntityKind::from("recipe"), EntityKind::Recipe);
        assert_eq!(
            EntityKind::from("checklist"),
            EntityKind::Other("checklist".to_string())
        );
        assert_eq!(String::from(EntityKind::Other("x".into())), "x");
        assert_eq!(EntityKind::Behavior.to_string(), "behavior");
    }

    #[test]
    fn test_tier_parsing_is_exact() {
        assert_eq!("must".parse::<Tier>(), Ok(Tier::Must));
        assert_eq!("should".parse::<Tier>(), Ok(Tier::Should));
        assert!("MUST".parse::<Tier>().is_err());
        assert!("could".parse::<Tier>().is_err());
    }

    #[test]
    fn test_summary_json_shape() {
        let summary = Summary::new("b1", "behavior")
            .with_tier(Tier::Must)
            .with_tags(["scope:core"])
            .with_description("Always test");

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["id"], "b1");
        assert_eq!(json["type"], "behavior");
        assert_eq!(json["tier"], "must");
        assert_eq!(json["tags"][0], "scope:core");
        assert_eq!(json["description"], "Always test");

        let recipe = serde_json::to_value(Summary::new("r1", "recipe")).unwrap();
        assert!(recipe.get("tier").is_none());
        assert!(recipe.get("tags").is_none());
    }

    #[test]
    fn test_entity_skips_originating_backend() {
        let mut metadata = Metadata::new();
        metadata.insert("description".to_string(), "desc".into());

        let entity = Entity {
            id: "r1".to_string(),
            kind: EntityKind::Recipe,
            tier: None,
            body: "Steps".to_string(),
            resource_locator: "/docs/r1.rcp".to_string(),
            metadata,
            last_updated: Utc::now(),
            originating_backend: Some("local".to_string()),
        };

        assert_eq!(entity.description(), Some("desc"));

        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["resourceLocator"], "/docs/r1.rcp");
        assert!(json.get("lastUpdated").is_some());
        assert!(json.get("originatingBackend").is_none());
        assert!(json.get("originating_backend").is_none());
    }

    #[test]
    fn test_tags_from_sequence_drop_non_strings() {
        let mut metadata = Metadata::new();
        metadata.insert(
            "tags".to_string(),
            serde_json::json!(["scope:core", 7, "prio:high", null]),
        );
        assert_eq!(tags_from_metadata(&metadata), vec!["scope:core", "prio:high"]);
    }

    #[test]
    fn test_tags_from_comma_separated_string() {
        let mut metadata = Metadata::new();
        metadata.insert("tags".to_string(), " a, b ,,c ".into());
        assert_eq!(tags_from_metadata(&metadata), vec!["a", "b", "c"]);

        metadata.insert("tags".to_string(), serde_json::json!({"a": 1}));
        assert!(tags_from_metadata(&metadata).is_empty());
    }

    #[test]
    fn test_to_summary() {
        let mut metadata = Metadata::new();
        metadata.insert("description".to_string(), "Keep it small".into());
        metadata.insert("tags".to_string(), serde_json::json!(["scope:core"]));

        let entity = Entity {
            id: "b1".to_string(),
            kind: EntityKind::Behavior,
            tier: Some(Tier::Should),
            body: String::new(),
            resource_locator: "/b1.bhv".to_string(),
            metadata,
            last_updated: Utc::now(),
            originating_backend: None,
        };

        let summary = entity.to_summary();
        assert_eq!(summary.id, "b1");
        assert_eq!(summary.tier, Some(Tier::Should));
        assert_eq!(summary.tags, vec!["scope:core"]);
        assert_eq!(summary.description, "Keep it small");
    }
}
