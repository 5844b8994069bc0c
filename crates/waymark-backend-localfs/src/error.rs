//! Error types for the local directory backend.

use std::path::PathBuf;
use thiserror::Error;

/// Reasons a single document is rejected during a load.
///
/// These never abort a load: the document is skipped and the reason is
/// recorded alongside its path.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The file could not be read
    #[error("failed to read file: {0}")]
    Read(#[from] std::io::Error),

    /// The file does not start with a `---` delimited frontmatter block
    #[error("no frontmatter detected (must start with '---' and close with a second '---')")]
    MissingFrontmatter,

    /// The frontmatter is not valid YAML
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The frontmatter parsed, but is not a mapping
    #[error("frontmatter must be a mapping, found {found}")]
    NotAMapping { found: &'static str },

    /// A field listed in the type's `requiredFields` is absent
    #[error("missing required frontmatter key '{field}'")]
    MissingField { field: String },

    /// No usable id could be determined
    #[error("missing id: {reason}")]
    MissingId { reason: String },

    /// A behavior's tier is neither derivable nor valid
    #[error("invalid tier: {reason}")]
    InvalidTier { reason: String },
}

impl DocumentError {
    /// Create a missing id error
    pub fn missing_id(reason: impl Into<String>) -> Self {
        DocumentError::MissingId {
            reason: reason.into(),
        }
    }

    /// Create an invalid tier error
    pub fn invalid_tier(reason: impl Into<String>) -> Self {
        DocumentError::InvalidTier {
            reason: reason.into(),
        }
    }
}

/// A document skipped during the last load, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Absolute path of the document
    pub path: PathBuf,

    /// Configured entity type it was discovered as
    pub entity_type: String,

    /// Rendered [`DocumentError`]
    pub reason: String,
}

impl Rejection {
    /// Record `error` against `path`
    pub fn new(path: PathBuf, entity_type: impl Into<String>, error: &DocumentError) -> Self {
        Rejection {
            path,
            entity_type: entity_type.into(),
            reason: error.to_string(),
        }
    }
}
