//! # Waymark Local Directory Backend
//!
//! This crate provides the local filesystem implementation of the
//! `GuidanceBackend` trait. Guidance documents are plain files with a YAML
//! frontmatter block, found by per-type glob patterns under one root.
//!
//! ## Architecture
//!
//! - `settings.rs`: Index settings, built directly or from a `Config`
//! - `discovery.rs`: Glob expansion and entity type assignment
//! - `document.rs`: Frontmatter parsing and per-document validation
//! - `index.rs`: The one-shot loading index and its backend impl
//!
//! ## Directory Layout
//!
//! Behaviors take their tier from a `must/` or `should/` parent directory
//! unless the frontmatter declares one:
//!
//! ```text
//! guidance/
//!   behaviors/must/run-tests.bhv
//!   behaviors/should/write-docs.bhv
//!   recipes/release.rcp
//! ```

mod discovery;
mod document;
mod index;
mod settings;

/// Error types specific to the local directory backend
pub mod error;

pub use discovery::{discover, Candidate};
pub use document::{load_document, parse_document, split_frontmatter};
pub use error::{DocumentError, Rejection};
pub use index::{IndexStats, LocalIndex};
pub use settings::{EntityTypeDef, LocalIndexSettings};
