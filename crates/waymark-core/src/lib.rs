//! # Waymark Core Library
//!
//! This crate provides the data model, filter engine and backend aggregation
//! for Waymark, an index over behavior and recipe guidance documents. It is
//! storage-agnostic: concrete document sources live in backend crates and are
//! reached only through the [`GuidanceBackend`] trait.
//!
//! ## Architecture
//!
//! - **Types** (`types`): Summary and Entity projections of a document
//! - **Filter** (`filter`): Query parsing and evaluation over summaries
//! - **Backend** (`backend`): The read-only backend trait
//! - **Multi** (`multi`): Aggregation of several backends into one
//! - **Config** (`config`): Configuration discovery, loading and validation
//!
//! ## Example
//!
//! ```rust,ignore
//! use waymark_core::{parse_filter, select_ids, GuidanceBackend};
//!
//! let filter = parse_filter("type:behavior tier:must -tag:obsolete")?;
//! let summaries = backend.get_summary()?;
//! for id in select_ids(&summaries, filter.as_ref()) {
//!     println!("{}", id);
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod filter;
pub mod multi;
pub mod types;

// Re-export commonly used types
pub use backend::{filtered_summary, GuidanceBackend, StaticBackend};
pub use config::{BackendKind, BackendSpec, Config, EntityTypeConfig, LocalFsSettings};
pub use error::{BackendFailure, FetchError, GuidanceError, Result};
pub use filter::{evaluate, parse_filter, select_ids, FilterNode, FilterParser, TermNode};
pub use multi::Aggregator;
pub use types::{Entity, EntityKind, Metadata, Summary, Tier};
