//! Error types for Waymark core operations.
//!
//! This module defines well-structured error types using `thiserror` for
//! library-level errors, while higher-level code can use `anyhow` for
//! convenient error handling.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using GuidanceError
pub type Result<T> = std::result::Result<T, GuidanceError>;

/// Core error types for Waymark operations.
///
/// Variants are grouped by the layer that produces them. Structural errors
/// (see [`GuidanceError::is_fatal`]) abort a whole operation; the rest are
/// contained at the boundary of the unit of work that failed.
#[derive(Error, Debug)]
pub enum GuidanceError {
    // === Filter Errors ===
    /// The filter query could not be parsed
    #[error("filter syntax error at token {position} ('{token}'): expected {expected}")]
    FilterSyntax {
        token: String,
        position: usize,
        expected: String,
    },

    /// A filter term used a key the engine does not know (strict parsing only)
    #[error("unrecognized filter key '{key}'")]
    UnknownFilterKey { key: String },

    /// A wildcard value could not be compiled into a matcher
    #[error("invalid wildcard pattern: {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    // === Index Lifecycle Errors ===
    /// `initialize` was called on an index that is already loaded or loading
    #[error("index is already initialized")]
    AlreadyInitialized,

    /// A lookup was attempted before `initialize` succeeded
    #[error("index is not initialized")]
    NotInitialized,

    /// Two documents in the same index declare the same id
    #[error("duplicate id '{id}' declared by {} and {}", .first.display(), .second.display())]
    DuplicateId {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// Index settings are unusable (missing root, bad entity types, bad glob)
    #[error("invalid index settings: {reason}")]
    InvalidSettings { reason: String },

    // === Aggregation Errors ===
    /// An aggregator was built without any backends
    #[error("cannot aggregate zero backends")]
    NoBackends,

    /// One or more backends failed while others may have succeeded
    #[error(
        "{count} backend(s) failed during {operation}: {details}",
        count = .failures.len(),
        details = join_failures(.failures)
    )]
    BackendFailures {
        operation: &'static str,
        failures: Vec<BackendFailure>,
    },

    // === Configuration Errors ===
    /// Configuration file parsing or validation failed
    #[error("configuration error: {reason}")]
    Config { reason: String },

    // === I/O Errors ===
    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single backend failure recorded by the aggregator.
#[derive(Debug)]
pub struct BackendFailure {
    /// Identifier of the failing backend
    pub backend: String,

    /// The error it reported
    pub error: GuidanceError,
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.backend, self.error)
    }
}

fn join_failures(failures: &[BackendFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl GuidanceError {
    /// Returns true if this error invalidates a whole operation rather than
    /// a single file or backend.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GuidanceError::DuplicateId { .. }
                | GuidanceError::InvalidSettings { .. }
                | GuidanceError::AlreadyInitialized
                | GuidanceError::NoBackends
                | GuidanceError::Config { .. }
        )
    }

    /// Returns true if this error was produced while parsing a filter query
    pub fn is_filter_error(&self) -> bool {
        matches!(
            self,
            GuidanceError::FilterSyntax { .. }
                | GuidanceError::UnknownFilterKey { .. }
                | GuidanceError::InvalidPattern { .. }
        )
    }

    /// Create a filter syntax error
    pub fn syntax(token: impl Into<String>, position: usize, expected: impl Into<String>) -> Self {
        GuidanceError::FilterSyntax {
            token: token.into(),
            position,
            expected: expected.into(),
        }
    }

    /// Create an invalid settings error
    pub fn settings(reason: impl Into<String>) -> Self {
        GuidanceError::InvalidSettings {
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        GuidanceError::Config {
            reason: reason.into(),
        }
    }
}

/// Error returned by a backend fetch, together with whatever results were
/// gathered before or around the failure.
///
/// Single-source backends return an empty `partial`; the aggregator returns
/// the merged results of every healthy backend.
#[derive(Debug)]
pub struct FetchError<T> {
    /// Results that were still obtained
    pub partial: Vec<T>,

    /// The underlying failure
    pub error: GuidanceError,
}

impl<T> FetchError<T> {
    /// Create a fetch error carrying partial results
    pub fn new(partial: Vec<T>, error: GuidanceError) -> Self {
        FetchError { partial, error }
    }

    /// Split into the partial results and the error
    pub fn into_parts(self) -> (Vec<T>, GuidanceError) {
        (self.partial, self.error)
    }
}

impl<T> From<GuidanceError> for FetchError<T> {
    fn from(error: GuidanceError) -> Self {
        FetchError {
            partial: Vec::new(),
            error,
        }
    }
}

impl<T> fmt::Display for FetchError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.partial.is_empty() {
            write!(f, "{}", self.error)
        } else {
            write!(
                f,
                "{} ({} partial results available)",
                self.error,
                self.partial.len()
            )
        }
    }
}

impl<T: fmt::Debug> std::error::Error for FetchError<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
