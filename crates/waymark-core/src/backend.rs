//! Guidance backend trait.
//!
//! This module defines the read-only contract every source of guidance
//! documents implements. Commands and the aggregator interact only through
//! this trait, so a backend can be a single local directory or a composition
//! of other backends.
//!
//! ## Implementing a New Backend
//!
//! 1. Create a new crate (e.g., `waymark-backend-git`)
//! 2. Implement `GuidanceBackend` for your source
//! 3. Return `FetchError` with an empty `partial` for whole-call failures

use crate::error::FetchError;
use crate::filter::{evaluate, FilterNode};
use crate::types::{Entity, Summary};
use std::collections::HashMap;

/// Abstract trait for guidance document sources.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync`; the aggregator queries its
/// backends from a thread pool.
///
/// ## Error Handling
///
/// A failed call may still carry results in [`FetchError::partial`]. Ids
/// that a backend does not know are omitted from `get_details`, never
/// reported as errors.
pub trait GuidanceBackend: Send + Sync {
    /// Identifier used in logs and when stamping entities
    fn name(&self) -> &str;

    /// Summaries of every document this backend serves
    fn get_summary(&self) -> Result<Vec<Summary>, FetchError<Summary>>;

    /// Full entities for the requested ids, in no particular order
    fn get_details(&self, ids: &[String]) -> Result<Vec<Entity>, FetchError<Entity>>;
}

/// Fetch summaries and keep those accepted by `filter`.
///
/// Partial results of a failed fetch are filtered too.
pub fn filtered_summary(
    backend: &dyn GuidanceBackend,
    filter: Option<&FilterNode>,
) -> Result<Vec<Summary>, FetchError<Summary>> {
    let keep = |summaries: Vec<Summary>| -> Vec<Summary> {
        summaries
            .into_iter()
            .filter(|s| evaluate(filter, s))
            .collect()
    };

    match backend.get_summary() {
        Ok(summaries) => Ok(keep(summaries)),
        Err(err) => {
            let (partial, error) = err.into_parts();
            Err(FetchError::new(keep(partial), error))
        }
    }
}

/// In-memory backend over a fixed set of entities.
///
/// Useful for embedding pre-built guidance and for exercising aggregation.
#[derive(Debug, Clone)]
pub struct StaticBackend {
    name: String,
    summaries: Vec<Summary>,
    entities: HashMap<String, Entity>,
}

impl StaticBackend {
    /// Create a backend serving `entities`; later duplicates of an id are
    /// ignored.
    pub fn new(name: impl Into<String>, entities: impl IntoIterator<Item = Entity>) -> Self {
        let mut summaries = Vec::new();
        let mut by_id = HashMap::new();

        for entity in entities {
            if by_id.contains_key(&entity.id) {
                continue;
            }
            summaries.push(entity.to_summary());
            by_id.insert(entity.id.clone(), entity);
        }

        StaticBackend {
            name: name.into(),
            summaries,
            entities: by_id,
        }
    }

    /// Number of distinct entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if the backend serves nothing
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl GuidanceBackend for StaticBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_summary(&self) -> Result<Vec<Summary>, FetchError<Summary>> {
        Ok(self.summaries.clone())
    }

    fn get_details(&self, ids: &[String]) -> Result<Vec<Entity>, FetchError<Entity>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.entities.get(id))
            .cloned()
            .collect())
    }
}
