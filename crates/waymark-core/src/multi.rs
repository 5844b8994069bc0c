//! Backend aggregation.
//!
//! [`Aggregator`] presents an ordered list of backends as one. Backends are
//! queried concurrently but always merged in configured order, so the first
//! backend to report an id owns it.

use crate::backend::GuidanceBackend;
use crate::error::{BackendFailure, FetchError, GuidanceError, Result};
use crate::types::{Entity, Summary};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// A backend together with the identifier used for it in logs and stamps.
struct Member {
    id: String,
    backend: Arc<dyn GuidanceBackend>,
}

/// Composition of several backends behind the [`GuidanceBackend`] trait.
///
/// An aggregator may itself be a member of another aggregator.
pub struct Aggregator {
    name: String,
    members: Vec<Member>,
}

impl Aggregator {
    /// Create an aggregator over `backends`, in priority order.
    ///
    /// Each member is identified by its backend name; empty or repeated
    /// names are replaced by `backend_<index>`.
    pub fn new(backends: Vec<Arc<dyn GuidanceBackend>>) -> Result<Self> {
        if backends.is_empty() {
            return Err(GuidanceError::NoBackends);
        }

        let mut taken = HashSet::new();
        let members = backends
            .into_iter()
            .enumerate()
            .map(|(i, backend)| {
                let name = backend.name();
                let id = if name.is_empty() || taken.contains(name) {
                    format!("backend_{}", i)
                } else {
                    name.to_string()
                };
                taken.insert(id.clone());
                Member { id, backend }
            })
            .collect();

        Ok(Aggregator {
            name: "aggregate".to_string(),
            members,
        })
    }

    /// Set the name reported by [`GuidanceBackend::name`]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Member identifiers, in priority order
    pub fn backend_ids(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.id.as_str()).collect()
    }

    /// Number of member backends
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; an aggregator cannot be empty
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Query every member and merge the results first-wins by id.
    ///
    /// `accept` runs on each kept item with the id of the member that
    /// supplied it.
    fn gather<T, F, A>(
        &self,
        operation: &'static str,
        fetch: F,
        id_of: fn(&T) -> &str,
        report_duplicates: bool,
        mut accept: A,
    ) -> std::result::Result<Vec<T>, FetchError<T>>
    where
        T: Send,
        F: Fn(&dyn GuidanceBackend) -> std::result::Result<Vec<T>, FetchError<T>> + Sync + Send,
        A: FnMut(&mut T, &str),
    {
        debug!(operation, backends = self.members.len(), "Aggregated fetch started");

        let outcomes: Vec<_> = self
            .members
            .par_iter()
            .map(|member| {
                debug!(operation, backend = %member.id, "Querying backend");
                fetch(member.backend.as_ref())
            })
            .collect();

        let mut merged = Vec::new();
        let mut owners: HashMap<String, &str> = HashMap::new();
        let mut failures = Vec::new();

        for (member, outcome) in self.members.iter().zip(outcomes) {
            let items = match outcome {
                Ok(items) => items,
                Err(err) => {
                    let (partial, error) = err.into_parts();
                    warn!(
                        operation,
                        backend = %member.id,
                        error = %error,
                        partial = partial.len(),
                        "Backend failed"
                    );
                    failures.push(BackendFailure {
                        backend: member.id.clone(),
                        error,
                    });
                    partial
                }
            };

            for mut item in items {
                let id = id_of(&item);
                if let Some(first) = owners.get(id) {
                    if report_duplicates {
                        warn!(
                            id = %id,
                            first = %first,
                            second = %member.id,
                            "Duplicate id across backends, keeping first"
                        );
                    }
                    continue;
                }
                owners.insert(id.to_string(), member.id.as_str());
                accept(&mut item, &member.id);
                merged.push(item);
            }
        }

        debug!(
            operation,
            results = merged.len(),
            failures = failures.len(),
            "Aggregated fetch finished"
        );

        if failures.is_empty() {
            Ok(merged)
        } else {
            Err(FetchError::new(
                merged,
                GuidanceError::BackendFailures {
                    operation,
                    failures,
                },
            ))
        }
    }
}

impl GuidanceBackend for Aggregator {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_summary(&self) -> std::result::Result<Vec<Summary>, FetchError<Summary>> {
        self.gather(
            "get_summary",
            |backend| backend.get_summary(),
            summary_id,
            true,
            |_, _| {},
        )
    }

    fn get_details(&self, ids: &[String]) -> std::result::Result<Vec<Entity>, FetchError<Entity>> {
        self.gather(
            "get_details",
            |backend| backend.get_details(ids),
            entity_id,
            false,
            |entity, backend| {
                if entity.originating_backend.is_none() {
                    entity.originating_backend = Some(backend.to_string());
                }
            },
        )
    }
}

fn summary_id(summary: &Summary) -> &str {
    &summary.id
}

fn entity_id(entity: &Entity) -> &str {
    &entity.id
}
