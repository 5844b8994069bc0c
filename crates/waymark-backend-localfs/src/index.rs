//! In-memory index over a local directory of guidance documents.
//!
//! The `LocalIndex` loads once and is read-only afterwards:
//!
//! - Discovery expands each entity type's glob under the root
//! - Documents are parsed on a bounded Rayon pool
//! - Results are committed in discovery order on the calling thread
//!
//! ## Architecture
//!
//! - A `HashMap<String, Entity>` answers detail lookups by id
//! - A `Vec<Summary>` in discovery order answers summary listings
//!
//! Both are built off to the side and published together under a single
//! write lock, so readers never observe a partially loaded index.

use crate::discovery::{discover, Candidate};
use crate::document::load_document;
use crate::error::{DocumentError, Rejection};
use crate::settings::LocalIndexSettings;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use waymark_core::error::FetchError;
use waymark_core::types::{Entity, Summary};
use waymark_core::{GuidanceBackend, GuidanceError, Result};

/// Counts from the last successful load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Files selected by discovery
    pub discovered: usize,

    /// Documents in the index
    pub indexed: usize,

    /// Documents skipped because they failed to parse or validate
    pub rejected: usize,

    /// Wall time of the load in milliseconds
    pub load_time_ms: u64,
}

/// Everything published by a successful load.
struct IndexState {
    entities: HashMap<String, Entity>,
    summaries: Vec<Summary>,
    stats: IndexStats,
    rejections: Vec<Rejection>,
}

/// The outcome of parsing one candidate, tagged with its discovery position.
type ParseOutcome = (usize, std::result::Result<Entity, DocumentError>);

/// A guidance backend backed by files under one root directory.
///
/// ## Example
///
/// ```rust,ignore
/// use waymark_backend_localfs::{EntityTypeDef, LocalIndex, LocalIndexSettings};
///
/// let settings = LocalIndexSettings::new("/srv/guidance")
///     .with_entity_type(EntityTypeDef::new("behavior", "behaviors/**/*.bhv"));
/// let index = LocalIndex::new(settings);
/// index.initialize()?;
/// ```
pub struct LocalIndex {
    settings: LocalIndexSettings,

    /// Set while a load is running or once one has succeeded
    claimed: AtomicBool,

    state: RwLock<Option<IndexState>>,
}

impl LocalIndex {
    /// Create an index; nothing is read until [`LocalIndex::initialize`].
    pub fn new(settings: LocalIndexSettings) -> Self {
        LocalIndex {
            settings,
            claimed: AtomicBool::new(false),
            state: RwLock::new(None),
        }
    }

    /// Settings this index was created with
    pub fn settings(&self) -> &LocalIndexSettings {
        &self.settings
    }

    /// Returns true once a load has been published
    pub fn is_initialized(&self) -> bool {
        self.state.read().is_some()
    }

    /// Load every document under the root.
    ///
    /// Succeeds at most once. A second call, including one racing a load in
    /// progress, fails with `AlreadyInitialized`. A failed load publishes
    /// nothing and may be retried.
    #[instrument(skip(self), fields(backend = %self.settings.name))]
    pub fn initialize(&self) -> Result<()> {
        if self
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(GuidanceError::AlreadyInitialized);
        }

        match self.load() {
            Ok(state) => {
                *self.state.write() = Some(state);
                Ok(())
            }
            Err(e) => {
                self.claimed.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    /// Statistics of the published load
    pub fn stats(&self) -> Option<IndexStats> {
        self.state.read().as_ref().map(|s| s.stats.clone())
    }

    /// Documents skipped by the published load, in discovery order
    pub fn rejections(&self) -> Vec<Rejection> {
        self.state
            .read()
            .as_ref()
            .map(|s| s.rejections.clone())
            .unwrap_or_default()
    }

    /// Number of indexed documents
    pub fn len(&self) -> usize {
        self.state.read().as_ref().map_or(0, |s| s.entities.len())
    }

    /// Returns true if nothing is indexed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn load(&self) -> Result<IndexState> {
        let started = Instant::now();
        self.settings.validate()?;

        let candidates = discover(&self.settings)?;
        info!(
            root = %self.settings.root_dir.display(),
            files = candidates.len(),
            "Discovered guidance documents"
        );

        let outcomes = self.parse_all(&candidates)?;
        let mut state = self.commit(&candidates, outcomes)?;
        state.stats.load_time_ms = started.elapsed().as_millis() as u64;

        info!(
            indexed = state.stats.indexed,
            rejected = state.stats.rejected,
            ms = state.stats.load_time_ms,
            "Local index loaded"
        );

        Ok(state)
    }

    /// Parse every candidate on a bounded pool and return the outcomes in
    /// discovery order.
    fn parse_all(&self, candidates: &[Candidate]) -> Result<Vec<ParseOutcome>> {
        let workers = self.settings.worker_count();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("waymark-parse-{}", i))
            .build()
            .map_err(|e| GuidanceError::settings(format!("cannot start parser pool: {}", e)))?;

        debug!(workers, files = candidates.len(), "Parsing documents");

        let (sender, receiver) = crossbeam_channel::unbounded::<ParseOutcome>();
        let require_explicit_id = self.settings.require_explicit_id;
        let entity_types = &self.settings.entity_types;

        pool.scope(|scope| {
            for (seq, candidate) in candidates.iter().enumerate() {
                let sender = sender.clone();
                let def = &entity_types[candidate.type_index];
                scope.spawn(move |_| {
                    let outcome = load_document(&candidate.path, def, require_explicit_id);
                    let _ = sender.send((seq, outcome));
                });
            }
        });
        drop(sender);

        let mut outcomes: Vec<ParseOutcome> = receiver.into_iter().collect();
        outcomes.sort_by_key(|(seq, _)| *seq);
        Ok(outcomes)
    }

    /// Build the index from parse outcomes, failing on duplicate ids.
    fn commit(&self, candidates: &[Candidate], outcomes: Vec<ParseOutcome>) -> Result<IndexState> {
        let mut entities: HashMap<String, Entity> = HashMap::with_capacity(outcomes.len());
        let mut owners: HashMap<String, PathBuf> = HashMap::with_capacity(outcomes.len());
        let mut summaries = Vec::with_capacity(outcomes.len());
        let mut rejections = Vec::new();

        for (seq, outcome) in outcomes {
            let candidate = &candidates[seq];
            let entity_type = &self.settings.entity_types[candidate.type_index].name;

            match outcome {
                Ok(entity) => {
                    if let Some(first) = owners.get(&entity.id) {
                        return Err(GuidanceError::DuplicateId {
                            id: entity.id,
                            first: first.clone(),
                            second: candidate.path.clone(),
                        });
                    }
                    debug!(id = %entity.id, path = %candidate.path.display(), "Indexed document");
                    owners.insert(entity.id.clone(), candidate.path.clone());
                    summaries.push(entity.to_summary());
                    entities.insert(entity.id.clone(), entity);
                }
                Err(error) => {
                    warn!(
                        path = %candidate.path.display(),
                        entity_type = %entity_type,
                        error = %error,
                        "Skipping invalid document"
                    );
                    rejections.push(Rejection::new(candidate.path.clone(), entity_type.as_str(), &error));
                }
            }
        }

        let stats = IndexStats {
            discovered: candidates.len(),
            indexed: entities.len(),
            rejected: rejections.len(),
            load_time_ms: 0,
        };

        Ok(IndexState {
            entities,
            summaries,
            stats,
            rejections,
        })
    }
}

impl GuidanceBackend for LocalIndex {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn get_summary(&self) -> std::result::Result<Vec<Summary>, FetchError<Summary>> {
        let state = self.state.read();
        let state = state.as_ref().ok_or(GuidanceError::NotInitialized)?;
        debug!(count = state.summaries.len(), "Serving summaries");
        Ok(state.summaries.clone())
    }

    fn get_details(&self, ids: &[String]) -> std::result::Result<Vec<Entity>, FetchError<Entity>> {
        let state = self.state.read();
        let state = state.as_ref().ok_or(GuidanceError::NotInitialized)?;

        let mut served = HashSet::new();
        let entities: Vec<Entity> = ids
            .iter()
            .filter(|id| served.insert(*id))
            .filter_map(|id| state.entities.get(id))
            .cloned()
            .collect();

        debug!(requested = ids.len(), found = entities.len(), "Serving details");
        Ok(entities)
    }
}
