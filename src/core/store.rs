//! File-backed persistence for the universe graph.
//!
//! Every mutation is a load → mutate-a-copy → rewrite cycle. The copy only
//! replaces the in-memory graph once the whole file has been written, so a
//! failed call leaves both the file and the store as they were.

use chrono::{Local, NaiveDateTime};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::graph::{AppendOutcome, GraphError, Record, RecordKind, UniverseGraph};
use crate::schema::entity::{Character, CharacterAttributes, EntityKind, Location, LocationDetails};
use crate::schema::story::{StoryDraft, StorySelection};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("universe file {path} is unreadable: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),
    #[error("universe file changed on disk (expected revision {expected}, found {found})")]
    Conflict { expected: u64, found: u64 },
}

/// Source of "now" for timestamps and identifier dates.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time, matching the timestamps already in universe files.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

impl<F: Fn() -> NaiveDateTime> Clock for F {
    fn now(&self) -> NaiveDateTime {
        self()
    }
}

/// Only the revision counter, read back before each write.
#[derive(Deserialize)]
struct RevisionHeader {
    #[serde(default)]
    revision: u64,
}

/// Read a universe file. A missing file yields an empty graph; an
/// unparseable one is an error and is left on disk untouched.
pub fn load_graph(path: &Path) -> Result<UniverseGraph, StoreError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no universe file, starting empty");
            return Ok(UniverseGraph::new());
        }
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    decode(&text, path)
}

fn decode(text: &str, path: &Path) -> Result<UniverseGraph, StoreError> {
    let corrupt = |reason: String| StoreError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };

    let mut graph: UniverseGraph = serde_json::from_str(text).map_err(|e| corrupt(e.to_string()))?;
    graph.restore_names();
    graph
        .validate_identifiers()
        .map_err(|e| corrupt(e.to_string()))?;

    debug!(
        path = %path.display(),
        characters = graph.characters.len(),
        locations = graph.locations.len(),
        stories = graph.stories.len(),
        revision = graph.revision,
        "loaded universe"
    );
    Ok(graph)
}

/// The single writer of a universe file.
pub struct EntityStore<C: Clock = SystemClock> {
    path: PathBuf,
    graph: UniverseGraph,
    clock: C,
}

impl EntityStore<SystemClock> {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::open_with_clock(path, SystemClock)
    }
}

impl<C: Clock> EntityStore<C> {
    pub fn open_with_clock(path: impl Into<PathBuf>, clock: C) -> Result<Self, StoreError> {
        let path = path.into();
        let graph = load_graph(&path)?;
        Ok(Self { path, graph, clock })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn graph(&self) -> &UniverseGraph {
        &self.graph
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// Discard the in-memory graph and reload it from disk.
    pub fn refresh(&mut self) -> Result<(), StoreError> {
        self.graph = load_graph(&self.path)?;
        Ok(())
    }

    pub fn upsert_character(
        &mut self,
        name: &str,
        attributes: CharacterAttributes,
    ) -> Result<Character, StoreError> {
        let character =
            self.commit(|graph, now| graph.upsert_character(name, attributes, now))?;
        info!(name = %character.name, id = %character.id, "saved character");
        Ok(character)
    }

    pub fn upsert_location(
        &mut self,
        name: &str,
        details: LocationDetails,
    ) -> Result<Location, StoreError> {
        let location = self.commit(|graph, now| graph.upsert_location(name, details, now))?;
        info!(name = %location.name, id = %location.id, "saved location");
        Ok(location)
    }

    /// Append a story and its back-references in one file rewrite. A rejected
    /// draft is reported in the outcome and nothing is written.
    pub fn append_story(
        &mut self,
        draft: &StoryDraft,
        selection: &StorySelection,
    ) -> Result<AppendOutcome, StoreError> {
        if let Err(reason) = draft.validate() {
            warn!(%reason, "story not saved");
            return Ok(AppendOutcome::Rejected(reason));
        }

        let outcome = self.commit(|graph, now| graph.append_story(draft, selection, now))?;
        if let AppendOutcome::Saved(id) = &outcome {
            info!(%id, title = %draft.title.trim(), "saved story");
        }
        Ok(outcome)
    }

    pub fn find_by_id(&self, kind: RecordKind, id: &str) -> Option<Record<'_>> {
        self.graph.find_by_id(kind, id)
    }

    pub fn find_by_name(&self, kind: EntityKind, name: &str) -> Option<Record<'_>> {
        self.graph.find_by_name(kind, name)
    }

    fn commit<T>(
        &mut self,
        mutate: impl FnOnce(&mut UniverseGraph, NaiveDateTime) -> Result<T, GraphError>,
    ) -> Result<T, StoreError> {
        let now = self.clock.now();
        let mut next = self.graph.clone();
        let value = mutate(&mut next, now)?;

        next.last_updated = Some(now);
        next.revision = self.graph.revision + 1;
        self.write(&next)?;

        self.graph = next;
        Ok(value)
    }

    fn write(&self, graph: &UniverseGraph) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        let on_disk = self.disk_revision()?;
        if on_disk != self.graph.revision {
            return Err(StoreError::Conflict {
                expected: self.graph.revision,
                found: on_disk,
            });
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(graph).map_err(|e| StoreError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(io_err)?;
        fs::rename(&tmp_path, &self.path).map_err(io_err)?;

        debug!(path = %self.path.display(), revision = graph.revision, "wrote universe");
        Ok(())
    }

    /// The revision currently on disk, or 0 if there is no file yet.
    fn disk_revision(&self) -> Result<u64, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => serde_json::from_str::<RevisionHeader>(&text)
                .map(|header| header.revision)
                .map_err(|e| StoreError::Corrupt {
                    path: self.path.clone(),
                    reason: e.to_string(),
                }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(source) => Err(StoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
