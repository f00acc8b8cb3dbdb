//! The universe graph: every character, location, and story plus the
//! cross-references between them.
//!
//! All mutation here is pure in-memory work. Callers supply the timestamp;
//! persisting the result is the store's job.

use chrono::NaiveDateTime;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

use crate::schema::entity::{
    Character, CharacterAttributes, EntityKind, Location, LocationDetails,
};
use crate::schema::identifier::{allocate, AllocationError, IdPrefix, Identifier};
use crate::schema::story::{Story, StoryDraft, StoryMetadata, StorySelection, ValidationRejected};

/// A name or id that should resolve to a record but does not.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?} {key:?} does not resolve to a stored record")]
pub struct MissingReferenceError {
    pub kind: EntityKind,
    pub key: String,
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("allocation error: {0}")]
    Allocation(#[from] AllocationError),
    #[error("missing reference: {0}")]
    MissingReference(#[from] MissingReferenceError),
    #[error("{0} name must not be empty")]
    EmptyName(&'static str),
}

/// The outcome of appending a story: either its new id, or the reason it
/// was not saved. Rejection is an ordinary result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    Saved(Identifier),
    Rejected(ValidationRejected),
}

impl AppendOutcome {
    pub fn story_id(&self) -> Option<&Identifier> {
        match self {
            Self::Saved(id) => Some(id),
            Self::Rejected(_) => None,
        }
    }
}

/// Which collection an id lookup searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Character,
    Location,
    Story,
}

impl From<EntityKind> for RecordKind {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Character => Self::Character,
            EntityKind::Location => Self::Location,
        }
    }
}

/// A borrowed view of any record in the graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Record<'a> {
    Character(&'a Character),
    Location(&'a Location),
    Story(&'a Story),
}

impl<'a> Record<'a> {
    pub fn id(&self) -> &'a Identifier {
        match self {
            Self::Character(c) => &c.id,
            Self::Location(l) => &l.id,
            Self::Story(s) => &s.id,
        }
    }
}

/// The characters and locations a story references, in the story's order.
#[derive(Debug, Clone, Default)]
pub struct Cast<'a> {
    pub characters: Vec<&'a Character>,
    pub locations: Vec<&'a Location>,
}

/// A single broken cross-reference found by [`UniverseGraph::check_integrity`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityIssue {
    /// A story lists an entity id that is not in the graph.
    #[error("story {story} references unknown {} {id}", .kind.label())]
    UnresolvedReference {
        story: Identifier,
        kind: EntityKind,
        id: Identifier,
    },
    /// An entity lists an appearance in a story that does not exist.
    #[error("{} {name:?} lists unknown story {story}", .kind.label())]
    UnknownAppearance {
        kind: EntityKind,
        name: String,
        story: Identifier,
    },
    /// An entity lists an appearance the story does not reciprocate.
    #[error("{} {name:?} lists story {story}, which does not reference it", .kind.label())]
    UnreciprocatedAppearance {
        kind: EntityKind,
        name: String,
        story: Identifier,
    },
    /// A story references an entity that does not list it back.
    #[error("story {story} references {} {name:?}, which does not list it", .kind.label())]
    MissingBackReference {
        kind: EntityKind,
        name: String,
        story: Identifier,
    },
}

/// The aggregate root owning every record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UniverseGraph {
    #[serde(default)]
    pub characters: BTreeMap<String, Character>,
    #[serde(default)]
    pub locations: BTreeMap<String, Location>,
    /// Append order; later entries are more recent.
    #[serde(default)]
    pub stories: Vec<Story>,
    #[serde(default)]
    pub last_updated: Option<NaiveDateTime>,
    /// Bumped on every persisted write; used to detect concurrent writers.
    #[serde(default)]
    pub revision: u64,
}

impl UniverseGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy map keys into the records' `name` fields after deserializing.
    pub(crate) fn restore_names(&mut self) {
        for (name, character) in &mut self.characters {
            character.name = name.clone();
        }
        for (name, location) in &mut self.locations {
            location.name = name.clone();
        }
    }

    /// Check that every stored id is well formed and carries the prefix of
    /// the collection it lives in.
    pub(crate) fn validate_identifiers(&self) -> Result<(), AllocationError> {
        let ids = self
            .characters
            .values()
            .map(|c| (&c.id, IdPrefix::Char))
            .chain(self.locations.values().map(|l| (&l.id, IdPrefix::Loc)))
            .chain(self.stories.iter().map(|s| (&s.id, IdPrefix::Story)));

        for (id, expected) in ids {
            if id.parts()?.prefix != expected {
                return Err(AllocationError::MalformedId(id.to_string()));
            }
        }
        Ok(())
    }

    /// Create or update a character. A case-insensitive name match updates the
    /// existing record in place, keeping its id, creation date, and
    /// appearances; the record is re-keyed under the submitted spelling.
    pub fn upsert_character(
        &mut self,
        name: &str,
        attributes: CharacterAttributes,
        now: NaiveDateTime,
    ) -> Result<Character, GraphError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GraphError::EmptyName("character"));
        }

        let powers = attributes.normalized_powers();
        let record = match take_case_insensitive(&mut self.characters, name) {
            Some(existing) => {
                debug!(name, id = %existing.id, "updating existing character");
                Character {
                    name: name.to_string(),
                    description: attributes.description,
                    powers,
                    last_updated: now,
                    ..existing
                }
            }
            None => {
                let id = allocate(
                    IdPrefix::Char,
                    self.characters.values().map(|c| c.id.as_str()),
                    now.date(),
                )?;
                debug!(name, %id, "creating character");
                Character {
                    name: name.to_string(),
                    id,
                    description: attributes.description,
                    powers,
                    story_appearances: Vec::new(),
                    created_date: now,
                    last_updated: now,
                }
            }
        };

        self.characters.insert(record.name.clone(), record.clone());
        Ok(record)
    }

    /// Create or update a location; same rules as [`Self::upsert_character`].
    pub fn upsert_location(
        &mut self,
        name: &str,
        details: LocationDetails,
        now: NaiveDateTime,
    ) -> Result<Location, GraphError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GraphError::EmptyName("location"));
        }

        let record = match take_case_insensitive(&mut self.locations, name) {
            Some(existing) => {
                debug!(name, id = %existing.id, "updating existing location");
                Location {
                    name: name.to_string(),
                    description: details.description,
                    last_updated: now,
                    ..existing
                }
            }
            None => {
                let id = allocate(
                    IdPrefix::Loc,
                    self.locations.values().map(|l| l.id.as_str()),
                    now.date(),
                )?;
                debug!(name, %id, "creating location");
                Location {
                    name: name.to_string(),
                    id,
                    description: details.description,
                    story_appearances: Vec::new(),
                    created_date: now,
                    last_updated: now,
                }
            }
        };

        self.locations.insert(record.name.clone(), record.clone());
        Ok(record)
    }

    /// Append a story and record it on every character and location it names.
    ///
    /// A draft with an empty (after trimming) title or body is rejected
    /// without touching the graph. Every referenced name is resolved before
    /// anything is mutated, so a missing reference also leaves the graph
    /// untouched. Repeated names are linked once.
    pub fn append_story(
        &mut self,
        draft: &StoryDraft,
        selection: &StorySelection,
        now: NaiveDateTime,
    ) -> Result<AppendOutcome, GraphError> {
        if let Err(reason) = draft.validate() {
            return Ok(AppendOutcome::Rejected(reason));
        }

        let character_names = dedup_names(&selection.characters);
        let location_names = dedup_names(&selection.locations);

        let characters_used = character_names
            .iter()
            .map(|name| {
                self.characters
                    .get(*name)
                    .map(|c| c.id.clone())
                    .ok_or_else(|| missing(EntityKind::Character, name))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let locations_used = location_names
            .iter()
            .map(|name| {
                self.locations
                    .get(*name)
                    .map(|l| l.id.clone())
                    .ok_or_else(|| missing(EntityKind::Location, name))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let id = allocate(
            IdPrefix::Story,
            self.stories.iter().map(|s| s.id.as_str()),
            now.date(),
        )?;

        self.stories.push(Story {
            id: id.clone(),
            title: draft.title.trim().to_string(),
            content: draft.body.trim().to_string(),
            moral_lesson: draft.moral.trim().to_string(),
            metadata: StoryMetadata {
                theme: selection.theme,
                target_age: selection.target_age,
                word_count: selection.word_count,
                characters_used,
                locations_used,
                generated_date: now,
            },
        });

        for name in character_names {
            if let Some(character) = self.characters.get_mut(name) {
                character.story_appearances.push(id.clone());
            }
        }
        for name in location_names {
            if let Some(location) = self.locations.get_mut(name) {
                location.story_appearances.push(id.clone());
            }
        }

        debug!(%id, stories = self.stories.len(), "appended story");
        Ok(AppendOutcome::Saved(id))
    }

    /// Look up any record by exact id.
    pub fn find_by_id(&self, kind: RecordKind, id: &str) -> Option<Record<'_>> {
        match kind {
            RecordKind::Character => self.character_by_id(id).map(Record::Character),
            RecordKind::Location => self.location_by_id(id).map(Record::Location),
            RecordKind::Story => self.story(id).map(Record::Story),
        }
    }

    /// Look up a character or location by exact, case-sensitive name.
    pub fn find_by_name(&self, kind: EntityKind, name: &str) -> Option<Record<'_>> {
        match kind {
            EntityKind::Character => self.characters.get(name).map(Record::Character),
            EntityKind::Location => self.locations.get(name).map(Record::Location),
        }
    }

    pub fn character(&self, name: &str) -> Option<&Character> {
        self.characters.get(name)
    }

    pub fn location(&self, name: &str) -> Option<&Location> {
        self.locations.get(name)
    }

    pub fn character_by_id(&self, id: &str) -> Option<&Character> {
        self.characters.values().find(|c| c.id.as_str() == id)
    }

    pub fn location_by_id(&self, id: &str) -> Option<&Location> {
        self.locations.values().find(|l| l.id.as_str() == id)
    }

    pub fn story(&self, id: &str) -> Option<&Story> {
        self.stories.iter().find(|s| s.id.as_str() == id)
    }

    /// Resolve a story's character and location ids to records.
    pub fn resolve_cast(&self, story: &Story) -> Result<Cast<'_>, MissingReferenceError> {
        let characters = story
            .metadata
            .characters_used
            .iter()
            .map(|id| {
                self.character_by_id(id.as_str())
                    .ok_or_else(|| missing(EntityKind::Character, id.as_str()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let locations = story
            .metadata
            .locations_used
            .iter()
            .map(|id| {
                self.location_by_id(id.as_str())
                    .ok_or_else(|| missing(EntityKind::Location, id.as_str()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Cast {
            characters,
            locations,
        })
    }

    /// Stories a named character or location appears in, in append order.
    /// Appearances that point at unknown stories are skipped; use
    /// [`Self::check_integrity`] to surface them.
    pub fn appearances(
        &self,
        kind: EntityKind,
        name: &str,
    ) -> Result<Vec<&Story>, MissingReferenceError> {
        let ids = match kind {
            EntityKind::Character => self.characters.get(name).map(|c| &c.story_appearances),
            EntityKind::Location => self.locations.get(name).map(|l| &l.story_appearances),
        }
        .ok_or_else(|| missing(kind, name))?;

        Ok(ids.iter().filter_map(|id| self.story(id.as_str())).collect())
    }

    /// Report every broken cross-reference. Nothing is repaired.
    pub fn check_integrity(&self) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();

        for story in &self.stories {
            for id in &story.metadata.characters_used {
                match self.character_by_id(id.as_str()) {
                    None => issues.push(IntegrityIssue::UnresolvedReference {
                        story: story.id.clone(),
                        kind: EntityKind::Character,
                        id: id.clone(),
                    }),
                    Some(c) if !c.story_appearances.contains(&story.id) => {
                        issues.push(IntegrityIssue::MissingBackReference {
                            kind: EntityKind::Character,
                            name: c.name.clone(),
                            story: story.id.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }
            for id in &story.metadata.locations_used {
                match self.location_by_id(id.as_str()) {
                    None => issues.push(IntegrityIssue::UnresolvedReference {
                        story: story.id.clone(),
                        kind: EntityKind::Location,
                        id: id.clone(),
                    }),
                    Some(l) if !l.story_appearances.contains(&story.id) => {
                        issues.push(IntegrityIssue::MissingBackReference {
                            kind: EntityKind::Location,
                            name: l.name.clone(),
                            story: story.id.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }
        }

        let entities = self
            .characters
            .values()
            .map(|c| (EntityKind::Character, &c.name, &c.id, &c.story_appearances))
            .chain(
                self.locations
                    .values()
                    .map(|l| (EntityKind::Location, &l.name, &l.id, &l.story_appearances)),
            );
        for (kind, name, entity_id, appearances) in entities {
            for story_id in appearances {
                match self.story(story_id.as_str()) {
                    None => issues.push(IntegrityIssue::UnknownAppearance {
                        kind,
                        name: name.clone(),
                        story: story_id.clone(),
                    }),
                    Some(story) => {
                        let used = match kind {
                            EntityKind::Character => &story.metadata.characters_used,
                            EntityKind::Location => &story.metadata.locations_used,
                        };
                        if !used.contains(entity_id) {
                            issues.push(IntegrityIssue::UnreciprocatedAppearance {
                                kind,
                                name: name.clone(),
                                story: story_id.clone(),
                            });
                        }
                    }
                }
            }
        }

        issues
    }
}

fn missing(kind: EntityKind, key: &str) -> MissingReferenceError {
    MissingReferenceError {
        kind,
        key: key.to_string(),
    }
}

/// Remove and return the entry whose key matches `name` ignoring case.
fn take_case_insensitive<V>(map: &mut BTreeMap<String, V>, name: &str) -> Option<V> {
    let wanted = name.to_lowercase();
    let key = map.keys().find(|k| k.to_lowercase() == wanted)?.clone();
    map.remove(&key)
}

/// Trimmed names in first-seen order with duplicates and blanks dropped.
/// Trimmed, non-blank names in first-seen order, each once.
pub(crate) fn dedup_names(names: &[String]) -> Vec<&str> {
    let mut seen = FxHashSet::default();
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty() && seen.insert(*n))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::story::{TargetAge, Theme};
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn draft(title: &str, body: &str) -> StoryDraft {
        StoryDraft {
            title: title.to_string(),
            body: body.to_string(),
            moral: "Be kind.".to_string(),
            reported_word_count: None,
        }
    }

    fn selection(characters: &[&str], locations: &[&str]) -> StorySelection {
        StorySelection {
            characters: characters.iter().map(|s| s.to_string()).collect(),
            locations: locations.iter().map(|s| s.to_string()).collect(),
            theme: Theme::Friendship,
            target_age: TargetAge::SixToEight,
            word_count: 200,
        }
    }

    fn seeded() -> UniverseGraph {
        let mut g = UniverseGraph::new();
        g.upsert_character(
            "Minnal Ammu",
            CharacterAttributes::new("An Indian girl with brown skin", &["can fly"]),
            at(1, 9),
        )
        .unwrap();
        g.upsert_character("Kuttan", CharacterAttributes::new("A loyal friend", &[]), at(1, 9))
            .unwrap();
        g.upsert_location("Thrissur Park", LocationDetails::new("A green park"), at(1, 9))
            .unwrap();
        g.upsert_location("Old Library", LocationDetails::new("Dusty shelves"), at(1, 9))
            .unwrap();
        g
    }

    #[test]
    fn new_entities_get_sequential_ids() {
        let g = seeded();
        assert_eq!(g.characters["Minnal Ammu"].id.as_str(), "CHAR2025010100001");
        assert_eq!(g.characters["Kuttan"].id.as_str(), "CHAR2025010100002");
        assert_eq!(g.locations["Thrissur Park"].id.as_str(), "LOC2025010100001");
        assert_eq!(g.locations["Old Library"].id.as_str(), "LOC2025010100002");
    }

    #[test]
    fn resubmitting_a_character_preserves_identity() {
        let mut g = seeded();
        g.append_story(&draft("T", "B"), &selection(&["Minnal Ammu"], &[]), at(2, 8))
            .unwrap();
        let before = g.characters["Minnal Ammu"].clone();

        let updated = g
            .upsert_character(
                "MINNAL AMMU",
                CharacterAttributes::new("Now taller", &["run", "  ", "fly"]),
                at(3, 12),
            )
            .unwrap();

        assert_eq!(updated.id, before.id);
        assert_eq!(updated.created_date, before.created_date);
        assert_eq!(updated.story_appearances, before.story_appearances);
        assert_eq!(updated.description, "Now taller");
        assert_eq!(updated.powers, vec!["run".to_string(), "fly".to_string()]);
        assert_eq!(updated.last_updated, at(3, 12));
        assert_eq!(g.characters.len(), 2);
        assert!(g.characters.contains_key("MINNAL AMMU"));
        assert!(!g.characters.contains_key("Minnal Ammu"));
    }

    #[test]
    fn resubmitting_a_location_preserves_identity() {
        let mut g = seeded();
        let before = g.locations["Old Library"].clone();
        let updated = g
            .upsert_location("old library", LocationDetails::new("Newly painted"), at(4, 10))
            .unwrap();
        assert_eq!(updated.id, before.id);
        assert_eq!(updated.created_date, before.created_date);
        assert_eq!(updated.description, "Newly painted");
        assert_eq!(g.locations.len(), 2);
    }

    #[test]
    fn empty_names_are_refused() {
        let mut g = UniverseGraph::new();
        assert!(matches!(
            g.upsert_character("  ", CharacterAttributes::default(), at(1, 1)),
            Err(GraphError::EmptyName("character"))
        ));
        assert!(matches!(
            g.upsert_location("", LocationDetails::default(), at(1, 1)),
            Err(GraphError::EmptyName("location"))
        ));
    }

    #[test]
    fn append_links_each_named_entity_once() {
        let mut g = seeded();
        let outcome = g
            .append_story(
                &draft("Sunny Playdate", "Minnal moved the clouds."),
                &selection(&["Minnal Ammu", "Minnal Ammu"], &["Thrissur Park"]),
                at(5, 10),
            )
            .unwrap();

        let id = outcome.story_id().unwrap().clone();
        assert_eq!(id.as_str(), "STORY2025010500001");
        assert_eq!(g.characters["Minnal Ammu"].story_appearances, vec![id.clone()]);
        assert_eq!(g.locations["Thrissur Park"].story_appearances, vec![id.clone()]);
        assert!(g.characters["Kuttan"].story_appearances.is_empty());
        assert!(g.locations["Old Library"].story_appearances.is_empty());

        let story = g.story(id.as_str()).unwrap();
        assert_eq!(story.metadata.characters_used.len(), 1);
        assert_eq!(story.metadata.generated_date, at(5, 10));
        assert!(g.check_integrity().is_empty());
    }

    #[test]
    fn rejected_draft_leaves_graph_untouched() {
        let mut g = seeded();
        let before = g.clone();

        let outcome = g
            .append_story(&draft("   ", "Body"), &selection(&["Kuttan"], &[]), at(5, 10))
            .unwrap();
        assert_eq!(outcome, AppendOutcome::Rejected(ValidationRejected::EmptyTitle));

        let outcome = g
            .append_story(&draft("Title", ""), &selection(&["Kuttan"], &[]), at(5, 10))
            .unwrap();
        assert_eq!(outcome, AppendOutcome::Rejected(ValidationRejected::EmptyContent));
        assert_eq!(g, before);
    }

    #[test]
    fn unknown_name_fails_without_mutation() {
        let mut g = seeded();
        let before = g.clone();
        let err = g
            .append_story(
                &draft("T", "B"),
                &selection(&["Minnal Ammu"], &["Atlantis"]),
                at(5, 10),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::MissingReference(MissingReferenceError { kind: EntityKind::Location, .. })
        ));
        assert_eq!(g, before);
    }

    #[test]
    fn story_text_is_trimmed() {
        let mut g = seeded();
        let outcome = g
            .append_story(&draft("  Title \n", "\n Body \n"), &selection(&[], &[]), at(5, 10))
            .unwrap();
        let story = g.story(outcome.story_id().unwrap().as_str()).unwrap();
        assert_eq!(story.title, "Title");
        assert_eq!(story.content, "Body");
    }

    #[test]
    fn lookups_by_id_and_name() {
        let mut g = seeded();
        let id = g
            .append_story(&draft("T", "B"), &selection(&["Kuttan"], &[]), at(5, 10))
            .unwrap()
            .story_id()
            .cloned()
            .unwrap();

        let found = g.find_by_id(RecordKind::Story, id.as_str()).unwrap();
        assert_eq!(found.id(), &id);
        assert!(matches!(
            g.find_by_id(RecordKind::Character, "CHAR2025010100002"),
            Some(Record::Character(c)) if c.name == "Kuttan"
        ));
        assert!(g.find_by_id(RecordKind::Location, "CHAR2025010100002").is_none());
        assert!(g.find_by_name(EntityKind::Location, "Old Library").is_some());
        // name lookups are case-sensitive
        assert!(g.find_by_name(EntityKind::Location, "old library").is_none());
    }

    #[test]
    fn resolve_cast_surfaces_missing_ids() {
        let mut g = seeded();
        let id = g
            .append_story(
                &draft("T", "B"),
                &selection(&["Kuttan", "Minnal Ammu"], &["Old Library"]),
                at(5, 10),
            )
            .unwrap()
            .story_id()
            .cloned()
            .unwrap();

        let story = g.story(id.as_str()).unwrap().clone();
        let cast = g.resolve_cast(&story).unwrap();
        assert_eq!(cast.characters[0].name, "Kuttan");
        assert_eq!(cast.characters[1].name, "Minnal Ammu");
        assert_eq!(cast.locations[0].name, "Old Library");

        g.characters.remove("Kuttan");
        let err = g.resolve_cast(&story).unwrap_err();
        assert_eq!(err.kind, EntityKind::Character);
        assert_eq!(err.key, "CHAR2025010100002");
    }

    #[test]
    fn appearances_follow_append_order() {
        let mut g = seeded();
        for title in ["First", "Second", "Third"] {
            g.append_story(&draft(title, "B"), &selection(&["Kuttan"], &[]), at(6, 10))
                .unwrap();
        }
        let titles: Vec<_> = g
            .appearances(EntityKind::Character, "Kuttan")
            .unwrap()
            .iter()
            .map(|s| s.title.as_str())
            .collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);
        assert!(g.appearances(EntityKind::Location, "Nowhere").is_err());
    }

    #[test]
    fn integrity_check_reports_broken_links() {
        let mut g = seeded();
        g.append_story(&draft("T", "B"), &selection(&["Kuttan"], &["Old Library"]), at(6, 10))
            .unwrap();

        g.characters
            .get_mut("Kuttan")
            .unwrap()
            .story_appearances
            .clear();
        g.locations
            .get_mut("Thrissur Park")
            .unwrap()
            .story_appearances
            .push(Identifier::from("STORY2025010600001"));
        g.locations
            .get_mut("Old Library")
            .unwrap()
            .story_appearances
            .push(Identifier::from("STORY2099010100001"));

        let issues = g.check_integrity();
        assert!(issues.contains(&IntegrityIssue::MissingBackReference {
            kind: EntityKind::Character,
            name: "Kuttan".to_string(),
            story: Identifier::from("STORY2025010600001"),
        }));
        assert!(issues.contains(&IntegrityIssue::UnreciprocatedAppearance {
            kind: EntityKind::Location,
            name: "Thrissur Park".to_string(),
            story: Identifier::from("STORY2025010600001"),
        }));
        assert!(issues.contains(&IntegrityIssue::UnknownAppearance {
            kind: EntityKind::Location,
            name: "Old Library".to_string(),
            story: Identifier::from("STORY2099010100001"),
        }));
        assert_eq!(issues.len(), 3);
    }

    #[test]
    fn identifier_validation_catches_wrong_prefix() {
        let mut g = seeded();
        assert!(g.validate_identifiers().is_ok());
        g.characters.get_mut("Kuttan").unwrap().id = Identifier::from("LOC2025010100009");
        assert!(g.validate_identifiers().is_err());
    }
}
