use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::identifier::Identifier;

/// The two kinds of named, reusable universe entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Character,
    Location,
}

impl EntityKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Character => "character",
            Self::Location => "location",
        }
    }
}

/// A recurring character.
///
/// The name is the key of the enclosing map in the persisted file, so it is
/// not serialized with the record; the graph restores it after loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    #[serde(skip)]
    pub name: String,
    pub id: Identifier,
    pub description: String,
    #[serde(default)]
    pub powers: Vec<String>,
    /// Story ids, in the order the stories were saved. Append-only.
    #[serde(default)]
    pub story_appearances: Vec<Identifier>,
    pub created_date: NaiveDateTime,
    pub last_updated: NaiveDateTime,
}

impl Character {
    /// Text the generator instruction uses for this character:
    /// `Name (power, power)`.
    pub fn descriptor(&self) -> String {
        format!("{} ({})", self.name, self.powers.join(", "))
    }
}

/// A recurring place. Mirrors [`Character`] without powers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(skip)]
    pub name: String,
    pub id: Identifier,
    pub description: String,
    #[serde(default)]
    pub story_appearances: Vec<Identifier>,
    pub created_date: NaiveDateTime,
    pub last_updated: NaiveDateTime,
}

impl Location {
    /// Text the generator instruction uses for this location:
    /// `Name: description`.
    pub fn descriptor(&self) -> String {
        format!("{}: {}", self.name, self.description)
    }
}

/// User-supplied fields for creating or updating a character.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterAttributes {
    pub description: String,
    pub powers: Vec<String>,
}

impl CharacterAttributes {
    pub fn new(description: impl Into<String>, powers: &[&str]) -> Self {
        Self {
            description: description.into(),
            powers: powers.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Parse powers entered one per line, dropping blank lines.
    pub fn powers_from_lines(text: &str) -> Vec<String> {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Trimmed powers with empty entries removed.
    pub(crate) fn normalized_powers(&self) -> Vec<String> {
        self.powers
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// User-supplied fields for creating or updating a location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationDetails {
    pub description: String,
}

impl LocationDetails {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}
