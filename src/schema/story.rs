use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::identifier::Identifier;

/// Word-count bounds a story request may ask for.
pub const WORD_COUNT_RANGE: std::ops::RangeInclusive<u32> = 100..=1000;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownTagError {
    pub kind: &'static str,
    pub value: String,
}

/// The theme a story is asked to explore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Theme {
    Friendship,
    Courage,
    Responsibility,
    Teamwork,
    Family,
    Innovation,
    #[serde(rename = "Environmental Protection")]
    EnvironmentalProtection,
    #[serde(rename = "Helping Others")]
    HelpingOthers,
}

impl Theme {
    pub const ALL: [Theme; 8] = [
        Self::Friendship,
        Self::Courage,
        Self::Responsibility,
        Self::Teamwork,
        Self::Family,
        Self::Innovation,
        Self::EnvironmentalProtection,
        Self::HelpingOthers,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Friendship => "Friendship",
            Self::Courage => "Courage",
            Self::Responsibility => "Responsibility",
            Self::Teamwork => "Teamwork",
            Self::Family => "Family",
            Self::Innovation => "Innovation",
            Self::EnvironmentalProtection => "Environmental Protection",
            Self::HelpingOthers => "Helping Others",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Theme {
    type Err = UnknownTagError;

    /// Accepts the display label in any case, with spaces, hyphens, or
    /// underscores between words.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_tag(s);
        Self::ALL
            .into_iter()
            .find(|theme| normalize_tag(theme.label()) == wanted)
            .ok_or_else(|| UnknownTagError {
                kind: "theme",
                value: s.to_string(),
            })
    }
}

/// The reader age band a story targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetAge {
    #[serde(rename = "6-8")]
    SixToEight,
    #[serde(rename = "8-10")]
    EightToTen,
    #[serde(rename = "10-12")]
    TenToTwelve,
}

impl TargetAge {
    pub const ALL: [TargetAge; 3] = [Self::SixToEight, Self::EightToTen, Self::TenToTwelve];

    pub fn label(&self) -> &'static str {
        match self {
            Self::SixToEight => "6-8",
            Self::EightToTen => "8-10",
            Self::TenToTwelve => "10-12",
        }
    }
}

impl fmt::Display for TargetAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TargetAge {
    type Err = UnknownTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|age| age.label() == s.trim())
            .ok_or_else(|| UnknownTagError {
                kind: "age band",
                value: s.to_string(),
            })
    }
}

fn normalize_tag(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Descriptive metadata persisted with each story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryMetadata {
    pub theme: Theme,
    pub target_age: TargetAge,
    /// The length the generator was asked for, not the length it produced.
    pub word_count: u32,
    #[serde(default)]
    pub characters_used: Vec<Identifier>,
    #[serde(default)]
    pub locations_used: Vec<Identifier>,
    pub generated_date: NaiveDateTime,
}

/// A persisted story. Stories are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: Identifier,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub moral_lesson: String,
    pub metadata: StoryMetadata,
}

/// The caller's choices for a story: which entities appear (by name) and
/// how the generator should shape it.
#[derive(Debug, Clone, PartialEq)]
pub struct StorySelection {
    pub characters: Vec<String>,
    pub locations: Vec<String>,
    pub theme: Theme,
    pub target_age: TargetAge,
    pub word_count: u32,
}

/// Why a selection cannot be sent to the generator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("select at least one character")]
    NoCharacters,
    #[error("select at least one location")]
    NoLocations,
    #[error("word count {0} is outside 100..=1000")]
    WordCountOutOfRange(u32),
}

impl StorySelection {
    pub fn validate(&self) -> Result<(), SelectionError> {
        if self.characters.iter().all(|n| n.trim().is_empty()) {
            return Err(SelectionError::NoCharacters);
        }
        if self.locations.iter().all(|n| n.trim().is_empty()) {
            return Err(SelectionError::NoLocations);
        }
        if !WORD_COUNT_RANGE.contains(&self.word_count) {
            return Err(SelectionError::WordCountOutOfRange(self.word_count));
        }
        Ok(())
    }
}

/// Structured text recovered from a generator response, not yet persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoryDraft {
    pub title: String,
    pub body: String,
    pub moral: String,
    /// The count the generator claims in a trailing `Word Count:` block.
    pub reported_word_count: Option<u32>,
}

/// Why a draft was not saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationRejected {
    #[error("story has no title")]
    EmptyTitle,
    #[error("story has no content")]
    EmptyContent,
}

impl StoryDraft {
    /// A draft is persistable only if title and body are non-empty after
    /// trimming whitespace.
    pub fn validate(&self) -> Result<(), ValidationRejected> {
        if self.title.trim().is_empty() {
            return Err(ValidationRejected::EmptyTitle);
        }
        if self.body.trim().is_empty() {
            return Err(ValidationRejected::EmptyContent);
        }
        Ok(())
    }

    /// Whitespace-separated word count of the body.
    pub fn body_word_count(&self) -> usize {
        self.body.split_whitespace().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_labels_round_trip_through_serde() {
        let json = serde_json::to_string(&Theme::EnvironmentalProtection).unwrap();
        assert_eq!(json, "\"Environmental Protection\"");
        let back: Theme = serde_json::from_str("\"Helping Others\"").unwrap();
        assert_eq!(back, Theme::HelpingOthers);
    }

    #[test]
    fn theme_from_str_is_forgiving() {
        assert_eq!("courage".parse::<Theme>(), Ok(Theme::Courage));
        assert_eq!(
            "helping-others".parse::<Theme>(),
            Ok(Theme::HelpingOthers)
        );
        assert_eq!(
            "Environmental Protection".parse::<Theme>(),
            Ok(Theme::EnvironmentalProtection)
        );
        assert!("Heists".parse::<Theme>().is_err());
    }

    #[test]
    fn age_band_labels() {
        assert_eq!("8-10".parse::<TargetAge>(), Ok(TargetAge::EightToTen));
        assert!("12-14".parse::<TargetAge>().is_err());
        let json = serde_json::to_string(&TargetAge::SixToEight).unwrap();
        assert_eq!(json, "\"6-8\"");
    }

    #[test]
    fn draft_validation() {
        let mut draft = StoryDraft {
            title: "  ".to_string(),
            body: "Once.".to_string(),
            ..StoryDraft::default()
        };
        assert_eq!(draft.validate(), Err(ValidationRejected::EmptyTitle));

        draft.title = "A Title".to_string();
        draft.body = "\n\t".to_string();
        assert_eq!(draft.validate(), Err(ValidationRejected::EmptyContent));

        draft.body = "Once upon a time.".to_string();
        assert!(draft.validate().is_ok());
        assert_eq!(draft.body_word_count(), 4);
    }

    #[test]
    fn selection_validation() {
        let mut selection = StorySelection {
            characters: vec!["Minnal Ammu".to_string()],
            locations: vec!["Thrissur Park".to_string()],
            theme: Theme::Friendship,
            target_age: TargetAge::SixToEight,
            word_count: 100,
        };
        assert!(selection.validate().is_ok());

        selection.word_count = 1001;
        assert_eq!(
            selection.validate(),
            Err(SelectionError::WordCountOutOfRange(1001))
        );

        selection.word_count = 1000;
        selection.locations.clear();
        assert_eq!(selection.validate(), Err(SelectionError::NoLocations));

        selection.characters = vec!["  ".to_string()];
        assert_eq!(selection.validate(), Err(SelectionError::NoCharacters));
    }

    #[test]
    fn story_with_unknown_theme_fails_to_load() {
        let json = r#"{
            "id": "STORY2025010100001",
            "title": "T",
            "content": "C",
            "moral_lesson": "M",
            "metadata": {
                "theme": "Heists",
                "target_age": "6-8",
                "word_count": 200,
                "characters_used": [],
                "locations_used": [],
                "generated_date": "2025-01-01T10:00:00"
            }
        }"#;
        assert!(serde_json::from_str::<Story>(json).is_err());
    }
}
