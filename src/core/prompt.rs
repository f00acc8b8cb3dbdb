//! Weighted illustration prompts derived from a stored story.
//!
//! The composer produces an ordered list of `(clause, weight)` pairs and
//! stops there; turning them into a particular generator's syntax is done by
//! [`crate::core::generator::ImageRequest`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::schema::entity::{Character, Location};
use crate::schema::story::Story;

/// Maximum number of feature tags attached to the subject clause.
const MAX_FEATURE_TAGS: usize = 2;

/// Time-of-day keywords, checked in order; the first hit wins.
const TIME_OF_DAY: &[(&[&str], &str)] = &[
    (&["night", "evening"], "nighttime"),
    (&["sunset"], "sunset"),
    (&["morning"], "morning"),
];
const DEFAULT_TIME_OF_DAY: &str = "daytime";

/// Weather keywords, checked in order; the first hit wins.
const WEATHER: &[(&[&str], &str)] = &[
    (&["rain"], "rainy"),
    (&["storm"], "stormy"),
    (&["cloud"], "cloudy"),
];
const DEFAULT_WEATHER: &str = "clear sky";

/// What a clause describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClauseKind {
    Subject,
    Setting,
    Style,
    Scene,
    Quality,
}

/// One weighted piece of an illustration prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedClause {
    pub kind: ClauseKind,
    pub text: String,
    pub weight: f32,
}

/// The composer's output: clauses in the order the generator should see them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedPrompt {
    pub clauses: Vec<WeightedClause>,
}

impl WeightedPrompt {
    pub fn clause(&self, kind: ClauseKind) -> Option<&WeightedClause> {
        self.clauses.iter().find(|c| c.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Per-clause weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClauseWeights {
    pub subject: f32,
    pub setting: f32,
    pub style: f32,
    pub scene: f32,
    pub quality: f32,
}

impl Default for ClauseWeights {
    fn default() -> Self {
        Self {
            subject: 1.2,
            setting: 1.0,
            style: 1.0,
            scene: 0.8,
            quality: 0.6,
        }
    }
}

impl ClauseWeights {
    pub fn for_kind(&self, kind: ClauseKind) -> f32 {
        match kind {
            ClauseKind::Subject => self.subject,
            ClauseKind::Setting => self.setting,
            ClauseKind::Style => self.style,
            ClauseKind::Scene => self.scene,
            ClauseKind::Quality => self.quality,
        }
    }
}

/// Which character text a feature rule searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureSource {
    Description,
    Powers,
}

/// "If `source` mentions `keyword`, tag the subject with `tag`."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRule {
    pub source: FeatureSource,
    pub keyword: String,
    pub tag: String,
}

impl FeatureRule {
    pub fn new(source: FeatureSource, keyword: &str, tag: &str) -> Self {
        Self {
            source,
            keyword: keyword.to_string(),
            tag: tag.to_string(),
        }
    }

    fn matches(&self, character: &Character) -> bool {
        let keyword = self.keyword.to_lowercase();
        match self.source {
            FeatureSource::Description => character.description.to_lowercase().contains(&keyword),
            FeatureSource::Powers => character
                .powers
                .iter()
                .any(|p| p.to_lowercase().contains(&keyword)),
        }
    }
}

pub fn default_feature_rules() -> Vec<FeatureRule> {
    vec![
        FeatureRule::new(FeatureSource::Description, "indian", "Indian"),
        FeatureRule::new(FeatureSource::Description, "brown skin", "brown skin"),
        FeatureRule::new(FeatureSource::Powers, "fly", "can fly"),
        FeatureRule::new(FeatureSource::Powers, "run", "super fast"),
    ]
}

/// Look-and-feel settings for illustration prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Leads the first of the subject and setting clauses. Empty for none.
    pub subject_prefix: String,
    pub base_style: String,
    pub quality_boost: String,
    pub weights: ClauseWeights,
    /// Ordered; earlier rules take the limited tag slots first.
    pub features: Vec<FeatureRule>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            subject_prefix: "children's illustration".to_string(),
            base_style: "children's book illustration, soft colors, friendly characters"
                .to_string(),
            quality_boost: "high quality, detailed, vibrant colors".to_string(),
            weights: ClauseWeights::default(),
            features: default_feature_rules(),
        }
    }
}

/// Coarse lighting and weather read from story text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneDetails {
    pub time_of_day: &'static str,
    pub weather: &'static str,
}

impl SceneDetails {
    pub fn infer(text: &str) -> Self {
        let text = text.to_lowercase();
        Self {
            time_of_day: first_hit(&text, TIME_OF_DAY).unwrap_or(DEFAULT_TIME_OF_DAY),
            weather: first_hit(&text, WEATHER).unwrap_or(DEFAULT_WEATHER),
        }
    }

    pub fn describe(&self) -> String {
        format!("{}, {}, detailed background", self.time_of_day, self.weather)
    }
}

fn first_hit(text: &str, table: &[(&[&str], &'static str)]) -> Option<&'static str> {
    table
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| text.contains(k)))
        .map(|(_, label)| *label)
}

/// Builds weighted prompts under one style.
pub struct PromptComposer<'a> {
    style: &'a StyleConfig,
}

impl<'a> PromptComposer<'a> {
    pub fn new(style: &'a StyleConfig) -> Self {
        Self { style }
    }

    /// Compose the prompt for `story`.
    ///
    /// The first character becomes the subject and the first location the
    /// setting; if either list is empty that clause is left out. Style, scene,
    /// and quality clauses are always present.
    pub fn compose(
        &self,
        story: &Story,
        characters: &[&Character],
        locations: &[&Location],
    ) -> WeightedPrompt {
        let mut clauses = Vec::with_capacity(5);

        if let Some(main) = characters.first() {
            let tags = self.feature_tags(main);
            let text = if tags.is_empty() {
                main.name.clone()
            } else {
                format!("{}, {}", main.name, tags.join(", "))
            };
            clauses.push(self.clause(ClauseKind::Subject, text));
        } else {
            debug!(story = %story.id, "no characters referenced, omitting subject clause");
        }

        if let Some(place) = locations.first() {
            clauses.push(self.clause(ClauseKind::Setting, format!("at {}", place.name)));
        } else {
            debug!(story = %story.id, "no locations referenced, omitting setting clause");
        }

        let prefix = self.style.subject_prefix.trim();
        if let Some(lead) = clauses.first_mut().filter(|_| !prefix.is_empty()) {
            lead.text = format!("{prefix}, {}", lead.text);
        }

        clauses.push(self.clause(
            ClauseKind::Style,
            format!("Style: {}", self.style.base_style),
        ));
        clauses.push(self.clause(
            ClauseKind::Scene,
            format!("Scene details: {}", SceneDetails::infer(&story.content).describe()),
        ));
        clauses.push(self.clause(
            ClauseKind::Quality,
            format!("Quality: {}", self.style.quality_boost),
        ));

        WeightedPrompt { clauses }
    }

    /// Up to two distinct tags from the configured feature rules.
    pub fn feature_tags(&self, character: &Character) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        for rule in &self.style.features {
            if tags.len() == MAX_FEATURE_TAGS {
                break;
            }
            if rule.matches(character) && !tags.contains(&rule.tag) {
                tags.push(rule.tag.clone());
            }
        }
        tags
    }

    fn clause(&self, kind: ClauseKind, text: String) -> WeightedClause {
        WeightedClause {
            kind,
            text,
            weight: self.style.weights.for_kind(kind),
        }
    }
}
