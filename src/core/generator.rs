//! Contracts for the external text and image generators, and the requests
//! sent to them.
//!
//! Nothing here talks to a model. Callers plug in whatever backend they
//! have by implementing [`TextGenerator`] / [`ImageGenerator`]; plain
//! closures work for both.

use std::fmt::Write as _;

use thiserror::Error;

use crate::core::config::SamplerConfig;
use crate::core::graph::{dedup_names, MissingReferenceError, UniverseGraph};
use crate::core::prompt::{WeightedClause, WeightedPrompt};
use crate::schema::entity::EntityKind;
use crate::schema::story::{StorySelection, TargetAge, Theme};

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("generator unavailable: {0}")]
    Unavailable(String),
    #[error("generation failed: {0}")]
    Failed(String),
    #[error("generator returned an empty response")]
    EmptyResponse,
}

/// Turns an instruction into a raw text response.
pub trait TextGenerator {
    fn generate(&self, instruction: &str) -> Result<String, GeneratorError>;
}

impl<F> TextGenerator for F
where
    F: Fn(&str) -> Result<String, GeneratorError>,
{
    fn generate(&self, instruction: &str) -> Result<String, GeneratorError> {
        self(instruction)
    }
}

/// Turns an image request into encoded PNG bytes.
pub trait ImageGenerator {
    fn generate(&self, request: &ImageRequest) -> Result<Vec<u8>, GeneratorError>;
}

impl<F> ImageGenerator for F
where
    F: Fn(&ImageRequest) -> Result<Vec<u8>, GeneratorError>,
{
    fn generate(&self, request: &ImageRequest) -> Result<Vec<u8>, GeneratorError> {
        self(request)
    }
}

/// Everything the text generator needs to know about one requested story.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryBrief {
    /// `Name (power, power)` per character.
    pub characters: Vec<String>,
    /// `Name: description` per location.
    pub locations: Vec<String>,
    pub theme: Theme,
    pub target_age: TargetAge,
    pub word_count: u32,
}

impl StoryBrief {
    /// Resolve the selected names against the graph.
    pub fn from_selection(
        graph: &UniverseGraph,
        selection: &StorySelection,
    ) -> Result<Self, MissingReferenceError> {
        let characters = dedup_names(&selection.characters)
            .into_iter()
            .map(|name| {
                graph
                    .character(name)
                    .map(|c| c.descriptor())
                    .ok_or_else(|| MissingReferenceError {
                        kind: EntityKind::Character,
                        key: name.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let locations = dedup_names(&selection.locations)
            .into_iter()
            .map(|name| {
                graph
                    .location(name)
                    .map(|l| l.descriptor())
                    .ok_or_else(|| MissingReferenceError {
                        kind: EntityKind::Location,
                        key: name.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            characters,
            locations,
            theme: selection.theme,
            target_age: selection.target_age,
            word_count: selection.word_count,
        })
    }

    /// The instruction text, asking for the layout
    /// [`crate::core::parser::ContentParser`] reads back.
    pub fn instruction(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Create a superhero story with exactly {} words using these elements:",
            self.word_count
        );
        out.push('\n');
        let _ = writeln!(out, "Characters: {}", self.characters.join(", "));
        let _ = writeln!(out, "Locations: {}", self.locations.join(", "));
        let _ = writeln!(out, "Theme: {}", self.theme);
        let _ = writeln!(out, "Target Age: {}", self.target_age);
        out.push('\n');
        out.push_str("Requirements:\n");
        let _ = writeln!(
            out,
            "1. Story should be EXACTLY {} words long",
            self.word_count
        );
        out.push_str("2. Story should be engaging and appropriate for the target age\n");
        out.push_str("3. Include descriptions of super power usage\n");
        out.push_str("4. Have a clear moral lesson\n");
        out.push_str("5. Include character interactions\n");
        out.push_str("6. Create an exciting conflict and resolution\n");
        out.push('\n');
        out.push_str("Format the story as:\n");
        out.push_str("Title: [Story Title]\n\n");
        out.push_str("Story:\n[Main story content]\n\n");
        out.push_str("Moral Lesson:\n[The moral lesson of the story]\n\n");
        out.push_str("Word Count: [Include actual word count at the end]\n");
        out
    }
}

/// A fully resolved image generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub clauses: Vec<WeightedClause>,
    /// Square edge length in pixels, already clamped and stepped.
    pub size: u32,
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
    pub num_images_per_prompt: u32,
}

impl ImageRequest {
    pub fn new(prompt: WeightedPrompt, size: u32, sampler: &SamplerConfig) -> Self {
        Self {
            clauses: prompt.clauses,
            size,
            num_inference_steps: sampler.num_inference_steps,
            guidance_scale: sampler.guidance_scale,
            num_images_per_prompt: sampler.num_images_per_prompt,
        }
    }

    /// Clauses in weighted-prompt syntax: `(text:weight) AND (text:weight)`.
    pub fn combined_prompt(&self) -> String {
        self.clauses
            .iter()
            .map(|c| format!("({}:{})", c.text, format_weight(c.weight)))
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

/// Whole weights keep one decimal place (`1.0`), others print as-is.
fn format_weight(weight: f32) -> String {
    if weight.fract() == 0.0 {
        format!("{weight:.1}")
    } else {
        weight.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::prompt::ClauseKind;
    use crate::schema::entity::{CharacterAttributes, LocationDetails};
    use chrono::NaiveDate;

    fn graph() -> UniverseGraph {
        let now = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let mut graph = UniverseGraph::new();
        graph
            .upsert_character(
                "Minnal Ammu",
                CharacterAttributes::new("A brave girl", &["Flying", "Lightning speed"]),
                now,
            )
            .unwrap();
        graph
            .upsert_location("Thrissur Park", LocationDetails::new("A green park"), now)
            .unwrap();
        graph
    }

    fn selection() -> StorySelection {
        StorySelection {
            characters: vec!["Minnal Ammu".to_string()],
            locations: vec!["Thrissur Park".to_string()],
            theme: Theme::HelpingOthers,
            target_age: TargetAge::EightToTen,
            word_count: 300,
        }
    }

    #[test]
    fn brief_uses_descriptors() {
        let brief = StoryBrief::from_selection(&graph(), &selection()).unwrap();
        assert_eq!(brief.characters, vec!["Minnal Ammu (Flying, Lightning speed)"]);
        assert_eq!(brief.locations, vec!["Thrissur Park: A green park"]);

        let text = brief.instruction();
        assert!(text.contains("exactly 300 words"));
        assert!(text.contains("Characters: Minnal Ammu (Flying, Lightning speed)"));
        assert!(text.contains("Theme: Helping Others"));
        assert!(text.contains("Target Age: 8-10"));
        assert!(text.contains("Moral Lesson:"));
    }

    #[test]
    fn brief_trims_and_skips_repeated_names() {
        let mut sel = selection();
        sel.characters = vec![
            " Minnal Ammu".to_string(),
            "Minnal Ammu".to_string(),
            "  ".to_string(),
        ];
        sel.locations = vec!["Thrissur Park ".to_string(), "Thrissur Park".to_string()];

        let brief = StoryBrief::from_selection(&graph(), &sel).unwrap();
        assert_eq!(brief.characters, vec!["Minnal Ammu (Flying, Lightning speed)"]);
        assert_eq!(brief.locations, vec!["Thrissur Park: A green park"]);
        assert_eq!(brief.instruction().matches("Minnal Ammu").count(), 1);
    }

    #[test]
    fn brief_with_unknown_name_fails() {
        let mut sel = selection();
        sel.locations.push("Atlantis".to_string());
        let err = StoryBrief::from_selection(&graph(), &sel).unwrap_err();
        assert_eq!(err.kind, EntityKind::Location);
        assert_eq!(err.key, "Atlantis");
    }

    #[test]
    fn combined_prompt_syntax() {
        let request = ImageRequest {
            clauses: vec![
                WeightedClause {
                    kind: ClauseKind::Subject,
                    text: "Ammu".to_string(),
                    weight: 1.2,
                },
                WeightedClause {
                    kind: ClauseKind::Style,
                    text: "Style: soft".to_string(),
                    weight: 1.0,
                },
            ],
            size: 512,
            num_inference_steps: 1,
            guidance_scale: 0.0,
            num_images_per_prompt: 1,
        };
        assert_eq!(request.combined_prompt(), "(Ammu:1.2) AND (Style: soft:1.0)");
    }

    #[test]
    fn closures_are_generators() {
        let echo = |instruction: &str| -> Result<String, GeneratorError> {
            Ok(instruction.to_uppercase())
        };
        assert_eq!(TextGenerator::generate(&echo, "hi").unwrap(), "HI");
    }
}
