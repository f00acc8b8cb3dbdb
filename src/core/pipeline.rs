//! The story pipeline: selection → text generation → stored story →
//! illustration → composed document.
//!
//! Each stage is a separate call so tools can run any one of them on its own.
//! Generators and the document writer are plugged in through the builder.

use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::artifact::ArtifactLinker;
use crate::core::compose::{ComposeError, ComposedDocument, DocumentWriter, MarkdownWriter, NoArtifactError};
use crate::core::config::{ConfigError, PipelineConfig};
use crate::core::generator::{GeneratorError, ImageGenerator, ImageRequest, StoryBrief, TextGenerator};
use crate::core::graph::{AppendOutcome, MissingReferenceError, UniverseGraph};
use crate::core::parser::ContentParser;
use crate::core::prompt::PromptComposer;
use crate::core::store::{Clock, EntityStore, StoreError};
use crate::schema::identifier::Identifier;
use crate::schema::story::{SelectionError, Story, StoryDraft, StorySelection};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("missing reference: {0}")]
    MissingReference(#[from] MissingReferenceError),
    #[error("generator error: {0}")]
    Generator(#[from] GeneratorError),
    #[error("compose error: {0}")]
    Compose(#[from] ComposeError),
    #[error("{0}")]
    NoArtifact(#[from] NoArtifactError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid selection: {0}")]
    InvalidSelection(#[from] SelectionError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("story not found: {0}")]
    StoryNotFound(String),
    #[error("no {0} generator configured")]
    GeneratorNotConfigured(&'static str),
}

/// What happened to one generated story: the parsed draft, and whether the
/// store kept it.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    pub draft: StoryDraft,
    pub outcome: AppendOutcome,
}

impl GenerationOutcome {
    pub fn story_id(&self) -> Option<&Identifier> {
        self.outcome.story_id()
    }
}

/// Built via `StoryPipeline::builder()`.
pub struct StoryPipeline {
    config: PipelineConfig,
    text_generator: Option<Box<dyn TextGenerator>>,
    image_generator: Option<Box<dyn ImageGenerator>>,
    writer: Box<dyn DocumentWriter>,
}

pub struct StoryPipelineBuilder {
    config_path: Option<PathBuf>,
    config: Option<PipelineConfig>,
    text_generator: Option<Box<dyn TextGenerator>>,
    image_generator: Option<Box<dyn ImageGenerator>>,
    writer: Option<Box<dyn DocumentWriter>>,
}

impl StoryPipeline {
    pub fn builder() -> StoryPipelineBuilder {
        StoryPipelineBuilder {
            config_path: None,
            config: None,
            text_generator: None,
            image_generator: None,
            writer: None,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Validate a selection and resolve it into a generator brief.
    pub fn brief(
        &self,
        graph: &UniverseGraph,
        selection: &StorySelection,
    ) -> Result<StoryBrief, PipelineError> {
        selection.validate()?;
        Ok(StoryBrief::from_selection(graph, selection)?)
    }

    /// Ask the text generator for a story and store whatever it returns.
    ///
    /// A response that parses to an empty title or body is reported as
    /// rejected in the outcome; only generator and store failures are errors.
    pub fn generate_story<C: Clock>(
        &self,
        store: &mut EntityStore<C>,
        selection: &StorySelection,
    ) -> Result<GenerationOutcome, PipelineError> {
        let generator = self
            .text_generator
            .as_ref()
            .ok_or(PipelineError::GeneratorNotConfigured("text"))?;

        let brief = self.brief(store.graph(), selection)?;
        let raw = generator.generate(&brief.instruction())?;
        if raw.trim().is_empty() {
            return Err(GeneratorError::EmptyResponse.into());
        }
        self.ingest(store, selection, &raw)
    }

    /// Parse a raw generator response and store it.
    pub fn ingest<C: Clock>(
        &self,
        store: &mut EntityStore<C>,
        selection: &StorySelection,
        raw: &str,
    ) -> Result<GenerationOutcome, PipelineError> {
        selection.validate()?;
        let draft = ContentParser::parse(raw);
        debug!(
            requested = selection.word_count,
            reported = ?draft.reported_word_count,
            actual = draft.body_word_count(),
            "story length"
        );
        let outcome = store.append_story(&draft, selection)?;
        Ok(GenerationOutcome { draft, outcome })
    }

    /// Build the image request for a stored story. `size` falls back to the
    /// configured default and is clamped either way.
    pub fn image_request(
        &self,
        graph: &UniverseGraph,
        story_id: &str,
        size: Option<u32>,
    ) -> Result<ImageRequest, PipelineError> {
        let story = find_story(graph, story_id)?;
        let cast = graph.resolve_cast(story)?;
        if cast.characters.is_empty() || cast.locations.is_empty() {
            warn!(story = %story.id, "story references no characters or no locations");
        }

        let prompt = PromptComposer::new(&self.config.style).compose(
            story,
            &cast.characters,
            &cast.locations,
        );
        let size = self.config.image_size.clamp(size);
        Ok(ImageRequest::new(prompt, size, &self.config.sampler))
    }

    /// Generate an image for a stored story and write it under the images
    /// directory. Returns the new file's path.
    pub fn illustrate_story(
        &self,
        graph: &UniverseGraph,
        story_id: &str,
        size: Option<u32>,
        now: NaiveDateTime,
    ) -> Result<PathBuf, PipelineError> {
        let generator = self
            .image_generator
            .as_ref()
            .ok_or(PipelineError::GeneratorNotConfigured("image"))?;

        let request = self.image_request(graph, story_id, size)?;
        debug!(story = story_id, size = request.size, prompt = %request.combined_prompt(), "requesting image");
        let bytes = generator.generate(&request)?;
        if bytes.is_empty() {
            return Err(GeneratorError::EmptyResponse.into());
        }

        let path = ArtifactLinker::artifact_path(&self.config.paths.images_dir, story_id, now);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, bytes)?;
        info!(story = story_id, path = %path.display(), "saved image");
        Ok(path)
    }

    /// Compose a document for a stored story from its most recent image.
    /// Fails with [`NoArtifactError`] when the story has no image yet.
    pub fn compose_document(
        &self,
        graph: &UniverseGraph,
        story_id: &str,
        now: NaiveDateTime,
    ) -> Result<PathBuf, PipelineError> {
        let story = find_story(graph, story_id)?;
        let candidates = ArtifactLinker::scan(&self.config.paths.images_dir, story_id)?;
        let image = ArtifactLinker::latest_artifact(story_id, &candidates);
        let document = ComposedDocument::assemble(story, image)?;
        Ok(self
            .writer
            .write(&document, &self.config.paths.documents_dir, now)?)
    }
}

fn find_story<'a>(graph: &'a UniverseGraph, story_id: &str) -> Result<&'a Story, PipelineError> {
    graph
        .story(story_id)
        .ok_or_else(|| PipelineError::StoryNotFound(story_id.to_string()))
}

impl StoryPipelineBuilder {
    /// Read configuration from a RON file at build time. A missing file
    /// means defaults.
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Provide configuration directly (takes precedence over `config_file`).
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn text_generator(mut self, generator: impl TextGenerator + 'static) -> Self {
        self.text_generator = Some(Box::new(generator));
        self
    }

    pub fn image_generator(mut self, generator: impl ImageGenerator + 'static) -> Self {
        self.image_generator = Some(Box::new(generator));
        self
    }

    /// Defaults to [`MarkdownWriter`].
    pub fn document_writer(mut self, writer: impl DocumentWriter + 'static) -> Self {
        self.writer = Some(Box::new(writer));
        self
    }

    pub fn build(self) -> Result<StoryPipeline, PipelineError> {
        let config = match (self.config, self.config_path) {
            (Some(config), _) => {
                config.validate()?;
                config
            }
            (None, Some(path)) => PipelineConfig::load_or_default(&path)?,
            (None, None) => PipelineConfig::default(),
        };

        Ok(StoryPipeline {
            config,
            text_generator: self.text_generator,
            image_generator: self.image_generator,
            writer: self.writer.unwrap_or_else(|| Box::new(MarkdownWriter)),
        })
    }
}
