//! Composed story documents: one stored story plus its latest image.

use chrono::NaiveDateTime;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::schema::identifier::Identifier;
use crate::schema::story::{Story, TargetAge, Theme};

/// Composition was asked for a story that has no generated image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no image found for story {story_id}")]
pub struct NoArtifactError {
    pub story_id: Identifier,
}

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything a document shows, independent of its on-disk format.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedDocument {
    pub story_id: Identifier,
    pub title: String,
    pub theme: Theme,
    pub target_age: TargetAge,
    pub image: PathBuf,
    pub body: String,
    pub moral_lesson: String,
    pub generated: NaiveDateTime,
    /// The requested length recorded with the story.
    pub word_count: u32,
}

impl ComposedDocument {
    /// Pair a story with its image. Without an image there is no document.
    pub fn assemble(story: &Story, image: Option<&Path>) -> Result<Self, NoArtifactError> {
        let image = image.ok_or_else(|| NoArtifactError {
            story_id: story.id.clone(),
        })?;

        Ok(Self {
            story_id: story.id.clone(),
            title: story.title.clone(),
            theme: story.metadata.theme,
            target_age: story.metadata.target_age,
            image: image.to_path_buf(),
            body: story.content.clone(),
            moral_lesson: story.moral_lesson.clone(),
            generated: story.metadata.generated_date,
            word_count: story.metadata.word_count,
        })
    }
}

/// Renders a composed document into some file format.
pub trait DocumentWriter {
    /// File extension, without the dot.
    fn extension(&self) -> &str;

    fn render(&self, document: &ComposedDocument) -> String;

    /// Write `document` into `documents_dir` under a timestamped name and
    /// return the path.
    fn write(
        &self,
        document: &ComposedDocument,
        documents_dir: &Path,
        now: NaiveDateTime,
    ) -> Result<PathBuf, ComposeError> {
        fs::create_dir_all(documents_dir)?;
        let path = documents_dir.join(format!(
            "story_{}_{}.{}",
            document.story_id,
            now.format("%Y%m%d_%H%M%S"),
            self.extension()
        ));
        fs::write(&path, self.render(document))?;
        info!(story = %document.story_id, path = %path.display(), "composed document");
        Ok(path)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownWriter;

impl DocumentWriter for MarkdownWriter {
    fn extension(&self) -> &str {
        "md"
    }

    fn render(&self, doc: &ComposedDocument) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# {}\n", doc.title);
        let _ = writeln!(out, "**Theme:** {}  ", doc.theme);
        let _ = writeln!(out, "**Age Group:** {}\n", doc.target_age);
        let _ = writeln!(out, "![{}]({})\n", doc.title, doc.image.display());
        let _ = writeln!(out, "{}\n", doc.body);
        out.push_str("## Moral Lesson\n\n");
        let _ = writeln!(out, "{}\n", doc.moral_lesson);
        out.push_str("---\n\n");
        let _ = writeln!(
            out,
            "Generated: {}  ",
            doc.generated.format("%Y-%m-%d %H:%M:%S")
        );
        let _ = writeln!(out, "Word Count: {}", doc.word_count);
        out
    }
}
