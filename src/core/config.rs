//! Pipeline configuration, read from a RON file.
//!
//! ```ron
//! (
//!     paths: (universe_file: "universe_data.json", images_dir: "story_images"),
//!     image_size: (default_size: 512, min_size: 256, max_size: 1024, size_step: 8),
//!     sampler: (num_inference_steps: 1, guidance_scale: 0.0),
//!     style: (base_style: "watercolor"),
//! )
//! ```
//!
//! Every field is optional. Relative paths are resolved against the
//! directory holding the config file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::prompt::StyleConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Where the pipeline reads and writes files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub universe_file: PathBuf,
    pub images_dir: PathBuf,
    pub documents_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            universe_file: PathBuf::from("universe_data.json"),
            images_dir: PathBuf::from("story_images"),
            documents_dir: PathBuf::from("story_documents"),
        }
    }
}

impl PathsConfig {
    fn resolve_against(&mut self, base: &Path) {
        for path in [
            &mut self.universe_file,
            &mut self.images_dir,
            &mut self.documents_dir,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

/// Square image edge limits, in pixels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSizeConfig {
    pub default_size: u32,
    pub min_size: u32,
    pub max_size: u32,
    pub size_step: u32,
}

impl Default for ImageSizeConfig {
    fn default() -> Self {
        Self {
            default_size: 512,
            min_size: 256,
            max_size: 1024,
            size_step: 8,
        }
    }
}

impl ImageSizeConfig {
    /// Clamp the requested size (or the default) to `[min, max]`, then round
    /// down to a multiple of `size_step`, never going below `min_size`.
    pub fn clamp(&self, requested: Option<u32>) -> u32 {
        let size = requested
            .unwrap_or(self.default_size)
            .clamp(self.min_size, self.max_size);
        let stepped = size / self.size_step.max(1) * self.size_step.max(1);
        stepped.max(self.min_size)
    }
}

/// Fixed sampler settings passed with every image request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
    pub num_images_per_prompt: u32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            num_inference_steps: 1,
            guidance_scale: 0.0,
            num_images_per_prompt: 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub image_size: ImageSizeConfig,
    pub sampler: SamplerConfig,
    pub style: StyleConfig,
}

impl PipelineConfig {
    /// Parse and validate a config. Paths are left as written.
    pub fn parse_ron(source: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file and resolve its relative paths.
    pub fn load_from_ron(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse_ron(&contents)?;
        config.paths.resolve_against(base_dir(path));
        debug!(path = %path.display(), "loaded pipeline config");
        Ok(config)
    }

    /// Like [`Self::load_from_ron`], but a missing file yields the defaults
    /// resolved against the file's directory.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load_from_ron(path) {
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                let mut config = Self::default();
                config.paths.resolve_against(base_dir(path));
                Ok(config)
            }
            other => other,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let size = &self.image_size;
        if size.size_step == 0 {
            return Err(ConfigError::Invalid("size_step must be positive".into()));
        }
        if !(size.min_size <= size.default_size && size.default_size <= size.max_size) {
            return Err(ConfigError::Invalid(format!(
                "expected min_size <= default_size <= max_size, got {} / {} / {}",
                size.min_size, size.default_size, size.max_size
            )));
        }
        if self.sampler.num_images_per_prompt == 0 {
            return Err(ConfigError::Invalid(
                "num_images_per_prompt must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn base_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new(""))
}
