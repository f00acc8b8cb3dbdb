//! Story composer: show the illustration instruction for a stored story, or
//! compose its document from the newest image on disk.
//!
//! Usage:
//!   story_composer prompt  <story_id> [--size <px>]
//!   story_composer compose <story_id>

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use story_universe::core::pipeline::StoryPipeline;
use story_universe::core::store::load_graph;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "story_composer", about = "Illustration prompts and story documents")]
struct Cli {
    #[arg(long, default_value = "config/pipeline.ron")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the weighted image instruction and sampler settings.
    Prompt {
        story_id: String,
        /// Edge length in pixels; clamped to the configured range.
        #[arg(long)]
        size: Option<u32>,
    },
    /// Write the story document using its most recent image.
    Compose { story_id: String },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "story_universe=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let pipeline = StoryPipeline::builder().config_file(&cli.config).build()?;
    let universe = &pipeline.config().paths.universe_file;
    let graph =
        load_graph(universe).with_context(|| format!("opening {}", universe.display()))?;

    match cli.command {
        Command::Prompt { story_id, size } => {
            let request = pipeline.image_request(&graph, &story_id, size)?;
            println!("{}", request.combined_prompt());
            println!(
                "size={}x{} steps={} guidance={} images={}",
                request.size,
                request.size,
                request.num_inference_steps,
                request.guidance_scale,
                request.num_images_per_prompt
            );
        }
        Command::Compose { story_id } => {
            let now = Local::now().naive_local();
            let path = pipeline.compose_document(&graph, &story_id, now)?;
            println!("Document saved to {}", path.display());
        }
    }

    Ok(())
}
