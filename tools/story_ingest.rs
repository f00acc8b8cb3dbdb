//! Story ingest: print the generator instruction for a selection, or store a
//! generator response that was produced elsewhere.
//!
//! Usage:
//!   story_ingest brief  --character <name>... --location <name>... --theme <t> --age <band> --words <n>
//!   story_ingest ingest --response <file> <same selection flags>

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use story_universe::core::graph::AppendOutcome;
use story_universe::core::pipeline::StoryPipeline;
use story_universe::core::store::EntityStore;
use story_universe::schema::story::{StorySelection, TargetAge, Theme};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "story_ingest", about = "Prepare and store generated stories")]
struct Cli {
    #[arg(long, default_value = "config/pipeline.ron")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the instruction to send to the text generator.
    Brief(SelectionArgs),
    /// Parse a raw generator response and append it to the universe.
    Ingest {
        /// File holding the generator's raw text.
        #[arg(long)]
        response: PathBuf,
        #[command(flatten)]
        selection: SelectionArgs,
    },
}

#[derive(Args, Debug)]
struct SelectionArgs {
    /// Character name; repeat for several.
    #[arg(long = "character", required = true)]
    characters: Vec<String>,
    /// Location name; repeat for several.
    #[arg(long = "location", required = true)]
    locations: Vec<String>,
    /// e.g. "Friendship", "Helping Others".
    #[arg(long)]
    theme: Theme,
    /// One of 6-8, 8-10, 10-12.
    #[arg(long)]
    age: TargetAge,
    #[arg(long, default_value_t = 300)]
    words: u32,
}

impl From<SelectionArgs> for StorySelection {
    fn from(args: SelectionArgs) -> Self {
        StorySelection {
            characters: args.characters,
            locations: args.locations,
            theme: args.theme,
            target_age: args.age,
            word_count: args.words,
        }
    }
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
    let universe = pipeline.config().paths.universe_file.clone();
    let mut store = EntityStore::open(&universe)
        .with_context(|| format!("opening {}", universe.display()))?;

    match cli.command {
        Command::Brief(args) => {
            let brief = pipeline.brief(store.graph(), &args.into())?;
            print!("{}", brief.instruction());
        }
        Command::Ingest {
            response,
            selection,
        } => {
            let raw = fs::read_to_string(&response)
                .with_context(|| format!("reading {}", response.display()))?;
            let result = pipeline.ingest(&mut store, &selection.into(), &raw)?;
            match result.outcome {
                AppendOutcome::Saved(id) => {
                    println!("Saved {id}: {}", result.draft.title);
                    if let Some(reported) = result.draft.reported_word_count {
                        println!(
                            "Word count: {} (generator reported {reported})",
                            result.draft.body_word_count()
                        );
                    }
                }
                AppendOutcome::Rejected(reason) => bail!("story not saved: {reason}"),
            }
        }
    }

    Ok(())
}
