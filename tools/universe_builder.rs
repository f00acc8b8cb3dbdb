//! Universe builder: create and inspect the characters and locations that
//! stories draw on.
//!
//! Usage:
//!   universe_builder character --name <name> --description <text> [--power <p>]...
//!   universe_builder location --name <name> --description <text>
//!   universe_builder show
//!   universe_builder appearances <character|location> <name>
//!   universe_builder check

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use story_universe::core::config::PipelineConfig;
use story_universe::core::store::EntityStore;
use story_universe::schema::entity::{CharacterAttributes, EntityKind, LocationDetails};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "universe_builder", about = "Manage universe characters and locations")]
struct Cli {
    /// Pipeline config (RON). Defaults apply if the file does not exist.
    #[arg(long, default_value = "config/pipeline.ron")]
    config: PathBuf,

    /// Universe file; overrides the config's `paths.universe_file`.
    #[arg(long)]
    universe: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a character, or update the one with the same name (any case).
    Character {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        /// Repeat for each power.
        #[arg(long = "power")]
        powers: Vec<String>,
    },
    /// Add a location, or update the one with the same name (any case).
    Location {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
    },
    /// Print every character, location, and story title.
    Show,
    /// List the stories a character or location appears in.
    Appearances { kind: KindArg, name: String },
    /// Report broken cross-references. Exits non-zero if any are found.
    Check,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Character,
    Location,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Character => EntityKind::Character,
            KindArg::Location => EntityKind::Location,
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
    let config = PipelineConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let universe = cli.universe.unwrap_or(config.paths.universe_file);
    let mut store = EntityStore::open(&universe)
        .with_context(|| format!("opening {}", universe.display()))?;

    match cli.command {
        Command::Character {
            name,
            description,
            powers,
        } => {
            let attributes = CharacterAttributes {
                description,
                powers,
            };
            let character = store.upsert_character(&name, attributes)?;
            println!("Saved {} ({})", character.name, character.id);
        }
        Command::Location { name, description } => {
            let location = store.upsert_location(&name, LocationDetails::new(description))?;
            println!("Saved {} ({})", location.name, location.id);
        }
        Command::Show => {
            let graph = store.graph();
            println!("Characters ({}):", graph.characters.len());
            for c in graph.characters.values() {
                println!("  {} [{}] {}", c.descriptor(), c.id, c.description);
            }
            println!("Locations ({}):", graph.locations.len());
            for l in graph.locations.values() {
                println!("  {} [{}]", l.descriptor(), l.id);
            }
            println!("Stories ({}):", graph.stories.len());
            for s in &graph.stories {
                println!("  {} {} ({}, {})", s.id, s.title, s.metadata.theme, s.metadata.target_age);
            }
        }
        Command::Appearances { kind, name } => {
            let stories = store.graph().appearances(kind.into(), &name)?;
            if stories.is_empty() {
                println!("{name} has not appeared in any story yet");
            }
            for s in stories {
                println!("{} {}", s.id, s.title);
            }
        }
        Command::Check => {
            let issues = store.graph().check_integrity();
            if issues.is_empty() {
                println!("No integrity issues");
                return Ok(());
            }
            for issue in &issues {
                println!("{issue}");
            }
            bail!("{} integrity issue(s) found", issues.len());
        }
    }

    Ok(())
}
