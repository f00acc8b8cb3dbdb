//! Bedtime story demo: builds a tiny universe, generates a story with a
//! canned text generator, illustrates it with a placeholder image, and
//! composes the Markdown document.
//!
//! Run with: cargo run --example bedtime_story

use std::fs;

use story_universe::core::config::PipelineConfig;
use story_universe::core::generator::{GeneratorError, ImageRequest};
use story_universe::core::pipeline::StoryPipeline;
use story_universe::core::store::EntityStore;
use story_universe::schema::entity::{CharacterAttributes, LocationDetails};
use story_universe::schema::story::{StorySelection, TargetAge, Theme};

const CANNED_RESPONSE: &str = "\
Title: The Night the Stars Went Quiet

Story:
One quiet night, Minnal Ammu noticed the stars above Thrissur Park had stopped twinkling.

She flew up, higher than the mango trees, and found a shy little cloud hiding them. Ammu asked the cloud to play, and soon the sky sparkled again.

Moral Lesson:
A kind question can chase away the shyest worry.

Word Count: 55
";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "story_universe=debug".into()),
        )
        .init();

    let workdir = std::env::temp_dir().join("story_universe_demo");
    let _ = fs::remove_dir_all(&workdir);
    fs::create_dir_all(&workdir).expect("Failed to create demo directory");

    let mut config = PipelineConfig::default();
    config.paths.universe_file = workdir.join("universe_data.json");
    config.paths.images_dir = workdir.join("story_images");
    config.paths.documents_dir = workdir.join("story_documents");

    // --- Universe ---
    let mut store = EntityStore::open(&config.paths.universe_file).expect("Failed to open store");
    store
        .upsert_character(
            "Minnal Ammu",
            CharacterAttributes::new(
                "A cheerful Indian girl with brown skin and a lightning-bolt scarf",
                &["Flying", "Lightning speed"],
            ),
        )
        .expect("Failed to save character");
    store
        .upsert_location(
            "Thrissur Park",
            LocationDetails::new("A green park with a big mango tree"),
        )
        .expect("Failed to save location");

    // --- Pipeline with stand-in generators ---
    let pipeline = StoryPipeline::builder()
        .with_config(config)
        .text_generator(|instruction: &str| -> Result<String, GeneratorError> {
            println!("--- Instruction ---\n{instruction}");
            Ok(CANNED_RESPONSE.to_string())
        })
        .image_generator(|request: &ImageRequest| -> Result<Vec<u8>, GeneratorError> {
            println!("--- Image prompt ({0}x{0}) ---\n{1}\n", request.size, request.combined_prompt());
            Ok(b"\x89PNG\r\n\x1a\n".to_vec())
        })
        .build()
        .expect("Failed to build pipeline");

    let selection = StorySelection {
        characters: vec!["Minnal Ammu".to_string()],
        locations: vec!["Thrissur Park".to_string()],
        theme: Theme::Friendship,
        target_age: TargetAge::SixToEight,
        word_count: 150,
    };

    let generated = pipeline
        .generate_story(&mut store, &selection)
        .expect("Story generation failed");
    let Some(id) = generated.story_id().cloned() else {
        println!("Story was not saved: {:?}", generated.outcome);
        return;
    };
    println!("Saved story {id}: {}", generated.draft.title);

    let now = store.now();
    let image = pipeline
        .illustrate_story(store.graph(), id.as_str(), None, now)
        .expect("Illustration failed");
    println!("Image written to {}", image.display());

    let document = pipeline
        .compose_document(store.graph(), id.as_str(), now)
        .expect("Composition failed");
    println!("Document written to {}\n", document.display());
    println!(
        "{}",
        fs::read_to_string(document).expect("Failed to read document")
    );
}
