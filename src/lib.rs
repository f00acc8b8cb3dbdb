//! Story Universe: a cross-referenced catalog of characters, locations, and
//! stories, plus the pipeline that turns generated text into stored stories,
//! illustration instructions, and composed documents.
//!
//! The store and the text transforms are synchronous and deterministic given
//! an injected clock. Text and image generation sit behind the traits in
//! [`core::generator`].

pub mod core;
pub mod schema;
