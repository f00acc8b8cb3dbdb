pub mod artifact;
pub mod compose;
pub mod config;
pub mod generator;
pub mod graph;
pub mod parser;
pub mod pipeline;
pub mod prompt;
pub mod store;
