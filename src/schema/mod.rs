pub mod entity;
pub mod identifier;
pub mod story;
