//! Storage Transfer Service snippets

pub mod jobs;
pub mod models;
pub mod operations;

pub use jobs::*;
pub use operations::*;
