//! Pub/Sub snippets

mod iam;
pub mod models;
pub mod schemas;
pub mod subscriptions;
pub mod topics;

pub use schemas::*;
pub use subscriptions::*;
pub use topics::*;
