//! Pub/Sub Lite admin snippets
//!
//! Every call goes to the regional admin endpoint of the resource's
//! location. Reservations are regional; topics and subscriptions live in a
//! region or a zone.

pub mod models;
pub mod reservations;
pub mod subscriptions;
pub mod topics;

pub use models::SeekTarget;
pub use reservations::*;
pub use subscriptions::*;
pub use topics::*;
