//! Cloud IoT Core registry and device management

pub mod devices;
pub mod manager;
pub mod models;
pub mod registries;

pub use devices::*;
pub use registries::*;
