//! Compute Engine snippets
//!
//! Instance lifecycle calls. Every mutating call returns a zonal operation
//! that is waited on before the confirmation line is written.

pub mod custom_machine_type;
pub mod instances;
pub mod models;

pub use custom_machine_type::{CpuSeries, CustomMachineType};
pub use instances::*;
