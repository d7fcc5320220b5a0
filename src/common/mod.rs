//! Configuration and the injectable seams shared across the engine

pub mod config;
pub mod traits;
